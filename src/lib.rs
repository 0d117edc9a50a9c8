/*!
    host side client for the raw REPL of micropython devices

    Run arbitrary programs on a board connected by uart and get their output back, without manual interaction:

    ```ignore
    let mut session = rawrepl::Session::open("/dev/ttyACM0", 115_200)?;
    let stdout = session.execute("print(1+1)", rawrepl::DEFAULT_TIMEOUT).await?;
    assert_eq!(stdout, b"2\r\n");
    session.close()?;
    ```

    programs are sent in raw-paste mode, so their size is not limited by the device input buffer. Standard and error outputs are captured separately, a program raising an exception makes [Session::execute] fail with its traceback.
*/

mod utils;

pub mod protocol;
pub mod window;
pub mod transport;
pub mod session;

pub use session::{Session, Config, RawPastePolicy, Output, State, Error, DEFAULT_TIMEOUT};
pub use transport::Transport;
