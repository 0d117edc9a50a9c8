/*!
    execute programs on a device through its raw REPL

    The central resource is the [Session] struct, owning the transport to one device. Each call to [Session::execute] goes through the whole exchange:

    - interrupt the device and enter raw mode, with a soft reboot for a clean interpreter
    - negotiate raw-paste mode and send the program under its flow control (or plain raw mode when the device does not support it and [Config::raw_paste] allows it)
    - capture the program's standard and error outputs
    - return the device to its normal REPL

    every step is bounded in time, and any failure aborts the whole call leaving the device in an unknown state. Nothing is retried.
*/

/// execution steps and their legal order
mod state;
/// delimiter-bounded reads
mod link;
/// stage handles of one execution, from raw mode entry to exit
mod raw;
/// program transfer, this is the tricky part of the code
mod paste;

pub use state::State;

use std::{
    io,
    time::Duration,
    };
#[cfg(feature = "serial")]
use std::path::Path;
use log::*;
use thiserror::Error;

use crate::transport::Transport;
#[cfg(feature = "serial")]
use crate::transport::SerialTransport;
use link::Link;


/// default bound on each output stream of a program
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// error regarding a program execution, the device is in an unknown state after any of them
#[derive(Error, Debug)]
pub enum Error {
    #[error("problem with serial link")]
    Link(io::Error),
    #[error("could not enter raw repl")]
    RawReplEntryFailed {received: Vec<u8>},
    #[error("no raw repl prompt")]
    NoPrompt {received: Vec<u8>},
    #[error("device does not support raw paste mode")]
    RawPasteUnsupported {received: Vec<u8>},
    #[error("unexpected byte {0:#04x} during raw paste")]
    UnexpectedDuringTransfer(u8),
    #[error("device granted more credit than can be counted")]
    CreditOverflow,
    #[error("could not complete raw paste")]
    TransferNotAcknowledged {received: Vec<u8>},
    #[error("program not accepted by raw repl")]
    ExecNotAccepted {received: Vec<u8>},
    #[error("no data arrived in expected time for {waiting_for}")]
    Timeout {
        waiting_for: &'static str,
        /// output captured before the timeout
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    #[error("program failed on device: {}", String::from_utf8_lossy(.stderr).trim_end())]
    Execution {stdout: Vec<u8>, stderr: Vec<u8>},
}
impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Link(error)
    }
}
impl Error {
    /// program output captured before the failure, if any
    pub fn stdout(&self) -> Option<&[u8]> {
        match self {
            Self::Timeout {stdout, ..} | Self::Execution {stdout, ..} => Some(stdout),
            _ => None,
        }
    }
    /// program error output captured before the failure, if any
    pub fn stderr(&self) -> Option<&[u8]> {
        match self {
            Self::Timeout {stderr, ..} | Self::Execution {stderr, ..} => Some(stderr),
            _ => None,
        }
    }
}

/// whether raw-paste mode is mandatory
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum RawPastePolicy {
    /// use raw paste when available, else fall back to plain raw mode with a warning
    #[default]
    Prefer,
    /// fail with [Error::RawPasteUnsupported] when the device does not support raw paste
    Require,
}

/// session settings
#[derive(Clone, Debug)]
pub struct Config {
    /// used when opening a serial port
    pub baud_rate: u32,
    /// bound on each banner or acknowledgement wait
    pub handshake_timeout: Duration,
    /**
        bound on a whole raw-paste transfer, including the time spent writing the program

        at 115200 bauds a device receives about 11 KB per second, so this must grow with the size of the programs sent
    */
    pub transfer_timeout: Duration,
    pub raw_paste: RawPastePolicy,
    /// bytes sent at once in plain raw mode
    pub plain_chunk: usize,
    /// pause between chunks in plain raw mode, the device has no flow control there
    pub plain_chunk_delay: Duration,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            handshake_timeout: Duration::from_secs(10),
            transfer_timeout: Duration::from_secs(10),
            raw_paste: RawPastePolicy::Prefer,
            plain_chunk: 256,
            plain_chunk_delay: Duration::from_millis(10),
        }
    }
}

/// both output streams of a program
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}


/**
    raw REPL client for one device

    a session must only be driven by one task at a time, which `&mut self` on [Self::execute] ensures
*/
pub struct Session<T> {
    link: Link<T>,
    config: Config,
    state: State,
}

#[cfg(feature = "serial")]
impl Session<SerialTransport> {
    /// open the given serial port with the given baud rate and default settings
    pub fn open(path: impl AsRef<Path>, rate: u32) -> Result<Self, Error> {
        Self::open_with(path, Config {baud_rate: rate, .. Config::default()})
    }
    /// open the given serial port with the given settings
    pub fn open_with(path: impl AsRef<Path>, config: Config) -> Result<Self, Error> {
        let transport = SerialTransport::open(path, config.baud_rate)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: Config) -> Self {
        Self {
            link: Link::new(transport),
            config,
            state: State::Idle,
        }
    }
    pub fn state(&self) -> State {self.state}
    pub fn config(&self) -> &Config {&self.config}
    pub fn transport(&self) -> &T {self.link.transport()}

    /// release the transport
    pub fn close(self) -> Result<(), Error> {
        debug!("closing session");
        self.link.into_inner().close()?;
        Ok(())
    }

    /**
        run the given program on the device and return its standard output

        `timeout` bounds the wait for each of the program's output streams. On error, the device is left in an unknown state, it may be worth reopening or power-cycling it before the next execution.
    */
    pub async fn execute(&mut self, program: &str, timeout: Duration) -> Result<Vec<u8>, Error> {
        self.execute_bytes(program.as_bytes(), timeout).await
    }
    /// same as [Self::execute] for a program that is not valid UTF-8
    pub async fn execute_bytes(&mut self, program: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        if self.state.is_busy() {
            // previous execution was dropped before finishing
            warn!("previous execution abandoned while {:?}", self.state);
            self.advance(State::Failed);
        }
        let result = self.run(program, timeout).await;
        match &result {
            Ok(stdout) => debug!("program of {} bytes output {} bytes", program.len(), stdout.len()),
            Err(error) => {
                warn!("execution failed while {:?}: {}", self.state, error);
                self.advance(State::Failed);
            },
        }
        result
    }
    async fn run(&mut self, program: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        let raw = self.enter_raw_repl().await?;
        let submitted = raw.exec_raw(program).await?;
        let (output, completed) = submitted.follow(timeout).await?;
        if ! output.stderr.is_empty() {
            return Err(Error::Execution {
                stdout: output.stdout,
                stderr: output.stderr,
                })
        }
        completed.exit_raw_repl().await?;
        Ok(output.stdout)
    }

    fn advance(&mut self, next: State) {
        debug_assert!(self.state.can_advance(next), "illegal transition {:?} -> {:?}", self.state, next);
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
