/*!
    byte streams a [Session](crate::Session) can run over

    A transport only has to keep bytes in order, timing is handled by the session.
*/

#[cfg(feature = "serial")]
mod serial;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

use std::io;


/// duplex byte stream to the device
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// wait until some bytes are received and copy them in `buffer`, returns the number of bytes copied
    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
    /// send all the given bytes
    async fn write(&mut self, data: &[u8]) -> io::Result<()>;
    /// number of received bytes that can be read without waiting, this must never wait for new data
    async fn bytes_waiting(&mut self) -> io::Result<usize>;
    /// discard everything received and not read yet
    fn flush_input(&mut self) -> io::Result<()>;
    /// release the underlying device
    fn close(self) -> io::Result<()>
    where Self: Sized
    {
        Ok(())
    }
}
