use std::{
    collections::VecDeque,
    io,
    };
use log::*;

use crate::{
    transport::Transport,
    utils::Deadline,
    };


/// size of reads requested to the transport
const CHUNK: usize = 64;

/**
    transport with delimiter-bounded reads

    bytes received past a delimiter are kept for the next read, so each read only consumes what it was asked for
*/
pub(super) struct Link<T> {
    transport: T,
    /// received but not consumed yet
    spill: VecDeque<u8>,
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T) -> Self {
        Self {transport, spill: VecDeque::new()}
    }
    pub fn transport(&self) -> &T {&self.transport}
    pub fn into_inner(self) -> T {self.transport}

    pub async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        trace!("send {}", data.escape_ascii());
        self.transport.write(data).await
    }
    /// discard everything received so far
    pub fn flush_input(&mut self) -> io::Result<()> {
        self.spill.clear();
        self.transport.flush_input()
    }
    /// number of bytes that can be read without waiting
    pub async fn waiting(&mut self) -> io::Result<usize> {
        Ok(self.spill.len() + self.transport.bytes_waiting().await?)
    }

    /**
        receive until the received data ends with `ending` or the deadline passes

        everything received is returned in both cases, the caller checks whether it ends as expected
    */
    pub async fn read_until(&mut self, ending: &[u8], deadline: Deadline) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        while ! data.ends_with(ending) {
            if self.spill.is_empty() && ! self.fill(deadline).await?
                {break}
            while let Some(byte) = self.spill.pop_front() {
                data.push(byte);
                if data.ends_with(ending)
                    {break}
            }
        }
        Ok(data)
    }
    /// receive `size` bytes, less if the deadline passes before
    pub async fn read_exact(&mut self, size: usize, deadline: Deadline) -> io::Result<Vec<u8>> {
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            if self.spill.is_empty() && ! self.fill(deadline).await?
                {break}
            let available = self.spill.len().min(size - data.len());
            data.extend(self.spill.drain(.. available));
        }
        Ok(data)
    }
    /// receive one byte, `None` if the deadline passes before
    pub async fn read_byte(&mut self, deadline: Deadline) -> io::Result<Option<u8>> {
        Ok(self.read_exact(1, deadline).await?.first().copied())
    }

    /// wait for more bytes from the transport, false if the deadline passed
    async fn fill(&mut self, deadline: Deadline) -> io::Result<bool> {
        let mut chunk = [0; CHUNK];
        let Some(received) = deadline.within(self.transport.read(&mut chunk)).await
            else {return Ok(false)};
        let received = received?;
        if received == 0
            {return Err(io::ErrorKind::UnexpectedEof.into())}
        trace!("receive {}", chunk[.. received].escape_ascii());
        self.spill.extend(&chunk[.. received]);
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;
    use super::*;
    use crate::transport::mock::MockDevice;

    fn soon() -> Deadline {Deadline::after(Duration::from_secs(1))}

    #[tokio::test(start_paused = true)]
    async fn read_until_keeps_what_follows() {
        let mut link = Link::new(MockDevice::new().fragment(64));
        // the raw mode request makes the device print its banner and prompt
        link.write(b"\r\x01").await.unwrap();
        let banner = link.read_until(b"exit\r\n", soon()).await.unwrap();
        assert_eq!(banner, b"raw REPL; CTRL-B to exit\r\n");
        assert_eq!(link.waiting().await.unwrap(), 1);
        assert_eq!(link.read_byte(soon()).await.unwrap(), Some(b'>'));
    }

    #[tokio::test(start_paused = true)]
    async fn read_until_timeout_returns_partial() {
        let mut link = Link::new(MockDevice::new().fragment(3));
        link.write(b"\r\x01").await.unwrap();
        let received = link.read_until(b"never sent", soon()).await.unwrap();
        assert_eq!(received, b"raw REPL; CTRL-B to exit\r\n>");
        assert_eq!(link.read_byte(soon()).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn read_exact_short_on_timeout() {
        let mut link = Link::new(MockDevice::new());
        link.write(b"\r\x01").await.unwrap();
        let received = link.read_exact(100, soon()).await.unwrap();
        assert_eq!(received.len(), 27);
        let received = link.read_exact(0, soon()).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_drops_spill() {
        let mut link = Link::new(MockDevice::new().fragment(64));
        link.write(b"\r\x01").await.unwrap();
        link.read_exact(4, soon()).await.unwrap();
        assert!(link.waiting().await.unwrap() > 0);
        link.flush_input().unwrap();
        assert_eq!(link.waiting().await.unwrap(), 0);
        assert_eq!(link.transport().flushes(), 1);
    }
}
