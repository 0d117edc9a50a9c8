use std::{
    collections::VecDeque,
    io,
    path::Path,
    time::Duration,
    };
use serial2_tokio::{SerialPort, CharSize, StopBits, Parity, FlowControl};
use log::*;

use super::Transport;


/// uart connection to a device, through the OS serial port driver
pub struct SerialTransport {
    /// uart RX/TX stream
    port: SerialPort,
    /// bytes received while checking for available input, not read yet
    received: VecDeque<u8>,
}

impl SerialTransport {
    /// open the given serial port file with the given baud rate, 8 bits, no parity, one stop bit
    pub fn open(path: impl AsRef<Path>, rate: u32) -> io::Result<Self> {
        let path = path.as_ref();
        let port = SerialPort::open(path, |mut settings: serial2_tokio::Settings| {
                settings.set_raw();
                settings.set_baud_rate(rate)?;
                settings.set_char_size(CharSize::Bits8);
                settings.set_stop_bits(StopBits::One);
                settings.set_parity(Parity::None);
                settings.set_flow_control(FlowControl::None);
                Ok(settings)
                })?;
        debug!("opened {} at {} bauds", path.display(), rate);
        Ok(Self {
            port,
            received: VecDeque::new(),
        })
    }
}

impl Transport for SerialTransport {
    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        if self.received.is_empty() {
            return self.port.read(buffer).await
        }
        let size = buffer.len().min(self.received.len());
        for (dst, src) in buffer.iter_mut().zip(self.received.drain(.. size)) {
            *dst = src;
        }
        Ok(size)
    }
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }
    async fn bytes_waiting(&mut self) -> io::Result<usize> {
        let mut chunk = [0; 256];
        // a zero timeout still polls the read once, so it only collects what the driver already has
        if let Ok(received) = tokio::time::timeout(Duration::ZERO, self.port.read(&mut chunk)).await {
            self.received.extend(&chunk[.. received?]);
        }
        Ok(self.received.len())
    }
    fn flush_input(&mut self) -> io::Result<()> {
        self.received.clear();
        self.port.discard_input_buffer()
    }
}
