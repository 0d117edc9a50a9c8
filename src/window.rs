/*!
    credit accounting of the raw-paste flow control

    the device announces a window size at negotiation, the host may then send that many bytes before waiting for a credit grant. Each grant refills a full window.
*/

/// credits available to send during one raw-paste transfer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Window {
    size: u16,
    remain: u16,
}
/// a credit grant would not fit the 16 bit counter
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Overflow;

impl Window {
    /// full window as negotiated
    pub fn new(size: u16) -> Self {
        Self {size, remain: size}
    }
    /// window size negotiated with the device
    pub fn size(&self) -> u16 {self.size}
    /// number of bytes that can be sent right now
    pub fn remain(&self) -> u16 {self.remain}
    pub fn is_exhausted(&self) -> bool {self.remain == 0}

    /// a credit grant arrived
    ///
    /// grants can come in bursts, so the remaining credit can exceed the window size
    pub fn grant(&mut self) -> Result<(), Overflow> {
        self.remain = self.remain.checked_add(self.size).ok_or(Overflow)?;
        Ok(())
    }
    /// reserve credits for at most `wanted` bytes, returns the amount that can be sent
    pub fn take(&mut self, wanted: usize) -> usize {
        let taken = self.remain.min(u16::try_from(wanted).unwrap_or(u16::MAX));
        self.remain -= taken;
        usize::from(taken)
    }
}
