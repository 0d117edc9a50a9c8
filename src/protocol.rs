/*!
    bytes exchanged with the device interpreter

    these must match the device firmware exactly, the banners are matched as suffixes of what was received since the corresponding request
*/

/// abort any running program
pub const INTERRUPT: &[u8] = b"\r\x03\x03";
/// request raw REPL
pub const ENTER_RAW: &[u8] = b"\r\x01";
/// restart the interpreter in a clean state, only meaningful on an empty raw prompt
pub const SOFT_REBOOT: &[u8] = b"\x04";
/// ask the device for raw-paste mode
pub const RAW_PASTE_INIT: &[u8] = b"\x05A\x01";
/// return the device to its normal REPL
pub const EXIT_RAW: &[u8] = b"\r\x02";

/// device gives one more window of credit during raw paste
pub const CREDIT_GRANT: u8 = 0x01;
/// device stops the raw paste transfer early
pub const ABRUPT_END: u8 = 0x04;
/// end of program body, also terminates each output stream
pub const END_OF_DATA: u8 = 0x04;

/// answer to [ENTER_RAW]
pub const RAW_BANNER_PROMPT: &[u8] = b"raw REPL; CTRL-B to exit\r\n>";
/// answer to [SOFT_REBOOT]
pub const SOFT_REBOOT_BANNER: &[u8] = b"soft reboot\r\n";
/// raw mode announced again after a soft reboot, the prompt is checked separately
pub const RAW_BANNER: &[u8] = b"raw REPL; CTRL-B to exit\r\n";
/// raw REPL prompt
pub const PROMPT: &[u8] = b">";
/// end of the raw banner reprinted by firmwares not knowing raw-paste, the first two bytes were taken as negotiation status
pub const LEGACY_BANNER_TAIL: &[u8] = b"w REPL; CTRL-B to exit\r\n>";
/// answer of the plain raw REPL once a program body is accepted
pub const PLAIN_ACCEPTED: &[u8] = b"OK";


/// size of the device answer to [RAW_PASTE_INIT]
pub const NEGOTIATION_SIZE: usize = 2;
/// size of the window header following a positive negotiation
pub const WINDOW_HEADER_SIZE: usize = 2;

/// device answer to [RAW_PASTE_INIT]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Negotiation {
    /// raw paste available, the window size follows
    Supported,
    /// command understood but raw paste is disabled on this device
    Refused,
    /// firmware does not know the command
    Unknown,
}
impl Negotiation {
    pub fn decode(status: [u8; NEGOTIATION_SIZE]) -> Self {
        match &status {
            b"R\x01" => Self::Supported,
            b"R\x00" => Self::Refused,
            _ => Self::Unknown,
        }
    }
}

/// window size sent by the device after a positive negotiation
pub fn window_size(header: [u8; WINDOW_HEADER_SIZE]) -> u16 {
    u16::from_le_bytes(header)
}
