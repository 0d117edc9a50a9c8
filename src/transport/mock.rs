/*!
    in-memory device answering like a micropython board

    The device reacts synchronously to what the host writes, its answers are then available to read. When nothing is left to read, a read waits forever so the host's deadlines decide what happens, which is instantaneous under a paused tokio clock.

    Faults can be scripted to exercise every failure path of a session, and everything the host sent is recorded for inspection.
*/

use std::{
    collections::VecDeque,
    future::pending,
    io,
    };
use log::*;

use crate::protocol::*;
use super::Transport;


/// banners the device prints while the host enters raw mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Banner {
    /// answer to raw mode request
    Entry,
    /// answer to soft reboot
    SoftReboot,
    /// raw mode announced again after reboot
    Reentry,
}

/// how the device answers a raw-paste request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PasteSupport {
    Supported,
    /// understood, but disabled
    Refused,
    /// old firmware, reprints the raw banner
    Unknown,
}

/// misbehaviours the device can be scripted with
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// the banner is sent with garbled content
    CorruptBanner(Banner),
    /// the banner is never sent
    MuteBanner(Banner),
    /// no prompt after the raw banner following reboot
    DropPrompt,
    /// send this byte once that many program bytes were received during raw paste
    StrayByte {after: usize, byte: u8},
    /// end the raw paste transfer once that many program bytes were received
    AbortAfter(usize),
    /// never acknowledge the end of a raw paste transfer
    NoAcknowledge,
    /// never output anything after execution
    HangOutput,
    /// output stdout but never terminate stderr
    HangSecondStream,
    /// do not accept programs in plain raw mode
    RejectPlain,
}

type Program = Box<dyn FnMut(&[u8]) -> (Vec<u8>, Vec<u8>) + Send>;

/// interpreter mode of the simulated device
enum Mode {
    /// normal interactive REPL
    Friendly,
    /// raw REPL, accumulating a plain program body
    Raw {body: Vec<u8>},
    /// matching the raw-paste request, `matched` bytes received so far
    Negotiating {matched: usize, body: Vec<u8>},
    /// receiving a program under flow control
    Pasting {received: Vec<u8>, budget: usize, since_grant: usize},
    /// transfer ended by the device, waiting for the host acknowledgement
    Aborted {received: Vec<u8>},
}

/// scripted device
pub struct MockDevice {
    window: u16,
    grant_every: usize,
    paste: PasteSupport,
    fragment: usize,
    faults: Vec<Fault>,
    program: Program,

    mode: Mode,
    /// answers not read yet by the host
    outgoing: VecDeque<u8>,

    written: Vec<u8>,
    programs: Vec<Vec<u8>>,
    entries: usize,
    reboots: usize,
    exits: usize,
    flushes: usize,
    abort_acks: usize,
    credit_violations: usize,
}

impl Default for MockDevice {
    fn default() -> Self {Self::new()}
}

impl MockDevice {
    /// device supporting raw paste with a window of 128 bytes, running every program silently
    pub fn new() -> Self {
        Self {
            window: 128,
            grant_every: 128,
            paste: PasteSupport::Supported,
            fragment: 16,
            faults: Vec::new(),
            program: Box::new(|_| (Vec::new(), Vec::new())),

            mode: Mode::Friendly,
            outgoing: VecDeque::new(),

            written: Vec::new(),
            programs: Vec::new(),
            entries: 0,
            reboots: 0,
            exits: 0,
            flushes: 0,
            abort_acks: 0,
            credit_violations: 0,
        }
    }
    /// raw-paste window announced, credits are then granted each time a full window is received
    pub fn window(mut self, size: u16) -> Self {
        self.window = size;
        self.grant_every = usize::from(size).max(1);
        self
    }
    /// grant credit each time that many bytes are received, less than the window makes bursts
    pub fn grant_every(mut self, bytes: usize) -> Self {
        self.grant_every = bytes.max(1);
        self
    }
    pub fn paste(mut self, support: PasteSupport) -> Self {
        self.paste = support;
        self
    }
    /// maximum number of bytes returned by one read
    pub fn fragment(mut self, size: usize) -> Self {
        self.fragment = size.max(1);
        self
    }
    pub fn fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }
    /// every program outputs the given streams
    pub fn responding(self, stdout: &[u8], stderr: &[u8]) -> Self {
        let (stdout, stderr) = (stdout.to_vec(), stderr.to_vec());
        self.running(move |_| (stdout.clone(), stderr.clone()))
    }
    /// compute the output streams from the received program
    pub fn running(mut self, program: impl FnMut(&[u8]) -> (Vec<u8>, Vec<u8>) + Send + 'static) -> Self {
        self.program = Box::new(program);
        self
    }

    /// everything the host wrote so far
    pub fn written(&self) -> &[u8] {&self.written}
    /// program bodies received and executed
    pub fn programs(&self) -> &[Vec<u8>] {&self.programs}
    /// number of times raw mode was requested
    pub fn entries(&self) -> usize {self.entries}
    pub fn reboots(&self) -> usize {self.reboots}
    /// number of times raw mode was left
    pub fn exits(&self) -> usize {self.exits}
    /// number of times the host discarded its input
    pub fn flushes(&self) -> usize {self.flushes}
    /// number of abrupt ends the host acknowledged
    pub fn abort_acks(&self) -> usize {self.abort_acks}
    /// number of program bytes received beyond the credit granted
    pub fn credit_violations(&self) -> usize {self.credit_violations}

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }
    fn send(&mut self, data: &[u8]) {
        self.outgoing.extend(data);
    }
    fn banner(&mut self, banner: Banner, text: &[u8]) {
        if self.has(Fault::MuteBanner(banner))
            {return}
        if self.has(Fault::CorruptBanner(banner)) {
            self.send(&text[.. text.len() / 2]);
            self.send(b"#~ garbage ~#");
        }
        else {
            self.send(text);
        }
    }
    /// run a program and print its output as the raw REPL does
    fn execute(&mut self, body: Vec<u8>) {
        let (stdout, stderr) = (self.program)(&body);
        self.programs.push(body);
        if self.has(Fault::HangOutput)
            {return}
        self.send(&stdout);
        self.send(&[END_OF_DATA]);
        self.send(&stderr);
        if self.has(Fault::HangSecondStream)
            {return}
        self.send(&[END_OF_DATA]);
        self.send(PROMPT);
    }

    fn step(&mut self, mode: Mode, byte: u8) -> Mode {
        match mode {
            Mode::Friendly => match byte {
                0x01 => self.enter_raw(),
                0x03 => {
                    self.send(b"\r\nKeyboardInterrupt: \r\n>>> ");
                    Mode::Friendly
                },
                _ => Mode::Friendly,
            },
            Mode::Raw {mut body} => match byte {
                0x01 => self.enter_raw(),
                0x02 => {
                    self.exits += 1;
                    self.send(b"\r\nMicroPython v1.22.0 on 2024-01-01; Raspberry Pi Pico with RP2040\r\n>>> ");
                    Mode::Friendly
                },
                0x03 => Mode::Raw {body: Vec::new()},
                0x04 if body.is_empty() => {
                    self.reboots += 1;
                    self.banner(Banner::SoftReboot, b"MPY: soft reboot\r\n");
                    if !self.has(Fault::MuteBanner(Banner::Reentry)) {
                        self.banner(Banner::Reentry, RAW_BANNER);
                        if !self.has(Fault::DropPrompt)
                            {self.send(PROMPT)}
                    }
                    Mode::Raw {body}
                },
                0x04 => {
                    if self.has(Fault::RejectPlain) {
                        self.send(b"??");
                    }
                    else {
                        self.send(PLAIN_ACCEPTED);
                        self.execute(body);
                    }
                    Mode::Raw {body: Vec::new()}
                },
                0x05 => Mode::Negotiating {matched: 1, body},
                _ => {
                    body.push(byte);
                    Mode::Raw {body}
                },
            },
            Mode::Negotiating {matched, mut body} => {
                if byte != RAW_PASTE_INIT[matched] {
                    // not a raw-paste request after all
                    body.extend_from_slice(&RAW_PASTE_INIT[.. matched]);
                    return self.step(Mode::Raw {body}, byte)
                }
                if matched + 1 < RAW_PASTE_INIT.len()
                    {return Mode::Negotiating {matched: matched + 1, body}}
                match self.paste {
                    PasteSupport::Supported => {
                        let window = self.window.to_le_bytes();
                        self.send(b"R\x01");
                        self.send(&window);
                        Mode::Pasting {
                            received: Vec::new(),
                            budget: usize::from(self.window),
                            since_grant: 0,
                        }
                    },
                    PasteSupport::Refused => {
                        self.send(b"R\x00");
                        Mode::Raw {body: Vec::new()}
                    },
                    PasteSupport::Unknown => {
                        self.send(RAW_BANNER_PROMPT);
                        Mode::Raw {body: Vec::new()}
                    },
                }
            },
            Mode::Pasting {mut received, mut budget, mut since_grant} => {
                if byte == END_OF_DATA {
                    if self.has(Fault::NoAcknowledge)
                        {return Mode::Raw {body: Vec::new()}}
                    self.send(&[END_OF_DATA]);
                    self.execute(received);
                    return Mode::Raw {body: Vec::new()}
                }
                received.push(byte);
                since_grant += 1;
                if received.len() > budget {
                    warn!("received {} program bytes with only {} credited", received.len(), budget);
                    self.credit_violations += 1;
                }
                let stray = self.faults.iter().find_map(|fault| match *fault {
                    Fault::StrayByte {after, byte: stray} if after == received.len() => Some(stray),
                    _ => None,
                    });
                if let Some(stray) = stray {
                    self.send(&[stray]);
                }
                if self.has(Fault::AbortAfter(received.len())) {
                    self.send(&[ABRUPT_END]);
                    return Mode::Aborted {received}
                }
                if since_grant == self.grant_every {
                    self.send(&[CREDIT_GRANT]);
                    budget += usize::from(self.window);
                    since_grant = 0;
                }
                Mode::Pasting {received, budget, since_grant}
            },
            Mode::Aborted {received} => {
                if byte != END_OF_DATA
                    {return Mode::Aborted {received}}
                self.abort_acks += 1;
                self.execute(received);
                Mode::Raw {body: Vec::new()}
            },
        }
    }
    fn enter_raw(&mut self) -> Mode {
        self.entries += 1;
        self.banner(Banner::Entry, RAW_BANNER_PROMPT);
        Mode::Raw {body: Vec::new()}
    }
}

impl Transport for MockDevice {
    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        if self.outgoing.is_empty() {
            // a real device would stay silent, let the caller's deadline decide
            return pending().await
        }
        let size = buffer.len().min(self.fragment).min(self.outgoing.len());
        for (dst, src) in buffer.iter_mut().zip(self.outgoing.drain(.. size)) {
            *dst = src;
        }
        Ok(size)
    }
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(data);
        for &byte in data {
            let mode = std::mem::replace(&mut self.mode, Mode::Friendly);
            self.mode = self.step(mode, byte);
        }
        Ok(())
    }
    async fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.outgoing.len())
    }
    fn flush_input(&mut self) -> io::Result<()> {
        self.flushes += 1;
        self.outgoing.clear();
        Ok(())
    }
}
