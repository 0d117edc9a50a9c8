use std::time::Duration;
use log::*;

use crate::{
    protocol::*,
    transport::Transport,
    utils::Deadline,
    window::Window,
    };
use super::{
    Error, Output, RawPastePolicy, Session, State,
    paste,
    };


/// device waiting at its raw prompt, obtained with [Session::enter_raw_repl]
pub(super) struct RawRepl<'s, T> {
    session: &'s mut Session<T>,
}
/// program sent, its output is about to come
pub(super) struct Submitted<'s, T> {
    session: &'s mut Session<T>,
}
/// output received, the device is still in raw mode
pub(super) struct Completed<'s, T> {
    session: &'s mut Session<T>,
}


impl<T: Transport> Session<T> {
    /// interrupt whatever runs on the device and bring it to a clean raw prompt
    pub(super) async fn enter_raw_repl(&mut self) -> Result<RawRepl<'_, T>, Error> {
        self.advance(State::EnteringRaw);
        self.link.write(INTERRUPT).await?;
        self.link.flush_input()?;
        self.link.write(ENTER_RAW).await?;
        self.expect_banner(RAW_BANNER_PROMPT).await?;
        // soft reboot for a clean interpreter, it announces raw mode again afterwards
        self.link.write(SOFT_REBOOT).await?;
        self.expect_banner(SOFT_REBOOT_BANNER).await?;
        self.expect_banner(RAW_BANNER).await?;
        debug!("entered raw repl");
        Ok(RawRepl {session: self})
    }
    async fn expect_banner(&mut self, banner: &[u8]) -> Result<(), Error> {
        let received = self.link.read_until(banner, self.handshake()).await?;
        if ! received.ends_with(banner) {
            debug!("expected {:?}, received {:?}", banner.escape_ascii(), received.escape_ascii());
            return Err(Error::RawReplEntryFailed {received})
        }
        Ok(())
    }
    fn handshake(&self) -> Deadline {
        Deadline::after(self.config.handshake_timeout)
    }
}

impl<'s, T: Transport> RawRepl<'s, T> {
    /// send the program, in raw-paste mode if the device supports it
    pub async fn exec_raw(self, program: &[u8]) -> Result<Submitted<'s, T>, Error> {
        let session = self.session;
        let received = session.link.read_until(PROMPT, session.handshake()).await?;
        if ! received.ends_with(PROMPT)
            {return Err(Error::NoPrompt {received})}

        session.advance(State::Negotiating);
        session.link.write(RAW_PASTE_INIT).await?;
        let status = session.link.read_exact(NEGOTIATION_SIZE, session.handshake()).await?;
        let Ok(status) = <[u8; NEGOTIATION_SIZE]>::try_from(status.as_slice())
            else {return Err(Error::RawPasteUnsupported {received: status})};

        match Negotiation::decode(status) {
            Negotiation::Supported => {
                let header = session.link.read_exact(WINDOW_HEADER_SIZE, session.handshake()).await?;
                let size = match <[u8; WINDOW_HEADER_SIZE]>::try_from(header.as_slice()) {
                    Ok(header) if window_size(header) != 0 => window_size(header),
                    _ => return Err(Error::RawPasteUnsupported {received: [status.as_slice(), header.as_slice()].concat()}),
                };
                debug!("raw paste with window of {} bytes", size);
                session.advance(State::Transferring);
                let transfer = paste::write_windowed(&mut session.link, Window::new(size), program, &session.config).await?;
                if let paste::Transfer::Ended {sent} = transfer {
                    debug!("device ended raw paste after {} of {} bytes", sent, program.len());
                }
            },
            Negotiation::Refused => {
                session.fall_back(status.to_vec())?;
                session.advance(State::Transferring);
                paste::write_plain(&mut session.link, program, &session.config).await?;
            },
            Negotiation::Unknown => {
                session.fall_back(status.to_vec())?;
                // the device took the request as garbage and reprinted the raw banner, whose start was read as status
                let received = session.link.read_until(LEGACY_BANNER_TAIL, session.handshake()).await?;
                if ! received.ends_with(LEGACY_BANNER_TAIL) {
                    return Err(Error::RawReplEntryFailed {received: [status.as_slice(), received.as_slice()].concat()})
                }
                session.advance(State::Transferring);
                paste::write_plain(&mut session.link, program, &session.config).await?;
            },
        }
        session.advance(State::AwaitingOutput);
        Ok(Submitted {session})
    }
}

impl<T: Transport> Session<T> {
    /// check plain raw mode is allowed when raw paste is not available
    fn fall_back(&self, received: Vec<u8>) -> Result<(), Error> {
        match self.config.raw_paste {
            RawPastePolicy::Require => Err(Error::RawPasteUnsupported {received}),
            RawPastePolicy::Prefer => {
                warn!("device does not support raw paste (answered {:?}), using plain raw repl", received.escape_ascii());
                Ok(())
            },
        }
    }
}

impl<'s, T: Transport> Submitted<'s, T> {
    /// capture the standard and error outputs of the program, each one must end before `timeout`
    pub async fn follow(self, timeout: Duration) -> Result<(Output, Completed<'s, T>), Error> {
        let session = self.session;
        let mut stdout = session.link.read_until(&[END_OF_DATA], Deadline::after(timeout)).await?;
        if ! stdout.ends_with(&[END_OF_DATA]) {
            return Err(Error::Timeout {
                waiting_for: "first stream",
                stdout,
                stderr: Vec::new(),
                })
        }
        stdout.pop();
        let mut stderr = session.link.read_until(&[END_OF_DATA], Deadline::after(timeout)).await?;
        if ! stderr.ends_with(&[END_OF_DATA]) {
            return Err(Error::Timeout {
                waiting_for: "second stream",
                stdout,
                stderr,
                })
        }
        stderr.pop();
        debug!("program output {} bytes, {} bytes of error", stdout.len(), stderr.len());
        Ok((Output {stdout, stderr}, Completed {session}))
    }
}

impl<T: Transport> Completed<'_, T> {
    /// return the device to its normal REPL, without waiting for it
    pub async fn exit_raw_repl(self) -> Result<(), Error> {
        self.session.advance(State::ExitingRaw);
        self.session.link.write(EXIT_RAW).await?;
        self.session.advance(State::Idle);
        Ok(())
    }
}
