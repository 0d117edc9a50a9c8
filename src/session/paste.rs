use crate::{
    protocol::*,
    transport::Transport,
    utils::Deadline,
    window::Window,
    };
use super::{Config, Error, link::Link};


/// how a program transfer ended
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Transfer {
    /// the whole body was sent and acknowledged
    Complete,
    /// the device ended the transfer after that many bytes
    Ended {sent: usize},
}

/**
    send a program body in raw-paste mode

    the device grants credit by windows, so we never send more than it has room for. It can also end the transfer at any point, in which case we acknowledge and stop sending.
*/
pub(super) async fn write_windowed<T: Transport>(
    link: &mut Link<T>,
    mut window: Window,
    body: &[u8],
    config: &Config,
    ) -> Result<Transfer, Error>
{
    let deadline = Deadline::after(config.transfer_timeout);
    let mut sent = 0;
    while sent < body.len() {
        // process what the device said before sending more
        while window.is_exhausted() || link.waiting().await? != 0 {
            let Some(byte) = link.read_byte(deadline).await?
                else {return Err(Error::Timeout {
                    waiting_for: "credit grant",
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    })};
            match byte {
                CREDIT_GRANT => window.grant().map_err(|_| Error::CreditOverflow)?,
                ABRUPT_END => {
                    link.write(&[END_OF_DATA]).await?;
                    return Ok(Transfer::Ended {sent})
                },
                other => return Err(Error::UnexpectedDuringTransfer(other)),
            }
        }
        let size = window.take(body.len() - sent);
        link.write(&body[sent ..][.. size]).await?;
        sent += size;
    }
    link.write(&[END_OF_DATA]).await?;
    let received = link.read_until(&[END_OF_DATA], Deadline::after(config.handshake_timeout)).await?;
    if ! received.ends_with(&[END_OF_DATA])
        {return Err(Error::TransferNotAcknowledged {received})}
    Ok(Transfer::Complete)
}

/// send a program body in plain raw mode, paced since the device has no flow control there
pub(super) async fn write_plain<T: Transport>(
    link: &mut Link<T>,
    body: &[u8],
    config: &Config,
    ) -> Result<(), Error>
{
    for chunk in body.chunks(config.plain_chunk.max(1)) {
        link.write(chunk).await?;
        tokio::time::sleep(config.plain_chunk_delay).await;
    }
    link.write(&[END_OF_DATA]).await?;
    let received = link.read_exact(PLAIN_ACCEPTED.len(), Deadline::after(config.handshake_timeout)).await?;
    if received != PLAIN_ACCEPTED
        {return Err(Error::ExecNotAccepted {received})}
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        protocol,
        transport::mock::{MockDevice, Fault},
        };

    /// link to a device already negotiated in raw-paste mode
    async fn negotiated(device: MockDevice) -> Link<MockDevice> {
        let mut link = Link::new(device);
        link.write(b"\r\x01").await.unwrap();
        link.write(protocol::RAW_PASTE_INIT).await.unwrap();
        link.flush_input().unwrap();
        link
    }
    fn program(size: usize) -> Vec<u8> {
        (0 .. size).map(|i| b'a' + (i % 26) as u8).collect()
    }
    fn sent(link: &Link<MockDevice>) -> &[u8] {
        // strip raw mode request, raw paste request, and end of data
        let written = link.transport().written();
        &written[5 .. written.len() - 1]
    }

    #[tokio::test(start_paused = true)]
    async fn sends_everything_within_credit() {
        for size in [0, 1, 63, 64, 65, 128, 200, 64*5+3] {
            let mut link = negotiated(MockDevice::new().window(64)).await;
            let body = program(size);
            let transfer = write_windowed(&mut link, Window::new(64), &body, &Config::default()).await.unwrap();
            assert_eq!(transfer, Transfer::Complete);
            assert_eq!(sent(&link), body, "body of {} bytes", size);
            assert_eq!(link.transport().written().last(), Some(&END_OF_DATA));
            assert_eq!(link.transport().credit_violations(), 0);
            assert_eq!(link.transport().programs(), &[body]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_grants() {
        // the device grants a window every 10 bytes received
        let mut link = negotiated(MockDevice::new().window(32).grant_every(10).fragment(1)).await;
        let body = program(500);
        let transfer = write_windowed(&mut link, Window::new(32), &body, &Config::default()).await.unwrap();
        assert_eq!(transfer, Transfer::Complete);
        assert_eq!(sent(&link), body);
        assert_eq!(link.transport().credit_violations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abrupt_end_at_any_point() {
        let body = program(300);
        for after in [1, 50, 63, 64, 65, 128, 250] {
            let mut link = negotiated(MockDevice::new().window(64).fault(Fault::AbortAfter(after))).await;
            let transfer = write_windowed(&mut link, Window::new(64), &body, &Config::default()).await.unwrap();
            let Transfer::Ended {sent} = transfer
                else {panic!("transfer not ended after {} bytes", after)};
            // the end is noticed at the next send boundary, never after the current window
            assert!(sent >= after && sent <= after.next_multiple_of(64), "ended at {} sent {}", after, sent);
            assert_eq!(link.transport().abort_acks(), 1);
            assert_eq!(link.transport().written().last(), Some(&END_OF_DATA));
            assert_eq!(link.transport().programs(), &[body[.. after].to_vec()]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abrupt_end_after_last_byte() {
        // the end marker we send acknowledges the device's end as well
        let body = program(40);
        let mut link = negotiated(MockDevice::new().window(64).fault(Fault::AbortAfter(40))).await;
        let transfer = write_windowed(&mut link, Window::new(64), &body, &Config::default()).await.unwrap();
        assert_eq!(transfer, Transfer::Complete);
        assert_eq!(link.transport().abort_acks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_byte() {
        let mut link = negotiated(MockDevice::new().window(64).fault(Fault::StrayByte {after: 20, byte: b'x'})).await;
        let result = write_windowed(&mut link, Window::new(64), &program(200), &Config::default()).await;
        assert!(matches!(result, Err(Error::UnexpectedDuringTransfer(b'x'))), "{:?}", result);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_acknowledgement() {
        let mut link = negotiated(MockDevice::new().fault(Fault::NoAcknowledge)).await;
        let result = write_windowed(&mut link, Window::new(128), &program(10), &Config::default()).await;
        assert!(matches!(result, Err(Error::TransferNotAcknowledged {..})), "{:?}", result);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_credit() {
        // device announces a larger window than it will ever grant
        let mut link = negotiated(MockDevice::new().window(64).grant_every(1000)).await;
        let result = write_windowed(&mut link, Window::new(64), &program(100), &Config::default()).await;
        assert!(matches!(result, Err(Error::Timeout {waiting_for: "credit grant", ..})), "{:?}", result);
        // raw mode request, raw paste request and one window
        assert_eq!(link.transport().written().len(), 5 + 64);
    }

    #[tokio::test(start_paused = true)]
    async fn plain_mode() {
        let mut link = Link::new(MockDevice::new());
        link.write(b"\r\x01").await.unwrap();
        link.flush_input().unwrap();
        let body = program(1000);
        write_plain(&mut link, &body, &Config::default()).await.unwrap();
        assert_eq!(link.transport().programs(), &[body]);

        let mut link = Link::new(MockDevice::new().fault(Fault::RejectPlain));
        link.write(b"\r\x01").await.unwrap();
        link.flush_input().unwrap();
        let result = write_plain(&mut link, &program(10), &Config::default()).await;
        assert!(matches!(result, Err(Error::ExecNotAccepted {..})), "{:?}", result);
    }
}
