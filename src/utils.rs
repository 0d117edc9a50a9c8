use std::{
    future::Future,
    time::Duration,
    };
use tokio::time::{Instant, timeout_at};


/**
    bound on the duration of an operation

    the instant is fixed when the operation starts, so partial progress never extends it
*/
#[derive(Copy, Clone, Debug)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }
    /// run the given future until completion or until the deadline, `None` if the deadline came first
    pub async fn within<F: Future>(&self, future: F) -> Option<F::Output> {
        timeout_at(self.0, future).await.ok()
    }
}
