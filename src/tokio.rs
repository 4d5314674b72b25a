use std::io;

use tokio::io::{Interest, unix::AsyncFd};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Config, Error, Flow, PsiFd, monitor::dispatch};

impl PsiFd {
    /// Wait for pressure events on tokio's reactor, calling `callback` for
    /// each one until it returns [`Flow::Stop`] or [`Flow::Fail`], or until
    /// `cancel` fires.
    ///
    /// Must be called within a runtime with IO enabled.
    pub async fn watch_async<F, E>(
        self,
        cancel: &CancellationToken,
        mut callback: F,
    ) -> Result<(), Error<E>>
    where
        F: FnMut() -> Flow<E>,
    {
        let fd = AsyncFd::try_with_interest(self, Interest::PRIORITY)
            .map_err(|e| Error::Wait(e.into()))?;
        let mut dispatched: u64 = 0;
        loop {
            let ready = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(dispatched, "psi monitor cancelled");
                    return Ok(());
                }
                ready = fd.ready(Interest::PRIORITY) => ready,
            };
            let mut guard = ready.map_err(Error::Wait)?;
            let ready = guard.ready();
            if ready.is_error() || ready.is_read_closed() {
                debug!(dispatched, "psi event source is gone");
                return Err(Error::Wait(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "psi event source is gone",
                )));
            }
            guard.clear_ready();

            if let Some(end) = dispatch(&mut callback, &mut dispatched) {
                return end;
            }
        }
    }
}

/// Async [`crate::monitor_until`]: set up the trigger described by `config`
/// and call `callback` on every event without blocking the runtime.
///
/// Dropping the returned future also ends the session and closes the
/// descriptor.
pub async fn monitor_async<F, E>(
    config: Config,
    cancel: &CancellationToken,
    callback: F,
) -> Result<(), Error<E>>
where
    F: FnMut() -> Flow<E>,
{
    debug!(explain = config.explain().trim_end(), "starting psi monitor");
    PsiFd::for_config(&config)?.watch_async(cancel, callback).await
}
