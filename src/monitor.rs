use std::{
    io,
    os::fd::{AsFd, BorrowedFd},
    sync::Arc,
};

use nix::{
    poll::{PollFd, PollFlags, PollTimeout, poll},
    sys::eventfd::{EfdFlags, EventFd},
};
use tracing::{debug, trace};

use crate::{Config, Error, PsiFd};

/// What the wait loop does after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow<E> {
    /// Keep waiting for the next event.
    Continue,
    /// End the session successfully.
    Stop,
    /// End the session with this error.
    Fail(E),
}

impl<E> From<Result<(), E>> for Flow<E> {
    fn from(value: Result<(), E>) -> Self {
        match value {
            Ok(()) => Self::Continue,
            Err(e) => Self::Fail(e),
        }
    }
}

/// Cancels sessions started with [`monitor_until`] or [`PsiFd::watch_until`]
/// from outside the callback.
///
/// Clones share the same underlying eventfd. Once cancelled it stays
/// cancelled, and every session watching it ends with `Ok(())` before
/// dispatching another event.
#[derive(Clone)]
pub struct Canceller {
    efd: Arc<EventFd>,
}

impl Canceller {
    pub fn new() -> io::Result<Self> {
        let efd = EventFd::from_flags(EfdFlags::EFD_NONBLOCK | EfdFlags::EFD_CLOEXEC)?;
        Ok(Self { efd: Arc::new(efd) })
    }

    /// Wake every session watching this canceller and make them return.
    pub fn cancel(&self) -> io::Result<()> {
        _ = self.efd.write(1)?;
        Ok(())
    }

    /// Returns `true` once [`Canceller::cancel`] has been called.
    pub fn is_cancelled(&self) -> io::Result<bool> {
        let mut fds = [PollFd::new(self.as_fd(), PollFlags::POLLIN)];
        Ok(poll(&mut fds, PollTimeout::ZERO)? > 0)
    }
}

impl AsFd for Canceller {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.efd.as_fd()
    }
}

pub(crate) enum Wake {
    Pressure,
    Cancelled,
}

/// Something the wait loop can block on.
pub(crate) trait Readiness {
    fn wait(&mut self) -> io::Result<Wake>;
}

pub(crate) struct Session<'a> {
    fd: PsiFd,
    canceller: Option<&'a Canceller>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(fd: PsiFd, canceller: Option<&'a Canceller>) -> Self {
        Self { fd, canceller }
    }
}

impl Readiness for Session<'_> {
    fn wait(&mut self) -> io::Result<Wake> {
        let psi = self.fd.as_fd();
        // without a canceller the second slot is never polled
        let (cancel, n) = match self.canceller {
            Some(c) => (c.as_fd(), 2),
            None => (psi, 1),
        };
        let mut fds = [
            PollFd::new(psi, PollFlags::POLLPRI),
            PollFd::new(cancel, PollFlags::POLLIN),
        ];
        loop {
            poll(&mut fds[..n], PollTimeout::NONE)?;

            if n == 2
                && fds[1]
                    .revents()
                    .is_some_and(|r| r.contains(PollFlags::POLLIN))
            {
                return Ok(Wake::Cancelled);
            }
            let revents = fds[0].revents().unwrap_or(PollFlags::empty());
            // the trigger is gone, e.g. its cgroup was removed
            if revents.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL | PollFlags::POLLHUP) {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    format!("psi event source is gone ({revents:?})"),
                ));
            }
            if revents.contains(PollFlags::POLLPRI) {
                return Ok(Wake::Pressure);
            }
        }
    }
}

/// Drive `callback` off `source` until the callback or the source ends the
/// session. `source` is dropped exactly once on every return path.
pub(crate) fn run<R, F, E>(mut source: R, mut callback: F) -> Result<(), Error<E>>
where
    R: Readiness,
    F: FnMut() -> Flow<E>,
{
    let mut dispatched: u64 = 0;
    loop {
        match source.wait() {
            Ok(Wake::Pressure) => {}
            Ok(Wake::Cancelled) => {
                debug!(dispatched, "psi monitor cancelled");
                return Ok(());
            }
            Err(e) => {
                debug!(dispatched, error = %e, "psi wait failed");
                return Err(Error::Wait(e));
            }
        }

        if let Some(end) = dispatch(&mut callback, &mut dispatched) {
            return end;
        }
    }
}

/// Run the callback for one event; `Some` ends the session with that result.
pub(crate) fn dispatch<F, E>(callback: &mut F, dispatched: &mut u64) -> Option<Result<(), Error<E>>>
where
    F: FnMut() -> Flow<E>,
{
    *dispatched += 1;
    trace!(dispatched = *dispatched, "psi threshold crossed");
    match callback() {
        Flow::Continue => None,
        Flow::Stop => {
            debug!(dispatched = *dispatched, "psi monitor stopped by callback");
            Some(Ok(()))
        }
        Flow::Fail(e) => {
            debug!(dispatched = *dispatched, "psi callback failed");
            Some(Err(Error::Callback(e)))
        }
    }
}

/// Invoke `callback` every time the pressure described by `config` crosses
/// its threshold.
///
/// Blocks the calling thread until the callback returns [`Flow::Stop`]
/// (`Ok(())`) or [`Flow::Fail`], or until setting up or waiting on the
/// trigger fails.
pub fn monitor<F, E>(config: Config, callback: F) -> Result<(), Error<E>>
where
    F: FnMut() -> Flow<E>,
{
    debug!(explain = config.explain().trim_end(), "starting psi monitor");
    PsiFd::for_config(&config)?.watch(callback)
}

/// [`monitor`] that also returns `Ok(())` once `canceller` is cancelled.
pub fn monitor_until<F, E>(config: Config, canceller: &Canceller, callback: F) -> Result<(), Error<E>>
where
    F: FnMut() -> Flow<E>,
{
    debug!(explain = config.explain().trim_end(), "starting psi monitor");
    PsiFd::for_config(&config)?.watch_until(canceller, callback)
}
