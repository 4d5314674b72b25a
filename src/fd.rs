use std::{
    fs::OpenOptions,
    io,
    os::{
        fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd},
        unix::fs::OpenOptionsExt as _,
    },
    path::Path,
};

use libc::O_NONBLOCK;
use tracing::debug;

use crate::{Canceller, Config, Error, Flow, Resource, monitor};

/// An open PSI trigger file descriptor.
///
/// Closed when dropped; the wait loops take it by value so every exit path
/// releases it exactly once.
#[derive(Debug)]
pub struct PsiFd {
    fd: OwnedFd,
}

impl PsiFd {
    /// Open the pressure file of `resource` for read-write in non-blocking mode.
    pub fn open(resource: Resource) -> io::Result<Self> {
        Self::open_path(resource.path())
    }

    pub(crate) fn open_path(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_NONBLOCK)
            .open(path)?;
        Ok(Self { fd: file.into() })
    }

    /// # Safety
    /// The provided `OwnedFd` must be a valid, armed PSI file descriptor.
    pub unsafe fn new_unchecked(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// Write the trigger line of `config` in a single `write(2)`.
    ///
    /// The kernel parses the whole line from one write, so a short write is
    /// an error rather than something to resume.
    pub fn arm(&self, config: &Config) -> io::Result<()> {
        let line = config.trigger();
        let written = nix::unistd::write(&self.fd, line.as_bytes())?;
        check_written(written, line.len())?;
        debug!(trigger = line.trim_end_matches('\0'), "psi trigger armed");
        Ok(())
    }

    /// Open and arm a trigger for `config`, mapping failures to session errors.
    pub(crate) fn for_config<E>(config: &Config) -> Result<Self, Error<E>> {
        Self::arm_at(config.resource.path(), config)
    }

    pub(crate) fn arm_at<E>(path: &Path, config: &Config) -> Result<Self, Error<E>> {
        config.validate()?;
        let fd = Self::open_path(path).map_err(|source| Error::Open {
            path: path.to_owned(),
            source,
        })?;
        fd.arm(config).map_err(Error::Write)?;
        Ok(fd)
    }

    /// Block on this descriptor, calling `callback` on every pressure event
    /// until it returns [`Flow::Stop`] or [`Flow::Fail`].
    pub fn watch<F, E>(self, callback: F) -> Result<(), Error<E>>
    where
        F: FnMut() -> Flow<E>,
    {
        monitor::run(monitor::Session::new(self, None), callback)
    }

    /// Like [`PsiFd::watch`], but also returns `Ok(())` once `canceller` fires.
    pub fn watch_until<F, E>(self, canceller: &Canceller, callback: F) -> Result<(), Error<E>>
    where
        F: FnMut() -> Flow<E>,
    {
        monitor::run(monitor::Session::new(self, Some(canceller)), callback)
    }
}

fn check_written(written: usize, expected: usize) -> io::Result<()> {
    if written != expected {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short trigger write: {written} of {expected} bytes"),
        ));
    }
    Ok(())
}

impl AsRawFd for PsiFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for PsiFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl From<PsiFd> for OwnedFd {
    fn from(value: PsiFd) -> Self {
        value.fd
    }
}
