use std::{io, path::PathBuf};

use crate::ConfigError;

/// Errors that end a monitoring session.
///
/// `E` is the error type the callback fails with.
#[derive(thiserror::Error, Debug)]
pub enum Error<E> {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write trigger: {0}")]
    Write(#[source] io::Error),
    #[error("failed to wait for pressure event: {0}")]
    Wait(#[source] io::Error),
    #[error(transparent)]
    Callback(E),
}

impl<E> Error<E> {
    /// Returns the callback's error if the session failed in the callback.
    pub fn into_callback(self) -> Option<E> {
        match self {
            Self::Callback(e) => Some(e),
            _ => None,
        }
    }
}
