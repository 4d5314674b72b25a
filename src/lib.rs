//! # psi-trigger
//!
//! Block on linux Pressure Stall Information (PSI) triggers and run a callback
//! whenever a stall threshold is crossed.
//!
//! ```no_run
//! use psi_trigger::{Config, Flow, Resource, StallType};
//! use std::time::Duration;
//!
//! let config = Config::builder()
//!     .resource(Resource::Cpu)
//!     .stall_type(StallType::Some)
//!     .stall_window(Duration::from_millis(100))
//!     .window(Duration::from_secs(1))
//!     .build()
//!     .unwrap();
//!
//! let mut events = 0;
//! psi_trigger::monitor(config, || {
//!     events += 1;
//!     println!("{}", config.explain());
//!     if events < 10 { Flow::<std::io::Error>::Continue } else { Flow::Stop }
//! })
//! .unwrap();
//! ```
#[cfg(not(any(target_os = "linux", target_os = "android")))]
compile_error!("psi-trigger only supports Linux and Android platforms.");

mod config;
mod duration;
mod error;
mod fd;
mod monitor;
mod resource;
#[cfg(feature = "tokio")]
mod tokio;

#[cfg(feature = "tokio")]
pub use crate::tokio::monitor_async;
pub use crate::{
    config::{Config, ConfigBuilder, ConfigError, StallType},
    duration::HumanDuration,
    error::Error,
    fd::PsiFd,
    monitor::{Canceller, Flow, monitor, monitor_until},
    resource::Resource,
};
