use std::{
    fmt::{self, Display},
    path::Path,
    str::FromStr,
};

use crate::ConfigError;

/// The resource a trigger watches, backed by a `/proc/pressure/<resource>` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Cpu,
    Io,
    Memory,
}

impl Resource {
    const CPU: &str = "/proc/pressure/cpu";
    const IO: &str = "/proc/pressure/io";
    const MEMORY: &str = "/proc/pressure/memory";

    /// Path of the kernel interface file for this resource.
    pub fn path(&self) -> &'static Path {
        let path = match self {
            Self::Cpu => Self::CPU,
            Self::Io => Self::IO,
            Self::Memory => Self::MEMORY,
        };
        Path::new(path)
    }

    /// Tag as the kernel names it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Io => "io",
            Self::Memory => "memory",
        }
    }

    /// Returns `true` if the running kernel exposes this resource.
    pub fn is_supported(&self) -> bool {
        self.path().exists()
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<Path> for Resource {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

impl FromStr for Resource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "io" => Ok(Self::Io),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownResource(other.to_owned())),
        }
    }
}
