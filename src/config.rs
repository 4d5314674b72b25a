use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

use crate::{HumanDuration, Resource};

/// How a stall is counted within the time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StallType {
    /// At least one task is stalled.
    Some,
    /// All non-idle tasks are stalled at the same time.
    Full,
}

impl StallType {
    /// Phrase used by [`Config::explain`].
    pub fn quantifier(&self) -> &'static str {
        match self {
            Self::Some => "at least one",
            Self::Full => "all of",
        }
    }
}

impl Display for StallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Some => write!(f, "some"),
            Self::Full => write!(f, "full"),
        }
    }
}

impl FromStr for StallType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "some" => Ok(Self::Some),
            "full" => Ok(Self::Full),
            other => Err(ConfigError::UnknownStallType(other.to_owned())),
        }
    }
}

/// Errors that can occur when building or validating a [`Config`]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no resource specified")]
    NoResource,
    #[error("no stall type specified")]
    NoStallType,
    #[error("no stall window specified")]
    NoStallWindow,
    #[error("no time window specified")]
    NoWindow,
    #[error("time window {} is below the 500ms minimum", HumanDuration(*.0))]
    WindowTooShort(Duration),
    #[error("time window {} is above the 10s maximum", HumanDuration(*.0))]
    WindowTooLong(Duration),
    #[error("stall window {} is below the 50ms minimum", HumanDuration(*.0))]
    StallWindowTooShort(Duration),
    #[error("stall window {} is above the 1s maximum", HumanDuration(*.0))]
    StallWindowTooLong(Duration),
    #[error("unknown resource {0:?}")]
    UnknownResource(String),
    #[error("unknown stall type {0:?}")]
    UnknownStallType(String),
}

/// A PSI trigger: fire when tasks stall on `resource` for at least
/// `stall_window` in total within any `window`.
///
/// ```console
/// <some|full> <stall window in us> <time window in us>
/// ```
///
/// <https://docs.kernel.org/accounting/psi.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Config {
    pub resource: Resource,
    pub stall_type: StallType,
    pub stall_window: Duration,
    pub window: Duration,
}

impl Config {
    pub const MIN_WINDOW: Duration = Duration::from_millis(500);
    pub const MAX_WINDOW: Duration = Duration::from_secs(10);
    pub const MIN_STALL_WINDOW: Duration = Duration::from_millis(50);
    pub const MAX_STALL_WINDOW: Duration = Duration::from_secs(1);

    pub fn new(
        resource: Resource,
        stall_type: StallType,
        stall_window: Duration,
        window: Duration,
    ) -> Self {
        Self {
            resource,
            stall_type,
            stall_window,
            window,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check both durations against the bounds the kernel accepts.
    ///
    /// The stall window is not compared with the time window; the kernel
    /// gets the final say on that pairing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < Self::MIN_WINDOW {
            return Err(ConfigError::WindowTooShort(self.window));
        }
        if self.window > Self::MAX_WINDOW {
            return Err(ConfigError::WindowTooLong(self.window));
        }
        if self.stall_window < Self::MIN_STALL_WINDOW {
            return Err(ConfigError::StallWindowTooShort(self.stall_window));
        }
        if self.stall_window > Self::MAX_STALL_WINDOW {
            return Err(ConfigError::StallWindowTooLong(self.stall_window));
        }
        Ok(())
    }

    /// Human readable sentence describing what this trigger fires on.
    pub fn explain(&self) -> String {
        format!(
            "{} of the tasks in the queue are waiting for {} for longer than {} measured within a {} time window\n",
            self.stall_type.quantifier(),
            self.resource,
            HumanDuration(self.stall_window),
            HumanDuration(self.window),
        )
    }

    /// The NUL terminated control line written to the pressure file.
    pub fn trigger(&self) -> String {
        format!(
            "{} {} {}\0",
            self.stall_type,
            self.stall_window.as_micros(),
            self.window.as_micros()
        )
    }
}

/// Builder for [`Config`]
#[derive(Default, Clone, Copy)]
pub struct ConfigBuilder {
    resource: Option<Resource>,
    stall_type: Option<StallType>,
    stall_window: Option<Duration>,
    window: Option<Duration>,
}

impl ConfigBuilder {
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn stall_type(mut self, stall_type: StallType) -> Self {
        self.stall_type = Some(stall_type);
        self
    }

    pub fn stall_window(mut self, stall_window: Duration) -> Self {
        self.stall_window = Some(stall_window);
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Build and validate the config
    pub fn build(self) -> Result<Config, ConfigError> {
        let resource = self.resource.ok_or(ConfigError::NoResource)?;
        let stall_type = self.stall_type.ok_or(ConfigError::NoStallType)?;
        let stall_window = self.stall_window.ok_or(ConfigError::NoStallWindow)?;
        let window = self.window.ok_or(ConfigError::NoWindow)?;
        let config = Config::new(resource, stall_type, stall_window, window);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn cpu(stall_type: StallType, stall_window: Duration, window: Duration) -> Config {
        Config::new(Resource::Cpu, stall_type, stall_window, window)
    }

    fn millis(range: std::ops::RangeInclusive<u64>) -> impl Strategy<Value = Duration> {
        range.prop_map(Duration::from_millis)
    }

    fn invalid_window() -> impl Strategy<Value = Duration> {
        prop_oneof![
            (0u64..500_000).prop_map(Duration::from_micros),
            (10_000_001u64..3_600_000_000).prop_map(Duration::from_micros),
        ]
    }

    fn invalid_stall_window() -> impl Strategy<Value = Duration> {
        prop_oneof![
            (0u64..50_000).prop_map(Duration::from_micros),
            (1_000_001u64..60_000_000).prop_map(Duration::from_micros),
        ]
    }

    proptest! {
        #[test]
        fn in_range_durations_validate(
            stall_window in millis(50..=1_000),
            window in millis(500..=10_000),
        ) {
            prop_assert_eq!(cpu(StallType::Some, stall_window, window).validate(), Ok(()));
        }

        #[test]
        fn out_of_range_window_is_reported_first(
            stall_window in prop_oneof![millis(0..=5_000), invalid_stall_window()],
            window in invalid_window(),
        ) {
            let err = cpu(StallType::Full, stall_window, window).validate().unwrap_err();
            prop_assert!(matches!(
                err,
                ConfigError::WindowTooShort(_) | ConfigError::WindowTooLong(_)
            ), "{err}");
        }

        #[test]
        fn out_of_range_stall_window_is_reported(
            stall_window in invalid_stall_window(),
            window in millis(500..=10_000),
        ) {
            let err = cpu(StallType::Some, stall_window, window).validate().unwrap_err();
            prop_assert!(matches!(
                err,
                ConfigError::StallWindowTooShort(_) | ConfigError::StallWindowTooLong(_)
            ), "{err}");
        }

        #[test]
        fn explain_is_deterministic(
            stall_window in millis(0..=2_000),
            window in millis(0..=20_000),
        ) {
            let config = cpu(StallType::Full, stall_window, window);
            prop_assert_eq!(config.explain(), config.explain());
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let ms = Duration::from_millis;
        assert_eq!(cpu(StallType::Some, ms(50), ms(500)).validate(), Ok(()));
        assert_eq!(
            cpu(StallType::Some, Duration::from_secs(1), Duration::from_secs(10)).validate(),
            Ok(())
        );
        assert_eq!(
            cpu(StallType::Some, ms(100), ms(499)).validate(),
            Err(ConfigError::WindowTooShort(ms(499)))
        );
        assert_eq!(
            cpu(StallType::Some, ms(100), ms(10_001)).validate(),
            Err(ConfigError::WindowTooLong(ms(10_001)))
        );
        assert_eq!(
            cpu(StallType::Some, ms(49), ms(1_000)).validate(),
            Err(ConfigError::StallWindowTooShort(ms(49)))
        );
        assert_eq!(
            cpu(StallType::Some, ms(1_001), ms(1_000)).validate(),
            Err(ConfigError::StallWindowTooLong(ms(1_001)))
        );
    }

    #[test]
    fn stall_window_may_exceed_window() {
        let config = cpu(StallType::Some, Duration::from_secs(1), Duration::from_millis(500));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn explain_golden() {
        let some = cpu(StallType::Some, Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(
            some.explain(),
            "at least one of the tasks in the queue are waiting for cpu for longer than 100ms measured within a 1s time window\n"
        );
        let full = Config {
            resource: Resource::Memory,
            stall_type: StallType::Full,
            ..some
        };
        assert_eq!(
            full.explain(),
            "all of of the tasks in the queue are waiting for memory for longer than 100ms measured within a 1s time window\n"
        );
    }

    #[test]
    fn trigger_line_is_nul_terminated_micros() {
        let config = cpu(StallType::Some, Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(config.trigger().as_bytes(), b"some 100000 1000000\0");

        let config = cpu(
            StallType::Full,
            Duration::from_nanos(150_000_999),
            Duration::from_millis(2_500),
        );
        assert_eq!(config.trigger(), "full 150000 2500000\0");
    }

    #[test]
    fn builder_reports_missing_fields_in_order() {
        let ms = Duration::from_millis;
        assert_eq!(Config::builder().build(), Err(ConfigError::NoResource));
        assert_eq!(
            Config::builder().resource(Resource::Io).build(),
            Err(ConfigError::NoStallType)
        );
        assert_eq!(
            Config::builder()
                .resource(Resource::Io)
                .stall_type(StallType::Full)
                .build(),
            Err(ConfigError::NoStallWindow)
        );
        assert_eq!(
            Config::builder()
                .resource(Resource::Io)
                .stall_type(StallType::Full)
                .stall_window(ms(100))
                .build(),
            Err(ConfigError::NoWindow)
        );
        assert_eq!(
            Config::builder()
                .resource(Resource::Io)
                .stall_type(StallType::Full)
                .stall_window(ms(100))
                .window(ms(100))
                .build(),
            Err(ConfigError::WindowTooShort(ms(100)))
        );
        assert_eq!(
            Config::builder()
                .resource(Resource::Io)
                .stall_type(StallType::Full)
                .stall_window(ms(150))
                .window(Duration::from_secs(2))
                .build(),
            Ok(Config::new(Resource::Io, StallType::Full, ms(150), Duration::from_secs(2)))
        );
    }

    #[test]
    fn error_messages_use_human_units() {
        assert_eq!(
            ConfigError::WindowTooLong(Duration::from_secs(12)).to_string(),
            "time window 12s is above the 10s maximum"
        );
        assert_eq!(
            "half".parse::<StallType>().unwrap_err().to_string(),
            "unknown stall type \"half\""
        );
    }
}
