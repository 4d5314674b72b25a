use std::{
    fmt::{self, Display},
    time::Duration,
};

/// Displays a [`Duration`] in its largest natural unit, e.g. `100ms`, `1.5s`,
/// `2m30s`, `1h0m0s`, `250µs` or `0s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

impl Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }
        if nanos < NANOS_PER_MICRO {
            return write!(f, "{nanos}ns");
        }
        if nanos < NANOS_PER_MILLI {
            return write_scaled(f, nanos, NANOS_PER_MICRO, "µs");
        }
        if nanos < NANOS_PER_SEC {
            return write_scaled(f, nanos, NANOS_PER_MILLI, "ms");
        }

        let secs = self.0.as_secs();
        let (hours, minutes) = (secs / 3600, secs / 60 % 60);
        if hours > 0 {
            write!(f, "{hours}h{minutes}m")?;
        } else if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        let rest = u128::from(secs % 60) * NANOS_PER_SEC + u128::from(self.0.subsec_nanos());
        write_scaled(f, rest, NANOS_PER_SEC, "s")
    }
}

// `value` is in nanoseconds, `unit` is a power of ten.
fn write_scaled(f: &mut fmt::Formatter<'_>, value: u128, unit: u128, suffix: &str) -> fmt::Result {
    write!(f, "{}", value / unit)?;
    let frac = value % unit;
    if frac != 0 {
        let width = unit.ilog10() as usize;
        let digits = format!("{frac:0width$}");
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }
    f.write_str(suffix)
}
