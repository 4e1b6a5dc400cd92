use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Clone, Debug)]
pub struct Configuration {
    pub sampling_interval: Duration,
    pub include_internal_sources: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            include_internal_sources: false,
        }
    }
}

/// Coverage instrumentation granularity. `Statement` corresponds to the
/// "detailed" flag of `startPreciseCoverage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    Root,
    Statement,
}

impl FromStr for Granularity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "statement" => Ok(Self::Statement),
            _ => Err(()),
        }
    }
}
