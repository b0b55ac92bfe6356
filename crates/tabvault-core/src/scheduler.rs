use std::time::Duration;

use crate::settings::Settings;

pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Sweep period: about six checks per archive threshold, kept within
/// [`MIN_CLEANUP_INTERVAL`, `MAX_CLEANUP_INTERVAL`].
pub fn cleanup_interval(settings: &Settings) -> Duration {
    Duration::from_millis(settings.threshold_ms() / 6)
        .clamp(MIN_CLEANUP_INTERVAL, MAX_CLEANUP_INTERVAL)
}

/// What one periodic sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub purged: usize,
    pub archived: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.purged == 0 && self.archived == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::TimeUnit;

    use super::*;

    fn with_threshold(value: u64, unit: TimeUnit) -> Settings {
        Settings {
            archive_threshold: value,
            archive_threshold_unit: unit,
            ..Settings::default()
        }
    }

    #[test]
    fn interval_is_a_sixth_of_the_threshold() {
        assert_eq!(
            cleanup_interval(&with_threshold(30, TimeUnit::Minutes)),
            Duration::from_secs(5 * 60)
        );
    }

    #[test]
    fn interval_is_clamped() {
        assert_eq!(
            cleanup_interval(&with_threshold(10, TimeUnit::Seconds)),
            MIN_CLEANUP_INTERVAL
        );
        assert_eq!(cleanup_interval(&Settings::default()), MAX_CLEANUP_INTERVAL);
        assert_eq!(
            cleanup_interval(&with_threshold(0, TimeUnit::Hours)),
            MIN_CLEANUP_INTERVAL
        );
    }
}
