use std::time::Duration;

/// Timings collected while a request moves through the classifier
#[derive(Debug, Clone, Default)]
pub struct RequestMetrics {
    categorization_duration: Option<Duration>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_categorization_duration(&mut self, duration: Duration) {
        self.categorization_duration = Some(duration);
    }

    pub fn categorization_duration(&self) -> Option<Duration> {
        self.categorization_duration
    }
}

/// Whole microseconds, saturating.
pub fn as_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
