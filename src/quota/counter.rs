use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Calls made within one budget period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub period: String,
    pub count: u32,
}

impl UsageCounter {
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            count: 0,
        }
    }
}

/// Outcome of a `try_consume` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Budget left before this call, including the unit it reserved.
    pub remaining: u32,
    pub period: String,
    pub limit: u32,
}

/// Names the budget period "now" belongs to.
pub trait PeriodSource: Send + Sync {
    fn current_period(&self) -> String;
}

/// Calendar month in UTC, e.g. "2024-06".
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarMonth;

impl PeriodSource for CalendarMonth {
    fn current_period(&self) -> String {
        Utc::now().format("%Y-%m").to_string()
    }
}

/// Period controlled by the host, e.g. to replay a rollover.
#[derive(Debug)]
pub struct FixedPeriod {
    period: RwLock<String>,
}

impl FixedPeriod {
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            period: RwLock::new(period.into()),
        }
    }

    pub fn set(&self, period: impl Into<String>) {
        let period = period.into();
        match self.period.write() {
            Ok(mut guard) => *guard = period,
            Err(poisoned) => *poisoned.into_inner() = period,
        }
    }
}

impl PeriodSource for FixedPeriod {
    fn current_period(&self) -> String {
        match self.period.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_month_is_year_dash_month() {
        let period = CalendarMonth.current_period();
        assert_eq!(period.len(), 7);
        assert_eq!(&period[4..5], "-");
        assert!(chrono::NaiveDate::parse_from_str(&format!("{}-01", period), "%Y-%m-%d").is_ok());
    }

    #[test]
    fn fixed_period_can_be_moved() {
        let period = FixedPeriod::new("2024-06");
        assert_eq!(period.current_period(), "2024-06");
        period.set("2024-07");
        assert_eq!(period.current_period(), "2024-07");
    }
}
