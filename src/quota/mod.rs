pub mod counter;
pub mod store;
pub mod tracker;

pub use counter::{CalendarMonth, FixedPeriod, PeriodSource, QuotaDecision, UsageCounter};
pub use store::{InMemoryQuotaStore, JsonFileQuotaStore, QuotaStore};
pub use tracker::{UsageTracker, DEFAULT_MONTHLY_LIMIT};
