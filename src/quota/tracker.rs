use super::counter::{CalendarMonth, PeriodSource, QuotaDecision, UsageCounter};
use super::store::QuotaStore;
use crate::error::QuotaStoreError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Default monthly budget of external provider calls.
pub const DEFAULT_MONTHLY_LIMIT: u32 = 30_000;

/// Enforces the monthly call budget. Every check-and-increment runs under one
/// async lock around the store's load/save, so concurrent classifications never
/// overrun the limit.
pub struct UsageTracker {
    store: Arc<dyn QuotaStore>,
    periods: Arc<dyn PeriodSource>,
    monthly_limit: u32,
    lock: Mutex<()>,
}

impl UsageTracker {
    pub fn new(store: Arc<dyn QuotaStore>, monthly_limit: u32) -> Self {
        Self::with_period_source(store, Arc::new(CalendarMonth), monthly_limit)
    }

    pub fn with_period_source(
        store: Arc<dyn QuotaStore>,
        periods: Arc<dyn PeriodSource>,
        monthly_limit: u32,
    ) -> Self {
        Self {
            store,
            periods,
            monthly_limit,
            lock: Mutex::new(()),
        }
    }

    pub fn monthly_limit(&self) -> u32 {
        self.monthly_limit
    }

    /// Reserve one call from the current period's budget.
    #[instrument(skip(self), fields(limit = self.monthly_limit))]
    pub async fn try_consume(&self) -> Result<QuotaDecision, QuotaStoreError> {
        let _guard = self.lock.lock().await;
        let mut counter = self.current_counter().await?;

        if counter.count >= self.monthly_limit {
            warn!(period = %counter.period, used = counter.count, "Monthly quota exhausted");
            return Ok(QuotaDecision {
                allowed: false,
                remaining: 0,
                period: counter.period,
                limit: self.monthly_limit,
            });
        }

        let remaining = self.monthly_limit - counter.count;
        counter.count += 1;
        self.store.save(&counter).await?;
        debug!(period = %counter.period, used = counter.count, remaining, "Quota unit reserved");

        Ok(QuotaDecision {
            allowed: true,
            remaining,
            period: counter.period,
            limit: self.monthly_limit,
        })
    }

    /// Add usage that happened outside `try_consume`. Never refused.
    pub async fn record_usage(&self, calls: u32) -> Result<UsageCounter, QuotaStoreError> {
        let _guard = self.lock.lock().await;
        let mut counter = self.current_counter().await?;
        counter.count = counter.count.saturating_add(calls);
        self.store.save(&counter).await?;
        Ok(counter)
    }

    /// Current period's counter, without reserving anything.
    pub async fn snapshot(&self) -> Result<UsageCounter, QuotaStoreError> {
        let _guard = self.lock.lock().await;
        self.current_counter().await
    }

    // Must be called with the lock held.
    async fn current_counter(&self) -> Result<UsageCounter, QuotaStoreError> {
        let period = self.periods.current_period();
        match self.store.load().await? {
            Some(counter) if counter.period == period => Ok(counter),
            Some(stale) => {
                info!(from = %stale.period, to = %period, "Usage period rolled over");
                Ok(UsageCounter::new(period))
            }
            None => Ok(UsageCounter::new(period)),
        }
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("monthly_limit", &self.monthly_limit)
            .finish_non_exhaustive()
    }
}
