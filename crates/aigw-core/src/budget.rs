use std::sync::Arc;

use time::{OffsetDateTime, Time};
use uuid::Uuid;

use aigw_common::Money;
use aigw_storage::Storage;

use crate::error::PublicError;

/// Sums `succeeded` cost since the start of the calendar day/month in UTC
/// and rejects admission once a configured cap is met or exceeded
/// (`spec.md` §4.F). Advisory only — no row lock — so overspend is bounded
/// to at most one in-flight request per concurrent admitter.
pub struct BudgetEnforcer<S> {
    storage: Arc<S>,
}

impl<S: Storage> BudgetEnforcer<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn admit(
        &self,
        api_key_id: Uuid,
        daily_budget: Option<Money>,
        monthly_budget: Option<Money>,
    ) -> Result<(), PublicError> {
        let now = OffsetDateTime::now_utc();
        if let Some(cap) = daily_budget {
            self.check_cap(api_key_id, cap, day_start(now)).await?;
        }
        if let Some(cap) = monthly_budget {
            self.check_cap(api_key_id, cap, month_start(now)).await?;
        }
        Ok(())
    }

    async fn check_cap(
        &self,
        api_key_id: Uuid,
        cap: Money,
        since: OffsetDateTime,
    ) -> Result<(), PublicError> {
        let spent = self
            .storage
            .sum_succeeded_cost_since(api_key_id, since)
            .await
            .map_err(|err| PublicError::internal_error(format!("spend lookup failed: {err}")))?;
        if spent >= cap {
            return Err(PublicError::budget_exceeded());
        }
        Ok(())
    }
}

fn day_start(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_time(Time::MIDNIGHT)
}

fn month_start(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_day(1)
        .unwrap_or(now)
        .replace_time(Time::MIDNIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn day_start_truncates_time() {
        let now = datetime!(2026-03-15 14:22:07 UTC);
        assert_eq!(day_start(now), datetime!(2026-03-15 0:00:00 UTC));
    }

    #[test]
    fn month_start_truncates_day_and_time() {
        let now = datetime!(2026-03-15 14:22:07 UTC);
        assert_eq!(month_start(now), datetime!(2026-03-01 0:00:00 UTC));
    }
}
