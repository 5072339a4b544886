use std::sync::Arc;

use lectern_accounts::AccountStore;
use lectern_core::plan::{PlanLimits, PlanName};
use lectern_core::usage::{self, MeterKind, ResourceKind, UsageDecision, UsageTotals};

/// Current usage, limits and plan for dashboard display. No gating — this is
/// a pure projection of the snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageOverview {
    pub usage: UsageTotals,
    pub limits: PlanLimits,
    pub plan: PlanName,
}

/// The usage-quota enforcement and metering service.
///
/// Callers run [`UsageMeter::check_usage_limit`] before the billable action
/// and [`UsageMeter::record_usage`] after it succeeded — never before, and
/// never to reserve capacity. Both operations are one store call each with no
/// in-process locking, so two concurrent requests for the same user can both
/// pass a check and land the counters past the nominal limit. Accepted: the
/// store owns the counters (including its insert trigger) and offers no
/// check-and-increment primitive, and availability wins over quota exactness.
#[derive(Clone)]
pub struct UsageMeter {
    accounts: Arc<dyn AccountStore>,
}

impl UsageMeter {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Decide whether `amount` of `kind` may be consumed by `user_id`.
    ///
    /// Fail-closed: a snapshot fetch error or a missing account row denies
    /// with a generic reason and no fabricated usage context. Never errors —
    /// every caller branches on the returned decision instead.
    ///
    /// Side-effect free; an upload call site runs this twice for the same
    /// file (once for `upload`, once for `storage` with the byte size) and
    /// proceeds only when both pass.
    pub async fn check_usage_limit(
        &self,
        user_id: &str,
        kind: ResourceKind,
        amount: u64,
    ) -> UsageDecision {
        let snapshot = match self.accounts.get_usage_snapshot(user_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::warn!(user_id, "usage check for unknown account");
                return UsageDecision::unavailable();
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "usage snapshot fetch failed");
                return UsageDecision::unavailable();
            }
        };

        usage::evaluate(&snapshot, kind, amount)
    }

    /// Record consumption after a billable action has durably succeeded.
    ///
    /// Best-effort and fail-open: a store error is logged and swallowed. The
    /// action it meters has already completed for the user, so there is
    /// nothing correct to do with a failure here — the store's insert
    /// trigger remains the primary counter and will catch up.
    pub async fn record_usage(
        &self,
        user_id: &str,
        kind: MeterKind,
        amount: u64,
        file_size_bytes: Option<u64>,
    ) {
        if let Err(e) = self
            .accounts
            .increment_usage(user_id, kind, amount, file_size_bytes)
            .await
        {
            tracing::warn!(
                user_id,
                kind = kind.as_str(),
                amount,
                error = %e,
                "usage increment failed — counters will lag until the store trigger catches up"
            );
        }
    }

    /// Dashboard read path. Returns `None` on any retrieval failure so the
    /// UI can fall back to a default free-tier display.
    pub async fn current_usage(&self, user_id: &str) -> Option<UsageOverview> {
        match self.accounts.get_usage_snapshot(user_id).await {
            Ok(Some(snapshot)) => Some(UsageOverview {
                usage: snapshot.totals,
                limits: snapshot.limits,
                plan: snapshot.plan,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(user_id, error = %e, "usage overview fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use lectern_accounts::MemoryAccountStore;
    use lectern_core::plan::SubscriptionStatus;
    use lectern_core::usage::{DenialReason, UsageSnapshot};

    /// [`AccountStore`] whose every call fails, for fail-closed/fail-open
    /// coverage.
    struct BrokenStore;

    #[async_trait]
    impl AccountStore for BrokenStore {
        async fn get_usage_snapshot(&self, _: &str) -> anyhow::Result<Option<UsageSnapshot>> {
            anyhow::bail!("connection refused")
        }

        async fn increment_usage(
            &self,
            _: &str,
            _: MeterKind,
            _: u64,
            _: Option<u64>,
        ) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }

        async fn ping(&self) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    async fn seeded_meter(
        plan: PlanName,
        subscription: Option<SubscriptionStatus>,
    ) -> (UsageMeter, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        store.seed_account("u1", plan, subscription).await;
        (UsageMeter::new(store.clone()), store)
    }

    /// BDD: fetch failure denies every kind with no fabricated context.
    #[tokio::test]
    async fn test_store_failure_fails_closed_for_every_kind() {
        let meter = UsageMeter::new(Arc::new(BrokenStore));
        for kind in [ResourceKind::Upload, ResourceKind::Tts, ResourceKind::Storage] {
            match meter.check_usage_limit("u1", kind, 1).await {
                UsageDecision::Denied {
                    reason,
                    remaining,
                    context,
                } => {
                    assert_eq!(reason, DenialReason::StoreUnavailable);
                    assert_eq!(remaining, 0.0);
                    assert!(context.is_none(), "no usage context may be fabricated");
                }
                UsageDecision::Allowed { .. } => panic!("must deny on store failure"),
            }
        }
    }

    /// BDD: an unknown account denies exactly like a store failure.
    #[tokio::test]
    async fn test_missing_account_fails_closed() {
        let meter = UsageMeter::new(Arc::new(MemoryAccountStore::new()));
        let decision = meter
            .check_usage_limit("nobody", ResourceKind::Upload, 1)
            .await;
        assert_eq!(decision, UsageDecision::unavailable());
    }

    /// BDD: unlimited uploads admit arbitrarily large requests.
    #[tokio::test]
    async fn test_unlimited_upload_plan_admits_large_amounts() {
        let (meter, _) =
            seeded_meter(PlanName::Enterprise, Some(SubscriptionStatus::Active)).await;
        let decision = meter
            .check_usage_limit("u1", ResourceKind::Upload, 10_000_000)
            .await;
        assert!(decision.is_allowed());
        assert_eq!(decision.remaining(), f64::INFINITY);
    }

    /// BDD: exact boundary — one fits, two do not, remaining echoes 1.
    #[tokio::test]
    async fn test_exact_upload_boundary_through_the_meter() {
        let (meter, store) = seeded_meter(PlanName::Free, None).await;
        store.set_usage("u1", 9, 0, 0).await; // free plan: 10 uploads

        let fits = meter.check_usage_limit("u1", ResourceKind::Upload, 1).await;
        assert!(fits.is_allowed());
        assert_eq!(fits.remaining(), 1.0);

        let over = meter.check_usage_limit("u1", ResourceKind::Upload, 2).await;
        assert!(!over.is_allowed());
        assert_eq!(over.remaining(), 1.0);
    }

    /// BDD: storage checks take bytes and compare in GB.
    #[tokio::test]
    async fn test_storage_check_converts_bytes_to_gb() {
        let (meter, store) = seeded_meter(PlanName::Free, None).await;
        store.set_usage("u1", 0, 0, 512 * 1024 * 1024).await; // 0.5 of 1 GB

        let over = meter
            .check_usage_limit("u1", ResourceKind::Storage, 600 * 1024 * 1024)
            .await;
        assert!(!over.is_allowed());

        let fits = meter
            .check_usage_limit("u1", ResourceKind::Storage, 400 * 1024 * 1024)
            .await;
        assert!(fits.is_allowed());
    }

    /// BDD: a past-due paid plan is denied despite abundant headroom.
    #[tokio::test]
    async fn test_inactive_subscription_overrides_quota() {
        let (meter, _) =
            seeded_meter(PlanName::Professional, Some(SubscriptionStatus::PastDue)).await;
        for kind in [ResourceKind::Upload, ResourceKind::Tts, ResourceKind::Storage] {
            match meter.check_usage_limit("u1", kind, 1).await {
                UsageDecision::Denied { reason, .. } => {
                    assert_eq!(reason, DenialReason::SubscriptionInactive);
                }
                UsageDecision::Allowed { .. } => panic!("expected denial for {kind:?}"),
            }
        }
    }

    /// BDD: free tier has no subscription object and is always active.
    #[tokio::test]
    async fn test_free_tier_is_always_active() {
        let (meter, _) = seeded_meter(PlanName::Free, None).await;
        assert!(meter
            .check_usage_limit("u1", ResourceKind::Tts, 5_000)
            .await
            .is_allowed());
    }

    /// BDD: record_usage swallows store failure — the completed action is
    /// never rolled back or failed after the fact.
    #[tokio::test]
    async fn test_record_usage_never_propagates_failure() {
        let meter = UsageMeter::new(Arc::new(BrokenStore));
        meter
            .record_usage("u1", MeterKind::Upload, 1, Some(1024))
            .await;
        meter.record_usage("u1", MeterKind::Tts, 500, None).await;
    }

    /// BDD: checking is read-only — repeated checks with no intervening
    /// increment return identical remaining values.
    #[tokio::test]
    async fn test_check_mutates_nothing() {
        let (meter, store) = seeded_meter(PlanName::Free, None).await;
        store.set_usage("u1", 3, 0, 0).await;

        let first = meter.check_usage_limit("u1", ResourceKind::Upload, 1).await;
        let second = meter.check_usage_limit("u1", ResourceKind::Upload, 1).await;
        assert_eq!(first.remaining(), second.remaining());
        assert_eq!(first, second);
    }

    /// BDD: the check/record pair moves counters only through record.
    #[tokio::test]
    async fn test_record_after_action_shrinks_remaining() {
        let (meter, _) = seeded_meter(PlanName::Free, None).await;

        let before = meter.check_usage_limit("u1", ResourceKind::Upload, 1).await;
        assert_eq!(before.remaining(), 10.0);

        meter
            .record_usage("u1", MeterKind::Upload, 1, Some(256 * 1024 * 1024))
            .await;

        let after = meter.check_usage_limit("u1", ResourceKind::Upload, 1).await;
        assert_eq!(after.remaining(), 9.0);

        let storage = meter
            .check_usage_limit("u1", ResourceKind::Storage, 0)
            .await;
        assert_eq!(storage.remaining(), 0.75);
    }

    /// BDD: dashboard overview is a projection, None on failure.
    #[tokio::test]
    async fn test_current_usage_projection_and_fallback() {
        let (meter, store) = seeded_meter(PlanName::Personal, Some(SubscriptionStatus::Active))
            .await;
        store.set_usage("u1", 7, 1_200, 0).await;

        let overview = meter.current_usage("u1").await.expect("overview");
        assert_eq!(overview.usage.uploads, 7);
        assert_eq!(overview.plan, PlanName::Personal);

        let broken = UsageMeter::new(Arc::new(BrokenStore));
        assert!(broken.current_usage("u1").await.is_none());
    }
}
