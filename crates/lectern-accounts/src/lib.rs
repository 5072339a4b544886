use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lectern_core::plan::{PlanLimits, PlanName, SubscriptionStatus};
use lectern_core::usage::{MeterKind, UsageSnapshot, UsageTotals, BYTES_PER_GB};

/// Storage interface for account plans and usage counters.
///
/// The production implementation is PostgreSQL-backed (`lectern-pg`); local
/// development and tests use [`MemoryAccountStore`]. Route handlers and the
/// usage meter only ever see this trait.
///
/// The counters behind this trait are the only shared mutable state in the
/// system and they are owned by the store: the meter reads snapshots and
/// issues increment requests, nothing else. There is no check-and-increment
/// primitive — two concurrent callers can both read the same snapshot, both
/// pass a check, and push a counter past its nominal limit. That lenient
/// model is intentional.
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// Fetch one account's current usage, limits, plan and subscription
    /// state in a single call.
    ///
    /// Returns:
    /// - `Ok(None)` when no such account exists.
    /// - `Err` on transport or store failure.
    ///
    /// Callers must treat both as "deny", never as "no limits".
    async fn get_usage_snapshot(&self, user_id: &str) -> anyhow::Result<Option<UsageSnapshot>>;

    /// Bump usage counters after a successful billable action.
    ///
    /// An `upload` increments the upload counter and, when
    /// `file_size_bytes` is given, the storage counter; `tts` increments the
    /// character counter. The store's own insert trigger is the primary
    /// counter — this call is the client-side nudge for immediate dashboard
    /// feedback, and its errors are swallowed upstream.
    async fn increment_usage(
        &self,
        user_id: &str,
        kind: MeterKind,
        amount: u64,
        file_size_bytes: Option<u64>,
    ) -> anyhow::Result<()>;

    /// Health probe for `GET /health`.
    async fn ping(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
struct AccountRecord {
    plan: PlanName,
    subscription: Option<SubscriptionStatus>,
    uploads: i64,
    tts_characters: i64,
    storage_bytes: u64,
}

/// In-memory [`AccountStore`] used in local development and tests.
///
/// Counters live in a `RwLock<HashMap>`; storage is tracked in bytes and
/// converted to GB when a snapshot is taken, matching the wire contract of
/// the real store.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, AccountRecord>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace an account with zeroed counters.
    pub async fn seed_account(
        &self,
        user_id: &str,
        plan: PlanName,
        subscription: Option<SubscriptionStatus>,
    ) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(
            user_id.to_string(),
            AccountRecord {
                plan,
                subscription,
                uploads: 0,
                tts_characters: 0,
                storage_bytes: 0,
            },
        );
    }

    /// Test helper: set an account's counters directly.
    pub async fn set_usage(
        &self,
        user_id: &str,
        uploads: i64,
        tts_characters: i64,
        storage_bytes: u64,
    ) {
        let mut accounts = self.accounts.write().await;
        if let Some(record) = accounts.get_mut(user_id) {
            record.uploads = uploads;
            record.tts_characters = tts_characters;
            record.storage_bytes = storage_bytes;
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_usage_snapshot(&self, user_id: &str) -> anyhow::Result<Option<UsageSnapshot>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(user_id).map(|record| UsageSnapshot {
            totals: UsageTotals {
                uploads: record.uploads,
                tts_characters: record.tts_characters,
                storage_gb: record.storage_bytes as f64 / BYTES_PER_GB,
            },
            limits: PlanLimits::for_plan(record.plan),
            plan: record.plan,
            subscription: record.subscription,
        }))
    }

    async fn increment_usage(
        &self,
        user_id: &str,
        kind: MeterKind,
        amount: u64,
        file_size_bytes: Option<u64>,
    ) -> anyhow::Result<()> {
        let mut accounts = self.accounts.write().await;
        let record = accounts
            .get_mut(user_id)
            .ok_or_else(|| anyhow::anyhow!("no such account: {user_id}"))?;

        match kind {
            MeterKind::Upload => {
                record.uploads = record.uploads.saturating_add(amount as i64);
                if let Some(bytes) = file_size_bytes {
                    record.storage_bytes = record.storage_bytes.saturating_add(bytes);
                }
            }
            MeterKind::Tts => {
                record.tts_characters = record.tts_characters.saturating_add(amount as i64);
            }
        }
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
