use anyhow::Result;
use async_trait::async_trait;
use sqlx::Row;

use lectern_accounts::AccountStore;
use lectern_core::plan::{PlanLimits, PlanName, SubscriptionStatus};
use lectern_core::usage::{MeterKind, UsageSnapshot, UsageTotals};

/// PostgreSQL-backed [`AccountStore`].
///
/// Both operations map to single database calls: the snapshot comes from the
/// `get_usage_with_limits(user_id)` function (one row per account joining
/// counters, plan limits and subscription status), and metering calls
/// `increment_usage(user_id, kind, amount, file_size_bytes)`. Counter resets
/// at period boundaries and the insert trigger that is the primary counter
/// both live database-side; this crate never touches the tables directly.
pub struct PgAccountStore {
    pool: sqlx::PgPool,
}

impl PgAccountStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get_usage_snapshot(&self, user_id: &str) -> Result<Option<UsageSnapshot>> {
        let row = sqlx::query(
            r#"SELECT current_uploads, current_tts_characters, current_storage_gb,
                      limit_uploads, limit_tts_characters, limit_storage_gb,
                      plan_name, subscription_status
               FROM get_usage_with_limits($1)"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("get_usage_with_limits query failed: {e}"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        // An unrecognized plan name is a store inconsistency; surfacing it as
        // an error keeps the check fail-closed instead of silently treating
        // the account as free tier.
        let plan = PlanName::parse(&row.get::<String, _>("plan_name"))?;
        let subscription = row
            .get::<Option<String>, _>("subscription_status")
            .map(|s| SubscriptionStatus::parse(&s));

        Ok(Some(UsageSnapshot {
            totals: UsageTotals {
                uploads: row.get::<i64, _>("current_uploads"),
                tts_characters: row.get::<i64, _>("current_tts_characters"),
                storage_gb: row.get::<f64, _>("current_storage_gb"),
            },
            limits: PlanLimits {
                uploads: row.get::<i64, _>("limit_uploads"),
                tts_characters: row.get::<i64, _>("limit_tts_characters"),
                storage_gb: row.get::<f64, _>("limit_storage_gb"),
            },
            plan,
            subscription,
        }))
    }

    async fn increment_usage(
        &self,
        user_id: &str,
        kind: MeterKind,
        amount: u64,
        file_size_bytes: Option<u64>,
    ) -> Result<()> {
        sqlx::query("SELECT increment_usage($1, $2, $3, $4)")
            .bind(user_id)
            .bind(kind.as_str())
            .bind(amount as i64)
            .bind(file_size_bytes.map(|b| b as i64))
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("increment_usage failed: {e}"))?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("postgres ping failed: {e}"))?;
        Ok(())
    }
}
