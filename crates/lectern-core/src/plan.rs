use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Sentinel value meaning "no limit" for a plan limit field.
///
/// Only the upload limit uses it today; TTS and storage limits are always
/// finite (enterprise simply gets a large number).
pub const UNLIMITED: i64 = -1;

/// The four subscription tiers of the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanName {
    Free,
    Personal,
    Professional,
    Enterprise,
}

impl PlanName {
    /// Parse a plan name as stored in the account store.
    ///
    /// Unknown names are an error, not a free-tier fallback — defaulting an
    /// unrecognized paid plan to `free` would make it always-active and
    /// silently bypass the subscription gate.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "free" => Ok(PlanName::Free),
            "personal" => Ok(PlanName::Personal),
            "professional" => Ok(PlanName::Professional),
            "enterprise" => Ok(PlanName::Enterprise),
            other => Err(CoreError::UnknownPlan(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanName::Free => "free",
            PlanName::Personal => "personal",
            PlanName::Professional => "professional",
            PlanName::Enterprise => "enterprise",
        }
    }
}

/// Subscription state as reported by the billing provider.
///
/// Free accounts have no subscription object at all, so snapshots carry
/// `Option<SubscriptionStatus>`. Anything the provider sends that we don't
/// recognize maps to `Other`, which never passes the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Incomplete,
    Canceled,
    Other,
}

impl SubscriptionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "incomplete" => SubscriptionStatus::Incomplete,
            "canceled" | "cancelled" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Other,
        }
    }
}

/// Per-plan quota limits, in plan-native units.
///
/// `uploads` may be [`UNLIMITED`]; `storage_gb` is decimal gigabytes
/// (1024³ bytes per GB).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub uploads: i64,
    pub tts_characters: i64,
    pub storage_gb: f64,
}

impl PlanLimits {
    /// The fixed plan catalog.
    pub fn for_plan(plan: PlanName) -> Self {
        match plan {
            PlanName::Free => Self {
                uploads: 10,
                tts_characters: 10_000,
                storage_gb: 1.0,
            },
            PlanName::Personal => Self {
                uploads: 100,
                tts_characters: 100_000,
                storage_gb: 10.0,
            },
            PlanName::Professional => Self {
                uploads: UNLIMITED,
                tts_characters: 500_000,
                storage_gb: 50.0,
            },
            PlanName::Enterprise => Self {
                uploads: UNLIMITED,
                tts_characters: 5_000_000,
                storage_gb: 500.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_plans() {
        assert_eq!(PlanName::parse("free").unwrap(), PlanName::Free);
        assert_eq!(
            PlanName::parse("enterprise").unwrap(),
            PlanName::Enterprise
        );
    }

    #[test]
    fn test_unknown_plan_is_an_error_not_free() {
        assert!(PlanName::parse("platinum").is_err());
        assert!(PlanName::parse("").is_err());
    }

    #[test]
    fn test_unrecognized_subscription_status_is_other() {
        assert_eq!(
            SubscriptionStatus::parse("trialing"),
            SubscriptionStatus::Other
        );
        assert_eq!(
            SubscriptionStatus::parse("past_due"),
            SubscriptionStatus::PastDue
        );
    }

    #[test]
    fn test_only_uploads_carry_the_unlimited_sentinel() {
        for plan in [
            PlanName::Free,
            PlanName::Personal,
            PlanName::Professional,
            PlanName::Enterprise,
        ] {
            let limits = PlanLimits::for_plan(plan);
            assert!(limits.tts_characters > 0);
            assert!(limits.storage_gb > 0.0);
        }
        assert_eq!(PlanLimits::for_plan(PlanName::Professional).uploads, UNLIMITED);
        assert_eq!(PlanLimits::for_plan(PlanName::Free).uploads, 10);
    }
}
