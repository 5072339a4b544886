use serde::{Deserialize, Serialize};

use crate::plan::{PlanLimits, PlanName, SubscriptionStatus, UNLIMITED};

/// Bytes per decimal gigabyte as used by the storage limits (1024³).
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// The three metered resources a check can gate.
///
/// `upload` and `tts` amounts are plan-native units (file count, characters).
/// `storage` amounts arrive in **bytes** and are converted to GB inside the
/// check — call sites always pass raw byte counts for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Upload,
    Tts,
    Storage,
}

impl ResourceKind {
    /// Parse the wire form of a resource kind.
    ///
    /// Returns `None` for anything outside the closed set so callers can
    /// produce the defensive "invalid usage type" denial instead of a 4xx.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(ResourceKind::Upload),
            "tts" => Some(ResourceKind::Tts),
            "storage" => Some(ResourceKind::Storage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Upload => "upload",
            ResourceKind::Tts => "tts",
            ResourceKind::Storage => "storage",
        }
    }
}

/// The two resources whose counters are bumped after a successful action.
///
/// Storage has no direct meter: an upload carries an optional byte size and
/// the storage counter moves with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterKind {
    Upload,
    Tts,
}

impl MeterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(MeterKind::Upload),
            "tts" => Some(MeterKind::Tts),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeterKind::Upload => "upload",
            MeterKind::Tts => "tts",
        }
    }
}

/// Current-period consumption for one account.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub uploads: i64,
    pub tts_characters: i64,
    pub storage_gb: f64,
}

/// One account's usage, limits, plan and subscription state, fetched fresh
/// from the account store for every check. Never cached, never mutated —
/// counters move only through the store's increment path.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub totals: UsageTotals,
    pub limits: PlanLimits,
    pub plan: PlanName,
    /// `None` for free accounts, which have no subscription object.
    pub subscription: Option<SubscriptionStatus>,
}

impl UsageSnapshot {
    /// The billing-period gate: free accounts are always considered active;
    /// everyone else needs an `active` subscription.
    pub fn billing_active(&self) -> bool {
        self.plan == PlanName::Free || self.subscription == Some(SubscriptionStatus::Active)
    }
}

/// Why a check was denied. `Display` gives the user-facing reason string
/// that callers surface directly alongside plan/usage context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Snapshot fetch failed or returned no row. Fail-closed.
    StoreUnavailable,
    /// Resource kind outside the closed set. Defensive; unreachable from
    /// typed call sites.
    InvalidKind,
    /// Non-free plan without an active subscription.
    SubscriptionInactive,
    /// Not enough remaining quota for the requested amount.
    QuotaExceeded(ResourceKind),
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::StoreUnavailable => write!(f, "Unable to check usage limits"),
            DenialReason::InvalidKind => write!(f, "Invalid usage type requested"),
            DenialReason::SubscriptionInactive => write!(f, "Active subscription required"),
            DenialReason::QuotaExceeded(ResourceKind::Upload) => {
                write!(f, "Upload limit reached for your plan")
            }
            DenialReason::QuotaExceeded(ResourceKind::Tts) => {
                write!(f, "Text-to-speech character limit reached for your plan")
            }
            DenialReason::QuotaExceeded(ResourceKind::Storage) => {
                write!(f, "Storage limit reached for your plan")
            }
        }
    }
}

/// Plan/usage context echoed on a decision so the UI can render
/// "X of Y used, upgrade for more".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageContext {
    pub usage: UsageTotals,
    pub limits: PlanLimits,
    pub plan: PlanName,
}

/// Outcome of a usage check. Computed, never persisted.
///
/// `remaining` is `f64` so an unlimited upload quota can surface as
/// `f64::INFINITY`; denials report `max(0, limit − current)` for display.
/// Store-failure and invalid-kind denials carry no context — nothing is
/// fabricated when the snapshot could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageDecision {
    Allowed {
        remaining: f64,
        context: UsageContext,
    },
    Denied {
        reason: DenialReason,
        remaining: f64,
        context: Option<UsageContext>,
    },
}

impl UsageDecision {
    /// Fail-closed decision for a snapshot that could not be fetched.
    pub fn unavailable() -> Self {
        UsageDecision::Denied {
            reason: DenialReason::StoreUnavailable,
            remaining: 0.0,
            context: None,
        }
    }

    /// Fail-closed decision for an unrecognized resource kind.
    pub fn invalid_kind() -> Self {
        UsageDecision::Denied {
            reason: DenialReason::InvalidKind,
            remaining: 0.0,
            context: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, UsageDecision::Allowed { .. })
    }

    pub fn remaining(&self) -> f64 {
        match self {
            UsageDecision::Allowed { remaining, .. } => *remaining,
            UsageDecision::Denied { remaining, .. } => *remaining,
        }
    }
}

/// Decide whether `amount` of `kind` may be consumed under `snapshot`.
///
/// Pure: no I/O, no mutation, safe to evaluate any number of times for the
/// same intended action (upload call sites run it once for `upload` and once
/// for `storage` on the same file; both must pass).
///
/// Order matters: the subscription gate is evaluated before any quota math
/// and denies regardless of headroom.
pub fn evaluate(snapshot: &UsageSnapshot, kind: ResourceKind, amount: u64) -> UsageDecision {
    let context = UsageContext {
        usage: snapshot.totals,
        limits: snapshot.limits,
        plan: snapshot.plan,
    };

    if !snapshot.billing_active() {
        return UsageDecision::Denied {
            reason: DenialReason::SubscriptionInactive,
            remaining: 0.0,
            context: Some(context),
        };
    }

    let (limit, current, requested) = match kind {
        ResourceKind::Upload => (
            snapshot.limits.uploads as f64,
            snapshot.totals.uploads as f64,
            amount as f64,
        ),
        ResourceKind::Tts => (
            snapshot.limits.tts_characters as f64,
            snapshot.totals.tts_characters as f64,
            amount as f64,
        ),
        ResourceKind::Storage => (
            snapshot.limits.storage_gb,
            snapshot.totals.storage_gb,
            amount as f64 / BYTES_PER_GB,
        ),
    };

    let unlimited = kind == ResourceKind::Upload && snapshot.limits.uploads == UNLIMITED;
    let remaining = if unlimited {
        f64::INFINITY
    } else {
        limit - current
    };

    if remaining < requested {
        return UsageDecision::Denied {
            reason: DenialReason::QuotaExceeded(kind),
            remaining: remaining.max(0.0),
            context: Some(context),
        };
    }

    UsageDecision::Allowed {
        remaining,
        context,
    }
}
