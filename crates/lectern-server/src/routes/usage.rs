use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use lectern_core::plan::{PlanLimits, PlanName};
use lectern_core::usage::{MeterKind, ResourceKind, UsageDecision};

use crate::{error::AppError, state::AppState, user_context::UserContext};

#[derive(Debug, Deserialize)]
pub struct CheckUsageRequest {
    /// Raw kind string so an out-of-set value yields a denied decision
    /// instead of a deserialization 4xx.
    pub kind: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub kind: String,
    pub amount: u64,
    pub file_size_bytes: Option<u64>,
}

/// First day of the current billing period (calendar month, UTC).
fn period_start() -> NaiveDate {
    let today = Utc::now().date_naive();
    NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today)
}

/// `remaining` on the wire: a number, or `null` for unlimited.
fn remaining_json(remaining: f64) -> Value {
    if remaining.is_finite() {
        json!(remaining)
    } else {
        Value::Null
    }
}

fn decision_payload(decision: &UsageDecision) -> Value {
    match decision {
        UsageDecision::Allowed { remaining, context } => json!({
            "allowed": true,
            "remaining": remaining_json(*remaining),
            "usage": context.usage,
            "limits": context.limits,
            "plan": context.plan,
        }),
        UsageDecision::Denied {
            reason,
            remaining,
            context,
        } => {
            let mut payload = json!({
                "allowed": false,
                "remaining": remaining_json(*remaining),
                "error": reason.to_string(),
            });
            // Store-failure and invalid-kind denials carry no context;
            // nothing is fabricated for them.
            if let Some(context) = context {
                payload["usage"] = json!(context.usage);
                payload["limits"] = json!(context.limits);
                payload["plan"] = json!(context.plan);
            }
            payload
        }
    }
}

/// `GET /api/usage` — current-period usage, limits and plan for the
/// dashboard.
///
/// On any retrieval failure this answers with the default free-tier display
/// (zero usage, free limits) instead of an error, so the dashboard always
/// renders something.
#[tracing::instrument(skip(state))]
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<impl IntoResponse, AppError> {
    let payload = match state.meter.current_usage(&user.user_id).await {
        Some(overview) => json!({
            "period": period_start().to_string(),
            "usage": overview.usage,
            "limits": overview.limits,
            "plan": overview.plan,
        }),
        None => json!({
            "period": period_start().to_string(),
            "usage": { "uploads": 0, "tts_characters": 0, "storage_gb": 0.0 },
            "limits": PlanLimits::for_plan(PlanName::Free),
            "plan": PlanName::Free,
            "fallback": true,
        }),
    };

    Ok(Json(json!({ "data": payload })))
}

/// `POST /api/usage/check` — pre-flight quota gate.
///
/// Always answers `200` with a structured decision; callers branch on
/// `allowed` before performing the billable action. Upload handlers call
/// this twice per file — once with `kind=upload, amount=1` and once with
/// `kind=storage` and the byte size — and proceed only when both pass.
#[tracing::instrument(skip(state, body))]
pub async fn check_usage(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(body): Json<CheckUsageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let decision = match ResourceKind::parse(&body.kind) {
        Some(kind) => {
            state
                .meter
                .check_usage_limit(&user.user_id, kind, body.amount)
                .await
        }
        // Unreachable from our own typed call sites; kept for stray callers.
        None => UsageDecision::invalid_kind(),
    };

    Ok(Json(json!({ "data": decision_payload(&decision) })))
}

/// `POST /api/usage/record` — best-effort metering after a successful
/// billable action.
///
/// Fail-open on the wire as well as internally: the response is `204`
/// whether or not the store accepted the increment. The caller's action has
/// already completed and must never be failed retroactively.
#[tracing::instrument(skip(state, body))]
pub async fn record_usage(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(body): Json<RecordUsageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kind = MeterKind::parse(&body.kind)
        .ok_or_else(|| AppError::BadRequest(format!("unknown meter kind: {}", body.kind)))?;

    state
        .meter
        .record_usage(&user.user_id, kind, body.amount, body.file_size_bytes)
        .await;

    Ok(StatusCode::NO_CONTENT)
}
