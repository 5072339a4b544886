use axum::{response::IntoResponse, Json};
use serde_json::json;

use lectern_core::plan::{PlanLimits, PlanName};

/// `GET /api/plans` — the fixed plan catalog, for pricing and upgrade UI.
///
/// Public and static; requires no user context.
pub async fn list_plans() -> impl IntoResponse {
    let plans: Vec<_> = [
        PlanName::Free,
        PlanName::Personal,
        PlanName::Professional,
        PlanName::Enterprise,
    ]
    .into_iter()
    .map(|plan| {
        json!({
            "name": plan,
            "limits": PlanLimits::for_plan(plan),
        })
    })
    .collect();

    Json(json!({ "data": plans }))
}
