use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown plan name: {0}")]
    UnknownPlan(String),
}
