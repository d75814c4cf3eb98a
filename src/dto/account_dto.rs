use crate::models::account::{AppPhase, AuthEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseTransitionRequest {
    pub phase: AppPhase,
    pub event: AuthEvent,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseTransitionResponse {
    pub phase: AppPhase,
}
