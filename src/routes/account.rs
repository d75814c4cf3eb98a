use axum::{
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::dto::account_dto::{PhaseTransitionRequest, PhaseTransitionResponse};
use crate::middleware::auth::Claims;
use crate::models::account::{apply_auth_event, UserProfile};

#[axum::debug_handler]
pub async fn get_profile(Extension(claims): Extension<Claims>) -> crate::error::Result<Response> {
    let profile = UserProfile {
        uid: claims.sub,
        email: claims.email,
        display_name: claims.name,
    };
    Ok(Json(profile).into_response())
}

/// Pure shell-state transition: the client reports where it is and which
/// identity event fired, the server answers where it goes next.
#[axum::debug_handler]
pub async fn phase_transition(
    Json(req): Json<PhaseTransitionRequest>,
) -> crate::error::Result<Response> {
    let next = apply_auth_event(req.phase, &req.event);
    Ok(Json(PhaseTransitionResponse { phase: next }).into_response())
}
