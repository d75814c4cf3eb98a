use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Top-level shell state. The client renders exactly one of these; the
/// transitions are driven by identity-provider session events rather than
/// ad hoc flag checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    Landing,
    Auth,
    Dashboard,
    VerificationPending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AuthEvent {
    SignedIn { verified: bool },
    SignedOut,
    VerificationEmailSent,
    OpenAuth,
    BackToLanding,
}

/// Single transition function for the shell state machine.
///
/// A signed-in user lands on the dashboard regardless of email verification
/// (verification no longer blocks entry); sign-out only bounces to landing
/// when the user was actually inside the dashboard.
pub fn apply_auth_event(phase: AppPhase, event: &AuthEvent) -> AppPhase {
    match (phase, event) {
        (_, AuthEvent::SignedIn { .. }) => AppPhase::Dashboard,
        (AppPhase::Dashboard, AuthEvent::SignedOut) => AppPhase::Landing,
        (AppPhase::VerificationPending, AuthEvent::SignedOut) => AppPhase::Landing,
        (current, AuthEvent::SignedOut) => current,
        (_, AuthEvent::VerificationEmailSent) => AppPhase::VerificationPending,
        (_, AuthEvent::OpenAuth) => AppPhase::Auth,
        (_, AuthEvent::BackToLanding) => AppPhase::Landing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_in_always_reaches_dashboard() {
        for phase in [
            AppPhase::Landing,
            AppPhase::Auth,
            AppPhase::Dashboard,
            AppPhase::VerificationPending,
        ] {
            assert_eq!(
                apply_auth_event(phase, &AuthEvent::SignedIn { verified: false }),
                AppPhase::Dashboard
            );
        }
    }

    #[test]
    fn sign_out_only_bounces_from_inside() {
        assert_eq!(
            apply_auth_event(AppPhase::Dashboard, &AuthEvent::SignedOut),
            AppPhase::Landing
        );
        assert_eq!(
            apply_auth_event(AppPhase::Auth, &AuthEvent::SignedOut),
            AppPhase::Auth
        );
        assert_eq!(
            apply_auth_event(AppPhase::Landing, &AuthEvent::SignedOut),
            AppPhase::Landing
        );
    }

    #[test]
    fn verification_email_pends() {
        assert_eq!(
            apply_auth_event(AppPhase::Auth, &AuthEvent::VerificationEmailSent),
            AppPhase::VerificationPending
        );
    }
}
