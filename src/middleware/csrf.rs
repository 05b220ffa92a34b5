//! CSRF protection for the poll forms.
//!
//! One token is generated per session and stored in the session cookie.
//! Every state-changing form carries it in a hidden `csrf_token` field:
//!
//! ```html,ignore
//! <input type="hidden" name="csrf_token" value="{{ client.get_csrf_token() }}">
//! ```
//!
//! Handlers call [`validate_csrf_token`] before acting on the submission.

use actix_session::Session;
use actix_web::{error, Error};
use rand::{distributions::Alphanumeric, Rng};

pub const CSRF_TOKEN_LENGTH: usize = 32;
const CSRF_SESSION_KEY: &str = "csrf_token";

pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Get or create the CSRF token for the current session.
///
/// Called by `ClientCtx` on every request so templates always have a token.
pub fn get_or_create_csrf_token(session: &Session) -> Result<String, Error> {
    match session.get::<String>(CSRF_SESSION_KEY) {
        Ok(Some(token)) => Ok(token),
        _ => {
            let token = generate_csrf_token();
            session
                .insert(CSRF_SESSION_KEY, token.clone())
                .map_err(|_| error::ErrorInternalServerError("Failed to store CSRF token"))?;
            Ok(token)
        }
    }
}

/// Rejects the request with 403 unless `provided_token` matches the session.
pub fn validate_csrf_token(session: &Session, provided_token: &str) -> Result<(), Error> {
    let expected_token = session
        .get::<String>(CSRF_SESSION_KEY)
        .map_err(|_| error::ErrorInternalServerError("Failed to get CSRF token"))?
        .ok_or_else(|| error::ErrorForbidden("CSRF token not found in session"))?;

    if provided_token != expected_token {
        log::warn!("CSRF token validation failed");
        return Err(error::ErrorForbidden("Invalid CSRF token"));
    }

    Ok(())
}
