//! Anonymous per-visitor identity.
//!
//! A visitor is identified by an opaque random token issued once per browser
//! session. It is not an account: clearing cookies yields a new visitor.
//! Core operations receive the identity as an explicit `VisitorId` argument
//! and never read it from the session themselves.

use actix_session::Session;
use actix_web::{error, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

const VISITOR_SESSION_KEY: &str = "visitor_id";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitorId(String);

impl VisitorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issues a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the visitor id stored in the session, issuing one if absent.
pub fn get_or_issue_visitor_id(session: &Session) -> Result<VisitorId, Error> {
    match session.get::<VisitorId>(VISITOR_SESSION_KEY) {
        Ok(Some(visitor)) => Ok(visitor),
        _ => {
            let visitor = VisitorId::generate();
            session
                .insert(VISITOR_SESSION_KEY, visitor.clone())
                .map_err(|_| error::ErrorInternalServerError("Failed to store visitor id"))?;
            log::debug!("Issued new visitor id {}", visitor);
            Ok(visitor)
        }
    }
}
