//! Flash notices carried across a redirect in the session.

use actix_session::Session;
use serde::{Deserialize, Serialize};

const NOTICE_SESSION_KEY: &str = "notices";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// CSS class used by the templates.
    pub fn css_class(&self) -> &'static str {
        match self.level {
            NoticeLevel::Success => "notice-success",
            NoticeLevel::Warning => "notice-warning",
            NoticeLevel::Error => "notice-error",
        }
    }
}

/// Queues a notice for the next rendered page.
pub fn push_notice(session: &Session, notice: Notice) {
    let mut notices = session
        .get::<Vec<Notice>>(NOTICE_SESSION_KEY)
        .ok()
        .flatten()
        .unwrap_or_default();
    notices.push(notice);

    if let Err(e) = session.insert(NOTICE_SESSION_KEY, notices) {
        log::warn!("Failed to store flash notice: {}", e);
    }
}

/// Removes and returns all queued notices.
pub fn take_notices(session: &Session) -> Vec<Notice> {
    session
        .remove_as::<Vec<Notice>>(NOTICE_SESSION_KEY)
        .and_then(Result::ok)
        .unwrap_or_default()
}
