//! Application-wide constants
//!
//! Field limits mirror the column sizes of the poll tables.

/// Maximum length for a poll title in characters
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length for a poll description in characters
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum length for a single option's text
pub const MAX_OPTION_LENGTH: usize = 255;

/// Maximum length for a comment
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// A poll needs at least this many non-empty options
pub const MIN_POLL_OPTIONS: usize = 2;

/// Upper bound on options per poll
pub const MAX_POLL_OPTIONS: usize = 20;

/// Categories a poll may be filed under
pub const CATEGORIES: &[&str] = &[
    "Politics",
    "Sports",
    "Celebrity",
    "Tech",
    "Markets",
    "Science",
    "Entertainment",
    "Other",
];

/// File extensions accepted for poll images (compared lowercase)
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];
