pub mod poll_comments;
pub mod poll_options;
pub mod poll_votes;
pub mod polls;
