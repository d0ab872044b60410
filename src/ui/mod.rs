//! Shared terminal UI pieces.

pub mod error;
pub mod notice;

pub use error::{render_error, wait_for_dismissal, ErrorScreen};
pub use notice::NoticeBoard;
