//! Queue of user-facing notices.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::recording::Notifier;

/// Collects notices raised by the recorder until the UI shows them.
#[derive(Default)]
pub struct NoticeBoard {
    pending: Mutex<VecDeque<String>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest notice not yet shown.
    pub fn next_notice(&self) -> Option<String> {
        self.pending.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Notifier for NoticeBoard {
    fn alert(&self, message: &str) {
        tracing::warn!("Notice: {}", message);
        self.pending.lock().push_back(message.to_string());
    }
}
