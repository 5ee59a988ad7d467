//! Dismissible user notices.
//!
//! Recoverable failures (a list that could not refresh, a write that was
//! rolled back) are posted here instead of being returned to a renderer
//! that may already be gone. The board keeps the most recent notices up to
//! its capacity and fans every change out over a broadcast channel.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use brokerdesk_core::error::{AppError, ErrorKind};

/// A user-facing notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    /// Notice identifier, used to dismiss it.
    pub id: u64,
    /// The failure category that produced the notice.
    pub kind: ErrorKind,
    /// Text shown to the user.
    pub message: String,
    /// When the notice was posted.
    pub posted_at: DateTime<Utc>,
}

/// A change on the board.
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeEvent {
    /// A notice was posted.
    Posted(Notice),
    /// A notice was dismissed (or evicted).
    Dismissed(u64),
}

/// Bounded board of active notices.
#[derive(Debug)]
pub struct NoticeBoard {
    capacity: usize,
    next_id: AtomicU64,
    active: Mutex<VecDeque<Notice>>,
    events: broadcast::Sender<NoticeEvent>,
}

impl NoticeBoard {
    /// Create a board holding at most `capacity` notices.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (events, _) = broadcast::channel(capacity * 2);
        Self {
            capacity,
            next_id: AtomicU64::new(1),
            active: Mutex::new(VecDeque::with_capacity(capacity)),
            events,
        }
    }

    /// Post a notice and return its id.
    ///
    /// When the board is full the oldest notice is evicted.
    pub fn post(&self, kind: ErrorKind, message: impl Into<String>) -> u64 {
        let notice = Notice {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            kind,
            message: message.into(),
            posted_at: Utc::now(),
        };
        let id = notice.id;

        let evicted = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            let evicted = if active.len() >= self.capacity {
                active.pop_front().map(|n| n.id)
            } else {
                None
            };
            active.push_back(notice.clone());
            evicted
        };

        if let Some(old) = evicted {
            let _ = self.events.send(NoticeEvent::Dismissed(old));
        }
        debug!(id, %kind, "Notice posted");
        let _ = self.events.send(NoticeEvent::Posted(notice));
        id
    }

    /// Post a notice for an error, if it is the kind users see.
    pub fn post_error(&self, err: &AppError) -> Option<u64> {
        err.is_user_visible()
            .then(|| self.post(err.kind, err.message.clone()))
    }

    /// Dismiss a notice. Returns `false` if it was not active.
    pub fn dismiss(&self, id: u64) -> bool {
        let removed = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            let before = active.len();
            active.retain(|n| n.id != id);
            active.len() != before
        };
        if removed {
            let _ = self.events.send(NoticeEvent::Dismissed(id));
        }
        removed
    }

    /// Active notices, oldest first.
    pub fn active(&self) -> Vec<Notice> {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Subscribe to board changes.
    pub fn subscribe(&self) -> broadcast::Receiver<NoticeEvent> {
        self.events.subscribe()
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_and_dismiss() {
        let board = NoticeBoard::new(5);
        let id = board.post(ErrorKind::Fetch, "Could not refresh leads");
        assert_eq!(board.active().len(), 1);
        assert!(board.dismiss(id));
        assert!(!board.dismiss(id));
        assert!(board.active().is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let board = NoticeBoard::new(2);
        let first = board.post(ErrorKind::Write, "a");
        board.post(ErrorKind::Write, "b");
        board.post(ErrorKind::Write, "c");
        let ids: Vec<u64> = board.active().iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&first));
    }

    #[test]
    fn test_decode_errors_are_not_posted() {
        let board = NoticeBoard::default();
        assert!(board.post_error(&AppError::decode("bad frame")).is_none());
        assert!(board.post_error(&AppError::write("rejected")).is_some());
    }

    #[tokio::test]
    async fn test_subscribers_see_posts() {
        let board = NoticeBoard::default();
        let mut rx = board.subscribe();
        board.post(ErrorKind::Fetch, "offline");
        match rx.recv().await.unwrap() {
            NoticeEvent::Posted(notice) => assert_eq!(notice.message, "offline"),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
