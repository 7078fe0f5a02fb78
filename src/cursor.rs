//! Remote cursor tracker: last known pointer position per participant.
//!
//! Pure last-write-wins. Positions carry no history and no ordering; only the
//! latest update matters. Usernames are copied in at update time so the cursor
//! layer can label markers without consulting the roster every frame.

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;

use std::collections::BTreeMap;

use crate::model::{Cursor, UserId};

#[derive(Debug, Default)]
pub struct CursorTracker {
    cursors: BTreeMap<UserId, Cursor>,
}

impl CursorTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest position of `user_id`, replacing any previous one.
    pub fn set_cursor(&mut self, user_id: &str, x: f64, y: f64, color: Option<String>, username: Option<String>) {
        self.cursors
            .insert(user_id.to_owned(), Cursor { user_id: user_id.to_owned(), x, y, color, username });
    }

    /// Forget `user_id`'s cursor. Returns `true` if one was tracked.
    pub fn remove_cursor(&mut self, user_id: &str) -> bool {
        self.cursors.remove(user_id).is_some()
    }

    /// Every tracked cursor keyed by user id.
    #[must_use]
    pub fn snapshot(&self) -> &BTreeMap<UserId, Cursor> {
        &self.cursors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
