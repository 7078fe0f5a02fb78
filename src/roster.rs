//! Participant directory fed by the presence collaborator.
//!
//! The engine needs identities for two things: stamping the local user id and
//! color on outgoing strokes, and resolving usernames for remote cursor labels.

#[cfg(test)]
#[path = "roster_test.rs"]
mod roster_test;

use std::collections::BTreeMap;

use crate::model::{Identity, UserId};

#[derive(Debug, Default)]
pub struct Roster {
    self_identity: Option<Identity>,
    room_id: Option<String>,
    users: BTreeMap<UserId, Identity>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a fresh session bootstrap.
    pub fn load(&mut self, self_identity: Identity, users: Vec<Identity>, room_id: Option<String>) {
        self.users = users
            .into_iter()
            .map(|user| (user.user_id.clone(), user))
            .collect();
        self.users
            .insert(self_identity.user_id.clone(), self_identity.clone());
        self.self_identity = Some(self_identity);
        self.room_id = room_id;
    }

    /// Add or refresh a participant.
    pub fn join(&mut self, identity: Identity) {
        self.users.insert(identity.user_id.clone(), identity);
    }

    /// Remove a participant, returning their last known identity.
    pub fn leave(&mut self, user_id: &str) -> Option<Identity> {
        self.users.remove(user_id)
    }

    #[must_use]
    pub fn username_of(&self, user_id: &str) -> Option<&str> {
        self.users
            .get(user_id)
            .map(|user| user.username.as_str())
            .filter(|name| !name.is_empty())
    }

    #[must_use]
    pub fn self_identity(&self) -> Option<&Identity> {
        self.self_identity.as_ref()
    }

    /// Whether `user_id` is the local participant.
    #[must_use]
    pub fn is_self(&self, user_id: &str) -> bool {
        self.self_identity
            .as_ref()
            .is_some_and(|me| me.user_id == user_id)
    }

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    #[must_use]
    pub fn users(&self) -> impl Iterator<Item = &Identity> {
        self.users.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
