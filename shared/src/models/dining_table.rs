//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Dining table entity (桌台)
///
/// `owner_session_token` is the reclaimable lock. A table is occupied
/// exactly when it has an owner, and `occupied_at` is set exactly then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub number: i32,
    pub is_occupied: bool,
    /// Occupant count
    pub pax: i32,
    pub owner_session_token: Option<String>,
    /// Unix millis of the last acquisition or pax change
    pub occupied_at: Option<i64>,
}

impl DiningTable {
    /// A free table
    pub fn new(id: i64, number: i32) -> Self {
        Self {
            id,
            number,
            is_occupied: false,
            pax: 0,
            owner_session_token: None,
            occupied_at: None,
        }
    }

    /// Free, or held by `session_token`
    pub fn is_accessible_by(&self, session_token: &str) -> bool {
        match &self.owner_session_token {
            None => true,
            Some(owner) => owner == session_token,
        }
    }

    /// Held by `session_token`
    pub fn is_owned_by(&self, session_token: &str) -> bool {
        self.owner_session_token.as_deref() == Some(session_token)
    }

    /// Take the table for a session
    pub fn occupy(&mut self, session_token: &str, pax: i32, now: i64) {
        self.is_occupied = true;
        self.pax = pax;
        self.owner_session_token = Some(session_token.to_string());
        self.occupied_at = Some(now);
    }

    /// Reset to the free state
    pub fn vacate(&mut self) {
        self.is_occupied = false;
        self.pax = 0;
        self.owner_session_token = None;
        self.occupied_at = None;
    }

    /// `is_occupied == owner.is_some()` and `occupied_at` follows it
    pub fn is_consistent(&self) -> bool {
        self.is_occupied == self.owner_session_token.is_some()
            && self.is_occupied == self.occupied_at.is_some()
    }
}
