//! In-memory session registry plus the active session pointer.
use std::collections::HashMap;

use itertools::Itertools;

use super::models::Session;

#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    active: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Unknown ids are ignored. Removing the active session clears
    /// the active pointer.
    pub fn remove(&mut self, id: &str) {
        if self.sessions.remove(id).is_some() && self.active.as_deref() == Some(id) {
            self.active = None;
        }
    }

    /// Most recent first
    pub fn list(&self) -> Vec<Session> {
        self.sessions
            .values()
            .sorted_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned()
            .collect()
    }

    /// `None` deselects. Unknown ids are ignored.
    pub fn set_active(&mut self, id: Option<&str>) {
        match id {
            None => self.active = None,
            Some(id) if self.sessions.contains_key(id) => self.active = Some(id.to_string()),
            Some(_) => {}
        }
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref().and_then(|id| self.sessions.get(id))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Mirror a listing from the backend exactly. Returns true if the
    /// active session disappeared as a result.
    pub fn sync(&mut self, sessions: Vec<Session>) -> bool {
        self.sessions = sessions.into_iter().map(|s| (s.id.clone(), s)).collect();
        match &self.active {
            Some(id) if !self.sessions.contains_key(id) => {
                self.active = None;
                true
            }
            _ => false,
        }
    }
}
