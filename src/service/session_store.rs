use dashmap::{DashMap, mapref::entry::Entry};

use crate::models::{chat::ChatId, session::QuizSessionState};

/// Active quiz sessions keyed by chat room; at most one per room.
///
/// Every accessor runs its closure while holding the entry's shard lock, so
/// a read-modify-write through [`SessionStore::update`] is atomic with respect
/// to other tasks. Closures must stay synchronous.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<ChatId, QuizSessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.sessions.contains_key(&chat_id)
    }

    pub fn get<R>(&self, chat_id: ChatId, f: impl FnOnce(&QuizSessionState) -> R) -> Option<R> {
        self.sessions.get(&chat_id).map(|entry| f(entry.value()))
    }

    /// Replaces the room's state, or clears it with `None`. Returns the previous state.
    pub fn set(
        &self,
        chat_id: ChatId,
        state: Option<QuizSessionState>,
    ) -> Option<QuizSessionState> {
        match state {
            Some(state) => self.sessions.insert(chat_id, state),
            None => self.remove(chat_id),
        }
    }

    /// Returns false and drops `state` if the room already has a session.
    pub fn insert_if_absent(&self, chat_id: ChatId, state: QuizSessionState) -> bool {
        match self.sessions.entry(chat_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(state);
                true
            }
        }
    }

    pub fn update<R>(
        &self,
        chat_id: ChatId,
        f: impl FnOnce(&mut QuizSessionState) -> R,
    ) -> Option<R> {
        self.sessions
            .get_mut(&chat_id)
            .map(|mut entry| f(entry.value_mut()))
    }

    pub fn remove(&self, chat_id: ChatId) -> Option<QuizSessionState> {
        self.sessions.remove(&chat_id).map(|(_, state)| state)
    }

    /// Removes the room's state only if it still belongs to `session_id`.
    pub fn remove_session(&self, chat_id: ChatId, session_id: u64) -> Option<QuizSessionState> {
        self.sessions
            .remove_if(&chat_id, |_, state| state.session_id == session_id)
            .map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
