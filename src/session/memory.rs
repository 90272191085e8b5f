//! `memory` store — sessions held in process memory.
//!
//! Nothing is persisted; a restart loses every session. Sessions never
//! expire, so memory grows with the number of conversations.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;

use super::{Message, SessionStore, new_session_id};

/// The all-zero UUID some clients send in place of "no session yet".
const NIL_SESSION_ID: &str = "00000000-0000-0000-0000-000000000000";

pub struct MemorySessionStore {
    /// session_id -> chronological messages
    sessions: Mutex<HashMap<String, Vec<Message>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Message>>>, AppError> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Session("memory store lock poisoned".into()))
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn store_type(&self) -> &str {
        "memory"
    }

    fn get_or_create(&self, session_id: Option<&str>) -> Result<(String, Vec<Message>), AppError> {
        let mut sessions = self.lock()?;

        let known = session_id
            .filter(|id| !id.is_empty() && *id != NIL_SESSION_ID)
            .and_then(|id| sessions.get(id).map(|msgs| (id.to_string(), msgs.clone())));
        if let Some(found) = known {
            return Ok(found);
        }

        let id = new_session_id();
        sessions.insert(id.clone(), Vec::new());
        Ok((id, Vec::new()))
    }

    fn append(&self, session_id: &str, message: Message) -> Result<(), AppError> {
        self.lock()?
            .entry(session_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    fn rollback_last(&self, session_id: &str, expected: &Message) -> Result<Option<Message>, AppError> {
        let mut sessions = self.lock()?;
        let Some(messages) = sessions.get_mut(session_id) else {
            return Ok(None);
        };
        if messages.last() != Some(expected) {
            return Ok(None);
        }
        Ok(messages.pop())
    }

    fn get(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        Ok(self.lock()?.get(session_id).cloned().unwrap_or_default())
    }

    fn clear(&self, session_id: &str) -> Result<(), AppError> {
        if let Some(messages) = self.lock()?.get_mut(session_id) {
            messages.clear();
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_none_makes_fresh_session() {
        let store = MemorySessionStore::new();
        let (id, msgs) = store.get_or_create(None).unwrap();
        assert!(!id.is_empty());
        assert!(msgs.is_empty());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn get_or_create_known_id_returns_same_list() {
        let store = MemorySessionStore::new();
        let (id, _) = store.get_or_create(None).unwrap();
        store.append(&id, Message::user("hello")).unwrap();

        let (again, msgs) = store.get_or_create(Some(&id)).unwrap();
        assert_eq!(again, id);
        assert_eq!(msgs, vec![Message::user("hello")]);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn get_or_create_unknown_id_generates_new_one() {
        let store = MemorySessionStore::new();
        let (id, msgs) = store.get_or_create(Some("not-a-session")).unwrap();
        assert_ne!(id, "not-a-session");
        assert!(msgs.is_empty());
    }

    #[test]
    fn empty_and_nil_ids_count_as_absent() {
        let store = MemorySessionStore::new();
        let (a, _) = store.get_or_create(Some("")).unwrap();
        let (b, _) = store.get_or_create(Some(NIL_SESSION_ID)).unwrap();
        assert!(!a.is_empty());
        assert_ne!(b, NIL_SESSION_ID);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn append_preserves_order() {
        let store = MemorySessionStore::new();
        let (id, _) = store.get_or_create(None).unwrap();
        store.append(&id, Message::user("q1")).unwrap();
        store.append(&id, Message::assistant("a1")).unwrap();
        store.append(&id, Message::user("q2")).unwrap();

        let contents: Vec<_> = store.get(&id).unwrap().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["q1", "a1", "q2"]);
    }

    #[test]
    fn append_to_unknown_id_creates_it() {
        let store = MemorySessionStore::new();
        store.append("implicit", Message::user("x")).unwrap();
        assert_eq!(store.get("implicit").unwrap().len(), 1);
    }

    #[test]
    fn rollback_removes_only_last() {
        let store = MemorySessionStore::new();
        let (id, _) = store.get_or_create(None).unwrap();
        store.append(&id, Message::user("q1")).unwrap();
        store.append(&id, Message::assistant("a1")).unwrap();
        store.append(&id, Message::user("q2")).unwrap();

        let q2 = Message::user("q2");
        assert_eq!(store.rollback_last(&id, &q2).unwrap(), Some(q2));
        assert_eq!(store.get(&id).unwrap().len(), 2);
    }

    #[test]
    fn rollback_skips_when_another_turn_landed() {
        let store = MemorySessionStore::new();
        let (id, _) = store.get_or_create(None).unwrap();
        let failed = Message::user("a");
        store.append(&id, failed.clone()).unwrap();
        store.append(&id, Message::user("b")).unwrap();
        store.append(&id, Message::assistant("answer to b")).unwrap();

        assert_eq!(store.rollback_last(&id, &failed).unwrap(), None);
        assert_eq!(store.get(&id).unwrap().last(), Some(&Message::assistant("answer to b")));
        assert_eq!(store.get(&id).unwrap().len(), 3);
    }

    #[test]
    fn rollback_on_empty_or_unknown_is_none() {
        let store = MemorySessionStore::new();
        let (id, _) = store.get_or_create(None).unwrap();
        let m = Message::user("x");
        assert_eq!(store.rollback_last(&id, &m).unwrap(), None);
        assert_eq!(store.rollback_last("ghost", &m).unwrap(), None);
    }

    #[test]
    fn get_unknown_is_empty() {
        let store = MemorySessionStore::new();
        assert!(store.get("ghost").unwrap().is_empty());
    }

    #[test]
    fn clear_empties_but_keeps_session() {
        let store = MemorySessionStore::new();
        let (id, _) = store.get_or_create(None).unwrap();
        store.append(&id, Message::user("q")).unwrap();
        store.clear(&id).unwrap();

        assert!(store.get(&id).unwrap().is_empty());
        let (again, _) = store.get_or_create(Some(&id)).unwrap();
        assert_eq!(again, id);
    }

    #[test]
    fn clear_unknown_is_noop() {
        let store = MemorySessionStore::new();
        store.clear("ghost").unwrap();
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn sessions_are_independent() {
        let store = MemorySessionStore::new();
        let (a, _) = store.get_or_create(None).unwrap();
        let (b, _) = store.get_or_create(None).unwrap();
        store.append(&a, Message::user("for a")).unwrap();

        assert_eq!(store.get(&a).unwrap().len(), 1);
        assert!(store.get(&b).unwrap().is_empty());
    }

    #[test]
    fn store_type_is_memory() {
        assert_eq!(MemorySessionStore::new().store_type(), "memory");
    }
}
