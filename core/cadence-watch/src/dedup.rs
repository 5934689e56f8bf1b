//! Action identifiers and the session-scoped duplicate cache.
//!
//! The page fires more click events than there are user actions, so every
//! counted action gets an identifier and a 30-minute memory. Identifiers are
//! scoped to a per-process session token; nothing here is persisted.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::event::ContainerRef;

const ACTION_TTL_MINUTES: i64 = 30;
const DIGEST_PREFIX_CHARS: usize = 50;

/// Random token identifying this watcher process. Actions from a previous
/// run never collide with the current one.
pub fn session_token() -> String {
    let mut random = rand::thread_rng();
    format!("{}-{:x}", Utc::now().timestamp_millis(), random.next_u64())
}

/// Stable identifier for the content item a click landed on: explicit item
/// id, else permalink, else a digest of the leading text, else random.
pub fn content_id(container: Option<&ContainerRef>) -> String {
    if let Some(container) = container {
        if let Some(id) = non_empty(container.item_id.as_deref()) {
            return id.to_string();
        }
        if let Some(link) = non_empty(container.permalink.as_deref()) {
            return link.to_string();
        }
        if let Some(text) = non_empty(container.text.as_deref()) {
            let lead: String = text.chars().take(DIGEST_PREFIX_CHARS).collect();
            return format!("{:x}", md5::compute(lead.as_bytes()));
        }
    }
    let mut random = rand::thread_rng();
    format!("anon-{:x}", random.next_u64())
}

pub fn action_id(session: &str, kind: &str, container: Option<&ContainerRef>) -> String {
    format!("{}-{}-{}", session, kind, content_id(container))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Identifier-to-last-seen map with eviction on insert.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<String, DateTime<Utc>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers an identifier. Returns false when it is already cached,
    /// which is how duplicates are detected. Entries past the TTL are
    /// evicted first, so a stale identifier counts as new again.
    pub fn insert(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        self.evict_expired(now);
        if self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(id.to_string(), now);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Forgets an identifier; returns whether it was cached. Used by unlike
    /// to undo a like recorded this session.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let ttl = Duration::minutes(ACTION_TTL_MINUTES);
        self.entries
            .retain(|_, seen| now.signed_duration_since(*seen) <= ttl);
    }
}
