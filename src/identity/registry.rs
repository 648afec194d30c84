//! Server-managed caller registry keyed by client IP.
//!
//! Covers the case where callers carry no credential at all: the gate still
//! needs a stable identity for rate limiting and usage reporting, so the
//! registry assigns one per client IP and keeps lightweight metadata about
//! each caller it has seen.

use crate::request::RequestHeaders;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Identity handed out when no client IP can be determined.
const UNKNOWN_CALLER: &str = "unknown_caller";

/// Metadata kept per registered caller.
#[derive(Debug, Clone)]
pub struct CallerInfo {
    /// Assigned caller identity.
    pub id: String,
    /// Client IP the identity was assigned to.
    pub ip_address: String,
    /// `User-Agent` header from the first request, if any.
    pub user_agent: Option<String>,
    /// Wall-clock milliseconds of the first request.
    pub first_seen: i64,
    /// Wall-clock milliseconds of the most recent request.
    pub last_seen: i64,
    /// Number of requests seen from this caller.
    pub request_count: u64,
}

#[derive(Default)]
struct RegistryState {
    callers: HashMap<String, CallerInfo>,
    ip_to_caller: HashMap<String, String>,
}

/// IP-keyed caller registry.
///
/// Cloning shares the underlying state; the registry is a handle, same as
/// the other gate state maps.
#[derive(Clone, Default)]
pub struct CallerRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl CallerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identify the caller behind `headers`, registering a new identity for
    /// an unseen IP and updating metadata for a known one. The returned
    /// identity is stable across requests from the same IP.
    pub fn identify(&self, headers: &RequestHeaders) -> String {
        let Some(ip) = headers.client_ip() else {
            return UNKNOWN_CALLER.to_string();
        };
        let now = chrono::Utc::now().timestamp_millis();

        let mut state = self.inner.lock();
        if let Some(id) = state.ip_to_caller.get(ip).cloned() {
            if let Some(info) = state.callers.get_mut(&id) {
                info.last_seen = now;
                info.request_count += 1;
            }
            return id;
        }

        let id = new_caller_id(ip, now);
        let info = CallerInfo {
            id: id.clone(),
            ip_address: ip.to_string(),
            user_agent: headers.get("User-Agent").map(ToString::to_string),
            first_seen: now,
            last_seen: now,
            request_count: 1,
        };
        state.ip_to_caller.insert(ip.to_string(), id.clone());
        state.callers.insert(id.clone(), info);
        id
    }

    /// Metadata for a registered caller, if known.
    #[must_use]
    pub fn info(&self, caller_id: &str) -> Option<CallerInfo> {
        self.inner.lock().callers.get(caller_id).cloned()
    }

    /// Snapshot of all registered callers.
    #[must_use]
    pub fn list(&self) -> Vec<CallerInfo> {
        self.inner.lock().callers.values().cloned().collect()
    }

    /// Evict callers idle for longer than `max_age`, returning how many were
    /// removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Utc::now().timestamp_millis()
            - i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);

        let mut state = self.inner.lock();
        let stale: Vec<CallerInfo> = state
            .callers
            .values()
            .filter(|info| info.last_seen < cutoff)
            .cloned()
            .collect();
        for info in &stale {
            state.ip_to_caller.remove(&info.ip_address);
            state.callers.remove(&info.id);
        }
        stale.len()
    }

    /// Number of registered callers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().callers.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().callers.is_empty()
    }
}

fn new_caller_id(ip: &str, now_millis: i64) -> String {
    let digest = Sha256::digest(ip.as_bytes());
    let mut ip_hash = hex::encode(digest);
    ip_hash.truncate(8);
    format!("caller_{ip_hash}_{now_millis}")
}
