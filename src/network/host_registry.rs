use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

#[derive(Debug, Default)]
struct Hosts {
    order: Vec<String>,
    seen: HashSet<String>,
}

/// Hostnames seen during name resolution, shared by every connection.
///
/// Grows monotonically for the life of the session. Insertion order is kept
/// only so that [`HostRegistry::any_known_host`] is deterministic.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: RwLock<Hosts>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Hosts> {
        self.hosts.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Hosts> {
        self.hosts.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records `hostname`. Empty names are ignored; repeats are no-ops.
    ///
    /// Returns `true` if the name was new.
    pub fn remember(&self, hostname: &str) -> bool {
        if hostname.is_empty() || self.read().seen.contains(hostname) {
            return false;
        }

        let mut hosts = self.write();
        if !hosts.seen.insert(hostname.to_string()) {
            return false;
        }
        hosts.order.push(hostname.to_string());
        debug!("Remembered host {} ({} known)", hostname, hosts.order.len());
        true
    }

    /// The first host ever remembered, if any.
    pub fn any_known_host(&self) -> Option<String> {
        self.read().order.first().cloned()
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.read().seen.contains(hostname)
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all hosts in insertion order.
    pub fn hosts(&self) -> Vec<String> {
        self.read().order.clone()
    }
}
