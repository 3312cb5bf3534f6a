//! Connection accounting for backends and users
//!
//! One mutex guards every counter, so check-and-increment is a single
//! critical section and a snapshot is never torn. Counters never exceed
//! their cap and never go below zero.
//!
//! Sessions hold reservations as [`UserReservation`] / [`BackendReservation`]
//! guards, which release on drop. Each reservation is therefore released
//! exactly once, whichever way the session ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::MaxConnections;

#[derive(Debug, Clone, Copy)]
struct Slot {
    active: usize,
    capacity: usize,
}

impl Slot {
    fn new(capacity: MaxConnections) -> Self {
        Self {
            active: 0,
            capacity: capacity.get(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        if self.active < self.capacity {
            self.active += 1;
            true
        } else {
            false
        }
    }

    fn release(&mut self) -> bool {
        if self.active > 0 {
            self.active -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Backends in configured order
    backends: Vec<(String, Slot)>,
    backend_index: HashMap<String, usize>,
    users: HashMap<String, Slot>,
}

impl RegistryState {
    fn backend_mut(&mut self, name: &str) -> Option<&mut Slot> {
        let index = *self.backend_index.get(name)?;
        self.backends.get_mut(index).map(|(_, slot)| slot)
    }
}

/// Load of a single backend at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendLoad {
    pub name: String,
    pub active: usize,
    pub capacity: usize,
}

/// Lock-protected connection counters
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    /// Create a registry with every counter at zero
    ///
    /// Backend order is kept for [`snapshot`](Self::snapshot). A repeated
    /// name keeps its first position and capacity.
    pub fn new<B, U, S, T>(backends: B, users: U) -> Self
    where
        B: IntoIterator<Item = (S, MaxConnections)>,
        U: IntoIterator<Item = (T, MaxConnections)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut state = RegistryState::default();
        for (name, cap) in backends {
            let name = name.into();
            if state.backend_index.contains_key(&name) {
                continue;
            }
            state.backend_index.insert(name.clone(), state.backends.len());
            state.backends.push((name, Slot::new(cap)));
        }
        for (name, cap) in users {
            state.users.entry(name.into()).or_insert_with(|| Slot::new(cap));
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Create a registry for the backends and users in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .backends
                .iter()
                .map(|b| (b.name.as_str(), b.max_connections)),
            config
                .users
                .iter()
                .map(|u| (u.username.as_str(), u.max_connections)),
        )
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Counters stay consistent even if a holder panicked: every
        // mutation is a single increment or decrement.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take one of `username`'s connection slots if any is free
    pub fn try_reserve_user(&self, username: &str) -> bool {
        let mut state = self.lock();
        match state.users.get_mut(username) {
            Some(slot) => slot.try_acquire(),
            None => {
                warn!(username, "Reservation requested for unknown user");
                false
            }
        }
    }

    /// Give back one of `username`'s slots
    ///
    /// Releasing with nothing reserved leaves the count at zero.
    pub fn release_user(&self, username: &str) {
        let mut state = self.lock();
        match state.users.get_mut(username) {
            Some(slot) => {
                if !slot.release() {
                    warn!(username, "User released without an active reservation");
                }
            }
            None => warn!(username, "Release requested for unknown user"),
        }
    }

    /// Take one of `backend`'s connection slots if any is free
    pub fn try_reserve_backend(&self, backend: &str) -> bool {
        let mut state = self.lock();
        match state.backend_mut(backend) {
            Some(slot) => slot.try_acquire(),
            None => {
                warn!(backend, "Reservation requested for unknown backend");
                false
            }
        }
    }

    /// Give back one of `backend`'s slots
    ///
    /// Releasing with nothing reserved leaves the count at zero.
    pub fn release_backend(&self, backend: &str) {
        let mut state = self.lock();
        match state.backend_mut(backend) {
            Some(slot) => {
                if !slot.release() {
                    warn!(backend, "Backend released without an active reservation");
                }
            }
            None => warn!(backend, "Release requested for unknown backend"),
        }
    }

    /// Per-backend `(name, active, capacity)` in configured order
    pub fn snapshot(&self) -> Vec<BackendLoad> {
        let state = self.lock();
        state
            .backends
            .iter()
            .map(|(name, slot)| BackendLoad {
                name: name.clone(),
                active: slot.active,
                capacity: slot.capacity,
            })
            .collect()
    }

    /// Current count for a user, `None` if unknown
    pub fn user_active(&self, username: &str) -> Option<usize> {
        self.lock().users.get(username).map(|slot| slot.active)
    }

    /// Current count for a backend, `None` if unknown
    pub fn backend_active(&self, backend: &str) -> Option<usize> {
        self.lock().backend_mut(backend).map(|slot| slot.active)
    }

    /// Reserve a user slot, returning a guard that releases it on drop
    pub fn reserve_user(self: &Arc<Self>, username: &str) -> Option<UserReservation> {
        self.try_reserve_user(username).then(|| {
            debug!(username, "User slot reserved");
            UserReservation {
                registry: Arc::clone(self),
                username: username.to_string(),
            }
        })
    }

    /// Reserve a backend slot, returning a guard that releases it on drop
    pub fn reserve_backend(self: &Arc<Self>, backend: &str) -> Option<BackendReservation> {
        self.try_reserve_backend(backend).then(|| {
            debug!(backend, "Backend slot reserved");
            BackendReservation {
                registry: Arc::clone(self),
                backend: backend.to_string(),
            }
        })
    }
}

/// A held user slot, released when dropped
#[derive(Debug)]
#[must_use = "dropping the reservation releases the slot immediately"]
pub struct UserReservation {
    registry: Arc<ConnectionRegistry>,
    username: String,
}

impl UserReservation {
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Drop for UserReservation {
    fn drop(&mut self) {
        self.registry.release_user(&self.username);
        debug!(username = %self.username, "User slot released");
    }
}

/// A held backend slot, released when dropped
#[derive(Debug)]
#[must_use = "dropping the reservation releases the slot immediately"]
pub struct BackendReservation {
    registry: Arc<ConnectionRegistry>,
    backend: String,
}

impl BackendReservation {
    pub fn backend(&self) -> &str {
        &self.backend
    }
}

impl Drop for BackendReservation {
    fn drop(&mut self) {
        self.registry.release_backend(&self.backend);
        debug!(backend = %self.backend, "Backend slot released");
    }
}
