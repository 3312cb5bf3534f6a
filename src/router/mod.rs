//! Backend server selection
//!
//! The `BackendSelector` walks the configured backends in order and hands
//! out the first one with a free slot, already reserved. Selection is
//! deliberately first-fit: earlier backends fill up before later ones are
//! touched, so ordering in the config expresses preference.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use nntp_auth_proxy::config::BackendConfig;
//! use nntp_auth_proxy::registry::ConnectionRegistry;
//! use nntp_auth_proxy::router::BackendSelector;
//!
//! let backends = vec![
//!     BackendConfig::builder("news1.example.com", 119).name("primary").max_connections(1).build().unwrap(),
//!     BackendConfig::builder("news2.example.com", 119).name("spare").build().unwrap(),
//! ];
//! let registry = Arc::new(ConnectionRegistry::new(
//!     backends.iter().map(|b| (b.name.to_string(), b.max_connections)),
//!     Vec::<(String, _)>::new(),
//! ));
//! let selector = BackendSelector::new(backends, registry);
//!
//! let first = selector.select_and_reserve().unwrap();
//! assert_eq!(first.config().name.as_str(), "primary");
//! let second = selector.select_and_reserve().unwrap();
//! assert_eq!(second.config().name.as_str(), "spare");
//! ```

use std::sync::Arc;
use tracing::debug;

use crate::config::BackendConfig;
use crate::registry::{BackendReservation, ConnectionRegistry};

/// A backend chosen for a session, with its slot held
///
/// Dropping it releases the slot.
#[derive(Debug)]
pub struct SelectedBackend {
    config: Arc<BackendConfig>,
    reservation: BackendReservation,
}

impl SelectedBackend {
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        self.reservation.backend()
    }
}

/// First-fit backend selection over the configured list
#[derive(Debug, Clone)]
pub struct BackendSelector {
    backends: Arc<[Arc<BackendConfig>]>,
    registry: Arc<ConnectionRegistry>,
}

impl BackendSelector {
    pub fn new(backends: Vec<BackendConfig>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            backends: backends.into_iter().map(Arc::new).collect(),
            registry,
        }
    }

    /// Reserve the first backend in configured order with spare capacity
    ///
    /// Returns `None` without reserving anything when every backend is full.
    pub fn select_and_reserve(&self) -> Option<SelectedBackend> {
        let selected = self.backends.iter().find_map(|backend| {
            self.registry
                .reserve_backend(backend.name.as_str())
                .map(|reservation| SelectedBackend {
                    config: Arc::clone(backend),
                    reservation,
                })
        });

        match &selected {
            Some(backend) => debug!(backend = backend.name(), "Selected backend"),
            None => debug!("All backends at capacity"),
        }
        selected
    }

    /// Number of configured backends
    #[must_use]
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MaxConnections;

    fn selector(caps: &[(&str, usize)]) -> BackendSelector {
        let backends: Vec<_> = caps
            .iter()
            .map(|(name, cap)| {
                BackendConfig::builder(format!("{name}.example.com"), 119)
                    .name(*name)
                    .max_connections(*cap)
                    .build()
                    .unwrap()
            })
            .collect();
        let registry = Arc::new(ConnectionRegistry::new(
            backends.iter().map(|b| (b.name.to_string(), b.max_connections)),
            Vec::<(String, MaxConnections)>::new(),
        ));
        BackendSelector::new(backends, registry)
    }

    #[test]
    fn test_first_fit_order() {
        let selector = selector(&[("a", 2), ("b", 1), ("c", 1)]);
        let picks: Vec<_> = (0..4)
            .map(|_| selector.select_and_reserve().unwrap())
            .collect();
        let names: Vec<_> = picks.iter().map(SelectedBackend::name).collect();
        assert_eq!(names, ["a", "a", "b", "c"]);
        assert!(selector.select_and_reserve().is_none());
    }

    #[test]
    fn test_exhausted_reserves_nothing() {
        let selector = selector(&[("a", 1)]);
        let held = selector.select_and_reserve().unwrap();
        assert!(selector.select_and_reserve().is_none());
        assert_eq!(selector.registry().backend_active("a"), Some(1));
        drop(held);
        assert_eq!(selector.registry().backend_active("a"), Some(0));
    }

    #[test]
    fn test_released_slot_is_reused_before_later_backends() {
        let selector = selector(&[("a", 1), ("b", 1)]);
        let first = selector.select_and_reserve().unwrap();
        assert_eq!(first.name(), "a");
        drop(first);

        let again = selector.select_and_reserve().unwrap();
        assert_eq!(again.name(), "a");
    }

    #[test]
    fn test_selected_carries_config() {
        let selector = selector(&[("a", 1)]);
        let picked = selector.select_and_reserve().unwrap();
        assert_eq!(picked.config().address(), "a.example.com:119");
        assert_eq!(selector.backend_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_selection_fills_in_order() {
        let selector = selector(&[("a", 3), ("b", 2), ("c", 2)]);
        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let selector = selector.clone();
                tokio::spawn(async move { selector.select_and_reserve() })
            })
            .collect();

        let mut held = Vec::new();
        for task in tasks {
            if let Some(picked) = task.await.unwrap() {
                held.push(picked);
            }
        }

        assert_eq!(held.len(), 7);
        let count = |name: &str| held.iter().filter(|p| p.name() == name).count();
        assert_eq!((count("a"), count("b"), count("c")), (3, 2, 2));
    }
}
