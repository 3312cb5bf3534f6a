//! Per-connection session state

use crate::registry::UserReservation;
use crate::router::SelectedBackend;
use crate::stream::ConnectionStream;

/// A backend bound to the session after a successful handshake
///
/// The user and backend reservations live here and nowhere else, so
/// dropping this value is what releases them.
#[derive(Debug)]
pub struct AttachedBackend {
    pub stream: ConnectionStream,
    pub backend: SelectedBackend,
    pub user: UserReservation,
}

impl AttachedBackend {
    pub fn username(&self) -> &str {
        self.user.username()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

/// Mutable state for one client connection
#[derive(Debug, Default)]
pub struct SessionState {
    /// Most recent command line, without its line terminator
    pub last_command: String,
    /// Backend and username, set together once authentication completes
    attached: Option<AttachedBackend>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.attached.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.attached.as_ref().map(AttachedBackend::username)
    }

    /// Bind a backend; a previously attached one is released first
    pub fn attach(&mut self, attached: AttachedBackend) {
        self.attached = Some(attached);
    }

    pub fn attached_mut(&mut self) -> Option<&mut AttachedBackend> {
        self.attached.as_mut()
    }

    /// Take the attached backend out, leaving the session unauthenticated
    ///
    /// Calling it again returns `None`, so teardown can run any number of
    /// times and still release each reservation once.
    pub fn detach(&mut self) -> Option<AttachedBackend> {
        self.attached.take()
    }
}
