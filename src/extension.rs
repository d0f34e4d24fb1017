//! Behavior units and their single-owner registration.
//!
//! An extension is a listener, command or packet handler. It is constructed
//! unbound, bound exactly once to an owning container, and stays bound for
//! the life of the process; there is no unregister transition. The
//! owner-side effect of binding (dispatch-table insertion) lives in the
//! container, not here.

use crate::error::LifecycleError;
use crate::models::key::NamespacedKey;
use crate::models::types::{OwnerId, Priority};
use serde_json::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Listener,
    Command,
    PacketHandler,
}

/// A typed server event, payload opaque to the runtime.
#[derive(Debug, Clone)]
pub struct ServerEvent {
    pub name: String,
    pub data: Value,
}

/// A parsed command invocation from the dispatch source.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub name: String,
    pub args: Vec<String>,
    pub sender: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PacketDirection {
    Serverbound,
    Clientbound,
}

/// A decoded packet; byte-level decoding happens upstream.
#[derive(Debug, Clone)]
pub struct PacketFrame {
    pub packet_type: NamespacedKey,
    pub direction: PacketDirection,
    pub data: Value,
}

/// Cancellation flag threaded through a dispatch pass. Setting it does not
/// stop delivery; later handlers observe it.
#[derive(Debug, Default)]
pub struct EventFlow {
    cancelled: bool,
}

impl EventFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A behavior unit bindable to exactly one owning container.
///
/// Hooks default to no-ops; implement the one matching `kind()`. Packet
/// handlers additionally declare the packet types they want via
/// `packet_whitelist` (empty = all).
pub trait Extension: Send + Sync {
    fn kind(&self) -> ExtensionKind;

    fn name(&self) -> &'static str;

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn packet_whitelist(&self) -> &[NamespacedKey] {
        &[]
    }

    fn on_event(&self, _event: &ServerEvent, _flow: &mut EventFlow) {}

    fn on_command(&self, _cmd: &CommandInvocation, _flow: &mut EventFlow) {}

    fn on_packet(&self, _packet: &PacketFrame, _flow: &mut EventFlow) {}
}

/// Exactly-once binding state machine: `Unbound -> Bound`, terminal.
///
/// The container keeps one guard per extension instance; extensions refer
/// to their owner through the id stored here, never through a strong
/// back-reference.
#[derive(Debug, Default)]
pub struct RegistrationGuard {
    owner: Option<OwnerId>,
}

impl RegistrationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transitions to bound. A second bind is a lifecycle violation and
    /// leaves the first binding untouched.
    pub fn bind(&mut self, owner: OwnerId, extension: &'static str) -> Result<(), LifecycleError> {
        if self.owner.is_some() {
            return Err(LifecycleError::AlreadyRegistered(extension));
        }

        self.owner = Some(owner);
        Ok(())
    }

    pub fn owner(&self, extension: &'static str) -> Result<OwnerId, LifecycleError> {
        self.owner.ok_or(LifecycleError::NotRegistered(extension))
    }

    pub fn is_bound(&self) -> bool {
        self.owner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_is_exactly_once() {
        let mut guard = RegistrationGuard::new();
        let first = OwnerId::new();

        assert!(!guard.is_bound());
        guard.bind(first, "chat_listener").unwrap();
        assert!(guard.is_bound());
        assert_eq!(guard.owner("chat_listener").unwrap(), first);

        let err = guard.bind(OwnerId::new(), "chat_listener").unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyRegistered("chat_listener")));
        // first binding survives the failed rebind
        assert_eq!(guard.owner("chat_listener").unwrap(), first);
    }

    #[test]
    fn owner_before_bind_fails() {
        let guard = RegistrationGuard::new();
        let err = guard.owner("chat_listener").unwrap_err();
        assert!(matches!(err, LifecycleError::NotRegistered("chat_listener")));
    }

    #[test]
    fn flow_cancellation_is_observable() {
        let mut flow = EventFlow::new();
        assert!(!flow.is_cancelled());
        flow.cancel();
        flow.cancel();
        assert!(flow.is_cancelled());
    }
}
