//! Correlation registry: routes inbound frames to the callers waiting on them.

use std::collections::HashMap;
use std::fmt;

use hzlink_core::ClientMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc;

struct Entry {
    sender: mpsc::UnboundedSender<ClientMessage>,
    auto_remove: bool,
}

/// Outcome of routing one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The frame was handed to a waiting callback.
    Delivered {
        /// Whether the entry was removed because it was registered as auto-remove.
        removed: bool,
    },
    /// No entry is registered for the frame's correlation id.
    Unmatched,
    /// An entry existed but its callback had been dropped; the entry was removed.
    Abandoned,
}

/// Receiving end of a registry entry.
///
/// Frames arrive in the order the reader task routed them. [`recv`](Self::recv)
/// returns `None` once the entry is removed and every delivered frame has been
/// consumed, which is how a closed connection is observed.
pub struct ResponseCallback {
    correlation_id: i64,
    auto_remove: bool,
    receiver: mpsc::UnboundedReceiver<ClientMessage>,
}

impl ResponseCallback {
    /// Returns the correlation id this callback is registered under.
    pub fn correlation_id(&self) -> i64 {
        self.correlation_id
    }

    /// Returns true if the entry is removed after its first delivery.
    pub fn is_auto_remove(&self) -> bool {
        self.auto_remove
    }

    /// Waits for the next frame routed to this callback.
    pub async fn recv(&mut self) -> Option<ClientMessage> {
        self.receiver.recv().await
    }

    /// Returns an already delivered frame without waiting.
    pub fn try_recv(&mut self) -> Option<ClientMessage> {
        self.receiver.try_recv().ok()
    }
}

impl fmt::Debug for ResponseCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCallback")
            .field("correlation_id", &self.correlation_id)
            .field("auto_remove", &self.auto_remove)
            .finish()
    }
}

/// Map from correlation id to waiting callback, owned by one connection.
///
/// Every lookup-and-remove runs under a single lock acquisition, so a frame
/// is delivered to an auto-remove entry at most once.
#[derive(Default)]
pub struct CorrelationRegistry {
    entries: Mutex<HashMap<i64, Entry>>,
}

impl CorrelationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in frames carrying `correlation_id`.
    ///
    /// A previous entry under the same id is replaced; its callback then
    /// observes the end of its stream.
    pub fn register(&self, correlation_id: i64, auto_remove: bool) -> ResponseCallback {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.entries.lock().insert(
            correlation_id,
            Entry {
                sender,
                auto_remove,
            },
        );
        ResponseCallback {
            correlation_id,
            auto_remove,
            receiver,
        }
    }

    /// Removes an entry. Returns true if one was registered.
    pub fn forget(&self, correlation_id: i64) -> bool {
        self.entries.lock().remove(&correlation_id).is_some()
    }

    /// Returns a guard that forgets `correlation_id` when dropped, unless it
    /// is [kept](EntryGuard::keep) first.
    pub fn guard(&self, correlation_id: i64) -> EntryGuard<'_> {
        EntryGuard {
            registry: self,
            correlation_id,
            armed: true,
        }
    }

    /// Routes a frame to the entry registered under its correlation id.
    ///
    /// Delivery never blocks: each callback owns an unbounded queue.
    pub fn dispatch(&self, message: ClientMessage) -> Dispatch {
        let correlation_id = message.correlation_id();
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get(&correlation_id) else {
            return Dispatch::Unmatched;
        };
        let auto_remove = entry.auto_remove;

        if entry.sender.send(message).is_err() {
            entries.remove(&correlation_id);
            return Dispatch::Abandoned;
        }
        if auto_remove {
            entries.remove(&correlation_id);
        }
        Dispatch::Delivered {
            removed: auto_remove,
        }
    }

    /// Removes every entry, ending each callback's stream. Returns how many
    /// entries were pending.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<Entry> = self.entries.lock().drain().map(|(_, entry)| entry).collect();
        drained.len()
    }

    /// Returns true if an entry is registered under `correlation_id`.
    pub fn contains(&self, correlation_id: i64) -> bool {
        self.entries.lock().contains_key(&correlation_id)
    }

    /// Returns the number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Scoped ownership of a registry entry.
///
/// Held by a caller between registering and receiving its response, so an
/// entry never outlives a caller that stopped waiting.
#[must_use = "the entry is forgotten as soon as the guard is dropped"]
pub struct EntryGuard<'a> {
    registry: &'a CorrelationRegistry,
    correlation_id: i64,
    armed: bool,
}

impl EntryGuard<'_> {
    /// Leaves the entry registered.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.forget(self.correlation_id);
        }
    }
}

impl fmt::Debug for CorrelationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hzlink_core::protocol::BEGIN_END_FLAG;

    fn frame(correlation_id: i64, message_type: u16) -> ClientMessage {
        let mut message = ClientMessage::create_for_encode(0);
        message.set_correlation_id(correlation_id);
        message.set_message_type(message_type);
        message.set_flags(BEGIN_END_FLAG);
        message.update_frame_length();
        message
    }

    #[tokio::test]
    async fn test_auto_remove_entry_delivered_once() {
        let registry = CorrelationRegistry::new();
        let mut callback = registry.register(5, true);

        assert_eq!(
            registry.dispatch(frame(5, 0x64)),
            Dispatch::Delivered { removed: true }
        );
        assert!(!registry.contains(5));
        assert_eq!(registry.dispatch(frame(5, 0x64)), Dispatch::Unmatched);

        let received = callback.recv().await.unwrap();
        assert_eq!(received.correlation_id(), 5);
        assert!(callback.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_persistent_entry_receives_repeated_frames() {
        let registry = CorrelationRegistry::new();
        let mut callback = registry.register(9, false);

        assert_eq!(
            registry.dispatch(frame(9, 0x68)),
            Dispatch::Delivered { removed: false }
        );
        assert_eq!(
            registry.dispatch(frame(9, 0xcc)),
            Dispatch::Delivered { removed: false }
        );
        assert!(registry.contains(9));

        assert_eq!(callback.recv().await.unwrap().message_type(), 0x68);
        assert_eq!(callback.recv().await.unwrap().message_type(), 0xcc);
        assert!(callback.try_recv().is_none());
    }

    #[test]
    fn test_unmatched_frame() {
        let registry = CorrelationRegistry::new();
        let _callback = registry.register(1, true);
        assert_eq!(registry.dispatch(frame(2, 0x64)), Dispatch::Unmatched);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dropped_callback_is_abandoned() {
        let registry = CorrelationRegistry::new();
        drop(registry.register(3, false));

        assert_eq!(registry.dispatch(frame(3, 0xcc)), Dispatch::Abandoned);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_forget() {
        let registry = CorrelationRegistry::new();
        let _callback = registry.register(4, false);

        assert!(registry.forget(4));
        assert!(!registry.forget(4));
        assert_eq!(registry.dispatch(frame(4, 0xcc)), Dispatch::Unmatched);
    }

    #[tokio::test]
    async fn test_fail_all_ends_every_stream() {
        let registry = CorrelationRegistry::new();
        let mut first = registry.register(10, true);
        let mut second = registry.register(11, false);

        assert_eq!(registry.fail_all(), 2);
        assert!(registry.is_empty());
        assert!(first.recv().await.is_none());
        assert!(second.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_existing_entry() {
        let registry = CorrelationRegistry::new();
        let mut stale = registry.register(6, true);
        let mut fresh = registry.register(6, true);

        registry.dispatch(frame(6, 0x64));
        assert!(stale.recv().await.is_none());
        assert!(fresh.recv().await.is_some());
    }

    #[test]
    fn test_guard_forgets_entry_on_drop() {
        let registry = CorrelationRegistry::new();
        let _callback = registry.register(13, true);

        drop(registry.guard(13));
        assert!(!registry.contains(13));
        assert_eq!(registry.dispatch(frame(13, 0x64)), Dispatch::Unmatched);
    }

    #[test]
    fn test_kept_guard_leaves_entry() {
        let registry = CorrelationRegistry::new();
        let _callback = registry.register(14, false);

        registry.guard(14).keep();
        assert!(registry.contains(14));
        assert_eq!(
            registry.dispatch(frame(14, 0xcc)),
            Dispatch::Delivered { removed: false }
        );
    }

    #[tokio::test]
    async fn test_guard_after_delivery_is_harmless() {
        let registry = CorrelationRegistry::new();
        let mut callback = registry.register(15, true);
        let guard = registry.guard(15);

        registry.dispatch(frame(15, 0x64));
        assert!(callback.recv().await.is_some());
        drop(guard);

        let _other = registry.register(16, true);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_callback_accessors() {
        let registry = CorrelationRegistry::new();
        let callback = registry.register(12, false);
        assert_eq!(callback.correlation_id(), 12);
        assert!(!callback.is_auto_remove());
    }
}
