//! Connected pages and the messages the worker posts to them.
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::lock::mutex_lock;

/// What a page should do after receiving a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Reload,
}

/// Messages posted from the worker to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Every cache generation was removed; the page should reload.
    CacheCleared { action: ClientAction },
}

impl ClientMessage {
    pub fn cache_cleared() -> Self {
        ClientMessage::CacheCleared { action: ClientAction::Reload }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientId(pub u64);

struct ClientSlot {
    controlled: bool,
    tx: mpsc::UnboundedSender<ClientMessage>,
}

#[derive(Default)]
struct ClientTable {
    next_id: u64,
    slots: BTreeMap<ClientId, ClientSlot>,
}

/// A page as seen from the worker.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ClientId,
    pub controlled: bool,
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ClientHandle {
    /// Post a message. Returns false if the page has gone away.
    pub fn post_message(&self, message: ClientMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Registry of open pages in scope.
#[derive(Clone, Default)]
pub struct Clients {
    inner: Arc<Mutex<ClientTable>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page and return its id plus the channel its messages arrive on.
    pub fn connect(&self, controlled: bool) -> (ClientId, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut table = mutex_lock(&self.inner, "intercept::notify", "connect");
        let id = ClientId(table.next_id);
        table.next_id += 1;
        table.slots.insert(id, ClientSlot { controlled, tx });
        (id, rx)
    }

    pub fn disconnect(&self, id: ClientId) {
        mutex_lock(&self.inner, "intercept::notify", "disconnect").slots.remove(&id);
    }

    /// Open pages, optionally including those the worker does not control yet.
    pub fn match_all(&self, include_uncontrolled: bool) -> Vec<ClientHandle> {
        let table = mutex_lock(&self.inner, "intercept::notify", "match_all");
        table
            .slots
            .iter()
            .filter(|(_, slot)| include_uncontrolled || slot.controlled)
            .map(|(id, slot)| ClientHandle { id: *id, controlled: slot.controlled, tx: slot.tx.clone() })
            .collect()
    }

    /// Take control of every open page. Returns how many pages changed hands.
    pub fn claim(&self) -> usize {
        let mut table = mutex_lock(&self.inner, "intercept::notify", "claim");
        let mut claimed = 0;
        for slot in table.slots.values_mut().filter(|slot| !slot.controlled) {
            slot.controlled = true;
            claimed += 1;
        }
        claimed
    }

    pub fn is_controlled(&self, id: ClientId) -> bool {
        let table = mutex_lock(&self.inner, "intercept::notify", "is_controlled");
        table.slots.get(&id).map(|slot| slot.controlled).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner, "intercept::notify", "len").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Broadcasts worker messages to pages.
#[derive(Clone)]
pub struct ClientNotifier {
    clients: Clients,
}

impl ClientNotifier {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    /// Tell every open page, controlled or not, that the caches were cleared.
    ///
    /// Pages that have gone away are skipped. Returns the number of pages reached.
    pub fn broadcast_cache_cleared(&self) -> usize {
        let message = ClientMessage::cache_cleared();
        let delivered = self
            .clients
            .match_all(true)
            .iter()
            .filter(|client| client.post_message(message.clone()))
            .count();
        tracing::info!("notified {} client(s) that caches were cleared", delivered);
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_value(ClientMessage::cache_cleared()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "CACHE_CLEARED", "action": "reload"}));

        let parsed: ClientMessage = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ClientMessage::cache_cleared());
    }

    #[test]
    fn test_match_all_filters_uncontrolled() {
        let clients = Clients::new();
        let (_a, _rx_a) = clients.connect(true);
        let (_b, _rx_b) = clients.connect(false);

        assert_eq!(clients.match_all(false).len(), 1);
        assert_eq!(clients.match_all(true).len(), 2);
    }

    #[test]
    fn test_claim_controls_every_page() {
        let clients = Clients::new();
        let (a, _rx_a) = clients.connect(true);
        let (b, _rx_b) = clients.connect(false);

        assert_eq!(clients.claim(), 1);
        assert!(clients.is_controlled(a));
        assert!(clients.is_controlled(b));
        assert_eq!(clients.claim(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_pages() {
        let clients = Clients::new();
        let (_a, mut rx_a) = clients.connect(true);
        let (_b, mut rx_b) = clients.connect(false);
        let notifier = ClientNotifier::new(clients);

        assert_eq!(notifier.broadcast_cache_cleared(), 2);
        assert_eq!(rx_a.recv().await, Some(ClientMessage::cache_cleared()));
        assert_eq!(rx_b.recv().await, Some(ClientMessage::cache_cleared()));
    }

    #[test]
    fn test_broadcast_skips_closed_pages() {
        let clients = Clients::new();
        let (_a, rx_a) = clients.connect(true);
        let (_b, _rx_b) = clients.connect(true);
        drop(rx_a);

        let notifier = ClientNotifier::new(clients.clone());
        assert_eq!(notifier.broadcast_cache_cleared(), 1);
    }

    #[test]
    fn test_disconnect() {
        let clients = Clients::new();
        let (a, _rx) = clients.connect(true);
        clients.disconnect(a);
        assert!(clients.is_empty());
        assert!(!clients.is_controlled(a));
    }
}
