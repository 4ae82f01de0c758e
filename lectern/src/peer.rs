use std::rc::Rc;
use std::sync::mpsc::Sender;

use crate::sync::{SyncMessage, to_message};

/// A second window kept in sync with this one. Delivery is best-effort.
pub trait PeerWindow {
    fn post_message(&self, message: &SyncMessage) -> Result<(), String>;
}

/// Delivers JSON-encoded messages over an in-process channel.
pub struct ChannelPeerWindow {
    sender: Sender<String>,
}

impl ChannelPeerWindow {
    pub fn new(sender: Sender<String>) -> Self {
        Self { sender }
    }
}

impl PeerWindow for ChannelPeerWindow {
    fn post_message(&self, message: &SyncMessage) -> Result<(), String> {
        let message = to_message(message)?;
        self.sender
            .send(message)
            .map_err(|_| "peer window channel closed".to_string())
    }
}

/// Owns the optional peer handle. The controller only ever reads it.
#[derive(Clone, Default)]
pub struct PresentationContext {
    peer: Option<Rc<dyn PeerWindow>>,
}

impl PresentationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peer(peer: Rc<dyn PeerWindow>) -> Self {
        Self { peer: Some(peer) }
    }

    pub fn attach(&mut self, peer: Rc<dyn PeerWindow>) {
        self.peer = Some(peer);
    }

    pub fn detach(&mut self) -> Option<Rc<dyn PeerWindow>> {
        self.peer.take()
    }

    pub fn peer(&self) -> Option<&dyn PeerWindow> {
        self.peer.as_deref()
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }
}
