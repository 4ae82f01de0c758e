use ipc_channel::ipc::IpcSender;
use serde::{Deserialize, Serialize};

use crate::peer::PeerWindow;
use crate::sync::{SyncMessage, to_message};

pub type Sender = IpcSender<PresenterEvent>;
pub type Receiver = ipc_channel::ipc::IpcReceiver<PresenterEvent>;

/// Envelope exchanged between the main and presenter processes.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub enum PresenterEvent {
    /// Sent once by the main process after the child reports `Ready`.
    Init {
        deck: String,
        slide: u32,
        manifest: String,
        presenter_url: String,
        advance_keys: Vec<String>,
        retreat_keys: Vec<String>,
    },
    /// A cross-window message, JSON encoded.
    Message(String),
    Ready,
    Quit,
}

/// Peer handle backed by the IPC channel to the other process.
pub struct IpcPeerWindow {
    sender: Sender,
}

impl IpcPeerWindow {
    pub fn new(sender: Sender) -> Self {
        Self { sender }
    }
}

impl PeerWindow for IpcPeerWindow {
    fn post_message(&self, message: &SyncMessage) -> Result<(), String> {
        let message = to_message(message)?;
        self.sender
            .send(PresenterEvent::Message(message))
            .map_err(|err| format!("failed to post to peer window: {}", err))
    }
}

/// URL the presenter web view loads for `path`.
pub fn presenter_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
