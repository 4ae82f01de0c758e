use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender};

/// Work handed back to the UI thread from background threads.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuntimeCommand {
    /// JSON message text posted by the peer window.
    Deliver(String),
    PresenterReady,
    PresenterClosed,
}

pub type RuntimeCommandSender = Sender<RuntimeCommand>;
pub type RuntimeCommandReceiver = Receiver<RuntimeCommand>;

pub fn command_channel() -> (RuntimeCommandSender, RuntimeCommandReceiver) {
    mpsc::channel()
}
