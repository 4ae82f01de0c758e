use log::{debug, trace, warn};

use crate::address::SlideAddress;
use crate::navigation::SharedNavigator;
use crate::sync::{Inbound, classify};
use crate::window::{MessageWindow, Subscription};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListenerState {
    Unsubscribed,
    Subscribed,
}

/// Navigates this window when the peer reports a slide change.
pub struct DeckListener {
    deck: String,
    navigator: SharedNavigator,
    subscription: Option<Subscription>,
}

impl DeckListener {
    pub fn new(deck: impl Into<String>, navigator: SharedNavigator) -> Self {
        Self {
            deck: deck.into(),
            navigator,
            subscription: None,
        }
    }

    pub fn deck(&self) -> &str {
        &self.deck
    }

    pub fn state(&self) -> ListenerState {
        if self.subscription.is_some() {
            ListenerState::Subscribed
        } else {
            ListenerState::Unsubscribed
        }
    }

    /// Subscribes to `window`. Without a window (no display, server-side
    /// rendering) this does nothing.
    pub fn mount(&mut self, window: Option<&MessageWindow>) {
        let Some(window) = window else {
            trace!("no window for deck '{}'; not subscribing", self.deck);
            return;
        };

        if self.subscription.is_some() {
            return;
        }

        let deck = self.deck.clone();
        let navigator = self.navigator.clone();

        let subscription = window.add_message_listener(move |event| {
            match classify(&event.data) {
                Inbound::Slide(message) => {
                    let address =
                        SlideAddress::new(&*deck, message.payload.new_slide);
                    debug!("peer moved to {}", address);
                    navigator.borrow_mut().push(&address.to_path());
                }
                Inbound::Malformed(err) => {
                    warn!("dropping malformed slide message: {}", err);
                }
                Inbound::NotForUs => {}
            }
        });

        self.subscription = Some(subscription);
        debug!("deck listener subscribed for '{}'", self.deck);
    }

    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!("deck listener unsubscribed for '{}'", self.deck);
        }
    }

    /// Tears down the old subscription and remounts for `deck`.
    pub fn set_deck(
        &mut self,
        deck: impl Into<String>,
        window: Option<&MessageWindow>,
    ) {
        let deck = deck.into();
        if deck == self.deck {
            return;
        }

        self.unmount();
        self.deck = deck;
        self.mount(window);
    }
}

impl Drop for DeckListener {
    fn drop(&mut self) {
        self.unmount();
    }
}
