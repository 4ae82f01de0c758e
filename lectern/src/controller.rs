use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::address::SlideAddress;
use crate::deck::SlideCollection;
use crate::keys::{KeyBindings, KeyHandle, KeyIntent, KeyPress};
use crate::navigation::SharedNavigator;
use crate::peer::{PeerWindow, PresentationContext};
use crate::sync::SyncMessage;

/// Current position the controller acts on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlideParams {
    pub current_slide: u32,
    pub deck: String,
}

impl From<SlideAddress> for SlideParams {
    fn from(address: SlideAddress) -> Self {
        Self {
            current_slide: address.slide,
            deck: address.deck,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Already at the boundary; nothing was sent or pushed.
    Unchanged,
    Moved { to: SlideAddress, notified: bool },
}

pub fn next_slide(current: u32, slide_count: u32) -> u32 {
    current.saturating_add(1).min(slide_count)
}

pub fn prev_slide(current: u32) -> u32 {
    current.saturating_sub(1).max(1)
}

/// Turns key intents into peer notifications and navigation requests.
pub struct SlideController {
    slides: Rc<RefCell<SlideCollection>>,
    navigator: SharedNavigator,
}

impl SlideController {
    pub fn new(
        slides: Rc<RefCell<SlideCollection>>,
        navigator: SharedNavigator,
    ) -> Self {
        Self { slides, navigator }
    }

    pub fn advance(
        &self,
        params: &SlideParams,
        peer: Option<&dyn PeerWindow>,
    ) -> Transition {
        let count = self.slides.borrow().slide_count(&params.deck);
        let target = next_slide(params.current_slide, count);
        self.move_to(params, target, count, peer)
    }

    pub fn retreat(
        &self,
        params: &SlideParams,
        peer: Option<&dyn PeerWindow>,
    ) -> Transition {
        let count = self.slides.borrow().slide_count(&params.deck);
        let target = prev_slide(params.current_slide);
        self.move_to(params, target, count, peer)
    }

    pub fn apply(
        &self,
        intent: KeyIntent,
        params: &SlideParams,
        peer: Option<&dyn PeerWindow>,
    ) -> Transition {
        match intent {
            KeyIntent::Advance => self.advance(params, peer),
            KeyIntent::Retreat => self.retreat(params, peer),
        }
    }

    /// Position read back from the navigator's current address.
    pub fn current_params(&self) -> Option<SlideParams> {
        self.navigator
            .borrow()
            .current_address()
            .map(SlideParams::from)
    }

    fn move_to(
        &self,
        params: &SlideParams,
        target: u32,
        count: u32,
        peer: Option<&dyn PeerWindow>,
    ) -> Transition {
        if count == 0 {
            trace!("deck '{}' has no slides; ignoring", params.deck);
            return Transition::Unchanged;
        }

        // The router may sit past the end after a reload or an inbound sync.
        let target = target.min(count);
        if target == params.current_slide {
            trace!(
                "slide {} is a boundary of '{}'; ignoring",
                target, params.deck
            );
            return Transition::Unchanged;
        }

        let mut notified = false;
        if let Some(peer) = peer {
            match peer.post_message(&SyncMessage::new_slide(target)) {
                Ok(()) => notified = true,
                Err(err) => warn!("failed to notify peer window: {}", err),
            }
        }

        let to = SlideAddress::new(params.deck.clone(), target);
        debug!("{} -> {}", params.current_slide, to);
        self.navigator.borrow_mut().push(&to.to_path());

        Transition::Moved { to, notified }
    }
}

/// Binds advance/retreat keys to `controller` for as long as the returned
/// handles live. Each press reads the position from the navigator and the
/// peer from `context` at that moment.
pub fn bind_slide_keys(
    key_press: &KeyPress,
    bindings: &KeyBindings,
    controller: Rc<SlideController>,
    context: Rc<RefCell<PresentationContext>>,
) -> Vec<KeyHandle> {
    [KeyIntent::Advance, KeyIntent::Retreat]
        .into_iter()
        .map(|intent| {
            let controller = controller.clone();
            let context = context.clone();

            key_press.register(bindings.keys_for(intent), move |_key| {
                let Some(params) = controller.current_params() else {
                    trace!("not on a slide route; ignoring {:?}", intent);
                    return;
                };

                let context = context.borrow();
                controller.apply(intent, &params, context.peer());
            })
        })
        .collect()
}
