use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use log::trace;
use serde_json::Value;

/// What a message listener receives; `data` is the posted value.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEvent {
    pub data: Value,
}

type MessageHandler = Rc<RefCell<dyn FnMut(&MessageEvent)>>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    handlers: Vec<(u64, MessageHandler)>,
    queue: VecDeque<MessageEvent>,
}

/// Message target of a window. Posting queues; `pump` delivers.
#[derive(Clone, Default)]
pub struct MessageWindow {
    inner: Rc<RefCell<Listeners>>,
}

/// Removes its listener when dropped or explicitly unsubscribed.
#[must_use = "dropping the subscription removes the listener"]
pub struct Subscription {
    id: u64,
    window: Weak<RefCell<Listeners>>,
}

impl MessageWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message_listener<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&MessageEvent) + 'static,
    {
        let mut listeners = self.inner.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.handlers.push((id, Rc::new(RefCell::new(handler))));

        Subscription {
            id,
            window: Rc::downgrade(&self.inner),
        }
    }

    pub fn post_message(&self, data: Value) {
        self.inner
            .borrow_mut()
            .queue
            .push_back(MessageEvent { data });
    }

    /// Delivers queued messages to the current listeners, in order.
    /// Returns the number of messages delivered.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;

        loop {
            let next = self.inner.borrow_mut().queue.pop_front();
            let Some(event) = next else {
                break;
            };

            let handlers: Vec<MessageHandler> = self
                .inner
                .borrow()
                .handlers
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect();

            trace!("delivering message to {} listener(s)", handlers.len());

            for handler in &handlers {
                (&mut *handler.borrow_mut())(&event);
            }

            delivered += 1;
        }

        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(window) = self.window.upgrade() {
            window
                .borrow_mut()
                .handlers
                .retain(|(id, _)| *id != self.id);
        }
    }
}
