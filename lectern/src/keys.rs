use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::trace;
use serde::{Deserialize, Serialize};
use winit::keyboard::{Key, NamedKey};

pub const ARROW_RIGHT: &str = "ArrowRight";
pub const ARROW_LEFT: &str = "ArrowLeft";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub enum KeyIntent {
    Advance,
    Retreat,
}

/// Key names (DOM `KeyboardEvent.key` spelling) bound to each intent.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct KeyBindings {
    pub advance: Vec<String>,
    pub retreat: Vec<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            advance: vec![ARROW_RIGHT.to_string()],
            retreat: vec![ARROW_LEFT.to_string()],
        }
    }
}

impl KeyBindings {
    pub fn keys_for(&self, intent: KeyIntent) -> &[String] {
        match intent {
            KeyIntent::Advance => &self.advance,
            KeyIntent::Retreat => &self.retreat,
        }
    }

    pub fn intent_for(&self, key: &str) -> Option<KeyIntent> {
        if self.advance.iter().any(|k| k == key) {
            Some(KeyIntent::Advance)
        } else if self.retreat.iter().any(|k| k == key) {
            Some(KeyIntent::Retreat)
        } else {
            None
        }
    }
}

type KeyCallback = Rc<RefCell<dyn FnMut(&str)>>;

struct Registration {
    id: u64,
    keys: Vec<String>,
    callback: KeyCallback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    registrations: Vec<Registration>,
}

/// Key-press facility: callbacks registered for named keys.
#[derive(Clone, Default)]
pub struct KeyPress {
    inner: Rc<RefCell<Registry>>,
}

/// Deregisters its callback when dropped.
#[must_use = "dropping the handle unregisters the callback"]
pub struct KeyHandle {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl KeyPress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<K, F>(&self, keys: &[K], callback: F) -> KeyHandle
    where
        K: AsRef<str>,
        F: FnMut(&str) + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;

        registry.registrations.push(Registration {
            id,
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            callback: Rc::new(RefCell::new(callback)),
        });

        KeyHandle {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Runs every callback bound to `key`; returns how many ran.
    pub fn dispatch(&self, key: &str) -> usize {
        // Snapshot so callbacks may register or drop handles.
        let callbacks: Vec<KeyCallback> = self
            .inner
            .borrow()
            .registrations
            .iter()
            .filter(|r| r.keys.iter().any(|k| k == key))
            .map(|r| r.callback.clone())
            .collect();

        trace!("key {} -> {} callback(s)", key, callbacks.len());

        for callback in &callbacks {
            (&mut *callback.borrow_mut())(key);
        }

        callbacks.len()
    }

    pub fn registration_count(&self) -> usize {
        self.inner.borrow().registrations.len()
    }
}

impl Drop for KeyHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .registrations
                .retain(|r| r.id != self.id);
        }
    }
}

/// DOM-style name of a logical key, if it is one we can bind.
pub fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Named(named) => named_key_name(*named).map(ToOwned::to_owned),
        Key::Character(text) => Some(text.to_string()),
        _ => None,
    }
}

fn named_key_name(key: NamedKey) -> Option<&'static str> {
    match key {
        NamedKey::ArrowRight => Some(ARROW_RIGHT),
        NamedKey::ArrowLeft => Some(ARROW_LEFT),
        NamedKey::ArrowUp => Some("ArrowUp"),
        NamedKey::ArrowDown => Some("ArrowDown"),
        NamedKey::PageDown => Some("PageDown"),
        NamedKey::PageUp => Some("PageUp"),
        NamedKey::Home => Some("Home"),
        NamedKey::End => Some("End"),
        NamedKey::Enter => Some("Enter"),
        NamedKey::Escape => Some("Escape"),
        NamedKey::Space => Some(" "),
        NamedKey::Backspace => Some("Backspace"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn dispatch_runs_only_matching_callbacks() {
        let key_press = KeyPress::new();
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        let _handle = key_press.register(&[ARROW_RIGHT], move |_| {
            counter.set(counter.get() + 1);
        });

        assert_eq!(key_press.dispatch(ARROW_RIGHT), 1);
        assert_eq!(key_press.dispatch(ARROW_LEFT), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn dropping_handle_unregisters() {
        let key_press = KeyPress::new();
        let handle = key_press.register(&[ARROW_LEFT], |_| {});
        assert_eq!(key_press.registration_count(), 1);

        drop(handle);
        assert_eq!(key_press.registration_count(), 0);
        assert_eq!(key_press.dispatch(ARROW_LEFT), 0);
    }

    #[test]
    fn handle_outliving_facility_is_harmless() {
        let key_press = KeyPress::new();
        let handle = key_press.register(&["x"], |_| {});
        drop(key_press);
        drop(handle);
    }

    #[test]
    fn bindings_resolve_intents() {
        let mut bindings = KeyBindings::default();
        bindings.advance.push("PageDown".into());

        assert_eq!(bindings.intent_for("ArrowRight"), Some(KeyIntent::Advance));
        assert_eq!(bindings.intent_for("PageDown"), Some(KeyIntent::Advance));
        assert_eq!(bindings.intent_for("ArrowLeft"), Some(KeyIntent::Retreat));
        assert_eq!(bindings.intent_for("q"), None);
    }

    #[test]
    fn names_winit_keys_like_the_dom() {
        assert_eq!(
            key_name(&Key::Named(NamedKey::ArrowRight)).as_deref(),
            Some("ArrowRight")
        );
        assert_eq!(
            key_name(&Key::Character("n".into())).as_deref(),
            Some("n")
        );
        assert_eq!(key_name(&Key::Named(NamedKey::F1)), None);
    }
}
