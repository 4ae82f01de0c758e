use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::address::SlideAddress;

/// Router facility: push an address and read the current one back.
pub trait Navigator {
    fn push(&mut self, href: &str);

    fn segments(&self) -> Vec<String>;

    fn current_address(&self) -> Option<SlideAddress> {
        SlideAddress::from_segments(&self.segments()).ok()
    }
}

pub type SharedNavigator = Rc<RefCell<dyn Navigator>>;

/// In-memory history router.
#[derive(Debug, Default)]
pub struct Router {
    history: Vec<String>,
}

impl Router {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: vec![initial.into()],
        }
    }

    pub fn shared(initial: impl Into<String>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(initial)))
    }

    pub fn current(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or("/")
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Number of `push` calls since construction.
    pub fn push_count(&self) -> usize {
        self.history.len().saturating_sub(1)
    }
}

impl Navigator for Router {
    fn push(&mut self, href: &str) {
        trace!("router push {}", href);
        self.history.push(href.to_string());
    }

    fn segments(&self) -> Vec<String> {
        let path = self.current().split(['?', '#']).next().unwrap_or_default();
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_moves_current_address() {
        let mut router = Router::new("/talks/intro/1");
        router.push("/talks/intro/2");

        assert_eq!(router.current(), "/talks/intro/2");
        assert_eq!(router.push_count(), 1);
        assert_eq!(
            router.current_address(),
            Some(SlideAddress::new("intro", 2))
        );
    }

    #[test]
    fn segments_skip_empty_parts() {
        let router = Router::new("/talks//intro/3/");
        assert_eq!(router.segments(), vec!["talks", "intro", "3"]);
    }

    #[test]
    fn non_slide_routes_have_no_address() {
        let router = Router::new("/");
        assert_eq!(router.current_address(), None);
    }
}
