mod collection;
mod watch;

pub use collection::{DeckSummary, Slide, SlideCollection};
pub use watch::DeckWatch;
