pub mod address;
pub mod controller;
pub mod deck;
pub mod framework;
pub mod keys;
pub mod listener;
pub mod navigation;
pub mod peer;
pub mod prelude;
pub mod runtime;
pub mod sync;
pub mod window;

pub use runtime::app::{RunOptions, run};
