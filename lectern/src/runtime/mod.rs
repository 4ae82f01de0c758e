pub mod app;
pub mod events;
pub mod presenter;
pub mod presenter_bridge;
pub mod settings;
pub mod storage;

/// True when the presenter window binary is compiled in.
pub const PRESENTER_WINDOW_ENABLED: bool = cfg!(feature = "presenter_window");
