pub use crate::address::SlideAddress;
pub use crate::controller::{
    SlideController, SlideParams, Transition, bind_slide_keys, next_slide,
    prev_slide,
};
pub use crate::deck::{DeckWatch, Slide, SlideCollection};
pub use crate::framework::logging::init_logger;
pub use crate::framework::logging::{debug, error, info, trace, warn};
pub use crate::keys::{KeyBindings, KeyHandle, KeyIntent, KeyPress};
pub use crate::listener::{DeckListener, ListenerState};
pub use crate::navigation::{Navigator, Router, SharedNavigator};
pub use crate::peer::{ChannelPeerWindow, PeerWindow, PresentationContext};
pub use crate::run;
pub use crate::runtime::app::RunOptions;
pub use crate::runtime::settings::Settings;
pub use crate::runtime::storage;
pub use crate::sync::{SLIDE_CONTROLLER_SOURCE, SyncMessage};
pub use crate::window::{MessageEvent, MessageWindow, Subscription};
