use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use super::events::{
    RuntimeCommand, RuntimeCommandReceiver, RuntimeCommandSender,
    command_channel,
};
use super::presenter::PresenterEvent;
use super::presenter_bridge::PresenterBridge;
use super::settings::Settings;
use super::PRESENTER_WINDOW_ENABLED;
use crate::address::SlideAddress;
use crate::controller::{SlideController, bind_slide_keys};
use crate::deck::{DeckWatch, SlideCollection};
use crate::framework::logging;
use crate::keys::{KeyHandle, KeyPress, key_name};
use crate::listener::DeckListener;
use crate::navigation::{Navigator, Router};
use crate::peer::PresentationContext;
use crate::sync::parse_message;
use crate::window::MessageWindow;

const POLL_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub deck: Option<String>,
    pub slide: Option<u32>,
    pub settings: Settings,
}

struct LecternRuntime {
    settings: Settings,
    slides: Rc<RefCell<SlideCollection>>,
    router: Rc<RefCell<Router>>,
    message_window: MessageWindow,
    context: Rc<RefCell<PresentationContext>>,
    listener: DeckListener,
    key_press: KeyPress,
    // Dropping these unbinds the slide keys.
    _key_handles: Vec<KeyHandle>,
    command_tx: RuntimeCommandSender,
    command_rx: RuntimeCommandReceiver,
    bridge: Option<PresenterBridge>,
    deck_watch: Option<DeckWatch>,
    window: Option<Arc<Window>>,
    window_id: Option<WindowId>,
    shown: Option<SlideAddress>,
}

impl LecternRuntime {
    fn new(
        slides: SlideCollection,
        initial: SlideAddress,
        settings: Settings,
    ) -> Self {
        let slides = Rc::new(RefCell::new(slides));
        let router = Router::shared(initial.to_path());
        let context = Rc::new(RefCell::new(PresentationContext::new()));
        let key_press = KeyPress::new();

        let controller =
            Rc::new(SlideController::new(slides.clone(), router.clone()));
        let key_handles = bind_slide_keys(
            &key_press,
            &settings.key_bindings(),
            controller,
            context.clone(),
        );

        let listener = DeckListener::new(initial.deck.clone(), router.clone());
        let (command_tx, command_rx) = command_channel();

        Self {
            settings,
            slides,
            router,
            message_window: MessageWindow::new(),
            context,
            listener,
            key_press,
            _key_handles: key_handles,
            command_tx,
            command_rx,
            bridge: None,
            deck_watch: None,
            window: None,
            window_id: None,
            shown: None,
        }
    }

    fn init_window(
        &mut self,
        event_loop: &ActiveEventLoop,
    ) -> Result<(), String> {
        let attrs = WindowAttributes::default()
            .with_title("Lectern")
            .with_inner_size(LogicalSize::new(960.0, 540.0));

        let window = event_loop
            .create_window(attrs)
            .map_err(|err| format!("failed to create window: {}", err))?;

        self.window_id = Some(window.id());
        self.window = Some(Arc::new(window));

        // A window now exists, so the listener may subscribe.
        self.listener.mount(Some(&self.message_window));

        if self.settings.watch_manifest {
            match DeckWatch::start(self.settings.manifest.clone()) {
                Ok(watch) => self.deck_watch = Some(watch),
                Err(err) => warn!("not watching deck manifest: {}", err),
            }
        }

        if self.settings.presenter {
            if PRESENTER_WINDOW_ENABLED {
                self.launch_presenter();
            } else {
                warn!(
                    "built without the presenter_window feature; \
                     not opening the presenter window"
                );
            }
        }

        Ok(())
    }

    fn launch_presenter(&mut self) {
        let Some(address) = self.router.borrow().current_address() else {
            return;
        };

        let init = PresenterEvent::Init {
            deck: address.deck,
            slide: address.slide,
            manifest: absolute(&self.settings.manifest)
                .to_string_lossy()
                .into_owned(),
            presenter_url: self.settings.presenter_url.clone(),
            advance_keys: self.settings.advance_keys.clone(),
            retreat_keys: self.settings.retreat_keys.clone(),
        };

        match PresenterBridge::launch(self.command_tx.clone(), init) {
            Ok(bridge) => {
                self.context.borrow_mut().attach(Rc::new(bridge.peer()));
                self.bridge = Some(bridge);
            }
            Err(err) => error!("presenter window unavailable: {}", err),
        }
    }

    fn on_key(&mut self, key_event: &KeyEvent) {
        if key_event.state != ElementState::Pressed || key_event.repeat {
            return;
        }

        let Some(name) = key_name(&key_event.logical_key) else {
            return;
        };

        if self.key_press.dispatch(&name) > 0 {
            self.sync_view();
        }
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            trace!("runtime command: {:?}", command);

            match command {
                RuntimeCommand::Deliver(message) => {
                    match parse_message(&message) {
                        Ok(data) => self.message_window.post_message(data),
                        Err(err) => warn!("{}", err),
                    }
                }
                RuntimeCommand::PresenterReady => {
                    info!("presenter window ready");
                }
                RuntimeCommand::PresenterClosed => {
                    info!("presenter window closed");
                    self.context.borrow_mut().detach();
                    self.bridge = None;
                }
            }
        }

        if self.message_window.pump() > 0 {
            self.sync_view();
        }
    }

    fn reload_slides_if_changed(&mut self) {
        let changed = self
            .deck_watch
            .as_ref()
            .is_some_and(|watch| watch.take_changed());

        if !changed {
            return;
        }

        match SlideCollection::load(&self.settings.manifest) {
            Ok(slides) => {
                info!("reloaded deck manifest");
                *self.slides.borrow_mut() = slides;
                self.keep_position_in_deck();
                self.shown = None;
                self.sync_view();
            }
            Err(err) => error!("{}", err),
        }
    }

    /// After a reload the current deck may have shrunk or vanished; moves the
    /// router back onto an existing slide.
    fn keep_position_in_deck(&mut self) {
        let Some(address) = self.router.borrow().current_address() else {
            return;
        };

        let resolved = select_initial_address(
            &self.slides.borrow(),
            Some(&address.deck),
            Some(address.slide),
        );

        match resolved {
            Ok(resolved) if resolved != address => {
                info!(
                    "{} is gone after reload; moving to {}",
                    address, resolved
                );
                self.router.borrow_mut().push(&resolved.to_path());
            }
            Ok(_) => {}
            Err(err) => warn!("staying on {}: {}", address, err),
        }
    }

    // Re-keys the listener on deck change and refreshes the title.
    fn sync_view(&mut self) {
        let Some(address) = self.router.borrow().current_address() else {
            return;
        };

        if self.shown.as_ref() == Some(&address) {
            return;
        }

        if address.deck != self.listener.deck() {
            let window = self.window.is_some().then_some(&self.message_window);
            self.listener.set_deck(address.deck.clone(), window);
        }

        let title = window_title(&self.slides.borrow(), &address);
        debug!("showing {}", address);

        if let Some(window) = self.window.as_ref() {
            window.set_title(&title);
        }

        self.shown = Some(address);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.listener.unmount();
        self.context.borrow_mut().detach();
        self.bridge = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for LecternRuntime {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.init_window(event_loop) {
            error!("failed to initialize lectern runtime: {}", err);
            event_loop.exit();
            return;
        }

        self.sync_view();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window_id != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.shutdown(event_loop);
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(&event),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.process_commands();
        self.reload_slides_if_changed();

        event_loop.set_control_flow(ControlFlow::WaitUntil(
            Instant::now() + POLL_INTERVAL,
        ));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.bridge = None;
    }
}

pub fn run(options: RunOptions) -> Result<(), String> {
    logging::init_logger();

    let slides = SlideCollection::load(&options.settings.manifest)?;
    let initial = select_initial_address(
        &slides,
        options.deck.as_deref(),
        options.slide,
    )?;

    info!("opening {}", initial);

    let event_loop = EventLoop::new().map_err(|err| err.to_string())?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runtime = LecternRuntime::new(slides, initial, options.settings);

    event_loop
        .run_app(&mut runtime)
        .map_err(|err| err.to_string())
}

/// Resolves the starting slide; unknown decks fall back to the first deck
/// and the slide number is clamped into the deck.
pub fn select_initial_address(
    slides: &SlideCollection,
    deck: Option<&str>,
    slide: Option<u32>,
) -> Result<SlideAddress, String> {
    let deck = match deck {
        Some(deck) if slides.contains_deck(deck) => deck.to_string(),
        Some(deck) => {
            warn!("requested deck '{}' does not exist; falling back", deck);
            first_deck(slides)?
        }
        None => first_deck(slides)?,
    };

    let count = slides.slide_count(&deck);
    if count == 0 {
        return Err(format!("deck '{}' has no slides", deck));
    }

    let slide = slide.unwrap_or(1).clamp(1, count);
    Ok(SlideAddress::new(deck, slide))
}

fn first_deck(slides: &SlideCollection) -> Result<String, String> {
    slides
        .first_deck_name()
        .map(ToOwned::to_owned)
        .ok_or_else(|| "deck manifest is empty".to_string())
}

pub fn window_title(slides: &SlideCollection, address: &SlideAddress) -> String {
    let count = slides.slide_count(&address.deck);
    match slides.slide(&address.deck, address.slide) {
        Some(slide) if !slide.title.is_empty() => format!(
            "{} {}/{} - {}",
            address.deck, address.slide, count, slide.title
        ),
        _ => format!("{} {}/{}", address.deck, address.slide, count),
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slides() -> SlideCollection {
        SlideCollection::from_yaml(
            r#"
decks:
  intro:
    slides:
      - title: Welcome
      - title: ""
      - title: End
  empty:
    slides: []
"#,
        )
        .unwrap()
    }

    #[test]
    fn initial_address_defaults_to_first_slide_of_first_deck() {
        let address = select_initial_address(&slides(), None, None).unwrap();
        assert_eq!(address, SlideAddress::new("intro", 1));
    }

    #[test]
    fn initial_slide_is_clamped_into_deck() {
        let address =
            select_initial_address(&slides(), Some("intro"), Some(9)).unwrap();
        assert_eq!(address.slide, 3);

        let address =
            select_initial_address(&slides(), Some("intro"), Some(0)).unwrap();
        assert_eq!(address.slide, 1);
    }

    #[test]
    fn unknown_deck_falls_back_and_empty_deck_errors() {
        let address =
            select_initial_address(&slides(), Some("nope"), None).unwrap();
        assert_eq!(address.deck, "intro");

        let err =
            select_initial_address(&slides(), Some("empty"), None).unwrap_err();
        assert!(err.contains("no slides"));

        let err = select_initial_address(&SlideCollection::new(), None, None)
            .unwrap_err();
        assert!(err.contains("empty"));
    }

    fn runtime_at(slide: u32) -> LecternRuntime {
        LecternRuntime::new(
            slides(),
            SlideAddress::new("intro", slide),
            Settings::default(),
        )
    }

    #[test]
    fn view_follows_the_router_position() {
        let mut runtime = runtime_at(2);

        runtime.sync_view();
        assert_eq!(runtime.shown, Some(SlideAddress::new("intro", 2)));

        runtime.key_press.dispatch("ArrowRight");
        runtime.sync_view();
        assert_eq!(runtime.shown, Some(SlideAddress::new("intro", 3)));
    }

    #[test]
    fn reload_that_shrinks_the_deck_pulls_position_back() {
        let mut runtime = runtime_at(3);
        *runtime.slides.borrow_mut() = SlideCollection::from_yaml(
            "decks:\n  intro:\n    slides:\n      - title: Only\n",
        )
        .unwrap();

        runtime.keep_position_in_deck();

        assert_eq!(runtime.router.borrow().current(), "/talks/intro/1");
    }

    #[test]
    fn reload_that_drops_the_deck_moves_to_first_deck() {
        let mut runtime = runtime_at(2);
        *runtime.slides.borrow_mut() = SlideCollection::from_yaml(
            "decks:\n  outro:\n    slides:\n      - title: Bye\n",
        )
        .unwrap();

        runtime.keep_position_in_deck();
        runtime.sync_view();

        assert_eq!(runtime.router.borrow().current(), "/talks/outro/1");
        assert_eq!(runtime.listener.deck(), "outro");
    }

    #[test]
    fn reload_keeps_a_position_that_still_exists() {
        let mut runtime = runtime_at(2);

        runtime.keep_position_in_deck();

        assert_eq!(runtime.router.borrow().push_count(), 0);
    }

    #[test]
    fn title_shows_position_and_slide_title() {
        let slides = slides();
        assert_eq!(
            window_title(&slides, &SlideAddress::new("intro", 1)),
            "intro 1/3 - Welcome"
        );
        assert_eq!(
            window_title(&slides, &SlideAddress::new("intro", 2)),
            "intro 2/3"
        );
    }
}
