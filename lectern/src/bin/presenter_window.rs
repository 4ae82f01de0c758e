use std::cell::RefCell;
use std::error::Error;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use ipc_channel::ipc::{self, IpcSender, TryRecvError};
use lectern::address::SlideAddress;
use lectern::controller::{SlideController, bind_slide_keys};
use lectern::deck::SlideCollection;
use lectern::framework::logging::init_logger;
use lectern::keys::{KeyBindings, KeyHandle, KeyPress};
use lectern::listener::DeckListener;
use lectern::navigation::{Navigator, Router};
use lectern::peer::PresentationContext;
use lectern::runtime::app::window_title;
use lectern::runtime::presenter::{self, IpcPeerWindow, PresenterEvent};
use lectern::sync::parse_message;
use lectern::window::MessageWindow;
use serde::Deserialize;
use tao::dpi::LogicalSize;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop};
use tao::window::{Window, WindowBuilder};
use wry::{WebView, WebViewBuilder};

const OPEN_DEVTOOLS: bool = false;
const POLL_INTERVAL: Duration = Duration::from_millis(30);

const DEFAULT_WIDTH: i32 = 960;
const DEFAULT_HEIGHT: i32 = 540;

// Forwards page key presses to the host, mirroring the main window bindings.
const KEY_BRIDGE_SCRIPT: &str = r#"
window.addEventListener('keydown', (event) => {
  if (event.repeat) return;
  window.ipc.postMessage(JSON.stringify({ key: event.key }));
});
"#;

#[derive(Deserialize)]
struct KeyMessage {
    key: String,
}

/// Slide state, created once the main process sends `Init`.
struct Presenter {
    base_url: String,
    slides: Rc<RefCell<SlideCollection>>,
    router: Rc<RefCell<Router>>,
    message_window: MessageWindow,
    listener: DeckListener,
    key_press: KeyPress,
    _key_handles: Vec<KeyHandle>,
    shown: Option<String>,
}

impl Presenter {
    fn new(
        init: PresenterInit,
        to_parent: presenter::Sender,
    ) -> Result<Self, String> {
        let slides = Rc::new(RefCell::new(SlideCollection::load(
            Path::new(&init.manifest),
        )?));
        let router = Router::shared(
            SlideAddress::new(init.deck.as_str(), init.slide).to_path(),
        );

        // The main window is this window's peer.
        let context = Rc::new(RefCell::new(PresentationContext::with_peer(
            Rc::new(IpcPeerWindow::new(to_parent)),
        )));

        let key_press = KeyPress::new();
        let controller =
            Rc::new(SlideController::new(slides.clone(), router.clone()));
        let key_handles = bind_slide_keys(
            &key_press,
            &init.bindings,
            controller,
            context,
        );

        let message_window = MessageWindow::new();
        let mut listener = DeckListener::new(init.deck, router.clone());
        listener.mount(Some(&message_window));

        Ok(Self {
            base_url: init.presenter_url,
            slides,
            router,
            message_window,
            listener,
            key_press,
            _key_handles: key_handles,
            shown: None,
        })
    }

    fn deliver(&mut self, message: &str) {
        match parse_message(message) {
            Ok(data) => {
                self.message_window.post_message(data);
                self.message_window.pump();
            }
            Err(err) => log::warn!("{}", err),
        }
    }

    fn on_key(&self, key: &str) {
        self.key_press.dispatch(key);
    }

    // Loads the current slide if the router moved since the last call.
    fn refresh(&mut self, window: &Window, web_view: &WebView) {
        let (path, address) = {
            let router = self.router.borrow();
            (router.current().to_string(), router.current_address())
        };

        if self.shown.as_deref() == Some(path.as_str()) {
            return;
        }

        if let Some(address) = address {
            if address.deck != self.listener.deck() {
                self.listener
                    .set_deck(address.deck.clone(), Some(&self.message_window));
            }

            window.set_title(&format!(
                "Presenter: {}",
                window_title(&self.slides.borrow(), &address)
            ));
        }

        let url = presenter::presenter_url(&self.base_url, &path);
        log::debug!("presenter loading {}", url);
        if let Err(err) = web_view.load_url(&url) {
            log::error!("failed to load {}: {:?}", url, err);
        }

        self.shown = Some(path);
    }
}

struct PresenterInit {
    deck: String,
    slide: u32,
    manifest: String,
    presenter_url: String,
    bindings: KeyBindings,
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logger();
    log::info!("Starting lectern presenter_window");

    let server_name = std::env::args()
        .nth(1)
        .ok_or("missing IPC bootstrap server name argument")?;

    let (to_parent, receiver) = setup_ipc_connection(server_name)?;
    let event_loop = EventLoop::new();

    let window = WindowBuilder::new()
        .with_title("Presenter")
        .with_inner_size(LogicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT))
        .build(&event_loop)?;

    let (keys_tx, keys_rx) = mpsc::channel::<String>();
    let web_view = WebViewBuilder::new()
        .with_initialization_script(KEY_BRIDGE_SCRIPT)
        .with_ipc_handler(move |message| {
            let body = message.body();
            match serde_json::from_str::<KeyMessage>(body) {
                Ok(KeyMessage { key }) => {
                    let _ = keys_tx.send(key);
                }
                Err(err) => {
                    log::error!(
                        "JSON parse error: {:?}; Problematic JSON: {}",
                        err,
                        body
                    );
                }
            }
        })
        .with_url("about:blank")
        .build(&window)?;

    if OPEN_DEVTOOLS {
        web_view.open_devtools();
    }

    to_parent.send(PresenterEvent::Ready)?;

    let mut state: Option<Presenter> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow =
            ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL);

        loop {
            match receiver.try_recv() {
                Ok(PresenterEvent::Init {
                    deck,
                    slide,
                    manifest,
                    presenter_url,
                    advance_keys,
                    retreat_keys,
                }) => {
                    let init = PresenterInit {
                        deck,
                        slide,
                        manifest,
                        presenter_url,
                        bindings: KeyBindings {
                            advance: advance_keys,
                            retreat: retreat_keys,
                        },
                    };

                    match Presenter::new(init, to_parent.clone()) {
                        Ok(presenter) => state = Some(presenter),
                        Err(err) => {
                            log::error!("presenter init failed: {}", err);
                        }
                    }
                }
                Ok(PresenterEvent::Message(message)) => {
                    if let Some(presenter) = state.as_mut() {
                        presenter.deliver(&message);
                    }
                }
                Ok(PresenterEvent::Quit) => {
                    log::info!(
                        "received quit from parent; shutting down presenter"
                    );
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                Ok(PresenterEvent::Ready) => {}
                Err(TryRecvError::Empty) => break,
                Err(err) => {
                    log::error!("Error receiving message: {:?}", err);
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }
        }

        if let Some(presenter) = state.as_mut() {
            while let Ok(key) = keys_rx.try_recv() {
                presenter.on_key(&key);
            }

            presenter.refresh(&window, &web_view);
        }

        if let Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } = event
        {
            let _ = to_parent.send(PresenterEvent::Quit);
            *control_flow = ControlFlow::Exit;
        }
    });
}

fn setup_ipc_connection(
    server_name: String,
) -> Result<(presenter::Sender, presenter::Receiver), ipc_channel::Error> {
    let (to_child, from_parent): (presenter::Sender, presenter::Receiver) =
        ipc::channel()?;
    let (to_parent, from_child): (presenter::Sender, presenter::Receiver) =
        ipc::channel()?;
    let bootstrap = IpcSender::connect(server_name)?;
    bootstrap.send((to_child, from_child))?;
    Ok((to_parent, from_parent))
}
