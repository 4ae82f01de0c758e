use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ipc_channel::ipc::{IpcOneShotServer, IpcReceiver, IpcSender};
use log::{debug, error, info, trace, warn};

use super::events::{RuntimeCommand, RuntimeCommandSender};
use super::presenter::PresenterEvent;
use crate::peer::PeerWindow;
use crate::sync::{SyncMessage, to_message};

type Bootstrap = (IpcSender<PresenterEvent>, IpcReceiver<PresenterEvent>);

// The first launch may compile the presenter binary.
const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(300);
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct OutboxState {
    ready: bool,
    queue: VecDeque<PresenterEvent>,
}

/// Sends to the presenter, holding events back until it reports ready.
#[derive(Clone)]
struct Outbox {
    to_child: IpcSender<PresenterEvent>,
    state: Arc<Mutex<OutboxState>>,
}

impl Outbox {
    fn new(to_child: IpcSender<PresenterEvent>) -> Self {
        Self {
            to_child,
            state: Arc::new(Mutex::new(OutboxState::default())),
        }
    }

    fn send(&self, event: PresenterEvent) -> Result<(), String> {
        let mut state = self
            .state
            .lock()
            .map_err(|err| format!("presenter outbox lock poisoned: {}", err))?;

        if state.ready {
            self.to_child
                .send(event)
                .map_err(|err| format!("failed to send to presenter: {}", err))
        } else {
            state.queue.push_back(event);
            Ok(())
        }
    }

    fn mark_ready(&self) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(err) => {
                error!("presenter outbox lock poisoned: {}", err);
                return;
            }
        };

        while let Some(event) = state.queue.pop_front() {
            if let Err(err) = self.to_child.send(event) {
                warn!(
                    "failed to flush queued presenter event: {}; \
                     dropping {} more",
                    err,
                    state.queue.len()
                );
                state.queue.clear();
                break;
            }
        }

        state.ready = true;
    }
}

/// Peer handle for the presenter window owned by a `PresenterBridge`.
pub struct PresenterPeer {
    outbox: Outbox,
}

impl PeerWindow for PresenterPeer {
    fn post_message(&self, message: &SyncMessage) -> Result<(), String> {
        self.outbox.send(PresenterEvent::Message(to_message(message)?))
    }
}

/// Runs the presenter window as a child process connected over IPC.
pub struct PresenterBridge {
    child: Child,
    outbox: Outbox,
    inbound_handle: Option<JoinHandle<()>>,
}

impl PresenterBridge {
    /// `init` is delivered first, as soon as the presenter is ready.
    pub fn launch(
        command_tx: RuntimeCommandSender,
        init: PresenterEvent,
    ) -> Result<Self, String> {
        let (server, server_name) = IpcOneShotServer::<Bootstrap>::new()
            .map_err(|err| {
                format!("failed to create IPC bootstrap: {}", err)
            })?;

        let mut child = spawn_presenter_process(&server_name)?;

        pipe_child_logs(&mut child);

        let (accepted_tx, accepted_rx) = mpsc::channel();
        thread::spawn(move || {
            let accepted = server
                .accept()
                .map(|(_bootstrap_rx, bootstrap)| bootstrap)
                .map_err(|err| err.to_string());
            let _ = accepted_tx.send(accepted);
        });

        let bootstrap =
            wait_for_bootstrap(&accepted_rx, &mut child, BOOTSTRAP_TIMEOUT);
        let (to_child, from_child) = match bootstrap {
            Ok(bootstrap) => bootstrap,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };

        info!("presenter process connected");

        let outbox = Outbox::new(to_child);
        outbox.send(init)?;

        let inbound_handle = {
            let outbox = outbox.clone();

            thread::spawn(move || {
                forward_inbound(from_child, outbox, command_tx);
            })
        };

        Ok(Self {
            child,
            outbox,
            inbound_handle: Some(inbound_handle),
        })
    }

    pub fn peer(&self) -> PresenterPeer {
        PresenterPeer {
            outbox: self.outbox.clone(),
        }
    }
}

impl Drop for PresenterBridge {
    fn drop(&mut self) {
        debug!("shutting down presenter bridge");

        let _ = self.outbox.to_child.send(PresenterEvent::Quit);
        let _ = self.child.kill();
        let _ = self.child.wait();

        if let Some(handle) = self.inbound_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Waits for the presenter to connect, giving up early if the process exits
/// (a failed build, for instance) or `timeout` passes.
fn wait_for_bootstrap<T>(
    accepted: &mpsc::Receiver<Result<T, String>>,
    child: &mut Child,
    timeout: Duration,
) -> Result<T, String> {
    let started = Instant::now();

    loop {
        match accepted.recv_timeout(CHILD_POLL_INTERVAL) {
            Ok(result) => {
                return result.map_err(|err| {
                    format!("failed to accept presenter bootstrap: {}", err)
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err("presenter bootstrap thread stopped".to_string());
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                return Err(format!(
                    "presenter process exited before connecting ({})",
                    status
                ));
            }
            Ok(None) => {}
            Err(err) => {
                return Err(format!("failed to poll presenter process: {}", err));
            }
        }

        if started.elapsed() >= timeout {
            return Err(format!(
                "presenter did not connect within {}s",
                timeout.as_secs()
            ));
        }
    }
}

fn forward_inbound(
    from_child: IpcReceiver<PresenterEvent>,
    outbox: Outbox,
    command_tx: RuntimeCommandSender,
) {
    while let Ok(event) = from_child.recv() {
        trace!("received presenter event: {:?}", event);

        let command = match event {
            PresenterEvent::Ready => {
                outbox.mark_ready();
                RuntimeCommand::PresenterReady
            }
            PresenterEvent::Message(message) => {
                RuntimeCommand::Deliver(message)
            }
            PresenterEvent::Quit => {
                let _ = command_tx.send(RuntimeCommand::PresenterClosed);
                return;
            }
            PresenterEvent::Init { .. } => {
                warn!("presenter sent an unexpected init event");
                continue;
            }
        };

        if let Err(err) = command_tx.send(command) {
            warn!("failed to dispatch presenter event: {}", err);
            return;
        }
    }

    let _ = command_tx.send(RuntimeCommand::PresenterClosed);
}

fn spawn_presenter_process(server_name: &str) -> Result<Child, String> {
    let mut command = Command::new("cargo");

    command
        .args([
            "run",
            "--features",
            "presenter_window",
            "--bin",
            "presenter_window",
            "--",
            server_name,
        ])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    command
        .spawn()
        .map_err(|err| format!("failed to launch presenter process: {}", err))
}

fn pipe_child_logs(child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                println!("[presenter] {}", line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(Result::ok) {
                eprintln!("[presenter] {}", line);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use ipc_channel::ipc;

    use super::*;
    use crate::runtime::events::command_channel;

    #[test]
    fn outbox_holds_events_until_ready() {
        let (tx, rx) = ipc::channel::<PresenterEvent>().unwrap();
        let outbox = Outbox::new(tx);

        outbox.send(PresenterEvent::Message("a".into())).unwrap();
        outbox.send(PresenterEvent::Message("b".into())).unwrap();
        assert!(rx.try_recv().is_err());

        outbox.mark_ready();
        outbox.send(PresenterEvent::Message("c".into())).unwrap();

        assert_eq!(rx.recv().unwrap(), PresenterEvent::Message("a".into()));
        assert_eq!(rx.recv().unwrap(), PresenterEvent::Message("b".into()));
        assert_eq!(rx.recv().unwrap(), PresenterEvent::Message("c".into()));
    }

    #[test]
    fn inbound_events_become_runtime_commands() {
        let (to_parent, from_child) = ipc::channel::<PresenterEvent>().unwrap();
        let (to_child, from_parent) = ipc::channel::<PresenterEvent>().unwrap();
        let (command_tx, command_rx) = command_channel();
        let outbox = Outbox::new(to_child);
        outbox.send(PresenterEvent::Message("queued".into())).unwrap();

        to_parent.send(PresenterEvent::Ready).unwrap();
        to_parent.send(PresenterEvent::Message("{}".into())).unwrap();
        to_parent.send(PresenterEvent::Quit).unwrap();

        forward_inbound(from_child, outbox, command_tx);

        assert_eq!(command_rx.recv().unwrap(), RuntimeCommand::PresenterReady);
        assert_eq!(
            command_rx.recv().unwrap(),
            RuntimeCommand::Deliver("{}".into())
        );
        assert_eq!(
            command_rx.recv().unwrap(),
            RuntimeCommand::PresenterClosed
        );
        assert_eq!(
            from_parent.recv().unwrap(),
            PresenterEvent::Message("queued".into())
        );
    }

    #[test]
    fn failed_flush_leaves_nothing_queued() {
        let (tx, rx) = ipc::channel::<PresenterEvent>().unwrap();
        let outbox = Outbox::new(tx);
        outbox.send(PresenterEvent::Message("a".into())).unwrap();
        outbox.send(PresenterEvent::Message("b".into())).unwrap();
        drop(rx);

        outbox.mark_ready();

        let state = outbox.state.lock().unwrap();
        assert!(state.ready);
        assert!(state.queue.is_empty());
    }

    #[test]
    fn bootstrap_wait_fails_when_presenter_exits() {
        let mut child = Command::new("true").spawn().unwrap();
        let (_accepted_tx, accepted_rx) = mpsc::channel::<Result<(), String>>();

        let err =
            wait_for_bootstrap(&accepted_rx, &mut child, Duration::from_secs(30))
                .unwrap_err();

        assert!(err.contains("exited before connecting"), "{}", err);
    }

    #[test]
    fn bootstrap_wait_gives_up_after_timeout() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let (_accepted_tx, accepted_rx) = mpsc::channel::<Result<(), String>>();

        let err = wait_for_bootstrap(
            &accepted_rx,
            &mut child,
            Duration::from_millis(250),
        )
        .unwrap_err();

        let _ = child.kill();
        let _ = child.wait();
        assert!(err.contains("did not connect"), "{}", err);
    }

    #[test]
    fn bootstrap_wait_returns_the_connection() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let (accepted_tx, accepted_rx) = mpsc::channel();
        accepted_tx.send(Ok(7)).unwrap();

        let accepted =
            wait_for_bootstrap(&accepted_rx, &mut child, Duration::from_secs(5));

        let _ = child.kill();
        let _ = child.wait();
        assert_eq!(accepted, Ok(7));
    }

    #[test]
    fn presenter_peer_posts_through_outbox() {
        let (tx, rx) = ipc::channel::<PresenterEvent>().unwrap();
        let outbox = Outbox::new(tx);
        outbox.mark_ready();
        let peer = PresenterPeer { outbox };

        peer.post_message(&SyncMessage::new_slide(2)).unwrap();

        assert!(matches!(rx.recv().unwrap(), PresenterEvent::Message(_)));
    }
}
