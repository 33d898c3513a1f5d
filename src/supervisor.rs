//! Daemon supervision.
//!
//! Each daemon invocation gets one supervisor thread blocked on a
//! single-slot channel. The first event into that channel decides what
//! happens: [`Event::Terminate`] runs the shutdown sequence, [`Event::Done`]
//! (sent when the daemon's entry point returns) just ends the thread.

use crate::command::CancellationToken;
use crate::descriptor::CloseFn;
use crate::error::Result;
use log::{debug, error, info, warn};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

/// What a supervisor can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The process was asked to terminate.
    Terminate,
    /// The daemon's entry point returned.
    Done,
}

/// Called with the process exit status at the end of the shutdown sequence.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Source of termination signals.
pub trait SignalSource: Send + Sync {
    /// Deliver [`Event::Terminate`] into `tx` until the subscription drops.
    fn subscribe(&self, tx: SyncSender<Event>) -> Result<Subscription>;
}

/// Fan-out of termination events to the current subscribers.
#[derive(Clone, Default)]
pub struct SignalHub(Arc<HubState>);

#[derive(Default)]
struct HubState {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, SyncSender<Event>)>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver [`Event::Terminate`] to every subscriber without blocking.
    /// Returns how many subscribers there were.
    pub fn raise(&self) -> usize {
        let subscribers = self.0.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, tx) in subscribers.iter() {
            // a full slot already holds the event that wins
            let _ = tx.try_send(Event::Terminate);
        }
        subscribers.len()
    }

    fn add(&self, tx: SyncSender<Event>) -> Subscription {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, tx));
        Subscription {
            hub: self.clone(),
            id,
        }
    }
}

impl SignalSource for SignalHub {
    fn subscribe(&self, tx: SyncSender<Event>) -> Result<Subscription> {
        Ok(self.add(tx))
    }
}

/// Registration with a [`SignalHub`]; removed on drop.
pub struct Subscription {
    hub: SignalHub,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub
            .0
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}

/// The process's own termination signals (SIGTERM, SIGINT, SIGHUP).
///
/// The OS handler is installed on the first subscription and stays for the
/// rest of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignals;

impl SignalSource for OsSignals {
    fn subscribe(&self, tx: SyncSender<Event>) -> Result<Subscription> {
        Ok(os_hub()?.add(tx))
    }
}

fn os_hub() -> Result<&'static SignalHub> {
    static HUB: OnceLock<SignalHub> = OnceLock::new();
    static INSTALLED: Mutex<bool> = Mutex::new(false);

    let hub = HUB.get_or_init(SignalHub::new);
    let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
    if !*installed {
        let handler = hub.clone();
        ctrlc::set_handler(move || {
            if handler.raise() == 0 {
                warn!("termination signal with no daemon running, ignored");
            }
        })?;
        *installed = true;
    }
    Ok(hub)
}

/// A running supervisor.
///
/// Dropping it sends [`Event::Done`] and joins the thread, so the
/// supervisor never outlives the invocation it watches.
pub(crate) struct Supervisor {
    tx: SyncSender<Event>,
    handle: Option<JoinHandle<()>>,
    _subscription: Subscription,
}

impl Supervisor {
    pub(crate) fn spawn(
        name: &str,
        signals: &dyn SignalSource,
        close: Option<CloseFn>,
        exit: ExitHook,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel(1);
        let subscription = signals.subscribe(tx.clone())?;
        let handle = {
            let name = name.to_string();
            thread::spawn(move || watch(&name, rx, close, exit, cancel))
        };
        info!("{name}: daemon started");
        Ok(Self {
            tx,
            handle: Some(handle),
            _subscription: subscription,
        })
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Full means a Terminate is already queued and will be acted on.
        let _ = self.tx.try_send(Event::Done);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn watch(
    name: &str,
    rx: Receiver<Event>,
    close: Option<CloseFn>,
    exit: ExitHook,
    cancel: CancellationToken,
) {
    match rx.recv() {
        Ok(Event::Terminate) => {
            info!("{name}: terminating");
            if let Some(close) = close {
                if let Err(err) = close() {
                    error!("{name}: close: {err:#}");
                }
            }
            let mut stdout = io::stdout();
            let _ = writeln!(stdout, "killed");
            let _ = stdout.flush();
            let _ = io::stderr().flush();
            exit(0);
            cancel.cancel();
        }
        Ok(Event::Done) | Err(_) => debug!("{name}: daemon returned"),
    }
}
