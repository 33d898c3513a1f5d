//! The plug-in contract.
//!
//! Every command implements [`Command`]. Optional behaviors are separate
//! single-method traits; a command advertises one by overriding the matching
//! accessor on [`Command`] to return `Some(self)`. The adapter in
//! [`crate::registry`] probes each accessor independently.

use crate::config::Settings;
use crate::descriptor::Descriptor;
use crate::kind::Kind;
use crate::lang::Alt;
use crate::registry::Registry;
use crate::runtime::Runtime;
use anyhow::Result;
use std::io::{self, Write};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};

/// Minimal contract of a dispatchable command.
pub trait Command: Send + Sync + 'static {
    /// Unique, stable name the command is dispatched by.
    fn name(&self) -> &str;

    /// One-line synopsis. A leading `"\n\t"` introduces a multi-line usage.
    fn usage(&self) -> &str;

    /// One-line summary.
    fn apropos(&self) -> Alt;

    /// Entry point.
    fn main(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<()>;

    fn registry_aware(&self) -> Option<&dyn RegistryAware> {
        None
    }

    fn closer(&self) -> Option<&dyn Closer> {
        None
    }

    fn completer(&self) -> Option<&dyn Completer> {
        None
    }

    fn helper(&self) -> Option<&dyn Helper> {
        None
    }

    fn kinder(&self) -> Option<&dyn Kinder> {
        None
    }

    fn manner(&self) -> Option<&dyn Manner> {
        None
    }
}

/// Receives a back-reference to the registry the command was placed in.
pub trait RegistryAware {
    fn set_registry(&self, registry: Weak<Registry>);
}

/// Releases resources when a daemon is terminated.
pub trait Closer {
    fn close(&self) -> Result<()>;
}

/// Completes the last of `args`.
pub trait Completer {
    fn complete(&self, args: &[String]) -> Vec<String>;
}

/// Long help, optionally about a topic named in `args`.
pub trait Helper {
    fn help(&self, args: &[String]) -> String;
}

pub trait Kinder {
    fn kind(&self) -> Kind;
}

/// Manual page.
pub trait Manner {
    fn man(&self) -> Alt;
}

/// What a registry is built from.
pub enum Entry {
    /// A command still to be adapted.
    Raw(Arc<dyn Command>),
    /// An already adapted descriptor, inserted verbatim.
    Prebuilt(Descriptor),
}

impl Entry {
    pub fn raw<C: Command>(cmd: C) -> Self {
        Entry::Raw(Arc::new(cmd))
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Raw(cmd) => cmd.name(),
            Entry::Prebuilt(desc) => &desc.name,
        }
    }
}

impl From<Descriptor> for Entry {
    fn from(desc: Descriptor) -> Self {
        Entry::Prebuilt(desc)
    }
}

impl From<Arc<dyn Command>> for Entry {
    fn from(cmd: Arc<dyn Command>) -> Self {
        Entry::Raw(cmd)
    }
}

/// Cooperative cancellation flag handed to every invocation.
///
/// Only daemons ever see it cancelled: the supervisor cancels it after a
/// termination signal when the exit hook returns.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<TokenState>);

#[derive(Default)]
struct TokenState {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.0.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.0.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let mut cancelled = self.0.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            cancelled = self
                .0
                .cond
                .wait(cancelled)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CancellationToken")
            .field(&self.is_cancelled())
            .finish()
    }
}

/// Per-invocation state passed to [`Command::main`].
///
/// Writes go to the invocation's standard output.
pub struct Context<'a> {
    runtime: &'a Runtime,
    out: &'a mut dyn Write,
    cancel: CancellationToken,
}

impl<'a> Context<'a> {
    pub(crate) fn new(runtime: &'a Runtime, out: &'a mut dyn Write, cancel: CancellationToken) -> Self {
        Self {
            runtime,
            out,
            cancel,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.runtime.settings()
    }

    /// Language tag localized text should be rendered in.
    pub fn lang(&self) -> &str {
        &self.runtime.settings().lang
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Dispatch `[name, args...]` sharing this context's output.
    ///
    /// Meta-flags are honored; there is no program name to strip.
    pub fn dispatch(&mut self, args: Vec<String>) -> crate::Result<()> {
        self.runtime.invoke_with(&mut *self.out, args)
    }
}

impl Write for Context<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
