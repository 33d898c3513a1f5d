//! A multi-call command dispatcher.
//!
//! One executable carries many named commands and decides which one to run
//! from how it was invoked: by its own name (the default command, an
//! interactive shell), by a command name in the first argument, or through
//! the installer sentinel that runs a script.
//!
//! Commands implement the small [`Command`] contract and opt into extra
//! behaviors (completion, help, manual pages, shutdown hooks, registry
//! access) through capability traits. [`Registry::build`] adapts them into
//! [`Descriptor`]s and [`Runtime`] dispatches by name, redirecting
//! meta-flags such as `-help` or `-usage` to the matching meta-command and
//! supervising daemons until they return or the process is terminated.

mod applets;
mod builtin;
pub mod command;
pub mod config;
pub mod descriptor;
mod error;
pub mod flags;
pub mod kind;
pub mod lang;
pub mod lexer;
pub mod registry;
mod runtime;
mod shell;
pub mod supervisor;

pub use applets::commands as applets;
pub use builtin::commands as builtins;
pub use command::{
    CancellationToken, Closer, Command, Completer, Context, Entry, Helper, Kinder, Manner,
    RegistryAware,
};
pub use config::Settings;
pub use descriptor::Descriptor;
pub use error::{Eof, Error, Result, is_eof};
pub use kind::Kind;
pub use lang::Alt;
pub use registry::{Registry, RegistryRef};
pub use runtime::{Builder, Invocation, Runtime};
pub use supervisor::{Event, ExitHook, OsSignals, SignalHub, SignalSource, Subscription};
