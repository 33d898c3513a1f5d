use crate::command::Context;
use crate::kind::Kind;
use crate::lang::Alt;
use crate::registry::Registry;
use anyhow::Result;
use std::fmt;
use std::sync::{Arc, Weak};

pub type MainFn = Arc<dyn Fn(&mut Context<'_>, &[String]) -> Result<()> + Send + Sync>;
pub type CloseFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;
pub type CompleteFn = Arc<dyn Fn(&[String]) -> Vec<String> + Send + Sync>;
pub type HelpFn = Arc<dyn Fn(&[String]) -> String + Send + Sync>;
pub type InjectFn = Arc<dyn Fn(Weak<Registry>) + Send + Sync>;

/// Registry entry binding a command name to its behavior and metadata.
///
/// Cloning is cheap; entry points are shared.
#[derive(Clone)]
pub struct Descriptor {
    pub name: String,
    pub kind: Kind,
    pub usage: String,
    pub apropos: Alt,
    pub man: Alt,
    pub main: MainFn,
    pub close: Option<CloseFn>,
    pub complete: Option<CompleteFn>,
    pub help: Option<HelpFn>,
    /// Registry back-reference hook, re-run whenever the descriptor is
    /// placed into a registry.
    pub inject: Option<InjectFn>,
}

impl Descriptor {
    /// A descriptor with the given entry point and every optional field at
    /// its default.
    pub fn new<F>(name: impl Into<String>, main: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: Kind::empty(),
            usage: String::new(),
            apropos: Alt::default(),
            man: Alt::default(),
            main: Arc::new(main),
            close: None,
            complete: None,
            help: None,
            inject: None,
        }
    }

    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = normalize_usage(usage.into());
        self
    }

    pub fn apropos(mut self, apropos: impl Into<Alt>) -> Self {
        self.apropos = apropos.into();
        self
    }

    pub fn man(mut self, man: impl Into<Alt>) -> Self {
        self.man = man.into();
        self
    }

    pub fn on_close<F>(mut self, close: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.close = Some(Arc::new(close));
        self
    }

    pub fn on_complete<F>(mut self, complete: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        self.complete = Some(Arc::new(complete));
        self
    }

    pub fn on_help<F>(mut self, help: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        self.help = Some(Arc::new(help));
        self
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("usage", &self.usage)
            .field("apropos", &self.apropos)
            .field("close", &self.close.is_some())
            .field("complete", &self.complete.is_some())
            .field("help", &self.help.is_some())
            .field("inject", &self.inject.is_some())
            .finish_non_exhaustive()
    }
}

/// Strips the newline of the multi-line usage convention (`"\n\t..."`).
pub(crate) fn normalize_usage(usage: String) -> String {
    match usage.strip_prefix('\n') {
        Some(rest) if rest.starts_with('\t') => rest.to_string(),
        _ => usage,
    }
}
