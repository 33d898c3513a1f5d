//! Sample applets linked into the `multicall` binary.

use crate::builtin::{self, Builtin};
use crate::command::{Closer, Command, Context, Entry, Kinder};
use crate::kind::Kind;
use crate::lang::Alt;
use crate::registry::Registry;
use anyhow::{Context as _, Result};
use argh::FromArgs;
use log::info;
use std::env;
use std::io::Write;

/// Applets registered by the binary next to the builtins.
pub fn commands() -> Vec<Entry> {
    vec![
        builtin::entry::<Echo>(),
        builtin::entry::<Pwd>(),
        builtin::entry::<Cd>(),
        Entry::raw(Idle),
    ]
}

#[derive(FromArgs)]
/// Print arguments separated by spaces.
pub(crate) struct Echo {
    #[argh(switch, short = 'n')]
    /// do not print the trailing newline
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// words to print
    pub args: Vec<String>,
}

impl Builtin for Echo {
    const NAME: &'static str = "echo";
    const USAGE: &'static str = "echo [-n] [STRING]...";
    const APROPOS: &'static str = "print a line of text";

    fn execute(self, ctx: &mut Context<'_>, _registry: &Registry) -> Result<()> {
        write!(ctx, "{}", self.args.join(" "))?;
        if !self.no_newline {
            writeln!(ctx)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print the current working directory.
pub(crate) struct Pwd {}

impl Builtin for Pwd {
    const NAME: &'static str = "pwd";
    const USAGE: &'static str = "pwd";
    const APROPOS: &'static str = "print working directory";

    fn execute(self, ctx: &mut Context<'_>, _registry: &Registry) -> Result<()> {
        let dir = env::current_dir().context("current directory")?;
        writeln!(ctx, "{}", dir.display())?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Change the working directory of the dispatcher.
pub(crate) struct Cd {
    #[argh(positional)]
    /// target directory; $HOME when omitted
    pub dir: Option<String>,
}

impl Builtin for Cd {
    const NAME: &'static str = "cd";
    const USAGE: &'static str = "cd [DIRECTORY]";
    const APROPOS: &'static str = "change the current directory";
    const KIND: Kind = Kind::NO_REFORK;

    fn execute(self, _ctx: &mut Context<'_>, _registry: &Registry) -> Result<()> {
        let dir = match self.dir {
            Some(dir) => dir,
            None => env::var("HOME").context("HOME not set")?,
        };
        env::set_current_dir(&dir).with_context(|| dir.clone())?;
        Ok(())
    }
}

/// A daemon that does nothing until it is terminated.
pub(crate) struct Idle;

impl Command for Idle {
    fn name(&self) -> &str {
        "idle"
    }

    fn usage(&self) -> &str {
        "idle"
    }

    fn apropos(&self) -> Alt {
        Alt::new("wait for a termination signal").with("de_DE", "auf ein Beendigungssignal warten")
    }

    fn main(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<()> {
        info!("idle: waiting");
        ctx.cancellation().wait();
        Ok(())
    }

    fn closer(&self) -> Option<&dyn Closer> {
        Some(self)
    }

    fn kinder(&self) -> Option<&dyn Kinder> {
        Some(self)
    }
}

impl Closer for Idle {
    fn close(&self) -> Result<()> {
        info!("idle: closed");
        Ok(())
    }
}

impl Kinder for Idle {
    fn kind(&self) -> Kind {
        Kind::DAEMON
    }
}
