use crate::command::{Command, Completer, Context, Entry, Kinder, RegistryAware};
use crate::descriptor::Descriptor;
use crate::error::Error;
use crate::kind::Kind;
use crate::lang::Alt;
use crate::registry::{Registry, RegistryRef};
use crate::shell::{Cli, Source};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::marker::PhantomData;
use std::sync::Weak;

/// Commands known to the dispatcher at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and run with the
/// registry they were placed in.
pub(crate) trait Builtin: Sized + FromArgs {
    /// Canonical name of the command, e.g. "help" or "usage".
    const NAME: &'static str;
    const USAGE: &'static str;
    const APROPOS: &'static str;
    const KIND: Kind = Kind::empty();
    /// Positional arguments are command names and complete as such.
    const COMPLETES_NAMES: bool = false;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()>;
}

/// Adapts a [`Builtin`] to the [`Command`] contract.
pub(crate) struct Applet<T> {
    registry: RegistryRef,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Default for Applet<T> {
    fn default() -> Self {
        Self {
            registry: RegistryRef::default(),
            _phantom: PhantomData,
        }
    }
}

pub(crate) fn entry<T: Builtin + 'static>() -> Entry {
    Entry::raw(Applet::<T>::default())
}

impl<T: Builtin + 'static> Command for Applet<T> {
    fn name(&self) -> &str {
        T::NAME
    }

    fn usage(&self) -> &str {
        T::USAGE
    }

    fn apropos(&self) -> Alt {
        Alt::new(T::APROPOS)
    }

    fn main(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<()> {
        let registry = self
            .registry
            .get()
            .ok_or_else(|| anyhow::anyhow!("registry unavailable"))?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::NAME], &args) {
            Ok(cmd) => cmd.execute(ctx, &registry),
            Err(EarlyExit { output, status }) => match status {
                Ok(()) => {
                    write!(ctx, "{output}")?;
                    Ok(())
                }
                Err(()) => Err(anyhow::anyhow!("{}", output.trim_end())),
            },
        }
    }

    fn registry_aware(&self) -> Option<&dyn RegistryAware> {
        Some(self)
    }

    fn completer(&self) -> Option<&dyn Completer> {
        T::COMPLETES_NAMES.then_some(self as &dyn Completer)
    }

    fn kinder(&self) -> Option<&dyn Kinder> {
        (!T::KIND.is_empty()).then_some(self as &dyn Kinder)
    }
}

impl<T> RegistryAware for Applet<T> {
    fn set_registry(&self, registry: Weak<Registry>) {
        self.registry.set(registry);
    }
}

impl<T: Builtin> Completer for Applet<T> {
    fn complete(&self, args: &[String]) -> Vec<String> {
        let prefix = args.last().map_or("", String::as_str);
        self.registry
            .get()
            .map(|r| r.complete(prefix))
            .unwrap_or_default()
    }
}

impl<T: Builtin> Kinder for Applet<T> {
    fn kind(&self) -> Kind {
        T::KIND
    }
}

/// The meta-commands, the interactive shell and the script runner.
pub fn commands() -> Vec<Entry> {
    vec![
        entry::<Help>(),
        entry::<Usage>(),
        entry::<Apropos>(),
        entry::<Man>(),
        entry::<Complete>(),
        entry::<ShowCommands>(),
        entry::<Cli>(),
        entry::<Source>(),
    ]
}

fn lookup<'r>(registry: &'r Registry, name: &str) -> Result<&'r Descriptor> {
    registry
        .get(name)
        .ok_or_else(|| Error::NotFound(name.to_string()).into())
}

fn usage_text(desc: &Descriptor) -> String {
    if desc.usage.is_empty() {
        format!("usage:\t{}", desc.name)
    } else if desc.usage.starts_with('\t') {
        format!("usage:{}", desc.usage)
    } else {
        format!("usage:\t{}", desc.usage)
    }
}

fn write_block(out: &mut dyn Write, text: &str) -> Result<()> {
    if text.ends_with('\n') {
        write!(out, "{text}")?;
    } else {
        writeln!(out, "{text}")?;
    }
    Ok(())
}

#[derive(FromArgs)]
/// Print a command's help, or list the commands when none is given.
pub(crate) struct Help {
    #[argh(positional, greedy)]
    /// command name followed by an optional help topic
    pub args: Vec<String>,
}

impl Builtin for Help {
    const NAME: &'static str = "help";
    const USAGE: &'static str = "help [COMMAND [ARG]...]";
    const APROPOS: &'static str = "print command help";
    const COMPLETES_NAMES: bool = true;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        let Some((name, topic)) = self.args.split_first() else {
            let width = registry
                .iter()
                .filter(|d| d.kind.is_interactive())
                .map(|d| d.name.len())
                .max()
                .unwrap_or(0);
            let lang = ctx.lang().to_string();
            for desc in registry.iter().filter(|d| d.kind.is_interactive()) {
                writeln!(ctx, "{:<width$}  {}", desc.name, desc.apropos.get(&lang))?;
            }
            return Ok(());
        };
        let desc = lookup(registry, name)?;
        let text = desc
            .help
            .as_ref()
            .map(|help| help(topic))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| usage_text(desc));
        write_block(ctx, &text)
    }
}

#[derive(FromArgs)]
/// Print a command's usage.
pub(crate) struct Usage {
    #[argh(positional)]
    /// command name
    pub name: String,
}

impl Builtin for Usage {
    const NAME: &'static str = "usage";
    const USAGE: &'static str = "usage COMMAND";
    const APROPOS: &'static str = "print a command's synopsis";
    const COMPLETES_NAMES: bool = true;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        let desc = lookup(registry, &self.name)?;
        write_block(ctx, &usage_text(desc))
    }
}

#[derive(FromArgs)]
/// Print one-line summaries of commands.
pub(crate) struct Apropos {
    #[argh(positional, greedy)]
    /// command names; all interactive commands when omitted
    pub names: Vec<String>,
}

impl Builtin for Apropos {
    const NAME: &'static str = "apropos";
    const USAGE: &'static str = "apropos [COMMAND]...";
    const APROPOS: &'static str = "print a short command description";
    const COMPLETES_NAMES: bool = true;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        let descs = if self.names.is_empty() {
            registry.iter().filter(|d| d.kind.is_interactive()).collect()
        } else {
            self.names
                .iter()
                .map(|name| lookup(registry, name))
                .collect::<Result<Vec<_>>>()?
        };
        let lang = ctx.lang().to_string();
        for desc in descs {
            writeln!(ctx, "{} - {}", desc.name, desc.apropos.get(&lang))?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print a command's manual page.
pub(crate) struct Man {
    #[argh(positional)]
    /// command name
    pub name: String,
}

impl Builtin for Man {
    const NAME: &'static str = "man";
    const USAGE: &'static str = "man COMMAND";
    const APROPOS: &'static str = "print a command's manual page";
    const COMPLETES_NAMES: bool = true;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        let desc = lookup(registry, &self.name)?;
        let lang = ctx.lang().to_string();
        if desc.man.is_empty() {
            write_block(ctx, &usage_text(desc))?;
            writeln!(ctx)?;
            write_block(ctx, desc.apropos.get(&lang))
        } else {
            write_block(ctx, desc.man.get(&lang))
        }
    }
}

#[derive(FromArgs)]
/// Print completions, one per line.
pub(crate) struct Complete {
    #[argh(positional, greedy)]
    /// words typed so far; the last one is completed
    pub words: Vec<String>,
}

impl Builtin for Complete {
    const NAME: &'static str = "complete";
    const USAGE: &'static str = "complete [WORD]...";
    const APROPOS: &'static str = "print command line completions";

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        let completions = match self.words.split_first() {
            Some((name, args)) if !args.is_empty() => registry
                .get(name)
                .and_then(|desc| desc.complete.as_ref())
                .map(|complete| complete(args))
                .unwrap_or_default(),
            first => registry.complete(first.map_or("", |(name, _)| name.as_str())),
        };
        for completion in completions {
            writeln!(ctx, "{completion}")?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// List all commands and daemons.
pub(crate) struct ShowCommands {}

impl Builtin for ShowCommands {
    const NAME: &'static str = "show-commands";
    const USAGE: &'static str = "show-commands";
    const APROPOS: &'static str = "list all commands and daemons";
    const KIND: Kind = Kind::NO_REFORK;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        for desc in registry.iter() {
            if desc.kind.is_daemon() {
                writeln!(ctx, "\t{} - daemon", desc.name)?;
            } else if desc.kind.is_hidden() {
                writeln!(ctx, "\t{} - hidden", desc.name)?;
            } else {
                writeln!(ctx, "\t{}", desc.name)?;
            }
        }
        Ok(())
    }
}
