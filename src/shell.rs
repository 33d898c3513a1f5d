//! The interactive shell and the script runner.

use crate::builtin::Builtin;
use crate::command::Context;
use crate::error::Eof;
use crate::kind::Kind;
use crate::lexer;
use crate::registry::Registry;
use anyhow::{Context as _, Result};
use argh::FromArgs;
use log::debug;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs;
use std::io::Write;

/// What to do after a line has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

/// Split and dispatch one line of input.
///
/// `exit` and `quit` end the session unless a command of that name is
/// registered.
pub(crate) fn run_line(ctx: &mut Context<'_>, registry: &Registry, line: &str) -> Result<Flow> {
    let words = lexer::split(line)?;
    let Some(first) = words.first() else {
        return Ok(Flow::Continue);
    };
    if matches!(first.as_str(), "exit" | "quit") && !registry.contains(first) {
        return Ok(Flow::Exit);
    }
    ctx.dispatch(words)?;
    Ok(Flow::Continue)
}

#[derive(FromArgs)]
/// Read and run commands interactively.
pub(crate) struct Cli {
    #[argh(option, short = 'p')]
    /// prompt; defaults to the program name followed by "> "
    pub prompt: Option<String>,
}

impl Builtin for Cli {
    const NAME: &'static str = "cli";
    const USAGE: &'static str = "cli [-p PROMPT]";
    const APROPOS: &'static str = "command line interpreter";
    const KIND: Kind = Kind::NO_REFORK;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        let prompt = self
            .prompt
            .unwrap_or_else(|| format!("{}> ", ctx.settings().program));
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    match run_line(ctx, registry, &line) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Exit) => return Ok(()),
                        Err(err) => eprintln!("{err:#}"),
                    }
                    ctx.flush()?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Err(Eof.into()),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[derive(FromArgs)]
/// Run commands from a file.
pub(crate) struct Source {
    #[argh(positional)]
    /// script to run
    pub path: String,
}

impl Builtin for Source {
    const NAME: &'static str = "source";
    const USAGE: &'static str = "source FILE";
    const APROPOS: &'static str = "run commands from a file";
    const KIND: Kind = Kind::NO_REFORK;

    fn execute(self, ctx: &mut Context<'_>, registry: &Registry) -> Result<()> {
        let script = fs::read_to_string(&self.path).with_context(|| self.path.clone())?;
        for (n, line) in script.lines().enumerate() {
            let flow = run_line(ctx, registry, line)
                .map_err(|err| anyhow::anyhow!("{}:{}: {:#}", self.path, n + 1, err))?;
            if flow == Flow::Exit {
                debug!("{}:{}: exit", self.path, n + 1);
                break;
            }
        }
        Ok(())
    }
}
