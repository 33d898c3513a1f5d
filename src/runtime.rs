use crate::builtin;
use crate::command::{CancellationToken, Command, Context, Entry};
use crate::config::{base_name, Settings};
use crate::error::{is_eof, Error, Result};
use crate::flags;
use crate::registry::Registry;
use crate::supervisor::{ExitHook, OsSignals, SignalSource, Supervisor};
use log::debug;
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

/// A resolved invocation: the command to run and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

/// The dispatcher.
///
/// Owns the registry and runs commands by name. Example
/// ```
/// use multicall::{Descriptor, Runtime, Settings};
/// let rt = Runtime::builder()
///     .settings(Settings::from_env().program("appliance"))
///     .entry(Descriptor::new("true", |_, _| Ok(())))
///     .build()
///     .unwrap();
/// assert_eq!(rt.run(vec!["appliance".into(), "true".into()]), 0);
/// ```
pub struct Runtime {
    registry: Arc<Registry>,
    settings: Settings,
    signals: Arc<dyn SignalSource>,
    exit: ExitHook,
}

impl Runtime {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the process's own arguments.
    pub fn run_env(&self) -> i32 {
        self.run(std::env::args().collect())
    }

    /// Run `args` and report the outcome as an exit status. Errors are
    /// printed to standard error.
    pub fn run(&self, args: Vec<String>) -> i32 {
        match self.main(args) {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("{err}");
                1
            }
        }
    }

    /// Dispatch `args` with output to standard output.
    ///
    /// Stdout is not held locked across the invocation; a daemon's
    /// supervisor writes to it from its own thread.
    pub fn main(&self, args: Vec<String>) -> Result<()> {
        self.main_flushed(&mut io::stdout(), args)
    }

    /// [`Runtime::main_with`], then flush `out`. A dispatch error takes
    /// precedence over a flush error.
    fn main_flushed(&self, out: &mut dyn Write, args: Vec<String>) -> Result<()> {
        let result = self.main_with(out, args);
        let flushed = out.flush();
        result?;
        flushed?;
        Ok(())
    }

    /// Dispatch a full argument vector, program name included.
    pub fn main_with(&self, out: &mut dyn Write, args: Vec<String>) -> Result<()> {
        let args = self.strip_program(args)?;
        self.invoke_with(out, args)
    }

    /// Dispatch `[name, args...]`, applying meta-flag redirection.
    pub fn invoke_with(&self, out: &mut dyn Write, args: Vec<String>) -> Result<()> {
        let inv = self.redirect(args)?;
        let desc = self
            .registry
            .get(&inv.name)
            .ok_or_else(|| Error::NotFound(inv.name.clone()))?;
        debug!("dispatch {} {:?}", inv.name, inv.args);

        let cancel = CancellationToken::new();
        let supervisor = if desc.kind.is_daemon() {
            Some(Supervisor::spawn(
                &desc.name,
                self.signals.as_ref(),
                desc.close.clone(),
                self.exit.clone(),
                cancel.clone(),
            )?)
        } else {
            None
        };
        let result = {
            let mut ctx = Context::new(self, out, cancel);
            (desc.main)(&mut ctx, &inv.args)
        };
        drop(supervisor);

        match result {
            Ok(()) => Ok(()),
            Err(err) if is_eof(&err) => Ok(()),
            Err(err) if desc.kind.is_daemon() => Err(Error::Daemon(err)),
            Err(err) => Err(Error::Execution {
                name: inv.name,
                error: err,
            }),
        }
    }

    /// The invocation `args` resolves to, without running it.
    pub fn resolve(&self, args: Vec<String>) -> Result<Invocation> {
        let args = self.strip_program(args)?;
        self.redirect(args)
    }

    /// Drop the leading program name or installer sentinel.
    fn strip_program(&self, mut args: Vec<String>) -> Result<Vec<String>> {
        if args.is_empty() {
            return Err(Error::MissingArguments);
        }
        if args.len() == 1 && base_name(&args[0]) == self.settings.program {
            return Ok(vec![self.settings.default_command.clone()]);
        }
        if self.registry.contains(&args[0]) {
            return Ok(args);
        }
        if args[0] == self.settings.install && args.len() > 2 {
            let script = fs::read(&args[1])
                .ok()
                .filter(|buf| std::str::from_utf8(buf).is_ok());
            if script.is_some() {
                debug!("{} {}: sourcing", args[0], args[1]);
                return Ok(vec!["source".to_string(), args.swap_remove(1)]);
            }
        }
        args.remove(0);
        if args.is_empty() {
            return Err(Error::MissingArguments);
        }
        Ok(args)
    }

    fn redirect(&self, mut args: Vec<String>) -> Result<Invocation> {
        if args.is_empty() {
            return Err(Error::MissingArguments);
        }
        let name = args.remove(0);
        match flags::extract(args) {
            (Some(meta), rest) => {
                debug!("{name}: redirected to {}", meta.command());
                Ok(Invocation {
                    name: meta.command().to_string(),
                    args: meta.redirect(name, rest),
                })
            }
            (None, args) => Ok(Invocation { name, args }),
        }
    }
}

/// Assembles a [`Runtime`].
pub struct Builder {
    settings: Option<Settings>,
    entries: Vec<Entry>,
    builtins: bool,
    signals: Arc<dyn SignalSource>,
    exit: ExitHook,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            settings: None,
            entries: Vec::new(),
            builtins: true,
            signals: Arc::new(OsSignals),
            exit: Arc::new(|code: i32| debug!("no exit hook, status {code}")),
        }
    }
}

impl Builder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn command<C: Command>(mut self, cmd: C) -> Self {
        self.entries.push(Entry::raw(cmd));
        self
    }

    pub fn entry(mut self, entry: impl Into<Entry>) -> Self {
        self.entries.push(entry.into());
        self
    }

    pub fn entries<I: IntoIterator<Item = Entry>>(mut self, entries: I) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Leave out the built-in meta-commands, shell and script runner.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Where daemon supervisors get termination signals from.
    pub fn signals(mut self, signals: impl SignalSource + 'static) -> Self {
        self.signals = Arc::new(signals);
        self
    }

    /// Called with status 0 after a terminated daemon has been shut down.
    /// The binary passes `std::process::exit`; without a hook the daemon's
    /// cancellation token is cancelled instead and its invocation returns.
    pub fn on_exit<F>(mut self, exit: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit = Arc::new(exit);
        self
    }

    pub fn build(self) -> Result<Runtime> {
        let mut entries = self.entries;
        if self.builtins {
            entries.extend(builtin::commands());
        }
        Ok(Runtime {
            registry: Registry::build(entries)?,
            settings: self.settings.unwrap_or_else(Settings::from_env),
            signals: self.signals,
            exit: self.exit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;
    use crate::error::Eof;
    use crate::kind::Kind;
    use crate::supervisor::SignalHub;
    use std::io::Write as _;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn echo() -> Descriptor {
        Descriptor::new("echo", |ctx, args| {
            writeln!(ctx, "{}", args.join(" "))?;
            Ok(())
        })
        .usage("echo [STRING]...")
        .apropos("print a line of text")
    }

    fn runtime() -> Runtime {
        Runtime::builder()
            .settings(Settings::from_env().program("goes").lang("en_US"))
            .entry(echo())
            .entry(Descriptor::new("fail", |_, _| anyhow::bail!("no such device")))
            .entry(Descriptor::new("eof", |_, _| Err(Eof.into())))
            .build()
            .unwrap()
    }

    fn output(rt: &Runtime, args: &[&str]) -> (Result<()>, String) {
        let mut out = Vec::new();
        let res = rt.invoke_with(&mut out, strings(args));
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_empty_args_are_missing() {
        let err = runtime().resolve(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::MissingArguments));
    }

    #[test]
    fn test_self_invocation_runs_default_command() {
        let rt = runtime();
        for argv0 in ["goes", "/usr/bin/goes", "./goes"] {
            let inv = rt.resolve(strings(&[argv0])).unwrap();
            assert_eq!(inv, Invocation { name: "cli".into(), args: vec![] });
        }
    }

    #[test]
    fn test_program_name_is_dropped() {
        let rt = runtime();
        let inv = rt.resolve(strings(&["/sbin/goes", "echo", "hi"])).unwrap();
        assert_eq!(inv, Invocation { name: "echo".into(), args: strings(&["hi"]) });
        // registered first tokens are kept
        let inv = rt.resolve(strings(&["echo", "hi"])).unwrap();
        assert_eq!(inv.name, "echo");
        // an unregistered sole token leaves nothing to run
        assert!(matches!(rt.resolve(strings(&["other"])), Err(Error::MissingArguments)));
    }

    #[test]
    fn test_install_with_text_file_sources_it() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "echo installed").unwrap();
        let path = script.path().to_string_lossy().to_string();

        let inv = runtime().resolve(strings(&["install", &path, "x"])).unwrap();
        assert_eq!(inv, Invocation { name: "source".into(), args: vec![path] });
    }

    #[test]
    fn test_install_with_missing_or_binary_file_drops_sentinel() {
        let mut binary = tempfile::NamedTempFile::new().unwrap();
        binary.write_all(&[0xff, 0xfe, 0x00, 0x80]).unwrap();
        let binary = binary.path().to_string_lossy().to_string();
        let rt = runtime();
        for path in [binary.as_str(), "/nonexistent/install/script"] {
            let args = rt.strip_program(strings(&["install", path, "x", "y"])).unwrap();
            assert_eq!(args, strings(&[path, "x", "y"]));
        }
        // too few arguments for a script
        let args = rt.strip_program(strings(&["install", "echo"])).unwrap();
        assert_eq!(args, strings(&["echo"]));
    }

    #[test]
    fn test_usage_flag_redirects_with_target() {
        let rt = runtime();
        for name in ["echo", "fail", "eof", "help"] {
            for trailing in [&[][..], &["a"][..], &["a", "b"][..]] {
                let mut args = vec![name];
                args.extend(trailing);
                args.push("-usage");
                let inv = rt.resolve(strings(&["goes"]).into_iter().chain(strings(&args)).collect()).unwrap();
                assert_eq!(inv, Invocation { name: "usage".into(), args: strings(&[name]) });
            }
        }
    }

    #[test]
    fn test_help_flag_uses_explicit_args_as_is() {
        let rt = runtime();
        let inv = rt.resolve(strings(&["echo", "--help"])).unwrap();
        assert_eq!(inv, Invocation { name: "help".into(), args: strings(&["echo"]) });
        let inv = rt.resolve(strings(&["echo", "-h", "topic"])).unwrap();
        assert_eq!(inv, Invocation { name: "help".into(), args: strings(&["topic"]) });
        let inv = rt.resolve(strings(&["echo", "x", "-complete", "y"])).unwrap();
        assert_eq!(inv, Invocation { name: "complete".into(), args: strings(&["x", "y"]) });
        let inv = rt.resolve(strings(&["echo", "-apropos", "x"])).unwrap();
        assert_eq!(inv, Invocation { name: "apropos".into(), args: strings(&["echo"]) });
    }

    #[test]
    fn test_unknown_command_is_lookup_error() {
        let rt = runtime();
        for name in ["frobnicate", "ech", "ECHO"] {
            let (res, _) = output(&rt, &[name, "x"]);
            let err = res.unwrap_err();
            assert!(matches!(err, Error::NotFound(ref n) if n == name));
            assert_eq!(err.to_string(), format!("{name}: command not found"));
        }
        // the dispatcher is still usable
        let (res, out) = output(&rt, &["echo", "still", "here"]);
        assert!(res.is_ok());
        assert_eq!(out, "still here\n");
    }

    #[test]
    fn test_execution_error_is_prefixed() {
        let (res, _) = output(&runtime(), &["fail"]);
        let err = res.unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
        assert_eq!(err.to_string(), "fail: no such device");
    }

    #[test]
    fn test_eof_is_success() {
        let (res, _) = output(&runtime(), &["eof"]);
        assert!(res.is_ok());
        assert_eq!(runtime().run(strings(&["goes", "eof"])), 0);
        assert_eq!(runtime().run(strings(&["goes", "fail"])), 1);
    }

    #[test]
    fn test_duplicate_with_builtin_fails_build() {
        let res = Runtime::builder()
            .entry(Descriptor::new("help", |_, _| Ok(())))
            .build();
        assert!(matches!(res, Err(Error::Duplicate(ref n)) if n == "help"));
    }

    struct DaemonProbe {
        closes: Arc<AtomicUsize>,
        exits: Arc<Mutex<Vec<i32>>>,
        hub: SignalHub,
    }

    fn daemon_runtime(close_fails: bool, raise: bool, result: fn() -> anyhow::Result<()>) -> (Runtime, DaemonProbe) {
        let hub = SignalHub::new();
        let closes = Arc::new(AtomicUsize::new(0));
        let exits = Arc::new(Mutex::new(Vec::new()));
        let daemon = {
            let hub = hub.clone();
            Descriptor::new("watchd", move |ctx, _| {
                if raise {
                    hub.raise();
                    ctx.cancellation().wait();
                }
                result()
            })
            .kind(Kind::DAEMON)
            .on_close({
                let closes = closes.clone();
                move || {
                    closes.fetch_add(1, Ordering::SeqCst);
                    if close_fails {
                        anyhow::bail!("close: resource busy");
                    }
                    Ok(())
                }
            })
        };
        let rt = Runtime::builder()
            .settings(Settings::from_env().program("goes"))
            .entry(daemon)
            .signals(hub.clone())
            .on_exit({
                let exits = exits.clone();
                move |code| exits.lock().unwrap().push(code)
            })
            .build()
            .unwrap();
        (rt, DaemonProbe { closes, exits, hub })
    }

    #[test]
    fn test_terminated_daemon_closes_once_and_exits_zero() {
        for close_fails in [false, true] {
            let (rt, probe) = daemon_runtime(close_fails, true, || Ok(()));
            let (res, _) = output(&rt, &["watchd"]);
            assert!(res.is_ok());
            assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
            assert_eq!(*probe.exits.lock().unwrap(), vec![0]);
            // the supervisor is gone with the invocation
            assert_eq!(probe.hub.raise(), 0);
        }
    }

    #[test]
    fn test_returning_daemon_skips_shutdown() {
        let (rt, probe) = daemon_runtime(false, false, || Ok(()));
        let (res, _) = output(&rt, &["watchd"]);
        assert!(res.is_ok());
        assert_eq!(probe.closes.load(Ordering::SeqCst), 0);
        assert!(probe.exits.lock().unwrap().is_empty());
        assert_eq!(probe.hub.raise(), 0);
    }

    #[test]
    fn test_daemon_error_is_not_prefixed() {
        let (rt, _probe) = daemon_runtime(false, false, || anyhow::bail!("bind: address in use"));
        let (res, _) = output(&rt, &["watchd"]);
        let err = res.unwrap_err();
        assert!(matches!(err, Error::Daemon(_)));
        assert_eq!(err.to_string(), "bind: address in use");
    }

    #[test]
    fn test_daemon_eof_is_success() {
        let (rt, probe) = daemon_runtime(false, false, || Err(Eof.into()));
        let (res, _) = output(&rt, &["watchd"]);
        assert!(res.is_ok());
        assert_eq!(rt.run(strings(&["goes", "watchd"])), 0);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_terminated_daemon_on_stdout_shuts_down() {
        let (rt, probe) = daemon_runtime(false, true, || Ok(()));
        assert_eq!(rt.run(strings(&["goes", "watchd"])), 0);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert_eq!(*probe.exits.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_terminated_daemon_inside_script_shuts_down() {
        let (rt, probe) = daemon_runtime(false, true, || Ok(()));
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "watchd").unwrap();
        let path = script.path().to_string_lossy().to_string();

        assert_eq!(rt.run(strings(&["goes", "source", &path])), 0);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert_eq!(*probe.exits.lock().unwrap(), vec![0]);
        assert_eq!(probe.hub.raise(), 0);
    }

    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_flush_error_is_reported() {
        let rt = runtime();
        let mut out = FailingFlush(Vec::new());
        let err = rt.main_flushed(&mut out, strings(&["goes", "echo", "hi"])).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(out.0, b"hi\n");

        let err = rt.main_flushed(&mut out, strings(&["goes", "fail"])).unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }
}
