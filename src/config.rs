use crate::lang::{self, EN_US};
use std::env as stdenv;
use std::path::Path;

/// Command run when the program is invoked by its own name without arguments.
pub const DEFAULT_COMMAND: &str = "cli";

/// First argument that marks an installer invocation.
pub const INSTALL: &str = "install";

/// Dispatcher settings captured from the process environment.
///
/// Every field can be overridden with the builder-style setters, which is
/// what embedders and tests do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// File base name of the running program.
    pub program: String,
    /// Command substituted for a bare self-invocation.
    pub default_command: String,
    /// Installer sentinel recognized as the first argument.
    pub install: String,
    /// Language tag used to render localized text.
    pub lang: String,
}

impl Settings {
    /// Capture the current process state.
    ///
    /// `MULTICALL_PROGRAM`, `MULTICALL_DEFAULT` and `MULTICALL_LANG` take
    /// precedence over what is detected; the language otherwise comes from
    /// `LANG`.
    pub fn from_env() -> Self {
        let program = stdenv::var("MULTICALL_PROGRAM")
            .ok()
            .or_else(detect_program)
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        let default_command =
            stdenv::var("MULTICALL_DEFAULT").unwrap_or_else(|_| DEFAULT_COMMAND.to_string());
        let lang = stdenv::var("MULTICALL_LANG")
            .ok()
            .or_else(|| {
                stdenv::var("LANG")
                    .ok()
                    .and_then(|l| lang::tag_of(&l).map(str::to_string))
            })
            .unwrap_or_else(|| EN_US.to_string());
        Self {
            program,
            default_command,
            install: INSTALL.to_string(),
            lang,
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn default_command(mut self, name: impl Into<String>) -> Self {
        self.default_command = name.into();
        self
    }

    pub fn install(mut self, sentinel: impl Into<String>) -> Self {
        self.install = sentinel.into();
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

/// File base name of `path`, or "" when it has none.
pub fn base_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

fn detect_program() -> Option<String> {
    let exe = stdenv::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|s| s.to_string_lossy().into_owned()));
    exe.or_else(|| stdenv::args().next().map(|a| base_name(&a).to_string()))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/usr/sbin/goes"), "goes");
        assert_eq!(base_name("goes"), "goes");
        assert_eq!(base_name(""), "");
    }

    #[test]
    fn test_setters_override_environment() {
        let settings = Settings::from_env()
            .program("appliance")
            .default_command("shell")
            .install("setup")
            .lang("de_DE");
        assert_eq!(settings.program, "appliance");
        assert_eq!(settings.default_command, "shell");
        assert_eq!(settings.install, "setup");
        assert_eq!(settings.lang, "de_DE");
    }

    #[test]
    fn test_from_env_has_a_program_name() {
        let settings = Settings::from_env();
        assert!(!settings.program.is_empty());
        assert!(!settings.lang.is_empty());
    }
}
