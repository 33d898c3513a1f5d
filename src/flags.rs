//! Meta-flags that redirect any invocation to a built-in meta-command.

/// A recognized meta-flag, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Meta {
    Help,
    Apropos,
    Man,
    Usage,
    Complete,
}

impl Meta {
    /// Normalizes an alias to its flag.
    pub fn parse(arg: &str) -> Option<Meta> {
        match arg {
            "-h" | "-help" | "--help" => Some(Meta::Help),
            "-apropos" | "--apropos" => Some(Meta::Apropos),
            "-man" | "--man" => Some(Meta::Man),
            "-usage" | "--usage" => Some(Meta::Usage),
            "-complete" | "--complete" => Some(Meta::Complete),
            _ => None,
        }
    }

    /// Name of the meta-command the flag redirects to.
    pub fn command(self) -> &'static str {
        match self {
            Meta::Help => "help",
            Meta::Apropos => "apropos",
            Meta::Man => "man",
            Meta::Usage => "usage",
            Meta::Complete => "complete",
        }
    }

    /// Arguments of the meta-command when invoked on behalf of `target`.
    ///
    /// `help` and `complete` take the remaining arguments as they are, or
    /// the target alone when there are none; the others act on the target.
    pub fn redirect(self, target: String, rest: Vec<String>) -> Vec<String> {
        match self {
            Meta::Help | Meta::Complete if !rest.is_empty() => rest,
            _ => vec![target],
        }
    }
}

/// Removes every meta-flag from `args` and returns the one that takes
/// precedence.
pub fn extract(args: Vec<String>) -> (Option<Meta>, Vec<String>) {
    let mut found: Option<Meta> = None;
    let mut rest = Vec::with_capacity(args.len());
    for arg in args {
        match Meta::parse(&arg) {
            Some(meta) => found = Some(found.map_or(meta, |f| f.min(meta))),
            None => rest.push(arg),
        }
    }
    (found, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_aliases_normalize() {
        for alias in ["-h", "-help", "--help"] {
            assert_eq!(Meta::parse(alias), Some(Meta::Help));
        }
        assert_eq!(Meta::parse("--apropos"), Some(Meta::Apropos));
        assert_eq!(Meta::parse("-man"), Some(Meta::Man));
        assert_eq!(Meta::parse("--usage"), Some(Meta::Usage));
        assert_eq!(Meta::parse("-complete"), Some(Meta::Complete));
        assert_eq!(Meta::parse("--helpme"), None);
        assert_eq!(Meta::parse("-H"), None);
    }

    #[test]
    fn test_extract_removes_flags_anywhere() {
        let (meta, rest) = extract(strings(&["a", "-usage", "b"]));
        assert_eq!(meta, Some(Meta::Usage));
        assert_eq!(rest, strings(&["a", "b"]));
    }

    #[test]
    fn test_extract_precedence() {
        let (meta, rest) = extract(strings(&["--complete", "-man", "-h"]));
        assert_eq!(meta, Some(Meta::Help));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_extract_without_flags() {
        let (meta, rest) = extract(strings(&["-n", "x"]));
        assert_eq!(meta, None);
        assert_eq!(rest, strings(&["-n", "x"]));
    }

    #[test]
    fn test_redirect() {
        assert_eq!(Meta::Help.redirect("ls".into(), vec![]), strings(&["ls"]));
        assert_eq!(Meta::Complete.redirect("ls".into(), vec![]), strings(&["ls"]));
        assert_eq!(Meta::Complete.redirect("ls".into(), strings(&["-l"])), strings(&["-l"]));
        assert_eq!(Meta::Help.redirect("ls".into(), strings(&["cp", "x"])), strings(&["cp", "x"]));
        assert_eq!(Meta::Usage.redirect("ls".into(), strings(&["x"])), strings(&["ls"]));
        assert_eq!(Meta::Man.command(), "man");
    }
}
