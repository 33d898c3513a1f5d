use std::fmt;

bitflags::bitflags! {
    /// Dispatch policy of a command.
    ///
    /// The flags are independent and may be combined freely. An empty set
    /// describes an ordinary interactive command.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Kind: u16 {
        /// Runs indefinitely; terminated by signal rather than by returning.
        const DAEMON    = 1 << 0;
        /// Excluded from completion and listings.
        const HIDDEN    = 1 << 1;
        /// Must run in the dispatcher's own process.
        const NO_REFORK = 1 << 2;
        /// Can't be used as a pipeline stage.
        const NO_PIPE   = 1 << 3;
    }
}

impl Kind {
    pub fn is_daemon(self) -> bool {
        self.contains(Kind::DAEMON)
    }

    pub fn is_hidden(self) -> bool {
        self.contains(Kind::HIDDEN)
    }

    /// Neither a daemon nor hidden.
    pub fn is_interactive(self) -> bool {
        !self.intersects(Kind::DAEMON | Kind::HIDDEN)
    }

    pub fn is_no_refork(self) -> bool {
        self.contains(Kind::NO_REFORK)
    }

    pub fn is_no_pipe(self) -> bool {
        self.contains(Kind::NO_PIPE)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("interactive");
        }
        let labels = [
            (Kind::DAEMON, "daemon"),
            (Kind::HIDDEN, "hidden"),
            (Kind::NO_REFORK, "no-refork"),
            (Kind::NO_PIPE, "no-pipe"),
        ];
        let mut first = true;
        for (flag, label) in labels {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(label)?;
                first = false;
            }
        }
        Ok(())
    }
}
