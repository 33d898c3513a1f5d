//! Splits a command line into words.
//!
//! Words are separated by blanks. Single quotes keep their content verbatim,
//! double quotes allow backslash escapes, and a `#` at the start of a word
//! comments out the rest of the line.

use thiserror::Error;

/// Errors that can occur while splitting a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unfinished quote")]
    UnfinishedQuote,
    /// The line ends with a lone backslash.
    #[error("trailing backslash")]
    TrailingEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
    Comment,
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    word: String,
    /// Set once the current word has started, so `""` yields an empty word.
    in_word: bool,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line.chars(),
            state: LexingState::Start,
            word: String::new(),
            in_word: false,
        }
    }

    fn make_words(mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::ReadingWord => self.handle_word(ch, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
                LexingState::Comment => break,
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                return Err(LexingError::UnfinishedQuote);
            }
            _ => {}
        }
        self.finish_word(&mut out);
        Ok(out)
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            c if c.is_whitespace() => {}
            '#' => self.state = LexingState::Comment,
            _ => {
                self.state = LexingState::ReadingWord;
                self.in_word = true;
                self.push_word_char(ch)?;
            }
        }
        Ok(())
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) -> Result<(), LexingError> {
        if ch.is_whitespace() {
            self.finish_word(out);
            self.state = LexingState::Start;
            Ok(())
        } else {
            self.push_word_char(ch)
        }
    }

    fn push_word_char(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => {
                let escaped = self.input.next().ok_or(LexingError::TrailingEscape)?;
                self.word.push(escaped);
            }
            _ => self.word.push(ch),
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        if ch == '\'' {
            self.state = LexingState::ReadingWord;
        } else {
            self.word.push(ch);
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => {
                let escaped = self.input.next().ok_or(LexingError::UnfinishedQuote)?;
                self.word.push(escaped);
            }
            _ => self.word.push(ch),
        }
        Ok(())
    }

    fn finish_word(&mut self, out: &mut Vec<String>) {
        if self.in_word {
            out.push(std::mem::take(&mut self.word));
            self.in_word = false;
        }
    }
}

/// Split `line` into words.
pub fn split(line: &str) -> Result<Vec<String>, LexingError> {
    LexingFSM::new(line).make_words()
}
