use std::io::{self, BufRead, Write};

/// Typed at any prompt to leave the current practice.
pub const QUIT: &str = ":q";

/// Line-oriented prompt/answer loop over any reader and writer.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print one line.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn say(&mut self, line: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.output, "{}", line.as_ref())
    }

    /// Ask a question and read one answer line.
    ///
    /// Returns `None` on end of input or when the learner types [`QUIT`].
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt} ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim_end_matches(['\r', '\n']);
        if answer.trim() == QUIT {
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }

    /// Yes/no question, `false` unless the answer starts with `y`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        Ok(self
            .ask(&format!("{prompt} [y/N]"))?
            .is_some_and(|a| a.trim().to_lowercase().starts_with('y')))
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn reads_answers_line_by_line() {
        let mut c = console("Haus\r\n  casa \n");
        assert_eq!(c.ask("source?").unwrap().as_deref(), Some("Haus"));
        assert_eq!(c.ask("translation?").unwrap().as_deref(), Some("  casa "));
        assert_eq!(c.ask("more?").unwrap(), None);
    }

    #[test]
    fn quit_ends_the_loop() {
        let mut c = console(" :q \nignored\n");
        assert_eq!(c.ask("answer?").unwrap(), None);
    }

    #[test]
    fn confirm_defaults_to_no() {
        let mut c = console("\nYes\n");
        assert!(!c.confirm("again?").unwrap());
        assert!(c.confirm("again?").unwrap());
        let out = String::from_utf8(c.into_output()).unwrap();
        assert!(out.starts_with("again? [y/N] "));
    }
}
