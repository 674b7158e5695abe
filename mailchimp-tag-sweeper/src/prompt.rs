use std::io::{self, BufRead, Write};

/// Asks a yes/no question before anything destructive happens.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> io::Result<bool>;
}

/// Line-based confirmation over any reader/writer pair. Only `y` or `yes`
/// (any case) confirms; an empty line or EOF declines.
pub struct LineConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LineConfirm<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for LineConfirm<R, W> {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        write!(self.output, "{} (y/N) ", message)?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}
