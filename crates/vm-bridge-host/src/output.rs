//! Output log behind the `env.output` import.

/// Lines written by the guest during the current run, in call order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLog {
    lines: Vec<String>,
}

impl OutputLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the decimal form of `value` as one line.
    pub fn emit(&mut self, value: i32) {
        self.lines.push(value.to_string());
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in call order, without terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The log as text, each line followed by `\n`.
    pub fn text(&self) -> String {
        self.lines.iter().fold(String::new(), |mut text, line| {
            text.push_str(line);
            text.push('\n');
            text
        })
    }
}
