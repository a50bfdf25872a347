//! Command lines and command batches
//!
//! A command line is a leading opcode token followed by a raw argument
//! remainder. A batch is any text of command lines; blank lines and lines
//! starting with `#` are skipped, and failures are tracked by 1-based line
//! number so one bad line never stops the rest of the batch.

use std::fmt;

/// One parsed command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub opcode: &'a str,
    /// Everything after the opcode, trimmed
    pub args: &'a str,
}

impl<'a> CommandLine<'a> {
    /// Split a line into opcode and arguments; `None` for blank lines
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (opcode, args) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], line[idx..].trim()),
            None => (line, ""),
        };
        Some(Self { opcode, args })
    }

    /// Whitespace-separated argument tokens
    pub fn tokens(self) -> impl Iterator<Item = &'a str> {
        self.args.split_whitespace()
    }

    /// Exactly `N` argument tokens, or `None`
    pub fn exact_args<const N: usize>(&self) -> Option<[&'a str; N]> {
        let tokens: Vec<&str> = self.tokens().collect();
        tokens.try_into().ok()
    }
}

/// Lines of a batch that should be executed, with their 1-based line numbers
pub fn executable_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(idx, line)| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            None
        } else {
            Some((idx + 1, trimmed))
        }
    })
}

/// A batch line that did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    pub line_number: usize,
    pub text: String,
}

impl fmt::Display for LineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command \"{}\" at line {} failed", self.text, self.line_number)
    }
}

/// Outcome of running a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub executed: usize,
    pub failures: Vec<LineFailure>,
}

impl BatchReport {
    pub fn record(&mut self, line_number: usize, text: &str, ok: bool) {
        self.executed += 1;
        if !ok {
            self.failures.push(LineFailure {
                line_number,
                text: text.to_string(),
            });
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Run every executable line of `text` through `exec`
    pub fn run<F>(text: &str, mut exec: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        let mut report = Self::default();
        for (line_number, line) in executable_lines(text) {
            let ok = exec(line);
            report.record(line_number, line, ok);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_opcode_and_raw_remainder() {
        let cmd = CommandLine::parse("  print   hello   world ").unwrap();
        assert_eq!(cmd.opcode, "print");
        assert_eq!(cmd.args, "hello   world");
    }

    #[test]
    fn test_parse_opcode_only() {
        let cmd = CommandLine::parse("start").unwrap();
        assert_eq!(cmd.opcode, "start");
        assert_eq!(cmd.args, "");
        assert_eq!(cmd.tokens().count(), 0);
    }

    #[test]
    fn test_parse_blank_is_none() {
        assert!(CommandLine::parse("   \t").is_none());
    }

    #[test]
    fn test_exact_args() {
        let cmd = CommandLine::parse("addinputmapping /tmp/a.output nx y").unwrap();
        assert_eq!(cmd.exact_args::<3>(), Some(["/tmp/a.output", "nx", "y"]));
        assert_eq!(cmd.exact_args::<2>(), None);
    }

    #[test]
    fn test_executable_lines_skip_comments_and_blanks() {
        let text = "# seq 4\nprint a\n\n   # note\nupdate\n";
        let lines: Vec<_> = executable_lines(text).collect();
        assert_eq!(lines, vec![(2, "print a"), (5, "update")]);
    }

    #[test]
    fn test_batch_attributes_failure_to_line_and_continues() {
        let mut seen = Vec::new();
        let report = BatchReport::run("print one\nbogus\nprint three\n", |line| {
            seen.push(line.to_string());
            !line.starts_with("bogus")
        });

        assert_eq!(seen, vec!["print one", "bogus", "print three"]);
        assert!(!report.is_success());
        assert_eq!(report.executed, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line_number, 2);
        assert_eq!(report.failures[0].to_string(), "Command \"bogus\" at line 2 failed");
    }

    #[test]
    fn test_empty_batch_succeeds() {
        let report = BatchReport::run("\n# nothing\n", |_| false);
        assert!(report.is_success());
        assert_eq!(report.executed, 0);
    }
}
