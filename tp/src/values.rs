//! Named scalar files: one `name value` pair per line

use std::fmt;
use std::fs;
use std::path::Path;

use log::warn;

use crate::{ProtoError, write_atomic};

/// Ordered set of named scalars; a name appears at most once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedValues {
    entries: Vec<(String, f64)>,
}

impl NamedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an earlier value in place
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse file contents
    ///
    /// Blank lines are ignored, malformed lines are skipped with a warning,
    /// and a repeated name keeps its last value.
    pub fn parse(text: &str) -> Self {
        let mut values = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            let Some(name) = tokens.next() else {
                continue;
            };
            match tokens.next().map(str::parse::<f64>) {
                Some(Ok(value)) if tokens.next().is_none() => values.set(name, value),
                _ => warn!("NamedValues::parse: skipping malformed line {}: {:?}", idx + 1, line),
            }
        }
        values
    }

    pub fn read(path: &Path) -> Result<Self, ProtoError> {
        let text = fs::read_to_string(path).map_err(|e| ProtoError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Atomically replace `path` with these values
    pub fn write(&self, path: &Path) -> Result<(), ProtoError> {
        write_atomic(path, &self.to_string())
    }
}

impl fmt::Display for NamedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            writeln!(f, "{} {}", name, value)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for NamedValues {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.set(name, value);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reads_pairs_and_skips_blank_lines() {
        let values = NamedValues::parse("x 1.5\n\n  y   -2\n");
        assert_eq!(values.get("x"), Some(1.5));
        assert_eq!(values.get("y"), Some(-2.0));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let values = NamedValues::parse("x\ny abc\nz 1 2\nw 4\n");
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("w"), Some(4.0));
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        let values = NamedValues::parse("x 1\nx 3\n");
        assert_eq!(values.get("x"), Some(3.0));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_set_keeps_insertion_order() {
        let mut values = NamedValues::new();
        values.set("nx", 1.0);
        values.set("ny", 2.0);
        values.set("nx", 5.0);
        assert_eq!(values.to_string(), "nx 5\nny 2\n");
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = NamedValues::read(&temp.path().join("missing.output")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_then_read_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.output");
        let values: NamedValues = [("nx", -0.25), ("ny", 3.0)].into_iter().collect();

        values.write(&path).unwrap();

        assert_eq!(NamedValues::read(&path).unwrap(), values);
    }

    proptest! {
        #[test]
        fn prop_rendered_values_parse_back(
            pairs in proptest::collection::btree_map("[a-z][a-z0-9_]{0,8}", -1.0e6f64..1.0e6, 0..8)
        ) {
            let values: NamedValues = pairs.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let parsed = NamedValues::parse(&values.to_string());
            prop_assert_eq!(parsed, values);
        }
    }
}
