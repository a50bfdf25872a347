//! Sectioned text format for topologies
//!
//! ```text
//! net1 ./tw --child            # section 1: name invocation args...
//! net2 ./tw --child
//!
//! globals sin1hz net1 x        # section 2: source output consumer input
//! net1 nx net2 y
//!
//! targetUpdateInterval 0.1     # section 3: key value
//! ```
//!
//! Each blank line advances to the next section, so an empty section is just
//! a blank line. Lines starting with `#` are comments.

use std::fmt;
use std::fmt::Write as _;

use super::{MappingEntry, Topology, WorkerSpec, validate_name};

const INTERVAL_KEY: &str = "targetUpdateInterval";

/// A line that was skipped while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Roster,
    Mappings,
    Parameters,
}

impl Section {
    fn next(self) -> Self {
        match self {
            Section::Roster => Section::Mappings,
            Section::Mappings | Section::Parameters => Section::Parameters,
        }
    }
}

/// Parse topology text; malformed lines are skipped and reported
pub fn parse(text: &str) -> (Topology, Vec<ConfigWarning>) {
    let mut topology = Topology::default();
    let mut warnings = Vec::new();
    let mut section = Section::Roster;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let mut warn = |message: String| warnings.push(ConfigWarning { line: idx + 1, message });

        if line.is_empty() {
            section = section.next();
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        match section {
            Section::Roster => match WorkerSpec::from_tokens(line.split_whitespace()) {
                Some(spec) => {
                    if let Err(e) = validate_name(&spec.name) {
                        warn(e.to_string());
                    } else if topology.roster.insert(spec).is_some() {
                        warn("duplicate worker name, later entry wins".to_string());
                    }
                }
                None => warn(format!("expected 'name invocation [args...]', got {:?}", line)),
            },
            Section::Mappings => match MappingEntry::from_tokens(line.split_whitespace()) {
                Some(entry) => {
                    topology.mappings.insert(entry);
                }
                None => warn(format!("expected 'source output consumer input', got {:?}", line)),
            },
            Section::Parameters => {
                let mut tokens = line.split_whitespace();
                match (tokens.next(), tokens.next(), tokens.next()) {
                    (Some(INTERVAL_KEY), Some(value), None) => match parse_interval(value) {
                        Some(interval) => topology.target_interval = interval,
                        None => warn(format!("invalid {} {:?}", INTERVAL_KEY, value)),
                    },
                    (Some(key), Some(_), None) => warn(format!("unknown parameter '{}'", key)),
                    _ => warn(format!("expected 'key value', got {:?}", line)),
                }
            }
        }
    }

    (topology, warnings)
}

/// Render topology text; `parse(render(t))` yields `t` without warnings
pub fn render(topology: &Topology) -> String {
    let mut out = String::new();
    for spec in &topology.roster {
        let _ = writeln!(out, "{}", spec);
    }
    out.push('\n');
    for entry in topology.mappings.entries() {
        let _ = writeln!(out, "{}", entry);
    }
    out.push('\n');
    let _ = writeln!(out, "{} {}", INTERVAL_KEY, topology.target_interval);
    out
}

/// Seconds between ticks: a finite, non-negative number
pub fn parse_interval(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::MappingTable;
    use proptest::prelude::*;

    const SAMPLE: &str = "\
net1 ./tw --child
net2 ./tw --child --inputs a,b

globals sin1hz net1 x
net1 nx net2 a

targetUpdateInterval 0.25
";

    #[test]
    fn test_parse_three_sections() {
        let (topology, warnings) = parse(SAMPLE);

        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(topology.roster.len(), 2);
        assert_eq!(topology.roster.get("net2").unwrap().argv, ["--child", "--inputs", "a,b"]);
        assert_eq!(topology.mappings.len(), 2);
        assert_eq!(topology.target_interval, 0.25);
    }

    #[test]
    fn test_missing_interval_defaults() {
        let (topology, _) = parse("net1 ./tw\n\nglobals sin1hz net1 x\n");
        assert_eq!(topology.target_interval, 0.1);
    }

    #[test]
    fn test_empty_sections_round_trip() {
        let mut topology = Topology::default();
        topology.target_interval = 0.5;

        let text = render(&topology);
        assert_eq!(text, "\n\ntargetUpdateInterval 0.5\n");

        let (parsed, warnings) = parse(&text);
        assert!(warnings.is_empty());
        assert_eq!(parsed, topology);
    }

    #[test]
    fn test_empty_roster_with_mappings() {
        let (topology, warnings) = parse("\nglobals sin1hz a x\n\ntargetUpdateInterval 1\n");
        assert!(warnings.is_empty());
        assert!(topology.roster.is_empty());
        assert_eq!(topology.mappings.len(), 1);
    }

    #[test]
    fn test_malformed_lines_are_reported_with_line_numbers() {
        let text = "net1\nglobals ./tw\n\nglobals sin1hz net1\n\nrefreshRate 3\ntargetUpdateInterval fast\n";
        let (topology, warnings) = parse(text);

        let lines: Vec<usize> = warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![1, 2, 4, 6, 7]);
        assert!(warnings[1].message.contains("reserved"));
        assert!(warnings[3].message.contains("unknown parameter"));
        assert!(topology.roster.is_empty());
        assert!(topology.mappings.is_empty());
        assert_eq!(topology.target_interval, 0.1);
    }

    #[test]
    fn test_comments_do_not_advance_sections() {
        let (topology, warnings) = parse("# workers\nnet1 ./tw\n\n# wiring\nglobals sin1hz net1 x\n");
        assert!(warnings.is_empty());
        assert_eq!(topology.roster.len(), 1);
        assert_eq!(topology.mappings.len(), 1);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("0.05"), Some(0.05));
        assert_eq!(parse_interval("0"), Some(0.0));
        assert_eq!(parse_interval("-1"), None);
        assert_eq!(parse_interval("inf"), None);
        assert_eq!(parse_interval("soon"), None);
    }

    fn arb_topology() -> impl Strategy<Value = Topology> {
        let workers = proptest::collection::btree_map(
            "w[a-z0-9]{0,6}",
            ("[a-z./]{1,10}", proptest::collection::vec("[a-z0-9,=-]{1,6}", 0..3)),
            0..4,
        );
        let mappings = proptest::collection::vec(
            ("[a-z]{1,6}", "[a-z]{1,4}", "w[a-z0-9]{0,6}", "[a-z]{1,4}"),
            0..6,
        );
        (workers, mappings, 0.0f64..10.0).prop_map(|(workers, mappings, interval)| {
            let mut topology = Topology::default();
            for (name, (invocation, argv)) in workers {
                topology.roster.insert(WorkerSpec::new(name, invocation, argv));
            }
            topology.mappings = mappings
                .into_iter()
                .map(|(s, o, c, i)| MappingEntry::new(s, o, c, i))
                .collect::<MappingTable>();
            topology.target_interval = interval;
            topology
        })
    }

    proptest! {
        #[test]
        fn prop_load_of_save_is_identity(topology in arb_topology()) {
            let (parsed, warnings) = parse(&render(&topology));
            prop_assert!(warnings.is_empty(), "{:?}", warnings);
            prop_assert_eq!(parsed, topology);
        }
    }
}
