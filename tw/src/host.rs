//! Worker host: ports, input mappings and the command interpreter

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use colored::*;
use log::{debug, warn};
use tickproto::{BatchReport, CommandLine, NamedValues};

use crate::computation::{Computation, Negate};
use crate::error::HostError;

/// Default input port names of the generic worker
pub const DEFAULT_INPUTS: [&str; 3] = ["x", "y", "z"];

/// Default output port names of the generic worker
pub const DEFAULT_OUTPUTS: [&str; 3] = ["nx", "ny", "nz"];

/// Counters reported by `stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub ticks: u64,
    pub unresolved: u64,
    pub commands: u64,
    pub failed_commands: u64,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub inputs: Vec<f64>,
    pub outputs: NamedValues,
    /// `file:output` references that fell back to 0
    pub unresolved: Vec<String>,
    pub written: bool,
}

pub struct WorkerHost {
    inputs: Vec<String>,
    outputs: Vec<String>,
    /// source file -> output name -> input name
    mappings: BTreeMap<String, BTreeMap<String, String>>,
    output_file: Option<PathBuf>,
    computation: Box<dyn Computation>,
    stats: HostStats,
}

impl WorkerHost {
    pub fn new(computation: Box<dyn Computation>, inputs: Vec<String>, outputs: Vec<String>) -> Self {
        debug!(
            "WorkerHost::new: computation={} inputs={:?} outputs={:?}",
            computation.name(),
            inputs,
            outputs
        );
        Self {
            inputs,
            outputs,
            mappings: BTreeMap::new(),
            output_file: None,
            computation,
            stats: HostStats::default(),
        }
    }

    /// The generic negating worker with the default ports
    pub fn negate() -> Self {
        Self::new(
            Box::new(Negate),
            DEFAULT_INPUTS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_OUTPUTS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.values().map(BTreeMap::len).sum()
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    /// Execute one command line; errors are reported and turned into `false`
    pub fn run_command(&mut self, line: &str) -> bool {
        self.stats.commands += 1;
        match self.execute(line) {
            Ok(()) => true,
            Err(e) => {
                self.stats.failed_commands += 1;
                warn!("WorkerHost::run_command: {:?} failed: {}", line, e);
                eprintln!("{} {}", "error:".red(), e);
                false
            }
        }
    }

    /// Execute every command line in `text`, reporting failed lines
    pub fn run_commands(&mut self, text: &str) -> BatchReport {
        let report = BatchReport::run(text, |line| self.run_command(line));
        for failure in &report.failures {
            eprintln!("{}", failure);
        }
        report
    }

    fn execute(&mut self, line: &str) -> Result<(), HostError> {
        let Some(cmd) = CommandLine::parse(line) else {
            return Ok(());
        };
        debug!("WorkerHost::execute: opcode={} args={:?}", cmd.opcode, cmd.args);

        match cmd.opcode {
            "print" => println!("OUT: {}", cmd.args),
            "summary" => print_out(&self.summary()),
            "stats" => print_out(&self.stats_text()),
            "addinputmapping" => {
                let [file, output, input] = cmd
                    .exact_args()
                    .ok_or(HostError::Usage("addinputmapping <file> <output> <input>"))?;
                self.add_input_mapping(file, output, input);
            }
            "removeinputmapping" => {
                let [file, output] = cmd
                    .exact_args()
                    .ok_or(HostError::Usage("removeinputmapping <file> <output>"))?;
                self.remove_input_mapping(file, output)?;
            }
            "clearinputmappings" => self.mappings.clear(),
            "setoutputfile" => {
                let [path] = cmd.exact_args().ok_or(HostError::Usage("setoutputfile <path>"))?;
                self.output_file = Some(PathBuf::from(path));
            }
            "update" => {
                self.tick()?;
            }
            "inputadd" => {
                let [name] = cmd.exact_args().ok_or(HostError::Usage("inputadd <name>"))?;
                add_port(&mut self.inputs, name)?;
            }
            "outputadd" => {
                let [name] = cmd.exact_args().ok_or(HostError::Usage("outputadd <name>"))?;
                add_port(&mut self.outputs, name)?;
            }
            "inputremove" => {
                let [name] = cmd.exact_args().ok_or(HostError::Usage("inputremove <name>"))?;
                if !remove_port(&mut self.inputs, name) {
                    return Err(HostError::NoSuchInput(name.to_string()));
                }
            }
            "outputremove" => {
                let [name] = cmd.exact_args().ok_or(HostError::Usage("outputremove <name>"))?;
                if !remove_port(&mut self.outputs, name) {
                    return Err(HostError::NoSuchOutput(name.to_string()));
                }
            }
            "debug" => println!("OUT: debug is not implemented"),
            other => return Err(HostError::UnknownOpcode(other.to_string())),
        }
        Ok(())
    }

    pub fn add_input_mapping(&mut self, file: &str, output: &str, input: &str) {
        debug!("WorkerHost::add_input_mapping: {} {} -> {}", file, output, input);
        self.mappings
            .entry(file.to_string())
            .or_default()
            .insert(output.to_string(), input.to_string());
    }

    fn remove_input_mapping(&mut self, file: &str, output: &str) -> Result<(), HostError> {
        let missing = || HostError::NoSuchMapping {
            file: file.to_string(),
            output: output.to_string(),
        };
        let routes = self.mappings.get_mut(file).ok_or_else(missing)?;
        routes.remove(output).ok_or_else(missing)?;
        if routes.is_empty() {
            self.mappings.remove(file);
        }
        Ok(())
    }

    /// Read mapped inputs, compute, and rewrite the output file
    ///
    /// Unresolvable inputs count as 0, so the output file is always complete.
    pub fn tick(&mut self) -> Result<TickReport, HostError> {
        let mut inputs = vec![0.0; self.inputs.len()];
        let mut unresolved = Vec::new();

        for (file, routes) in &self.mappings {
            let source = match NamedValues::read(Path::new(file)) {
                Ok(values) => Some(values),
                Err(e) => {
                    warn!("WorkerHost::tick: cannot read {}: {}", file, e);
                    None
                }
            };
            for (output, input) in routes {
                let Some(idx) = self.inputs.iter().position(|n| n == input) else {
                    warn!("WorkerHost::tick: No input named '{}' exists.", input);
                    continue;
                };
                match source.as_ref().and_then(|s| s.get(output)) {
                    Some(value) => inputs[idx] = value,
                    None => {
                        warn!("WorkerHost::tick: {}:{} unresolved, using 0", file, output);
                        unresolved.push(format!("{}:{}", file, output));
                    }
                }
            }
        }

        let values = self.computation.compute(&inputs, self.outputs.len());
        let outputs: NamedValues = self
            .outputs
            .iter()
            .cloned()
            .zip(values.into_iter().chain(std::iter::repeat(0.0)))
            .collect();

        self.stats.ticks += 1;
        self.stats.unresolved += unresolved.len() as u64;

        let written = match &self.output_file {
            Some(path) => {
                outputs.write(path)?;
                true
            }
            None => {
                debug!("WorkerHost::tick: no output file set, skipping write");
                false
            }
        };

        Ok(TickReport {
            inputs,
            outputs,
            unresolved,
            written,
        })
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "computation: {}", self.computation.name());
        let _ = writeln!(out, "inputs: {}", self.inputs.join(" "));
        let _ = writeln!(out, "outputs: {}", self.outputs.join(" "));
        match &self.output_file {
            Some(path) => {
                let _ = writeln!(out, "output file: {}", path.display());
            }
            None => out.push_str("output file: (unset)\n"),
        }
        for (file, routes) in &self.mappings {
            for (output, input) in routes {
                let _ = writeln!(out, "mapping: {} {} -> {}", file, output, input);
            }
        }
        out
    }

    fn stats_text(&self) -> String {
        format!(
            "ticks: {}\nunresolved inputs: {}\ncommands: {} ({} failed)\nmappings: {}\n",
            self.stats.ticks,
            self.stats.unresolved,
            self.stats.commands,
            self.stats.failed_commands,
            self.mapping_count()
        )
    }
}

fn print_out(text: &str) {
    for line in text.lines() {
        println!("OUT: {}", line);
    }
}

fn add_port(ports: &mut Vec<String>, name: &str) -> Result<(), HostError> {
    if ports.iter().any(|p| p == name) {
        return Err(HostError::DuplicatePort(name.to_string()));
    }
    ports.push(name.to_string());
    Ok(())
}

fn remove_port(ports: &mut Vec<String>, name: &str) -> bool {
    let before = ports.len();
    ports.retain(|p| p != name);
    ports.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn host_with_output(temp: &TempDir) -> (WorkerHost, PathBuf) {
        let mut host = WorkerHost::negate();
        let out = temp.path().join("w.output");
        assert!(host.run_command(&format!("setoutputfile {}", out.display())));
        (host, out)
    }

    #[test]
    fn test_tick_negates_mapped_inputs() {
        let temp = TempDir::new().unwrap();
        let (mut host, out) = host_with_output(&temp);
        let src = temp.path().join("globals.output");
        fs::write(&src, "sin1hz 0.5\ncos1hz -2\n").unwrap();
        host.add_input_mapping(&src.to_string_lossy(), "sin1hz", "x");
        host.add_input_mapping(&src.to_string_lossy(), "cos1hz", "z");

        let report = host.tick().unwrap();

        assert_eq!(report.inputs, vec![0.5, 0.0, -2.0]);
        assert!(report.unresolved.is_empty());
        let written = NamedValues::read(&out).unwrap();
        assert_eq!(written.get("nx"), Some(-0.5));
        assert_eq!(written.get("ny"), Some(0.0));
        assert_eq!(written.get("nz"), Some(2.0));
    }

    #[test]
    fn test_tick_with_missing_key_uses_zero_and_writes_complete_file() {
        let temp = TempDir::new().unwrap();
        let (mut host, out) = host_with_output(&temp);
        let src = temp.path().join("a.output");
        fs::write(&src, "nx 3\n").unwrap();
        host.add_input_mapping(&src.to_string_lossy(), "nx", "x");
        host.add_input_mapping(&src.to_string_lossy(), "missing", "y");

        let report = host.tick().unwrap();

        assert_eq!(report.inputs, vec![3.0, 0.0, 0.0]);
        assert_eq!(report.unresolved.len(), 1);
        let written = NamedValues::read(&out).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written.get("nx"), Some(-3.0));
        assert_eq!(host.stats().unresolved, 1);
    }

    #[test]
    fn test_tick_with_missing_file_still_writes_output() {
        let temp = TempDir::new().unwrap();
        let (mut host, out) = host_with_output(&temp);
        host.add_input_mapping(&temp.path().join("gone.output").to_string_lossy(), "nx", "x");

        let report = host.tick().unwrap();

        assert_eq!(report.unresolved.len(), 1);
        assert!(report.written);
        assert_eq!(NamedValues::read(&out).unwrap().len(), 3);
    }

    #[test]
    fn test_mapping_to_unknown_input_is_ignored() {
        let temp = TempDir::new().unwrap();
        let (mut host, _out) = host_with_output(&temp);
        let src = temp.path().join("a.output");
        fs::write(&src, "nx 3\n").unwrap();
        host.add_input_mapping(&src.to_string_lossy(), "nx", "w");

        let report = host.tick().unwrap();

        assert_eq!(report.inputs, vec![0.0, 0.0, 0.0]);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_tick_without_output_file_skips_write() {
        let mut host = WorkerHost::negate();
        let report = host.tick().unwrap();
        assert!(!report.written);
        assert_eq!(report.outputs.len(), 3);
    }

    #[test]
    fn test_unknown_opcode_fails() {
        let mut host = WorkerHost::negate();
        assert!(!host.run_command("frobnicate now"));
        assert_eq!(host.stats().failed_commands, 1);
    }

    #[test]
    fn test_addinputmapping_requires_three_args() {
        let mut host = WorkerHost::negate();
        assert!(!host.run_command("addinputmapping /tmp/a.output nx"));
        assert!(host.run_command("addinputmapping /tmp/a.output nx x"));
        assert_eq!(host.mapping_count(), 1);
    }

    #[test]
    fn test_clear_and_remove_input_mappings() {
        let mut host = WorkerHost::negate();
        let batch = "addinputmapping a nx x\naddinputmapping a ny y\naddinputmapping b nz z\n";
        assert!(host.run_commands(batch).is_success());
        assert_eq!(host.mapping_count(), 3);

        assert!(host.run_command("removeinputmapping a ny"));
        assert!(!host.run_command("removeinputmapping a ny"));
        assert_eq!(host.mapping_count(), 2);

        assert!(host.run_command("clearinputmappings"));
        assert_eq!(host.mapping_count(), 0);
    }

    #[test]
    fn test_port_opcodes() {
        let mut host = WorkerHost::negate();
        assert!(host.run_command("inputadd w"));
        assert!(!host.run_command("inputadd w"));
        assert!(host.run_command("outputremove nz"));
        assert!(!host.run_command("outputremove nz"));
        assert!(!host.run_command("inputremove q"));

        assert_eq!(host.inputs(), ["x", "y", "z", "w"]);
        assert_eq!(host.outputs(), ["nx", "ny"]);
    }

    #[test]
    fn test_update_opcode_ticks() {
        let temp = TempDir::new().unwrap();
        let (mut host, out) = host_with_output(&temp);
        assert!(host.run_command("update"));
        assert_eq!(host.stats().ticks, 1);
        assert!(out.exists());
    }

    #[test]
    fn test_batch_reports_failed_line() {
        let mut host = WorkerHost::negate();
        let report = host.run_commands("print one\nbogus\n# comment\nprint three\n");
        assert_eq!(report.executed, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line_number, 2);
    }

    #[test]
    fn test_summary_lists_mappings() {
        let mut host = WorkerHost::negate();
        host.add_input_mapping("/rt/globals.output", "sin1hz", "x");
        let summary = host.summary();
        assert!(summary.contains("inputs: x y z"));
        assert!(summary.contains("mapping: /rt/globals.output sin1hz -> x"));
        assert!(summary.contains("output file: (unset)"));
    }
}
