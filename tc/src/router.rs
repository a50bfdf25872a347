//! Command router: operator command lines to coordinator actions

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use colored::Colorize;
use tracing::{debug, warn};

use tickproto::{BatchReport, CommandLine, executable_lines};

use crate::coordinator::Coordinator;
use crate::error::CoordError;
use crate::scheduler::SchedulerState;
use crate::topology::store::parse_interval;
use crate::topology::{MappingEntry, WorkerSpec, validate_name};

/// Opcode usage and description, in `help` order
pub const OPCODES: &[(&str, &str)] = &[
    ("print <text>", "Echo text"),
    ("summary", "Show workers, processes and mappings"),
    ("stats", "Show scheduler counters"),
    ("addchild <name> <invocation> [args...]", "Add or replace a worker (applies on start)"),
    ("removechild <name>", "Remove a worker; its process runs until the next start"),
    ("addmapping <source> <output> <consumer> <input>", "Route a named output into a worker input"),
    ("removemapping <source> <output> <consumer>", "Remove a route"),
    ("start", "(Re)start every worker"),
    ("stop", "Terminate every worker"),
    ("run", "Tick until interrupted, then exit"),
    ("updateall", "Run one tick"),
    ("targetinterval <seconds>", "Set the tick interval"),
    ("runcommand <name> <command>", "Forward a command to one worker; 'update' sends a bare tick"),
    ("save", "Write the topology file"),
    ("debug", "Not implemented"),
    ("help", "Show this help"),
];

impl Coordinator {
    /// Execute one command line; errors are reported and turned into `false`
    pub async fn run_command(&mut self, line: &str) -> bool {
        match self.execute(line).await {
            Ok(()) => true,
            Err(e) => {
                warn!(line, error = %e, "Command failed");
                eprintln!("{} {}", "error:".red(), e);
                false
            }
        }
    }

    /// Execute every command line of `text` in order, continuing past failures
    pub async fn run_commands(&mut self, text: &str) -> BatchReport {
        let mut report = BatchReport::default();
        for (line_number, line) in executable_lines(text) {
            let ok = self.run_command(line).await;
            report.record(line_number, line, ok);
            if self.quit {
                break;
            }
        }
        for failure in &report.failures {
            eprintln!("{}", failure);
        }
        report
    }

    pub async fn run_command_file(&mut self, path: &Path) -> Result<BatchReport, CoordError> {
        let text = fs::read_to_string(path).map_err(|source| CoordError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.run_commands(&text).await)
    }

    async fn execute(&mut self, line: &str) -> Result<(), CoordError> {
        let Some(cmd) = CommandLine::parse(line) else {
            return Ok(());
        };
        debug!(opcode = cmd.opcode, args = cmd.args, "Coordinator::execute: called");

        match cmd.opcode {
            "print" => println!("OUT: {}", cmd.args),
            "summary" => print_block(&self.summary()),
            "stats" => print_block(&self.stats_text()),
            "addchild" => self.add_child(cmd)?,
            "removechild" => {
                let [name] = cmd.exact_args().ok_or(CoordError::Usage("removechild <name>"))?;
                self.topology
                    .roster
                    .remove(name)
                    .ok_or_else(|| CoordError::NoSuchWorker(name.to_string()))?;
                self.scheduler.detach(name);
            }
            "addmapping" => {
                let entry = MappingEntry::from_tokens(cmd.tokens())
                    .ok_or(CoordError::Usage("addmapping <source> <output> <consumer> <input>"))?;
                if !self.topology.roster.contains(&entry.consumer) {
                    eprintln!("{} no worker named '{}' yet", "warning:".yellow(), entry.consumer);
                }
                self.topology.mappings.insert(entry);
                self.scheduler.invalidate_mappings();
            }
            "removemapping" => {
                let [source, output, consumer] = cmd
                    .exact_args()
                    .ok_or(CoordError::Usage("removemapping <source> <output> <consumer>"))?;
                self.topology
                    .mappings
                    .remove(consumer, source, output)
                    .ok_or_else(|| CoordError::NoSuchMapping {
                        source_file: source.to_string(),
                        output: output.to_string(),
                        consumer: consumer.to_string(),
                    })?;
                self.scheduler.invalidate_mappings();
            }
            "start" => self.start()?,
            "stop" => {
                self.scheduler.stop();
                println!("OUT: all workers stopped");
            }
            "run" => self.run_until_interrupted().await?,
            "updateall" => self.scheduler.update_all(&self.topology).await?,
            "targetinterval" => {
                let [value] = cmd.exact_args().ok_or(CoordError::Usage("targetinterval <seconds>"))?;
                let interval = parse_interval(value).ok_or_else(|| CoordError::InvalidInterval(value.to_string()))?;
                self.topology.target_interval = interval;
                self.scheduler.set_target_interval(interval);
            }
            "runcommand" => {
                let usage = CoordError::Usage("runcommand <name> <command>");
                let forwarded = CommandLine::parse(cmd.args).ok_or(usage)?;
                let (name, command) = (forwarded.opcode, forwarded.args);
                if command.is_empty() {
                    return Err(CoordError::Usage("runcommand <name> <command>"));
                }
                if command == "update" {
                    self.scheduler.tick_worker(name).await?;
                } else {
                    self.scheduler.forward(name, command).await?;
                }
            }
            "save" => {
                self.topology.save(&self.config_path)?;
                println!("OUT: saved {}", self.config_path.display());
            }
            "debug" => println!("OUT: debug is not implemented"),
            "help" => print_help(),
            other => return Err(CoordError::UnknownOpcode(other.to_string())),
        }
        Ok(())
    }

    fn add_child(&mut self, cmd: CommandLine<'_>) -> Result<(), CoordError> {
        let spec = WorkerSpec::from_tokens(cmd.tokens())
            .ok_or(CoordError::Usage("addchild <name> <invocation> [args...]"))?;
        validate_name(&spec.name)?;
        let name = spec.name.clone();
        if self.topology.roster.insert(spec).is_some() {
            println!("OUT: replaced worker {}; restart to apply", name);
        }
        self.scheduler.invalidate_mappings();
        Ok(())
    }

    /// Spawn the roster; succeeds only if every worker started
    fn start(&mut self) -> Result<(), CoordError> {
        let report = self.scheduler.start(&self.topology.roster);
        for (name, pid) in &report.started {
            println!("OUT: started {} (pid {})", name, pid);
        }
        let mut failed = report.failed.into_iter();
        match failed.next() {
            None => Ok(()),
            Some((_, first)) => {
                for (_, e) in failed {
                    eprintln!("{} {}", "error:".red(), e);
                }
                Err(first)
            }
        }
    }

    async fn run_until_interrupted(&mut self) -> Result<(), CoordError> {
        if self.scheduler.state() == SchedulerState::Unconfigured {
            return Err(CoordError::NotStarted);
        }
        let mut interrupt = self.interrupt()?;
        self.scheduler.run(&self.topology, interrupt.recv()).await?;
        self.quit = true;
        Ok(())
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let supervisor = self.scheduler.supervisor();

        let _ = writeln!(out, "topology: {}", self.config_path.display());
        out.push_str("workers:\n");
        for spec in &self.topology.roster {
            let process = match supervisor.handle(&spec.name) {
                Some(h) => format!("pid {}, up since {}", h.pid(), h.started_at().format("%H:%M:%S")),
                None => "not running".to_string(),
            };
            let _ = writeln!(out, "  {}: {}  [{}]", spec.name, spec.command_line(), process);
        }
        for h in supervisor.detached() {
            let _ = writeln!(out, "  {} (removed, pid {} until restart)", h.name(), h.pid());
        }
        out.push_str("mappings:\n");
        for entry in self.topology.mappings.entries() {
            let _ = writeln!(
                out,
                "  {} {} -> {} {}",
                entry.source, entry.output, entry.consumer, entry.input
            );
        }
        let _ = writeln!(out, "target interval: {} s", self.topology.target_interval);
        out
    }

    fn stats_text(&self) -> String {
        let stats = self.scheduler.stats();
        let supervisor = self.scheduler.supervisor();
        let mut out = String::new();
        let _ = writeln!(out, "state: {}", self.scheduler.state());
        let _ = writeln!(out, "time index: {:.3}", self.scheduler.clock().time_index());
        let _ = writeln!(
            out,
            "workers: {} configured, {} running, {} detached",
            self.topology.roster.len(),
            supervisor.active().len(),
            supervisor.detached().len()
        );
        let _ = writeln!(
            out,
            "mappings: {} ({})",
            self.topology.mappings.len(),
            if self.scheduler.mappings_sent() { "sent" } else { "pending" }
        );
        let _ = writeln!(out, "iterations: {}", stats.iterations);
        let _ = writeln!(out, "ticks sent: {} ({} failed)", stats.ticks_sent, stats.tick_failures);
        let _ = writeln!(out, "distributions: {}", stats.distributions);
        let _ = writeln!(out, "commands forwarded: {}", stats.commands_forwarded);
        out
    }
}

fn print_block(text: &str) {
    for line in text.lines() {
        println!("OUT: {}", line);
    }
}

fn print_help() {
    println!("{}", "Commands:".bright_cyan());
    for (usage, description) in OPCODES {
        println!("  {:50} {}", usage.yellow(), description);
    }
    println!("  {:50} {}", "quit | q".yellow(), "Leave the interactive loop");
}
