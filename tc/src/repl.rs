//! Interactive command loop
//!
//! The line editor blocks, so it lives on its own thread and hands finished
//! lines to the session. The session stays free to notice an interrupt while
//! the operator is at the prompt.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::coordinator::Coordinator;

enum Input {
    Line(String),
    Eof,
    Failed(String),
}

/// Read command lines until `quit`, Ctrl-C, Ctrl-D or an interrupted `run`
pub async fn run_interactive(coordinator: &mut Coordinator, history: Option<&Path>) -> Result<()> {
    println!(
        "{} {}  (type {} for commands, {} to leave)",
        "tickmesh coordinator".bright_cyan().bold(),
        coordinator.config_path().display(),
        "help".yellow(),
        "quit".yellow()
    );

    let (lines_tx, mut lines_rx) = mpsc::channel(1);
    let (next_tx, next_rx) = std_mpsc::channel();
    let history = history.map(Path::to_path_buf);
    let reader = thread::Builder::new()
        .name("tc-readline".to_string())
        .spawn(move || read_lines(history, lines_tx, next_rx))
        .map_err(|e| eyre::eyre!("Failed to start readline thread: {}", e))?;

    let mut outcome = Ok(());
    while let Some(input) = lines_rx.recv().await {
        match input {
            Input::Line(line) => {
                if matches!(line.as_str(), "quit" | "q") {
                    break;
                }
                coordinator.run_command(&line).await;
                if coordinator.quit_requested() || next_tx.send(()).is_err() {
                    break;
                }
            }
            Input::Eof => {
                println!();
                break;
            }
            Input::Failed(message) => {
                outcome = Err(eyre::eyre!(message));
                break;
            }
        }
    }

    // the reader is parked waiting for the next prompt; hanging up releases it
    drop(next_tx);
    drop(lines_rx);
    if reader.join().is_err() {
        warn!("Readline thread panicked");
    }
    outcome
}

/// Prompt, send the line, then wait until the session asks for the next one
fn read_lines(history: Option<PathBuf>, lines: mpsc::Sender<Input>, next: std_mpsc::Receiver<()>) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            let _ = lines.blocking_send(Input::Failed(format!("Failed to initialize readline: {}", e)));
            return;
        }
    };
    if let Some(path) = &history {
        if rl.load_history(path).is_err() {
            debug!(path = %path.display(), "read_lines: no history loaded");
        }
    }

    loop {
        let input = match rl.readline(&format!("{} ", "tc>".bright_green())) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() || input.starts_with('#') {
                    continue;
                }
                let _ = rl.add_history_entry(input);
                Input::Line(input.to_string())
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Input::Eof,
            Err(err) => Input::Failed(format!("Readline error: {}", err)),
        };
        let prompt_again = matches!(input, Input::Line(_));
        if lines.blocking_send(input).is_err() || !prompt_again {
            break;
        }
        if next.recv().is_err() {
            break;
        }
    }

    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            warn!(path = %path.display(), error = %e, "Failed to save history");
        }
    }
}
