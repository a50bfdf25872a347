//! Interactive command loop for running a worker by hand

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::host::WorkerHost;

/// Read commands from the terminal until `quit`, Ctrl-C or Ctrl-D
pub fn run_interactive(host: &mut WorkerHost) -> Result<()> {
    let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

    loop {
        match rl.readline(&format!("{} ", "tw>".bright_green())) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() || input.starts_with('#') {
                    continue;
                }
                let _ = rl.add_history_entry(input);
                if matches!(input, "quit" | "q") {
                    break;
                }
                host.run_command(input);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
        }
    }
    Ok(())
}
