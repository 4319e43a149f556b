//! Confirmation gate in front of destructive commands.

use std::io::{self, BufRead, Write};

/// Phrase the operator must type, exactly, to run a destructive command.
pub const CONFIRM_PHRASE: &str = "DELETE ALL USER DATA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Confirmed,
    Cancelled,
}

/// Decide the gate from what the operator typed. Surrounding whitespace is
/// tolerated; anything else is a cancellation.
pub fn matches_phrase(input: &str) -> Gate {
    if input.trim() == CONFIRM_PHRASE {
        Gate::Confirmed
    } else {
        Gate::Cancelled
    }
}

/// Prompt on stdin for the confirmation phrase. `--force` skips the prompt.
pub fn gate(force: bool) -> io::Result<Gate> {
    if force {
        return Ok(Gate::Confirmed);
    }
    print!("Type \"{CONFIRM_PHRASE}\" to proceed: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches_phrase(&line))
}
