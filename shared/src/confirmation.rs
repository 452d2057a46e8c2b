use crate::types::Result;
use dialoguer::Confirm;
use std::io::IsTerminal;

/// Standardized confirmation prompt used across binaries.
pub fn ask_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let choice = Confirm::new()
        .with_prompt(prompt)
        .default(default_yes)
        .show_default(true)
        .interact()?;
    Ok(choice)
}

/// True when stdin is attached to a terminal and prompting makes sense.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}
