use anyhow::{Context, Result};
use chrono::Local;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::io::{self, Write};
use std::time::Duration;

use assistant_memory::state::AssistantState;

use crate::intent::{recognize, Dispatcher};
use crate::output::{print_farewell, print_reply};

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Runs the interactive loop until `exit`, `quit` or end of input.
///
/// Returns an error only when state can no longer be saved.
pub async fn run_interactive_chat(
    dispatcher: &Dispatcher,
    state: &mut AssistantState,
    typing: bool,
) -> Result<()> {
    loop {
        print!("{} ", "You:".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            debug!("End of input");
            print_farewell();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if is_exit_command(input) {
            print_farewell();
            break;
        }

        let intent = recognize(input);
        info!("Handling {:?}", intent);

        let spinner = intent.needs_model().then(thinking_spinner);
        let result = dispatcher
            .execute(input, intent, state, Local::now().naive_local())
            .await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let reply = result.context("Could not save assistant state")?;
        print_reply(&reply.text, reply.from_model, typing).await;
    }

    Ok(())
}
