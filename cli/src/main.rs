use anyhow::{Context, Result};
use assistant_core::client::{ChatModel, LlmClient, OfflineModel};
use assistant_core::config::{get_default_config_dir, get_default_config_file, AssistantConfig, APP_NAME};
use assistant_memory::state::AssistantState;
use chrono::Local;
use clap::Parser;
use log::debug;
use std::path::PathBuf;

mod app;
mod cli;
mod intent;
mod logging;
mod output;

use crate::cli::Args;
use crate::intent::Dispatcher;
use crate::logging::{log_error, log_info, log_warning};
use crate::output::{print_banner, print_config, print_farewell};

/// Config file from `--config`, else the per-user default.
fn config_file_path(args: &Args) -> PathBuf {
    args.config.clone().unwrap_or_else(|| {
        get_default_config_file(APP_NAME).unwrap_or_else(|_| PathBuf::from("config.toml"))
    })
}

/// `--data-dir` (or its env var), then the config file, then the config directory.
fn data_dir(args: &Args, config: &AssistantConfig) -> PathBuf {
    args.data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .or_else(|| get_default_config_dir(APP_NAME).ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn build_model(config: &AssistantConfig) -> Box<dyn ChatModel> {
    match LlmClient::new(config) {
        Ok(client) => {
            debug!("Using model {}", client.model_name());
            Box::new(client)
        }
        Err(e) => {
            log_warning(&format!("{}. Meeting commands still work; chat replies are disabled.", e));
            Box::new(OfflineModel)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config_file = config_file_path(&args);
    let (config, config_problem) = match AssistantConfig::resolve(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (
            AssistantConfig::builtin().merge(&AssistantConfig::from_env()),
            Some(e),
        ),
    };

    logging::init(config.log_level.as_deref(), args.verbose);
    if let Some(e) = config_problem {
        log_warning(&format!("{}; using defaults", e));
    }

    let data_dir = data_dir(&args, &config);
    if args.show_config {
        print_config(&config, &data_dir, &config_file);
        return Ok(());
    }

    let mut state = AssistantState::open(&data_dir, Local::now().naive_local())
        .with_context(|| format!("Could not open assistant state in {}", data_dir.display()))?;

    if args.new_chat {
        state
            .reset_history()
            .context("Could not clear the chat history")?;
        log_info(&format!(
            "Started a new conversation ({} cleared)",
            state.history_path().display()
        ));
    }

    let dispatcher = Dispatcher::new(
        build_model(&config),
        config.system_prompt(),
        config.max_history_turns(),
    );
    let typing = !args.no_typing && config.typing_effect.unwrap_or(true);

    ctrlc::set_handler(|| {
        print_farewell();
        std::process::exit(0);
    })
    .context("Failed to install the Ctrl-C handler")?;

    print_banner();
    if let Err(e) = app::run_interactive_chat(&dispatcher, &mut state, typing).await {
        log_error(&format!("{:#}", e));
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_precedence() {
        let mut config = AssistantConfig::builtin();
        config.data_dir = Some(PathBuf::from("/from/config"));

        let args = Args::try_parse_from(["office-assistant", "--data-dir", "/from/args"]).unwrap();
        assert_eq!(data_dir(&args, &config), PathBuf::from("/from/args"));

        let args = Args::try_parse_from(["office-assistant"]).unwrap();
        if args.data_dir.is_none() {
            assert_eq!(data_dir(&args, &config), PathBuf::from("/from/config"));
        }
    }

    #[test]
    fn test_explicit_config_path() {
        let args = Args::try_parse_from(["office-assistant", "--config", "/tmp/a.toml"]).unwrap();
        assert_eq!(config_file_path(&args), PathBuf::from("/tmp/a.toml"));
    }
}
