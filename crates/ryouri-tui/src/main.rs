use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use ryouri_core::config::API_KEY_ENV;
use ryouri_core::{ChatProvider, ClaudeClient, Config, Sent, Session};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "ryouri", version)]
#[command(about = "Terminal cooking assistant backed by Claude")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Claude model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Cap on reply length in tokens
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Messages API endpoint
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the assistant's reply
    Ask {
        /// Your question
        question: String,
    },
}

impl Cli {
    /// Flags take precedence over the config file for this run only
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = Some(max_tokens);
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = Some(api_url.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Ask { question }) => {
            logging::init_stderr(cli.verbose);
            let config = load_config(&cli, &Config::get_config_path()?);
            ask(&config, question).await
        }
        None => {
            let log_path = logging::init_file(cli.verbose)?;
            tracing::info!(path = %log_path.display(), version = env!("CARGO_PKG_VERSION"), "starting ryouri");
            let config_path = Config::get_config_path()?;
            let config = load_config(&cli, &config_path);
            run_tui(config, config_path).await
        }
    }
}

fn load_config(cli: &Cli, path: &Path) -> Config {
    let mut config = Config::load_from(path).unwrap_or_else(|err| {
        tracing::warn!(error = %err, path = %path.display(), "config unreadable, using defaults");
        Config::new()
    });
    cli.apply_overrides(&mut config);

    if config.key_source().is_none() {
        tracing::warn!("no API key configured; set {API_KEY_ENV} or press K in the app");
    }
    tracing::debug!(model = config.model(), max_tokens = config.max_tokens(), url = config.api_url(), "config loaded");

    config
}

async fn ask(config: &Config, question: &str) -> Result<()> {
    let client = ClaudeClient::from_config(config);
    let mut session = Session::new();

    let outcome = session.send(&client, question).await;
    let reply = session
        .turns()
        .last()
        .map(|turn| turn.content.clone())
        .unwrap_or_default();

    match outcome {
        Ok(Sent::Ignored) => bail!("question is empty"),
        Ok(Sent::Replied) => {
            println!("{reply}");
            Ok(())
        }
        Err(err) => {
            println!("{reply}");
            Err(err).context("could not get a reply from Claude")
        }
    }
}

async fn run_tui(config: Config, config_path: PathBuf) -> Result<()> {
    let provider: Arc<dyn ChatProvider> = Arc::new(ClaudeClient::from_config(&config));
    let mut app = App::new(config, provider, config_path);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;

    if app.send_task.is_some() {
        tracing::info!("exiting with a reply still pending");
    }
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
    }
    Ok(())
}
