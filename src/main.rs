mod config;
mod error;
mod llm;
mod logging;
mod prompts;
mod session;
mod tui;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use prompts::{PromptSource, SystemPrompt};
use session::{Role, SubmitOutcome};
use ui::chat::ChatWidget;
use ui::theme::Theme;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version = "0.1.0")]
#[command(about = "Ask questions about a portfolio owner from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat panel (default)
    Chat {
        /// Override the configured color theme
        #[arg(long)]
        theme: Option<Theme>,
    },
    /// Send a single question and print the reply
    Ask {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Report missing or invalid settings
    Check,
    /// Print the system prompt sent ahead of every question
    Prompt,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    logging::init(&config.folio_home)?;

    match cli.command.unwrap_or(Commands::Chat { theme: None }) {
        Commands::Chat { theme } => {
            if let Some(theme) = theme {
                config.ui.theme = theme;
            }
            let widget = ChatWidget::from_config(&config)?;
            tui::run(widget).await
        }
        Commands::Ask { message } => ask(&config, &message.join(" ")).await,
        Commands::Check => {
            check(&config);
            Ok(())
        }
        Commands::Prompt => {
            let prompt = SystemPrompt::load(&config.prompt)?;
            if let PromptSource::File(path) = prompt.source() {
                eprintln!("📄 {}", path.display());
            } else {
                eprintln!("📄 bundled profile");
            }
            println!("{}", prompt.text());
            Ok(())
        }
    }
}

async fn ask(config: &Config, message: &str) -> Result<()> {
    let mut widget = ChatWidget::from_config(config)?;

    if let SubmitOutcome::Ignored(reason) = widget.submit(message) {
        anyhow::bail!("Nothing to send ({reason:?})");
    }
    widget.wait_for_reply().await;

    let session = widget.session();
    match session.messages().last() {
        Some(reply) if reply.role == Role::Assistant => {
            println!("{}", reply.content);
            Ok(())
        }
        _ => {
            let notice = session
                .notices()
                .first()
                .map(|n| n.message().to_string())
                .unwrap_or_else(|| error::GENERIC_FAILURE.to_string());
            anyhow::bail!(notice)
        }
    }
}

fn check(config: &Config) {
    let report = config.setup_report();

    println!("📁 Config: {}", config.folio_home.join("config.toml").display());
    println!("🌐 Endpoint: {}", config.endpoint.url);
    println!(
        "🔑 Credential: {}",
        if config.endpoint.proxy {
            "held by proxy"
        } else if config.api_key().is_some() {
            "configured"
        } else {
            "missing"
        }
    );
    println!("🎨 Theme: {}", config.ui.theme);

    if report.is_ready() {
        println!("\n✅ Ready to chat.");
        return;
    }

    println!();
    for issue in &report.issues {
        let marker = if issue.is_fatal() { "❌" } else { "⚠️" };
        println!("{marker} {issue}");
    }
}
