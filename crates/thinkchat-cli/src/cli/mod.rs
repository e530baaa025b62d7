//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use thinkchat_core::config::Config;
use thinkchat_core::store::Store;

mod commands;

#[derive(Parser)]
#[command(name = "thinkchat")]
#[command(version)]
#[command(about = "Terminal AI chat client with streamed responses")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Send a single prompt and stream the reply to stdout
    Exec {
        /// The prompt to send
        #[arg(short, long)]
        prompt: String,

        /// Turn mode (chat, image, summarize)
        #[arg(short, long, default_value = "chat")]
        mode: String,

        /// Attach a file (repeatable, max 5)
        #[arg(long = "attach", value_name = "PATH")]
        attachments: Vec<String>,

        /// Override the model from config
        #[arg(long)]
        model: Option<String>,
    },

    /// Generate an image from a prompt and write it to disk
    Imagine {
        /// The image prompt
        #[arg(short, long)]
        prompt: String,

        /// Output path (defaults to thinkchat-<timestamp>.png)
        #[arg(short, long)]
        out: Option<String>,

        /// Override the image model from config
        #[arg(long)]
        model: Option<String>,
    },

    /// Sign in and receive a one-time code
    Login {
        /// Sign in with an email address
        #[arg(long, value_name = "EMAIL", conflicts_with = "google")]
        email: Option<String>,

        /// Sign in with the mock Google provider
        #[arg(long)]
        google: bool,
    },

    /// Verify the one-time code from login
    Verify {
        /// The 6-digit code
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Request a fresh one-time code
    Resend,

    /// Sign out and clear local auth state
    Logout,

    /// Show the signed-in identity
    Whoami,

    /// Manage response personalization
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Manage memory notes
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum SettingsCommands {
    /// Show current tone, length, and detected profession
    Show,
    /// Set a personalization value
    Set {
        /// Setting to change: tone or length
        #[arg(value_name = "KEY")]
        key: String,
        /// New value (tone: professional, casual, creative; length:
        /// concise, detailed)
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

#[derive(clap::Subcommand)]
enum MemoryCommands {
    /// List saved memory notes
    List,
    /// Save a new memory note
    Add {
        /// The note content
        #[arg(value_name = "NOTE")]
        note: String,
    },
    /// Remove a note by ID
    Remove {
        /// The ID shown by `memory list`
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Remove all notes and reset settings to defaults
    Clear,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Persist the default chat model
    SetModel {
        /// Model name (e.g. gemini-2.5-flash)
        #[arg(value_name = "MODEL")]
        model: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = crate::logging::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;
    let store = Store::open();

    // default to interactive chat
    let Some(command) = cli.command else {
        return commands::chat::run(&config, &store).await;
    };

    match command {
        Commands::Exec {
            prompt,
            mode,
            attachments,
            model,
        } => {
            let config = override_model(config, model.as_deref());
            commands::exec::run(commands::exec::ExecRunOptions {
                prompt: &prompt,
                mode: &mode,
                attachment_paths: &attachments,
                config: &config,
                store: &store,
            })
            .await
        }

        Commands::Imagine { prompt, out, model } => {
            commands::imagine::run(commands::imagine::ImagineRunOptions {
                prompt: &prompt,
                out: out.as_deref(),
                model_override: model.as_deref(),
                config: &config,
                store: &store,
            })
            .await
        }

        Commands::Login { email, google } => match (email, google) {
            (Some(email), false) => commands::auth::login_email(&store, &email),
            (None, true) => commands::auth::login_google(&store),
            _ => anyhow::bail!("Please specify a method: --email <EMAIL> or --google"),
        },
        Commands::Verify { code } => commands::auth::verify(&store, &code),
        Commands::Resend => commands::auth::resend(&store),
        Commands::Logout => commands::auth::logout(&store),
        Commands::Whoami => commands::auth::whoami(&store),

        Commands::Settings { command } => match command {
            SettingsCommands::Show => commands::settings::show(&store),
            SettingsCommands::Set { key, value } => commands::settings::set(&store, &key, &value),
        },

        Commands::Memory { command } => match command {
            MemoryCommands::List => commands::memory::list(&store),
            MemoryCommands::Add { note } => commands::memory::add(&store, &note),
            MemoryCommands::Remove { id } => commands::memory::remove(&store, &id),
            MemoryCommands::Clear => commands::memory::clear(&store),
        },

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetModel { model } => commands::config::set_model(&model),
        },
    }
}

fn override_model(mut config: Config, model: Option<&str>) -> Config {
    if let Some(model) = model {
        config.model = model.to_string();
    }
    config
}
