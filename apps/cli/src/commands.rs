//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vidpack_core::{ConversationEvent, Session};
use vidpack_shared::{AppConfig, Role, init_config, load_config};
use vidpack_speech::{SpeechClient, default_model};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// VidPack: turn a blog post into a short-form video package.
#[derive(Parser)]
#[command(
    name = "vidpack",
    version,
    about = "Turn blog post URLs into video scripts, image prompts and hashtags.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Chat-completion backend base URL (overrides config).
    #[arg(long, global = true, env = "VIDPACK_CHAT_ENDPOINT")]
    pub chat_endpoint: Option<String>,

    /// Voice backend base URL (overrides config).
    #[arg(long, global = true, env = "VIDPACK_SPEECH_ENDPOINT")]
    pub speech_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a video package from a blog post URL.
    Generate {
        /// Blog post URL.
        url: String,
    },

    /// List the voice models offered by the voice backend.
    Voices,

    /// Synthesize narration audio for a piece of text.
    Speak {
        /// Text to read aloud.
        text: String,

        /// Voice model id (defaults to the first listed model).
        #[arg(short, long)]
        model: Option<String>,

        /// Where to write the audio (defaults to the backend's file name).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// reserved for generated output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "vidpack=info",
        1 => "vidpack=debug",
        _ => "vidpack=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Endpoint overrides collected from global flags.
struct Overrides {
    chat: Option<String>,
    speech: Option<String>,
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        chat: cli.chat_endpoint,
        speech: cli.speech_endpoint,
    };

    match cli.command {
        Command::Generate { url } => cmd_generate(&overrides, &url).await,
        Command::Voices => cmd_voices(&overrides).await,
        Command::Speak { text, model, out } => {
            cmd_speak(&overrides, &text, model.as_deref(), out).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&overrides).await,
        },
    }
}

/// Load config and apply endpoint overrides to a fresh session.
fn open_session(overrides: &Overrides) -> Result<Session> {
    let config = load_config()?;
    let mut session = Session::new(&config)?;
    apply_overrides(&mut session, overrides)?;
    Ok(session)
}

fn apply_overrides(session: &mut Session, overrides: &Overrides) -> Result<()> {
    if let Some(chat) = &overrides.chat {
        session.set_chat_endpoint(chat)?;
    }
    if let Some(speech) = &overrides.speech {
        session.set_speech_endpoint(speech)?;
    }
    Ok(())
}

fn speech_client(overrides: &Overrides) -> Result<SpeechClient> {
    let session = open_session(overrides)?;
    Ok(SpeechClient::new(session.endpoints().speech.clone())?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(overrides: &Overrides, url: &str) -> Result<()> {
    let spinner = spinner()?;
    let output = spinner.clone();
    let mut printed = 0usize;

    let mut session = open_session(overrides)?.with_listener(move |event| match event {
        ConversationEvent::Phase(name) => output.set_message(name.to_string()),
        ConversationEvent::Updated(message) if message.role == Role::Assistant && !message.error => {
            if printed == 0 {
                output.finish_and_clear();
            }
            if let Some(delta) = message.content.get(printed..) {
                print!("{delta}");
                let _ = std::io::stdout().flush();
                printed = message.content.len();
            }
        }
        _ => {}
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    info!(url, chat = %session.endpoints().chat, "generating video package");

    let result = session.generate(url, &cancel).await;
    spinner.finish_and_clear();

    match result {
        Ok(text) => {
            if !text.is_empty() {
                println!();
            }
            Ok(())
        }
        Err(e) => {
            if e.partial_text().is_some_and(|partial| !partial.is_empty()) {
                println!();
            }
            Err(e.into())
        }
    }
}

async fn cmd_voices(overrides: &Overrides) -> Result<()> {
    let client = speech_client(overrides)?;
    let models = client.list_models().await?;

    if models.is_empty() {
        println!("No voice models available at {}", client.endpoint());
        return Ok(());
    }

    let fallback = default_model(&models);
    for model in &models {
        let marker = if Some(model.id.as_str()) == fallback { "*" } else { " " };
        println!(
            "{marker} {:<44} {:<8} {}-{:<4} {}",
            model.id, model.gender, model.language, model.country, model.quality
        );
    }

    Ok(())
}

async fn cmd_speak(
    overrides: &Overrides,
    text: &str,
    model: Option<&str>,
    out: Option<PathBuf>,
) -> Result<()> {
    let client = speech_client(overrides)?;

    let model_id = match model {
        Some(id) => client.get_model(id).await?.id,
        None => {
            let models = client.list_models().await?;
            default_model(&models)
                .map(String::from)
                .ok_or_else(|| eyre!("no voice models available at {}", client.endpoint()))?
        }
    };

    info!(model = %model_id, chars = text.chars().count(), "synthesizing speech");

    let speech = client.speak(text, &model_id).await?;

    let path = match out {
        Some(path) => path,
        None => PathBuf::from(
            speech
                .output_file
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(&speech.output_file),
        ),
    };

    tokio::fs::write(&path, &speech.audio)
        .await
        .map_err(|e| eyre!("failed to write {}: {e}", path.display()))?;

    println!("Audio saved to: {} ({} bytes)", path.display(), speech.audio.len());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(overrides: &Overrides) -> Result<()> {
    let mut config: AppConfig = load_config()?;
    if let Some(chat) = &overrides.chat {
        config.endpoints.chat = chat.clone();
    }
    if let Some(speech) = &overrides.speech {
        config.endpoints.speech = speech.clone();
    }
    config.validate()?;

    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress display
// ---------------------------------------------------------------------------

/// Phase spinner on stderr.
fn spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(spinner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_overrides() {
        let cli = Cli::try_parse_from([
            "vidpack",
            "--chat-endpoint",
            "http://10.0.0.2:10000",
            "generate",
            "https://blog.example.com/post",
        ])
        .unwrap();

        assert_eq!(cli.chat_endpoint.as_deref(), Some("http://10.0.0.2:10000"));
        assert!(matches!(cli.command, Command::Generate { url } if url == "https://blog.example.com/post"));
    }

    #[test]
    fn parses_speak_options() {
        let cli = Cli::try_parse_from([
            "vidpack", "speak", "--model", "amy", "--out", "hook.wav", "Hello there",
        ])
        .unwrap();

        match cli.command {
            Command::Speak { text, model, out } => {
                assert_eq!(text, "Hello there");
                assert_eq!(model.as_deref(), Some("amy"));
                assert_eq!(out, Some(PathBuf::from("hook.wav")));
            }
            _ => panic!("expected speak"),
        }
    }

    #[test]
    fn generate_requires_url() {
        assert!(Cli::try_parse_from(["vidpack", "generate"]).is_err());
    }
}
