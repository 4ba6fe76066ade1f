//! saym：多厂商文本转语音命令行工具
//!
//! Usage:
//!   saym "Hello there" [-v VOICE] [-o OUT] [-p PROVIDER] [-s]   Speak or save text
//!   saym voices [-a]                                          List owned (or all) voices
//!   saym voice create <NAME> <FILES..>                        Clone a voice
//!   saym config show|get|set|provider|voice|reset             Manage ~/.saymrc
//!   saym providers | use [P] | default-voice <ID> | check     Provider shortcuts

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use saym::catalog::{owned_voices, resolve_voice};
use saym::{
    audio, registry, ConfigManager, Error, ProviderType, SynthesisOptions, TtsProvider, Voice,
    VoiceSample,
};

const RULE_WIDTH: usize = 80;

/// Say, improved: text-to-speech over ElevenLabs, Cartesia, XTTS, CoeFont and Resemble
#[derive(Parser)]
#[command(name = "saym", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    speak: SpeakArgs,

    /// Provider to use (defaults to the configured one)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Log requests and provider decisions to stderr
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug, Default)]
struct SpeakArgs {
    /// Text to speak
    text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Voice id or name
    #[arg(short, long)]
    voice: Option<String>,

    /// Save audio here instead of playing it
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Audio format (mp3, wav, raw, or a vendor format id)
    #[arg(long)]
    format: Option<String>,

    /// Stream synthesis instead of waiting for the full buffer
    #[arg(short, long)]
    stream: bool,

    /// Vendor model id
    #[arg(long)]
    model: Option<String>,

    /// Language code, e.g. en or ja
    #[arg(long)]
    language: Option<String>,

    /// Voice stability (0.0-1.0)
    #[arg(long, value_parser = unit_interval)]
    stability: Option<f32>,

    /// Similarity boost (0.0-1.0)
    #[arg(long, value_parser = unit_interval)]
    similarity: Option<f32>,

    /// Style exaggeration (0.0-1.0)
    #[arg(long, value_parser = unit_interval)]
    style: Option<f32>,

    /// Speaker boost on or off
    #[arg(long, value_name = "BOOL")]
    speaker_boost: Option<bool>,
}

#[derive(Subcommand)]
enum Command {
    /// List voices for a provider (owned voices unless --all)
    Voices(ListArgs),
    /// Voice management
    #[command(subcommand)]
    Voice(VoiceCommand),
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List supported providers
    Providers,
    /// Switch provider, or show the current one
    Use {
        #[arg(value_name = "PROVIDER")]
        name: Option<String>,
    },
    /// Set the default voice for the current (or given) provider
    DefaultVoice { voice_id: String },
    /// Check that a provider is reachable with the configured credentials
    Check,
}

#[derive(Args)]
struct ListArgs {
    /// Include public/premade voices
    #[arg(short, long)]
    all: bool,
}

#[derive(Subcommand)]
enum VoiceCommand {
    /// List voices
    List(ListArgs),
    /// Clone a voice from audio samples
    Create {
        name: String,
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a cloned voice
    Delete { voice_id: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the whole configuration
    Show,
    /// Print one value
    Get { key: String },
    /// Set a value (`<provider>DefaultVoice` keys set a provider's default voice)
    Set { key: String, value: String },
    /// Set the default provider
    Provider {
        #[arg(value_name = "PROVIDER")]
        name: String,
    },
    /// Set the default voice for the current (or given) provider
    Voice { voice_id: String },
    /// Set the default voice for a specific provider
    SetDefaultVoice {
        #[arg(value_name = "PROVIDER")]
        name: String,
        voice_id: String,
    },
    /// Reset to defaults and delete the file
    Reset,
}

fn unit_interval(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} is outside 0.0-1.0", value))
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("saym=debug")
    } else {
        EnvFilter::try_from_env("SAYM_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ConfigManager::load_default()?;
    let requested = cli.provider.as_deref();
    match cli.command {
        None => speak(&config, requested, cli.speak).await,
        Some(Command::Voices(args)) => list_voices(&config, requested, args).await,
        Some(Command::Voice(cmd)) => voice_command(&config, requested, cmd).await,
        Some(Command::Config(cmd)) => config_command(&mut config, requested, cmd),
        Some(Command::Providers) => {
            let current = config.config().tts_provider.clone();
            println!("Supported TTS providers:");
            for kind in ProviderType::ALL {
                let marker = if kind.as_str() == current { " (current)" } else { "" };
                println!("  - {} ({}){}", kind, kind.display_name(), marker);
            }
            Ok(())
        }
        Some(Command::Use { name }) => use_provider(&mut config, name.as_deref().or(requested)),
        Some(Command::DefaultVoice { voice_id }) => {
            let kind = provider_or_active(&config, requested)?;
            config.set_provider_default_voice(kind, &voice_id)?;
            println!("Default voice for {} set to: {}", kind, voice_id);
            Ok(())
        }
        Some(Command::Check) => {
            let kind = provider_or_active(&config, requested)?;
            let provider = open_provider(&config, kind).await?;
            if provider.validate_connection().await {
                println!("{} is reachable", kind);
                Ok(())
            } else {
                bail!("Could not connect to {}", kind)
            }
        }
    }
}

fn provider_or_active(config: &ConfigManager, requested: Option<&str>) -> anyhow::Result<ProviderType> {
    Ok(match requested {
        Some(name) => name.parse()?,
        None => config.active_provider()?,
    })
}

async fn open_provider(config: &ConfigManager, kind: ProviderType) -> anyhow::Result<Arc<dyn TtsProvider>> {
    registry::global()
        .create_provider(kind.as_str(), config.provider_config(kind))
        .await
        .map_err(|e| match e {
            Error::Configuration { .. } => anyhow::Error::new(e).context(format!(
                "Credentials for {} are missing. Set {} or store them in {}",
                kind,
                kind.env_key(),
                config.path().display()
            )),
            other => other.into(),
        })
}

async fn speak(config: &ConfigManager, requested: Option<&str>, args: SpeakArgs) -> anyhow::Result<()> {
    let text = match (&args.file, &args.text) {
        (Some(path), _) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(text)) => text.clone(),
        (None, None) => bail!("No text provided. Use a text argument or -f <FILE>."),
    };
    if text.trim().is_empty() {
        bail!("Text is empty");
    }

    let kind = provider_or_active(config, requested)?;
    let provider = open_provider(config, kind).await?;

    let requested = args.voice.clone().or_else(|| config.default_voice(kind));
    let Some(requested) = requested else {
        let voices = provider.list_voices().await?;
        if voices.is_empty() {
            bail!("No voice specified and no voices available.");
        }
        let listing: Vec<String> = voices
            .iter()
            .map(|v| format!("  - {}: {}", v.id, v.name))
            .collect();
        bail!(
            "No voice specified. Available voices for {}:\n{}\n\nUse --voice or set a default voice with `saym default-voice <ID>`.",
            kind,
            listing.join("\n")
        );
    };
    let voice_id = resolve_voice(provider.as_ref(), &requested).await?;

    let format = args
        .format
        .clone()
        .unwrap_or_else(|| config.config().output_format.clone());
    let mut settings = config.voice_settings();
    if let Some(v) = args.stability {
        settings = settings.with_stability(v);
    }
    if let Some(v) = args.similarity {
        settings = settings.with_similarity(v);
    }
    if let Some(v) = args.style {
        settings = settings.with_style(v);
    }
    if let Some(v) = args.speaker_boost {
        settings = settings.with_speaker_boost(v);
    }
    let mut options = SynthesisOptions::new()
        .with_output_format(format.clone())
        .with_voice_settings(settings);
    options.model_id = args.model.clone();
    options.language = args.language.clone();

    let delivered = audio::delivered_format(kind, Some(&format), args.stream);
    let output = args.output.as_deref().map(|p| audio::with_extension(p, &delivered));
    eprintln!("Speaking with {} voice: {}", kind, voice_id);

    if args.stream {
        let stream = provider.text_to_speech_stream(&text, &voice_id, &options).await?;
        match &output {
            Some(path) => {
                audio::save_stream(path, stream).await?;
                println!("Audio saved to: {}", path.display());
            }
            None => audio::play_stream(stream, &delivered).await?,
        }
    } else {
        let bytes = provider.text_to_speech(&text, &voice_id, &options).await?;
        match &output {
            Some(path) => {
                audio::save_bytes(path, &bytes).await?;
                println!("Audio saved to: {}", path.display());
            }
            None => audio::play_bytes(&bytes, &delivered).await?,
        }
    }
    Ok(())
}

fn print_rule() {
    println!("{}", "─".repeat(RULE_WIDTH));
}

fn print_voice(voice: &Voice) {
    println!("ID: {}", voice.id);
    println!("Name: {}", voice.name);
    if let Some(desc) = voice.description.as_deref().filter(|d| !d.is_empty()) {
        println!("Description: {}", desc);
    }
    if !voice.languages.is_empty() {
        println!("Languages: {}", voice.languages.join(", "));
    }
    if !voice.labels.is_empty() {
        println!(
            "Labels: {}",
            serde_json::to_string(&voice.labels).unwrap_or_default()
        );
    }
    print_rule();
}

async fn list_voices(config: &ConfigManager, requested: Option<&str>, args: ListArgs) -> anyhow::Result<()> {
    let kind = provider_or_active(config, requested)?;
    let provider = open_provider(config, kind).await?;

    println!("Current provider: {}", kind);
    match config.default_voice(kind) {
        Some(voice) => println!("Default voice: {}", voice),
        None => println!("No default voice set"),
    }
    println!();

    let all = provider.list_voices().await?;
    let voices = if args.all { all } else { owned_voices(kind, all) };

    let scope = if args.all { "all" } else { "owned only" };
    println!("Available voices for {} ({}):", kind, scope);
    if !args.all {
        println!("Use --all or -a to show all public voices");
    }
    print_rule();
    if voices.is_empty() {
        println!("No voices found.");
        if !args.all {
            println!("Try using --all to see public voices.");
        }
    }
    for voice in &voices {
        print_voice(voice);
    }
    Ok(())
}

async fn voice_command(config: &ConfigManager, requested: Option<&str>, cmd: VoiceCommand) -> anyhow::Result<()> {
    match cmd {
        VoiceCommand::List(args) => list_voices(config, requested, args).await,
        VoiceCommand::Create {
            name,
            files,
            description,
        } => {
            let kind = provider_or_active(config, requested)?;
            let provider = open_provider(config, kind).await?;
            if !provider.supports_voice_cloning() {
                return Err(Error::unsupported(kind.as_str(), "voice cloning").into());
            }
            let mut samples = Vec::with_capacity(files.len());
            for path in &files {
                samples.push(VoiceSample::from_path(path).await?);
            }
            let id = provider
                .create_voice(&name, &samples, description.as_deref())
                .await?;
            println!("Voice created: {} ({})", name, id);
            Ok(())
        }
        VoiceCommand::Delete { voice_id } => {
            let kind = provider_or_active(config, requested)?;
            let provider = open_provider(config, kind).await?;
            if !provider.supports_voice_cloning() {
                return Err(Error::unsupported(kind.as_str(), "voice deletion").into());
            }
            provider.delete_voice(&voice_id).await?;
            println!("Voice deleted: {}", voice_id);
            Ok(())
        }
    }
}

fn config_command(config: &mut ConfigManager, requested: Option<&str>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("Current configuration ({}):", config.path().display());
            println!("{}", serde_json::to_string_pretty(&config.all())?);
        }
        ConfigCommand::Get { key } => match config.get(&key) {
            Some(serde_json::Value::String(s)) => println!("{}", s),
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => bail!("Configuration key not set: {}", key),
        },
        ConfigCommand::Set { key, value } => {
            config.set(&key, &value)?;
            println!("Configuration updated: {} = {}", key, value);
        }
        ConfigCommand::Provider { name } => {
            let kind: ProviderType = name.parse()?;
            config.set_active_provider(kind)?;
            println!("Default provider set to: {}", kind);
        }
        ConfigCommand::Voice { voice_id } => {
            let kind = provider_or_active(config, requested)?;
            config.set_provider_default_voice(kind, &voice_id)?;
            println!("Default voice for {} set to: {}", kind, voice_id);
        }
        ConfigCommand::SetDefaultVoice { name, voice_id } => {
            let kind: ProviderType = name.parse()?;
            config.set_provider_default_voice(kind, &voice_id)?;
            println!("Default voice for {} set to: {}", kind, voice_id);
        }
        ConfigCommand::Reset => {
            config.reset()?;
            println!("Configuration reset to defaults.");
        }
    }
    Ok(())
}

fn use_provider(config: &mut ConfigManager, provider: Option<&str>) -> anyhow::Result<()> {
    let kind = match provider {
        Some(name) => {
            let kind: ProviderType = name.parse()?;
            config.set_active_provider(kind)?;
            println!("Now using {} as default provider", kind);
            kind
        }
        None => {
            let kind = config.active_provider()?;
            println!("Current provider: {}", kind);
            kind
        }
    };
    match config.default_voice(kind) {
        Some(voice) => println!("Default voice for {}: {}", kind, voice),
        None => println!(
            "No default voice set for {}. Use 'saym default-voice <voice-id>' to set one.",
            kind
        ),
    }
    Ok(())
}
