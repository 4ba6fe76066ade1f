//! Local audio sink: play through whatever player the host has, or write to a file.

use std::io;
use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use crate::providers::{CartesiaProvider, ElevenLabsProvider, ResembleProvider};
use crate::registry::ProviderType;
use crate::types::AudioStream;
use crate::{Error, Result};

const DEFAULT_PCM_RATE: u32 = 44_100;

#[cfg(target_os = "macos")]
const WAV_PLAYERS: &[&str] = &["afplay"];
#[cfg(target_os = "linux")]
const WAV_PLAYERS: &[&str] = &["paplay", "aplay", "play", "mpv", "ffplay"];
#[cfg(target_os = "windows")]
const WAV_PLAYERS: &[&str] = &["powershell"];
#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const WAV_PLAYERS: &[&str] = &["ffplay", "play"];

#[cfg(target_os = "macos")]
const MP3_PLAYERS: &[&str] = &["afplay"];
#[cfg(not(target_os = "macos"))]
const MP3_PLAYERS: &[&str] = &["mpv", "ffplay", "play"];

// Headerless PCM needs a player that accepts explicit sample parameters.
const RAW_PLAYERS: &[&str] = &["ffplay"];

/// Container family of a vendor format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Mp3,
    Wav,
    /// Signed 16-bit little-endian mono PCM at the given rate.
    Pcm(u32),
}

impl AudioKind {
    /// `mp3_44100_128` → Mp3, `pcm_22050` → Pcm(22050), `raw` → Pcm(44100).
    /// Anything unrecognized is treated as mp3.
    pub fn from_format(format: &str) -> Self {
        let format = format.to_lowercase();
        if format.starts_with("wav") {
            AudioKind::Wav
        } else if format == "raw" {
            AudioKind::Pcm(DEFAULT_PCM_RATE)
        } else if let Some(rate) = format.strip_prefix("pcm") {
            let rate = rate
                .trim_start_matches('_')
                .parse()
                .unwrap_or(DEFAULT_PCM_RATE);
            AudioKind::Pcm(rate)
        } else {
            AudioKind::Mp3
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioKind::Mp3 => "mp3",
            AudioKind::Wav => "wav",
            AudioKind::Pcm(_) => "pcm",
        }
    }

    fn players(&self) -> &'static [&'static str] {
        match self {
            AudioKind::Mp3 => MP3_PLAYERS,
            AudioKind::Wav => WAV_PLAYERS,
            AudioKind::Pcm(_) => RAW_PLAYERS,
        }
    }
}

/// First installed player for `kind`.
pub fn find_player(kind: AudioKind) -> Option<&'static str> {
    kind.players()
        .iter()
        .copied()
        .find(|p| which::which(p).is_ok())
}

fn player_args(player: &str, kind: AudioKind, path: &Path) -> Vec<String> {
    let path = path.to_string_lossy().to_string();
    match player {
        "powershell" => vec![
            "-NoProfile".into(),
            "-NonInteractive".into(),
            "-Command".into(),
            format!(
                "(New-Object Media.SoundPlayer '{}').PlaySync()",
                path.replace('\'', "''")
            ),
        ],
        "ffplay" => {
            let mut args: Vec<String> = vec![
                "-nodisp".into(),
                "-autoexit".into(),
                "-loglevel".into(),
                "quiet".into(),
            ];
            if let AudioKind::Pcm(rate) = kind {
                args.extend(["-f".into(), "s16le".into(), "-ar".into(), rate.to_string()]);
                args.extend(["-ac".into(), "1".into()]);
            }
            args.push(path);
            args
        }
        "mpv" => vec!["--no-video".into(), "--really-quiet".into(), path],
        _ => vec![path],
    }
}

async fn play_file(path: &Path, kind: AudioKind) -> Result<()> {
    let player = find_player(kind).ok_or_else(|| {
        Error::playback(format!(
            "No audio player found for {} (tried: {})",
            kind.extension(),
            kind.players().join(", ")
        ))
    })?;
    tracing::debug!(player, path = %path.display(), ?kind, "playing audio");

    let output = tokio::process::Command::new(player)
        .args(player_args(player, kind, path))
        .output()
        .await
        .map_err(|e| Error::playback(format!("Failed to start {}: {}", player, e)))?;
    if !output.status.success() {
        return Err(Error::playback(format!(
            "{} exited with {}: {}",
            player,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn temp_audio_file(kind: AudioKind) -> Result<NamedTempFile> {
    Ok(NamedTempFile::with_suffix(format!(".{}", kind.extension()))?)
}

/// Play a finished buffer. Blocks until the player exits.
pub async fn play_bytes(audio: &[u8], format: &str) -> Result<()> {
    let kind = AudioKind::from_format(format);
    let temp = temp_audio_file(kind)?;
    tokio::fs::write(temp.path(), audio).await?;
    play_file(temp.path(), kind).await
}

/// Drain a stream into a temp file, then play it.
pub async fn play_stream(stream: AudioStream, format: &str) -> Result<()> {
    let kind = AudioKind::from_format(format);
    let temp = temp_audio_file(kind)?;
    save_stream(temp.path(), stream).await?;
    play_file(temp.path(), kind).await
}

pub async fn save_bytes(path: impl AsRef<Path>, audio: &[u8]) -> Result<()> {
    tokio::fs::write(path.as_ref(), audio).await?;
    Ok(())
}

/// Copy every chunk to `path` in arrival order. A stream error aborts the
/// copy and is returned as-is.
pub async fn save_stream(path: impl AsRef<Path>, stream: AudioStream) -> Result<u64> {
    let mut reader = StreamReader::new(stream.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
    let mut file = tokio::fs::File::create(path.as_ref()).await?;
    let written = match tokio::io::copy(&mut reader, &mut file).await {
        Ok(n) => n,
        Err(e) => return Err(unwrap_stream_error(e)),
    };
    file.flush().await?;
    Ok(written)
}

fn unwrap_stream_error(e: io::Error) -> Error {
    if e.get_ref().map(|inner| inner.is::<Error>()).unwrap_or(false) {
        if let Some(inner) = e.into_inner() {
            if let Ok(err) = inner.downcast::<Error>() {
                return *err;
            }
        }
        return Error::playback("stream failed");
    }
    Error::Io(e)
}

/// Format tag describing what a provider actually returns for `requested`,
/// so the sink picks a matching player and extension.
pub fn delivered_format(provider: ProviderType, requested: Option<&str>, streaming: bool) -> String {
    match provider {
        ProviderType::ElevenLabs => ElevenLabsProvider::output_format(requested).to_string(),
        ProviderType::Cartesia if streaming => "raw".to_string(),
        ProviderType::Cartesia => {
            let container = CartesiaProvider::output_format(requested);
            container["container"].as_str().unwrap_or("wav").to_string()
        }
        ProviderType::Resemble => ResembleProvider::output_format(requested).to_string(),
        ProviderType::Xtts | ProviderType::CoeFont => "wav".to_string(),
    }
}

/// Default file name for `saym -o` without an extension.
pub fn with_extension(path: &Path, format: &str) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(AudioKind::from_format(format).extension())
    }
}
