use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use sound_recorder::{
    stitch, AudioFile, Catalogue, Config, FocusArbiter, JsonCatalogue, LocalFocus, MonotonicClock,
    Notification, PlaybackController, PlaybackEvent, Player, RecordingMachine, SessionService,
    SyntheticSource, WavSegmentEncoder,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sound-recorder")]
#[command(about = "Pausable audio recorder that stitches segments into one file")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/sound-recorder")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Record interactively; type start, pause, stop or quit
    Record {
        /// Use the high-quality preset
        #[arg(long)]
        high_quality: bool,
    },
    /// Concatenate WAV segments in the given order
    Stitch {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        segments: Vec<PathBuf>,
    },
    /// Print container details of an audio file
    Inspect { path: PathBuf },
    /// List catalogued recordings
    List,
    /// Play a recording for its full length
    Play { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut cfg = Config::load(&args.config)?;

    match args.command {
        Cmd::Record { high_quality } => {
            cfg.recorder.high_quality |= high_quality;
            record(&cfg).await
        }
        Cmd::Stitch { output, segments } => {
            let report = stitch(segments.as_slice(), &output)?;
            info!(
                "Wrote {} ({} segments, {} skipped, {:.2}s)",
                report.output_path.display(),
                report.segments_used,
                report.skipped.len(),
                report.media_duration().as_secs_f64()
            );
            Ok(())
        }
        Cmd::Inspect { path } => {
            let audio = AudioFile::open(&path)?;
            println!("File:        {}", audio.path.display());
            println!("Codec:       {}", audio.codec);
            println!("Duration:    {:.2} seconds", audio.duration_seconds);
            println!("Sample rate: {} Hz", audio.sample_rate);
            println!("Channels:    {}", audio.channels);
            println!("Frames:      {}", audio.frames);
            Ok(())
        }
        Cmd::List => {
            let catalogue = JsonCatalogue::new(cfg.catalogue_path());
            let entries = catalogue.entries().await?;
            if entries.is_empty() {
                println!("No recordings yet");
            }
            for entry in entries {
                println!(
                    "{}  {:>8.1}s  {}  {}",
                    entry.added_at.format("%Y-%m-%d %H:%M"),
                    entry.duration_ms as f64 / 1000.0,
                    entry.name,
                    entry.path.display()
                );
            }
            Ok(())
        }
        Cmd::Play { path } => play(&cfg, path).await,
    }
}

async fn record(cfg: &Config) -> Result<()> {
    let session_config = cfg.session_config();
    info!(
        "Recording to {} ({} Hz, {} ch)",
        session_config.layout.recordings_dir.display(),
        session_config.quality.sample_rate,
        session_config.quality.channels
    );

    let encoder = WavSegmentEncoder::new(Box::new(SyntheticSource::default()));
    let machine = RecordingMachine::new(session_config, Box::new(encoder), Arc::new(MonotonicClock));
    let catalogue = Arc::new(JsonCatalogue::new(cfg.catalogue_path()));
    let (handle, service) = SessionService::spawn(machine, catalogue);

    let mut notifications = handle.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            match notification {
                Notification::StateChanged { state, elapsed_ms, .. } => {
                    println!("[{}] {:.1}s", state, elapsed_ms as f64 / 1000.0)
                }
                Notification::Finalized { output_path, duration_ms } => {
                    println!("Saved {} ({:.1}s)", output_path.display(), duration_ms as f64 / 1000.0)
                }
                Notification::Error { code } => println!("Error: {:?}", code),
            }
        }
    });

    println!("Commands: start | pause | stop | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "time" => println!("{:.1}s", handle.total_duration().as_secs_f64()),
            text => handle.send_raw(text).await,
        }
    }

    // Dropping the last handle finalizes any open recording.
    drop(handle);
    service.await?;
    printer.abort();
    Ok(())
}

async fn play(cfg: &Config, path: PathBuf) -> Result<()> {
    let player = Player::open(&path, Arc::new(MonotonicClock))?;
    let duration = player.duration();
    if duration.is_zero() {
        bail!("{} has no playable audio", path.display());
    }

    let arbiter = FocusArbiter::with_duck_volume(LocalFocus::default(), cfg.playback.duck_volume);
    let controller = PlaybackController::new(player, arbiter);

    let (tx, rx) = mpsc::channel(16);
    let task = tokio::spawn(controller.run(rx));

    tx.send(PlaybackEvent::Play).await?;
    info!("Playing {} ({:.1}s)", path.display(), duration.as_secs_f64());
    tokio::time::sleep(duration + Duration::from_millis(300)).await;

    drop(tx);
    let controller = task.await?;
    if controller.arbiter().is_focused() {
        warn!("Focus still held after playback");
    }
    Ok(())
}
