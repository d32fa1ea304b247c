// mymusic-metronome - headless demo of the engine
//
// Runs the metronome (and optionally a drone and the tuner) for a few seconds and
// prints the beat and pitch events it receives.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;

use mymusic_metronome::audio::capture::BufferedMicrophone;
use mymusic_metronome::audio::device::AudioDeviceManager;
use mymusic_metronome::audio::output::{self, OfflineRenderer};
use mymusic_metronome::{Chord, Engine, EngineConfig, EngineEvent, Subdivision, TunerReading};

/// Sample rate and block size of the offline output
const OFFLINE_SAMPLE_RATE: f32 = 48000.0;
const OFFLINE_BLOCK: usize = 512;

#[derive(Parser)]
#[command(name = "mymusic-metronome")]
#[command(about = "Lookahead metronome, drone and tuner", long_about = None)]
struct Cli {
    /// Tempo in BPM (10-999)
    #[arg(short, long)]
    tempo: Option<i64>,

    /// Subdivision: 1/4, 1/8, 1/8T, 1/16 or dotted
    #[arg(short, long)]
    subdivision: Option<Subdivision>,

    /// Volume 0.0-1.0
    #[arg(short, long)]
    volume: Option<f32>,

    /// How long to run
    #[arg(long, default_value = "8.0")]
    seconds: f64,

    /// Drone root as a MIDI note number (48 = C3)
    #[arg(long)]
    drone: Option<u8>,

    /// Drone chord: M3, m3, Mm7, Dim7, 5th or 8va
    #[arg(long, requires = "drone")]
    chord: Option<Chord>,

    /// Run the tuner and print pitch readings
    #[arg(long)]
    tuner: bool,

    /// Engine configuration file (RON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render without an audio device (the tuner hears a 440 Hz test tone)
    #[arg(long)]
    offline: bool,

    /// Output device name (default device otherwise)
    #[arg(long, conflicts_with = "offline")]
    device: Option<String>,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.list_devices {
        list_devices();
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let mut offline_renderer: Option<OfflineRenderer> = None;
    let output = if cli.offline {
        let (output, renderer) = output::offline(OFFLINE_SAMPLE_RATE, &config);
        offline_renderer = Some(renderer);
        output
    } else {
        let opened = match &cli.device {
            Some(name) => output::open_named_output(name, &config),
            None => output::open_default_output(&config),
        };
        opened.context("opening audio output")?
    };

    let mut engine = Engine::new(config);
    if cli.offline {
        let microphone = BufferedMicrophone::sine(
            OFFLINE_SAMPLE_RATE as u32,
            440.0,
            0.5,
            cli.seconds as f32,
            OFFLINE_BLOCK,
        );
        engine = engine.with_microphone(Box::new(microphone));
    }
    engine.initialize(output)?;

    if let Some(tempo) = cli.tempo {
        engine.set_tempo(tempo)?;
    }
    if let Some(volume) = cli.volume {
        engine.set_volume(volume)?;
    }
    if let Some(subdivision) = cli.subdivision {
        engine.set_subdivision(subdivision)?;
    }
    if let Some(root) = cli.drone {
        let change = engine.set_drone_target(Some(root), cli.chord)?;
        println!("Drone: {}", change.started.join(", "));
    }
    if cli.tuner {
        engine.start_tuner().context("starting tuner")?;
    }

    println!(
        "Metronome: {} ({}) for {:.1}s{}",
        engine.tempo(),
        engine.subdivision(),
        cli.seconds,
        if cli.offline { " [offline]" } else { "" }
    );
    engine.start()?;

    let events = engine.events();
    let deadline = Instant::now() + Duration::from_secs_f64(cli.seconds.max(0.0));
    while Instant::now() < deadline {
        match offline_renderer.as_mut() {
            // Pace the offline renderer at roughly real time so the scheduler keeps up
            Some(renderer) => {
                renderer.render(OFFLINE_BLOCK);
                std::thread::sleep(Duration::from_secs_f32(
                    OFFLINE_BLOCK as f32 / OFFLINE_SAMPLE_RATE,
                ));
            }
            None => std::thread::sleep(Duration::from_millis(10)),
        }
        print_events(&events);
    }

    engine.stop()?;
    engine.stop_tuner()?;
    engine.dispose();
    println!("Done");
    Ok(())
}

fn print_events(events: &Receiver<EngineEvent>) {
    for event in events.try_iter() {
        match event {
            EngineEvent::Beat { index } => println!("beat {}", index + 1),
            EngineEvent::Pitch(TunerReading::Detected(estimate)) => println!("pitch {}", estimate),
            EngineEvent::Pitch(TunerReading::NoSignal) => {}
            EngineEvent::DeviceError(message) => eprintln!("device error: {}", message),
        }
    }
}

fn list_devices() {
    let manager = AudioDeviceManager::new();
    println!("Output devices:");
    for device in manager.list_output_devices() {
        println!("  {}{}", device.name, if device.is_default { " (default)" } else { "" });
    }
    println!("Input devices:");
    for device in manager.list_input_devices() {
        println!("  {}{}", device.name, if device.is_default { " (default)" } else { "" });
    }
}
