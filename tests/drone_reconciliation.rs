// Integration test: drone chord changes against a rendering output
//
// Notes shared by the old and new chord must keep their voice (same handle, no
// restart); only the difference is stopped or started.

use mymusic_metronome::audio::parameters::SharedParams;
use mymusic_metronome::{
    Chord, DroneManager, Engine, EngineConfig, Subdivision, Tempo, ToneBank, ToneControl, offline,
};

const SAMPLE_RATE: f32 = 48000.0;

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_major_to_minor_keeps_shared_voices() {
    let config = EngineConfig::default();
    let (output, mut renderer) = offline(SAMPLE_RATE, &config);
    let params = SharedParams::new(Tempo::new(60), 0.8, Subdivision::Quarter);
    let mut bank = ToneBank::new(output.commands().clone(), params, config.tones);
    let mut drone = DroneManager::new();

    let change = drone
        .set_target(Some(60), Some(Chord::MajorTriad), &mut bank)
        .unwrap();
    assert_eq!(
        change.started,
        ids(&["midi-60", "midi-64", "midi-67", "midi-72"])
    );
    assert!(change.stopped.is_empty());
    renderer.render(4800);

    let root = bank.handle_of("midi-60").unwrap();
    let fifth = bank.handle_of("midi-67").unwrap();
    let major_third = bank.handle_of("midi-64").unwrap();
    assert_eq!(renderer.renderer().voices().active_voice_count(), 4);

    let change = drone
        .set_target(Some(60), Some(Chord::MinorTriad), &mut bank)
        .unwrap();
    assert_eq!(change.started, ids(&["midi-63"]));
    assert_eq!(change.stopped, ids(&["midi-64"]));
    assert_eq!(bank.handle_of("midi-60"), Some(root));
    assert_eq!(bank.handle_of("midi-67"), Some(fifth));
    assert_eq!(
        bank.active_ids(),
        ids(&["midi-60", "midi-63", "midi-67", "midi-72"])
    );

    // The old third fades out (50 ms); shared voices never stop
    renderer.render(1);
    let voices = renderer.renderer().voices();
    assert!(voices.voice(major_third).unwrap().is_releasing());
    assert!(!voices.voice(root).unwrap().is_releasing());
    assert!(!voices.voice(fifth).unwrap().is_releasing());

    renderer.render(4800);
    let voices = renderer.renderer().voices();
    assert!(voices.voice(major_third).is_none());
    assert_eq!(voices.active_voice_count(), 4);
}

#[test]
fn test_same_target_twice_changes_nothing() {
    let config = EngineConfig::default();
    let (output, _renderer) = offline(SAMPLE_RATE, &config);
    let params = SharedParams::new(Tempo::new(60), 0.8, Subdivision::Quarter);
    let mut bank = ToneBank::new(output.commands().clone(), params, config.tones);
    let mut drone = DroneManager::new();

    drone
        .set_target(Some(57), Some(Chord::DominantSeventh), &mut bank)
        .unwrap();
    let before = bank.active_ids();
    let change = drone
        .set_target(Some(57), Some(Chord::DominantSeventh), &mut bank)
        .unwrap();
    assert!(change.started.is_empty() && change.stopped.is_empty());
    assert_eq!(bank.active_ids(), before);
}

#[test]
fn test_drone_adopts_manual_tone() {
    let config = EngineConfig::default();
    let (output, _renderer) = offline(SAMPLE_RATE, &config);
    let params = SharedParams::new(Tempo::new(60), 0.8, Subdivision::Quarter);
    let mut bank = ToneBank::new(output.commands().clone(), params, config.tones);
    let mut drone = DroneManager::new();

    assert!(bank.play_synth_tone("midi-67", 392.0).unwrap());
    let manual = bank.handle_of("midi-67");

    let change = drone
        .set_target(Some(60), Some(Chord::MajorTriad), &mut bank)
        .unwrap();
    assert_eq!(change.started, ids(&["midi-60", "midi-64", "midi-72"]));
    assert_eq!(bank.handle_of("midi-67"), manual);
}

#[test]
fn test_engine_drone_lifecycle() {
    let mut engine = Engine::new(EngineConfig::default());
    let (output, mut renderer) = offline(SAMPLE_RATE, engine.config());
    engine.initialize(output).unwrap();

    engine.set_drone_target(Some(48), Some(Chord::FifthStack)).unwrap();
    assert_eq!(
        engine.playing_tone_ids(),
        ids(&["midi-48", "midi-55", "midi-60", "midi-72"])
    );

    // Notes above the MIDI range are dropped, not wrapped
    let change = engine
        .set_drone_target(Some(120), Some(Chord::OctaveStack))
        .unwrap();
    assert_eq!(change.started, ids(&["midi-120"]));
    assert_eq!(change.stopped.len(), 4);
    assert_eq!(engine.playing_tone_ids(), ids(&["midi-120"]));

    // stop-all clears drone voices; the next target starts them fresh
    engine.stop_all_synth_tones().unwrap();
    assert!(engine.playing_tone_ids().is_empty());
    let change = engine.set_drone_target(Some(120), None).unwrap();
    assert_eq!(change.started, ids(&["midi-120"]));
    assert!(change.stopped.is_empty());

    let change = engine.set_drone_target(None, None).unwrap();
    assert_eq!(change.stopped, ids(&["midi-120"]));
    assert!(engine.playing_tone_ids().is_empty());

    renderer.render_seconds(0.2, 256);
    assert_eq!(renderer.renderer().voices().active_voice_count(), 0);
}
