// Tone bank - control-side table of named tone voices
//
// Maps string ids ("midi-60", "A4", ...) to the render-side voice handles that are
// currently sounding, plus the single tuning tone. Only the control thread touches
// this table; the audio thread only sees handles.

use std::collections::HashMap;

use crate::audio::parameters::SharedParams;
use crate::config::ToneConfig;
use crate::error::{EngineError, EngineResult};
use crate::messaging::channels::CommandSender;
use crate::messaging::command::RenderCommand;
use crate::synth::oscillator::Waveform;
use crate::synth::voice::{VoiceHandle, VoiceSpec};
use crate::synth::voice_manager::MAX_VOICES;

/// Starting and stopping tones by id
pub trait ToneControl {
    /// Start `id` at `frequency`; if `id` is already sounding it is stopped instead.
    /// Returns whether the tone is sounding afterwards.
    fn play_synth_tone(&mut self, id: &str, frequency: f32) -> EngineResult<bool>;
    fn stop_synth_tone(&mut self, id: &str) -> EngineResult<()>;
    fn is_playing(&self, id: &str) -> bool;
}

pub struct ToneBank {
    commands: CommandSender,
    params: SharedParams,
    config: ToneConfig,
    tones: HashMap<String, VoiceHandle>,
    tuning: Option<VoiceHandle>,
    next_handle: u64,
}

impl ToneBank {
    pub fn new(commands: CommandSender, params: SharedParams, config: ToneConfig) -> Self {
        Self {
            commands,
            params,
            config,
            tones: HashMap::new(),
            tuning: None,
            next_handle: 1,
        }
    }

    /// Voices this table holds; never more than the renderer has slots for,
    /// otherwise the renderer would steal a voice still listed here
    pub fn voice_count(&self) -> usize {
        self.tones.len() + usize::from(self.tuning.is_some())
    }

    fn reserve_voice(&self) -> EngineResult<()> {
        if self.voice_count() >= MAX_VOICES {
            return Err(EngineError::VoiceLimit(MAX_VOICES));
        }
        Ok(())
    }

    fn allocate_handle(&mut self) -> VoiceHandle {
        let handle = VoiceHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn synth_gain(&self) -> f32 {
        self.params.volume() * self.config.synth_level
    }

    fn tuning_gain(&self) -> f32 {
        self.params.volume() * self.config.tuning_level
    }

    /// Stop every named tone; the tuning tone keeps sounding
    pub fn stop_all_synth_tones(&mut self) -> EngineResult<()> {
        let fade_out_secs = self.config.synth_fade_out_ms * 0.001;
        let mut result = Ok(());
        for (id, handle) in self.tones.drain() {
            log::debug!("[ENGINE] Stopping tone {}", id);
            if let Err(e) = self.commands.send(RenderCommand::StopVoice {
                handle,
                fade_out_secs,
            }) {
                result = Err(e);
            }
        }
        result
    }

    /// Start or stop the 440 Hz reference tone; repeated calls with the same value do nothing
    pub fn toggle_tuning_note(&mut self, enable: bool) -> EngineResult<()> {
        let fade_secs = self.config.tuning_fade_ms * 0.001;
        match (enable, self.tuning) {
            (true, None) => {
                self.reserve_voice()?;
                let handle = self.allocate_handle();
                self.commands.send(RenderCommand::StartVoice {
                    handle,
                    spec: VoiceSpec {
                        waveform: Waveform::Square,
                        frequency: self.config.tuning_frequency,
                        gain: self.tuning_gain(),
                        fade_in_secs: fade_secs,
                    },
                })?;
                self.tuning = Some(handle);
            }
            (false, Some(handle)) => {
                self.tuning = None;
                self.commands.send(RenderCommand::StopVoice {
                    handle,
                    fade_out_secs: fade_secs,
                })?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn is_tuning_playing(&self) -> bool {
        self.tuning.is_some()
    }

    /// Glide every sounding voice to the current volume without restarting it
    pub fn retarget_volume(&self) -> EngineResult<()> {
        let synth_gain = self.synth_gain();
        for &handle in self.tones.values() {
            self.commands.send(RenderCommand::SetVoiceGain {
                handle,
                gain: synth_gain,
            })?;
        }
        if let Some(handle) = self.tuning {
            self.commands.send(RenderCommand::SetVoiceGain {
                handle,
                gain: self.tuning_gain(),
            })?;
        }
        Ok(())
    }

    /// Ids of the sounding tones, sorted
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tones.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn handle_of(&self, id: &str) -> Option<VoiceHandle> {
        self.tones.get(id).copied()
    }

    pub fn tuning_handle(&self) -> Option<VoiceHandle> {
        self.tuning
    }
}

impl ToneControl for ToneBank {
    fn play_synth_tone(&mut self, id: &str, frequency: f32) -> EngineResult<bool> {
        if self.tones.contains_key(id) {
            self.stop_synth_tone(id)?;
            return Ok(false);
        }

        self.reserve_voice()?;
        let handle = self.allocate_handle();
        self.commands.send(RenderCommand::StartVoice {
            handle,
            spec: VoiceSpec {
                waveform: Waveform::Saw,
                frequency,
                gain: self.synth_gain(),
                fade_in_secs: self.config.synth_fade_in_ms * 0.001,
            },
        })?;
        log::debug!("[ENGINE] Tone {} started at {:.2} Hz", id, frequency);
        self.tones.insert(id.to_string(), handle);
        Ok(true)
    }

    fn stop_synth_tone(&mut self, id: &str) -> EngineResult<()> {
        let Some(handle) = self.tones.remove(id) else {
            return Ok(());
        };
        self.commands.send(RenderCommand::StopVoice {
            handle,
            fade_out_secs: self.config.synth_fade_out_ms * 0.001,
        })
    }

    fn is_playing(&self, id: &str) -> bool {
        self.tones.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::{CommandConsumer, create_command_channel};
    use crate::sequencer::tempo::{Subdivision, Tempo};
    use ringbuf::traits::Consumer;

    fn bank(volume: f32) -> (ToneBank, CommandConsumer) {
        let (tx, rx) = create_command_channel(64);
        let params = SharedParams::new(Tempo::default(), volume, Subdivision::Quarter);
        (ToneBank::new(tx, params, ToneConfig::default()), rx)
    }

    fn drain(rx: &mut CommandConsumer) -> Vec<RenderCommand> {
        std::iter::from_fn(|| rx.try_pop()).collect()
    }

    #[test]
    fn test_play_starts_saw_voice_at_quarter_volume() {
        let (mut bank, mut rx) = bank(0.8);
        assert!(bank.play_synth_tone("midi-60", 261.63).unwrap());

        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 1);
        match commands[0] {
            RenderCommand::StartVoice { spec, .. } => {
                assert_eq!(spec.waveform, Waveform::Saw);
                assert!((spec.gain - 0.2).abs() < 1e-6);
                assert!((spec.fade_in_secs - 0.02).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_replay_toggles_off() {
        let (mut bank, mut rx) = bank(0.8);
        assert!(bank.play_synth_tone("A4", 440.0).unwrap());
        let handle = bank.handle_of("A4").unwrap();
        assert!(!bank.play_synth_tone("A4", 440.0).unwrap());
        assert!(!bank.is_playing("A4"));

        let commands = drain(&mut rx);
        assert!(matches!(
            commands.last(),
            Some(RenderCommand::StopVoice { handle: h, .. }) if *h == handle
        ));
    }

    #[test]
    fn test_replay_after_stop_gets_fresh_handle() {
        let (mut bank, _rx) = bank(0.8);
        bank.play_synth_tone("A4", 440.0).unwrap();
        let first = bank.handle_of("A4").unwrap();
        bank.stop_synth_tone("A4").unwrap();
        bank.play_synth_tone("A4", 440.0).unwrap();
        assert_ne!(bank.handle_of("A4").unwrap(), first);
    }

    #[test]
    fn test_stop_unknown_is_noop() {
        let (mut bank, mut rx) = bank(0.8);
        bank.stop_synth_tone("nothing").unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_stop_all_spares_tuning_tone() {
        let (mut bank, _rx) = bank(0.8);
        bank.play_synth_tone("midi-60", 261.63).unwrap();
        bank.play_synth_tone("midi-64", 329.63).unwrap();
        bank.toggle_tuning_note(true).unwrap();

        bank.stop_all_synth_tones().unwrap();
        assert!(bank.active_ids().is_empty());
        assert!(bank.is_tuning_playing());
    }

    #[test]
    fn test_tuning_toggle_is_idempotent() {
        let (mut bank, mut rx) = bank(1.0);
        bank.toggle_tuning_note(true).unwrap();
        bank.toggle_tuning_note(true).unwrap();
        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 1);
        match commands[0] {
            RenderCommand::StartVoice { spec, .. } => {
                assert_eq!(spec.waveform, Waveform::Square);
                assert_eq!(spec.frequency, 440.0);
                assert!((spec.gain - 0.5).abs() < 1e-6);
                assert!((spec.fade_in_secs - 0.1).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }

        bank.toggle_tuning_note(false).unwrap();
        bank.toggle_tuning_note(false).unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
        assert!(!bank.is_tuning_playing());
    }

    #[test]
    fn test_retarget_volume_keeps_handles() {
        let (tx, mut rx) = create_command_channel(64);
        let params = SharedParams::new(Tempo::default(), 0.8, Subdivision::Quarter);
        let mut bank = ToneBank::new(tx, params.clone(), ToneConfig::default());
        bank.play_synth_tone("midi-60", 261.63).unwrap();
        bank.toggle_tuning_note(true).unwrap();
        let tone = bank.handle_of("midi-60").unwrap();
        let tuning = bank.tuning_handle().unwrap();
        drain(&mut rx);

        params.set_volume(0.4);
        bank.retarget_volume().unwrap();

        let mut gains: Vec<(VoiceHandle, f32)> = drain(&mut rx)
            .into_iter()
            .filter_map(|c| match c {
                RenderCommand::SetVoiceGain { handle, gain } => Some((handle, gain)),
                _ => None,
            })
            .collect();
        gains.sort_by_key(|(h, _)| *h);
        assert_eq!(gains.len(), 2);
        assert_eq!(gains[0].0, tone);
        assert!((gains[0].1 - 0.1).abs() < 1e-6);
        assert_eq!(gains[1].0, tuning);
        assert!((gains[1].1 - 0.2).abs() < 1e-6);
        assert_eq!(bank.handle_of("midi-60"), Some(tone));
    }

    #[test]
    fn test_start_past_voice_limit_is_refused() {
        let (mut bank, mut rx) = bank(0.8);
        bank.toggle_tuning_note(true).unwrap();
        for key in 0..MAX_VOICES - 1 {
            assert!(bank.play_synth_tone(&format!("key-{key}"), 220.0).unwrap());
        }
        assert_eq!(bank.voice_count(), MAX_VOICES);

        let tuning = bank.tuning_handle().unwrap();
        assert!(matches!(
            bank.play_synth_tone("key-15", 220.0),
            Err(EngineError::VoiceLimit(MAX_VOICES))
        ));
        assert!(!bank.is_playing("key-15"));
        assert_eq!(bank.tuning_handle(), Some(tuning));
        assert_eq!(drain(&mut rx).len(), MAX_VOICES);

        // Freeing one voice makes room again
        bank.stop_synth_tone("key-0").unwrap();
        assert!(bank.play_synth_tone("key-15", 220.0).unwrap());
    }

    #[test]
    fn test_tuning_note_refused_when_table_is_full() {
        let (mut bank, _rx) = bank(0.8);
        for key in 0..MAX_VOICES {
            bank.play_synth_tone(&format!("key-{key}"), 220.0).unwrap();
        }
        assert!(matches!(
            bank.toggle_tuning_note(true),
            Err(EngineError::VoiceLimit(_))
        ));
        assert!(!bank.is_tuning_playing());
    }
}
