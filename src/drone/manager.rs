// Drone manager - keeps the sounding drone voices equal to the requested chord
//
// Voices are identified by "midi-<n>", so a note shared by the old and new chord keeps
// sounding without a restart; only the difference is stopped or started.

use std::collections::BTreeSet;

use crate::drone::chord::{Chord, drone_targets};
use crate::error::EngineResult;
use crate::synth::tone_bank::ToneControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DroneRequest {
    pub root: Option<u8>,
    pub chord: Option<Chord>,
}

/// What one reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroneChange {
    pub started: Vec<String>,
    pub stopped: Vec<String>,
}

#[derive(Debug, Default)]
pub struct DroneManager {
    request: DroneRequest,
    playing: BTreeSet<String>,
}

impl DroneManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) -> DroneRequest {
        self.request
    }

    /// Ids this manager has started and not stopped
    pub fn playing_ids(&self) -> impl Iterator<Item = &str> {
        self.playing.iter().map(String::as_str)
    }

    /// Reconcile the drone voices against `root` + `chord`; `root == None` silences the drone
    pub fn set_target<T: ToneControl + ?Sized>(
        &mut self,
        root: Option<u8>,
        chord: Option<Chord>,
        tones: &mut T,
    ) -> EngineResult<DroneChange> {
        let targets = match root {
            Some(root) => drone_targets(root, chord),
            None => Vec::new(),
        };
        let target_ids: BTreeSet<&str> = targets.iter().map(|(id, _)| id.as_str()).collect();

        // Voices stopped behind our back (stop-all) no longer count as playing
        self.playing.retain(|id| tones.is_playing(id));

        let mut change = DroneChange::default();
        let to_stop: Vec<String> = self
            .playing
            .iter()
            .filter(|id| !target_ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in to_stop {
            tones.stop_synth_tone(&id)?;
            self.playing.remove(&id);
            change.stopped.push(id);
        }

        for (id, frequency) in targets {
            if self.playing.contains(&id) {
                continue;
            }
            // Already sounding as a manual tone: adopt it, replaying would toggle it off
            if !tones.is_playing(&id) {
                tones.play_synth_tone(&id, frequency)?;
                change.started.push(id.clone());
            }
            self.playing.insert(id);
        }

        self.request = DroneRequest { root, chord };
        if !change.started.is_empty() || !change.stopped.is_empty() {
            log::debug!(
                "[ENGINE] Drone {:?} {:?}: started {:?}, stopped {:?}",
                root,
                chord,
                change.started,
                change.stopped
            );
        }
        Ok(change)
    }
}
