// Drone - chord-based reference tones built on the tone bank

pub mod chord;
pub mod manager;

pub use chord::{Chord, drone_targets, midi_to_frequency};
pub use manager::{DroneChange, DroneManager, DroneRequest};
