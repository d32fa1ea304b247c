// Messaging - render command queue and engine event channel

pub mod channels;
pub mod command;
pub mod event;

pub use channels::{CommandSender, EventSender, create_command_channel, create_event_channel};
pub use command::RenderCommand;
pub use event::{EngineEvent, TunerReading};
