// Communication channels
//
// Control → audio: lock-free ring buffer (single consumer inside the render callback).
// The producer side is shared between the scheduler thread and the facade, so it sits
// behind a mutex that is only ever taken off the audio thread.
//
// Engine → UI: bounded crossbeam channel.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use ringbuf::{HeapRb, traits::Split};

use crate::error::{EngineError, EngineResult};
use crate::messaging::command::RenderCommand;
use crate::messaging::event::EngineEvent;

pub type CommandProducer = ringbuf::HeapProd<RenderCommand>;
pub type CommandConsumer = ringbuf::HeapCons<RenderCommand>;

pub fn create_command_channel(capacity: usize) -> (CommandSender, CommandConsumer) {
    let rb = HeapRb::<RenderCommand>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (CommandSender::new(producer), consumer)
}

/// Cloneable handle to the render command queue
#[derive(Clone)]
pub struct CommandSender {
    inner: Arc<Mutex<CommandProducer>>,
}

impl CommandSender {
    pub fn new(producer: CommandProducer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(producer)),
        }
    }

    /// Queue a command for the next render callback
    pub fn send(&self, command: RenderCommand) -> EngineResult<()> {
        let mut producer = self
            .inner
            .lock()
            .map_err(|_| EngineError::Device("command queue lock poisoned".to_string()))?;
        ringbuf::traits::Producer::try_push(&mut *producer, command)
            .map_err(|_| EngineError::CommandQueueFull)
    }
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender").finish_non_exhaustive()
    }
}

pub fn create_event_channel(capacity: usize) -> (EventSender, Receiver<EngineEvent>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (EventSender { inner: tx }, rx)
}

/// Non-blocking event publisher; a full or abandoned channel drops the event
#[derive(Clone, Debug)]
pub struct EventSender {
    inner: Sender<EngineEvent>,
}

impl EventSender {
    pub fn publish(&self, event: EngineEvent) {
        match self.inner.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::debug!("[ENGINE] Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
