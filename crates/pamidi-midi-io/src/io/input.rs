//! MIDI input: a dedicated connection thread feeding a blocking receive queue.

use crate::error::{Error, Result};
use crate::event::ControlMessage;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::any::Any;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) const INPUT_QUEUE_CAPACITY: usize = 1024;

/// Keeps a backend connection alive; dropping it closes the connection.
pub type InputGuard = Box<dyn Any>;

/// Open input connection.
///
/// Messages arrive on [`events`](Self::events) in the order the controller sent
/// them. Dropping the handle (or calling [`close`](Self::close)) tears the
/// connection down.
pub struct MidiInputHandle {
    name: String,
    events: Receiver<ControlMessage>,
    shutdown: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl MidiInputHandle {
    /// Spawn the connection thread and open the port on it with `connect`.
    ///
    /// `connect` receives the sending half of the event queue and returns a
    /// guard that is held on the thread until the handle is closed.
    pub fn spawn_with<F>(name: impl Into<String>, connect: F) -> Result<Self>
    where
        F: FnOnce(Sender<ControlMessage>) -> Result<InputGuard> + Send + 'static,
    {
        let name = name.into();
        let (event_sender, events) = bounded(INPUT_QUEUE_CAPACITY);
        let (shutdown, shutdown_receiver) = bounded::<()>(1);
        let (ready_sender, ready_receiver) = bounded::<Result<()>>(1);

        let thread_name = name.clone();
        let worker = thread::Builder::new()
            .name("pamidi-midi-input".to_string())
            .spawn(move || {
                let guard = match connect(event_sender) {
                    Ok(guard) => {
                        let _ = ready_sender.send(Ok(()));
                        guard
                    }
                    Err(e) => {
                        let _ = ready_sender.send(Err(e));
                        return;
                    }
                };
                // Hold the connection until asked to stop.
                let _ = shutdown_receiver.recv();
                drop(guard);
                debug!("MIDI input '{}' closed", thread_name);
            })
            .map_err(|e| Error::MidiDevice(format!("failed to spawn MIDI input thread: {}", e)))?;

        let ready = ready_receiver.recv().map_err(|_| {
            Error::Disconnected(format!("MIDI input thread for '{}' exited early", name))
        });
        if let Err(e) = ready.and_then(|r| r) {
            let _ = worker.join();
            return Err(e);
        }

        Ok(Self {
            name,
            events,
            shutdown: Some(shutdown),
            worker: Some(worker),
        })
    }

    /// In-process input fed through the returned sender.
    ///
    /// The receive loop ends once every sender has been dropped.
    pub fn virtual_port(name: impl Into<String>) -> (Sender<ControlMessage>, Self) {
        let (sender, events) = bounded(INPUT_QUEUE_CAPACITY);
        (sender, Self::from_receiver(name, events))
    }

    pub(crate) fn from_receiver(name: impl Into<String>, events: Receiver<ControlMessage>) -> Self {
        Self {
            name: name.into(),
            events,
            shutdown: None,
            worker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receiving half of the event queue, for use with `crossbeam_channel::select!`.
    pub fn events(&self) -> &Receiver<ControlMessage> {
        &self.events
    }

    /// Block until the next message. `None` once the connection is gone.
    pub fn recv(&self) -> Option<ControlMessage> {
        self.events.recv().ok()
    }

    /// `Ok(None)` on timeout, `Err` once the connection is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<ControlMessage>> {
        match self.events.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Disconnected(self.name.clone())),
        }
    }

    pub fn close(mut self) {
        self.shutdown_worker();
    }

    fn shutdown_worker(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("MIDI input thread for '{}' panicked", self.name);
            }
        }
    }
}

impl Drop for MidiInputHandle {
    fn drop(&mut self) {
        self.shutdown_worker();
    }
}

impl std::fmt::Debug for MidiInputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiInputHandle")
            .field("name", &self.name)
            .field("pending", &self.events.len())
            .finish()
    }
}

/// Decode raw bytes from a backend callback and queue the result.
///
/// Unbindable messages and undecodable bytes are dropped, as is anything
/// arriving while the queue is full. Never blocks.
pub fn forward_raw(sender: &Sender<ControlMessage>, port_name: &str, bytes: &[u8]) {
    match ControlMessage::from_bytes(bytes) {
        Ok(ControlMessage::Other) => {}
        Ok(message) => match sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("MIDI input queue for '{}' full, dropping event", port_name);
            }
            Err(TrySendError::Disconnected(_)) => {}
        },
        Err(e) => {
            warn!("Failed to parse MIDI event from '{}': {}", port_name, e);
        }
    }
}
