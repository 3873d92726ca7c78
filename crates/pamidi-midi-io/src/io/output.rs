//! MIDI output: message encoding and a dedicated sender thread per connection.
//!
//! All writes to one connection go through a single-consumer queue, so any
//! number of threads can hold a [`MidiOutputHandle`] without racing on the port.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

#[cfg(feature = "midi-io")]
use midir::MidiOutputConnection;

const OUTPUT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputMessage {
    pub bytes: Vec<u8>,
}

impl MidiOutputMessage {
    pub fn control_change(channel: u8, cc_number: u8, value: u8) -> Self {
        let channel = channel.min(15); // MIDI channels are 0-15
        let status = 0xB0 | channel;
        Self {
            bytes: vec![status, cc_number & 0x7F, value & 0x7F],
        }
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        let channel = channel.min(15);
        let status = 0x90 | channel;
        Self {
            bytes: vec![status, note & 0x7F, velocity & 0x7F],
        }
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        let channel = channel.min(15);
        let status = 0x80 | channel;
        Self {
            bytes: vec![status, note & 0x7F, velocity & 0x7F],
        }
    }
}

/// Anything raw MIDI bytes can be written to.
///
/// Ports are created and used on the output thread only, so no `Send` bound.
pub trait MidiOutputPort {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

#[cfg(feature = "midi-io")]
impl MidiOutputPort for MidiOutputConnection {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        MidiOutputConnection::send(self, bytes).map_err(Error::from)
    }
}

enum OutputCommand {
    Send(MidiOutputMessage),
    Shutdown,
}

struct OutputShared {
    name: String,
    command_sender: Sender<OutputCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    is_open: AtomicBool,
}

impl OutputShared {
    fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        let _ = self.command_sender.send(OutputCommand::Shutdown);
        if worker.join().is_err() {
            warn!("MIDI output thread for '{}' panicked", self.name);
        }
        self.is_open.store(false, Ordering::SeqCst);
    }
}

impl Drop for OutputShared {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cloneable handle to an open output connection.
///
/// Clone is cheap (Arc internally). The connection is closed by [`close`](Self::close)
/// or when the last clone is dropped; queued messages are flushed first.
#[derive(Clone)]
pub struct MidiOutputHandle {
    shared: Arc<OutputShared>,
}

impl MidiOutputHandle {
    /// Spawn the output thread and open the port on it with `connect`.
    ///
    /// Returns once `connect` has finished, propagating its error.
    pub fn spawn_with<F>(name: impl Into<String>, connect: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn MidiOutputPort>> + Send + 'static,
    {
        let name = name.into();
        let (command_sender, command_receiver) = bounded(OUTPUT_QUEUE_CAPACITY);
        let (ready_sender, ready_receiver) = bounded::<Result<()>>(1);

        let thread_name = name.clone();
        let worker = thread::Builder::new()
            .name("pamidi-midi-output".to_string())
            .spawn(move || {
                let port = match connect() {
                    Ok(port) => {
                        let _ = ready_sender.send(Ok(()));
                        port
                    }
                    Err(e) => {
                        let _ = ready_sender.send(Err(e));
                        return;
                    }
                };
                Self::midi_output_thread(thread_name, port, command_receiver);
            })
            .map_err(|e| Error::MidiDevice(format!("failed to spawn MIDI output thread: {}", e)))?;

        let ready = ready_receiver.recv().map_err(|_| {
            Error::Disconnected(format!("MIDI output thread for '{}' exited early", name))
        });
        if let Err(e) = ready.and_then(|r| r) {
            let _ = worker.join();
            return Err(e);
        }

        Ok(Self {
            shared: Arc::new(OutputShared {
                name,
                command_sender,
                worker: Mutex::new(Some(worker)),
                is_open: AtomicBool::new(true),
            }),
        })
    }

    fn midi_output_thread(
        name: String,
        mut port: Box<dyn MidiOutputPort>,
        command_receiver: Receiver<OutputCommand>,
    ) {
        loop {
            match command_receiver.recv() {
                Ok(OutputCommand::Send(msg)) => {
                    if let Err(e) = port.send(&msg.bytes) {
                        warn!("failed to send MIDI message to '{}': {}", name, e);
                    }
                }
                Ok(OutputCommand::Shutdown) | Err(_) => break,
            }
        }
        debug!("MIDI output '{}' closed", name);
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open.load(Ordering::SeqCst)
    }

    /// Queue a message for the output thread. Never blocks.
    pub fn send_message(&self, message: MidiOutputMessage) {
        if !self.is_open() {
            debug!("Cannot send MIDI message: '{}' is closed", self.shared.name);
            return;
        }
        match self
            .shared
            .command_sender
            .try_send(OutputCommand::Send(message))
        {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("MIDI output queue for '{}' full, dropping message", self.shared.name);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("MIDI output thread for '{}' not running", self.shared.name);
            }
        }
    }

    pub fn send_note_on(&self, channel: u8, note: u8, velocity: u8) {
        self.send_message(MidiOutputMessage::note_on(channel, note, velocity));
    }

    pub fn send_note_off(&self, channel: u8, note: u8, velocity: u8) {
        self.send_message(MidiOutputMessage::note_off(channel, note, velocity));
    }

    pub fn send_cc(&self, channel: u8, cc_number: u8, value: u8) {
        self.send_message(MidiOutputMessage::control_change(channel, cc_number, value));
    }

    /// Flush queued messages, stop the output thread, and close the port.
    pub fn close(&self) {
        self.shared.shutdown();
    }
}

impl std::fmt::Debug for MidiOutputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiOutputHandle")
            .field("name", &self.shared.name)
            .field("is_open", &self.is_open())
            .finish()
    }
}
