use crate::error::{Error, Result};
use crate::event::ControlMessage;
use crate::io::{MidiInputHandle, MidiOutputHandle, MidiOutputPort, INPUT_QUEUE_CAPACITY};
use crate::transport::MidiTransport;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Output port that records every message written to it.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct VirtualOutput {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl VirtualOutput {
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Last on/off state per note number, as a controller would display it.
    pub fn note_states(&self) -> BTreeMap<u8, bool> {
        let mut states = BTreeMap::new();
        for bytes in self.sent.lock().iter() {
            let &[status, note, velocity] = bytes.as_slice() else {
                continue;
            };
            match status & 0xF0 {
                0x90 => {
                    states.insert(note, velocity > 0);
                }
                0x80 => {
                    states.insert(note, false);
                }
                _ => {}
            }
        }
        states
    }
}

impl MidiOutputPort for VirtualOutput {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent.lock().push(bytes.to_vec());
        Ok(())
    }
}

/// Transport whose ports exist only in this process.
#[derive(Default)]
pub struct VirtualTransport {
    inputs: Mutex<BTreeMap<String, Receiver<ControlMessage>>>,
    outputs: Mutex<BTreeMap<String, VirtualOutput>>,
}

impl VirtualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input port; messages sent on the returned sender reach
    /// whoever opens it.
    pub fn add_input(&self, name: impl Into<String>) -> Sender<ControlMessage> {
        let (sender, receiver) = bounded(INPUT_QUEUE_CAPACITY);
        self.inputs.lock().insert(name.into(), receiver);
        sender
    }

    /// Register an output port and return its recorder.
    pub fn add_output(&self, name: impl Into<String>) -> VirtualOutput {
        let output = VirtualOutput::default();
        self.outputs.lock().insert(name.into(), output.clone());
        output
    }
}

impl MidiTransport for VirtualTransport {
    fn list_inputs(&self) -> Result<Vec<String>> {
        Ok(self.inputs.lock().keys().cloned().collect())
    }

    fn list_outputs(&self) -> Result<Vec<String>> {
        Ok(self.outputs.lock().keys().cloned().collect())
    }

    fn open_input(&self, name: &str) -> Result<MidiInputHandle> {
        let receiver = self
            .inputs
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PortNotFound(name.to_string()))?;
        Ok(MidiInputHandle::from_receiver(name, receiver))
    }

    fn open_output(&self, name: &str) -> Result<MidiOutputHandle> {
        let port = self
            .outputs
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PortNotFound(name.to_string()))?;
        MidiOutputHandle::spawn_with(name, move || Ok(Box::new(port) as Box<dyn MidiOutputPort>))
    }
}
