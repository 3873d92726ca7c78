//! Bridge that ties a MIDI controller to an audio server.

use crate::action::ActionTable;
use crate::dispatcher::Dispatcher;
use crate::led::{LedBindings, LedFeedback, MidiLedWriter};
use crate::sync::TopologySynchronizer;
use crate::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use pamidi_midi_io::{MidiChannel, MidiDevices, MidiTransport};
use pamidi_pulse::{AudioServer, EndpointIndex};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// Runs the dispatcher and topology synchronizer for one controller.
///
/// The bridge owns the endpoint index; connections are opened by
/// [`run`](Self::run) and closed before it returns.
///
/// # Example
///
/// ```ignore
/// use pamidi::prelude::*;
///
/// let config = BridgeConfig::load("pamidi.toml")?;
/// let bridge = Bridge::builder()
///     .config(config)?
///     .server(server)
///     .build()?;
///
/// let shutdown = bridge.shutdown_handle();
/// bridge.run(|| println!("ready"))?;
/// ```
pub struct Bridge {
    transport: Arc<dyn MidiTransport>,
    server: Arc<dyn AudioServer>,

    input_port: String,
    output_port: String,
    led_channel: MidiChannel,

    table: Arc<ActionTable>,
    led_bindings: LedBindings,
    index: Arc<EndpointIndex>,

    shutdown_sender: Sender<()>,
    shutdown_receiver: Receiver<()>,
}

impl Bridge {
    /// Create a new bridge builder
    pub fn builder() -> crate::BridgeBuilder {
        crate::BridgeBuilder::default()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn MidiTransport>,
        server: Arc<dyn AudioServer>,
        input_port: String,
        output_port: String,
        led_channel: MidiChannel,
        table: ActionTable,
        led_bindings: LedBindings,
    ) -> Self {
        let (shutdown_sender, shutdown_receiver) = bounded(1);
        Self {
            transport,
            server,
            input_port,
            output_port,
            led_channel,
            table: Arc::new(table),
            led_bindings,
            index: Arc::new(EndpointIndex::new()),
            shutdown_sender,
            shutdown_receiver,
        }
    }

    /// List MIDI ports on this bridge's transport.
    pub fn list_devices(&self) -> Result<MidiDevices> {
        Ok(self.transport.list_devices()?)
    }

    pub fn index(&self) -> &Arc<EndpointIndex> {
        &self.index
    }

    pub fn action_table(&self) -> &ActionTable {
        &self.table
    }

    pub fn input_port(&self) -> &str {
        &self.input_port
    }

    pub fn output_port(&self) -> &str {
        &self.output_port
    }

    /// Handle that stops a running [`run`](Self::run) from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: self.shutdown_sender.clone(),
        }
    }

    /// Open both ports, sync the index and LEDs, then block in the receive loop.
    ///
    /// `init_done` is called once, after both connections are open and before
    /// the first message is received. Returns when the input closes or
    /// [`ShutdownHandle::shutdown`] is called. A missing port is an error.
    pub fn run<F: FnOnce()>(&self, init_done: F) -> Result<()> {
        let input = self.transport.open_input(&self.input_port).map_err(|e| {
            error!("Failed to open MIDI input '{}': {}", self.input_port, e);
            Error::from(e)
        })?;
        let output = self.transport.open_output(&self.output_port).map_err(|e| {
            error!("Failed to open MIDI output '{}': {}", self.output_port, e);
            Error::from(e)
        })?;
        info!(
            "Connected to MIDI input '{}' and output '{}'",
            self.input_port, self.output_port
        );

        let leds = Arc::new(LedFeedback::new(
            self.led_bindings.clone(),
            MidiLedWriter::new(output.clone(), self.led_channel),
        ));

        // Subscribe before the first refresh so no change slips in between.
        let notifications = self.server.subscribe()?;
        match self.index.refresh(self.server.as_ref()) {
            Ok(stats) => info!(
                "Indexed {} endpoints ({} unnamed, {} unreadable)",
                stats.indexed, stats.unnamed, stats.failed
            ),
            Err(e) => error!("Initial endpoint refresh failed: {}", e),
        }
        leds.refresh_all_leds(&self.index.snapshot());

        let (topology_stop, topology_stop_receiver) = bounded::<()>(1);
        let synchronizer = TopologySynchronizer::new(
            Arc::clone(&self.server),
            Arc::clone(&self.index),
            Arc::clone(&leds),
        );
        let topology = thread::Builder::new()
            .name("pamidi-topology".to_string())
            .spawn(move || synchronizer.run(&notifications, &topology_stop_receiver))?;

        init_done();

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.table),
            Arc::clone(&self.index),
            Arc::clone(&self.server),
        );
        dispatcher.run(&input, &self.shutdown_receiver);

        // Both loops must be gone before the connections close.
        drop(topology_stop);
        if topology.join().is_err() {
            warn!("Topology thread panicked");
        }
        input.close();
        output.close();
        info!("Bridge stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("input_port", &self.input_port)
            .field("output_port", &self.output_port)
            .field("led_channel", &self.led_channel)
            .field("bindings", &self.table.len())
            .field("index", &self.index)
            .finish()
    }
}

/// Stops a running bridge. Clone is cheap.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // A pending signal is already enough.
        let _ = self.sender.try_send(());
    }
}
