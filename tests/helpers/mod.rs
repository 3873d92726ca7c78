//! Test helpers and fixtures for pamidi integration tests
//!
//! A bridge runs on its own thread against in-process MIDI ports and the
//! in-memory audio server, so no controller or sound server is needed.
//! Effects land asynchronously; poll with [`wait_until`].

#![allow(dead_code)]

use crossbeam_channel::{bounded, Sender};
use pamidi::midi::{VirtualOutput, VirtualTransport};
use pamidi::prelude::*;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Port name used for both directions.
pub const PORT: &str = "Test Controller";

/// Upper bound for anything the bridge does asynchronously.
pub const WAIT: Duration = Duration::from_secs(2);

/// Route bridge logs through the test harness output.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Poll `condition` until it holds or [`WAIT`] elapses.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// A bridge running on a background thread.
pub struct RunningBridge {
    pub server: Arc<MemoryServer>,
    pub bridge: Arc<Bridge>,
    /// Feeds the bridge's MIDI input until closed.
    controller: Option<Sender<ControlMessage>>,
    /// Everything the bridge wrote to the controller.
    pub leds: VirtualOutput,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl RunningBridge {
    pub fn send(&self, message: ControlMessage) {
        self.controller
            .as_ref()
            .expect("controller already closed")
            .send(message)
            .expect("bridge input closed");
    }

    /// Disconnect the controller, as if it were unplugged.
    pub fn close_input(&mut self) {
        self.controller = None;
    }

    /// Wait for the bridge to return on its own.
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join().expect("bridge thread panicked"),
            None => Ok(()),
        }
    }

    /// Last on/off state of `led`, if it was ever written.
    pub fn led(&self, led: u8) -> Option<bool> {
        self.leds.note_states().get(&led).copied()
    }

    pub fn stop(mut self) -> Result<()> {
        self.shutdown.shutdown();
        match self.thread.take() {
            Some(thread) => thread.join().expect("bridge thread panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for RunningBridge {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Start a bridge on `server` and wait for its init signal.
pub fn start_bridge(
    server: Arc<MemoryServer>,
    bindings: Vec<ActionBinding>,
    leds: LedBindings,
) -> RunningBridge {
    init_logging();
    let transport = VirtualTransport::new();
    let controller = transport.add_input(PORT);
    let led_output = transport.add_output(PORT);

    let bridge = Arc::new(
        Bridge::builder()
            .transport(Arc::new(transport))
            .server(server.clone())
            .ports(PORT)
            .actions(bindings)
            .leds(leds)
            .build()
            .expect("Failed to build test bridge"),
    );
    let shutdown = bridge.shutdown_handle();

    let (ready_sender, ready_receiver) = bounded::<()>(1);
    let runner = Arc::clone(&bridge);
    let thread = thread::spawn(move || {
        runner.run(move || {
            let _ = ready_sender.send(());
        })
    });
    ready_receiver
        .recv_timeout(WAIT)
        .expect("bridge did not finish initialization");

    RunningBridge {
        server,
        bridge,
        controller: Some(controller),
        leds: led_output,
        shutdown,
        thread: Some(thread),
    }
}

/// The LED layout of the example configuration.
pub fn example_leds() -> LedBindings {
    LedBindings::new()
        .activity("spotify", 3)
        .activity("Firefox", 6)
        .activity("Chromium", 9)
        .activity("Webcam C270 Mono", 15)
        .mute("spotify", 1)
        .mute("Firefox", 4)
        .mute("Chromium", 7)
        .mute("Webcam C270 Mono", 13)
}
