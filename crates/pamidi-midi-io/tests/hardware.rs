//! Hardware tests against a loopback MIDI port.
//!
//! Requires a loopback device whose input and output share a name (IAC Driver
//! on macOS, `snd-virmidi` on Linux). Set `PAMIDI_LOOPBACK_PORT` to its name.
//! All tests are `#[ignore]` so CI doesn't fail without hardware.
//!
//! Run with:
//!   PAMIDI_LOOPBACK_PORT="IAC Driver Bus 1" cargo test -p pamidi-midi-io --test hardware -- --ignored --test-threads=1

#![cfg(feature = "midi-io")]

use pamidi_midi_io::{ControlMessage, MidiTransport, MidirTransport};
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(200);

fn loopback_port() -> String {
    std::env::var("PAMIDI_LOOPBACK_PORT").unwrap_or_else(|_| "IAC Driver Bus 1".to_string())
}

#[test]
#[ignore]
fn test_loopback_note_on() {
    let transport = MidirTransport::new("pamidi-hardware-test");
    let port = loopback_port();

    let input = transport.open_input(&port).unwrap();
    let output = transport.open_output(&port).unwrap();
    thread::sleep(SETTLE);

    output.send_note_on(0, 60, 127);
    let received = input.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(received, Some(ControlMessage::note_on(0, 60, 127)));

    output.close();
    input.close();
}

#[test]
#[ignore]
fn test_loopback_control_change() {
    let transport = MidirTransport::new("pamidi-hardware-test");
    let port = loopback_port();

    let input = transport.open_input(&port).unwrap();
    let output = transport.open_output(&port).unwrap();
    thread::sleep(SETTLE);

    output.send_cc(3, 1, 64);
    let received = input.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(received, Some(ControlMessage::control_change(3, 1, 64)));
}

#[test]
#[ignore]
fn test_list_devices_includes_loopback() {
    let transport = MidirTransport::new("pamidi-hardware-test");
    let devices = transport.list_devices().unwrap();
    let port = loopback_port();
    assert!(devices.inputs.contains(&port));
    assert!(devices.outputs.contains(&port));
}
