//! End-to-end tests: a bridge driven through in-process MIDI ports against
//! the in-memory audio server.

mod helpers;

use approx::assert_relative_eq;
use helpers::{example_leds, start_bridge, wait_until, PORT};
use pamidi::midi::{Error as MidiError, VirtualTransport};
use pamidi::prelude::*;
use pamidi::pulse::VOLUME_NORM;
use pamidi::PropertyValue;

fn speakers_volume() -> ActionBinding {
    ActionBinding::volume(
        EventPattern::control_change(0, 1),
        Target::new(EndpointCategory::PhysicalSink, "Speakers"),
    )
    .unwrap()
}

fn sentinel_volume() -> ActionBinding {
    ActionBinding::volume(
        EventPattern::control_change(0, 2),
        Target::new(EndpointCategory::PhysicalSink, "Sentinel"),
    )
    .unwrap()
}

fn firefox_mute() -> ActionBinding {
    ActionBinding::mute_toggle(
        EventPattern::note_on(0, 4),
        Target::new(EndpointCategory::PlaybackStream, "Firefox"),
    )
    .unwrap()
}

#[test]
fn test_full_scale_knob_sets_every_channel() {
    let server = Arc::new(MemoryServer::new());
    let speakers = server.add_sink("Speakers");
    let running = start_bridge(server.clone(), vec![speakers_volume()], LedBindings::new());

    running.send(ControlMessage::control_change(0, 1, 127));

    assert!(wait_until(|| !server.writes().is_empty()));
    let writes = server.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].path, speakers);
    assert_eq!(writes[0].value, PropertyValue::Volume(vec![65535, 65535]));
    running.stop().unwrap();
}

#[test]
fn test_half_scale_knob() {
    let server = Arc::new(MemoryServer::new());
    let speakers = server.add_sink("Speakers");
    let running = start_bridge(server.clone(), vec![speakers_volume()], LedBindings::new());

    running.send(ControlMessage::control_change(0, 1, 64));

    assert!(wait_until(|| !server.writes().is_empty()));
    let volume = server.volume_of(&speakers).unwrap();
    assert_eq!(volume, vec![33026, 33026]);
    assert_relative_eq!(
        volume[0] as f64 / VOLUME_NORM as f64,
        64.0 / 127.0,
        epsilon = 1e-4
    );
}

#[test]
fn test_missing_target_makes_no_write() {
    let server = Arc::new(MemoryServer::new());
    let sentinel = server.add_sink("Sentinel");
    let running = start_bridge(
        server.clone(),
        vec![speakers_volume(), sentinel_volume()],
        LedBindings::new(),
    );

    // Messages are handled in order, so the sentinel write marks the first as done.
    running.send(ControlMessage::control_change(0, 1, 127));
    running.send(ControlMessage::control_change(0, 2, 127));

    assert!(wait_until(|| !server.writes().is_empty()));
    let writes = server.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].path, sentinel);
}

#[test]
fn test_mute_toggle_round_trip_lights_mute_led() {
    let server = Arc::new(MemoryServer::new());
    let stream = server.add_playback_stream("Firefox");
    let running = start_bridge(server.clone(), vec![firefox_mute()], example_leds());

    running.send(ControlMessage::note_on(0, 4, 127));
    assert!(wait_until(|| server.mute_of(&stream) == Some(true)));
    assert!(wait_until(|| running.led(4) == Some(true)));

    running.send(ControlMessage::note_on(0, 4, 127));
    assert!(wait_until(|| server.mute_of(&stream) == Some(false)));
    assert!(wait_until(|| running.led(4) == Some(false)));
    assert_eq!(server.writes().len(), 2);
}

#[test]
fn test_startup_sweep_lights_present_names_only() {
    let server = Arc::new(MemoryServer::new());
    server.add_playback_stream("Firefox");
    server.add_source("Webcam C270 Mono");
    let running = start_bridge(server, Vec::new(), example_leds());

    assert!(wait_until(|| {
        let states = running.leds.note_states();
        states.get(&6) == Some(&true) && states.get(&15) == Some(&true)
    }));
    let states = running.leds.note_states();
    assert_eq!(states.get(&3), Some(&false));
    assert_eq!(states.get(&9), Some(&false));
    // Mute LEDs are left alone by the sweep.
    assert_eq!(states.get(&1), None);
    assert_eq!(states.get(&4), None);
}

#[test]
fn test_appearance_and_removal_follow_topology() {
    let server = Arc::new(MemoryServer::new());
    let running = start_bridge(server.clone(), Vec::new(), example_leds());
    let index = running.bridge.index().clone();

    let stream = server.add_playback_stream("Firefox");
    assert!(wait_until(|| running.led(6) == Some(true)));
    assert!(wait_until(|| {
        index.lookup(EndpointCategory::PlaybackStream, "Firefox") == vec![stream.clone()]
    }));

    server.remove(&stream);
    assert!(wait_until(|| running.led(6) == Some(false)));
    assert!(wait_until(|| running.led(4) == Some(false)));
    assert!(wait_until(|| index.snapshot().is_empty()));
}

#[test]
fn test_second_stream_keeps_activity_led() {
    let server = Arc::new(MemoryServer::new());
    let first = server.add_playback_stream("Firefox");
    server.add_playback_stream("Firefox");
    let running = start_bridge(server.clone(), Vec::new(), example_leds());
    let index = running.bridge.index().clone();
    assert!(wait_until(|| running.led(6) == Some(true)));

    server.remove(&first);
    assert!(wait_until(|| {
        index
            .lookup(EndpointCategory::PlaybackStream, "Firefox")
            .len()
            == 1
    }));
    assert_eq!(running.led(6), Some(true));
    assert_eq!(running.led(4), None);
}

#[test]
fn test_missing_port_is_fatal() {
    let transport = Arc::new(VirtualTransport::new());
    transport.add_output(PORT);
    let bridge = Bridge::builder()
        .transport(transport)
        .server(Arc::new(MemoryServer::new()))
        .ports(PORT)
        .build()
        .unwrap();

    let mut initialized = false;
    let result = bridge.run(|| initialized = true);

    assert!(matches!(
        result,
        Err(Error::Midi(MidiError::PortNotFound(_)))
    ));
    assert!(!initialized);
}

#[test]
fn test_run_ends_when_input_closes() {
    let server = Arc::new(MemoryServer::new());
    let mut running = start_bridge(server, Vec::new(), LedBindings::new());

    running.close_input();
    assert!(running.join().is_ok());
}

#[test]
fn test_shutdown_stops_bridge() {
    let server = Arc::new(MemoryServer::new());
    server.add_sink("Speakers");
    let running = start_bridge(server, vec![speakers_volume()], LedBindings::new());
    assert!(running.stop().is_ok());
}

#[test]
fn test_list_devices() {
    let transport = Arc::new(VirtualTransport::new());
    transport.add_input(PORT);
    transport.add_output("LED Out");
    let bridge = Bridge::builder()
        .transport(transport)
        .server(Arc::new(MemoryServer::new()))
        .ports(PORT)
        .build()
        .unwrap();

    let devices = bridge.list_devices().unwrap();
    assert_eq!(devices.inputs, vec![PORT.to_string()]);
    assert_eq!(devices.outputs, vec!["LED Out".to_string()]);
}
