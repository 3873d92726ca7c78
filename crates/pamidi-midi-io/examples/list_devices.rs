use pamidi_midi_io::{MidiTransport, MidirTransport};

fn main() {
    tracing_subscriber::fmt::init();

    let transport = MidirTransport::new("list-devices");
    let devices = match transport.list_devices() {
        Ok(devices) => devices,
        Err(e) => {
            eprintln!("failed to list MIDI devices: {}", e);
            return;
        }
    };

    println!("=== MIDI Input Devices ===");
    if devices.inputs.is_empty() {
        println!("  (none found)");
    }
    for (i, name) in devices.inputs.iter().enumerate() {
        println!("  [{}] {}", i, name);
    }

    println!("\n=== MIDI Output Devices ===");
    if devices.outputs.is_empty() {
        println!("  (none found)");
    }
    for (i, name) in devices.outputs.iter().enumerate() {
        println!("  [{}] {}", i, name);
    }
}
