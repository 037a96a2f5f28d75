use crossbeam_channel::Sender;
use log::{debug, info, warn};
use midir::{MidiInput, MidiInputConnection};

use crate::error::{Result, SynthError};
use crate::messaging::SynthMessage;

const CLIENT_NAME: &str = "rtsynth input";
const CC_ALL_NOTES_OFF: u8 = 123;

/// Handles note input from a connected MIDI port
pub struct MidiInputHandler {
    connection: Option<MidiInputConnection<()>>,
    port_name: Option<String>,
    channel: usize,
    message_sender: Sender<SynthMessage>,
}

impl MidiInputHandler {
    /// Notes received from the port are played on `channel`.
    pub fn new(message_sender: Sender<SynthMessage>, channel: usize) -> Self {
        Self {
            connection: None,
            port_name: None,
            channel,
            message_sender,
        }
    }

    /// Names of all available MIDI input ports
    pub fn list_ports() -> Result<Vec<String>> {
        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| SynthError::Midi(e.to_string()))?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect())
    }

    /// Connect to the first available port and return its name.
    pub fn connect_first(&mut self) -> Result<String> {
        let first = Self::list_ports()?
            .into_iter()
            .next()
            .ok_or_else(|| SynthError::Midi("no MIDI input ports available".to_string()))?;
        self.connect_to_port(&first)?;
        Ok(first)
    }

    /// Connect to a specific MIDI input port by name
    pub fn connect_to_port(&mut self, port_name: &str) -> Result<()> {
        self.disconnect();

        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| SynthError::Midi(e.to_string()))?;
        let port = midi_in
            .ports()
            .into_iter()
            .find(|port| midi_in.port_name(port).map(|name| name == port_name).unwrap_or(false))
            .ok_or_else(|| SynthError::Midi(format!("MIDI port '{port_name}' not found")))?;

        let sender = self.message_sender.clone();
        let channel = self.channel;
        let connection = midi_in
            .connect(
                &port,
                "rtsynth-read-input",
                move |_stamp, message, _| {
                    if let Some(msg) = translate(message, channel) {
                        if sender.send(msg).is_err() {
                            debug!("dropping MIDI input, bus closed");
                        }
                    }
                },
                (),
            )
            .map_err(|e| SynthError::Midi(e.to_string()))?;

        info!("connected to MIDI input '{port_name}'");
        self.connection = Some(connection);
        self.port_name = Some(port_name.to_string());
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            if let Some(name) = self.port_name.take() {
                info!("disconnected from MIDI input '{name}'");
            }
        }
    }
}

impl Drop for MidiInputHandler {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Convert raw MIDI bytes into a bus message. Notes are played on `channel`
/// whatever channel they arrived on. A note-on with velocity 0 is a note-off.
pub fn translate(message: &[u8], channel: usize) -> Option<SynthMessage> {
    let (&status, data) = message.split_first()?;

    match status & 0xF0 {
        0x80 => {
            let note = *data.first()?;
            Some(SynthMessage::NoteOff { note: i32::from(note) })
        },
        0x90 => {
            let (note, velocity) = (*data.first()?, *data.get(1)?);
            let note = i32::from(note);
            if velocity == 0 {
                Some(SynthMessage::NoteOff { note })
            } else {
                Some(SynthMessage::NoteOn { note, channel })
            }
        },
        0xB0 => {
            let (control, value) = (*data.first()?, *data.get(1)?);
            match control {
                7 => Some(SynthMessage::SetVolume(f64::from(value) / 127.0)),
                74 => Some(SynthMessage::SetCutoff(f64::from(value) / 127.0 * 20000.0)),
                CC_ALL_NOTES_OFF => Some(SynthMessage::AllNotesOff),
                _ => None,
            }
        },
        0x80..=0xF0 => None,
        _ => {
            warn!("ignoring MIDI message without status byte: {message:02x?}");
            None
        },
    }
}
