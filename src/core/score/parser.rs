//! Standard MIDI file decoding into per-track note queues.
//!
//! Only note-on and note-off events are kept. Every other event is consumed
//! and dropped; meta events are logged. Running status is not supported, and a
//! note-on with velocity 0 stays a note-on.
//!
//! Parsing never fails: on malformed or truncated input it stops and keeps
//! the tracks that were completed before the failure.

use std::collections::VecDeque;
use std::path::Path;
use log::{debug, info, warn};
use super::reader::{ByteReader, ParseError};

pub const HEADER_TAG: [u8; 4] = *b"MThd";
pub const TRACK_TAG: [u8; 4] = *b"MTrk";

const META_END_OF_TRACK: u8 = 0x2F;
const META_TRACK_NAME: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// A parsed note event. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Delta ticks read for this event
    pub delta: u32,
    /// Running tick total of the track up to and including this event
    pub ticks: u64,
    /// Position of the owning track among parsed tracks
    pub track: usize,
    /// Channel nibble of the status byte (informational)
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    pub kind: EventKind,
}

impl MidiEvent {
    pub fn is_note_on(&self) -> bool {
        self.kind == EventKind::NoteOn
    }
}

/// FIFO of note events belonging to one track chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTrack {
    pub index: usize,
    pub name: Option<String>,
    events: VecDeque<MidiEvent>,
    last_event_time: f64,
}

impl ChannelTrack {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            name: None,
            events: VecDeque::new(),
            last_event_time: 0.0,
        }
    }

    pub fn push(&mut self, event: MidiEvent) {
        self.events.push_back(event);
    }

    pub fn front(&self) -> Option<&MidiEvent> {
        self.events.front()
    }

    /// Pop the oldest event if its tick stamp is at or before `elapsed`.
    pub fn pop_due(&mut self, elapsed: f64) -> Option<MidiEvent> {
        let due = self.events.front().is_some_and(|e| e.ticks as f64 <= elapsed);
        if !due {
            return None;
        }
        let event = self.events.pop_front()?;
        self.last_event_time = event.ticks as f64;
        Some(event)
    }

    /// Tick stamp of the most recently popped event
    pub fn last_event_time(&self) -> f64 {
        self.last_event_time
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.events.iter()
    }
}

/// A parsed score: header fields plus the tracks that decoded completely
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub format: u16,
    pub declared_tracks: u16,
    /// Ticks per quarter note; kept for display only
    pub division: u16,
    pub tracks: Vec<ChannelTrack>,
}

impl Score {
    /// Parse a score from memory. Stops quietly at the first malformed byte.
    pub fn parse(data: &[u8]) -> Score {
        let mut score = Score::default();
        let mut reader = ByteReader::new(data);
        if let Err(err) = parse_into(&mut reader, &mut score) {
            warn!(
                "Score parsing stopped: {} ({} of {} tracks usable)",
                err,
                score.tracks.len(),
                score.declared_tracks
            );
        }
        score
    }

    /// Read and parse a score file. An unreadable file yields an empty score.
    pub fn from_file(path: impl AsRef<Path>) -> Score {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(data) => Score::parse(&data),
            Err(err) => {
                warn!("Could not read score {}: {}", path.display(), err);
                Score::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(ChannelTrack::is_empty)
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(ChannelTrack::len).sum()
    }

    pub fn into_tracks(self) -> Vec<ChannelTrack> {
        self.tracks
    }
}

fn parse_into(reader: &mut ByteReader<'_>, score: &mut Score) -> Result<(), ParseError> {
    let offset = reader.position();
    let tag = reader.tag()?;
    if tag != HEADER_TAG {
        return Err(ParseError::BadTag { offset, tag });
    }
    let header_len = reader.u32_be()? as usize;
    let mut header = ByteReader::at_offset(reader.take(header_len)?, reader.position() - header_len);
    score.format = header.u16_be()?;
    score.declared_tracks = header.u16_be()?;
    score.division = header.u16_be()?;
    debug!(
        "Score header: format {}, {} tracks, division {}",
        score.format, score.declared_tracks, score.division
    );

    while score.tracks.len() < usize::from(score.declared_tracks) {
        if reader.is_empty() {
            return Err(ParseError::UnexpectedEof(reader.position()));
        }
        let tag = reader.tag()?;
        let declared = reader.u32_be()? as usize;
        let start = reader.position();
        let body = reader.take(declared.min(reader.remaining()))?;

        if tag != TRACK_TAG {
            debug!("Skipping {} byte chunk {:?}", body.len(), String::from_utf8_lossy(&tag));
            continue;
        }

        let mut chunk = ByteReader::at_offset(body, start);
        let track = parse_track(&mut chunk, score.tracks.len())?;
        debug!("Track {} parsed: {} note events", track.index, track.len());
        score.tracks.push(track);
    }

    Ok(())
}

fn parse_track(reader: &mut ByteReader<'_>, index: usize) -> Result<ChannelTrack, ParseError> {
    let mut track = ChannelTrack::new(index);
    let mut ticks: u64 = 0;

    while !reader.is_empty() {
        let delta = reader.vlq()?;
        ticks += u64::from(delta);

        let offset = reader.position();
        let status = reader.u8()?;
        match status {
            0x80..=0x9F => {
                let note = reader.u8()?;
                let velocity = reader.u8()?;
                let kind = if status < 0x90 { EventKind::NoteOff } else { EventKind::NoteOn };
                track.push(MidiEvent {
                    delta,
                    ticks,
                    track: index,
                    channel: status & 0x0F,
                    note,
                    velocity,
                    kind,
                });
            },
            // Aftertouch, control change, pitch bend
            0xA0..=0xBF | 0xE0..=0xEF => reader.skip(2)?,
            // Program change, channel pressure
            0xC0..=0xDF => reader.skip(1)?,
            0xF0 | 0xF7 => {
                let len = reader.vlq()? as usize;
                reader.skip(len)?;
                debug!("SysEx: {} bytes", len);
            },
            0xFF => {
                let kind = reader.u8()?;
                let len = reader.vlq()? as usize;
                let payload = reader.take(len)?;
                if kind == META_END_OF_TRACK {
                    return Ok(track);
                }
                handle_meta(&mut track, kind, payload);
            },
            0x00..=0x7F => return Err(ParseError::MissingStatus { offset, byte: status }),
            _ => return Err(ParseError::UnsupportedStatus { offset, byte: status }),
        }
    }

    debug!("Track {} has no end-of-track event", index);
    Ok(track)
}

fn handle_meta(track: &mut ChannelTrack, kind: u8, payload: &[u8]) {
    let text = || String::from_utf8_lossy(payload).into_owned();
    match kind {
        0x01 => debug!("Text: {}", text()),
        0x02 => debug!("Copyright: {}", text()),
        META_TRACK_NAME => {
            let name = text();
            info!("Track {}: {}", track.index, name);
            track.name = Some(name);
        },
        0x04 => debug!("Instrument: {}", text()),
        0x05 => debug!("Lyric: {}", text()),
        0x06 => debug!("Marker: {}", text()),
        0x07 => debug!("Cue: {}", text()),
        0x20 => debug!("Channel prefix: {:?}", payload.first()),
        0x51 if payload.len() >= 3 => {
            let micros = u32::from_be_bytes([0, payload[0], payload[1], payload[2]]);
            debug!("Set tempo: {} us per quarter note", micros);
        },
        0x54 => debug!("SMPTE offset: {:?}", payload),
        0x58 if payload.len() >= 4 => debug!(
            "Time signature: {}/{} clocks per tick {} 32nds per 24 clocks {}",
            payload[0],
            1u32 << payload[1].min(31),
            payload[2],
            payload[3]
        ),
        0x59 if payload.len() >= 2 => {
            debug!("Key signature: {} minor: {}", payload[0] as i8, payload[1] != 0)
        },
        _ => debug!("Unknown meta event {:#04x} ({} bytes)", kind, payload.len()),
    }
}
