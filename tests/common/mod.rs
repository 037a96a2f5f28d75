//! Builders for small in-memory MIDI files

#![allow(dead_code)]

use rtsynth::core::score::{encode_vlq, HEADER_TAG, TRACK_TAG};

pub fn event(delta: u32, bytes: &[u8]) -> Vec<u8> {
    let mut out = encode_vlq(delta);
    out.extend_from_slice(bytes);
    out
}

pub fn note_on(delta: u32, note: u8) -> Vec<u8> {
    event(delta, &[0x90, note, 100])
}

pub fn note_off(delta: u32, note: u8) -> Vec<u8> {
    event(delta, &[0x80, note, 0])
}

pub fn end_of_track() -> Vec<u8> {
    event(0, &[0xFF, 0x2F, 0x00])
}

/// A format 1 file with one chunk per entry of `tracks`
pub fn midi_file(tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = HEADER_TAG.to_vec();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&96u16.to_be_bytes());
    for body in tracks {
        bytes.extend_from_slice(&TRACK_TAG);
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
    }
    bytes
}

/// Two empty leading tracks so the notes land on channel 2
pub fn bell_score(body: Vec<u8>) -> Vec<u8> {
    midi_file(&[end_of_track(), end_of_track(), body])
}
