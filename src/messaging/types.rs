/// Messages from live input sources to the scheduling thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthMessage {
    NoteOn { note: i32, channel: usize },
    NoteOff { note: i32 },
    AllNotesOff,
    SetCutoff(f64),
    SetVolume(f64),
}
