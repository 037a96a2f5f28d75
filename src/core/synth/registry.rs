//! The shared set of sounding notes.
//!
//! Every read and write goes through the internal lock, so there is no way to
//! touch the notes without holding it. The scheduling thread mutates notes with
//! `note_on` / `note_off` / `apply_batch`; the render thread sums them with
//! `mix`, which also reclaims notes that have fully faded out.

use log::trace;
use parking_lot::Mutex;
use crate::core::oscillator::Note;

const INITIAL_CAPACITY: usize = 128;

// Commands stamped with the same clock time keep their order by this much, so
// a note struck and released in one batch still reads as released.
const ORDER_GAP: f64 = 1e-9;

/// A state change requested by a score event or a live input message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteCommand {
    On { id: i32, channel: usize },
    Off { id: i32 },
}

/// What a command did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Created,
    Retriggered,
    Released,
    Ignored,
}

#[derive(Debug)]
pub struct NoteRegistry {
    notes: Mutex<Vec<Note>>,
}

impl Default for NoteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self {
            notes: Mutex::new(Vec::with_capacity(INITIAL_CAPACITY)),
        }
    }

    pub fn note_on(&self, id: i32, channel: usize, time: f64) -> Transition {
        let transition = apply(&mut self.notes.lock(), NoteCommand::On { id, channel }, time);
        log_transition(id, transition, time);
        transition
    }

    pub fn note_off(&self, id: i32, time: f64) -> Transition {
        let transition = apply(&mut self.notes.lock(), NoteCommand::Off { id }, time);
        log_transition(id, transition, time);
        transition
    }

    /// Apply several commands under a single lock acquisition, all stamped
    /// with the same time. Returns how many changed the registry.
    pub fn apply_batch<I>(&self, commands: I, time: f64) -> usize
    where
        I: IntoIterator<Item = NoteCommand>,
    {
        let changed = {
            let mut notes = self.notes.lock();
            commands
                .into_iter()
                .map(|command| apply(&mut notes, command, time))
                .filter(|t| *t != Transition::Ignored)
                .count()
        };
        trace!("{changed} note commands applied at {time:.4}");
        changed
    }

    /// Release every held note. Returns how many were released.
    pub fn release_all(&self, time: f64) -> usize {
        let mut notes = self.notes.lock();
        let mut released = 0;
        for note in notes.iter_mut().filter(|n| n.is_sounding()) {
            note.off = time.max(note.on + ORDER_GAP);
            released += 1;
        }
        released
    }

    /// Sum `voice(note)` over every note, then drop the notes whose voice
    /// reported finished after they were released.
    ///
    /// Runs entirely under the lock; `voice` must be cheap and must not block.
    pub(crate) fn mix<F>(&self, mut voice: F) -> f64
    where
        F: FnMut(&Note) -> (f64, bool),
    {
        let mut notes = self.notes.lock();
        let mut mixed = 0.0;

        for note in notes.iter_mut() {
            let (sound, finished) = voice(note);
            mixed += sound;
            if finished && note.is_released() {
                note.active = false;
            }
        }

        notes.retain(|n| n.active);
        mixed
    }

    pub fn len(&self) -> usize {
        self.notes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.lock().is_empty()
    }

    pub fn contains(&self, id: i32) -> bool {
        self.notes.lock().iter().any(|n| n.id == id)
    }

    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.lock().clone()
    }
}

// Called with the lock held: no logging in here.
fn apply(notes: &mut Vec<Note>, command: NoteCommand, time: f64) -> Transition {
    match command {
        NoteCommand::On { id, channel } => match notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                note.on = time.max(note.off + ORDER_GAP);
                Transition::Retriggered
            },
            None => {
                notes.push(Note::new(id, channel, time));
                Transition::Created
            },
        },
        NoteCommand::Off { id } => match notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                note.off = time.max(note.on + ORDER_GAP);
                Transition::Released
            },
            None => Transition::Ignored,
        },
    }
}

fn log_transition(id: i32, transition: Transition, time: f64) {
    match transition {
        Transition::Created => trace!("note {id} on at {time:.4}"),
        Transition::Retriggered => trace!("retrigger note {id} at {time:.4}"),
        Transition::Released => trace!("release note {id} at {time:.4}"),
        Transition::Ignored => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_creates_once() {
        let registry = NoteRegistry::new();
        assert_eq!(registry.note_on(60, 2, 1.0), Transition::Created);
        assert_eq!(registry.note_on(60, 2, 1.5), Transition::Retriggered);
        assert_eq!(registry.len(), 1);

        let notes = registry.snapshot();
        assert_eq!(notes[0].on, 1.5);
        assert!(notes[0].active);
        assert_eq!(notes[0].channel, 2);
    }

    #[test]
    fn retrigger_keeps_off_time() {
        let registry = NoteRegistry::new();
        registry.note_on(60, 1, 1.0);
        registry.note_off(60, 2.0);
        registry.note_on(60, 1, 3.0);
        let note = registry.snapshot()[0];
        assert_eq!(note.off, 2.0);
        assert_eq!(note.on, 3.0);
        assert!(note.is_sounding());
    }

    #[test]
    fn retrigger_does_not_change_channel() {
        let registry = NoteRegistry::new();
        registry.note_on(60, 1, 1.0);
        registry.note_on(60, 2, 2.0);
        assert_eq!(registry.snapshot()[0].channel, 1);
    }

    #[test]
    fn unmatched_note_off_is_ignored() {
        let registry = NoteRegistry::new();
        assert_eq!(registry.note_off(42, 1.0), Transition::Ignored);
        assert!(registry.is_empty());
    }

    #[test]
    fn batch_counts_effective_commands() {
        let registry = NoteRegistry::new();
        let changed = registry.apply_batch(
            [
                NoteCommand::On { id: 60, channel: 2 },
                NoteCommand::Off { id: 61 },
                NoteCommand::On { id: 64, channel: 2 },
                NoteCommand::Off { id: 60 },
            ],
            0.5,
        );
        assert_eq!(changed, 3);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(64));
    }

    #[test]
    fn mix_removes_only_released_finished_notes() {
        let registry = NoteRegistry::new();
        registry.note_on(1, 2, 1.0);
        registry.note_on(2, 2, 1.0);
        registry.note_off(2, 2.0);

        // Both report finished, but note 1 was never released.
        let sum = registry.mix(|_| (0.25, true));
        assert_eq!(sum, 0.5);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(1));
    }

    #[test]
    fn same_instant_release_still_counts() {
        let registry = NoteRegistry::new();
        registry.apply_batch([NoteCommand::On { id: 7, channel: 2 }, NoteCommand::Off { id: 7 }], 0.0);
        let note = registry.snapshot()[0];
        assert!(note.is_released());

        registry.note_on(7, 2, note.off);
        assert!(registry.snapshot()[0].is_sounding());

        registry.mix(|_| (0.0, true));
        assert_eq!(registry.len(), 1);
        registry.note_off(7, 0.0);
        registry.mix(|_| (0.0, true));
        assert!(registry.is_empty());
    }

    #[test]
    fn release_all_releases_only_held_notes() {
        let registry = NoteRegistry::new();
        registry.note_on(1, 2, 1.0);
        registry.note_on(2, 2, 1.0);
        registry.note_off(2, 1.5);
        assert_eq!(registry.release_all(3.0), 1);
        assert!(registry.snapshot().iter().all(|n| n.is_released()));
    }
}
