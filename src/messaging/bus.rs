use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use log::debug;

use super::SynthMessage;
use crate::core::audio::{AudioClock, Params};
use crate::core::synth::NoteRegistry;

/// MessageBus carries live input to the scheduling thread
#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: Sender<SynthMessage>,
    receiver: Receiver<SynthMessage>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        MessageBus { sender, receiver }
    }

    /// Get a sender that can be cloned and handed to input handlers
    pub fn sender(&self) -> Sender<SynthMessage> {
        self.sender.clone()
    }

    pub fn send(&self, msg: SynthMessage) -> Result<(), SendError<SynthMessage>> {
        self.sender.send(msg)
    }

    /// Apply up to `max_messages` pending messages. Note messages are stamped
    /// with the current audio clock. Returns how many were handled.
    pub fn process_messages(&self, max_messages: usize, registry: &NoteRegistry, clock: &AudioClock, params: &Params) -> usize {
        let mut count = 0;

        while count < max_messages {
            let Ok(msg) = self.receiver.try_recv() else {
                break;
            };
            count += 1;
            handle_message(msg, registry, clock.seconds(), params);
        }

        count
    }
}

fn handle_message(msg: SynthMessage, registry: &NoteRegistry, time: f64, params: &Params) {
    match msg {
        SynthMessage::NoteOn { note, channel } => {
            registry.note_on(note, channel, time);
        },
        SynthMessage::NoteOff { note } => {
            registry.note_off(note, time);
        },
        SynthMessage::AllNotesOff => {
            let released = registry.release_all(time);
            debug!("all notes off ({released} released)");
        },
        SynthMessage::SetCutoff(cutoff) => {
            let cutoff = params.cutoff.set(cutoff);
            debug!("cutoff set to {cutoff:.0} Hz");
        },
        SynthMessage::SetVolume(volume) => {
            let volume = params.volume.set(volume);
            debug!("volume set to {volume:.2}");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synth::Transition;

    fn setup() -> (MessageBus, NoteRegistry, AudioClock, Params) {
        (MessageBus::new(), NoteRegistry::new(), AudioClock::new(100), Params::default())
    }

    #[test]
    fn note_messages_follow_registry_rules() {
        let (bus, registry, clock, params) = setup();
        bus.send(SynthMessage::NoteOn { note: 60, channel: 2 }).unwrap();
        assert_eq!(bus.process_messages(10, &registry, &clock, &params), 1);
        assert!(registry.contains(60));

        clock.advance(50);
        bus.send(SynthMessage::NoteOff { note: 60 }).unwrap();
        bus.send(SynthMessage::NoteOff { note: 61 }).unwrap();
        assert_eq!(bus.process_messages(10, &registry, &clock, &params), 2);

        let notes = registry.snapshot();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].off, 0.5);
        assert!(notes[0].is_released());
        assert_eq!(registry.note_on(60, 2, 1.0), Transition::Retriggered);
    }

    #[test]
    fn respects_message_limit_without_dropping() {
        let (bus, registry, clock, params) = setup();
        for note in 0..5 {
            bus.send(SynthMessage::NoteOn { note, channel: 1 }).unwrap();
        }
        assert_eq!(bus.process_messages(3, &registry, &clock, &params), 3);
        assert_eq!(registry.len(), 3);
        assert_eq!(bus.process_messages(3, &registry, &clock, &params), 2);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn all_notes_off_releases_held_notes() {
        let (bus, registry, clock, params) = setup();
        let sender = bus.sender();
        sender.send(SynthMessage::NoteOn { note: 40, channel: 2 }).unwrap();
        sender.send(SynthMessage::NoteOn { note: 41, channel: 2 }).unwrap();
        sender.send(SynthMessage::AllNotesOff).unwrap();
        bus.process_messages(usize::MAX, &registry, &clock, &params);
        assert!(registry.snapshot().iter().all(|n| !n.is_sounding()));
    }

    #[test]
    fn knob_messages_are_clamped() {
        let (bus, registry, clock, params) = setup();
        bus.send(SynthMessage::SetCutoff(50_000.0)).unwrap();
        bus.send(SynthMessage::SetVolume(0.25)).unwrap();
        bus.process_messages(10, &registry, &clock, &params);
        assert_eq!(params.cutoff.get(), 20000.0);
        assert_eq!(params.volume.get(), 0.25);
        assert!(registry.is_empty());
    }
}
