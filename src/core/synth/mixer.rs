use std::sync::Arc;
use crate::core::audio::SampleSource;
use super::instrument::Instrument;
use super::registry::NoteRegistry;

/// Default gain applied to the summed output
pub const DEFAULT_MASTER_GAIN: f64 = 0.2;

/// An instrument together with the gain it is mixed at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub instrument: Instrument,
    pub gain: f64,
}

/// Which instrument plays which note channel.
///
/// Channels are score track positions, not MIDI channel nibbles.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMap {
    voices: Vec<Option<Voice>>,
}

impl Default for ChannelMap {
    fn default() -> Self {
        let mut map = Self::silent();
        map.assign(1, Instrument::Harmonica, 0.5);
        map.assign(2, Instrument::Bell, 1.0);
        map
    }
}

impl ChannelMap {
    pub fn silent() -> Self {
        Self { voices: Vec::new() }
    }

    pub fn assign(&mut self, channel: usize, instrument: Instrument, gain: f64) {
        if self.voices.len() <= channel {
            self.voices.resize(channel + 1, None);
        }
        self.voices[channel] = Some(Voice { instrument, gain });
    }

    pub fn voice(&self, channel: usize) -> Option<Voice> {
        self.voices.get(channel).copied().flatten()
    }
}

/// Render entry point called by the audio side
pub struct Mixer {
    registry: Arc<NoteRegistry>,
    channels: ChannelMap,
    master_gain: f64,
}

impl Mixer {
    pub fn new(registry: Arc<NoteRegistry>) -> Self {
        Self::with_channels(registry, ChannelMap::default(), DEFAULT_MASTER_GAIN)
    }

    pub fn with_channels(registry: Arc<NoteRegistry>, channels: ChannelMap, master_gain: f64) -> Self {
        Self {
            registry,
            channels,
            master_gain,
        }
    }

    /// Mixed sample of all registered notes at `time`. Finished, released
    /// notes are removed as a side effect.
    pub fn render(&self, time: f64) -> f64 {
        let channels = &self.channels;
        let mixed = self.registry.mix(|note| match channels.voice(note.channel) {
            Some(voice) => {
                let (sound, finished) = voice.instrument.render(time, note);
                (sound * voice.gain, finished)
            },
            // Unmapped channels are silent and can be reclaimed once released.
            None => (0.0, true),
        });
        mixed * self.master_gain
    }
}

impl SampleSource for Mixer {
    fn sample(&self, _channel: usize, time: f64) -> f64 {
        self.render(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_map_is_positional() {
        let map = ChannelMap::default();
        assert_eq!(map.voice(0), None);
        assert_eq!(map.voice(1).map(|v| v.instrument), Some(Instrument::Harmonica));
        assert_eq!(map.voice(1).map(|v| v.gain), Some(0.5));
        assert_eq!(map.voice(2).map(|v| v.instrument), Some(Instrument::Bell));
        assert_eq!(map.voice(3), None);
    }

    #[test]
    fn empty_registry_renders_silence() {
        let mixer = Mixer::new(Arc::new(NoteRegistry::new()));
        assert_eq!(mixer.render(1.0), 0.0);
    }

    #[test]
    fn applies_master_gain() {
        let registry = Arc::new(NoteRegistry::new());
        registry.note_on(60, 2, 0.0);
        let mixer = Mixer::new(Arc::clone(&registry));
        let time = 0.2;
        let note = registry.snapshot()[0];
        let (expected, _) = Instrument::Bell.render(time, &note);
        assert_abs_diff_eq!(mixer.render(time), expected * DEFAULT_MASTER_GAIN, epsilon = 1e-12);
    }

    #[test]
    fn unmapped_channel_is_silent_and_reclaimed_after_release() {
        let registry = Arc::new(NoteRegistry::new());
        registry.note_on(60, 7, 0.0);
        let mixer = Mixer::new(Arc::clone(&registry));
        assert_eq!(mixer.render(0.5), 0.0);
        assert_eq!(registry.len(), 1);
        registry.note_off(60, 1.0);
        mixer.render(1.0);
        assert!(registry.is_empty());
    }

    #[test]
    fn released_note_is_removed_after_fade() {
        let registry = Arc::new(NoteRegistry::new());
        registry.note_on(60, 1, 0.0);
        registry.note_off(60, 1.0);
        let mixer = Mixer::new(Arc::clone(&registry));
        mixer.render(1.05);
        assert_eq!(registry.len(), 1);
        mixer.render(1.2);
        assert!(registry.is_empty());
    }
}
