//! Score playback against the note registry.
//!
//! The scheduler keeps its own virtual clock, advanced by wall-clock time
//! scaled by a fixed rate, and pops every event whose tick stamp has been
//! reached. Notes are stamped with the audio clock, not the virtual clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::core::audio::{AudioClock, Params};
use crate::core::score::{ChannelTrack, EventKind};
use crate::core::synth::{NoteCommand, NoteRegistry};
use crate::messaging::MessageBus;

/// Virtual ticks per wall-clock second
pub const DEFAULT_RATE: f64 = 280.0;

// Live messages handled per tick
const MESSAGES_PER_TICK: usize = 256;

pub struct Scheduler {
    tracks: Vec<ChannelTrack>,
    elapsed: f64,
    rate: f64,
    registry: Arc<NoteRegistry>,
    clock: Arc<AudioClock>,
    live: Option<(MessageBus, Arc<Params>)>,
    pending: Vec<NoteCommand>,
}

impl Scheduler {
    pub fn new(tracks: Vec<ChannelTrack>, rate: f64, registry: Arc<NoteRegistry>, clock: Arc<AudioClock>) -> Self {
        Self {
            tracks,
            elapsed: 0.0,
            rate,
            registry,
            clock,
            live: None,
            pending: Vec::with_capacity(64),
        }
    }

    /// Also drain live input from `bus` on every tick.
    pub fn with_bus(mut self, bus: MessageBus, params: Arc<Params>) -> Self {
        self.live = Some((bus, params));
        self
    }

    /// Virtual time reached so far, in ticks
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn pending_events(&self) -> usize {
        self.tracks.iter().map(ChannelTrack::len).sum()
    }

    /// Every track queue has been drained
    pub fn is_finished(&self) -> bool {
        self.tracks.iter().all(ChannelTrack::is_empty)
    }

    /// Advance the virtual clock by `wall` of real time and apply whatever
    /// became due. Returns how many events changed the registry.
    pub fn advance(&mut self, wall: Duration) -> usize {
        self.elapsed += wall.as_secs_f64() * self.rate;
        let applied = self.dispatch_due();

        if let Some((bus, params)) = &self.live {
            bus.process_messages(MESSAGES_PER_TICK, &self.registry, &self.clock, params);
        }
        applied
    }

    /// Apply all events due at the current virtual time. Each track's due
    /// events go to the registry under one lock acquisition, stamped with the
    /// current audio clock; the note channel is the track's position.
    pub fn dispatch_due(&mut self) -> usize {
        let mut applied = 0;

        for track in &mut self.tracks {
            self.pending.clear();
            while let Some(event) = track.pop_due(self.elapsed) {
                let id = i32::from(event.note);
                self.pending.push(match event.kind {
                    EventKind::NoteOn => NoteCommand::On {
                        id,
                        channel: track.index,
                    },
                    EventKind::NoteOff => NoteCommand::Off { id },
                });
            }
            if self.pending.is_empty() {
                continue;
            }

            let due = self.pending.len();
            let time = self.clock.seconds();
            let changed = self.registry.apply_batch(self.pending.drain(..), time);
            debug!(
                "track {}: {due} events due at tick {:.1}, {changed} applied at {time:.3}s",
                track.index, self.elapsed
            );
            applied += changed;
        }

        applied
    }

    /// Tick every `tick` until `active` clears. With `stop_when_idle` the loop
    /// also ends once the score is drained and every note has faded.
    pub fn run(&mut self, active: &AtomicBool, tick: Duration, stop_when_idle: bool) {
        info!("scheduler running at {} ticks/s, {} events queued", self.rate, self.pending_events());
        let mut last = Instant::now();

        while active.load(Ordering::Acquire) {
            let now = Instant::now();
            self.advance(now - last);
            last = now;

            if stop_when_idle && self.is_finished() && self.registry.is_empty() {
                info!("score finished at tick {:.1}", self.elapsed);
                break;
            }
            thread::sleep(tick);
        }
    }
}
