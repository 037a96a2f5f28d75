use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rtsynth::core::audio::{block_ring, Params};
use rtsynth::core::synth::NoteCommand;
use rtsynth::{AudioClock, BlockRenderer, Mixer, NoteRegistry};

const ITERATIONS: usize = 10_000;
const NOTE_IDS: i32 = 24;

#[test]
fn scheduling_and_rendering_share_the_registry() {
    let registry = Arc::new(NoteRegistry::new());
    let clock = Arc::new(AudioClock::new(44100));
    let mixer = Mixer::new(Arc::clone(&registry));
    let done = Arc::new(AtomicBool::new(false));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let scheduler = {
        let registry = Arc::clone(&registry);
        let clock = Arc::clone(&clock);
        let done = Arc::clone(&done);
        let max_seen = Arc::clone(&max_seen);
        thread::spawn(move || {
            let mut created = HashSet::new();
            for i in 0..ITERATIONS {
                let id = 40 + (i as i32 * 7) % NOTE_IDS;
                let command = match i % 3 {
                    0 | 1 => NoteCommand::On { id, channel: 1 + i % 2 },
                    _ => NoteCommand::Off { id },
                };
                if let NoteCommand::On { id, .. } = command {
                    created.insert(id);
                }
                registry.apply_batch([command], clock.seconds());

                let notes = registry.snapshot();
                let ids: HashSet<i32> = notes.iter().map(|n| n.id).collect();
                assert_eq!(ids.len(), notes.len(), "duplicate note ids");
                assert!(notes.len() <= created.len());
                max_seen.fetch_max(notes.len(), Ordering::Relaxed);
            }
            done.store(true, Ordering::Release);
            created.len()
        })
    };

    let renderer = {
        let clock = Arc::clone(&clock);
        thread::spawn(move || {
            for _ in 0..ITERATIONS {
                let sample = mixer.render(clock.seconds());
                assert!(sample.is_finite());
                clock.advance(1);
            }
        })
    };

    renderer.join().unwrap();
    let distinct = scheduler.join().unwrap();
    assert!(done.load(Ordering::Acquire));
    assert!(registry.len() <= distinct);
    assert!(max_seen.load(Ordering::Relaxed) <= NOTE_IDS as usize);
}

#[test]
fn render_thread_and_device_side_run_concurrently() {
    let registry = Arc::new(NoteRegistry::new());
    let clock = Arc::new(AudioClock::new(8000));
    let mixer = Mixer::new(Arc::clone(&registry));
    let renderer = BlockRenderer::new(Arc::new(mixer), Arc::clone(&clock), Arc::new(Params::default()), 2);
    let (producer, mut consumer) = block_ring(4, 64);
    let active = Arc::new(AtomicBool::new(true));
    let render = rtsynth::RenderThread::spawn(renderer, producer, Arc::clone(&active)).unwrap();

    let mut out = [0.0f32; 50];
    for i in 0..ITERATIONS {
        match i % 50 {
            0 => {
                registry.note_on(40 + (i / 50 % 12) as i32, 2, clock.seconds());
            },
            25 => {
                registry.note_off(40 + (i / 50 % 12) as i32, clock.seconds());
            },
            _ => {},
        }
        consumer.pop_into(&mut out);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
        if i % 100 == 0 {
            thread::yield_now();
        }
    }

    render.stop();
    assert!(!active.load(Ordering::Acquire));
    assert!(registry.len() <= 12);
    assert!(clock.frames() > 0);
}
