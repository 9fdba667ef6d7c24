//! Registry behaviour with a tracking writer and a render reader running
//! on separate threads.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wititude_core::{Mat4, RenderablePair, RenderableRegistry, TransformSnapshot, Vec3};

fn snapshot(k: f32) -> TransformSnapshot {
    TransformSnapshot::new(Mat4::from_translation(Vec3::new(k, -k, k * 2.0)), Vec3::splat(k))
}

#[test]
fn test_reader_never_sees_torn_pair() {
    let registry = Arc::new(RenderableRegistry::new());
    registry.put("bottle", RenderablePair::with_snapshot(&snapshot(0.0)));

    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 1..20_000u32 {
                registry.update_transform("bottle", &snapshot(i as f32));
            }
            done.store(true, Ordering::Release);
        })
    };

    let reader = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut reads = 0u64;
            let mut last_x = -1.0f32;
            while !done.load(Ordering::Acquire) {
                let frame = registry.snapshot();
                for id in frame.ids() {
                    let Some(pair) = registry.get_or_committed(id.as_str(), &frame) else {
                        continue;
                    };
                    assert!(pair.is_coherent(), "primary and occluder diverged");
                    let x = pair.snapshot().view.translation().x;
                    assert_eq!(pair.snapshot(), &snapshot(x));
                    assert!(x >= last_x, "reader went back in time");
                    last_x = x;
                    reads += 1;
                }
            }
            reads
        })
    };

    writer.join().unwrap();
    let reads = reader.join().unwrap();
    assert!(reads > 0);

    let last = registry.get("bottle").unwrap();
    assert_eq!(last.snapshot(), &snapshot(19_999.0));
}

#[derive(Clone, Copy, Debug)]
enum Op {
    Recognized,
    Tracked,
    Lost,
}

#[test]
fn test_random_interleavings_match_unmatched_recognitions() {
    let names: Vec<String> = (0..8).map(|i| format!("target-{i}")).collect();

    for seed in 0..32u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let registry = RenderableRegistry::new();
        let mut expected = HashSet::new();

        for step in 0..500u32 {
            let name = &names[rng.gen_range(0..names.len())];
            let op = match rng.gen_range(0..3) {
                0 => Op::Recognized,
                1 => Op::Tracked,
                _ => Op::Lost,
            };
            let s = snapshot(step as f32);

            match op {
                Op::Recognized => {
                    registry.put(name.as_str(), RenderablePair::with_snapshot(&s));
                    expected.insert(name.clone());
                }
                Op::Tracked => {
                    let applied = registry.update_transform(name, &s);
                    assert_eq!(applied, expected.contains(name), "seed {seed} step {step}");
                }
                Op::Lost => {
                    registry.remove(name);
                    expected.remove(name);
                }
            }
        }

        let actual: HashSet<String> = registry
            .snapshot()
            .ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(actual, expected, "seed {seed}");
    }
}

#[test]
fn test_writers_on_distinct_targets_do_not_lose_updates() {
    let registry = Arc::new(RenderableRegistry::new());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let id = format!("target-{t}");
                registry.put(id.as_str(), RenderablePair::new());
                for i in 0..500u32 {
                    registry.update_transform(&id, &snapshot(i as f32));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(registry.len(), 4);
    for t in 0..4 {
        let pair = registry.get(&format!("target-{t}")).unwrap();
        assert_eq!(pair.snapshot(), &snapshot(499.0));
    }
}
