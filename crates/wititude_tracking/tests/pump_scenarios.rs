//! End-to-end producer side: tracking events through the channel and the
//! pump thread into the registry, with a render-side reader running.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wititude_core::{Mat4, RenderableRegistry, Vec3};
use wititude_tracking::{
    status_channel, tracking_channel, Pose, TrackingEvent, TrackingEventHandler, TrackingListener,
    TrackingPump,
};

fn pose(k: f32) -> Pose {
    Pose::new(Mat4::from_translation(Vec3::new(k, 0.0, -1.0)), Vec3::splat(k))
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_random_event_stream_with_concurrent_reader() {
    let registry = Arc::new(RenderableRegistry::new());
    let (status, _ui) = status_channel(4);
    let handler = Arc::new(TrackingEventHandler::new(Arc::clone(&registry), status, "bottle_image.jpg"));
    let (sender, receiver) = tracking_channel(256);
    let mut pump = TrackingPump::spawn(receiver, handler).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let frame = registry.snapshot();
                for id in frame.ids() {
                    if let Some(pair) = registry.get_or_committed(id.as_str(), &frame) {
                        assert!(pair.is_coherent());
                    }
                }
            }
        })
    };

    let names = ["bottle", "firetruck", "mug", "lamp"];
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut expected = HashSet::new();
    let mut structural = 0u64;

    for step in 0..2_000u16 {
        let name = names[rng.gen_range(0..names.len())];
        let k = f32::from(step);
        match rng.gen_range(0..4) {
            0 => {
                sender.on_object_recognized(name, pose(k));
                expected.insert(name);
                structural += 1;
            }
            1 => {
                sender.on_object_lost(name);
                expected.remove(name);
                structural += 1;
            }
            _ => {
                // Merged per target under backpressure; never changes which
                // targets exist.
                let _ = sender.send(TrackingEvent::Tracked { id: name.into(), pose: pose(k) });
            }
        }
    }

    // Every structural event is delivered; wait until the queue is empty.
    wait_until(|| sender.pending_count() == 0 && pump.processed() >= structural);
    thread::sleep(Duration::from_millis(20));

    done.store(true, Ordering::Release);
    reader.join().unwrap();
    pump.shutdown();

    let actual: HashSet<String> = registry.snapshot().ids().iter().map(ToString::to_string).collect();
    let expected: HashSet<String> = expected.into_iter().map(String::from).collect();
    assert_eq!(actual, expected);
}

fn translation_x(registry: &RenderableRegistry, id: &str) -> Option<f32> {
    registry.get(id).map(|pair| pair.snapshot().view.translation().x)
}

#[test]
fn test_full_queue_settles_on_latest_pose() {
    let registry = Arc::new(RenderableRegistry::new());
    let (status, _ui) = status_channel(4);
    let handler = Arc::new(TrackingEventHandler::new(Arc::clone(&registry), status, "bottle_image.jpg"));
    let (sender, receiver) = tracking_channel(2);

    // Nothing drains yet: the last update does not fit in the queue.
    sender.on_object_recognized("bottle", pose(1.0));
    sender.on_object_tracked("bottle", pose(2.0));
    sender.on_object_tracked("bottle", pose(3.0));
    assert_eq!(sender.pending_count(), 2);
    assert_eq!(sender.coalesced_count(), 1);

    let mut pump = TrackingPump::spawn(receiver, Arc::clone(&handler)).unwrap();
    wait_until(|| pump.processed() == 3);
    pump.shutdown();

    assert_eq!(translation_x(&registry, "bottle"), Some(3.0));
    assert_eq!(handler.stats().tracked_applied, 2);
    assert_eq!(sender.coalesced_count(), 0);
}

#[test]
fn test_full_queue_keeps_lost_target_removed() {
    let registry = Arc::new(RenderableRegistry::new());
    let (status, _ui) = status_channel(4);
    let handler = Arc::new(TrackingEventHandler::new(Arc::clone(&registry), status, "bottle_image.jpg"));
    let (sender, receiver) = tracking_channel(4);

    sender.on_object_recognized("bottle", pose(1.0));
    sender.on_object_tracked("bottle", pose(2.0));
    sender.on_object_recognized("mug", pose(1.0));
    sender.on_object_tracked("mug", pose(2.0));
    // Both merged while the queue is full.
    sender.on_object_tracked("bottle", pose(3.0));
    sender.on_object_tracked("mug", pose(3.0));
    assert_eq!(sender.coalesced_count(), 2);

    let mut pump = TrackingPump::spawn(receiver, Arc::clone(&handler)).unwrap();
    sender.on_object_lost("bottle");
    wait_until(|| !registry.contains("bottle") && translation_x(&registry, "mug") == Some(3.0));
    thread::sleep(Duration::from_millis(20));
    pump.shutdown();

    assert!(!registry.contains("bottle"));
    assert_eq!(translation_x(&registry, "mug"), Some(3.0));
}
