//! Render loop driven by the frame driver while a writer thread churns the
//! registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wititude_core::{
    DriverConfig, DrawRole, FrameDriver, Mat4, RenderablePair, RenderableRegistry, TransformSnapshot, Vec3,
};
use wititude_render::{frame_callback, RecordingSink, RenderLoop, RenderLoopConfig};

fn snapshot(k: f32) -> TransformSnapshot {
    TransformSnapshot::new(Mat4::from_translation(Vec3::new(k, -k, -1.0)), Vec3::splat(1.0 + k))
}

#[test]
fn test_every_frame_draws_coherent_pairs() {
    let registry = Arc::new(RenderableRegistry::new());
    let sink = RecordingSink::new(4096);
    let log = sink.log();
    let render_loop = Arc::new(Mutex::new(RenderLoop::new(
        RenderLoopConfig::for_fps(200),
        Arc::clone(&registry),
        Box::new(sink),
    )));

    let driver = FrameDriver::new(DriverConfig::new(200), frame_callback(Arc::clone(&render_loop)));
    driver.start();

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let names = ["bottle", "firetruck", "mug"];
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let mut step = 0u16;
            while !done.load(Ordering::Acquire) {
                let name = names[rng.gen_range(0..names.len())];
                let k = f32::from(step % 500);
                match rng.gen_range(0..6) {
                    0 => {
                        registry.put(name, RenderablePair::with_snapshot(&snapshot(k)));
                    }
                    1 => {
                        registry.remove(name);
                    }
                    _ => {
                        registry.update_transform(name, &snapshot(k));
                    }
                }
                step = step.wrapping_add(1);
            }
        })
    };

    thread::sleep(Duration::from_millis(300));
    done.store(true, Ordering::Release);
    writer.join().unwrap();
    driver.shutdown();

    let frames = log.frames();
    assert!(!frames.is_empty());

    for frame in &frames {
        let mut occluders = HashMap::new();
        let mut seen_primary = false;
        for draw in &frame.draws {
            match draw.role {
                DrawRole::Occluder => {
                    assert!(!seen_primary, "occluder after primary in frame {}", frame.frame);
                    occluders.insert(draw.target.clone(), draw.uniforms.model_view);
                }
                DrawRole::Primary => {
                    seen_primary = true;
                    assert_eq!(
                        occluders.get(&draw.target),
                        Some(&draw.uniforms.model_view),
                        "torn pair in frame {}",
                        frame.frame
                    );
                }
            }
        }
    }

    let stats = render_loop.lock().stats();
    assert_eq!(stats.total_frames, log.presented());
    assert_eq!(stats.failed_frames, 0);
}
