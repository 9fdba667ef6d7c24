//! Dedicated thread draining the tracking channel into the handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Sender};

use crate::error::{TrackingError, TrackingResult};
use crate::events::TrackingReceiver;
use crate::handler::TrackingEventHandler;

/// The tracking event thread.
///
/// Events for one target are handled in arrival order. Poses merged while
/// the queue was full are applied once the queue has drained behind them.
/// Stops when asked to or when every sender is dropped. Events still queued
/// at shutdown are discarded; teardown clears the registry anyway.
pub struct TrackingPump {
    shutdown: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    processed: Arc<AtomicU64>,
}

impl TrackingPump {
    /// Spawns the pump.
    ///
    /// # Errors
    ///
    /// [`TrackingError::PumpSpawn`] if the thread cannot be created.
    pub fn spawn(events: TrackingReceiver, handler: Arc<TrackingEventHandler>) -> TrackingResult<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let processed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&processed);

        let worker = thread::Builder::new()
            .name("wititude-tracking".to_string())
            .spawn(move || {
                let channel = events.channel();
                loop {
                    select! {
                        recv(channel) -> msg => match msg {
                            Ok(event) => {
                                handler.handle(event);
                                counter.fetch_add(1, Ordering::Relaxed);
                                for (id, pose) in events.take_coalesced() {
                                    handler.on_tracked(&id, &pose);
                                    counter.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            Err(_) => break,
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                tracing::debug!("tracking pump exited");
            })
            .map_err(|e| TrackingError::PumpSpawn(e.to_string()))?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            worker: Some(worker),
            processed,
        })
    }

    /// Events handled so far.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Returns true until the pump thread has exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Stops the pump and waits for the handler to finish its current event.
    pub fn shutdown(&mut self) {
        // Dropping the sender wakes the select.
        self.shutdown.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("tracking pump panicked");
            }
        }
    }
}

impl Drop for TrackingPump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{tracking_channel, TrackingListener};
    use crate::pose::Pose;
    use crate::status::status_channel;
    use std::time::{Duration, Instant};
    use wititude_core::{Mat4, RenderableRegistry, Vec3};

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_pump_applies_events() {
        let registry = Arc::new(RenderableRegistry::new());
        let (status, _ui) = status_channel(16);
        let handler = Arc::new(TrackingEventHandler::new(Arc::clone(&registry), status, "hint.jpg"));
        let (sender, receiver) = tracking_channel(64);

        let mut pump = TrackingPump::spawn(receiver, handler).unwrap();
        let pose = Pose::new(Mat4::IDENTITY, Vec3::ONE);

        sender.on_object_recognized("bottle", pose);
        sender.on_object_recognized("firetruck", pose);
        sender.on_object_lost("bottle");

        assert!(wait_for(|| pump.processed() == 3));
        assert!(!registry.contains("bottle"));
        assert!(registry.contains("firetruck"));

        pump.shutdown();
        assert!(!pump.is_running());
    }

    #[test]
    fn test_pump_exits_when_senders_drop() {
        let registry = Arc::new(RenderableRegistry::new());
        let (status, _ui) = status_channel(4);
        let handler = Arc::new(TrackingEventHandler::new(registry, status, "hint.jpg"));
        let (sender, receiver) = tracking_channel(4);

        let pump = TrackingPump::spawn(receiver, handler).unwrap();
        drop(sender);
        assert!(wait_for(|| !pump.is_running()));
    }
}
