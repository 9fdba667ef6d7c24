//! # Tracking Events
//!
//! The tracker's callback surface, flattened into one tagged event type and
//! carried over a bounded crossbeam channel to the pump thread.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wititude_core::TargetId;

use crate::error::{TrackingError, TrackingResult};
use crate::pose::{Pose, TrackingQuality};

/// Everything the tracking pipeline can report.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// The target collection finished loading.
    TargetsLoaded,

    /// The target collection failed to load. Nothing will be recognized.
    LoadError {
        /// Reason reported by the loader.
        reason: String,
    },

    /// A target was recognized and starts being tracked.
    Recognized {
        /// Target name.
        id: TargetId,
        /// Initial pose.
        pose: Pose,
    },

    /// A tracked target moved.
    Tracked {
        /// Target name.
        id: TargetId,
        /// Latest pose.
        pose: Pose,
    },

    /// A target is no longer tracked.
    Lost {
        /// Target name.
        id: TargetId,
    },

    /// Extended tracking quality changed.
    QualityChanged {
        /// Target name.
        id: TargetId,
        /// Previous quality.
        old: TrackingQuality,
        /// New quality.
        new: TrackingQuality,
    },
}

impl TrackingEvent {
    /// Target this event concerns, if any.
    #[must_use]
    pub fn target(&self) -> Option<&TargetId> {
        match self {
            Self::Recognized { id, .. }
            | Self::Tracked { id, .. }
            | Self::Lost { id }
            | Self::QualityChanged { id, .. } => Some(id),
            Self::TargetsLoaded | Self::LoadError { .. } => None,
        }
    }

    /// True for informational events that may be dropped under backpressure.
    #[must_use]
    pub const fn is_droppable(&self) -> bool {
        matches!(self, Self::QualityChanged { .. })
    }

    /// True for pose updates, which are merged per target under backpressure
    /// so the newest pose always reaches the handler.
    #[must_use]
    pub const fn is_coalescable(&self) -> bool {
        matches!(self, Self::Tracked { .. })
    }
}

/// Callback-style surface of a tracking source.
///
/// Anything a tracking SDK can call into. Implemented by [`TrackingSender`]
/// (forward to the pump thread) and by the handler itself (dispatch inline).
pub trait TrackingListener: Send + Sync {
    /// Delivers one event.
    fn on_event(&self, event: TrackingEvent);

    /// The target collection finished loading.
    fn on_targets_loaded(&self) {
        self.on_event(TrackingEvent::TargetsLoaded);
    }

    /// The target collection failed to load.
    fn on_error_loading_targets(&self, reason: &str) {
        self.on_event(TrackingEvent::LoadError {
            reason: reason.to_string(),
        });
    }

    /// A target was recognized.
    fn on_object_recognized(&self, id: &str, pose: Pose) {
        self.on_event(TrackingEvent::Recognized { id: id.into(), pose });
    }

    /// A target moved.
    fn on_object_tracked(&self, id: &str, pose: Pose) {
        self.on_event(TrackingEvent::Tracked { id: id.into(), pose });
    }

    /// A target was lost.
    fn on_object_lost(&self, id: &str) {
        self.on_event(TrackingEvent::Lost { id: id.into() });
    }

    /// Extended tracking quality changed (raw SDK values).
    fn on_extended_tracking_quality_changed(&self, id: &str, old: i32, new: i32) {
        self.on_event(TrackingEvent::QualityChanged {
            id: id.into(),
            old: TrackingQuality::from_raw(old),
            new: TrackingQuality::from_raw(new),
        });
    }
}

/// Latest pose per target that did not fit in the channel.
type PendingPoses = Arc<Mutex<HashMap<TargetId, Pose>>>;

/// Creates a bounded tracking event channel.
#[must_use]
pub fn tracking_channel(capacity: usize) -> (TrackingSender, TrackingReceiver) {
    let (sender, receiver) = bounded(capacity);
    let pending = PendingPoses::default();
    (
        TrackingSender {
            sender,
            pending: Arc::clone(&pending),
        },
        TrackingReceiver { receiver, pending },
    )
}

/// Handle the tracking source pushes events into.
#[derive(Clone, Debug)]
pub struct TrackingSender {
    sender: Sender<TrackingEvent>,
    pending: PendingPoses,
}

impl TrackingSender {
    /// Sends an event.
    ///
    /// Pose updates never block: if the channel is full the pose replaces any
    /// pose already pending for that target and is handed over once the
    /// queue drains. Quality changes are discarded with
    /// [`TrackingError::QueueFull`]. Structural events (recognized, lost,
    /// load results) wait for room and discard the pending pose of their
    /// target, which they supersede.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Disconnected`] if the receiver is gone,
    /// [`TrackingError::QueueFull`] if a quality change was discarded.
    pub fn send(&self, event: TrackingEvent) -> TrackingResult<()> {
        if event.is_coalescable() {
            self.send_pose(event)
        } else if event.is_droppable() {
            match self.sender.try_send(event) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(TrackingError::QueueFull),
                Err(TrySendError::Disconnected(_)) => Err(TrackingError::Disconnected),
            }
        } else {
            if let Some(id) = event.target() {
                self.pending.lock().remove(id);
            }
            self.sender.send(event).map_err(|_| TrackingError::Disconnected)
        }
    }

    // The slot lock is held across try_send: the pump never takes a pending
    // pose while a newer one for the same target is entering the queue.
    fn send_pose(&self, event: TrackingEvent) -> TrackingResult<()> {
        let mut pending = self.pending.lock();
        if let Some(id) = event.target() {
            pending.remove(id);
        }
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(TrackingEvent::Tracked { id, pose })) => {
                pending.insert(id, pose);
                Ok(())
            }
            Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => Err(TrackingError::Disconnected),
        }
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.sender.len()
    }

    /// Number of targets with a pose waiting for room in the queue.
    #[must_use]
    pub fn coalesced_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl TrackingListener for TrackingSender {
    fn on_event(&self, event: TrackingEvent) {
        match self.send(event) {
            Ok(()) => {}
            Err(TrackingError::QueueFull) => tracing::trace!("quality change dropped, queue full"),
            Err(err) => tracing::warn!(error = %err, "tracking event not delivered"),
        }
    }
}

/// Handle the pump thread drains.
#[derive(Clone, Debug)]
pub struct TrackingReceiver {
    receiver: Receiver<TrackingEvent>,
    pending: PendingPoses,
}

impl TrackingReceiver {
    /// Receives one event (non-blocking).
    #[must_use]
    pub fn try_recv(&self) -> Option<TrackingEvent> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for one event.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Disconnected`] once every sender is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> TrackingResult<Option<TrackingEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TrackingError::Disconnected),
        }
    }

    /// Receives all pending events (non-blocking), followed by the poses
    /// that were merged while the queue was full.
    #[must_use]
    pub fn drain(&self) -> Vec<TrackingEvent> {
        let mut events: Vec<_> = self.receiver.try_iter().collect();
        events.extend(
            self.take_coalesced()
                .into_iter()
                .map(|(id, pose)| TrackingEvent::Tracked { id, pose }),
        );
        events
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Takes the merged poses once every queued event has been received.
    ///
    /// Returns nothing while the queue still holds events, since those are
    /// older than the merged poses and must be handled first.
    #[must_use]
    pub fn take_coalesced(&self) -> Vec<(TargetId, Pose)> {
        let mut pending = self.pending.lock();
        if pending.is_empty() || !self.receiver.is_empty() {
            return Vec::new();
        }
        pending.drain().collect()
    }

    pub(crate) fn channel(&self) -> &Receiver<TrackingEvent> {
        &self.receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wititude_core::{Mat4, Vec3};

    fn pose() -> Pose {
        Pose::new(Mat4::IDENTITY, Vec3::ONE)
    }

    #[test]
    fn test_listener_forwards_in_order() {
        let (sender, receiver) = tracking_channel(16);

        sender.on_targets_loaded();
        sender.on_object_recognized("bottle", pose());
        sender.on_object_tracked("bottle", pose());
        sender.on_object_lost("bottle");

        let events = receiver.drain();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], TrackingEvent::TargetsLoaded);
        assert!(matches!(events[1], TrackingEvent::Recognized { .. }));
        assert!(matches!(events[2], TrackingEvent::Tracked { .. }));
        assert_eq!(events[3], TrackingEvent::Lost { id: "bottle".into() });
    }

    fn at(x: f32) -> Pose {
        Pose::new(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)), Vec3::ONE)
    }

    #[test]
    fn test_updates_do_not_block_when_full() {
        let (sender, receiver) = tracking_channel(1);
        sender.on_object_recognized("bottle", pose());

        let update = TrackingEvent::Tracked {
            id: "bottle".into(),
            pose: pose(),
        };
        assert_eq!(sender.send(update), Ok(()));
        let quality = TrackingEvent::QualityChanged {
            id: "bottle".into(),
            old: TrackingQuality::Good,
            new: TrackingQuality::Average,
        };
        assert_eq!(sender.send(quality), Err(TrackingError::QueueFull));
        assert_eq!(receiver.pending_count(), 1);
        assert_eq!(sender.coalesced_count(), 1);
    }

    #[test]
    fn test_full_queue_keeps_newest_pose() {
        let (sender, receiver) = tracking_channel(2);
        sender.on_object_recognized("bottle", at(1.0));
        sender.on_object_tracked("bottle", at(2.0));
        sender.on_object_tracked("bottle", at(3.0));
        sender.on_object_tracked("bottle", at(4.0));

        // Merged poses wait behind the queued events.
        assert!(matches!(receiver.try_recv(), Some(TrackingEvent::Recognized { .. })));
        assert!(receiver.take_coalesced().is_empty());

        let events = receiver.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], TrackingEvent::Tracked { id: "bottle".into(), pose: at(2.0) });
        assert_eq!(events[1], TrackingEvent::Tracked { id: "bottle".into(), pose: at(4.0) });
        assert_eq!(sender.coalesced_count(), 0);
    }

    #[test]
    fn test_lost_discards_merged_pose() {
        let (sender, receiver) = tracking_channel(2);
        sender.on_object_recognized("bottle", at(1.0));
        sender.on_object_tracked("bottle", at(2.0));
        sender.on_object_tracked("bottle", at(3.0));
        assert_eq!(sender.coalesced_count(), 1);

        assert!(receiver.try_recv().is_some());
        sender.on_object_lost("bottle");
        assert_eq!(sender.coalesced_count(), 0);

        let events = receiver.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], TrackingEvent::Lost { id: "bottle".into() });
    }

    #[test]
    fn test_disconnected() {
        let (sender, receiver) = tracking_channel(4);
        drop(receiver);
        assert_eq!(sender.send(TrackingEvent::TargetsLoaded), Err(TrackingError::Disconnected));
    }

    #[test]
    fn test_event_target() {
        let lost = TrackingEvent::Lost { id: "bottle".into() };
        assert_eq!(lost.target().map(TargetId::as_str), Some("bottle"));
        assert!(TrackingEvent::TargetsLoaded.target().is_none());
        assert!(!lost.is_droppable());
        assert!(!lost.is_coalescable());
    }
}
