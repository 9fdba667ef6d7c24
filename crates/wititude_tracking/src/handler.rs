//! # Tracking Event Handler
//!
//! Per-target state transitions, driven by tracking events:
//!
//! ```text
//!              Recognized                 Lost
//!   (absent) ─────────────► (tracked) ─────────────► (absent)
//!                            │    ▲
//!                            └────┘ Tracked: replace transform
//!
//!   Tracked / Lost while absent ──► no-op
//!   Recognized while tracked    ──► fresh pair replaces the old one
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wititude_core::{RenderablePair, RenderableRegistry, TargetId};

use crate::events::{TrackingEvent, TrackingListener};
use crate::pose::{Pose, TrackingQuality};
use crate::status::{StatusNotification, StatusSender, SCAN_LABEL};

/// Counters for what the handler has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Recognized events processed.
    pub recognized: u64,
    /// Tracked events applied to an existing pair.
    pub tracked_applied: u64,
    /// Tracked events for absent targets.
    pub tracked_ignored: u64,
    /// Lost events that removed a pair.
    pub lost: u64,
    /// Lost events for absent targets.
    pub lost_ignored: u64,
    /// Target collection load failures.
    pub load_errors: u64,
}

#[derive(Default)]
struct Counters {
    recognized: AtomicU64,
    tracked_applied: AtomicU64,
    tracked_ignored: AtomicU64,
    lost: AtomicU64,
    lost_ignored: AtomicU64,
    load_errors: AtomicU64,
}

/// Consumes tracking events and keeps the registry in step with them.
///
/// Performs no GPU work. Safe to call concurrently with render-side reads.
pub struct TrackingEventHandler {
    registry: Arc<RenderableRegistry>,
    status: StatusSender,
    hint_image: String,
    counters: Counters,
}

impl TrackingEventHandler {
    /// Creates a handler writing into `registry`.
    #[must_use]
    pub fn new(registry: Arc<RenderableRegistry>, status: StatusSender, hint_image: impl Into<String>) -> Self {
        Self {
            registry,
            status,
            hint_image: hint_image.into(),
            counters: Counters::default(),
        }
    }

    /// Dispatches one event.
    pub fn handle(&self, event: TrackingEvent) {
        match event {
            TrackingEvent::TargetsLoaded => self.on_targets_loaded(),
            TrackingEvent::LoadError { reason } => self.on_load_error(&reason),
            TrackingEvent::Recognized { id, pose } => self.on_recognized(id, &pose),
            TrackingEvent::Tracked { id, pose } => self.on_tracked(&id, &pose),
            TrackingEvent::Lost { id } => self.on_lost(id),
            TrackingEvent::QualityChanged { id, old, new } => self.on_quality_changed(&id, old, new),
        }
    }

    /// Targets loaded: show the scan hint.
    pub fn on_targets_loaded(&self) {
        tracing::info!("object tracker loaded");
        self.status.notify(StatusNotification::ReadyToScan {
            label: SCAN_LABEL.to_string(),
            hint_image: self.hint_image.clone(),
        });
    }

    /// Targets failed to load. The registry is untouched and already
    /// tracked targets keep rendering.
    pub fn on_load_error(&self, reason: &str) {
        self.counters.load_errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(reason, "unable to load object tracker");
        self.status.notify(StatusNotification::LoadFailed {
            reason: reason.to_string(),
        });
    }

    /// Builds a fresh pair at the recognized pose and inserts it.
    pub fn on_recognized(&self, id: TargetId, pose: &Pose) {
        self.counters.recognized.fetch_add(1, Ordering::Relaxed);
        tracing::info!(target_id = %id, "recognized target");

        let pair = RenderablePair::with_snapshot(&pose.snapshot());
        self.registry.put(id.clone(), pair);
        self.status.notify(StatusNotification::TargetRecognized { id });
    }

    /// Applies the new pose. Absent targets are ignored.
    pub fn on_tracked(&self, id: &TargetId, pose: &Pose) {
        if self.registry.update_transform(id.as_str(), &pose.snapshot()) {
            self.counters.tracked_applied.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.tracked_ignored.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(target_id = %id, "tracked update for untracked target ignored");
        }
    }

    /// Removes the pair and clears UI tied to the target.
    pub fn on_lost(&self, id: TargetId) {
        if self.registry.remove(id.as_str()) {
            self.counters.lost.fetch_add(1, Ordering::Relaxed);
            tracing::info!(target_id = %id, "lost target");
            self.status.notify(StatusNotification::TargetLost { id });
        } else {
            self.counters.lost_ignored.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(target_id = %id, "lost event for untracked target ignored");
        }
    }

    /// Informational only.
    pub fn on_quality_changed(&self, id: &TargetId, old: TrackingQuality, new: TrackingQuality) {
        tracing::debug!(target_id = %id, ?old, ?new, "extended tracking quality changed");
    }

    /// Registry this handler writes into.
    #[must_use]
    pub fn registry(&self) -> &Arc<RenderableRegistry> {
        &self.registry
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> HandlerStats {
        let c = &self.counters;
        HandlerStats {
            recognized: c.recognized.load(Ordering::Relaxed),
            tracked_applied: c.tracked_applied.load(Ordering::Relaxed),
            tracked_ignored: c.tracked_ignored.load(Ordering::Relaxed),
            lost: c.lost.load(Ordering::Relaxed),
            lost_ignored: c.lost_ignored.load(Ordering::Relaxed),
            load_errors: c.load_errors.load(Ordering::Relaxed),
        }
    }
}

impl TrackingListener for TrackingEventHandler {
    fn on_event(&self, event: TrackingEvent) {
        self.handle(event);
    }
}
