//! Fire-and-forget status notifications for the UI.
//!
//! The core never waits on the UI. A full or closed channel drops the
//! notification.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::time::Duration;
use wititude_core::TargetId;

/// Status the UI may show (banners, dialogs, toasts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusNotification {
    /// The target collection started loading.
    LoadingStarted {
        /// Banner text.
        label: String,
    },
    /// Targets are loaded; show the scan hint.
    ReadyToScan {
        /// Banner text.
        label: String,
        /// Image showing the user what to point the camera at.
        hint_image: String,
    },
    /// A target was recognized; the scan hint can go away.
    TargetRecognized {
        /// Target name.
        id: TargetId,
    },
    /// A target was lost; clear anything tied to it.
    TargetLost {
        /// Target name.
        id: TargetId,
    },
    /// The target collection could not be loaded.
    LoadFailed {
        /// Reason reported by the loader.
        reason: String,
    },
    /// The device lacks a required capability.
    DeviceMissingFeatures {
        /// Operator-facing message.
        message: String,
    },
    /// Explain why permissions are needed before asking again.
    PermissionRationale {
        /// Permissions about to be requested.
        permissions: Vec<String>,
    },
    /// Permissions were denied; the session cannot start.
    PermissionsDenied {
        /// Denied permissions.
        permissions: Vec<String>,
    },
}

/// Banner shown while the target collection loads.
pub const LOADING_LABEL: &str = "Loading Target:";

/// Banner shown once targets can be scanned.
pub const SCAN_LABEL: &str = "Scan Target:";

/// Creates a bounded status channel.
#[must_use]
pub fn status_channel(capacity: usize) -> (StatusSender, StatusReceiver) {
    let (sender, receiver) = bounded(capacity);
    (StatusSender { sender }, StatusReceiver { receiver })
}

/// Sending side, held by the core.
#[derive(Clone, Debug)]
pub struct StatusSender {
    sender: Sender<StatusNotification>,
}

impl StatusSender {
    /// Hands a notification to the UI without waiting.
    ///
    /// Returns `false` if it was dropped.
    pub fn notify(&self, notification: StatusNotification) -> bool {
        match self.sender.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(n)) => {
                tracing::debug!(?n, "status channel full, notification dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receiving side, held by the UI.
#[derive(Clone, Debug)]
pub struct StatusReceiver {
    receiver: Receiver<StatusNotification>,
}

impl StatusReceiver {
    /// Receives one notification (non-blocking).
    #[must_use]
    pub fn try_recv(&self) -> Option<StatusNotification> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for one notification.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatusNotification> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Receives all pending notifications.
    #[must_use]
    pub fn drain(&self) -> Vec<StatusNotification> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_channel_drops() {
        let (sender, receiver) = status_channel(1);
        assert!(sender.notify(StatusNotification::LoadingStarted {
            label: LOADING_LABEL.into()
        }));
        assert!(!sender.notify(StatusNotification::TargetLost { id: "bottle".into() }));
        assert_eq!(receiver.drain().len(), 1);
    }

    #[test]
    fn test_closed_channel_is_not_an_error() {
        let (sender, receiver) = status_channel(4);
        drop(receiver);
        assert!(!sender.notify(StatusNotification::TargetRecognized { id: "bottle".into() }));
    }
}
