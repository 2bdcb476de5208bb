use crate::reveal::session::{MarkerRef, MountPoint, TickEvent};

/// Enables pointer interaction on annotation markers as soon as they are
/// structurally complete, so early-appearing links are usable before the
/// rest of the content finishes revealing.
///
/// Subscribes to the session's tick events rather than running its own
/// timer, so activation lands on the exact tick that closes a marker. A
/// final sweep on completion guarantees nothing was missed; after
/// cancellation the monitor goes quiet and never touches the mount again.
#[derive(Default)]
pub struct LinkActivationMonitor {
    activated: Vec<MarkerRef>,
    stopped: bool,
}

impl LinkActivationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to one tick of the bound session.
    pub fn observe(&mut self, event: &TickEvent, mount: &mut MountPoint) {
        if self.stopped {
            return;
        }
        if let TickEvent::Closed {
            marker: Some(marker),
        } = event
            && mount.set_marker_interactive(&marker.path)
        {
            self.activated.push(marker.clone());
        }
    }

    /// Completion: one final synchronous sweep, then stop.
    pub fn finish(&mut self, mount: &mut MountPoint) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.activated.extend(mount.activate_all_markers());
    }

    /// Cancellation: stop without sweeping; partially revealed markers stay
    /// inert.
    pub fn halt(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Markers activated so far, in activation order.
    pub fn activated(&self) -> &[MarkerRef] {
        &self.activated
    }
}
