use crate::reveal::monitor::LinkActivationMonitor;
use crate::reveal::session::{MountPoint, RevealSession, RevealStatus, TickEvent};
use std::collections::HashMap;

/// Viewport width (logical pixels) from which the persistent side panel is
/// used; anything narrower presents annotations inline.
pub const SIDE_PANEL_MIN_WIDTH: f64 = 760.0;

/// Which presenter the responsive-layout predicate picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterKind {
    SidePanel,
    Inline,
}

impl PresenterKind {
    pub fn for_viewport(width: f64) -> Self {
        if width >= SIDE_PANEL_MIN_WIDTH {
            PresenterKind::SidePanel
        } else {
            PresenterKind::Inline
        }
    }

    pub fn surface(self) -> SurfaceId {
        match self {
            PresenterKind::SidePanel => SurfaceId::SidePanel,
            PresenterKind::Inline => SurfaceId::Inline,
        }
    }
}

/// The two annotation surfaces. The side panel is a single persistent slot;
/// the inline presenter supports many insertion points but holds at most
/// one instance at a time (singleton policy), so each is one logical
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    SidePanel,
    Inline,
}

/// Selection version of a surface. A resolution captured at generation `g`
/// may only mount while the surface is still at `g`; anything later is
/// stale and must be dropped, never applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

struct BoundSession {
    session: RevealSession,
    monitor: LinkActivationMonitor,
}

/// Owns at most one reveal session per surface and the per-surface
/// generation counters guarding against stale, late-arriving resolutions.
#[derive(Default)]
pub struct RevealHost {
    bindings: HashMap<SurfaceId, BoundSession>,
    generations: HashMap<SurfaceId, u64>,
}

impl RevealHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new selection for `surface`: cancel and unbind whatever
    /// session is there, bump the generation, and return the marker the
    /// caller must present back to [`mount`](Self::mount).
    ///
    /// Called *before* resolution starts, so a fetch that completes after
    /// the user has navigated elsewhere can be recognized as stale.
    pub fn request(&mut self, surface: SurfaceId) -> Generation {
        self.release(surface);
        let counter = self.generations.entry(surface).or_insert(0);
        *counter += 1;
        Generation(*counter)
    }

    pub fn current_generation(&self, surface: SurfaceId) -> Generation {
        Generation(self.generations.get(&surface).copied().unwrap_or(0))
    }

    /// Bind `session` to `surface` and start it, unless `generation` is no
    /// longer current (a newer selection happened mid-resolution). Returns
    /// whether the mount was accepted.
    pub fn mount(
        &mut self,
        surface: SurfaceId,
        generation: Generation,
        mut session: RevealSession,
    ) -> bool {
        if generation != self.current_generation(surface) {
            return false;
        }
        // At most one session per surface: cancel-then-start
        self.release(surface);
        session.start();
        self.bindings.insert(
            surface,
            BoundSession {
                session,
                monitor: LinkActivationMonitor::new(),
            },
        );
        true
    }

    /// Advance the surface's session by one token, feeding the activation
    /// monitor and running its completion sweep when the stream ends.
    /// Returns `None` once there is nothing left to drive.
    pub fn tick(&mut self, surface: SurfaceId) -> Option<TickEvent> {
        let bound = self.bindings.get_mut(&surface)?;
        let event = bound.session.tick()?;
        bound.monitor.observe(&event, bound.session.mount_mut());
        if bound.session.status() == RevealStatus::Completed {
            bound.monitor.finish(bound.session.mount_mut());
        }
        Some(event)
    }

    /// Cancel the surface's session in place: ticks stop, the monitor goes
    /// quiet, the partial structure stays mounted.
    pub fn cancel(&mut self, surface: SurfaceId) {
        if let Some(bound) = self.bindings.get_mut(&surface) {
            bound.session.cancel();
            bound.monitor.halt();
        }
    }

    /// Tear the surface down entirely (surface removed, context switched).
    /// Silent from any state.
    pub fn release(&mut self, surface: SurfaceId) {
        if let Some(mut bound) = self.bindings.remove(&surface) {
            bound.session.cancel();
            bound.monitor.halt();
        }
    }

    /// Cancel and unbind every surface (locale or chapter switch).
    pub fn release_all(&mut self) {
        let surfaces: Vec<SurfaceId> = self.bindings.keys().copied().collect();
        for surface in surfaces {
            self.release(surface);
        }
    }

    pub fn status(&self, surface: SurfaceId) -> Option<RevealStatus> {
        self.bindings.get(&surface).map(|b| b.session.status())
    }

    pub fn session(&self, surface: SurfaceId) -> Option<&RevealSession> {
        self.bindings.get(&surface).map(|b| &b.session)
    }

    pub fn mount_point(&self, surface: SurfaceId) -> Option<&MountPoint> {
        self.bindings.get(&surface).map(|b| b.session.mount())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build_rich_text;
    use crate::reveal::token::tokenize;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn session_for(markdown: &str) -> RevealSession {
        RevealSession::new(tokenize(&build_rich_text(markdown)), Duration::from_millis(20))
    }

    #[test]
    fn viewport_predicate_selects_presenter() {
        assert_eq!(
            PresenterKind::for_viewport(1280.0),
            PresenterKind::SidePanel
        );
        assert_eq!(PresenterKind::for_viewport(480.0), PresenterKind::Inline);
        assert_eq!(
            PresenterKind::for_viewport(SIDE_PANEL_MIN_WIDTH),
            PresenterKind::SidePanel
        );
    }

    #[test]
    fn second_reveal_replaces_the_first() {
        let mut host = RevealHost::new();

        let generation = host.request(SurfaceId::SidePanel);
        assert!(host.mount(SurfaceId::SidePanel, generation, session_for("first text")));
        host.tick(SurfaceId::SidePanel);
        host.tick(SurfaceId::SidePanel);

        let generation = host.request(SurfaceId::SidePanel);
        assert!(host.mount(SurfaceId::SidePanel, generation, session_for("second")));

        // Exactly one session afterward, freshly started
        assert_eq!(host.status(SurfaceId::SidePanel), Some(RevealStatus::Running));
        assert!(host.mount_point(SurfaceId::SidePanel).unwrap().children().is_empty());

        // Drive to completion: only the second session's tokens apply
        while host.tick(SurfaceId::SidePanel).is_some() {}
        let mount = host.mount_point(SurfaceId::SidePanel).unwrap();
        let text: String = mount.children().iter().map(|n| n.plain_text()).collect();
        assert_eq!(text, "second");
    }

    #[test]
    fn stale_generation_cannot_mount() {
        let mut host = RevealHost::new();

        let stale = host.request(SurfaceId::Inline);
        // User selects something else while the first resolution is in flight
        let current = host.request(SurfaceId::Inline);

        assert!(!host.mount(SurfaceId::Inline, stale, session_for("stale")));
        assert!(host.status(SurfaceId::Inline).is_none());

        assert!(host.mount(SurfaceId::Inline, current, session_for("fresh")));
        while host.tick(SurfaceId::Inline).is_some() {}
        let mount = host.mount_point(SurfaceId::Inline).unwrap();
        let text: String = mount.children().iter().map(|n| n.plain_text()).collect();
        assert_eq!(text, "fresh");
    }

    #[test]
    fn surfaces_are_independent() {
        let mut host = RevealHost::new();

        let g1 = host.request(SurfaceId::SidePanel);
        let g2 = host.request(SurfaceId::Inline);
        assert!(host.mount(SurfaceId::SidePanel, g1, session_for("panel")));
        assert!(host.mount(SurfaceId::Inline, g2, session_for("inline")));

        host.release(SurfaceId::Inline);
        assert!(host.status(SurfaceId::Inline).is_none());
        assert_eq!(host.status(SurfaceId::SidePanel), Some(RevealStatus::Running));
    }

    #[test]
    fn ticks_drive_the_monitor_through_completion() {
        let mut host = RevealHost::new();
        let generation = host.request(SurfaceId::SidePanel);
        host.mount(
            SurfaceId::SidePanel,
            generation,
            session_for("[Rule 30](annotation:rule-30)"),
        );

        while host.tick(SurfaceId::SidePanel).is_some() {}

        let mount = host.mount_point(SurfaceId::SidePanel).unwrap();
        let mut interactive = Vec::new();
        let mut work: Vec<&crate::model::Node> = mount.children().iter().collect();
        while let Some(node) = work.pop() {
            match node {
                crate::model::Node::Marker {
                    key,
                    interactive: i,
                    children,
                } => {
                    interactive.push((key.clone(), *i));
                    work.extend(children.iter());
                }
                crate::model::Node::Element { children, .. } => work.extend(children.iter()),
                _ => {}
            }
        }
        assert_eq!(interactive, vec![("rule-30".to_string(), true)]);
    }

    #[test]
    fn cancelled_surface_stops_ticking_but_keeps_structure() {
        let mut host = RevealHost::new();
        let generation = host.request(SurfaceId::Inline);
        host.mount(SurfaceId::Inline, generation, session_for("partial"));
        host.tick(SurfaceId::Inline);
        host.tick(SurfaceId::Inline);

        host.cancel(SurfaceId::Inline);
        assert!(host.tick(SurfaceId::Inline).is_none());
        assert_eq!(host.status(SurfaceId::Inline), Some(RevealStatus::Cancelled));
        assert!(!host.mount_point(SurfaceId::Inline).unwrap().children().is_empty());
    }
}
