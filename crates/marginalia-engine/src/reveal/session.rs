use crate::model::Node;
use crate::reveal::token::{OpenShape, Token};
use std::time::Duration;

/// Location of a mounted marker: its child-index path from the mount root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRef {
    pub key: String,
    pub path: Vec<usize>,
}

/// The live partial tree a session mounts tokens onto.
///
/// The open stack records the child-index path of the innermost open
/// element. Because `Open`/`Close` apply atomically within one tick, the
/// structure is well-formed at every tick boundary: no dangling open
/// element, only the innermost element's text possibly partial. That is
/// what makes concurrent reads by the activation monitor safe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountPoint {
    children: Vec<Node>,
    open: Vec<usize>,
}

impl MountPoint {
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Depth of the open-frame stack; zero means fully closed.
    pub fn open_depth(&self) -> usize {
        self.open.len()
    }

    fn clear(&mut self) {
        self.children.clear();
        self.open.clear();
    }

    fn open_child(&mut self, shape: &OpenShape) {
        let node = match shape {
            OpenShape::Element(kind) => Node::Element {
                kind: kind.clone(),
                children: Vec::new(),
            },
            // Mounted markers start inert; the activation monitor flips
            // them interactive once they are structurally complete.
            OpenShape::Marker { key } => Node::Marker {
                key: key.clone(),
                children: Vec::new(),
                interactive: false,
            },
        };
        let children = self.open_children_mut();
        let index = children.len();
        children.push(node);
        self.open.push(index);
    }

    /// Pop the innermost frame. Returns a reference to the closed node when
    /// it was a marker, so the monitor can activate it on this very tick.
    fn close(&mut self) -> Option<MarkerRef> {
        let path = self.open.clone();
        self.open.pop()?;
        match self.node_at(&path) {
            Some(Node::Marker { key, .. }) => Some(MarkerRef {
                key: key.clone(),
                path,
            }),
            _ => None,
        }
    }

    fn append_char(&mut self, c: char) {
        let children = self.open_children_mut();
        if let Some(Node::Text(text)) = children.last_mut() {
            text.push(c);
        } else {
            children.push(Node::Text(c.to_string()));
        }
    }

    fn append_atomic(&mut self, node: Node) {
        self.open_children_mut().push(node);
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (last, rest) = path.split_last()?;
        let mut children = &self.children;
        for &index in rest {
            children = match children.get(index)? {
                Node::Element { children, .. } | Node::Marker { children, .. } => children,
                _ => return None,
            };
        }
        children.get(*last)
    }

    /// Flip the marker at `path` interactive. Returns false if the path no
    /// longer points at a marker.
    pub fn set_marker_interactive(&mut self, path: &[usize]) -> bool {
        match self.node_at_mut(path) {
            Some(Node::Marker { interactive, .. }) => {
                *interactive = true;
                true
            }
            _ => false,
        }
    }

    /// Activate every marker in the mounted tree, returning those that were
    /// not already interactive.
    pub fn activate_all_markers(&mut self) -> Vec<MarkerRef> {
        let mut activated = Vec::new();
        let mut work: Vec<(Vec<usize>, &mut Node)> = self
            .children
            .iter_mut()
            .enumerate()
            .map(|(i, node)| (vec![i], node))
            .collect();

        while let Some((path, node)) = work.pop() {
            let children = match node {
                Node::Marker {
                    key,
                    children,
                    interactive,
                } => {
                    if !*interactive {
                        *interactive = true;
                        activated.push(MarkerRef {
                            key: key.clone(),
                            path: path.clone(),
                        });
                    }
                    children
                }
                Node::Element { children, .. } => children,
                _ => continue,
            };
            for (i, child) in children.iter_mut().enumerate() {
                let mut child_path = path.clone();
                child_path.push(i);
                work.push((child_path, child));
            }
        }

        activated
    }

    fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, rest) = path.split_last()?;
        let mut children = &mut self.children;
        for &index in rest {
            children = match children.get_mut(index)? {
                Node::Element { children, .. } | Node::Marker { children, .. } => children,
                _ => return None,
            };
        }
        children.get_mut(*last)
    }

    fn open_children_mut(&mut self) -> &mut Vec<Node> {
        let mut children = &mut self.children;
        for &index in &self.open {
            children = match &mut children[index] {
                Node::Element { children, .. } | Node::Marker { children, .. } => children,
                _ => unreachable!("open frames are always containers"),
            };
        }
        children
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// What one tick did to the mount point. The activation monitor subscribes
/// to these instead of polling on its own timer, so there is no poll/reveal
/// race and a marker activates on the exact tick that completes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    Opened,
    Closed { marker: Option<MarkerRef> },
    Text(char),
    Atomic,
}

/// Replays a token stream onto a mount point, one token per scheduled tick.
///
/// Scheduling is cooperative and owned by the caller (a UI timer, a
/// terminal event loop): the session itself never blocks, spawns, or keeps
/// time beyond carrying the interval its driver should use.
pub struct RevealSession {
    tokens: Vec<Token>,
    cursor: usize,
    mount: MountPoint,
    interval: Duration,
    status: RevealStatus,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl RevealSession {
    pub fn new(tokens: Vec<Token>, interval: Duration) -> Self {
        Self {
            tokens,
            cursor: 0,
            mount: MountPoint::default(),
            interval,
            status: RevealStatus::Idle,
            on_complete: None,
        }
    }

    /// Register a callback fired once, on natural completion only.
    pub fn with_on_complete(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Clear the mount point and begin consuming tokens. The mount root is
    /// the initial open frame.
    pub fn start(&mut self) {
        if self.status != RevealStatus::Idle {
            return;
        }
        self.mount.clear();
        self.status = RevealStatus::Running;
    }

    /// Consume exactly one token. Returns `None` once the session is no
    /// longer running; callers stop scheduling on the first `None`.
    pub fn tick(&mut self) -> Option<TickEvent> {
        if self.status != RevealStatus::Running {
            return None;
        }

        let Some(token) = self.tokens.get(self.cursor).cloned() else {
            self.complete();
            return None;
        };
        self.cursor += 1;

        let event = match token {
            Token::Open(shape) => {
                self.mount.open_child(&shape);
                TickEvent::Opened
            }
            Token::Close => TickEvent::Closed {
                marker: self.mount.close(),
            },
            Token::Char(c) => {
                self.mount.append_char(c);
                TickEvent::Text(c)
            }
            // Appended whole, within this single tick: atomic content never
            // visibly "builds"
            Token::Atomic(node) => {
                self.mount.append_atomic(node);
                TickEvent::Atomic
            }
        };

        if self.cursor == self.tokens.len() {
            self.complete();
        }
        Some(event)
    }

    /// Halt the reveal, leaving whatever partial structure exists in place.
    /// Valid from any state and idempotent; a completed session stays
    /// completed.
    pub fn cancel(&mut self) {
        if matches!(self.status, RevealStatus::Idle | RevealStatus::Running) {
            self.status = RevealStatus::Cancelled;
        }
    }

    pub fn status(&self) -> RevealStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RevealStatus::Running
    }

    pub fn mount(&self) -> &MountPoint {
        &self.mount
    }

    /// Mutable view of the mount point, for wiring tick events into a
    /// [`LinkActivationMonitor`](crate::reveal::LinkActivationMonitor).
    pub fn mount_mut(&mut self) -> &mut MountPoint {
        &mut self.mount
    }

    /// Tick period its driver should schedule at.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn complete(&mut self) {
        self.status = RevealStatus::Completed;
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
    }
}
