pub mod host;
pub mod monitor;
pub mod session;
pub mod token;

pub use host::{Generation, PresenterKind, RevealHost, SIDE_PANEL_MIN_WIDTH, SurfaceId};
pub use monitor::LinkActivationMonitor;
pub use session::{MarkerRef, MountPoint, RevealSession, RevealStatus, TickEvent};
pub use token::{OpenShape, Token, tokenize};
