pub mod content;
pub mod model;
pub mod reveal;


// Re-export key types for easier usage
pub use content::{
    Collection, ContentService, ContentSource, DirSource, FetchError, Locale, ResolveError,
    ResolvedContent,
};
pub use model::{ElementKind, Node, RichText};
pub use reveal::{
    Generation, LinkActivationMonitor, MarkerRef, MountPoint, OpenShape, PresenterKind,
    RevealHost, RevealSession, RevealStatus, SurfaceId, TickEvent, Token, tokenize,
};
