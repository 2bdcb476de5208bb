pub mod locale;
pub mod resolver;
pub mod source;

pub use locale::{Collection, Locale, content_path};
pub use resolver::{ContentService, ResolveError, ResolvedContent};
pub use source::{ContentSource, DirSource, FetchError, validate_content_dir};
