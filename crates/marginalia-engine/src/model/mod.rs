pub mod builder;
pub mod node;

pub use builder::{build_rich_text, mark_external_links};
pub use node::{ElementKind, Node, RichText};
