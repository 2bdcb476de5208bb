use dioxus::prelude::*;
use marginalia_engine::content::ResolvedContent;
use std::path::PathBuf;
use std::sync::Arc;

use super::note::NoteContent;
use super::{InlineNote, RichTextView};

/// The chapter reading surface. Blocks render statically; when the inline
/// presenter is active, its note is inserted directly after the block that
/// contains the activating marker.
#[component]
pub fn ReadingPanel(
    chapter: Arc<ResolvedContent>,
    content_path: PathBuf,
    active_marker: Option<String>,
    inline_note: Option<NoteContent>,
    on_marker_activate: Callback<String>,
) -> Element {
    let anchor_index = inline_note.as_ref().and_then(|note| {
        chapter
            .tree
            .children
            .iter()
            .position(|block| block.contains_marker(&note.key))
    });

    rsx! {
        article {
            class: "document-container",
            h1 { class: "chapter-title", "{chapter.title}" }
            hr {}
            for (index, block) in chapter.tree.children.iter().enumerate() {
                RichTextView {
                    nodes: vec![block.clone()],
                    content_path: content_path.clone(),
                    active_marker: active_marker.clone(),
                    on_marker_activate,
                }
                if Some(index) == anchor_index {
                    if let Some(note) = inline_note.clone() {
                        // Keyed by annotation so a new selection gets a fresh
                        // instance (collapsed state never leaks across notes)
                        InlineNote {
                            key: "{note.key}",
                            note,
                            content_path: content_path.clone(),
                            active_marker: active_marker.clone(),
                            on_marker_activate,
                        }
                    }
                }
            }
        }
    }
}
