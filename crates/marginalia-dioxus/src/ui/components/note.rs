use dioxus::prelude::*;
use marginalia_engine::model::Node;
use marginalia_engine::reveal::RevealStatus;
use std::path::PathBuf;

/// Everything a presenter needs to show the current annotation: either a
/// placeholder message or the partially revealed tree plus session status.
#[derive(Clone, PartialEq)]
pub struct NoteContent {
    pub key: String,
    pub title: String,
    pub error: Option<String>,
    pub nodes: Vec<Node>,
    pub status: Option<RevealStatus>,
}

/// Shared body of both annotation presenters.
#[component]
pub fn NoteBody(
    note: NoteContent,
    content_path: PathBuf,
    active_marker: Option<String>,
    on_marker_activate: Callback<String>,
) -> Element {
    let revealing = note.status == Some(RevealStatus::Running);

    rsx! {
        div {
            class: "note-body",
            if let Some(message) = note.error.as_ref() {
                p { class: "placeholder", "{message}" }
            } else {
                super::RichTextView {
                    nodes: note.nodes.clone(),
                    content_path,
                    active_marker,
                    on_marker_activate,
                }
                if revealing {
                    span { class: "reveal-caret", "▌" }
                }
            }
        }
    }
}
