use dioxus::prelude::*;
use std::path::PathBuf;

use super::note::{NoteBody, NoteContent};

/// The single persistent annotation slot shown on wide viewports.
/// Selecting new content replaces whatever reveal is bound here.
#[component]
pub fn SidePanelNote(
    note: NoteContent,
    content_path: PathBuf,
    active_marker: Option<String>,
    on_marker_activate: Callback<String>,
    on_dismiss: Callback<()>,
) -> Element {
    rsx! {
        aside {
            class: "side-panel",
            header {
                class: "note-header",
                h3 { "{note.title}" }
                button {
                    class: "dismiss",
                    onclick: move |_| on_dismiss.call(()),
                    "×"
                }
            }
            NoteBody {
                note,
                content_path,
                active_marker,
                on_marker_activate,
            }
        }
    }
}
