use dioxus::html::geometry::ScrollBehavior;
use dioxus::prelude::*;
use std::path::PathBuf;

use super::note::{NoteBody, NoteContent};

/// Annotation presenter for narrow viewports: inserted after the block
/// containing the activating marker, pushing subsequent content down.
///
/// The expanded/collapsed toggle is per-instance user state, orthogonal to
/// how far the reveal has progressed.
#[component]
pub fn InlineNote(
    note: NoteContent,
    content_path: PathBuf,
    active_marker: Option<String>,
    on_marker_activate: Callback<String>,
) -> Element {
    let mut expanded = use_signal(|| true);
    let toggle_label = if *expanded.read() { "−" } else { "+" };

    rsx! {
        div {
            class: "inline-note",
            onmounted: move |evt| {
                // Bring the freshly inserted note into view once layout settles
                spawn(async move {
                    let _ = evt.scroll_to(ScrollBehavior::Smooth).await;
                });
            },
            header {
                class: "note-header",
                h3 { "{note.title}" }
                button {
                    class: "toggle",
                    onclick: move |_| {
                        let now = !*expanded.read();
                        expanded.set(now);
                    },
                    "{toggle_label}"
                }
            }
            if *expanded.read() {
                NoteBody {
                    note,
                    content_path,
                    active_marker,
                    on_marker_activate,
                }
            }
        }
    }
}
