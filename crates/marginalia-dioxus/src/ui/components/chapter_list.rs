use dioxus::prelude::*;

/// Sidebar navigation over the chapter keys of the primary content set.
#[component]
pub fn ChapterList(
    keys: Vec<String>,
    selected: Option<String>,
    on_select: EventHandler<String>,
) -> Element {
    rsx! {
        nav {
            class: "chapter-list",
            for key in keys.into_iter() {
                ChapterListItem {
                    key: "{key}",
                    chapter_key: key.clone(),
                    is_selected: selected.as_deref() == Some(key.as_str()),
                    on_select,
                }
            }
        }
    }
}

#[component]
fn ChapterListItem(
    chapter_key: String,
    is_selected: bool,
    on_select: EventHandler<String>,
) -> Element {
    let class = if is_selected {
        "chapter-item selected"
    } else {
        "chapter-item"
    };
    let label = display_label(&chapter_key);
    let chapter_key_clone = chapter_key.clone();

    rsx! {
        a {
            class: "{class}",
            href: "#",
            onclick: move |evt: MouseEvent| {
                evt.prevent_default();
                on_select.call(chapter_key_clone.clone());
            },
            "{label}"
        }
    }
}

/// Keys are kebab-case; titles come from resolution, which is lazy, so the
/// list shows a humanized key instead.
fn display_label(key: &str) -> String {
    key.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
