use dioxus::prelude::*;
use marginalia_config::Config;
use marginalia_engine::content::{Collection, ContentService, DirSource, Locale, ResolvedContent};
use marginalia_engine::reveal::{
    Generation, PresenterKind, RevealHost, RevealSession, SurfaceId, tokenize,
};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use super::components::{ChapterList, LocaleSwitcher, NoteContent, ReadingPanel, SidePanelNote};

const READER_CSS: &str = include_str!("../../assets/reader.css");

/// Tick period of the typewriter reveal.
const REVEAL_INTERVAL: Duration = Duration::from_millis(24);

/// Which annotation is being presented, and where.
#[derive(Clone, PartialEq)]
struct AnnotationView {
    key: String,
    title: String,
    presenter: PresenterKind,
    /// Placeholder text when resolution failed; presented instead of a tree.
    error: Option<String>,
}

#[component]
pub fn App(content_path: PathBuf, initial_locale: Locale) -> Element {
    let service = use_hook(|| {
        Rc::new(ContentService::with_locale(
            DirSource::new(content_path.clone()),
            initial_locale,
        ))
    });
    let chapter_keys = use_hook(|| service.chapter_keys());

    let mut locale = use_signal(|| initial_locale);
    let mut selected_chapter = use_signal(|| chapter_keys.first().cloned());
    let mut chapter = use_signal(|| None::<Arc<ResolvedContent>>);
    let mut chapter_error = use_signal(|| None::<String>);
    let host = use_signal(RevealHost::new);
    let active_marker = use_signal(|| None::<String>);
    let annotation = use_signal(|| None::<AnnotationView>);

    // Chapter resolution follows the selection and locale signals; failures
    // become a placeholder naming the missing key, never a crash.
    {
        let service = Rc::clone(&service);
        use_effect(move || {
            let requested = selected_chapter.read().clone();
            service.set_locale(*locale.read());
            let Some(key) = requested else {
                chapter.set(None);
                return;
            };
            match service.resolve(Collection::Chapters, &key) {
                Ok(content) => {
                    chapter.set(Some(content));
                    chapter_error.set(None);
                }
                Err(e) => {
                    log::warn!("failed to resolve chapter '{key}': {e}");
                    chapter.set(None);
                    chapter_error.set(Some(format!("No content found for \"{key}\"")));
                }
            }
        });
    }

    let on_chapter_select = move |key: String| {
        clear_presentation(host, active_marker, annotation);
        selected_chapter.set(Some(key));
    };

    let on_locale_switch = {
        let content_path = content_path.clone();
        move |next: Locale| {
            clear_presentation(host, active_marker, annotation);
            locale.set(next);
            // Persist the choice on every switch
            let mut config = Config::new(content_path.clone());
            config.locale = next.code().to_string();
            if let Err(e) = config.save() {
                log::warn!("failed to save locale preference: {e}");
            }
        }
    };

    let on_marker_activate = {
        let service = Rc::clone(&service);
        Callback::new(move |key: String| {
            activate_marker(&service, host, active_marker, annotation, key);
        })
    };

    let on_panel_dismiss =
        move |_| clear_presentation(host, active_marker, annotation);

    let view = annotation.read().clone();
    let note = view.as_ref().map(|view| NoteContent {
        key: view.key.clone(),
        title: view.title.clone(),
        error: view.error.clone(),
        nodes: host
            .read()
            .mount_point(view.presenter.surface())
            .map(|mount| mount.children().to_vec())
            .unwrap_or_default(),
        status: host.read().status(view.presenter.surface()),
    });
    let (side_panel, inline_note) = match view.as_ref().map(|view| view.presenter) {
        Some(PresenterKind::SidePanel) => (note, None),
        Some(PresenterKind::Inline) => (None, note),
        None => (None, None),
    };

    rsx! {
        style { {READER_CSS} }
        div {
            class: "app-container",
            aside {
                class: "sidebar",
                h2 { "marginalia" }
                LocaleSwitcher {
                    current: *locale.read(),
                    on_switch: on_locale_switch,
                }
                ChapterList {
                    keys: chapter_keys.clone(),
                    selected: selected_chapter.read().clone(),
                    on_select: on_chapter_select,
                }
            }
            main {
                class: "reading-pane",
                if let Some(message) = chapter_error.read().as_ref() {
                    div {
                        class: "placeholder",
                        p { "{message}" }
                    }
                } else if let Some(content) = chapter.read().as_ref() {
                    ReadingPanel {
                        chapter: content.clone(),
                        content_path: content_path.clone(),
                        active_marker: active_marker.read().clone(),
                        inline_note,
                        on_marker_activate,
                    }
                } else {
                    div {
                        class: "placeholder",
                        p { "Select a chapter to begin reading" }
                    }
                }
            }
            if let Some(note) = side_panel {
                SidePanelNote {
                    note,
                    content_path: content_path.clone(),
                    active_marker: active_marker.read().clone(),
                    on_marker_activate,
                    on_dismiss: on_panel_dismiss,
                }
            }
        }
    }
}

/// Tear down whatever annotation presentation exists: sessions cancelled,
/// marker deactivated, presenter removed.
fn clear_presentation(
    mut host: Signal<RevealHost>,
    mut active_marker: Signal<Option<String>>,
    mut annotation: Signal<Option<AnnotationView>>,
) {
    host.write().release_all();
    active_marker.set(None);
    annotation.set(None);
}

/// The activation contract: deactivate every other marker, mark this one
/// active, pick a presenter for the current viewport, and start a reveal.
fn activate_marker(
    service: &ContentService,
    mut host: Signal<RevealHost>,
    mut active_marker: Signal<Option<String>>,
    mut annotation: Signal<Option<AnnotationView>>,
    key: String,
) {
    active_marker.set(Some(key.clone()));

    let width = dioxus::desktop::window().inner_size().width as f64;
    let presenter = PresenterKind::for_viewport(width);
    let surface = presenter.surface();
    let other = match surface {
        SurfaceId::SidePanel => SurfaceId::Inline,
        SurfaceId::Inline => SurfaceId::SidePanel,
    };

    // Register the selection before resolving, so a resolution that lands
    // after another selection is recognized as stale and never mounts.
    let generation = {
        let mut host = host.write();
        host.release(other);
        host.request(surface)
    };

    match service.resolve(Collection::Annotations, &key) {
        Ok(content) => {
            let session = RevealSession::new(tokenize(&content.tree), REVEAL_INTERVAL);
            if host.write().mount(surface, generation, session) {
                annotation.set(Some(AnnotationView {
                    key,
                    title: content.title.clone(),
                    presenter,
                    error: None,
                }));
                spawn(drive_reveal(host, surface, generation));
            }
        }
        Err(e) => {
            log::warn!("failed to resolve annotation '{key}': {e}");
            annotation.set(Some(AnnotationView {
                title: key.clone(),
                error: Some(format!("No annotation found for \"{key}\"")),
                key,
                presenter,
            }));
        }
    }
}

/// Cooperative tick driver for one mounted session. Stops as soon as the
/// session stops running or the surface has moved on to a newer selection,
/// so no tick ever writes into a detached mount point.
async fn drive_reveal(mut host: Signal<RevealHost>, surface: SurfaceId, generation: Generation) {
    loop {
        let interval = match host.read().session(surface) {
            Some(session) if session.is_running() => session.interval(),
            _ => break,
        };
        tokio::time::sleep(interval).await;

        let mut host = host.write();
        if host.current_generation(surface) != generation {
            break;
        }
        if host.tick(surface).is_none() {
            break;
        }
    }
}
