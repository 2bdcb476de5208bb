//! Integration tests for the UI boundary: the flows the reader drives
//! (chapter selection, marker activation, locale switch) exercised through
//! the engine's public API against a real content directory.

use marginalia_engine::content::{Collection, ContentService, DirSource, Locale};
use marginalia_engine::model::Node;
use marginalia_engine::reveal::{
    PresenterKind, RevealHost, RevealSession, RevealStatus, SurfaceId, tokenize,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn content_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, text) in [
        (
            "chapters/emergence.md",
            "# 涌现\n\n简单规则产生[复杂性](annotation:complexity)。",
        ),
        (
            "chapters/en/emergence.md",
            "# Emergence\n\nSimple rules yield [complexity](annotation:complexity).",
        ),
        ("annotations/complexity.md", "# 复杂性\n\n整体大于部分之和。"),
        (
            "annotations/en/complexity.md",
            "# Complexity\n\nThe whole exceeds the parts.",
        ),
    ] {
        let absolute = dir.path().join(path);
        fs::create_dir_all(absolute.parent().unwrap()).unwrap();
        fs::write(absolute, text).unwrap();
    }
    dir
}

fn reveal_session(service: &ContentService, key: &str) -> RevealSession {
    let content = service.resolve(Collection::Annotations, key).unwrap();
    RevealSession::new(tokenize(&content.tree), Duration::from_millis(24))
}

/// The flow behind clicking a marker on a wide viewport: side panel
/// presenter, reveal driven to completion, marker in the note interactive.
#[test]
fn wide_viewport_marker_activation_reveals_in_side_panel() {
    let dir = content_dir();
    let service = ContentService::with_locale(DirSource::new(dir.path()), Locale::En);
    let mut host = RevealHost::new();

    let presenter = PresenterKind::for_viewport(1280.0);
    assert_eq!(presenter, PresenterKind::SidePanel);

    let surface = presenter.surface();
    let generation = host.request(surface);
    assert!(host.mount(surface, generation, reveal_session(&service, "complexity")));

    while host.tick(surface).is_some() {}

    assert_eq!(host.status(surface), Some(RevealStatus::Completed));
    let text: String = host
        .mount_point(surface)
        .unwrap()
        .children()
        .iter()
        .map(Node::plain_text)
        .collect();
    assert_eq!(text, "ComplexityThe whole exceeds the parts.");
}

/// Switching chapters mid-reveal: the in-flight resolution's generation goes
/// stale and its mount is refused, so the old annotation can never clobber
/// the new selection.
#[test]
fn stale_resolution_does_not_clobber_newer_selection() {
    let dir = content_dir();
    let service = ContentService::with_locale(DirSource::new(dir.path()), Locale::En);
    let mut host = RevealHost::new();

    let stale_generation = host.request(SurfaceId::SidePanel);
    let session = reveal_session(&service, "complexity");

    // User navigates elsewhere while the resolve was in flight
    host.release_all();
    let fresh_generation = host.request(SurfaceId::SidePanel);

    assert!(!host.mount(SurfaceId::SidePanel, stale_generation, session));
    assert!(host.mount(
        SurfaceId::SidePanel,
        fresh_generation,
        reveal_session(&service, "complexity"),
    ));
}

/// Locale switch re-resolves content under the new locale and the locale
/// fallback keeps un-translated annotations readable.
#[test]
fn locale_switch_changes_resolved_content() {
    let dir = content_dir();
    let service = ContentService::new(DirSource::new(dir.path()));

    let zh = service.resolve(Collection::Chapters, "emergence").unwrap();
    assert_eq!(zh.title, "涌现");

    service.set_locale(Locale::En);
    let en = service.resolve(Collection::Chapters, "emergence").unwrap();
    assert_eq!(en.title, "Emergence");

    // Japanese set is absent: fallback serves English
    service.set_locale(Locale::Ja);
    let ja = service.resolve(Collection::Chapters, "emergence").unwrap();
    assert_eq!(ja.title, "Emergence");
}

/// Narrow viewports pick the inline presenter; its surface is independent
/// of the side panel's.
#[test]
fn narrow_viewport_uses_inline_surface() {
    let dir = content_dir();
    let service = ContentService::with_locale(DirSource::new(dir.path()), Locale::En);
    let mut host = RevealHost::new();

    let presenter = PresenterKind::for_viewport(430.0);
    assert_eq!(presenter, PresenterKind::Inline);

    let generation = host.request(SurfaceId::Inline);
    assert!(host.mount(
        SurfaceId::Inline,
        generation,
        reveal_session(&service, "complexity"),
    ));
    assert!(host.status(SurfaceId::SidePanel).is_none());
}

/// The chapter tree knows which block anchors the inline note.
#[test]
fn marker_block_is_locatable_for_inline_insertion() {
    let dir = content_dir();
    let service = ContentService::with_locale(DirSource::new(dir.path()), Locale::En);

    let chapter = service.resolve(Collection::Chapters, "emergence").unwrap();
    let anchor = chapter
        .tree
        .children
        .iter()
        .position(|block| block.contains_marker("complexity"));

    // Heading first, paragraph with the marker second
    assert_eq!(anchor, Some(1));
}
