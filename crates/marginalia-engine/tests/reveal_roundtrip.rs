//! End-to-end: resolve markdown from a store, tokenize it, replay the whole
//! stream through a hosted session, and compare the mounted structure
//! against the source tree.

use marginalia_engine::content::{Collection, ContentService, DirSource, Locale};
use marginalia_engine::model::{Node, build_rich_text};
use marginalia_engine::reveal::{RevealHost, RevealSession, RevealStatus, SurfaceId, tokenize};
use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const CHAPTER: &str = "\
# Emergence

Simple rules compose into [complex wholes](annotation:complexity); the
*whole* is more than its parts.

![rule 30 evolution](images/rule-30.png)

- local order
- global surprise
";

fn content_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("chapters")).unwrap();
    fs::create_dir_all(dir.path().join("annotations")).unwrap();
    fs::write(dir.path().join("chapters/emergence.md"), CHAPTER).unwrap();
    fs::write(
        dir.path().join("annotations/complexity.md"),
        "# Complexity\n\nMore is different.",
    )
    .unwrap();
    dir
}

#[test]
fn full_replay_reconstructs_the_resolved_tree() {
    let dir = content_dir();
    let service = ContentService::new(DirSource::new(dir.path()));

    let content = service
        .resolve_at(Collection::Chapters, "emergence", Locale::Ja)
        .unwrap();
    assert_eq!(content.title, "Emergence");

    let mut host = RevealHost::new();
    let generation = host.request(SurfaceId::SidePanel);
    host.mount(
        SurfaceId::SidePanel,
        generation,
        RevealSession::new(tokenize(&content.tree), Duration::from_millis(20)),
    );
    while host.tick(SurfaceId::SidePanel).is_some() {}

    assert_eq!(
        host.status(SurfaceId::SidePanel),
        Some(RevealStatus::Completed)
    );
    // Same nesting, same text, same atomic placement. The completion sweep
    // has activated every marker, so the mounted tree matches the source
    // (whose markers are born interactive) exactly.
    assert_eq!(
        host.mount_point(SurfaceId::SidePanel).unwrap().children(),
        content.tree.children.as_slice()
    );
}

#[test]
fn annotation_selected_from_a_chapter_marker_reveals_in_the_panel() {
    let dir = content_dir();
    let service = ContentService::new(DirSource::new(dir.path()));

    let chapter = service
        .resolve(Collection::Chapters, "emergence")
        .unwrap();
    let marker_key = find_marker_key(&chapter.tree.children).expect("chapter has a marker");

    let annotation = service
        .resolve(Collection::Annotations, &marker_key)
        .unwrap();
    assert_eq!(annotation.title, "Complexity");

    let mut host = RevealHost::new();
    let generation = host.request(SurfaceId::SidePanel);
    assert!(host.mount(
        SurfaceId::SidePanel,
        generation,
        RevealSession::new(tokenize(&annotation.tree), Duration::from_millis(20)),
    ));
    while host.tick(SurfaceId::SidePanel).is_some() {}

    let mount = host.mount_point(SurfaceId::SidePanel).unwrap();
    let text: String = mount.children().iter().map(Node::plain_text).collect();
    assert_eq!(text, "ComplexityMore is different.");
}

#[test]
fn tokenize_replay_round_trip_holds_for_direct_markdown() {
    let tree = build_rich_text(
        "> quoted *depth*\n\n1. first\n2. second\n\n`inline code` and ![img](x.png)",
    );

    let mut host = RevealHost::new();
    let generation = host.request(SurfaceId::Inline);
    host.mount(
        SurfaceId::Inline,
        generation,
        RevealSession::new(tokenize(&tree), Duration::from_millis(20)),
    );
    while host.tick(SurfaceId::Inline).is_some() {}

    assert_eq!(
        host.mount_point(SurfaceId::Inline).unwrap().children(),
        tree.children.as_slice()
    );
}

fn find_marker_key(nodes: &[Node]) -> Option<String> {
    let mut work: Vec<&Node> = nodes.iter().collect();
    while let Some(node) = work.pop() {
        match node {
            Node::Marker { key, .. } => return Some(key.clone()),
            Node::Element { children, .. } => work.extend(children.iter()),
            _ => {}
        }
    }
    None
}
