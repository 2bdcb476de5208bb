use crate::content::locale::{Collection, Locale, content_path};
use crate::content::source::{ContentSource, FetchError};
use crate::model::{RichText, build_rich_text, mark_external_links};
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no content for '{key}' in {locale} or any fallback")]
    NotFound { key: String, locale: Locale },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Title plus parsed tree for one (key, locale) pair. Immutable once built;
/// shared via `Arc` between the cache and every presenter showing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub title: String,
    pub tree: RichText,
}

type CacheKey = (Collection, String, Locale);

/// Resolves content keys against the store with locale fallback and caches
/// the results.
///
/// An explicit, constructible service owning its cache and locale state, so
/// tests get isolated instances instead of ambient process-wide globals.
/// Cache entries are write-once and keyed by the *requested* locale: repeat
/// requests never re-probe the fallback chain, and concurrent duplicate
/// resolutions are harmless because they compute equal content (first write
/// wins). There is no eviction; entries live for the process's lifetime.
pub struct ContentService {
    source: Box<dyn ContentSource>,
    cache: RefCell<HashMap<CacheKey, Arc<ResolvedContent>>>,
    locale: Cell<Locale>,
}

impl ContentService {
    pub fn new(source: impl ContentSource + 'static) -> Self {
        Self::with_locale(source, Locale::Zh)
    }

    pub fn with_locale(source: impl ContentSource + 'static, locale: Locale) -> Self {
        Self {
            source: Box::new(source),
            cache: RefCell::new(HashMap::new()),
            locale: Cell::new(locale),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale.get()
    }

    pub fn set_locale(&self, locale: Locale) {
        self.locale.set(locale);
    }

    /// Resolve `key` at the service's current locale.
    pub fn resolve(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Arc<ResolvedContent>, ResolveError> {
        self.resolve_at(collection, key, self.locale.get())
    }

    /// Resolve `key` at `locale`, walking the fallback chain on misses.
    ///
    /// Whatever the chain yields is cached under the *requested* locale, so
    /// the chain is walked at most once per (key, locale).
    pub fn resolve_at(
        &self,
        collection: Collection,
        key: &str,
        locale: Locale,
    ) -> Result<Arc<ResolvedContent>, ResolveError> {
        let cache_key = (collection, key.to_string(), locale);
        if let Some(hit) = self.cache.borrow().get(&cache_key) {
            return Ok(Arc::clone(hit));
        }

        let raw = self.fetch_with_fallback(collection, key, locale)?;
        let content = Arc::new(render_content(key, &raw));

        let mut cache = self.cache.borrow_mut();
        let entry = cache.entry(cache_key).or_insert(content);
        Ok(Arc::clone(entry))
    }

    fn fetch_with_fallback(
        &self,
        collection: Collection,
        key: &str,
        requested: Locale,
    ) -> Result<String, ResolveError> {
        let mut attempt = Some(requested);
        while let Some(locale) = attempt {
            match self.source.fetch(&content_path(collection, locale, key)) {
                Ok(raw) => return Ok(raw),
                Err(FetchError::NotFound(_)) => attempt = locale.fallback(),
                // Transport failure is not a miss; don't mask it with fallback
                Err(err) => return Err(ResolveError::Fetch(err)),
            }
        }
        Err(ResolveError::NotFound {
            key: key.to_string(),
            locale: requested,
        })
    }

    /// Chapter keys available in the store's primary set.
    pub fn chapter_keys(&self) -> Vec<String> {
        self.source.list_keys(Collection::Chapters)
    }
}

fn render_content(key: &str, raw: &str) -> ResolvedContent {
    let normalized = normalize_marker_notation(raw);
    let mut tree = build_rich_text(&normalized);
    mark_external_links(&mut tree);
    ResolvedContent {
        title: extract_title(raw, key),
        tree,
    }
}

/// Repair degraded marker notation before generic parsing.
///
/// The machine-translation pipeline occasionally strips the link wrapper
/// from `[label](annotation:key)`, leaving a bare `annotation:key` in prose.
/// Rewrap those so the parser still sees every marker. Occurrences already
/// inside a link target (preceded by `(`) are left alone.
fn normalize_marker_notation(raw: &str) -> String {
    static BARE_MARKER: OnceLock<Regex> = OnceLock::new();
    let re = BARE_MARKER.get_or_init(|| {
        Regex::new(r"(?m)(^|[^(\[])annotation:([a-z0-9-]+)").expect("invalid marker regex")
    });

    re.replace_all(raw, |caps: &regex::Captures| {
        let key = &caps[2];
        format!("{}[{key}](annotation:{key})", &caps[1])
    })
    .into_owned()
}

/// First top-level heading line of the raw text, or the key humanized.
fn extract_title(raw: &str, key: &str) -> String {
    raw.lines()
        .find_map(|line| line.trim_start().strip_prefix("# "))
        .map(|rest| rest.trim().to_string())
        .unwrap_or_else(|| humanize_key(key))
}

fn humanize_key(key: &str) -> String {
    key.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, Node};
    use crate::tests::MemorySource;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_reads_title_from_first_heading() {
        // Only the base-locale file exists
        let source = MemorySource::with_files(&[(
            "chapters/emergence.md",
            "# Emergence\n\nMany simple parts, one surprising whole.",
        )]);
        let service = ContentService::new(source);

        let content = service
            .resolve_at(Collection::Chapters, "emergence", Locale::En)
            .unwrap();
        assert_eq!(content.title, "Emergence");
    }

    #[test]
    fn resolve_falls_back_and_caches_under_requested_locale() {
        // No ja or en variant; only the primary variant is present
        let source = MemorySource::with_files(&[(
            "annotations/rule-30.md",
            "# Rule 30\n\nChaotic from a single cell.",
        )]);
        let service = ContentService::new(source.clone());

        let first = service
            .resolve_at(Collection::Annotations, "rule-30", Locale::Ja)
            .unwrap();
        assert_eq!(first.title, "Rule 30");
        assert_eq!(
            source.fetched(),
            vec![
                "annotations/ja/rule-30.md".to_string(),
                "annotations/en/rule-30.md".to_string(),
                "annotations/rule-30.md".to_string(),
            ]
        );

        // Second request at the same requested locale: no re-probe at all
        let second = service
            .resolve_at(Collection::Annotations, "rule-30", Locale::Ja)
            .unwrap();
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn exhausted_chain_is_not_found() {
        let service = ContentService::new(MemorySource::with_files(&[]));

        let result = service.resolve_at(Collection::Chapters, "rule-110", Locale::Ja);
        assert!(matches!(
            result,
            Err(ResolveError::NotFound { key, locale: Locale::Ja }) if key == "rule-110"
        ));
    }

    #[test]
    fn requested_locale_wins_over_fallback_when_present() {
        let source = MemorySource::with_files(&[
            ("chapters/emergence.md", "# 涌现"),
            ("chapters/en/emergence.md", "# Emergence"),
        ]);
        let service = ContentService::new(source);

        let content = service
            .resolve_at(Collection::Chapters, "emergence", Locale::En)
            .unwrap();
        assert_eq!(content.title, "Emergence");
    }

    #[test]
    fn title_falls_back_to_humanized_key() {
        let source =
            MemorySource::with_files(&[("annotations/rule-30.md", "No heading here, just prose.")]);
        let service = ContentService::new(source);

        let content = service
            .resolve(Collection::Annotations, "rule-30")
            .unwrap();
        assert_eq!(content.title, "Rule 30");
    }

    #[test]
    fn degraded_marker_notation_is_repaired() {
        let source = MemorySource::with_files(&[(
            "chapters/emergence.md",
            "intact [Rule 30](annotation:rule-30) and degraded annotation:glider here",
        )]);
        let service = ContentService::new(source);

        let content = service.resolve(Collection::Chapters, "emergence").unwrap();
        let Node::Element { children, .. } = &content.tree.children[0] else {
            panic!("expected paragraph");
        };
        let marker_keys: Vec<&str> = children
            .iter()
            .filter_map(|node| match node {
                Node::Marker { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(marker_keys, vec!["rule-30", "glider"]);
    }

    #[test]
    fn external_links_are_marked_after_parsing() {
        let source = MemorySource::with_files(&[(
            "chapters/emergence.md",
            "see [the paper](https://example.org/wolfram)",
        )]);
        let service = ContentService::new(source);

        let content = service.resolve(Collection::Chapters, "emergence").unwrap();
        let Node::Element { children, .. } = &content.tree.children[0] else {
            panic!("expected paragraph");
        };
        assert!(matches!(
            &children[1],
            Node::Element {
                kind: ElementKind::Link {
                    opens_new_context: true,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn sample_chapter_carries_markers_and_atomic_media() {
        let source =
            MemorySource::with_files(&[("chapters/emergence.md", crate::tests::SAMPLE_CHAPTER)]);
        let service = ContentService::new(source);

        let content = service.resolve(Collection::Chapters, "emergence").unwrap();
        assert_eq!(content.title, "Emergence");

        let mut markers = 0;
        let mut images = 0;
        let mut work: Vec<&Node> = content.tree.children.iter().collect();
        while let Some(node) = work.pop() {
            match node {
                Node::Marker { children, .. } => {
                    markers += 1;
                    work.extend(children.iter());
                }
                Node::Image { .. } => images += 1,
                Node::Element { children, .. } => work.extend(children.iter()),
                _ => {}
            }
        }
        assert_eq!((markers, images), (1, 1));
    }

    #[test]
    fn locale_state_drives_plain_resolve() {
        let source = MemorySource::with_files(&[
            ("chapters/emergence.md", "# 涌现"),
            ("chapters/en/emergence.md", "# Emergence"),
        ]);
        let service = ContentService::new(source);
        assert_eq!(service.locale(), Locale::Zh);

        service.set_locale(Locale::En);
        let content = service.resolve(Collection::Chapters, "emergence").unwrap();
        assert_eq!(content.title, "Emergence");
    }
}
