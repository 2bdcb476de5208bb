use relative_path::RelativePathBuf;
use std::fmt;

/// Human-language variant of the content set.
///
/// The set is closed and arranged in a fixed fallback chain: `Ja → En → Zh`.
/// `Zh` is the primary locale; its files live at the collection root with no
/// locale subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    Zh,
    En,
    Ja,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Zh, Locale::En, Locale::Ja];

    /// The locale consulted next when content is missing here.
    /// The primary locale has no parent: a miss there is terminal.
    pub fn fallback(self) -> Option<Locale> {
        match self {
            Locale::Ja => Some(Locale::En),
            Locale::En => Some(Locale::Zh),
            Locale::Zh => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Locale::Zh => "zh",
            Locale::En => "en",
            Locale::Ja => "ja",
        }
    }

    pub fn from_code(code: &str) -> Option<Locale> {
        match code {
            "zh" => Some(Locale::Zh),
            "en" => Some(Locale::En),
            "ja" => Some(Locale::Ja),
            _ => None,
        }
    }

    /// Store subdirectory for this locale; the primary set has none.
    pub fn subpath(self) -> Option<&'static str> {
        match self {
            Locale::Zh => None,
            Locale::En => Some("en"),
            Locale::Ja => Some("ja"),
        }
    }

    /// Native-script name, for locale switcher labels.
    pub fn native_name(self) -> &'static str {
        match self {
            Locale::Zh => "中文",
            Locale::En => "English",
            Locale::Ja => "日本語",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The two content collections the store serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Chapters,
    Annotations,
}

impl Collection {
    pub fn dir(self) -> &'static str {
        match self {
            Collection::Chapters => "chapters",
            Collection::Annotations => "annotations",
        }
    }
}

/// Store path for a content key: `{collection}/{locale-subpath?}/{key}.md`.
pub fn content_path(collection: Collection, locale: Locale, key: &str) -> RelativePathBuf {
    let mut path = RelativePathBuf::from(collection.dir());
    if let Some(subpath) = locale.subpath() {
        path.push(subpath);
    }
    path.push(format!("{key}.md"));
    path
}
