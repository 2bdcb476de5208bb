use crate::model::{ElementKind, Node, RichText};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

/// URL scheme of the inline annotation-marker notation `[label](annotation:key)`.
pub const MARKER_SCHEME: &str = "annotation:";

/// Parse raw markdown into a [`RichText`] tree.
///
/// Generic markup parsing is delegated to pulldown-cmark; this builder only
/// folds its event stream into our node shapes. Links using the
/// `annotation:` scheme become [`Node::Marker`]; images and constructs we
/// have no shape for become indivisible leaves.
pub fn build_rich_text(markdown: &str) -> RichText {
    let mut builder = TreeBuilder::default();
    for event in Parser::new_ext(markdown, Options::empty()) {
        builder.event(event);
    }
    builder.finish()
}

/// Flag absolute foreign-origin hyperlinks so presenters open them in a new
/// context instead of navigating the reading surface away.
pub fn mark_external_links(tree: &mut RichText) {
    let mut work: Vec<&mut Node> = tree.children.iter_mut().collect();
    while let Some(node) = work.pop() {
        match node {
            Node::Element {
                kind: ElementKind::Link {
                    href,
                    opens_new_context,
                },
                children,
            } => {
                if href.starts_with("http://") || href.starts_with("https://") {
                    *opens_new_context = true;
                }
                work.extend(children.iter_mut());
            }
            Node::Element { children, .. } | Node::Marker { children, .. } => {
                work.extend(children.iter_mut());
            }
            _ => {}
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<Node>,
    open: Vec<Node>,
    opaque: Option<OpaqueCollector>,
    image: Option<ImageCollector>,
}

/// Collects the plain-text interior of a construct we keep as one opaque unit.
struct OpaqueCollector {
    raw: String,
    depth: usize,
}

/// Collects the alt text between an image's start and end events.
struct ImageCollector {
    src: String,
    alt: String,
    depth: usize,
}

impl TreeBuilder {
    fn event(&mut self, event: Event) {
        if self.collect_opaque(&event) || self.collect_image(&event) {
            return;
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.close(),
            Event::Text(text) => self.push_text(&text),
            Event::Code(text) => self.push(Node::Element {
                kind: ElementKind::InlineCode,
                children: vec![Node::Text(text.to_string())],
            }),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            Event::Rule => self.push(Node::Opaque {
                raw: "---".to_string(),
            }),
            Event::Html(html) | Event::InlineHtml(html) => self.push(Node::Opaque {
                raw: html.to_string(),
            }),
            Event::FootnoteReference(name) => self.push(Node::Opaque {
                raw: format!("[^{name}]"),
            }),
            Event::TaskListMarker(done) => self.push(Node::Opaque {
                raw: if done { "[x]" } else { "[ ]" }.to_string(),
            }),
            Event::InlineMath(math) | Event::DisplayMath(math) => self.push(Node::Opaque {
                raw: math.to_string(),
            }),
        }
    }

    fn start(&mut self, tag: Tag) {
        let kind = match tag {
            Tag::Paragraph => ElementKind::Paragraph,
            Tag::Heading { level, .. } => ElementKind::Heading(level as u8),
            Tag::BlockQuote(_) => ElementKind::BlockQuote,
            Tag::CodeBlock(code_kind) => ElementKind::CodeBlock {
                lang: match code_kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                },
            },
            Tag::List(start) => ElementKind::List {
                ordered: start.is_some(),
            },
            Tag::Item => ElementKind::Item,
            Tag::Emphasis => ElementKind::Emphasis,
            Tag::Strong => ElementKind::Strong,
            Tag::Link { dest_url, .. } => {
                if let Some(key) = dest_url.strip_prefix(MARKER_SCHEME) {
                    self.open.push(Node::Marker {
                        key: key.to_string(),
                        children: Vec::new(),
                        interactive: true,
                    });
                    return;
                }
                ElementKind::Link {
                    href: dest_url.to_string(),
                    opens_new_context: false,
                }
            }
            Tag::Image { dest_url, .. } => {
                self.image = Some(ImageCollector {
                    src: dest_url.to_string(),
                    alt: String::new(),
                    depth: 0,
                });
                return;
            }
            // Tables, footnote definitions, metadata blocks, html blocks:
            // no shape of ours, so capture the interior as one opaque unit.
            _ => {
                self.opaque = Some(OpaqueCollector {
                    raw: String::new(),
                    depth: 0,
                });
                return;
            }
        };

        self.open.push(Node::Element {
            kind,
            children: Vec::new(),
        });
    }

    fn close(&mut self) {
        if let Some(node) = self.open.pop() {
            self.push(node);
        }
    }

    fn finish(mut self) -> RichText {
        // Unbalanced input from the parser shouldn't lose content
        while !self.open.is_empty() {
            self.close();
        }
        RichText::new(self.roots)
    }

    fn collect_opaque(&mut self, event: &Event) -> bool {
        if self.opaque.is_none() {
            return false;
        }
        match event {
            Event::Start(_) => {
                if let Some(collector) = &mut self.opaque {
                    collector.depth += 1;
                }
            }
            Event::End(_) => {
                let done = self.opaque.as_ref().is_some_and(|c| c.depth == 0);
                if done {
                    if let Some(collector) = self.opaque.take() {
                        self.push(Node::Opaque { raw: collector.raw });
                    }
                } else if let Some(collector) = &mut self.opaque {
                    collector.depth -= 1;
                }
            }
            Event::Text(text)
            | Event::Code(text)
            | Event::Html(text)
            | Event::InlineHtml(text) => {
                if let Some(collector) = &mut self.opaque {
                    collector.raw.push_str(text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(collector) = &mut self.opaque {
                    collector.raw.push('\n');
                }
            }
            _ => {}
        }
        true
    }

    fn collect_image(&mut self, event: &Event) -> bool {
        if self.image.is_none() {
            return false;
        }
        match event {
            Event::Start(_) => {
                if let Some(collector) = &mut self.image {
                    collector.depth += 1;
                }
            }
            Event::End(_) => {
                let done = self.image.as_ref().is_some_and(|c| c.depth == 0);
                if done {
                    if let Some(collector) = self.image.take() {
                        self.push(Node::Image {
                            src: collector.src,
                            alt: collector.alt,
                        });
                    }
                } else if let Some(collector) = &mut self.image {
                    collector.depth -= 1;
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(collector) = &mut self.image {
                    collector.alt.push_str(text);
                }
            }
            _ => {}
        }
        true
    }

    fn push(&mut self, node: Node) {
        self.current_children_mut().push(node);
    }

    /// Append prose, merging into a trailing text node so adjacent runs
    /// (soft breaks, entity splits) stay one node.
    fn push_text(&mut self, text: &str) {
        let children = self.current_children_mut();
        if let Some(Node::Text(existing)) = children.last_mut() {
            existing.push_str(text);
        } else {
            children.push(Node::Text(text.to_string()));
        }
    }

    fn current_children_mut(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(Node::Element { children, .. }) | Some(Node::Marker { children, .. }) => children,
            Some(_) => unreachable!("only container nodes are opened"),
            None => &mut self.roots,
        }
    }
}
