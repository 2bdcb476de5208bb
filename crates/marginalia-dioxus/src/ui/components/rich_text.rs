use dioxus::prelude::*;
use marginalia_engine::model::{ElementKind, Node};
use std::path::PathBuf;

/// Props for rich-text rendering
#[derive(Props, Clone, PartialEq)]
pub struct RichTextProps {
    /// The nodes to render
    pub nodes: Vec<Node>,
    /// The content directory, for resolving embedded media paths
    pub content_path: PathBuf,
    /// Key of the currently active annotation marker, if any
    pub active_marker: Option<String>,
    /// Callback for marker activation
    pub on_marker_activate: Callback<String>,
}

/// Renders a rich-text node list with annotation markers and external links
#[component]
pub fn RichTextView(props: RichTextProps) -> Element {
    rsx! {
        for node in props.nodes.iter() {
            {render_node(node, &props)}
        }
    }
}

fn render_node(node: &Node, props: &RichTextProps) -> Element {
    match node {
        Node::Text(text) => rsx! { "{text}" },
        Node::Image { src, alt } => {
            let resolved = resolve_media_src(src, &props.content_path);
            rsx! {
                img {
                    class: "embedded-media",
                    src: "{resolved}",
                    alt: "{alt}",
                }
            }
        }
        Node::Marker {
            key,
            children,
            interactive,
        } => render_marker(key, children, *interactive, props),
        Node::Element { kind, children } => render_element(kind, children, props),
        Node::Opaque { raw } => rsx! { span { class: "opaque", "{raw}" } },
    }
}

fn render_marker(key: &str, children: &[Node], interactive: bool, props: &RichTextProps) -> Element {
    // Markers mid-reveal stay inert until the activation monitor flips them
    if !interactive {
        return rsx! {
            span {
                class: "marker pending",
                {render_children(children, props)}
            }
        };
    }

    let is_active = props.active_marker.as_deref() == Some(key);
    let class = if is_active { "marker active" } else { "marker" };
    let key = key.to_string();
    let on_marker_activate = props.on_marker_activate;
    rsx! {
        a {
            class: "{class}",
            href: "#",
            onclick: move |evt: MouseEvent| {
                evt.prevent_default();
                evt.stop_propagation();
                on_marker_activate.call(key.clone());
            },
            {render_children(children, props)}
        }
    }
}

fn render_element(kind: &ElementKind, children: &[Node], props: &RichTextProps) -> Element {
    match kind {
        ElementKind::Paragraph => rsx! { p { {render_children(children, props)} } },
        ElementKind::Heading(level) => render_heading(*level, children, props),
        ElementKind::Emphasis => rsx! { em { {render_children(children, props)} } },
        ElementKind::Strong => rsx! { strong { {render_children(children, props)} } },
        ElementKind::InlineCode => rsx! { code { {render_children(children, props)} } },
        ElementKind::CodeBlock { lang } => {
            let class = lang
                .as_deref()
                .map(|lang| format!("language-{lang}"))
                .unwrap_or_default();
            rsx! {
                pre {
                    code {
                        class: "{class}",
                        {render_children(children, props)}
                    }
                }
            }
        }
        ElementKind::BlockQuote => rsx! { blockquote { {render_children(children, props)} } },
        ElementKind::List { ordered: true } => rsx! { ol { {render_children(children, props)} } },
        ElementKind::List { ordered: false } => rsx! { ul { {render_children(children, props)} } },
        ElementKind::Item => rsx! { li { {render_children(children, props)} } },
        ElementKind::Link {
            href,
            opens_new_context,
        } => render_link(href, *opens_new_context, children, props),
    }
}

fn render_link(
    href: &str,
    opens_new_context: bool,
    children: &[Node],
    props: &RichTextProps,
) -> Element {
    if !opens_new_context {
        return rsx! {
            a {
                class: "internal-link",
                href: "{href}",
                {render_children(children, props)}
            }
        };
    }

    // Foreign-origin links leave the reading surface alone and open in the
    // system browser
    let href_clone = href.to_string();
    rsx! {
        a {
            class: "external-link",
            href: "{href}",
            target: "_blank",
            rel: "noopener noreferrer",
            onclick: move |evt: MouseEvent| {
                evt.prevent_default();
                evt.stop_propagation();
                if let Err(e) = open_url(&href_clone) {
                    log::warn!("Failed to open URL {}: {}", href_clone, e);
                }
            },
            {render_children(children, props)}
            span { class: "external-link-icon", " ↗" }
        }
    }
}

fn render_heading(level: u8, children: &[Node], props: &RichTextProps) -> Element {
    match level {
        1 => rsx! { h1 { {render_children(children, props)} } },
        2 => rsx! { h2 { {render_children(children, props)} } },
        3 => rsx! { h3 { {render_children(children, props)} } },
        4 => rsx! { h4 { {render_children(children, props)} } },
        5 => rsx! { h5 { {render_children(children, props)} } },
        _ => rsx! { h6 { {render_children(children, props)} } },
    }
}

fn render_children(children: &[Node], props: &RichTextProps) -> Element {
    rsx! {
        for child in children.iter() {
            {render_node(child, props)}
        }
    }
}

fn resolve_media_src(src: &str, content_path: &PathBuf) -> String {
    if src.starts_with("http://") || src.starts_with("https://") {
        src.to_string()
    } else {
        format!("file://{}", content_path.join(src).display())
    }
}

/// Opens a URL in the system's default browser
fn open_url(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    Ok(())
}
