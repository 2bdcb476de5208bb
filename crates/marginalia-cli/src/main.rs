use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use marginalia_config::Config;
use marginalia_engine::content::{
    Collection, ContentService, DirSource, Locale, validate_content_dir,
};
use marginalia_engine::model::{ElementKind, Node};
use marginalia_engine::reveal::{
    LinkActivationMonitor, RevealHost, RevealSession, RevealStatus, SurfaceId, tokenize,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{env, io::stdout, path::PathBuf, process, time::Duration};

/// Typewriter tick period; also the event-poll timeout of the main loop.
const REVEAL_INTERVAL: Duration = Duration::from_millis(24);

struct App {
    content_path: PathBuf,
    service: ContentService,
    chapter_keys: Vec<String>,
    chapter_list_state: ListState,
    chapter_title: String,
    chapter_error: Option<String>,
    // The chapter pane drives its own session and monitor directly
    chapter_session: Option<RevealSession>,
    chapter_monitor: LinkActivationMonitor,
    // Annotations present in a panel surface managed by the host
    host: RevealHost,
    annotation_title: Option<String>,
    annotation_error: Option<String>,
    selected_marker: Option<usize>,
}

impl App {
    fn new(content_path: PathBuf, locale: Locale) -> Self {
        let service = ContentService::with_locale(DirSource::new(content_path.clone()), locale);
        let chapter_keys = service.chapter_keys();

        let mut app = Self {
            content_path,
            service,
            chapter_keys,
            chapter_list_state: ListState::default(),
            chapter_title: String::new(),
            chapter_error: None,
            chapter_session: None,
            chapter_monitor: LinkActivationMonitor::new(),
            host: RevealHost::new(),
            annotation_title: None,
            annotation_error: None,
            selected_marker: None,
        };

        if !app.chapter_keys.is_empty() {
            app.chapter_list_state.select(Some(0));
            app.start_chapter_reveal();
        }
        app
    }

    fn next_chapter(&mut self) {
        let i = match self.chapter_list_state.selected() {
            Some(i) => (i + 1) % self.chapter_keys.len(),
            None => 0,
        };
        self.chapter_list_state.select(Some(i));
        self.start_chapter_reveal();
    }

    fn previous_chapter(&mut self) {
        let i = match self.chapter_list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.chapter_keys.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.chapter_list_state.select(Some(i));
        self.start_chapter_reveal();
    }

    /// Resolve the selected chapter and begin revealing it from the top.
    /// Any annotation presentation belongs to the previous selection and is
    /// torn down first.
    fn start_chapter_reveal(&mut self) {
        self.dismiss_annotation();
        self.selected_marker = None;
        self.chapter_monitor = LinkActivationMonitor::new();

        let Some(key) = self.selected_chapter_key() else {
            self.chapter_session = None;
            return;
        };

        match self.service.resolve(Collection::Chapters, &key) {
            Ok(content) => {
                self.chapter_title = content.title.clone();
                self.chapter_error = None;
                let mut session = RevealSession::new(tokenize(&content.tree), REVEAL_INTERVAL);
                session.start();
                self.chapter_session = Some(session);
            }
            Err(e) => {
                self.chapter_title = key.clone();
                self.chapter_error = Some(format!("No content found for \"{key}\" ({e})"));
                self.chapter_session = None;
            }
        }
    }

    fn selected_chapter_key(&self) -> Option<String> {
        self.chapter_list_state
            .selected()
            .and_then(|i| self.chapter_keys.get(i).cloned())
    }

    /// One cooperative tick: advance the chapter reveal and the annotation
    /// surface, feeding the chapter monitor its events.
    fn advance(&mut self) {
        if let Some(session) = &mut self.chapter_session {
            if let Some(event) = session.tick() {
                self.chapter_monitor.observe(&event, session.mount_mut());
                if session.status() == RevealStatus::Completed {
                    self.chapter_monitor.finish(session.mount_mut());
                }
            }
        }
        let _ = self.host.tick(SurfaceId::SidePanel);
    }

    /// Marker keys currently interactive in the chapter pane, in reveal
    /// order.
    fn interactive_markers(&self) -> Vec<String> {
        self.chapter_monitor
            .activated()
            .iter()
            .map(|marker| marker.key.clone())
            .collect()
    }

    fn cycle_marker(&mut self) {
        let markers = self.interactive_markers();
        if markers.is_empty() {
            return;
        }
        self.selected_marker = Some(match self.selected_marker {
            Some(i) => (i + 1) % markers.len(),
            None => 0,
        });
    }

    fn activate_selected_marker(&mut self) {
        let markers = self.interactive_markers();
        let Some(key) = self
            .selected_marker
            .and_then(|i| markers.get(i).cloned())
        else {
            return;
        };

        let generation = self.host.request(SurfaceId::SidePanel);
        match self.service.resolve(Collection::Annotations, &key) {
            Ok(content) => {
                self.annotation_title = Some(content.title.clone());
                self.annotation_error = None;
                self.host.mount(
                    SurfaceId::SidePanel,
                    generation,
                    RevealSession::new(tokenize(&content.tree), REVEAL_INTERVAL),
                );
            }
            Err(_) => {
                self.annotation_title = Some(key.clone());
                self.annotation_error = Some(format!("No annotation found for \"{key}\""));
            }
        }
    }

    fn dismiss_annotation(&mut self) {
        self.host.release_all();
        self.annotation_title = None;
        self.annotation_error = None;
    }

    /// Cycle to the next locale, persist the preference, and re-resolve the
    /// current chapter under it.
    fn cycle_locale(&mut self) {
        let current = self.service.locale();
        let index = Locale::ALL.iter().position(|l| *l == current).unwrap_or(0);
        let next = Locale::ALL[(index + 1) % Locale::ALL.len()];
        self.service.set_locale(next);

        // Preference persistence is best-effort in the terminal reader
        let mut config = Config::new(self.content_path.clone());
        config.locale = next.code().to_string();
        let _ = config.save();

        self.start_chapter_reveal();
    }

    fn chapter_lines(&self) -> Vec<String> {
        if let Some(message) = &self.chapter_error {
            return vec![message.clone()];
        }
        let Some(session) = &self.chapter_session else {
            return vec!["No chapters found in the content directory".to_string()];
        };
        render_blocks(session.mount().children())
    }

    fn annotation_lines(&self) -> Option<Vec<String>> {
        if let Some(message) = &self.annotation_error {
            return Some(vec![message.clone()]);
        }
        self.annotation_title.as_ref()?;
        let mount = self.host.mount_point(SurfaceId::SidePanel)?;
        Some(render_blocks(mount.children()))
    }
}

/// Project mounted blocks to terminal lines, one vec entry per line.
fn render_blocks(blocks: &[Node]) -> Vec<String> {
    let mut lines = Vec::new();
    for block in blocks {
        match block {
            Node::Element {
                kind: ElementKind::Heading(level),
                ..
            } => {
                lines.push(format!("{} {}", "#".repeat(*level as usize), inline_text(block)));
                lines.push(String::new());
            }
            Node::Element {
                kind: ElementKind::Paragraph,
                ..
            } => {
                lines.push(inline_text(block));
                lines.push(String::new());
            }
            Node::Element {
                kind: ElementKind::List { ordered },
                children,
            } => {
                for (i, item) in children.iter().enumerate() {
                    let prefix = if *ordered {
                        format!("{}. ", i + 1)
                    } else {
                        "• ".to_string()
                    };
                    lines.push(format!("{prefix}{}", inline_text(item)));
                }
                lines.push(String::new());
            }
            Node::Element {
                kind: ElementKind::CodeBlock { lang },
                ..
            } => {
                lines.push(format!("```{}", lang.as_deref().unwrap_or("")));
                lines.extend(inline_text(block).lines().map(|s| s.to_string()));
                lines.push("```".to_string());
                lines.push(String::new());
            }
            Node::Element {
                kind: ElementKind::BlockQuote,
                ..
            } => {
                for line in inline_text(block).lines() {
                    lines.push(format!("> {line}"));
                }
                lines.push(String::new());
            }
            Node::Image { alt, .. } => {
                lines.push(format!("[image: {alt}]"));
                lines.push(String::new());
            }
            Node::Opaque { raw } => {
                lines.push(raw.clone());
                lines.push(String::new());
            }
            other => {
                lines.push(inline_text(other));
                lines.push(String::new());
            }
        }
    }
    lines
}

/// Inline projection of a subtree; markers render bracketed so they stay
/// visible as activation targets.
fn inline_text(node: &Node) -> String {
    match node {
        Node::Text(text) => text.clone(),
        Node::Image { alt, .. } => format!("[image: {alt}]"),
        Node::Opaque { raw } => raw.clone(),
        Node::Marker {
            children,
            interactive,
            ..
        } => {
            let label: String = children.iter().map(inline_text).collect();
            if *interactive {
                format!("[{label}]")
            } else {
                label
            }
        }
        Node::Element { children, .. } => children.iter().map(inline_text).collect(),
    }
}

fn main() -> Result<()> {
    // Determine content path and locale from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Usage: {} <content-folder-path>", args[0]);
            process::exit(1);
        }
    };

    let locale = config
        .as_ref()
        .and_then(|c| Locale::from_code(&c.locale))
        .unwrap_or(Locale::Zh);

    let (content_path, from_config) = if args.len() == 2 {
        (PathBuf::from(&args[1]), false)
    } else if args.len() == 1 {
        match config {
            Some(config) => (config.content_path, true),
            None => {
                eprintln!("Error: No content path provided and no config file found");
                eprintln!("Usage: {} <content-folder-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [content-folder-path]", args[0]);
        process::exit(1);
    };

    // Validate content directory using the engine
    if let Err(e) = validate_content_dir(&content_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Content path '{}'{} is invalid: {e}",
            content_path.display(),
            source
        );
        process::exit(1);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(content_path, locale);

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Poll with the reveal interval as timeout: keys are handled
        // immediately, and each timeout is one cooperative tick
        if event::poll(REVEAL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next_chapter(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous_chapter(),
                    KeyCode::Char('l') => app.cycle_locale(),
                    KeyCode::Tab => app.cycle_marker(),
                    KeyCode::Enter => app.activate_selected_marker(),
                    KeyCode::Esc => app.dismiss_annotation(),
                    _ => {}
                }
            }
        } else {
            app.advance();
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)].as_ref())
        .split(f.area());

    // Chapter list panel
    let chapter_items: Vec<ListItem> = app
        .chapter_keys
        .iter()
        .map(|key| ListItem::new(vec![Line::from(vec![Span::raw(key.clone())])]))
        .collect();

    let locale = app.service.locale();
    let chapters_list = List::new(chapter_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Chapters [{}]", locale.native_name())),
        )
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(chapters_list, chunks[0], &mut app.chapter_list_state);

    // Reading pane, split when an annotation is presented
    let annotation_lines = app.annotation_lines();
    let reading_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if annotation_lines.is_some() {
            vec![Constraint::Percentage(60), Constraint::Percentage(40)]
        } else {
            vec![Constraint::Min(0)]
        })
        .split(chunks[1]);

    let content_lines: Vec<Line> = app
        .chapter_lines()
        .into_iter()
        .map(|line| Line::from(vec![Span::raw(line)]))
        .collect();
    let content = Paragraph::new(content_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.chapter_title.clone()),
        )
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(content, reading_chunks[0]);

    if let Some(lines) = annotation_lines {
        let title = app
            .annotation_title
            .clone()
            .unwrap_or_else(|| "Annotation".to_string());
        let note_lines: Vec<Line> = lines
            .into_iter()
            .map(|line| Line::from(vec![Span::raw(line)]))
            .collect();
        let note = Paragraph::new(note_lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(ratatui::widgets::Wrap { trim: true });
        f.render_widget(note, reading_chunks[1]);
    }

    // Instructions
    let marker_hint = match (app.selected_marker, app.interactive_markers().len()) {
        (_, 0) => String::new(),
        (Some(i), n) => format!(" | marker {}/{n}", i + 1),
        (None, n) => format!(" | {n} markers"),
    };
    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/↓: Chapter | "),
        Span::raw("l: Locale | "),
        Span::raw("Tab: Marker | "),
        Span::raw("Enter: Annotate | "),
        Span::raw("Esc: Dismiss"),
        Span::raw(marker_hint),
    ]);

    let help = Paragraph::new(vec![help_text]).block(Block::default());

    let bottom_chunk = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());

    f.render_widget(help, bottom_chunk[1]);
}
