use anyhow::{Context, Result, bail};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};
use wenshi_config::Config;
use wenshi_engine::{
    Annotator, Cmd, DocumentTree, NodeRef, StructuredPosition,
    editing::{OffsetMap, TagState},
    io::{self, FileKind, OpenedDocument, envelope},
    models::tag,
    parsing::parse,
};

const USAGE: &str = "Usage: wenshi-cli <command> [args]

Commands:
  edit <file>          Annotate a .wen or .txt document
  check <path>         Validate a document, or every document under a folder
  strip <file>         Print the clean text of a document
  wrap <txt> <wen>     Wrap a plain text file in a .wen envelope

Relative paths resolve against documents_path from the config file.";

struct App {
    document: OpenedDocument,
    annotator: Annotator,
    /// Flat offsets; `head` is where the cursor is drawn.
    anchor: usize,
    head: usize,
    tag_cursor: usize,
    show_invisible_chars: bool,
    status: String,
}

impl App {
    fn new(document: OpenedDocument, show_invisible_chars: bool) -> Self {
        let annotator = Annotator::with_content(&document.content);
        let status = format!("Opened {}", document.path.display());
        Self {
            document,
            annotator,
            anchor: 0,
            head: 0,
            tag_cursor: 0,
            show_invisible_chars,
            status,
        }
    }

    fn flat_len(&self) -> usize {
        OffsetMap::build(self.annotator.document()).flat_len()
    }

    fn move_head(&mut self, delta: isize, extend: bool) {
        let len = self.flat_len() as isize;
        self.head = (self.head as isize + delta).clamp(0, len) as usize;
        if !extend {
            self.anchor = self.head;
        }
        self.push_selection();
    }

    /// Sends the flat anchor/head pair to the annotator.
    fn push_selection(&mut self) {
        let map = OffsetMap::build(self.annotator.document());
        let (start, end) = (self.anchor.min(self.head), self.anchor.max(self.head));
        let selection = if start == end {
            map.cursor_position(start)
                .map(|p| p..p)
                .unwrap_or(StructuredPosition(1)..StructuredPosition(1))
        } else {
            match map.structured_range(start..end) {
                Some(range) => range,
                None => return,
            }
        };
        self.annotator.set_selection(selection);
    }

    /// Reads the selection back after the annotator moved it.
    fn pull_selection(&mut self) {
        if let Some(range) = self.annotator.flat_selection() {
            self.anchor = range.start;
            self.head = range.end;
        }
    }

    fn edit(&mut self, cmd: Cmd) {
        self.annotator.apply_edit(cmd);
        self.annotator.run_pending();
        self.pull_selection();
    }

    fn type_char(&mut self, c: char) {
        let range = self.annotator.selection();
        if range.start < range.end {
            self.edit(Cmd::Paste {
                range,
                text: c.to_string(),
            });
        } else {
            self.edit(Cmd::InsertText {
                at: range.start,
                text: c.to_string(),
            });
        }
    }

    fn backspace(&mut self) {
        let range = self.annotator.selection();
        if range.start < range.end {
            self.edit(Cmd::DeleteRange { range });
        } else if self.head > 0 {
            self.anchor = self.head - 1;
            self.push_selection();
            let range = self.annotator.selection();
            self.edit(Cmd::DeleteRange { range });
        }
    }

    fn split_paragraph(&mut self) {
        let at = self.annotator.selection().start;
        self.edit(Cmd::SplitParagraph { at });
    }

    fn current_tag(&self) -> &'static str {
        tag::TAGS[self.tag_cursor % tag::TAGS.len()].code
    }

    fn cycle_tag(&mut self, forward: bool) {
        let n = tag::TAGS.len();
        self.tag_cursor = if forward {
            (self.tag_cursor + 1) % n
        } else {
            (self.tag_cursor + n - 1) % n
        };
    }

    fn toggle_current_tag(&mut self) {
        let code = self.current_tag();
        self.status = match self.annotator.toggle_tag(code) {
            Ok(change) => format!("{}: {change:?}", tag::label_for(code)),
            Err(refusal) => format!("Cannot tag: {refusal}"),
        };
        self.annotator.run_pending();
        self.pull_selection();
    }

    fn reset_formatting(&mut self) {
        self.status = if self.annotator.reset_formatting() {
            "Annotations removed".to_string()
        } else {
            "No annotations under selection".to_string()
        };
        self.annotator.run_pending();
        self.pull_selection();
    }

    fn undo(&mut self) {
        if self.annotator.undo() {
            self.annotator.run_pending();
            self.pull_selection();
        }
    }

    fn redo(&mut self) {
        if self.annotator.redo() {
            self.annotator.run_pending();
            self.pull_selection();
        }
    }

    fn save(&mut self) {
        let content = self.annotator.content();
        self.status = match self.document.save(&content) {
            Ok(()) => {
                self.document.content = content;
                format!("Saved {}", self.document.path.display())
            }
            Err(e) => format!("Save failed: {e}"),
        };
    }

    fn is_dirty(&self) -> bool {
        self.annotator.content() != self.document.content
    }

    /// One line per paragraph, hard breaks start a new line too.
    fn render_lines(&self) -> Vec<Line<'static>> {
        let selection = self.annotator.selection();
        let collapsed = selection.start == selection.end;
        let in_selection = |pos: usize| {
            if collapsed {
                pos == selection.start.get()
            } else {
                selection.start.get() <= pos && pos < selection.end.get()
            }
        };
        let highlight = if collapsed {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default().bg(Color::Yellow).fg(Color::Black)
        };

        let mut lines = Vec::new();
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut paragraph_end = None;

        let close_paragraph =
            |spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>, end: usize| {
                let marker = if self.show_invisible_chars { "¶" } else { " " };
                let style = if in_selection(end) {
                    highlight
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(marker, style));
                lines.push(Line::from(std::mem::take(spans)));
            };

        for node in self.annotator.document().descendants() {
            match node {
                NodeRef::Paragraph { pos, .. } => {
                    if let Some(end) = paragraph_end {
                        close_paragraph(&mut spans, &mut lines, end);
                    }
                    paragraph_end = Some(pos.get() + 1);
                }
                NodeRef::Text { pos, text, mark } => {
                    let base = match mark {
                        Some(mark) => Style::default()
                            .fg(hex_color(&mark.color))
                            .add_modifier(Modifier::UNDERLINED),
                        None => Style::default(),
                    };
                    for (i, c) in text.chars().enumerate() {
                        let style = if in_selection(pos.get() + i) {
                            highlight
                        } else {
                            base
                        };
                        spans.push(Span::styled(c.to_string(), style));
                    }
                    if let Some(mark) = mark {
                        spans.push(Span::styled(
                            format!("[{}]", mark.label),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    paragraph_end = Some(pos.get() + text.chars().count());
                }
                NodeRef::HardBreak { pos } => {
                    let marker = if self.show_invisible_chars { "↵" } else { " " };
                    let style = if in_selection(pos.get()) {
                        highlight
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    spans.push(Span::styled(marker, style));
                    lines.push(Line::from(std::mem::take(&mut spans)));
                    paragraph_end = Some(pos.get() + 1);
                }
            }
        }
        if let Some(end) = paragraph_end {
            close_paragraph(&mut spans, &mut lines, end);
        }
        lines
    }

    fn render_toolbar(&self) -> Vec<Line<'static>> {
        let current = self.current_tag();
        tag::TagGroup::ALL
            .iter()
            .map(|group| {
                let mut spans = vec![Span::styled(
                    format!("{:<12}", group.title()),
                    Style::default().add_modifier(Modifier::BOLD),
                )];
                let states = self.annotator.toolbar();
                for descriptor in tag::codes_in_group(*group) {
                    let state = states
                        .iter()
                        .find(|(code, _)| *code == descriptor.code)
                        .map(|(_, state)| *state)
                        .unwrap_or(TagState::Disabled);
                    let mut style = match state {
                        TagState::Disabled => Style::default().fg(Color::DarkGray),
                        TagState::Active => Style::default(),
                        TagState::Checked => Style::default().fg(Color::Green),
                    };
                    if descriptor.code == current {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    let check = if state == TagState::Checked { "✓" } else { "" };
                    spans.push(Span::styled(format!("{}{check}", descriptor.label), style));
                    spans.push(Span::raw(" "));
                }
                Line::from(spans)
            })
            .collect()
    }
}

fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    match u32::from_str_radix(digits, 16) {
        Ok(rgb) if digits.len() == 6 => {
            Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
        }
        _ => Color::Reset,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring config file: {e}");
            None
        }
    };
    let base = config.as_ref().map(|c| c.documents_path.clone());
    let show_invisible_chars = config.as_ref().is_some_and(|c| c.show_invisible_chars);
    let resolve = |arg: &str| resolve_path(arg, base.as_deref());

    let words: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
    let result = match words.as_slice() {
        ["edit", file] => edit(&resolve(*file), show_invisible_chars),
        [file] if !matches!(*file, "check" | "strip" | "wrap") => {
            edit(&resolve(*file), show_invisible_chars)
        }
        ["check", path] => check(&resolve(*path)),
        ["check"] => match &base {
            Some(dir) => check(dir),
            None => {
                eprintln!("Error: No path provided and no config file found");
                eprintln!("Create a config file at {}", Config::config_path().display());
                process::exit(1);
            }
        },
        ["strip", file] => strip(&resolve(*file)),
        ["wrap", txt, wen] => wrap(&resolve(*txt), &resolve(*wen)),
        _ => {
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
    Ok(())
}

fn resolve_path(arg: &str, base: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(arg);
    match base {
        Some(base) if path.is_relative() && !path.exists() => base.join(path),
        _ => path,
    }
}

fn check(path: &Path) -> Result<()> {
    let files = if path.is_dir() {
        io::scan_documents(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut failures = 0;
    for file in &files {
        match io::open_document(file) {
            Ok(doc) => {
                let spans = parse(&doc.content).spans.len();
                let modified = doc
                    .metadata
                    .map(|m| format!(", modified {}", m.modified_at.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_default();
                println!("ok    {} ({spans} annotations{modified})", file.display());
            }
            Err(e) => {
                failures += 1;
                println!("FAIL  {}: {e}", file.display());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} documents failed validation", files.len());
    }
    Ok(())
}

fn strip(path: &Path) -> Result<()> {
    let doc = io::open_document(path)?;
    println!("{}", parse(&doc.content).clean_text);
    Ok(())
}

fn wrap(txt: &Path, wen: &Path) -> Result<()> {
    if FileKind::from_path(wen) != Some(FileKind::Wen) {
        bail!("output must have a .wen extension: {}", wen.display());
    }
    let source = io::open_document(txt)?;
    let xml = envelope::serialize(&source.content, &envelope::Metadata::new())?;
    io::write_file(wen, &xml).with_context(|| format!("writing {}", wen.display()))?;
    println!("Wrote {}", wen.display());
    Ok(())
}

fn edit(path: &Path, show_invisible_chars: bool) -> Result<()> {
    let document = if path.exists() {
        io::open_document(path)?
    } else {
        OpenedDocument::new(path.to_path_buf(), "")?
    };
    let mut app = App::new(document, show_invisible_chars);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && handle_key(app, key)
        {
            return Ok(());
        }
    }
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') if ctrl => return true,
        KeyCode::Char('s') if ctrl => app.save(),
        KeyCode::Char('z') if ctrl => app.undo(),
        KeyCode::Char('y') if ctrl => app.redo(),
        KeyCode::Char('r') if ctrl => app.reset_formatting(),
        KeyCode::Char('t') if ctrl => app.toggle_current_tag(),
        KeyCode::Esc => {
            if app.is_dirty() {
                app.status = "Unsaved changes: Ctrl+S to save, Ctrl+Q to quit".to_string();
            } else {
                return true;
            }
        }
        KeyCode::Left => app.move_head(-1, shift),
        KeyCode::Right => app.move_head(1, shift),
        KeyCode::Tab => app.cycle_tag(true),
        KeyCode::BackTab => app.cycle_tag(false),
        KeyCode::Enter => app.split_paragraph(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Char(c) if !ctrl => app.type_char(c),
        _ => {}
    }
    false
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Min(3),
                Constraint::Length(tag::TagGroup::ALL.len() as u16 + 2),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(f.area());

    let dirty = if app.is_dirty() { " *" } else { "" };
    let title = format!("{}{dirty}", app.document.path.display());
    let content = Paragraph::new(app.render_lines())
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(content, chunks[0]);

    let toolbar = Paragraph::new(app.render_toolbar())
        .block(Block::default().borders(Borders::ALL).title("Tags"));
    f.render_widget(toolbar, chunks[1]);

    let help = vec![
        Line::from(app.status.clone()),
        Line::from(vec![
            Span::raw("←/→: Move | Shift: Select | Tab: Next tag | "),
            Span::raw("^T: Toggle | ^R: Reset | ^Z/^Y: Undo/Redo | ^S: Save | ^Q/Esc: Quit"),
        ]),
    ];
    f.render_widget(Paragraph::new(help), chunks[2]);
}
