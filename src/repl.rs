//! Interactive REPL mode for folio
//!
//! Run `folio` with no arguments (or `folio chat <paths>`) to enter
//! interactive mode. Plain input is a question about the loaded
//! documents; input starting with `/` is a command, with a dropdown of
//! matching commands shown below the input line.

use anyhow::Result;
use colored::*;
use crossterm::{
    cursor::{MoveLeft, RestorePosition, SavePosition},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
    tty::IsTty,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::{Dispatcher, DocumentFormat};
use crate::llm::{Answerer, Role};
use crate::pipeline::{load_files, ProgressTracker};
use crate::render::export_transcript_html;
use crate::session::{ChatSession, SessionError, SubmitOutcome};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command definition with name and description
struct Command {
    name: &'static str,
    description: &'static str,
}

const COMMANDS: &[Command] = &[
    Command { name: "/load", description: "Load documents (replaces current)" },
    Command { name: "/files", description: "List loaded documents" },
    Command { name: "/kb", description: "Show the knowledge base" },
    Command { name: "/history", description: "Show the conversation" },
    Command { name: "/export", description: "Save the conversation as HTML" },
    Command { name: "/clear", description: "Start the conversation over" },
    Command { name: "/help", description: "Show this help" },
    Command { name: "/exit", description: "Exit" },
];

/// A parsed line of REPL input
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Ask(String),
    Load(Vec<PathBuf>),
    Files,
    Kb,
    History,
    Export(PathBuf),
    Clear,
    Help,
    Exit,
    Unknown(String),
    Usage(&'static str),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if !line.starts_with('/') {
        return Input::Ask(line.to_string());
    }

    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    match cmd {
        "/load" => match shlex::split(rest) {
            Some(paths) if !paths.is_empty() => {
                Input::Load(paths.into_iter().map(PathBuf::from).collect())
            }
            _ => Input::Usage("/load <file-or-dir> [more...]  (quote paths with spaces)"),
        },
        "/files" => Input::Files,
        "/kb" => Input::Kb,
        "/history" => Input::History,
        "/export" if rest.is_empty() => Input::Usage("/export <file.html>"),
        "/export" => Input::Export(PathBuf::from(rest)),
        "/clear" => Input::Clear,
        "/help" | "/?" => Input::Help,
        "/exit" | "/quit" | "/q" => Input::Exit,
        other => Input::Unknown(other.to_string()),
    }
}

/// Print the welcome banner
fn print_banner(session: &ChatSession) {
    let status = if session.is_ready() {
        session.knowledge().summary().green().to_string()
    } else {
        "No documents loaded".yellow().to_string()
    };

    println!();
    println!("  {} v{}  ·  {}", "folio".green().bold(), VERSION, status);
    println!();
    println!("  {}", "Try:".dimmed());
    println!("    {} {}  {}", ">".green(), "/load ~/papers".white(), "(Load documents)".dimmed());
    println!("    {} {}  {}", ">".green(), "what is the main finding?".white(), "(Ask a question)".dimmed());
    println!();
}

fn print_help() {
    println!("{}", "Commands:".bold());
    for cmd in COMMANDS {
        println!("  {:<10} {}", cmd.name.cyan(), cmd.description.dimmed());
    }
    println!();
    println!("{}", "Anything else is sent as a question about the loaded documents.".dimmed());
}

/// Filter commands based on input
fn filter_commands(input: &str) -> Vec<usize> {
    if !input.starts_with('/') || input.contains(char::is_whitespace) {
        return vec![];
    }
    let filter = input.to_lowercase();
    COMMANDS
        .iter()
        .enumerate()
        .filter(|(_, cmd)| cmd.name.starts_with(&filter))
        .map(|(i, _)| i)
        .collect()
}

/// Render dropdown below current line
fn render_dropdown(stdout: &mut io::Stdout, filtered: &[usize], selected: usize) -> Result<()> {
    for (i, &cmd_idx) in filtered.iter().enumerate() {
        let cmd = &COMMANDS[cmd_idx];
        if i == selected {
            println!(
                "\r  {}",
                format!("{:<12} {}", cmd.name, cmd.description)
                    .on_bright_black()
                    .white()
            );
        } else {
            println!("\r  {}  {}", cmd.name.white(), cmd.description.dimmed());
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Find word boundary going left from position
fn find_word_left(input: &str, pos: usize) -> usize {
    if pos == 0 {
        return 0;
    }
    let chars: Vec<char> = input.chars().collect();
    let mut i = pos - 1;
    // Skip whitespace
    while i > 0 && chars[i].is_whitespace() {
        i -= 1;
    }
    // Skip word characters
    while i > 0 && !chars[i - 1].is_whitespace() {
        i -= 1;
    }
    i
}

/// Find word boundary going right from position
fn find_word_right(input: &str, pos: usize) -> usize {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    if pos >= len {
        return len;
    }
    let mut i = pos;
    // Skip current word
    while i < len && !chars[i].is_whitespace() {
        i += 1;
    }
    // Skip whitespace
    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

/// Line editor state for the raw-mode prompt
#[derive(Default)]
struct LineEditor {
    input: String,
    cursor_pos: usize,
    selected: usize,
    has_dropdown: bool,
}

impl LineEditor {
    fn len(&self) -> usize {
        self.input.chars().count()
    }

    /// Replace chars in `start..end` with `insert`.
    fn splice(&mut self, start: usize, end: usize, insert: &str) {
        let chars: Vec<char> = self.input.chars().collect();
        self.input = chars[..start]
            .iter()
            .copied()
            .chain(insert.chars())
            .chain(chars[end..].iter().copied())
            .collect();
        self.selected = 0;
    }

    /// Redraw the prompt, the input and, if open, the dropdown.
    fn redraw(&mut self, stdout: &mut io::Stdout, reopen_dropdown: bool) -> Result<()> {
        execute!(stdout, RestorePosition, Clear(ClearType::FromCursorDown))?;
        print!("{} {}", ">".green().bold(), self.input);
        stdout.flush()?;

        let chars_from_end = self.len() - self.cursor_pos;
        if chars_from_end > 0 {
            execute!(stdout, MoveLeft(chars_from_end as u16))?;
        }

        let filtered = filter_commands(&self.input);
        if reopen_dropdown {
            self.has_dropdown = !filtered.is_empty();
        }
        if self.has_dropdown && !filtered.is_empty() {
            println!();
            render_dropdown(stdout, &filtered, self.selected)?;
        }
        Ok(())
    }
}

/// Read input with live dropdown filtering
fn read_input_with_dropdown(stdout: &mut io::Stdout) -> Result<String> {
    let mut editor = LineEditor::default();

    execute!(stdout, SavePosition)?;
    editor.redraw(stdout, false)?;
    enable_raw_mode()?;

    let result = edit_loop(stdout, &mut editor);

    disable_raw_mode()?;
    println!();
    result
}

fn edit_loop(stdout: &mut io::Stdout, editor: &mut LineEditor) -> Result<String> {
    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Char('c') if ctrl => return Ok("/exit".to_string()),
            KeyCode::Char('d') if ctrl && editor.input.is_empty() => return Ok("/exit".to_string()),
            KeyCode::Esc => {
                *editor = LineEditor::default();
                editor.redraw(stdout, false)?;
            }
            KeyCode::Enter => {
                let filtered = filter_commands(&editor.input);
                if editor.has_dropdown && !filtered.is_empty() {
                    editor.input = COMMANDS[filtered[editor.selected]].name.to_string();
                    editor.cursor_pos = editor.len();
                    editor.has_dropdown = false;
                    editor.selected = 0;
                    editor.redraw(stdout, false)?;
                } else {
                    editor.has_dropdown = false;
                    editor.redraw(stdout, false)?;
                    return Ok(std::mem::take(&mut editor.input));
                }
            }
            KeyCode::Tab => {
                let filtered = filter_commands(&editor.input);
                if editor.has_dropdown && !filtered.is_empty() {
                    editor.input = format!("{} ", COMMANDS[filtered[editor.selected]].name);
                    editor.cursor_pos = editor.len();
                    editor.selected = 0;
                    editor.redraw(stdout, true)?;
                }
            }
            KeyCode::Up if editor.has_dropdown && editor.selected > 0 => {
                editor.selected -= 1;
                editor.redraw(stdout, false)?;
            }
            KeyCode::Down if editor.has_dropdown => {
                let filtered = filter_commands(&editor.input);
                if editor.selected + 1 < filtered.len() {
                    editor.selected += 1;
                    editor.redraw(stdout, false)?;
                }
            }
            KeyCode::Left if alt => {
                editor.cursor_pos = find_word_left(&editor.input, editor.cursor_pos);
                editor.redraw(stdout, false)?;
            }
            KeyCode::Right if alt => {
                editor.cursor_pos = find_word_right(&editor.input, editor.cursor_pos);
                editor.redraw(stdout, false)?;
            }
            KeyCode::Left if editor.cursor_pos > 0 => {
                editor.cursor_pos -= 1;
                editor.redraw(stdout, false)?;
            }
            KeyCode::Right if editor.cursor_pos < editor.len() => {
                editor.cursor_pos += 1;
                editor.redraw(stdout, false)?;
            }
            KeyCode::Home => {
                editor.cursor_pos = 0;
                editor.redraw(stdout, false)?;
            }
            KeyCode::Char('a') if ctrl => {
                editor.cursor_pos = 0;
                editor.redraw(stdout, false)?;
            }
            KeyCode::End => {
                editor.cursor_pos = editor.len();
                editor.redraw(stdout, false)?;
            }
            KeyCode::Char('e') if ctrl => {
                editor.cursor_pos = editor.len();
                editor.redraw(stdout, false)?;
            }
            // Ctrl+W or Option+Backspace: delete word backward
            KeyCode::Char('w') if ctrl => {
                let start = find_word_left(&editor.input, editor.cursor_pos);
                editor.splice(start, editor.cursor_pos, "");
                editor.cursor_pos = start;
                editor.redraw(stdout, true)?;
            }
            KeyCode::Backspace if alt => {
                let start = find_word_left(&editor.input, editor.cursor_pos);
                editor.splice(start, editor.cursor_pos, "");
                editor.cursor_pos = start;
                editor.redraw(stdout, true)?;
            }
            // Ctrl+U: delete from cursor to start of line
            KeyCode::Char('u') if ctrl => {
                editor.splice(0, editor.cursor_pos, "");
                editor.cursor_pos = 0;
                editor.redraw(stdout, true)?;
            }
            // Ctrl+K: delete from cursor to end of line
            KeyCode::Char('k') if ctrl => {
                let len = editor.len();
                editor.splice(editor.cursor_pos, len, "");
                editor.redraw(stdout, true)?;
            }
            KeyCode::Backspace if editor.cursor_pos > 0 => {
                editor.splice(editor.cursor_pos - 1, editor.cursor_pos, "");
                editor.cursor_pos -= 1;
                editor.redraw(stdout, true)?;
            }
            KeyCode::Delete if editor.cursor_pos < editor.len() => {
                editor.splice(editor.cursor_pos, editor.cursor_pos + 1, "");
                editor.redraw(stdout, true)?;
            }
            KeyCode::Char(c) if !ctrl => {
                editor.splice(editor.cursor_pos, editor.cursor_pos, &c.to_string());
                editor.cursor_pos += 1;
                editor.redraw(stdout, true)?;
            }
            _ => {}
        }
    }
}

/// Read a line without raw mode (piped input). `None` at end of input.
fn read_plain_line() -> Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Load documents into the session, with a progress bar.
pub async fn load_documents(
    session: &mut ChatSession,
    dispatcher: &Dispatcher,
    paths: &[PathBuf],
) -> Result<()> {
    let files = load_files(paths)?;
    if files.is_empty() {
        let supported = DocumentFormat::supported_extensions().join(", ");
        println!("{}", format!("No supported documents found ({}).", supported).yellow());
        return Ok(());
    }

    let progress = ProgressTracker::new(files.len());
    match session.process_with_progress(&files, dispatcher, &progress).await {
        Ok(()) => {
            println!(
                "{} {}",
                "✓".green(),
                format!("Loaded {}", session.knowledge().summary()).white()
            );
            if let Some(welcome) = session.messages().first() {
                println!("{} {}", "folio:".cyan().bold(), welcome.content);
            }
        }
        Err(SessionError::Extraction(e)) => {
            // Full detail is in the log.
            tracing::debug!(error = ?e, "extraction failed");
            println!("{} {}", "✗".red(), "Failed to process the documents.".red());
            if session.is_ready() {
                println!("{}", "Keeping the previously loaded documents.".dimmed());
            }
        }
        Err(e) => println!("{} {}", "✗".red(), e.to_string().red()),
    }
    Ok(())
}

/// Send one question and print the reply.
async fn ask(session: &mut ChatSession, answerer: &dyn Answerer, question: &str) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = session.submit(question, answerer).await;
    spinner.finish_and_clear();

    match outcome {
        SubmitOutcome::Answered(reply) => {
            println!("{} {}", "folio:".cyan().bold(), reply.content);
        }
        SubmitOutcome::Apologized(reply) => {
            println!("{} {}", "folio:".cyan().bold(), reply.content.yellow());
        }
        SubmitOutcome::Rejected(reason) => {
            println!("{}", reason.message().yellow());
        }
    }
}

/// Run the interactive REPL
pub async fn run_repl(
    dispatcher: Dispatcher,
    answerer: std::sync::Arc<dyn Answerer>,
    initial_paths: &[PathBuf],
) -> Result<()> {
    let mut session = ChatSession::new();

    if !initial_paths.is_empty() {
        load_documents(&mut session, &dispatcher, initial_paths).await?;
    }

    print_banner(&session);

    let mut stdout = io::stdout();
    let interactive = stdout.is_tty() && io::stdin().is_tty();

    loop {
        let line = if interactive {
            read_input_with_dropdown(&mut stdout)?
        } else {
            match read_plain_line()? {
                Some(line) => line,
                None => break,
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_input(&line) {
            Input::Ask(question) => ask(&mut session, answerer.as_ref(), &question).await,
            Input::Load(paths) => {
                if let Err(e) = load_documents(&mut session, &dispatcher, &paths).await {
                    println!("{} {}", "✗".red(), e.to_string().red());
                }
            }
            Input::Files => {
                if session.knowledge().sources().is_empty() {
                    println!("{}", "No documents loaded.".yellow());
                }
                for (i, name) in session.knowledge().sources().iter().enumerate() {
                    println!("  {}. {}", (i + 1).to_string().cyan(), name);
                }
            }
            Input::Kb => {
                if session.is_ready() {
                    println!("{}", session.knowledge().text());
                    println!("{}", format!("({})", session.knowledge().summary()).dimmed());
                } else {
                    println!("{}", "No documents loaded.".yellow());
                }
            }
            Input::History => {
                for message in session.messages() {
                    let who = match message.role {
                        Role::User => "you:".green().bold(),
                        Role::Assistant => "folio:".cyan().bold(),
                    };
                    println!("{} {}", who, message.content);
                }
            }
            Input::Export(path) => {
                let page = export_transcript_html(session.knowledge(), session.messages());
                match std::fs::write(&path, page) {
                    Ok(()) => println!("{} Saved {}", "✓".green(), path.display()),
                    Err(e) => println!("{} {}", "✗".red(), format!("Failed to write {}: {}", path.display(), e).red()),
                }
            }
            Input::Clear => {
                session.clear_history();
                println!("{}", "Conversation cleared.".dimmed());
            }
            Input::Help => print_help(),
            Input::Exit => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Input::Unknown(cmd) => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
                println!("{}", "Type /help for commands.".dimmed());
            }
            Input::Usage(usage) => println!("{} {}", "Usage:".yellow(), usage),
        }

        println!(); // Empty line after output
    }

    Ok(())
}
