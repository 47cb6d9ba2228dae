//! Headless mode for the shared story.
//!
//! A line-oriented interface for scripts and automated play: every
//! non-command line is submitted as a contribution, and new turns are
//! printed as they appear.

use hive_core::{Action, Notice, NoticeLevel, StorySession, SubmitOutcome, Turn, Update};
use std::io::{self, BufRead, Write};

/// One parsed line of headless input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    Refresh,
    Status,
    Help,
    Quit,
    Unknown(String),
    Blank,
}

/// Trimming only decides blank lines and commands; submissions keep the raw line.
pub fn parse_line(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Blank;
    }
    let Some(rest) = trimmed.strip_prefix('#') else {
        return Command::Submit(line.to_string());
    };
    match rest.split_whitespace().next() {
        Some("refresh") => Command::Refresh,
        Some("status") => Command::Status,
        Some("help") => Command::Help,
        Some("quit") | Some("exit") => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

pub fn format_turn(turn: &Turn) -> String {
    let tag = if turn.is_user() { "[USER]" } else { "[AI]" };
    format!("{tag} {}", turn.content)
}

pub fn format_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "[INFO]",
        NoticeLevel::Warning => "[WARN]",
        NoticeLevel::Error => "[ERROR]",
    };
    format!("{tag} {}", notice.message)
}

/// Extra output line for an outcome the turns alone do not show.
pub fn format_outcome(outcome: &SubmitOutcome) -> Option<String> {
    match outcome {
        SubmitOutcome::Blocked { draft } => Some(format!("[BLOCKED] {draft}")),
        _ => None,
    }
}

/// Turns not yet printed, judged by id.
fn unseen(turns: &[Turn], last_seen: Option<i64>) -> impl Iterator<Item = &Turn> {
    turns
        .iter()
        .filter(move |turn| last_seen.map_or(true, |id| turn.id > id))
}

struct Printer {
    last_seen: Option<i64>,
}

impl Printer {
    fn print(&mut self, update: &Update) {
        for turn in unseen(&update.turns, self.last_seen) {
            println!("{}", format_turn(turn));
        }
        if let Some(max) = update.turns.iter().map(|t| t.id).max() {
            self.last_seen = Some(self.last_seen.map_or(max, |seen| seen.max(max)));
        }
        for notice in &update.notices {
            println!("{}", format_notice(notice));
        }
        if let Some(line) = update.outcome.as_ref().and_then(format_outcome) {
            println!("{line}");
        }
    }
}

fn print_help() {
    println!("[HELP]");
    println!("  #refresh  - Fetch the latest story");
    println!("  #status   - Show whose turn it is");
    println!("  #help     - Show this help");
    println!("  #quit     - Exit");
    println!("  (anything else is added to the story)");
}

/// Run the story over stdin and stdout until EOF or `#quit`.
pub async fn run_headless(session: StorySession) -> anyhow::Result<()> {
    println!("=== Snail Hive Mind (headless) ===");
    println!(
        "Store: {} | Moderation: {}",
        session.store_name(),
        session.moderator_name()
    );
    println!();

    let mut printer = Printer { last_seen: None };
    let update = session.handle(Action::Refresh).await;
    printer.print(&update);
    let mut state = update.state();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let action = match parse_line(&line) {
            Command::Blank => continue,
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Help => {
                print_help();
                continue;
            }
            Command::Status => {
                println!("[INFO] {state}");
                continue;
            }
            Command::Unknown(raw) => {
                println!("[ERROR] Unknown command {raw:?}. Type #help for help.");
                continue;
            }
            Command::Refresh => Action::Refresh,
            Command::Submit(draft) => Action::Submit(draft),
        };

        let update = session.handle(action).await;
        printer.print(&update);
        state = update.state();
        stdout.flush()?;
    }

    Ok(())
}
