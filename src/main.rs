mod app;
mod board;
mod domain;
mod input;
mod logging;
mod persistence;
mod reconciler;
mod scheduler;
mod ticker;
mod ui;

use anyhow::{Context, Result};
use app::AppState;
use board::Board;
use chrono::Utc;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use domain::{parse_input_date, status_badge, DraftKind, Granularity, RecordDraft, RecordId};
use persistence::{
    ensure_data_dir, init_local_data_dir, load_or_init_settings, log_file, records_file,
    settings_file, LocalStore, RecordDocument, Settings, Store,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use reconciler::Reconciler;
use scheduler::RefreshScheduler;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "hourglass")]
#[command(about = "Live progress rings for the time periods you care about", long_about = None)]
struct Cli {
    /// Data directory to use instead of the nearest .hourglass
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Owner id to use for this session instead of the one in settings.json
    #[arg(long, global = true)]
    owner: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .hourglass directory in the current directory
    Init,
    /// Print every record with its current progress
    List,
    /// Add a single timer
    Add {
        #[arg(short, long)]
        title: String,
        /// Start date, DD/MM/YYYY HH:MM (local time)
        #[arg(short, long)]
        start: String,
        /// End date, DD/MM/YYYY HH:MM (local time)
        #[arg(short, long)]
        end: String,
        /// seconds, minutes, hours or days
        #[arg(short, long)]
        granularity: Option<String>,
        /// Milliseconds between redraws
        #[arg(short, long)]
        refresh_rate: Option<u64>,
    },
    /// Remove a record by id
    Remove { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Init) = cli.command {
        let data_dir = init_local_data_dir()?;
        println!("Initialized hourglass directory: {}", data_dir.display());
        println!();
        println!("Hourglass will now use this local directory for its records.");
        println!("Run 'hourglass' to start tracking.");
        return Ok(());
    }

    let data_dir = ensure_data_dir(cli.dir.as_deref())?;
    let mut settings = load_or_init_settings(settings_file(&data_dir))?;
    logging::init_logging(&log_file(&data_dir), &settings.log_level)?;
    if let Some(owner) = cli.owner {
        settings.owner_id = owner;
    }
    tracing::info!(dir = %data_dir.display(), owner = %settings.owner_id, "starting");

    let store = LocalStore::open(records_file(&data_dir)).context("Failed to open record store")?;

    match cli.command {
        Some(Commands::List) => list_records(&store, &settings),
        Some(Commands::Add {
            title,
            start,
            end,
            granularity,
            refresh_rate,
        }) => {
            let granularity = match granularity {
                Some(tag) => Granularity::from_tag(&tag)
                    .with_context(|| format!("Unknown granularity: {}", tag))?,
                None => settings.default_granularity,
            };
            let draft = RecordDraft {
                title,
                granularity,
                refresh_rate: refresh_rate.unwrap_or(settings.default_refresh_rate),
                kind: DraftKind::Single {
                    start: parse_input_date(&start)?,
                    end: parse_input_date(&end)?,
                },
            };
            add_record(store, &settings, draft)
        }
        Some(Commands::Remove { id }) => remove_record(store, &settings, RecordId::new(id)),
        Some(Commands::Init) | None => run_tui(store, settings),
    }
}

/// Owner's records in display order, loaded the same way the board loads them
fn load_records(store: &LocalStore, settings: &Settings) -> Result<Reconciler<Board>> {
    let mut reconciler = Reconciler::new(&settings.owner_id, Board::default(), RefreshScheduler::new());
    let skipped = reconciler.load(store.query(&settings.owner_id)?, Utc::now(), Instant::now());
    if skipped > 0 {
        eprintln!("Skipped {} unreadable record(s), see the log for details.", skipped);
    }
    Ok(reconciler)
}

fn list_records(store: &LocalStore, settings: &Settings) -> Result<()> {
    let loaded = load_records(store, settings)?;
    if loaded.records().is_empty() {
        println!("Nothing tracked yet. Add one with 'hourglass add'.");
        return Ok(());
    }

    let now = Utc::now();
    for record in loaded.records() {
        let progress = record.progress(now);
        println!(
            "{}  {:<14} {:>4}%  {:<20} {}",
            record.id,
            status_badge(progress.status),
            progress.percentage.round() as i64,
            record.time_remaining(now).display(),
            record.title
        );
    }
    Ok(())
}

fn add_record(mut store: LocalStore, settings: &Settings, draft: RecordDraft) -> Result<()> {
    let draft = draft.validate()?;
    let position = load_records(&store, settings)?.next_position();

    let document = RecordDocument::new_from_draft(&draft, &settings.owner_id, position);
    let id = store.create(document)?;
    println!("Added \"{}\" ({})", draft.title, id);
    Ok(())
}

fn remove_record(mut store: LocalStore, settings: &Settings, id: RecordId) -> Result<()> {
    let owned = store
        .query(&settings.owner_id)?
        .iter()
        .any(|doc| doc.id.as_ref() == Some(&id));
    if !owned {
        anyhow::bail!("No record with id {}", id);
    }
    store.delete(&id)?;
    println!("Removed {}", id);
    Ok(())
}

fn run_tui(store: LocalStore, settings: Settings) -> Result<()> {
    let mut app = AppState::new(Box::new(store), settings)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        tracing::error!(error = %err, "exiting after error");
    }
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut AppState) -> Result<()> {
    loop {
        // Store changes, due redraws, card exits
        app.pump(Utc::now(), Instant::now());

        terminal.draw(|f| ui::render(f, app))?;

        // Sleep until input or the next refresh, whichever comes first
        let timeout = ticker::poll_timeout(app.settings.tick_ms, app.next_deadline(), Instant::now());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only process key press events (ignore key release)
                if key.kind == KeyEventKind::Press && input::handle_key(app, key)? {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::{Record, RecordKind, TimeInterval};
    use pretty_assertions::assert_eq;

    fn document(title: &str, position: i64) -> RecordDocument {
        RecordDocument::from_record(&Record {
            id: RecordId::new(title),
            owner_id: "cli".to_string(),
            title: title.to_string(),
            granularity: Granularity::Hours,
            refresh_rate: 1000,
            position,
            kind: RecordKind::Single(TimeInterval::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            )),
        })
    }

    #[test]
    fn test_load_records_matches_board_order() {
        let settings = Settings {
            owner_id: "cli".to_string(),
            ..Settings::default()
        };
        let mut store = LocalStore::in_memory();
        store.create(document("Later", 5)).unwrap();
        let mut broken = document("Broken", 0);
        broken.end_date = Some("tomorrow".to_string());
        store.create(broken).unwrap();
        store.create(document("First", 1)).unwrap();

        let loaded = load_records(&store, &settings).unwrap();
        let titles: Vec<&str> = loaded.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Later"]);
        assert_eq!(loaded.next_position(), 6);
    }
}
