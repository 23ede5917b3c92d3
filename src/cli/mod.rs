//! # CLI Module
//!
//! Command-line interface for the download sorter.
//!
//! ## Usage
//! ```bash
//! # Watch the configured folder and sort files as they arrive
//! autosort watch
//!
//! # Show where files currently in the folder would go
//! autosort scan --dry-run
//!
//! # Check which rule a name matches
//! autosort test IMG_1024.jpg
//!
//! # Recent moves as JSON, then undo one
//! autosort history --count 5 --json
//! autosort undo 3f2b...
//! ```

use autosort::core::config::default_data_dir;
use autosort::core::engine::AutoSorter;
use autosort::core::history::MoveRecord;
use autosort::core::mover::MoveOutcome;
use autosort::core::rules::{FileMetadata, RuleSet, RuleWarning};
use autosort::core::scanner::FolderScanner;
use autosort::error::Result;
use autosort::events::{Event, EventChannel, MoveEvent, PendingEvent, WatcherEvent};
use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// AutoSort - Keep your downloads folder tidy
#[derive(Parser, Debug)]
#[command(name = "autosort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding config.json and history.db
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the folder and sort new files after the grace period
    Watch,
    /// Sort every file already in the watch folder
    Scan {
        /// Only show where files would go
        #[arg(long)]
        dry_run: bool,
    },
    /// Show which destination a file name would be sorted into
    Test {
        file_name: String,
    },
    /// List rules in evaluation order
    Rules,
    /// Show recent moves
    History {
        /// Number of records to show
        #[arg(short, long)]
        count: Option<usize>,

        /// JSON output for scripting
        #[arg(long)]
        json: bool,
    },
    /// Show move statistics
    Stats,
    /// Move a file back to where it came from
    Undo {
        id: String,
    },
    /// Forget all recorded moves
    ClearHistory,
    /// Print the current configuration
    Config,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.config_dir.unwrap_or_else(default_data_dir);
    let term = Term::stderr();

    match cli.command {
        Commands::Watch => run_watch(&term, &data_dir),
        Commands::Scan { dry_run } => run_scan(&term, &AutoSorter::open(&data_dir)?, dry_run),
        Commands::Test { file_name } => {
            let sorter = AutoSorter::open(&data_dir)?;
            match AutoSorter::test_rule(&file_name, &sorter.rules()) {
                Some(folder) => println!("{} -> {}", file_name, folder),
                None => println!("{} -> {}", file_name, style("no matching rule").dim()),
            }
            Ok(())
        }
        Commands::Rules => {
            print_rules(&term, &AutoSorter::open(&data_dir)?);
            Ok(())
        }
        Commands::History { count, json } => {
            let sorter = AutoSorter::open(&data_dir)?;
            let records = match count {
                Some(n) => sorter.recent_history(n),
                None => sorter.history(),
            };
            if json {
                print_json(&records);
            } else {
                print_history(&term, &records);
            }
            Ok(())
        }
        Commands::Stats => {
            let stats = AutoSorter::open(&data_dir)?.stats();
            term.write_line(&format!("  {} today", style(stats.today).cyan())).ok();
            term.write_line(&format!("  {} this week", style(stats.this_week).cyan())).ok();
            term.write_line(&format!("  {} in history", style(stats.total).cyan())).ok();
            term.write_line(&format!(
                "  {} moved all time",
                style(stats.lifetime_moved).cyan().bold()
            ))
            .ok();
            Ok(())
        }
        Commands::Undo { id } => {
            let record = AutoSorter::open(&data_dir)?.undo(&id)?;
            term.write_line(&format!(
                "{} Restored {}",
                style("✓").green().bold(),
                record.original_path.display()
            ))
            .ok();
            Ok(())
        }
        Commands::ClearHistory => {
            AutoSorter::open(&data_dir)?.clear_history()?;
            term.write_line(&format!("{} History cleared", style("✓").green().bold()))
                .ok();
            Ok(())
        }
        Commands::Config => {
            let config = AutoSorter::open(&data_dir)?.config();
            term.write_line(&format!(
                "{} {}",
                style("Config:").bold(),
                data_dir.join("config.json").display()
            ))
            .ok();
            print_json(&config);
            Ok(())
        }
    }
}

fn run_watch(term: &Term, data_dir: &Path) -> Result<()> {
    let (sender, receiver) = EventChannel::new();
    let sorter = AutoSorter::open_with_events(data_dir, sender)?;
    let config = sorter.config();

    term.write_line(&format!(
        "{} {} {} {}",
        style("AutoSort").bold().cyan(),
        style("watching").dim(),
        config.watch_folder.display(),
        style(format!("({}s grace period)", config.grace_period_seconds)).dim()
    ))
    .ok();

    sorter.start()?;
    sorter.scan()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    loop {
        if let Some(event) = receiver.recv_timeout(Duration::from_millis(200)) {
            match event {
                Event::Move(MoveEvent::Completed { record }) => {
                    spinner.println(format!(
                        "{} {} -> {}",
                        style("✓").green(),
                        file_name(&record.original_path),
                        record.new_path.display()
                    ));
                }
                Event::Move(MoveEvent::Skipped { file_name, .. }) => {
                    spinner.println(format!(
                        "{} {} (destination exists)",
                        style("○").dim(),
                        file_name
                    ));
                }
                Event::Move(MoveEvent::Failed {
                    file_name, message, ..
                }) => {
                    spinner.println(format!("{} {}: {}", style("✗").red(), file_name, message));
                }
                Event::Pending(PendingEvent::Scheduled(file)) => {
                    spinner.println(format!(
                        "{} {} -> {} at {}",
                        style("…").yellow(),
                        file.file_name,
                        file.matched_destination_folder,
                        file.move_at.with_timezone(&chrono::Local).format("%H:%M:%S")
                    ));
                }
                Event::Watcher(WatcherEvent::Failed { message }) => {
                    spinner.finish_and_clear();
                    term.write_line(&format!("{} {}", style("Watcher stopped:").red(), message))
                        .ok();
                    return Ok(());
                }
                _ => {}
            }
        }

        spinner.set_message(format!("{} pending", sorter.pending().len()));
        spinner.tick();
    }
}

fn run_scan(term: &Term, sorter: &AutoSorter, dry_run: bool) -> Result<()> {
    let config = sorter.config();

    if dry_run {
        let found = FolderScanner::new().scan(&config.watch_folder)?;
        let rules = RuleSet::new(&config.rules);
        for path in &found.files {
            let Some(metadata) = FileMetadata::from_path(path) else {
                continue;
            };
            match rules.match_file(&metadata) {
                Some(rule) => term
                    .write_line(&format!(
                        "  {} -> {} {}",
                        metadata.name,
                        rule.destination_folder,
                        style(format!("({})", rule.name)).dim()
                    ))
                    .ok(),
                None => term
                    .write_line(&format!("  {} {}", metadata.name, style("(unsorted)").dim()))
                    .ok(),
            };
        }
        return Ok(());
    }

    let created = sorter.scan()?;
    let progress = ProgressBar::new(created.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    let mut moved = 0usize;
    for file in &created {
        progress.set_message(file.file_name.clone());
        match sorter.move_now(&file.id) {
            Ok(MoveOutcome::Moved(_)) => moved += 1,
            Ok(MoveOutcome::Skipped { .. }) => {}
            Err(e) => progress.println(format!("{} {}: {}", style("✗").red(), file.file_name, e)),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    term.write_line(&format!(
        "{} Sorted {} of {} files",
        style("✓").green().bold(),
        style(moved).cyan(),
        created.len()
    ))
    .ok();
    Ok(())
}

fn print_rules(term: &Term, sorter: &AutoSorter) {
    let rules = sorter.rules();
    let ordered = RuleSet::new(&rules);

    for rule in ordered.ordered() {
        let conditions = if rule.is_default {
            "default".to_string()
        } else if rule.conditions.is_empty() {
            "everything".to_string()
        } else {
            rule.conditions
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" and ")
        };
        term.write_line(&format!(
            "  {:>4}  {} -> {}  {}",
            style(rule.priority).dim(),
            style(&rule.name).bold(),
            rule.destination_folder,
            style(conditions).dim()
        ))
        .ok();
    }

    let disabled: Vec<_> = rules.iter().filter(|r| !r.enabled).collect();
    if !disabled.is_empty() {
        term.write_line(&format!(
            "  {} {}",
            style("disabled:").dim(),
            disabled.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", ")
        ))
        .ok();
    }

    for warning in sorter.rule_warnings() {
        match warning {
            RuleWarning::MultipleDefaults { rule_ids, winner } => {
                term.write_line(&format!(
                    "  {} {} default rules ({}); only {} can match",
                    style("!").yellow().bold(),
                    rule_ids.len(),
                    rule_ids.join(", "),
                    winner
                ))
                .ok();
            }
        }
    }
}

fn print_history(term: &Term, records: &[MoveRecord]) {
    if records.is_empty() {
        term.write_line(&format!("  {}", style("No moves yet").dim())).ok();
        return;
    }

    for record in records {
        let marker = if record.can_undo {
            style("↺").green().to_string()
        } else {
            style("·").dim().to_string()
        };
        term.write_line(&format!(
            "  {} {}  {} -> {}  {}",
            marker,
            style(record.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")).dim(),
            file_name(&record.original_path),
            record.new_path.display(),
            style(&record.id).dim()
        ))
        .ok();
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
