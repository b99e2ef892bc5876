// Entry point and high-level CLI flow.
//
// - With `--user`, the report for that user is rendered once.
// - Without it, an interactive menu lets the user pick a segment and a user,
//   renders the report, then offers to go back to the selection menu.
mod loader;
mod metrics;
mod output;
mod parser;
mod reports;
mod types;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use loader::{ReportStore, SegmentFilter};
use once_cell::unsync::OnceCell;
use parser::ParseMode;
use reports::{ReportOptions, UserReport};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rec-report", version)]
#[command(about = "Per-user purchase pattern and recommendation outcome report")]
struct Args {
    /// Report CSV (UTF-8, optional BOM)
    #[arg(short, long, default_value = "stratified_top10_users_report.csv")]
    file: PathBuf,

    /// Segment filter, or "all"
    #[arg(short, long, default_value = "all")]
    segment: String,

    /// Render this user once and exit instead of starting the menu
    #[arg(short, long)]
    user: Option<String>,

    /// How malformed frequency lists are decoded
    #[arg(long, value_enum, default_value_t = ParseMode::Strict)]
    mode: ParseMode,

    /// Department reported as the produce share KPI
    #[arg(long, default_value = "produce")]
    produce_label: String,

    /// Entries shown for department and aisle tables
    #[arg(long, default_value = "10")]
    top: usize,

    /// Also write the rendered report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Also write the recommendation table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

/// The store is opened once per process and handed out read-only.
struct App {
    args: Args,
    opts: ReportOptions,
    store: OnceCell<ReportStore>,
}

impl App {
    fn new(args: Args) -> Self {
        let opts = ReportOptions { produce_label: args.produce_label.clone(), top: args.top };
        App { args, opts, store: OnceCell::new() }
    }

    fn store(&self) -> Result<&ReportStore> {
        self.store.get_or_try_init(|| {
            let store = ReportStore::open(&self.args.file, self.args.mode)?;
            let lr = store.load_report();
            info!(
                rows = lr.total_rows,
                users = lr.users,
                segments = lr.segments,
                malformed_cells = lr.malformed_cells,
                "report ready"
            );
            Ok(store)
        })
    }

        /// Render one selection. Returns `false` when the selection has no data.
    fn show(&self, filter: &SegmentFilter, user_id: &str) -> Result<bool> {
        let store = self.store()?;
        let Some(report) = UserReport::build(store, filter, user_id, &self.opts) else {
            println!("{}\n", output::NO_DATA);
            return Ok(false);
        };
        output::print_report(&report);

        if let Some(path) = &self.args.json {
            output::write_json(path, &report)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("(Report exported to {})", path.display());
        }
        if let Some(path) = &self.args.csv {
            output::write_csv(path, &report.recommendations)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("(Recommendations exported to {})", path.display());
        }
        Ok(true)
    }
}

/// Read a single line of input after printing `prompt`. `None` once the
/// input is closed.
fn read_line(input: &mut impl BufRead, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask the user whether to go back to the selection menu.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N` or the
/// input ended.
fn prompt_back_to_menu(input: &mut impl BufRead) -> bool {
    loop {
        let Some(answer) = read_line(input, "Back to Selection (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Show numbered options and return the chosen one. Entering the value
/// itself also works. `None` when the input ends before a valid choice.
fn choose(input: &mut impl BufRead, title: &str, options: &[String]) -> Option<String> {
    loop {
        println!("{}", title);
        for (i, o) in options.iter().enumerate() {
            println!("[{}] {}", i + 1, o);
        }
        let answer = read_line(input, "Enter choice: ")?;
        if let Some(hit) = options.iter().find(|o| **o == answer) {
            return Some(hit.clone());
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Some(options[n - 1].clone()),
            _ => println!("Invalid choice. Please enter 1-{}.\n", options.len()),
        }
    }
}

fn run_interactive(app: &App, input: &mut impl BufRead) -> Result<()> {
    let store = app.store()?;
    loop {
        let mut segments = vec!["all".to_string()];
        segments.extend(store.segments());
        let Some(segment) = choose(input, "Select customer segment:", &segments) else {
            break;
        };
        let filter = SegmentFilter::parse(&segment);

        let users = store.users(&filter);
        if users.is_empty() {
            println!("No users in segment {}.\n", segment);
            continue;
        }
        let Some(user) = choose(input, "Select user id:", &users) else {
            break;
        };
        debug!(%segment, %user, "selection");
        println!();
        app.show(&filter, &user)?;
        if !prompt_back_to_menu(input) {
            break;
        }
    }
    println!("Exiting the program.");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let app = App::new(Args::parse());
    let filter = SegmentFilter::parse(&app.args.segment);

    match app.args.user.clone() {
        Some(user) => {
            app.show(&filter, &user)?;
            Ok(())
        }
        None => run_interactive(&app, &mut io::stdin().lock()),
    }
}
