//! Sheetmerge CLI - Consolidate workbook sheets into one table
//!
//! # Main Commands
//!
//! ```bash
//! sheetmerge merge input.xlsx output.xlsx 1-5                    # Consolidate sheets 1 to 5
//! sheetmerge merge data.xlsx out.json 1,3,5 --config cols.json   # With explicit column config
//! sheetmerge template input.xlsx 1-3                             # Write a config template
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! sheetmerge sheets input.xlsx                 # List sheets
//! sheetmerge analyze input.xlsx 1-3            # Show inferred column types
//! ```

use clap::{Parser, Subcommand};
use sheetmerge::{
    open_workbook, resolve_columns, write_table, AppError, CancellationToken, ColumnConfigSet,
    ConfigTemplate, ConsolidateOptions, Consolidator, LogEntry, SheetSelection, SheetStatus,
    WorkbookSource, LOG_BROADCASTER,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "sheetmerge")]
#[command(about = "Consolidate multiple workbook sheets into a single typed table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate a range of sheets into one output file
    Merge {
        /// Input workbook (xlsx, xlsm, xlsb, xls, ods, csv)
        input: PathBuf,

        /// Output file (.xlsx, .csv or .json)
        output: PathBuf,

        /// Sheets to consolidate, 1-based (e.g. 1-5 or 1,3,5)
        range: String,

        /// Column configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip classification: unconfigured columns pass through untouched
        #[arg(long)]
        raw: bool,

        /// Share of samples that must agree on a type (0.0 to 1.0)
        #[arg(long, default_value = "0.9", value_parser = parse_threshold)]
        threshold: f64,

        /// Rows per sheet sampled by the classifier
        #[arg(long, default_value = "100")]
        sample_rows: usize,

        /// Don't open the output file when done
        #[arg(long)]
        no_open: bool,

        /// Stream progress as JSON lines on stderr
        #[arg(long)]
        log_json: bool,

        /// Don't echo progress logs on stdout
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write a column configuration template from the first selected sheet
    Template {
        /// Input workbook
        input: PathBuf,

        /// Sheets to sample, 1-based (the first one is used)
        range: String,

        /// Template path (default: column_config_template_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fill in the classifier's suggestions instead of auto/false
        #[arg(long)]
        suggest: bool,
    },

    /// Show the inferred type of every column of the selected sheets
    Analyze {
        /// Input workbook
        input: PathBuf,

        /// Sheets to analyze, 1-based
        range: String,

        /// Column configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Input workbook
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            input,
            output,
            range,
            config,
            raw,
            threshold,
            sample_rows,
            no_open,
            log_json,
            quiet,
        } => {
            let mut options = ConsolidateOptions {
                sample_rows,
                classify: !raw,
                ..Default::default()
            };
            options.rules.content_threshold = threshold;

            cmd_merge(MergeArgs {
                input,
                output,
                range,
                config,
                options,
                open: !no_open,
                log_json,
                quiet,
            })
            .await
        }

        Commands::Template {
            input,
            range,
            output,
            suggest,
        } => cmd_template(&input, &range, output.as_deref(), suggest),

        Commands::Analyze { input, range, config } => cmd_analyze(&input, &range, config.as_deref()),

        Commands::Sheets { input } => cmd_sheets(&input),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

struct MergeArgs {
    input: PathBuf,
    output: PathBuf,
    range: String,
    config: Option<PathBuf>,
    options: ConsolidateOptions,
    open: bool,
    log_json: bool,
    quiet: bool,
}

/// Returns the process exit code.
async fn cmd_merge(args: MergeArgs) -> Result<i32, Box<dyn std::error::Error>> {
    eprintln!("🚀 Starting sheet consolidation");
    eprintln!("📁 Input: {}", args.input.display());
    eprintln!("💾 Output: {}", args.output.display());
    eprintln!("📄 Sheet range: {}", args.range);

    // Fatal checks before any sheet is read
    let mut workbook = open_input(&args.input)?;
    let selection = SheetSelection::parse(&args.range, workbook.sheet_count()).map_err(AppError::from)?;
    let configs = match &args.config {
        Some(path) => {
            let configs = ColumnConfigSet::load(path).map_err(AppError::from)?;
            eprintln!("⚙️  Loaded column configuration from: {}", path.display());
            display_column_config(&configs);
            configs
        }
        None => {
            eprintln!("⚙️  Column config: none ({})", if args.options.classify { "inferred" } else { "raw data" });
            ColumnConfigSet::new()
        }
    };

    let names = workbook.sheet_names();
    let total_selected = selection.len();
    eprintln!("🗒️  Total sheets found: {}", names.len());
    eprintln!(
        "🎯 Processing {} sheets: {}",
        selection.len(),
        selection.indices().iter().map(|&i| names[i].as_str()).collect::<Vec<_>>().join(", ")
    );

    LOG_BROADCASTER.set_quiet(args.quiet);
    let log_writer = args.log_json.then(spawn_json_log_writer);

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⚠️  Interrupt received, finishing the current sheet...");
            ctrl_c.cancel();
        }
    });

    let options = args.options;
    let consolidation = tokio::task::spawn_blocking(move || {
        let total = selection.len();
        let mut done = 0usize;
        let consolidation = Consolidator::new(&configs)
            .options(options)
            .cancellation_token(token)
            .on_progress(|result| {
                done += 1;
                let mark = match result.status {
                    SheetStatus::Ok => "✅",
                    SheetStatus::Failed => "⚠️ ",
                };
                eprintln!("{} [{}/{}] {}", mark, done, total, result.sheet_name);
            })
            .run_workbook(workbook.as_mut(), &selection);
        consolidation
    })
    .await?;

    if let Some((stop, task)) = log_writer {
        let _ = stop.send(());
        let _ = task.await;
    }

    let summary = consolidation.summary();
    eprintln!("\n{}", summary);

    if summary.succeeded == 0 {
        if consolidation.cancelled {
            eprintln!("\n⚠️  Interrupted before any sheet was consolidated: nothing was written");
            return Ok(130);
        }
        eprintln!("\n❌ {}", AppError::NothingConsolidated(summary.failed.len()));
        return Ok(1);
    }

    eprintln!(
        "\n🗃️  Combining data from {} sheets ({} rows)...",
        summary.succeeded, summary.total_rows
    );
    eprintln!("📥 Saving to {}...", args.output.display());
    write_table(&consolidation.table, &args.output).map_err(AppError::from)?;

    if consolidation.cancelled {
        eprintln!(
            "\n⚠️  Interrupted: partial output with {} of {} sheets saved to {}",
            summary.succeeded,
            total_selected,
            args.output.display()
        );
        return Ok(130);
    }

    eprintln!("\n🎉 SUCCESS!");
    eprintln!("✅ Consolidated {} sheets into: {}", summary.succeeded, args.output.display());

    if args.open {
        open_file(&args.output);
    } else {
        eprintln!("📁 Output saved to: {}", args.output.display());
    }

    Ok(0)
}

fn cmd_template(
    input: &Path,
    range: &str,
    output: Option<&Path>,
    suggest: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    eprintln!("📝 Creating config template from: {}", input.display());

    let mut workbook = open_input(input)?;
    let selection = SheetSelection::parse(range, workbook.sheet_count()).map_err(AppError::from)?;
    let first = selection.indices()[0];
    let sheet = workbook.read_sheet(first).map_err(AppError::from)?;
    eprintln!("   Sampling sheet {}: {} ({} columns)", first + 1, sheet.name, sheet.header.len());

    let path = ConfigTemplate::new()
        .suggest(suggest)
        .write(&sheet, output)
        .map_err(AppError::from)?;

    eprintln!("✅ Template saved to: {}", path.display());
    eprintln!("   Edit the dtype and word_count entries, then pass it with --config");
    Ok(0)
}

fn cmd_analyze(input: &Path, range: &str, config: Option<&Path>) -> Result<i32, Box<dyn std::error::Error>> {
    eprintln!("🔍 Analyzing: {}", input.display());

    let mut workbook = open_input(input)?;
    let selection = SheetSelection::parse(range, workbook.sheet_count()).map_err(AppError::from)?;
    let configs = match config {
        Some(path) => ColumnConfigSet::load(path).map_err(AppError::from)?,
        None => ColumnConfigSet::new(),
    };
    let options = ConsolidateOptions::default();

    for &index in selection.indices() {
        let sheet = match workbook.read_sheet(index) {
            Ok(sheet) => sheet,
            Err(e) => {
                eprintln!("\n⚠️  Sheet {}: {}", index + 1, e);
                continue;
            }
        };

        println!("\n📄 Sheet {}: {} ({} rows)", index + 1, sheet.name, sheet.rows.len());
        for column in resolve_columns(&sheet, &configs, &options) {
            let word_count = if column.word_count.is_some() { "  [word count]" } else { "" };
            println!("   {:<30} {}{}", column.name, column.data_type, word_count);
        }
    }

    Ok(0)
}

fn cmd_sheets(input: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let workbook = open_input(input)?;

    eprintln!("📋 {} ({} sheets):\n", workbook.name(), workbook.sheet_count());
    for (i, name) in workbook.sheet_names().iter().enumerate() {
        println!("  {:>3}. {}", i + 1, name);
    }
    Ok(0)
}

/// List each configured column and what is applied to it.
fn display_column_config(configs: &ColumnConfigSet) {
    if configs.is_empty() {
        return;
    }
    eprintln!("📋 Column configuration:");
    for (name, config) in configs.iter() {
        eprintln!("    📊 {}: {}", name, config.summary());
    }
}

/// Stream log entries as JSON lines on stderr until told to stop.
///
/// On stop, entries still queued in the channel are written before the
/// task ends.
fn spawn_json_log_writer() -> (oneshot::Sender<()>, JoinHandle<()>) {
    fn emit(entry: &LogEntry) {
        if let Ok(line) = serde_json::to_string(entry) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
        }
    }

    let mut rx = LOG_BROADCASTER.subscribe();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(entry) => emit(&entry),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = &mut stop_rx => {
                    loop {
                        match rx.try_recv() {
                            Ok(entry) => emit(&entry),
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
    });

    (stop_tx, task)
}

/// `--threshold` must be a finite share between 0 and 1.
fn parse_threshold(text: &str) -> Result<f64, String> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", text))?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!("'{}' must be between 0.0 and 1.0", text));
    }
    Ok(value)
}

fn open_input(input: &Path) -> Result<Box<dyn WorkbookSource + Send>, AppError> {
    if !input.exists() {
        return Err(AppError::InputNotFound(input.to_path_buf()));
    }
    Ok(open_workbook(input)?)
}

/// Open `path` with the system's default application.
fn open_file(path: &Path) {
    let status = if cfg!(target_os = "macos") {
        std::process::Command::new("open").arg(path).status()
    } else if cfg!(target_os = "windows") {
        std::process::Command::new("cmd").args(["/C", "start", ""]).arg(path).status()
    } else {
        std::process::Command::new("xdg-open").arg(path).status()
    };

    match status {
        Ok(_) => eprintln!("👀 Opening output file..."),
        Err(e) => {
            eprintln!("⚠️  Note: could not open file automatically: {}", e);
            eprintln!("📁 File saved at: {}", path.display());
        }
    }
}
