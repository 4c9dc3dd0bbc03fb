// itdash - IT dashboard scrape, business-case download and reconciliation

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use itdash_cli::browser::WebDriver;
use itdash_cli::exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use itdash_cli::orchestrator::{self, RunContext, RunSummary};
use itdash_cli::CliError;
use itdash_config::{Settings, DEFAULT_SETTINGS_FILE};
use itdash_io::fs::ensure_dir;
use itdash_io::Pdftotext;

#[derive(Parser)]
#[command(name = "itdash")]
#[command(about = "Scrape IT dashboard spending, download business cases and reconcile them")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Clone)]
struct CommonArgs {
    /// Settings file
    #[arg(long, global = true, env = "ITDASH_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Output directory (overrides "output.dir")
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full run: tiles, table, documents, report (the default)
    Run,

    /// Reconcile documents already in the output directory (no browser)
    #[command(after_help = "\
Reads sheet {target} of Agencies.xlsx and every *.pdf in the output
directory (by file name), then rewrites compare-pdf.txt.")]
    Reconcile,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("ITDASH_COMMIT"), ")",
        "\nrecon:   itdash-recon ", env!("CARGO_PKG_VERSION"),
        "\nbuild:   ", env!("ITDASH_PROFILE"),
    )
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also come through here
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    init_logging(cli.common.verbose);

    let result = match cli.command {
        None | Some(Commands::Run) => cmd_run(&cli.common),
        Some(Commands::Reconcile) => cmd_reconcile(&cli.common),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .init();
}

/// Settings plus a ready, absolute output directory.
fn prepare(args: &CommonArgs) -> Result<(Settings, RunContext), CliError> {
    let settings = Settings::load(&args.settings).map_err(CliError::config)?;
    let output = args.output.as_deref().unwrap_or(&settings.output_dir);
    let output_dir = ensure_dir(output)
        .map_err(|e| CliError::store(e).with_hint("check permissions on the output directory"))?;
    log::info!("target '{}', output {}", settings.target, output_dir.display());
    let ctx = RunContext::from_settings(&settings, &output_dir);
    Ok((settings, ctx))
}

fn cmd_run(args: &CommonArgs) -> Result<(), CliError> {
    let (settings, ctx) = prepare(args)?;
    let mut browser = WebDriver::new(&settings.webdriver_url, settings.headless)?;
    let summary = orchestrator::run(&mut browser, &Pdftotext, &ctx)?;
    finish(&summary, args.json)
}

fn cmd_reconcile(args: &CommonArgs) -> Result<(), CliError> {
    let (_, ctx) = prepare(args)?;
    if !ctx.workbook_path.is_file() {
        return Err(CliError::store(format!("{} not found", ctx.workbook_path.display()))
            .with_hint("run `itdash` first to scrape the dashboard"));
    }
    let summary = orchestrator::reconcile_existing(&Pdftotext, &ctx)?;
    finish(&summary, args.json)
}

fn finish(summary: &RunSummary, json: bool) -> Result<(), CliError> {
    if json {
        let out = serde_json::to_string_pretty(summary)
            .map_err(|e| CliError::report(format!("cannot serialize summary: {e}")))?;
        println!("{out}");
    } else {
        print_summary(summary);
    }

    if summary.excluded.is_empty() {
        Ok(())
    } else {
        Err(CliError::excluded(summary.excluded.len(), summary.documents))
    }
}

fn print_summary(summary: &RunSummary) {
    let o = &summary.outcomes;
    eprintln!(
        "{}: {} matched, {} mismatched, {} not found ({} of {} document(s) reconciled)",
        summary.target, o.matched, o.mismatched, o.not_found, summary.reconciled, summary.documents
    );
    for excluded in &summary.excluded {
        eprintln!("  excluded {}: {}", excluded.path.display(), excluded.reason);
    }
    eprintln!("report: {}", summary.report.display());
}
