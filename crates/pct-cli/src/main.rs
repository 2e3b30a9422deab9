#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Mutex, PoisonError};

use clap::{Args, Parser, Subcommand};

use pct_config::config::PluginList;
use pct_config::TesterConfig;
use pct_engine::{load_catalog, CancelToken, CompatReport, PluginCompatTester};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "pct", about = "Test plugins against a core release")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Test the catalog's plugins and update the report
    Test(TestArgs),
    /// Convert or render a compatibility report
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
}

#[derive(Debug, Args)]
struct TestArgs {
    /// Path to the tester configuration
    #[arg(long, default_value = "pct.toml")]
    config: PathBuf,
    /// Catalog URL or path (overrides `catalog_url`)
    #[arg(long)]
    catalog: Option<String>,
    /// Existing directory for checkouts and logs (overrides `working_directory`)
    #[arg(long)]
    working_dir: Option<PathBuf>,
    /// Report file to read and update (overrides `report_file`)
    #[arg(long)]
    report_file: Option<PathBuf>,
    /// Comma-separated plugin ids to test
    #[arg(long)]
    include_plugins: Option<String>,
    /// Stop at the first build failure
    #[arg(long)]
    fail_fast: bool,
    /// Number of plugins tested concurrently
    #[arg(long)]
    workers: Option<usize>,
    /// Build tool executable (defaults to `mvn` on PATH)
    #[arg(long)]
    mvn: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum ReportAction {
    /// Print the compressed transport form of a JSON report
    Encode {
        /// JSON report file
        file: PathBuf,
    },
    /// Print the JSON report held in a compressed transport file
    Decode {
        /// File holding the compressed form
        file: PathBuf,
    },
    /// Print a JSON report as XML
    Xml {
        /// JSON report file
        file: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Test(args) => cmd_test(&args),
        Command::Report { action } => cmd_report(action),
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

/// Read the configuration file, or start from flags alone when it is absent.
fn resolve_config(args: &TestArgs) -> Result<TesterConfig, Box<dyn Error>> {
    let mut config = if args.config.exists() {
        TesterConfig::from_path(&args.config)?
    } else {
        match (&args.catalog, &args.working_dir, &args.report_file) {
            (Some(catalog), Some(work), Some(report)) => TesterConfig::new(catalog, work, report),
            _ => {
                return Err(format!(
                    "no {} found — create one or pass --catalog, --working-dir and --report-file",
                    args.config.display()
                )
                .into())
            }
        }
    };

    if let Some(catalog) = &args.catalog {
        config.catalog_url.clone_from(catalog);
    }
    if let Some(work) = &args.working_dir {
        config.working_directory.clone_from(work);
    }
    if let Some(report) = &args.report_file {
        config.report_file.clone_from(report);
    }
    if let Some(include) = &args.include_plugins {
        config.include_plugins = Some(PluginList::Csv(include.clone()));
    }
    if args.fail_fast {
        config.fail_fast = true;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(mvn) = &args.mvn {
        config.maven.executable = Some(mvn.clone());
    }
    config.validate()?;
    Ok(config)
}

fn cmd_test(args: &TestArgs) -> CliResult {
    let config = resolve_config(args)?;
    let report_file = config.report_file.clone();
    let catalog = load_catalog(&config)?;
    let tester = PluginCompatTester::new(config, catalog)?;

    let prior = CompatReport::load(&report_file)?;
    cancel_on_interrupt(tester.cancel_token())?;
    let report = Mutex::new(prior);
    let outcome = tester.run(&report);

    // Save whatever was recorded, even when the run aborted.
    let report = report.into_inner().unwrap_or_else(PoisonError::into_inner);
    report.save(&report_file)?;
    let summary = outcome?;

    eprintln!(
        "    Tested {} plugin(s) against {}: {} succeeded, {} failed, {} skipped",
        summary.total(),
        tester.catalog().core,
        summary.succeeded.len(),
        summary.failed.len(),
        summary.skipped.len()
    );
    eprintln!("    Report written to {}", report_file.display());
    if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(format!("failing plugins: {}", summary.failed.join(", ")).into())
    }
}

/// Ctrl-C stops the running builds; the run then ends as cancelled and the
/// partial report is still saved.
fn cancel_on_interrupt(token: CancelToken) -> CliResult {
    ctrlc::set_handler(move || {
        eprintln!("    Interrupted, stopping builds...");
        token.cancel();
    })
    .map_err(|e| format!("cannot install interrupt handler: {e}"))?;
    Ok(())
}

fn read_file(path: &Path) -> Result<String, Box<dyn Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()).into())
}

fn cmd_report(action: ReportAction) -> CliResult {
    match action {
        ReportAction::Encode { file } => {
            let report = CompatReport::from_json(&read_file(&file)?)?;
            println!("{}", report.encode_compressed()?);
        }
        ReportAction::Decode { file } => {
            let report = CompatReport::decode_compressed(read_file(&file)?.trim())?;
            println!("{}", report.to_json()?);
        }
        ReportAction::Xml { file } => {
            let report = CompatReport::from_json(&read_file(&file)?)?;
            print!("{}", report.to_xml());
        }
    }
    Ok(())
}
