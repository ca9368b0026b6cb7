use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seed_inventory_confirmation::chromedriver_manager::ChromeDriverManager;
use seed_inventory_confirmation::export::export_report;
use seed_inventory_confirmation::scraper::{PortalSession, TracingSink};
use seed_inventory_confirmation::workflow::{shutdown_signal, until_cancelled};
use seed_inventory_confirmation::{
    run_with_teardown, target_date, AppConfig, ConfirmationReport, RunSettings,
};

#[derive(Debug, Parser)]
#[command(name = "inventory_confirmation")]
#[command(about = "Collects unconfirmed route inventory from the SEED portal")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape the routes summary and write the daily report
    Run {
        /// Show the browser window
        #[arg(long)]
        visible: bool,

        /// Target date (YYYY-MM-DD) instead of the previous business day
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output directory for the report files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a CSV copy
        #[arg(long)]
        csv: bool,

        /// Also write a JSON copy
        #[arg(long)]
        json: bool,
    },
    /// Check chromedriver, credentials and the computed target date
    Status,
    /// Show or initialise the config file
    Config {
        #[arg(long)]
        path: bool,

        /// Write the default config if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Run {
        visible: false,
        date: None,
        output: None,
        csv: false,
        json: false,
    }) {
        Commands::Run {
            visible,
            date,
            output,
            csv,
            json,
        } => {
            let mut config = AppConfig::load()?;
            if visible {
                config.headless_mode = false;
            }
            config.export_csv |= csv;
            config.export_json |= json;
            run(config, date, output).await
        }
        Commands::Status => status().await,
        Commands::Config { path, init } => config_command(path, init),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "seed_inventory_confirmation=debug,inventory_confirmation=debug"
    } else {
        "seed_inventory_confirmation=info,inventory_confirmation=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn run(config: AppConfig, date: Option<NaiveDate>, output: Option<PathBuf>) -> Result<()> {
    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            error!("{problem}");
        }
        anyhow::bail!("configuration is incomplete ({} problem(s))", problems.len());
    }

    let target = date.unwrap_or_else(|| target_date(Local::now().date_naive()));
    info!(%target, "starting inventory confirmation");

    let settings = RunSettings::from_config(&config, target);
    let mut interrupt = Box::pin(shutdown_signal());
    let session = until_cancelled(PortalSession::open(&config), &mut interrupt).await?;

    let report = run_with_teardown(session, &settings, &TracingSink, interrupt).await?;

    let output_dir = output.unwrap_or_else(|| PathBuf::from(&config.output_dir));
    let written = export_report(&report, &config, &output_dir)?;
    for path in &written {
        info!(path = %path.display(), "report written");
    }

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ConfirmationReport) {
    println!();
    println!("Inventory confirmation for {}", report.target_date);
    println!("  Routes found:      {}", report.routes_found());
    println!("  Assets collected:  {}", report.records.len());
    println!("  Elapsed:           {:.1}s", report.elapsed_secs);

    let failed: Vec<_> = report.failed_routes().collect();
    if !failed.is_empty() {
        println!("  Routes needing attention:");
        for result in failed {
            match &result.error {
                Some(error) => println!("    {} ({}): {}", result.route.name, result.status, error),
                None => println!("    {} ({})", result.route.name, result.status),
            }
        }
    }
}

async fn status() -> Result<()> {
    let config = AppConfig::load()?;
    let driver = ChromeDriverManager::new(config.portal.chromedriver_path.as_deref());

    println!("Config file:    {}", AppConfig::config_path()?.display());
    println!(
        "ChromeDriver:   {} ({})",
        if driver.is_available() { "found" } else { "missing, will download on run" },
        driver.driver_path().display()
    );
    println!(
        "Credentials:    username {}, password {}",
        if config.username.is_empty() { "missing" } else { "set" },
        if config.has_password() { "set" } else { "missing" }
    );
    println!("Portal:         {}", config.portal.base_url);
    println!("Target date:    {}", target_date(Local::now().date_naive()));

    for problem in config.validate() {
        println!("  ! {problem}");
    }
    Ok(())
}

fn config_command(path: bool, init: bool) -> Result<()> {
    let config_path = AppConfig::config_path()?;

    if init {
        if config_path.exists() {
            println!("Config already exists at {}", config_path.display());
        } else {
            let written = AppConfig::default()
                .save()
                .context("Failed to write default config")?;
            println!("Wrote default config to {}", written.display());
        }
        return Ok(());
    }

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    let config = AppConfig::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
