use abpm_core::puller::PullFailure;
use abpm_core::*;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Failures listed individually after a pull
const MAX_FAILURES_SHOWN: usize = 20;

#[derive(Parser)]
#[command(name = "abpm")]
#[command(
    about = "Ambulatory blood pressure monitoring data and hemodynamic indices",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every hemodynamic index for one measurement
    Compute {
        /// Age in years
        #[arg(long)]
        age: f64,

        /// Weight in kg
        #[arg(long)]
        weight: f64,

        /// Height in meters
        #[arg(long)]
        height: f64,

        /// Systolic blood pressure in mmHg
        #[arg(long)]
        systolic: f64,

        /// Diastolic blood pressure in mmHg
        #[arg(long)]
        diastolic: f64,

        /// Heart rate in beats per minute
        #[arg(long)]
        heart_rate: f64,

        /// Left ventricular ejection fraction
        #[arg(long, default_value_t = DEFAULT_EJECTION_FRACTION)]
        ejection_fraction: f64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Pull ABPM tests from the clinical API into the data directory
    Pull {
        /// First test id to request (default: one past the last stored test)
        #[arg(long)]
        start_id: Option<u64>,

        /// Stop once tests start after this date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Concurrent requests per batch
        #[arg(long)]
        workers: Option<usize>,

        /// Consecutive failed tests tolerated before stopping
        #[arg(long)]
        max_consecutive_errors: Option<usize>,

        /// API user name
        #[arg(long)]
        username: Option<String>,

        /// API password
        #[arg(long, env = "ABPM_API_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Build the CSV dataset from pulled tests
    Dataset {
        /// Output CSV path (default: <data-dir>/sleep_dataset.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only write the raw readings, without hemodynamic indices
        #[arg(long)]
        no_indices: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    abpm_core::logging::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    tracing::debug!("Using data directory {:?}", config.data.data_dir);

    match cli.command {
        Commands::Compute {
            age,
            weight,
            height,
            systolic,
            diastolic,
            heart_rate,
            ejection_fraction,
            json,
        } => {
            let measurement =
                PatientMeasurement::new(age, weight, height, systolic, diastolic, heart_rate)
                    .with_ejection_fraction(ejection_fraction);
            cmd_compute(&measurement, json)
        }
        Commands::Pull {
            start_id,
            end_date,
            workers,
            max_consecutive_errors,
            username,
            password,
        } => {
            if let Some(end_date) = end_date {
                config.pull.end_date = end_date;
            }
            if let Some(workers) = workers {
                config.pull.concurrent_workers = workers;
            }
            if let Some(max) = max_consecutive_errors {
                config.pull.max_consecutive_errors = max;
            }
            if let Some(username) = username {
                config.api.username = username;
            }
            if let Some(password) = password {
                config.api.password = password;
            }
            config.validate()?;
            cmd_pull(&config, start_id)
        }
        Commands::Dataset { output, no_indices } => {
            let output = output.unwrap_or_else(|| config.data.dataset_path());
            cmd_dataset(&config.data.records_dir(), &output, !no_indices)
        }
    }
}

fn cmd_compute(measurement: &PatientMeasurement, json: bool) -> Result<()> {
    measurement.validate()?;
    let profile = measurement.profile();

    if json {
        let output = serde_json::json!({
            "measurement": measurement,
            "indices": profile.to_map(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for (index, value) in profile.entries() {
        println!("  {:<40} {:>14.4}  {}", index.name(), value, index.unit());
    }

    let faults = profile.non_finite();
    if !faults.is_empty() {
        println!();
        println!("⚠ Non-finite results: {:?}", faults);
    }

    Ok(())
}

fn cmd_pull(config: &Config, start_id: Option<u64>) -> Result<()> {
    let records_dir = config.data.records_dir();
    let start_id = match start_id {
        Some(id) => id,
        None => match store::max_record_id(&records_dir)? {
            0 => 0,
            last => last + 1,
        },
    };

    let options = PullOptions::from_config(&config.pull, start_id);
    let mut sink = JsonRecordStore::new(&records_dir);

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        let client = AbpmClient::login(&config.api).await?;
        pull(&client, &mut sink, &options).await
    })?;

    println!("✓ Pulled {} tests into {}", report.saved, records_dir.display());
    println!("  Stopped: {:?} (next id {})", report.stop_reason, report.next_id);
    print_failures(&report.failures);

    Ok(())
}

fn print_failures(failures: &[PullFailure]) {
    if failures.is_empty() {
        return;
    }

    println!("  {} tests failed:", failures.len());
    for failure in failures.iter().take(MAX_FAILURES_SHOWN) {
        match failure.status {
            Some(status) => println!("    {} -- {}", failure.patient_id, status),
            None => println!("    {} -- {}", failure.patient_id, failure.reason),
        }
    }
    if failures.len() > MAX_FAILURES_SHOWN {
        println!("    ... and {} more", failures.len() - MAX_FAILURES_SHOWN);
    }
}

fn cmd_dataset(records_dir: &Path, output: &Path, with_indices: bool) -> Result<()> {
    if !records_dir.exists() {
        println!("No pulled tests found in {} - nothing to build.", records_dir.display());
        return Ok(());
    }

    let summary = build_dataset(records_dir, output, with_indices)?;

    println!("✓ Wrote {} rows to {}", summary.rows, output.display());
    if with_indices {
        println!(
            "  Indices computed for {} rows, {} skipped",
            summary.enriched, summary.skipped
        );
    }

    Ok(())
}
