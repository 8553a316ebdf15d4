//! Band CLI - Command-line interface for Synheart Band
//!
//! Commands:
//! - decode: Run the full pipeline over a batch of raw records
//! - validate: Check payload shapes and report drop rates
//! - doctor: Diagnose pipeline health and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_band::pipeline::{parse_records_array, parse_records_ndjson, BandProcessor};
use synheart_band::{validate, BatchOutput, PipelineConfig, RawRecord, BAND_VERSION, PRODUCER_NAME};

/// Band - On-device decode and wear-detection engine for wrist-worn sensors
#[derive(Parser)]
#[command(name = "band")]
#[command(author = "Synheart AI Inc")]
#[command(version = BAND_VERSION)]
#[command(about = "Decode wrist-device packet batches into channel series and wear verdicts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a batch of raw records
    Decode {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Pipeline configuration file (JSON); defaults to canonical tuning
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit only the batch report, not the series
        #[arg(long)]
        report_only: bool,
    },

    /// Check payload shapes and report drop rates
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose pipeline health and configuration
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one raw record per line)
    Ndjson,
    /// JSON array of raw records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BandCliError> {
    match cli.command {
        Commands::Decode {
            input,
            output,
            input_format,
            output_format,
            config,
            report_only,
        } => cmd_decode(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            report_only,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_decode(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    report_only: bool,
) -> Result<(), BandCliError> {
    let records = read_records(input, &input_format)?;

    let pipeline_config = match config {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            PipelineConfig::from_json(&json)?
        }
        None => PipelineConfig::default(),
    };

    let processor = BandProcessor::with_config(pipeline_config);
    let batch = processor.process(records)?;

    let output_data = format_output(&batch, &output_format, report_only)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), BandCliError> {
    let records = read_records(input, &input_format)?;

    let total = records.len();
    let validated = validate(records);
    let report = ValidationReport {
        total_records: total,
        accepted_records: validated.accepted.len(),
        dropped_records: validated.dropped,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:    {}", report.total_records);
        println!("Accepted records: {}", report.accepted_records);
        println!("Dropped records:  {}", report.dropped_records);
    }

    if report.dropped_records > 0 {
        Err(BandCliError::ValidationFailed(report.dropped_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), BandCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "band_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Band version {}", BAND_VERSION),
    });

    if let Some(config_path) = config {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match PipelineConfig::from_json(&content) {
                    Ok(parsed) => {
                        checks.push(DoctorCheck {
                            name: "config".to_string(),
                            status: CheckStatus::Ok,
                            message: format!(
                                "Config valid (sampling rate {} Hz, max gap {})",
                                parsed.quality.sampling_rate_hz, parsed.reconstruct.max_gap
                            ),
                        });
                    }
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "config".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Invalid config JSON: {}", e),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read config file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (batch mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: BAND_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Band Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(BandCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_records(input: &PathBuf, format: &InputFormat) -> Result<Vec<RawRecord>, BandCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = match format {
        InputFormat::Ndjson => parse_records_ndjson(&input_data)?,
        InputFormat::Json => parse_records_array(&input_data)?,
    };

    if records.is_empty() {
        return Err(BandCliError::NoRecords);
    }

    Ok(records)
}

fn format_output(
    batch: &BatchOutput,
    format: &OutputFormat,
    report_only: bool,
) -> Result<String, BandCliError> {
    let value = if report_only {
        serde_json::to_value(&batch.report)?
    } else {
        serde_json::to_value(batch)?
    };

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(&value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&value)?,
    };
    Ok(rendered)
}

// Error types

#[derive(Debug)]
enum BandCliError {
    Io(io::Error),
    Decode(synheart_band::DecodeError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for BandCliError {
    fn from(e: io::Error) -> Self {
        BandCliError::Io(e)
    }
}

impl From<synheart_band::DecodeError> for BandCliError {
    fn from(e: synheart_band::DecodeError) -> Self {
        BandCliError::Decode(e)
    }
}

impl From<serde_json::Error> for BandCliError {
    fn from(e: serde_json::Error) -> Self {
        BandCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BandCliError> for CliError {
    fn from(e: BandCliError) -> Self {
        match e {
            BandCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BandCliError::Decode(e) => CliError {
                code: "DECODE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure payloads contain 20 numeric fields".to_string()),
            },
            BandCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BandCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            BandCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix payload shapes and retry".to_string()),
            },
            BandCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    accepted_records: usize,
    dropped_records: usize,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
