//! spaceflux CLI - Command-line interface for smartspace-flux
//!
//! Commands:
//! - normalize: Process raw device payloads into sensor documents (batch mode)
//! - score: Score canonical readings or raw comfort-sensor payloads
//! - analyze: Aggregate stored documents and evaluate the window
//! - listen: Process streaming payloads from stdin through the ingest worker
//! - validate: Check raw payloads without processing them
//! - doctor: Diagnose pipeline health and configuration
//! - schema: Print input/output schema information

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use smartspace_flux::config::EngineConfig;
use smartspace_flux::encoder::RecordEncoder;
use smartspace_flux::ingest::{InboundMessage, IngestSinks, IngestWorker, DEFAULT_QUEUE_CAPACITY};
use smartspace_flux::scoring::{comfort_score, productivity_index, quality_score, ScoreInputs};
use smartspace_flux::store::{read_documents, DocumentQuery, DocumentStore, NdjsonStore};
use smartspace_flux::trend::TrendStore;
use smartspace_flux::types::{
    AirQualityLevel, CanonicalReading, ComfortRating, DeviceType, NormalizedPayload, ScoreResult,
    SensorDocument,
};
use smartspace_flux::{ComputeError, Normalizer, SensorProcessor, FLUX_VERSION, PRODUCER_NAME};

/// spaceflux - Environmental signal processing for smart-space IoT devices
#[derive(Parser)]
#[command(name = "spaceflux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Normalize, score and analyze smart-space sensor payloads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw device payloads into sensor documents (batch mode)
    Normalize {
        /// Source type tag (comfort-sensor, person-counter, behavior-analyzer or a legacy alias)
        #[arg(short, long)]
        source: String,

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
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        engine: EngineArgs,

        /// Also append documents to an NDJSON document store
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Score canonical readings or raw comfort-sensor payloads
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Aggregate stored sensor documents and evaluate the window
    Analyze {
        /// NDJSON document file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Only consider documents from the last N hours
        #[arg(long)]
        hours: Option<u32>,

        /// Anomaly thresholds and trend settings (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Process streaming payloads from stdin (one JSON object per line)
    Listen {
        /// Source type tag
        #[arg(short, long)]
        source: String,

        /// Append documents to an NDJSON document store instead of printing them
        #[arg(long)]
        store: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,

        /// Inbound queue depth
        #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
        queue: usize,
    },

    /// Check raw payloads without processing them
    Validate {
        /// Source type tag
        #[arg(short, long)]
        source: String,

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

        /// Check a trend state file
        #[arg(long)]
        trends: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

/// Engine options shared by the processing commands
#[derive(clap::Args)]
struct EngineArgs {
    /// Anomaly thresholds and trend settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Values kept per device and metric for trend classification
    #[arg(long)]
    trend_window: Option<usize>,

    /// Load trend state from file
    #[arg(long)]
    load_trends: Option<PathBuf>,

    /// Save trend state to file after processing
    #[arg(long)]
    save_trends: Option<PathBuf>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one payload per line)
    Ndjson,
    /// JSON array of payloads, or a single payload object
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Raw device payloads
    Input,
    /// Stored sensor documents
    Output,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let report = serde_json::to_string(&CliError::from(e))
                .unwrap_or_else(|_| "Unknown error".to_string());
            eprintln!("{}", report);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SpacefluxCliError> {
    match cli.command {
        Commands::Normalize {
            source,
            input,
            output,
            input_format,
            output_format,
            engine,
            store,
        } => cmd_normalize(
            &source,
            &input,
            &output,
            input_format,
            output_format,
            &engine,
            store.as_deref(),
        ),

        Commands::Score {
            input,
            input_format,
            output_format,
        } => cmd_score(&input, input_format, output_format),

        Commands::Analyze {
            input,
            hours,
            config,
        } => cmd_analyze(&input, hours, config.as_deref()),

        Commands::Listen {
            source,
            store,
            engine,
            queue,
        } => cmd_listen(&source, store.as_deref(), &engine, queue),

        Commands::Validate {
            source,
            input,
            input_format,
            json,
        } => cmd_validate(&source, &input, input_format, json),

        Commands::Doctor {
            config,
            trends,
            json,
        } => cmd_doctor(config.as_deref(), trends.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_normalize(
    source: &str,
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    engine: &EngineArgs,
    store: Option<&Path>,
) -> Result<(), SpacefluxCliError> {
    let input_data = read_input(input)?;
    let payloads = parse_payloads(&input_data, &input_format)?;

    if payloads.is_empty() {
        return Err(SpacefluxCliError::NoPayloads);
    }

    let mut processor = build_processor(engine)?;
    let mut store = store.map(NdjsonStore::open);

    let mut documents: Vec<SensorDocument> = Vec::with_capacity(payloads.len());
    for payload in &payloads {
        let document = processor.process(source, payload)?;
        if let Some(store) = store.as_mut() {
            store.insert(&document)?;
        }
        documents.push(document);
    }

    save_trends(&processor, engine)?;

    let output_data = format_output(&documents, &output_format)?;
    write_output(output, &output_data)
}

fn cmd_score(
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), SpacefluxCliError> {
    let input_data = read_input(input)?;
    let payloads = parse_payloads(&input_data, &input_format)?;

    if payloads.is_empty() {
        return Err(SpacefluxCliError::NoPayloads);
    }

    let mut reports = Vec::with_capacity(payloads.len());
    for payload in payloads {
        let reading = reading_for_scoring(payload)?;
        reports.push(ScoreReport::from(&reading));
    }

    print!("{}", format_output(&reports, &output_format)?);
    Ok(())
}

/// Canonical readings carry a `deviceType`; anything else is taken as a raw
/// comfort-sensor payload.
fn reading_for_scoring(payload: serde_json::Value) -> Result<CanonicalReading, SpacefluxCliError> {
    if payload.get("deviceType").is_some() {
        return Ok(serde_json::from_value(payload)?);
    }

    let normalized = Normalizer::normalize(DeviceType::ComfortSensor.as_str(), &payload)?;
    match normalized {
        NormalizedPayload::Reading(reading) => Ok(reading),
        NormalizedPayload::Passthrough(_) => Err(SpacefluxCliError::ParseError(
            "payload could not be read as a comfort-sensor reading".to_string(),
        )),
    }
}

fn cmd_analyze(
    input: &Path,
    hours: Option<u32>,
    config: Option<&Path>,
) -> Result<(), SpacefluxCliError> {
    let config = match config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };

    let documents = if is_stdio(input) {
        read_documents(read_input(input)?.as_bytes(), "stdin")?
    } else {
        NdjsonStore::open(input).query(&DocumentQuery::default())?
    };

    if documents.is_empty() {
        return Err(SpacefluxCliError::NoDocuments);
    }

    let processor = SensorProcessor::with_config(config);
    let analysis = processor.analyze(&documents, Utc::now(), hours);
    println!("{}", RecordEncoder::analysis_to_json(&analysis)?);
    Ok(())
}

fn cmd_listen(
    source: &str,
    store: Option<&Path>,
    engine: &EngineArgs,
    queue: usize,
) -> Result<(), SpacefluxCliError> {
    let processor = build_processor(engine)?;
    let runtime = tokio::runtime::Runtime::new()?;

    let report = runtime.block_on(async {
        let (output_tx, mut output_rx) = mpsc::unbounded_channel::<SensorDocument>();
        let sinks = IngestSinks {
            store: store.map(|path| {
                Box::new(NdjsonStore::open(path)) as Box<dyn DocumentStore + Send>
            }),
            output: store.is_none().then_some(output_tx),
        };
        let worker = IngestWorker::spawn(processor, sinks, queue);

        let printer = tokio::spawn(async move {
            let mut stdout = io::stdout();
            while let Some(document) = output_rx.recv().await {
                match RecordEncoder::to_json_line(&document) {
                    Ok(line) => {
                        let _ = writeln!(stdout, "{line}");
                        let _ = stdout.flush();
                    }
                    Err(e) => log::error!("failed to encode document {}: {}", document.id, e),
                }
            }
        });

        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        let mut interrupted = false;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    log::info!("interrupt received, stopping listener");
                    interrupted = true;
                    break;
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) if line.trim().is_empty() => continue,
                        Some(line) => worker.submit(InboundMessage::new(source, line)).await?,
                        None => break,
                    }
                }
            }
        }

        let report = if interrupted {
            worker.stop().await?
        } else {
            worker.finish().await?
        };
        let _ = printer.await;
        Ok::<_, SpacefluxCliError>(report)
    })?;

    log::info!(
        "listener stats: {}",
        serde_json::to_string(&report.stats).unwrap_or_default()
    );
    save_trends(&report.processor, engine)
}

fn cmd_validate(
    source: &str,
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), SpacefluxCliError> {
    let input_data = read_input(input)?;
    let payloads = parse_payloads(&input_data, &input_format)?;
    let known_source = DeviceType::from_tag(source).is_some();

    let errors: Vec<ValidationErrorDetail> = payloads
        .iter()
        .enumerate()
        .filter_map(|(index, payload)| {
            Normalizer::normalize(source, payload)
                .err()
                .map(|e| ValidationErrorDetail {
                    index,
                    error: e.to_string(),
                })
        })
        .collect();

    let report = ValidationReport {
        source: source.to_string(),
        known_source,
        total_payloads: payloads.len(),
        valid_payloads: payloads.len() - errors.len(),
        invalid_payloads: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Source:           {}", report.source);
        if !report.known_source {
            println!("                  (unknown source type, payloads pass through unchanged)");
        }
        println!("Total payloads:   {}", report.total_payloads);
        println!("Valid payloads:   {}", report.valid_payloads);
        println!("Invalid payloads: {}", report.invalid_payloads);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Payload {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_payloads > 0 {
        Err(SpacefluxCliError::ValidationFailed(report.invalid_payloads))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    config: Option<&Path>,
    trends: Option<&Path>,
    json: bool,
) -> Result<(), SpacefluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("spaceflux version {}", FLUX_VERSION),
    });

    checks.push(DoctorCheck {
        name: "device_types".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "Supported device types: {}",
            DeviceType::ALL.map(|d| d.as_str()).join(", ")
        ),
    });

    if let Some(config_path) = config {
        checks.push(match EngineConfig::from_path(config_path) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!("Configuration valid (trend window {})", config.trend_window),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    }

    if let Some(trends_path) = trends {
        let check = if !trends_path.exists() {
            DoctorCheck {
                name: "trends".to_string(),
                status: CheckStatus::Warning,
                message: "Trend state file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(trends_path) {
                Ok(content) => match TrendStore::from_json(&content) {
                    Ok(store) => DoctorCheck {
                        name: "trends".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Trend state valid ({} devices, window {})",
                            store.device_count(),
                            store.window_size()
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "trends".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid trend state JSON: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "trends".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read trend state file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Streaming mode reads stdin
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
            message: "stdin is a pipe (listen mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("spaceflux Doctor Report");
        println!("=======================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(SpacefluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), SpacefluxCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input: raw device payloads (one JSON object each)");
                println!();
                println!("1. comfort-sensor (alias: kaiteki)");
                println!("   - Temperature, Humidity, CO2, Illuminance, Pressure, NoiseLevel, AQI");
                println!("   - Human, PersonCount, DeviceNo, Rssi, Voltage, Power, Interval");
                println!("   - DataNo, Ver, MeasureTime, MAC, SSID, DeviceName");
                println!("   - lower-camel fallbacks: temperature, humidity, co2, lightLevel, ...");
                println!();
                println!("2. person-counter (alias: aitrios)");
                println!("   - deviceId, personCount, ageDistribution, genderDistribution");
                println!("   - confidence (0-1), location");
                println!();
                println!("3. behavior-analyzer (alias: gemini)");
                println!("   - deviceId, behaviorAnalysis, emotionAnalysis, interactionPatterns");
                println!("   - confidence (0-1)");
                println!();
                println!("Any field may be missing; missing fields take zero-values.");
                println!("Unknown source types are stored unchanged.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output: sensor_data documents");
                println!();
                println!("- id: UUID v4");
                println!("- source, deviceId, timestamp (processing time, RFC 3339)");
                println!("- type: sensor_data");
                println!("- data: canonical reading tagged by deviceType, rawData preserved");
                println!("- signals (comfort-sensor only):");
                println!("  - comfort, quality: {{ variant, score, components }}");
                println!("  - comfortRating, airQuality, productivityIndex");
                println!("  - evaluation: {{ anomalies, recommendations }}");
                println!("  - trends: per-metric stable | up | down");
                println!("- producer: {{ name, version, instanceId }}");
            }
        }
    }

    Ok(())
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(input: &Path) -> Result<String, SpacefluxCliError> {
    if is_stdio(input) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), SpacefluxCliError> {
    if is_stdio(output) {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn parse_payloads(
    input: &str,
    format: &InputFormat,
) -> Result<Vec<serde_json::Value>, SpacefluxCliError> {
    match format {
        InputFormat::Ndjson => input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    SpacefluxCliError::ParseError(format!("line {}: {}", index + 1, e))
                })
            })
            .collect(),
        InputFormat::Json => match serde_json::from_str::<serde_json::Value>(input)? {
            serde_json::Value::Array(items) => Ok(items),
            single => Ok(vec![single]),
        },
    }
}

fn build_processor(engine: &EngineArgs) -> Result<SensorProcessor, SpacefluxCliError> {
    let mut config = match &engine.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(window) = engine.trend_window {
        config.trend_window = window;
        config.validate()?;
    }

    let mut processor = SensorProcessor::with_config(config);
    if let Some(trends_path) = &engine.load_trends {
        let trends_json = fs::read_to_string(trends_path)?;
        processor.load_trends(&trends_json)?;
    }
    Ok(processor)
}

fn save_trends(processor: &SensorProcessor, engine: &EngineArgs) -> Result<(), SpacefluxCliError> {
    if let Some(trends_path) = &engine.save_trends {
        let trends_json = processor.save_trends()?;
        fs::write(trends_path, trends_json)?;
    }
    Ok(())
}

fn format_output<T: Serialize>(
    records: &[T],
    format: &OutputFormat,
) -> Result<String, SpacefluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "comfort-sensor payload",
        "description": "Raw comfort/environment sensor payload; every field is optional",
        "type": "object",
        "properties": {
            "DeviceNo": { "type": "string" },
            "Temperature": { "type": ["number", "string"] },
            "Humidity": { "type": ["number", "string"] },
            "CO2": { "type": ["number", "string"] },
            "Illuminance": { "type": ["number", "string"] },
            "Pressure": { "type": ["number", "string"] },
            "NoiseLevel": { "type": ["number", "string"] },
            "AQI": { "type": ["number", "string"] },
            "PersonCount": { "type": ["integer", "string"] },
            "Human": { "type": ["boolean", "integer", "string"] },
            "Rssi": { "type": "number" },
            "Voltage": { "type": "number" },
            "Power": { "type": "number" },
            "Interval": { "type": "integer" },
            "DataNo": { "type": ["string", "integer"] },
            "Ver": { "type": "string" },
            "MeasureTime": { "type": "string" },
            "MAC": { "type": "string" },
            "SSID": { "type": "string" },
            "DeviceName": { "type": "string" },
            "timestamp": { "type": "string", "format": "date-time" }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sensor_data document",
        "type": "object",
        "required": ["id", "source", "timestamp", "deviceId", "type", "data", "producer"],
        "properties": {
            "id": { "type": "string", "format": "uuid" },
            "source": { "type": "string" },
            "timestamp": { "type": "string", "format": "date-time" },
            "deviceId": { "type": "string" },
            "type": { "type": "string", "const": "sensor_data" },
            "data": {
                "type": "object",
                "properties": {
                    "deviceType": {
                        "type": "string",
                        "enum": ["comfort-sensor", "person-counter", "behavior-analyzer"]
                    },
                    "deviceId": { "type": "string" },
                    "timestamp": { "type": "string" },
                    "rawData": {}
                }
            },
            "signals": {
                "type": "object",
                "properties": {
                    "comfort": { "$ref": "#/$defs/score" },
                    "quality": { "$ref": "#/$defs/score" },
                    "comfortRating": { "enum": ["excellent", "good", "fair", "poor"] },
                    "airQuality": { "enum": ["excellent", "good", "fair", "poor"] },
                    "productivityIndex": { "type": "integer", "minimum": 60, "maximum": 100 },
                    "evaluation": { "type": "object" },
                    "trends": {
                        "type": "object",
                        "additionalProperties": { "enum": ["stable", "up", "down"] }
                    }
                }
            },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instanceId": { "type": "string" }
                }
            }
        },
        "$defs": {
            "score": {
                "type": "object",
                "properties": {
                    "variant": { "enum": ["comfort", "quality"] },
                    "score": { "type": "integer", "minimum": 0, "maximum": 100 },
                    "components": { "type": "object" }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum SpacefluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoPayloads,
    NoDocuments,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for SpacefluxCliError {
    fn from(e: io::Error) -> Self {
        SpacefluxCliError::Io(e)
    }
}

impl From<ComputeError> for SpacefluxCliError {
    fn from(e: ComputeError) -> Self {
        SpacefluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SpacefluxCliError {
    fn from(e: serde_json::Error) -> Self {
        SpacefluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SpacefluxCliError> for CliError {
    fn from(e: SpacefluxCliError) -> Self {
        match e {
            SpacefluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SpacefluxCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidPayload(_) => {
                        ("INVALID_PAYLOAD", "Each payload must be a JSON object")
                    }
                    ComputeError::ConfigError(_) => {
                        ("CONFIG_ERROR", "Run 'spaceflux doctor --config <file>' for details")
                    }
                    ComputeError::StoreError(_) => ("STORE_ERROR", "Check the document store path"),
                    _ => ("PARSE_ERROR", "Check input format"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            SpacefluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SpacefluxCliError::NoPayloads => CliError {
                code: "NO_PAYLOADS".to_string(),
                message: "No payloads found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            SpacefluxCliError::NoDocuments => CliError {
                code: "NO_DOCUMENTS".to_string(),
                message: "No sensor documents found in input".to_string(),
                hint: Some(
                    "Produce documents with 'spaceflux normalize --store <file>'".to_string(),
                ),
            },
            SpacefluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} payloads failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            SpacefluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            SpacefluxCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreReport {
    device_id: String,
    device_type: DeviceType,
    comfort: ScoreResult,
    quality: ScoreResult,
    comfort_rating: ComfortRating,
    air_quality: Option<AirQualityLevel>,
    productivity_index: u8,
}

impl From<&CanonicalReading> for ScoreReport {
    fn from(reading: &CanonicalReading) -> Self {
        let inputs = ScoreInputs::from(reading);
        let comfort = comfort_score(&inputs);
        ScoreReport {
            device_id: reading.device_id().to_string(),
            device_type: reading.device_type(),
            comfort_rating: ComfortRating::from_score(comfort.score),
            air_quality: reading.as_environment().map(|env| AirQualityLevel::from_co2(env.co2)),
            productivity_index: productivity_index(&inputs),
            quality: quality_score(&inputs),
            comfort,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationReport {
    source: String,
    known_source: bool,
    total_payloads: usize,
    valid_payloads: usize,
    invalid_payloads: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
