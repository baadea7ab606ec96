//! choropleth CLI: legend reading and result table assembly from the
//! command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{error, info};

use choropleth_extract::artifacts::{self, OcrOutputRow};
use choropleth_extract::color::ColorConverter;
use choropleth_extract::legend::{LegendReader, OcrToken};
use choropleth_extract::logging::init_tracing;
use choropleth_extract::{
    assemble_from_artifacts, image_loader, ExtractionError, LegendTokenParser, MapType,
    PipelineConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "choropleth")]
#[command(about = "Turn choropleth map legends and region colors into a data table")]
#[command(version)]
struct Cli {
    /// Pipeline configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true, env = "CHOROPLETH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build Color_To_Data_Mapping.csv from OCR and segmentation artifacts.
    Assemble {
        /// OCR_output.csv of the run.
        #[arg(long)]
        ocr: PathBuf,

        /// output_objects_state_segmentation.csv of the run.
        #[arg(long)]
        segmentation: PathBuf,

        /// Where to write the result table (CSV).
        #[arg(long)]
        out: PathBuf,

        /// Also print the table as JSON records.
        #[arg(long)]
        json: bool,
    },

    /// Parse one legend label and print it as JSON.
    ParseToken {
        /// Label text, e.g. "1,000-2,000k".
        text: String,
    },

    /// Read legend entries from a cropped legend image and OCR tokens.
    SampleLegend {
        /// Cropped legend image.
        #[arg(long)]
        image: PathBuf,

        /// OCR tokens of the legend (JSON array of {quad, text, confidence}).
        #[arg(long)]
        tokens: PathBuf,

        /// File name of the source map, written to every row.
        #[arg(long)]
        file_name: String,

        #[arg(long, value_enum, default_value_t = MapTypeArg::Discrete)]
        map_type: MapTypeArg,

        #[arg(long, default_value = "")]
        title: String,

        /// Where to write the rows (OCR_output.csv format).
        /// Prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print every legend entry as JSON with its hex color, in place of
        /// the CSV rows on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration as JSON.
    GenerateConfig {
        #[arg(long, default_value = "config.json")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MapTypeArg {
    Discrete,
    Continuous,
}

impl From<MapTypeArg> for MapType {
    fn from(arg: MapTypeArg) -> Self {
        match arg {
            MapTypeArg::Discrete => MapType::Discrete,
            MapTypeArg::Continuous => MapType::Continuous,
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run_assemble(
    config: &PipelineConfig,
    ocr: &Path,
    segmentation: &Path,
    out: &Path,
    print_json: bool,
) -> CliResult<()> {
    let table = assemble_from_artifacts(ocr, segmentation, config)?;
    artifacts::write_table_file(out, &table)?;
    info!(
        path = %out.display(),
        rows = table.rows().len(),
        columns = table.columns().len(),
        "wrote result table"
    );

    if print_json {
        println!("{}", serde_json::to_string_pretty(&table.to_json_records())?);
    }
    Ok(())
}

fn run_parse_token(text: &str) -> CliResult<()> {
    let token = LegendTokenParser::new().parse(text);
    let output = json!({
        "raw_text": token.raw_text,
        "valid": token.is_valid(),
        "range": token.range,
        "value": token.value(),
        "unit": token.unit,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_sample_legend(
    config: &PipelineConfig,
    image: &Path,
    tokens: &Path,
    file_name: &str,
    map_type: MapType,
    title: &str,
    out: Option<&Path>,
    print_json: bool,
) -> CliResult<()> {
    let legend = image_loader::load_image(image)?;
    let tokens: Vec<OcrToken> = serde_json::from_str(&std::fs::read_to_string(tokens)?)?;

    let reader = LegendReader::with_config(&config.swatch_sampling);
    let record = reader.read_record(file_name, map_type, title, &legend, &tokens);
    let rows: Vec<OcrOutputRow> = artifacts::ocr_rows_from_record(&record);
    info!(tokens = tokens.len(), rows = rows.len(), "sampled legend");

    if print_json {
        let converter = ColorConverter::new();
        let entries: Vec<_> = record
            .legend
            .iter()
            .map(|entry| {
                json!({
                    "text": entry.raw_text,
                    "value": entry.value(),
                    "unit": entry.unit,
                    "color": entry.color.to_string(),
                    "hex": converter.to_hex(&entry.color),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    match out {
        Some(path) => artifacts::write_file(path, &rows)?,
        None if !print_json => artifacts::write_to(std::io::stdout().lock(), &rows, "stdout")?,
        None => {}
    }
    Ok(())
}

fn run_generate_config(out: &Path) -> CliResult<()> {
    PipelineConfig::default().to_json_file(out)?;
    println!("Wrote default configuration to {}", out.display());
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Assemble {
            ocr,
            segmentation,
            out,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_assemble(&config, &ocr, &segmentation, &out, json)
        }
        Commands::ParseToken { text } => run_parse_token(&text),
        Commands::SampleLegend {
            image,
            tokens,
            file_name,
            map_type,
            title,
            out,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_sample_legend(
                &config,
                &image,
                &tokens,
                &file_name,
                map_type.into(),
                &title,
                out.as_deref(),
                json,
            )
        }
        Commands::GenerateConfig { out } => run_generate_config(&out),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            match err.downcast_ref::<ExtractionError>() {
                Some(extraction) => eprintln!("{}", extraction.user_message()),
                None => eprintln!("Error: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}
