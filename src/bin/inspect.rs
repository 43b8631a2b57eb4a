//! Record Inspector CLI
//!
//! Compiles schema descriptors and reads or writes record containers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use familiar_records::{Record, RecordCodec, RecordsConfig, SchemaDescriptor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "record-inspect")]
#[command(about = "Compile schemas and inspect encoded records")]
struct Cli {
    /// Configuration file (records.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical Avro schema of a descriptor
    Compile {
        /// Schema descriptor (JSON)
        descriptor: PathBuf,
    },

    /// Print the schema and records of a container
    Decode {
        /// Encoded container file
        file: PathBuf,
    },

    /// Encode JSON records into a container
    Encode {
        /// Schema descriptor (JSON)
        #[arg(short, long)]
        schema: PathBuf,
        /// Records as a JSON object or array of objects
        #[arg(short, long)]
        records: PathBuf,
        /// Output container file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn read_json(path: &PathBuf) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = RecordsConfig::load_from(cli.config.as_deref())?;
    let codec = RecordCodec::new(config.codec.clone());
    let format = config.output.format;

    match cli.command {
        Commands::Compile { descriptor } => {
            let schema = SchemaDescriptor::from_json(&read_json(&descriptor)?)?.build()?;
            println!("{}", format.render(&schema.to_canonical_json())?);
            Ok(())
        }

        Commands::Decode { file } => {
            let bytes = std::fs::read(&file)?;
            let (schema, records) = codec.decode_all(&bytes)?;
            let report = serde_json::json!({
                "schema": serde_json::to_value(schema.describe())?,
                "records": records.iter().map(Record::to_json).collect::<Vec<_>>(),
            });
            println!("{}", format.render(&report)?);
            Ok(())
        }

        Commands::Encode { schema, records, output } => {
            let schema = SchemaDescriptor::from_json(&read_json(&schema)?)?.build()?;
            let records = match read_json(&records)? {
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|item| Record::from_json(&schema, item))
                    .collect::<Result<Vec<_>, _>>()?,
                single => vec![Record::from_json(&schema, &single)?],
            };

            let bytes = codec.encode_all(&schema, &records)?;
            std::fs::write(&output, &bytes)?;
            println!(
                "✅ Wrote {} record(s), {} bytes to {:?}",
                records.len(),
                bytes.len(),
                output
            );
            Ok(())
        }
    }
}
