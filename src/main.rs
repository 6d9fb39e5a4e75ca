use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use scos_extract::config::AppConfig;
use scos_extract::ingestion::{read_scos_document, ParserRegistry};
use scos_extract::metrics;
use scos_extract::output::write_csv_file;
use scos_extract::query::ScosExecutor;

type BoxError = Box<dyn Error + Send + Sync>;

/// Filter a line listing with a simulator count output specification and
/// aggregate the counts.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "scos-extract", version, about)]
struct Args {
    /// Line listing to filter (CSV, TSV or JSON rows)
    dataset: PathBuf,

    /// SCOS document holding one query or an array of queries
    scos: PathBuf,

    /// Write the result as CSV instead of printing it
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Index of the query to run when the document holds several
    #[arg(short, long, default_value_t = 0)]
    query: usize,

    /// JSON run configuration
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the configured level
    #[arg(short, long)]
    verbose: bool,
}

/// Load, filter, aggregate, emit
fn run(args: &Args, config: &AppConfig) -> Result<(), BoxError> {
    let delimiter = config.csv.delimiter_byte()?;
    let registry = ParserRegistry::with_defaults(delimiter, config.csv.has_headers);

    let dataset = registry.load_file(&args.dataset)?;
    metrics::record_rows_loaded(dataset.len() as u64);
    info!(
        "Loaded {} rows with columns {:?} from {}",
        dataset.len(),
        dataset.columns(),
        args.dataset.display()
    );

    let specs = read_scos_document(&fs::read(&args.scos)?)?;
    let scos = specs.get(args.query).ok_or_else(|| {
        format!(
            "query {} not found, {} holds {} specification(s)",
            args.query,
            args.scos.display(),
            specs.len()
        )
    })?;

    let executor = ScosExecutor::new(config.execution.clone());
    let result = executor.execute(scos, &dataset)?;

    match &args.output {
        Some(path) => {
            write_csv_file(&result, path, delimiter)?;
            info!("Wrote {} rows to {}", result.len(), path.display());
        }
        None => println!("{}", result),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { config.level()? };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(true)
        .init();

    // Initialize metrics
    if let Some(addr) = config.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr) {
            warn!("Failed to initialize metrics: {}", e);
        } else {
            info!("Metrics server listening on {}", addr);
        }
    }

    info!("Starting scos-extract...");
    tokio::task::spawn_blocking(move || run(&args, &config)).await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("scos-extract").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["line_listing.csv", "scos.json", "-o", "out.csv", "--query", "1", "-v"]).unwrap();
        assert_eq!(
            parsed,
            Args {
                dataset: PathBuf::from("line_listing.csv"),
                scos: PathBuf::from("scos.json"),
                output: Some(PathBuf::from("out.csv")),
                query: 1,
                config: None,
                verbose: true,
            }
        );
    }

    #[test]
    fn test_parse_args_defaults() {
        let parsed = args(&["a.csv", "b.json", "-c", "run.json"]).unwrap();
        assert_eq!(parsed.query, 0);
        assert_eq!(parsed.output, None);
        assert_eq!(parsed.config, Some(PathBuf::from("run.json")));
        assert!(!parsed.verbose);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["only_one.csv"]).is_err());
        assert!(args(&["a.csv", "b.json", "--query", "first"]).is_err());
        assert!(args(&["a.csv", "b.json", "--output"]).is_err());
        assert!(args(&["a.csv", "b.json", "--fast"]).is_err());
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("line_listing.csv");
        let scos = dir.path().join("scos.json");
        let output = dir.path().join("result.csv");

        fs::write(
            &dataset,
            "sex,infection_state,integer_age,count\n\
             M,LATENT,20,5\n\
             F,LATENT,20,3\n\
             M,SUSCEPTIBLE,70,10\n",
        )
        .unwrap();
        fs::write(
            &scos,
            r#"{
                "simulator_count_variables": {
                    "infection_state": ["LATENT", "INFECTIOUS"],
                    "sex": ["M", "F"]
                },
                "output_options": {"axes": ["sex"]}
            }"#,
        )
        .unwrap();

        let parsed = Args {
            dataset,
            scos,
            output: Some(output.clone()),
            query: 0,
            config: None,
            verbose: false,
        };
        run(&parsed, &AppConfig::default()).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "sex,count\nF,3\nM,5\n");

        let missing = Args { query: 3, ..parsed };
        assert!(run(&missing, &AppConfig::default()).is_err());
    }
}
