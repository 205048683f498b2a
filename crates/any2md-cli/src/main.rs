//! any2md command-line interface.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use any2md::{
    Config, DocumentRequest, OutputFormat, RawOptions, batch_convert, handle_batch_convert,
    registered_processors,
};

#[derive(Parser)]
#[command(name = "any2md")]
#[command(version, about = "Convert PDF, Word, and Excel documents to Markdown", long_about = None)]
struct Cli {
    /// Enable verbose logging (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more documents
    Convert {
        /// Input files (.pdf, .docx, .xlsx, .xls)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output representation
        #[arg(short, long, default_value = "markdown")]
        format: String,

        /// Directory for converted output (defaults to stdout for a single file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip image extraction
        #[arg(long)]
        no_images: bool,

        /// Keep repeated headers and footers
        #[arg(long)]
        keep_headers: bool,

        /// Split output into pages
        #[arg(long)]
        paginate: bool,

        /// Comma-separated sheet names to convert (Excel)
        #[arg(long, value_delimiter = ',')]
        sheets: Vec<String>,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the full response envelope as JSON
        #[arg(long)]
        json_envelope: bool,
    },
    /// List supported formats and their processors
    Formats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            files,
            format,
            output,
            no_images,
            keep_headers,
            paginate,
            sheets,
            config,
            json_envelope,
        } => {
            let config = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                None => Config::default(),
            }
            .apply_env();
            config.validate()?;

            OutputFormat::parse(&format)?;
            let options = RawOptions {
                output_format: Some(format),
                extract_images: if no_images { Some(false) } else { None },
                remove_header_footer: if keep_headers { Some(false) } else { None },
                paginate: if paginate { Some(true) } else { None },
                sheet_names: if sheets.is_empty() { None } else { Some(sheets) },
                ..RawOptions::default()
            };

            let documents = files
                .iter()
                .map(|path| document_request(path))
                .collect::<Result<Vec<_>>>()?;

            run_convert(documents, options, config, output, json_envelope).await
        }
        Commands::Formats => {
            for (name, extensions) in registered_processors() {
                println!("{:8} {}", name, extensions.join(", "));
            }
            Ok(())
        }
    }
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn document_request(path: &Path) -> Result<DocumentRequest> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("cannot access {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(DocumentRequest {
        file_content: format!("file://{}", absolute.display()),
        filename,
        options: None,
    })
}

async fn run_convert(
    documents: Vec<DocumentRequest>,
    options: RawOptions,
    config: Config,
    output: Option<PathBuf>,
    json_envelope: bool,
) -> Result<()> {
    let config = Arc::new(config);

    if json_envelope {
        let envelope = handle_batch_convert(documents, Some(options), config, None).await;
        match envelope {
            Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
            Err(error) => {
                println!("{}", serde_json::to_string_pretty(&error)?);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let single = documents.len() == 1;
    let outcome = batch_convert(documents, Some(options), config).await;

    if let Some(dir) = &output {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }

    let mut failed = 0usize;
    for item in outcome.items {
        match item.outcome {
            Ok(conversion) => {
                let (body, extension) = if let Some(json) = &conversion.json {
                    (serde_json::to_string_pretty(json)?, "json")
                } else if let Some(html) = conversion.html {
                    (html, "html")
                } else {
                    (conversion.markdown, "md")
                };

                match &output {
                    Some(dir) => {
                        let stem = Path::new(&item.filename)
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_else(|| item.filename.clone());
                        let target = dir.join(format!("{}.{}", stem, extension));
                        tokio::fs::write(&target, body)
                            .await
                            .with_context(|| format!("cannot write {}", target.display()))?;
                        eprintln!("{} -> {}", item.filename, target.display());
                    }
                    None if single => println!("{}", body),
                    None => {
                        println!("===== {} =====\n{}", item.filename, body);
                    }
                }
            }
            Err(error) => {
                failed += 1;
                eprintln!("error: {}: {}", item.filename, error);
            }
        }
    }

    if failed > 0 {
        bail!(
            "{} of {} documents failed to convert",
            failed,
            outcome.summary.total
        );
    }
    Ok(())
}
