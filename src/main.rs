use clap::{Parser, Subcommand};
use image_ingest::config::{self, IngestConfig};
use image_ingest::imaging::format::content_type_for_extension;
use image_ingest::output;
use image_ingest::pipeline::{IngestError, IngestEvent, Pipeline};
use image_ingest::store::{ImageRecord, LocalStore};
use image_ingest::types::RawUpload;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Shared flags for commands that read upload files.
#[derive(clap::Args, Clone)]
struct InputArgs {
    /// Files or directories to read (directories are walked recursively)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Content type to declare for every file (default: guessed from the extension)
    #[arg(long)]
    content_type: Option<String>,
}

#[derive(Parser)]
#[command(name = "image-ingest")]
#[command(about = "Validate, normalize and store uploaded images")]
#[command(long_about = "\
Validate, normalize and store uploaded images

Every file goes through the same pass:

  validate   declared size and content type against the allow-list
  decode     webp → gif → png → signature dispatch
  decide     gif / svg uploads are kept as-is, webp is kept when small,
             everything else is converted to webp
  thumbnail  fit inside 300x300 (jpeg for kept uploads, webp otherwise)
  store      {upload_root}/{year}/{month}/{key} and .../thumbs/{key}

The declared content type is a hint; the stored format is whatever the bytes
decode as. Logging goes to stderr and is controlled with RUST_LOG.

Run 'image-ingest gen-config' to generate a documented ingest.toml.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); stock defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process files and write them to the upload root
    Ingest {
        #[command(flatten)]
        input: InputArgs,

        /// Print the stored records as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Validate and decode files without writing anything
    Check(InputArgs),
    /// Print a stock ingest.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Ingest { input, json } => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let paths = collect_paths(&input.paths)?;
            let failed = ingest(&config, &paths, input.content_type.as_deref(), json)?;
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Check(input) => {
            let config = config::load_config(cli.config.as_deref())?;
            let paths = collect_paths(&input.paths)?;
            let pipeline = Pipeline::new(config.pipeline_config());
            let mut failed = 0;
            for (index, path) in paths.iter().enumerate() {
                let upload = read_upload(path, input.content_type.as_deref())?;
                let lines = match pipeline.inspect(&upload) {
                    Ok((decoded, decision)) => {
                        output::format_check_ok(index, &upload.filename, &decoded, decision)
                    }
                    Err(e) => {
                        failed += 1;
                        output::format_check_error(index, &upload.filename, &e.to_string())
                    }
                };
                for line in lines {
                    println!("{}", line);
                }
            }
            println!();
            println!(
                "{}",
                output::format_summary("Checked", paths.len() - failed, failed)
            );
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Run every upload through the pipeline and into the store.
///
/// Files are read and processed in batches of `upload.max_files`, so only
/// one batch is held in memory at a time. Returns the number of files that
/// failed.
fn ingest(
    config: &IngestConfig,
    paths: &[PathBuf],
    content_type: Option<&str>,
    json: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(config.pipeline_config());
    let store = LocalStore::from_config(&config.storage);
    let batch_size = pipeline.config().max_files;

    let mut records: Vec<ImageRecord> = Vec::new();
    let mut failed = 0;

    for (batch_no, chunk) in paths.chunks(batch_size).enumerate() {
        let offset = batch_no * batch_size;
        let batch = chunk
            .iter()
            .map(|path| read_upload(path, content_type))
            .collect::<Result<Vec<_>, _>>()?;
        let (tx, rx) = std::sync::mpsc::channel();
        let printer = std::thread::spawn(move || {
            for event in rx {
                for line in output::format_ingest_event(&with_offset(event, offset)) {
                    println!("{}", line);
                }
            }
        });
        let events = if json { None } else { Some(tx) };

        let outcomes = pipeline.process_batch_with(&batch, events, |pipeline, processed| {
            store
                .persist(&processed, pipeline.keys())
                .map_err(IngestError::from)
        })?;
        printer
            .join()
            .map_err(|_| "output thread panicked")?;

        for outcome in outcomes {
            match outcome.result {
                Ok(record) => records.push(record),
                Err(_) => failed += 1,
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!();
        for record in &records {
            println!("{}", record.original_filename);
            for line in output::format_record(record) {
                println!("{}", line);
            }
        }
        println!(
            "{}",
            output::format_summary("Ingested", records.len(), failed)
        );
    }

    Ok(failed)
}

/// Shift a batch-local event index to its position in the whole run.
fn with_offset(event: IngestEvent, offset: usize) -> IngestEvent {
    match event {
        IngestEvent::Started { index, filename } => IngestEvent::Started {
            index: index + offset,
            filename,
        },
        IngestEvent::Processed {
            index,
            filename,
            decision,
            relative_path,
        } => IngestEvent::Processed {
            index: index + offset,
            filename,
            decision,
            relative_path,
        },
        IngestEvent::Failed {
            index,
            filename,
            error,
        } => IngestEvent::Failed {
            index: index + offset,
            filename,
            error,
        },
    }
}

/// Expand the command-line paths into the list of files to process.
///
/// Directories contribute only files with a recognized image extension, in
/// file name order; files named explicitly are always included. Nothing is
/// read here.
fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for path in inputs {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && guess_content_type(entry.path()).is_some() {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Read one file as an upload. `content_type` overrides the extension guess.
fn read_upload(
    path: &Path,
    content_type: Option<&str>,
) -> Result<RawUpload, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let content_type = content_type
        .or_else(|| guess_content_type(path))
        .unwrap_or_default();
    Ok(RawUpload::new(
        bytes,
        content_type,
        path.display().to_string(),
    ))
}

fn guess_content_type(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(content_type_for_extension)
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `info` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn collect_paths_filters_and_sorts_directories() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.png"), b"b").unwrap();
        fs::write(tmp.path().join("a.jpg"), b"a").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"n").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/c.webp"), b"c").unwrap();

        let paths = collect_paths(&[tmp.path().to_path_buf()]).unwrap();

        let names: Vec<String> = paths
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "nested/c.webp"]);
    }

    #[test]
    fn explicit_files_are_kept_whatever_their_extension() {
        let file = PathBuf::from("/no/such/notes.txt");
        let paths = collect_paths(std::slice::from_ref(&file)).unwrap();
        assert_eq!(paths, vec![file]);
    }

    #[test]
    fn read_upload_guesses_content_type() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.png");
        fs::write(&path, b"bytes").unwrap();

        let upload = read_upload(&path, None).unwrap();
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.bytes, b"bytes");
        assert_eq!(upload.filename, path.display().to_string());

        let upload = read_upload(&path, Some("image/webp")).unwrap();
        assert_eq!(upload.content_type, "image/webp");
    }

    #[test]
    fn read_upload_names_the_missing_file() {
        let err = read_upload(Path::new("/no/such/photo.png"), None).unwrap_err();
        assert!(err.to_string().contains("/no/such/photo.png"));
    }
}
