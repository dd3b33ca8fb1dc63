// src/main.rs
mod classifier;
mod discovery;
mod document;
mod pdf;
mod report;
mod storage;
mod utils;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use classifier::{ClassifierConfig, HeadingClassifier, OnnxEmbedder, Schema, Translations};
use document::{Document, DocumentAccumulator};
use report::{validate_document, MasterSummary, ValidationEntry, ValidationStatus};
use storage::StorageManager;
use utils::AppError;

/// Command Line Interface for the manual normalizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize every PDF manual under the input root into JSON artifacts
    Process(ProcessArgs),
    /// Re-check emitted JSON artifacts for empty schema sections
    Validate(ValidateArgs),
    /// Mine the corpus for heading keywords the schema does not cover yet
    Discover(DiscoverArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Input directory, scanned recursively for *.pdf files
    #[arg(short, long, default_value = "./data_input")]
    input: PathBuf,

    /// Output directory for JSON artifacts and batch reports
    #[arg(short, long, default_value = "./data_output")]
    output: PathBuf,

    /// Directory holding model.onnx and tokenizer.json
    #[arg(long, default_value = "./models")]
    models_dir: PathBuf,

    /// Schema JSON file (ordered array of section rules); built-in catalog if omitted
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Similarity cutoff for the heading decision
    #[arg(long, default_value_t = 0.50)]
    threshold: f32,

    /// Blocks at or above this many chars are never headings
    #[arg(long, default_value_t = 60)]
    heading_cap: usize,

    /// Maximum number of PDFs to process in one run
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Save raw per-page extractor text under <output>/debug/
    #[arg(short, long)]
    debug: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Output directory holding previously emitted JSON artifacts
    #[arg(short, long, default_value = "./data_output")]
    output: PathBuf,

    /// Schema JSON file; built-in catalog if omitted
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    /// Input directory, scanned recursively for *.pdf files
    #[arg(short, long, default_value = "./data_input")]
    input: PathBuf,

    /// Schema JSON file; built-in catalog if omitted
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Number of front pages to scan per document
    #[arg(long, default_value_t = 10)]
    pages: usize,

    /// Number of top candidates to report
    #[arg(long, default_value_t = 50)]
    top: usize,
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let cli = Cli::parse();

    match cli.command {
        Command::Process(args) => run_process(args),
        Command::Validate(args) => run_validate(args),
        Command::Discover(args) => run_discover(args),
    }
}

fn load_schema(path: Option<&Path>) -> Result<Schema, AppError> {
    match path {
        Some(path) => {
            tracing::info!("Loading schema from {}", path.display());
            Ok(Schema::from_json_file(path)?)
        }
        None => Ok(Schema::builtin()),
    }
}

fn run_process(args: ProcessArgs) -> Result<(), AppError> {
    tracing::info!("Starting batch processing for args: {:?}", args);

    if !(0.0..=1.0).contains(&args.threshold) {
        return Err(AppError::Config(format!(
            "Threshold must be within [0, 1], got {}",
            args.threshold
        )));
    }
    if args.heading_cap == 0 {
        return Err(AppError::Config(
            "Heading length cap must be positive".to_string(),
        ));
    }

    // 3. Schema, translations and output storage
    let schema = load_schema(args.schema.as_deref())?;
    let translations = Translations::builtin();
    let storage = StorageManager::new(&args.output)?;

    // 4. Embedding model and classifier; label embeddings are computed once
    //    here and reused for every document.
    let embedder = OnnxEmbedder::new(&args.models_dir)?;
    let config = ClassifierConfig {
        threshold: args.threshold,
        heading_max_len: args.heading_cap,
    };
    let classifier = HeadingClassifier::new(schema.clone(), Box::new(embedder), config)?;

    // 5. Find input documents
    let mut pdf_files = pdf::find_pdf_files(&args.input);
    if pdf_files.is_empty() {
        return Err(AppError::Config(format!(
            "No PDF files found under {}",
            args.input.display()
        )));
    }
    pdf_files.truncate(args.limit);
    tracing::info!("Found {} PDF files to process", pdf_files.len());

    // 6. Process each document sequentially
    let mut master_summary = MasterSummary::new(&schema);
    let mut validation_entries: Vec<ValidationEntry> = Vec::new();
    let mut success_count = 0;
    let mut failure_count = 0;

    for (position, pdf_path) in pdf_files.iter().enumerate() {
        tracing::info!(
            "[{}/{}] Processing: {}",
            position + 1,
            pdf_files.len(),
            pdf_path.display()
        );

        let relative_path = pdf_path
            .strip_prefix(&args.input)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(pdf_path.file_name().unwrap_or_default()));

        match process_document(
            &classifier,
            &translations,
            &storage,
            pdf_path,
            &relative_path,
            args.debug,
        ) {
            Ok(document) => {
                master_summary.record(&document.metadata.file_name, &document);

                let artifact = relative_path.with_extension("json");
                validation_entries.push(validate_document(
                    &artifact.display().to_string(),
                    &document,
                    &schema,
                    &translations,
                ));

                match storage.save_document(&document, &relative_path) {
                    Ok(_) => success_count += 1,
                    Err(e) => {
                        tracing::error!("Failed to save {}: {}", relative_path.display(), e);
                        failure_count += 1;
                    }
                }
            }
            Err(e) => {
                // Per-document failures never abort the batch.
                tracing::error!("Failed to process {}: {}", pdf_path.display(), e);
                failure_count += 1;
            }
        }
    }

    // 7. Batch reports
    storage.save_master_summary(&master_summary)?;
    storage.save_validation_report(&validation_entries)?;

    tracing::info!(
        "Processing finished. Success: {}, Failures: {}",
        success_count,
        failure_count
    );

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to normalize any of the {} documents",
            failure_count
        )));
    }

    Ok(())
}

/// Runs the classify/accumulate loop over one PDF. Extraction and embedding
/// errors abort this document only; the caller decides what that means for
/// the batch.
fn process_document(
    classifier: &HeadingClassifier,
    translations: &Translations,
    storage: &StorageManager,
    pdf_path: &Path,
    relative_path: &Path,
    debug: bool,
) -> Result<Document, AppError> {
    let pages = pdf::extract_pages(pdf_path)?;
    let language = pdf::detect_language(&pages);
    let file_name = pdf_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf_path.display().to_string());

    tracing::info!(
        "Extracted {} pages from {} (language: {})",
        pages.len(),
        file_name,
        language
    );

    let mut accumulator = DocumentAccumulator::new(&file_name, language, translations);

    for (index, page) in pages.iter().enumerate() {
        let page_number = index + 1;

        if debug {
            if let Err(e) = storage.save_debug_page_text(relative_path, page_number, page) {
                tracing::warn!("Failed to save debug text for page {}: {}", page_number, e);
            }
        }

        for block in pdf::page_blocks(page) {
            let result = classifier.classify(block)?;
            if classifier.is_heading(block, &result) {
                if let Some(section_id) = &result.section_id {
                    tracing::info!(
                        "[AUDIT] page {}: '{}' -> '{}' ({:?}, score {:.2})",
                        page_number,
                        block,
                        translations.display_name(section_id, language),
                        result.matched_by,
                        result.confidence
                    );
                    accumulator.start_section(section_id, block, page_number);
                }
            } else {
                accumulator.push_content(block);
            }
        }
    }

    Ok(accumulator.finish())
}

fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let schema = load_schema(args.schema.as_deref())?;
    let translations = Translations::builtin();
    let storage = StorageManager::new(&args.output)?;

    let documents = storage.load_documents()?;
    if documents.is_empty() {
        return Err(AppError::Config(format!(
            "No document artifacts found under {}",
            args.output.display()
        )));
    }

    let entries: Vec<ValidationEntry> = documents
        .iter()
        .map(|(relative, document)| {
            validate_document(
                &relative.display().to_string(),
                document,
                &schema,
                &translations,
            )
        })
        .collect();

    let incomplete: Vec<&ValidationEntry> = entries
        .iter()
        .filter(|entry| entry.status == ValidationStatus::Incomplete)
        .collect();

    let report_path = storage.save_validation_report(&entries)?;

    println!("========================================");
    println!("VALIDATION RESULTS");
    println!("========================================");
    println!("Files checked : {}", entries.len());
    println!("Complete      : {}", entries.len() - incomplete.len());
    println!("Incomplete    : {}", incomplete.len());
    println!("Report        : {}", report_path.display());
    if !incomplete.is_empty() {
        println!("\nFiles to review first:");
        for entry in incomplete.iter().take(5) {
            println!("- {} (missing {} sections)", entry.file, entry.missing.len());
        }
    }

    Ok(())
}

fn run_discover(args: DiscoverArgs) -> Result<(), AppError> {
    let schema = load_schema(args.schema.as_deref())?;
    let candidates = discovery::discover_keywords(&args.input, &schema, args.pages, args.top)?;

    println!("==================================================");
    println!("TOP {} KEYWORD CANDIDATES (not in schema yet)", args.top);
    println!("==================================================");
    println!("{:<40} | DOCUMENTS", "TEXT");
    println!("{}", "-".repeat(50));
    for candidate in &candidates {
        println!("{:<40} | {}", candidate.text, candidate.document_count);
    }

    Ok(())
}
