//! # CLI Command Implementations
//!
//! Documents are read and written here; `folio-core` itself never touches
//! the filesystem.

use super::{DocFormat, OutputMode};
use folio_core::formats::crypto_hash;
use folio_core::formats::persistence::has_magic;
use folio_core::mutations::book::DivideInstructions;
use folio_core::mutations::page::AddPage;
use folio_core::mutations::step::{AddStep, StepRef};
use folio_core::mutations::template_page::SetPageSize;
use folio_core::mutations::{BookMutations, PageMutations, StepMutations, TemplatePageMutations};
use folio_core::{
    DocumentMetrics, DocumentState, FolioError, SaveFile, Store, checksum, integrity,
    state_from_bytes, state_to_bytes,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum document file size (256 MB), either format.
const MAX_DOCUMENT_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FolioError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FolioError::IoError(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > max_size {
        return Err(FolioError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {max_size} bytes",
            metadata.len()
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, FolioError> {
    let canonical = path.canonicalize().map_err(|e| {
        FolioError::IoError(format!("Invalid file path '{}': {e}", path.display()))
    })?;

    if !canonical.is_file() {
        return Err(FolioError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonical parent directory joined with the original file name.
fn validate_output_path(path: &Path) -> Result<PathBuf, FolioError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        FolioError::IoError(format!(
            "Invalid output directory '{}': {e}",
            parent.display()
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(FolioError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| FolioError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// DOCUMENT I/O
// =============================================================================

/// Read a document, detecting the binary snapshot by its magic bytes.
///
/// Binary snapshots carry no model file name.
pub fn load_document(path: &Path) -> Result<(SaveFile, DocFormat), FolioError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_DOCUMENT_FILE_SIZE)?;

    let data = std::fs::read(&validated)
        .map_err(|e| FolioError::IoError(format!("Read file: {e}")))?;

    let loaded = if has_magic(&data) {
        (SaveFile::new(state_from_bytes(&data)?, None), DocFormat::Binary)
    } else {
        let text = String::from_utf8(data).map_err(|e| {
            FolioError::DeserializationError(format!("Save file is not UTF-8: {e}"))
        })?;
        (SaveFile::from_json(&text)?, DocFormat::Json)
    };
    debug!(
        path = %validated.display(),
        format = loaded.1.as_str(),
        items = loaded.0.state.total_count(),
        "loaded document"
    );
    Ok(loaded)
}

/// Encode `save` in `format`. JSON uses `indent` spaces per level.
pub fn encode_document(save: &SaveFile, format: DocFormat, indent: usize) -> Result<Vec<u8>, FolioError> {
    match format {
        DocFormat::Json => save.to_json(Some(indent)).map(String::into_bytes),
        DocFormat::Binary => state_to_bytes(&save.state),
    }
}

/// Write `save` to `path`, returning the number of bytes written.
pub fn save_document(path: &Path, save: &SaveFile, format: DocFormat, indent: usize) -> Result<usize, FolioError> {
    let validated = validate_output_path(path)?;
    let data = encode_document(save, format, indent)?;
    std::fs::write(&validated, &data)
        .map_err(|e| FolioError::IoError(format!("Write file: {e}")))?;
    debug!(path = %validated.display(), format = format.as_str(), bytes = data.len(), "saved document");
    Ok(data.len())
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

pub fn cmd_inspect(file: &Path, out: OutputMode) -> Result<(), FolioError> {
    let (save, format) = load_document(file)?;
    let metrics = DocumentMetrics::from_state(&save.state);

    if out.json {
        print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "format": format.as_str(),
            "version": save.version,
            "modelFilename": save.model_filename,
            "metrics": metrics,
        }));
        return Ok(());
    }

    println!("Folio Document");
    println!("==============");
    println!("File:      {}", file.display());
    println!("Format:    {}", format.as_str());
    println!("Version:   {}", save.version);
    if let Some(model) = &save.model_filename {
        println!("Model:     {model}");
    }
    println!();
    println!("Items:     {}", metrics.total_items);
    println!("Pages:     {} ({} basic)", metrics.pages, metrics.basic_pages);
    println!("Steps:     {} ({} top level)", metrics.steps, metrics.top_level_steps);
    println!("Parts:     {}", metrics.parts);
    println!("Books:     {}", metrics.books);
    println!("Max Depth: {}", metrics.max_depth);
    println!();
    println!("Per type:");
    for (name, count) in metrics.counts.iter().filter(|(_, c)| **c > 0) {
        println!("  {name:<16} {count}");
    }

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Audit a document. Returns the number of violations found.
pub fn cmd_check(file: &Path, out: OutputMode) -> Result<usize, FolioError> {
    let (save, _) = load_document(file)?;
    let violations = integrity::check(&save.state);
    let structural = violations.iter().filter(|v| v.is_structural()).count();

    if !violations.is_empty() {
        warn!(
            file = %file.display(),
            total = violations.len(),
            structural,
            "document has violations"
        );
    }

    if out.json {
        print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "ok": violations.is_empty(),
            "structural": structural,
            "violations": violations,
        }));
    } else if violations.is_empty() {
        println!("{}: OK", file.display());
    } else {
        println!("{}: {} violation(s)", file.display(), violations.len());
        for violation in &violations {
            println!("  - {violation}");
        }
    }

    Ok(violations.len())
}

// =============================================================================
// CONVERT COMMAND
// =============================================================================

pub fn cmd_convert(
    input: &Path,
    output: &Path,
    to: Option<DocFormat>,
    out: OutputMode,
) -> Result<(), FolioError> {
    let (save, from) = load_document(input)?;
    let to = to.unwrap_or(from.other());
    let bytes = save_document(output, &save, to, out.indent)?;
    info!(from = from.as_str(), to = to.as_str(), bytes, "converted document");

    if out.json {
        print_json(&serde_json::json!({
            "input": input.display().to_string(),
            "output": output.display().to_string(),
            "from": from.as_str(),
            "to": to.as_str(),
            "bytes": bytes,
        }));
    } else {
        println!(
            "Converted {} ({}) to {} ({}, {bytes} bytes)",
            input.display(),
            from.as_str(),
            output.display(),
            to.as_str()
        );
    }
    Ok(())
}

// =============================================================================
// RENUMBER COMMAND
// =============================================================================

/// Renumber pages, document-scoped steps, and every callout and sub-step
/// scope.
pub fn renumber_document(store: &mut Store) {
    PageMutations::renumber(store);
    StepMutations::renumber_all(store);

    let state = store.state();
    let nested: Vec<_> = state
        .callouts
        .iter()
        .filter_map(|c| c.steps.first().copied())
        .chain(state.steps.iter().filter_map(|s| s.steps.first().copied()))
        .collect();
    for step in nested {
        StepMutations::renumber(store, &StepRef { step });
    }
}

/// Items whose number differs between `before` and `after`.
fn changed_numbers(before: &DocumentState, after: &DocumentState) -> (usize, usize) {
    let pages = before
        .pages
        .iter()
        .zip(after.pages.iter())
        .filter(|(a, b)| a.number != b.number)
        .count();
    let steps = before
        .steps
        .iter()
        .zip(after.steps.iter())
        .filter(|(a, b)| a.number != b.number)
        .count();
    (pages, steps)
}

pub fn cmd_renumber(file: &Path, output: Option<&Path>, out: OutputMode) -> Result<(), FolioError> {
    let (save, format) = load_document(file)?;
    let before = save.state.clone();
    let mut store = Store::with_state(save.state);
    renumber_document(&mut store);

    let (pages, steps) = changed_numbers(&before, store.state());
    let target = output.unwrap_or(file);
    let save = SaveFile::new(store.into_state(), save.model_filename);
    save_document(target, &save, format, out.indent)?;
    info!(pages, steps, "renumbered document");

    if out.json {
        print_json(&serde_json::json!({
            "output": target.display().to_string(),
            "pagesChanged": pages,
            "stepsChanged": steps,
        }));
    } else {
        println!(
            "Renumbered {pages} page(s) and {steps} step(s), written to {}",
            target.display()
        );
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

pub fn cmd_hash(file: &Path, out: OutputMode) -> Result<(), FolioError> {
    let (save, _) = load_document(file)?;
    let sum = checksum(&save.state)?;
    let digest = crypto_hash(&save.state)?;

    if out.json {
        print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "checksum": format!("{sum:016x}"),
            "blake3": digest,
        }));
    } else {
        println!("Checksum: {sum:016x}");
        println!("BLAKE3:   {digest}");
    }
    Ok(())
}

// =============================================================================
// NEW COMMAND
// =============================================================================

/// Shape of a blank document.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub pages: usize,
    /// 0 keeps the document in one piece.
    pub pages_per_book: usize,
    pub page_width: f64,
    pub page_height: f64,
}

/// Build `opts.pages` pages holding one empty step each.
pub fn build_document(opts: &NewDocument) -> Result<Store, FolioError> {
    let mut store = Store::new();
    TemplatePageMutations::set_page_size(
        &mut store,
        &SetPageSize {
            width: opts.page_width,
            height: opts.page_height,
        },
    );
    for _ in 0..opts.pages {
        let page = PageMutations::add(&mut store, &AddPage::default())?;
        StepMutations::add(
            &mut store,
            &AddStep {
                renumber: true,
                ..AddStep::new(page)
            },
        )?;
    }
    if opts.pages_per_book > 0 && opts.pages > 0 {
        BookMutations::divide_instructions(
            &mut store,
            &DivideInstructions {
                pages_per_book: Some(opts.pages_per_book),
                ..DivideInstructions::default()
            },
        )?;
    }
    Ok(store)
}

pub fn cmd_new(
    output: &Path,
    opts: &NewDocument,
    format: DocFormat,
    force: bool,
    out: OutputMode,
) -> Result<(), FolioError> {
    if output.exists() && !force {
        return Err(FolioError::InvalidArgument(format!(
            "'{}' already exists. Use --force to overwrite.",
            output.display()
        )));
    }

    let store = build_document(opts)?;
    let books = store.state().books.len();
    let save = SaveFile::new(store.into_state(), None);
    let bytes = save_document(output, &save, format, out.indent)?;
    info!(pages = opts.pages, books, "created document");

    if out.json {
        print_json(&serde_json::json!({
            "output": output.display().to_string(),
            "format": format.as_str(),
            "pages": opts.pages,
            "books": books,
            "bytes": bytes,
        }));
    } else {
        println!(
            "Created {} with {} page(s) in {books} book(s) ({bytes} bytes)",
            output.display(),
            opts.pages
        );
    }
    Ok(())
}
