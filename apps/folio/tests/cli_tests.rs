//! Command tests against real files in temporary directories.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use folio::cli::{
    Cli, Commands, DocFormat, NewDocument, OutputMode, build_document, cmd_check, cmd_convert,
    cmd_hash, cmd_inspect, cmd_new, cmd_renumber, execute, load_document, save_document,
};
use folio::config::Config;
use folio_core::{FolioError, ItemId, ItemType, LookupKey, SaveFile};
use std::process::ExitCode;
use tempfile::TempDir;

const TEXT: OutputMode = OutputMode {
    json: false,
    indent: 2,
};

fn blank(pages: usize) -> NewDocument {
    NewDocument {
        pages,
        pages_per_book: 0,
        page_width: 900.0,
        page_height: 700.0,
    }
}

// =============================================================================
// NEW
// =============================================================================

#[test]
fn test_new_creates_loadable_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.json");

    cmd_new(&path, &blank(3), DocFormat::Json, false, TEXT).unwrap();

    let (save, format) = load_document(&path).unwrap();
    assert_eq!(format, DocFormat::Json);
    assert_eq!(save.state.pages.len(), 3);
    assert_eq!(save.state.steps.len(), 3);
    assert!(folio_core::check(&save.state).is_empty());
}

#[test]
fn test_new_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.json");
    std::fs::write(&path, "keep me").unwrap();

    let result = cmd_new(&path, &blank(1), DocFormat::Json, false, TEXT);
    assert!(matches!(result, Err(FolioError::InvalidArgument(_))));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");

    cmd_new(&path, &blank(1), DocFormat::Binary, true, TEXT).unwrap();
    assert_eq!(load_document(&path).unwrap().1, DocFormat::Binary);
}

#[test]
fn test_build_document_applies_page_size_and_books() {
    let store = build_document(&NewDocument {
        pages: 5,
        pages_per_book: 2,
        page_width: 1200.0,
        page_height: 800.0,
    })
    .unwrap();

    let state = store.state();
    assert_eq!(state.template.page.width, 1200.0);
    assert_eq!(state.template.page.height, 800.0);
    assert_eq!(state.books.len(), 3);
    let pages_in_books: usize = state.books.iter().map(|b| b.pages.len()).sum();
    assert_eq!(pages_in_books, 5);
}

#[test]
fn test_build_empty_document_has_no_books() {
    let store = build_document(&NewDocument {
        pages_per_book: 4,
        ..blank(0)
    })
    .unwrap();
    assert!(store.state().pages.is_empty());
    assert!(store.state().books.is_empty());
}

// =============================================================================
// LOAD / CONVERT
// =============================================================================

#[test]
fn test_convert_flips_format_by_default() {
    let dir = TempDir::new().unwrap();
    let json = dir.path().join("book.json");
    let binary = dir.path().join("book.folio");
    let back = dir.path().join("back.json");

    cmd_new(&json, &blank(4), DocFormat::Json, false, TEXT).unwrap();
    cmd_convert(&json, &binary, None, TEXT).unwrap();
    cmd_convert(&binary, &back, None, TEXT).unwrap();

    let (original, _) = load_document(&json).unwrap();
    let (snapshot, format) = load_document(&binary).unwrap();
    assert_eq!(format, DocFormat::Binary);
    assert_eq!(snapshot.state, original.state);

    let (restored, format) = load_document(&back).unwrap();
    assert_eq!(format, DocFormat::Json);
    assert_eq!(restored.state, original.state);
}

#[test]
fn test_convert_honours_explicit_target() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.json");
    let output = dir.path().join("out.json");

    cmd_new(&input, &blank(1), DocFormat::Json, false, TEXT).unwrap();
    cmd_convert(
        &input,
        &output,
        Some(DocFormat::Json),
        OutputMode {
            json: true,
            indent: 4,
        },
    )
    .unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("\n    \"version\""));
}

#[test]
fn test_load_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.json");
    std::fs::write(&path, "not a document").unwrap();

    let result = load_document(&path);
    assert!(matches!(result, Err(FolioError::DeserializationError(_))));
}

#[test]
fn test_load_rejects_directories_and_missing_files() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(load_document(dir.path()), Err(FolioError::IoError(_))));
    assert!(matches!(
        load_document(&dir.path().join("missing.json")),
        Err(FolioError::IoError(_))
    ));
}

#[test]
fn test_load_upgrades_legacy_save_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.json");
    std::fs::write(
        &path,
        r#"{"version": "0.40.0", "modelFilename": "house.ldr", "state": {}}"#,
    )
    .unwrap();

    let (save, _) = load_document(&path).unwrap();
    assert_eq!(save.version, folio_core::compat::CURRENT_VERSION);
    assert_eq!(save.model_filename.as_deref(), Some("house.ldr"));
    assert_eq!(save.state.filename.as_deref(), Some("house"));
}

// =============================================================================
// CHECK / RENUMBER / HASH / INSPECT
// =============================================================================

#[test]
fn test_check_counts_violations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.json");
    cmd_new(&path, &blank(2), DocFormat::Json, false, TEXT).unwrap();
    assert_eq!(cmd_check(&path, TEXT).unwrap(), 0);

    let (mut save, format) = load_document(&path).unwrap();
    if let Some(step) = save.state.steps.get_mut(ItemId(0)) {
        step.parent = Some(LookupKey::new(ItemType::Page, ItemId(40)));
    }
    save_document(&path, &save, format, 2).unwrap();

    assert!(cmd_check(&path, TEXT).unwrap() > 0);
}

#[test]
fn test_renumber_closes_gaps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.json");
    let fixed = dir.path().join("fixed.json");

    let mut state = build_document(&blank(3)).unwrap().into_state();
    for (page, number) in state.pages.iter_mut().zip([7, 3, 12]) {
        page.number = number;
    }
    for step in state.steps.iter_mut() {
        step.number = 99;
    }
    save_document(&path, &SaveFile::new(state, None), DocFormat::Json, 2).unwrap();

    cmd_renumber(&path, Some(&fixed), TEXT).unwrap();

    let (save, _) = load_document(&fixed).unwrap();
    let pages: Vec<i64> = save.state.pages.iter().map(|p| p.number).collect();
    let steps: Vec<i64> = save.state.steps.iter().map(|s| s.number).collect();
    assert_eq!(pages, vec![0, 1, 2]);
    assert_eq!(steps, vec![0, 1, 2]);

    // Source left alone when an output path is given.
    let (original, _) = load_document(&path).unwrap();
    assert_eq!(original.state.pages.iter().map(|p| p.number).collect::<Vec<_>>(), vec![7, 3, 12]);
}

#[test]
fn test_hash_and_inspect_succeed_on_both_formats() {
    let dir = TempDir::new().unwrap();
    let json = dir.path().join("book.json");
    let binary = dir.path().join("book.folio");
    cmd_new(&json, &blank(2), DocFormat::Json, false, TEXT).unwrap();
    cmd_convert(&json, &binary, None, TEXT).unwrap();

    for path in [&json, &binary] {
        cmd_hash(path, TEXT).unwrap();
        cmd_inspect(path, TEXT).unwrap();
        cmd_inspect(path, OutputMode { json: true, indent: 2 }).unwrap();
    }
}

// =============================================================================
// ARGUMENT PARSING / EXECUTE
// =============================================================================

#[test]
fn test_parse_convert_arguments() {
    let cli = Cli::try_parse_from(["folio", "--json", "convert", "a.json", "b.folio", "--to", "binary"])
        .unwrap();
    assert!(cli.json_mode);
    match cli.command {
        Commands::Convert { to, .. } => assert_eq!(to, Some(DocFormat::Binary)),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_rejects_unknown_format() {
    let result = Cli::try_parse_from(["folio", "new", "x.json", "--to", "xml"]);
    assert!(result.is_err());
}

#[test]
fn test_execute_new_uses_config_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.json");
    let config = Config::from_toml_str("[document]\npage_width = 640\npages_per_book = 1").unwrap();

    let cli = Cli::try_parse_from([
        "folio",
        "new",
        path.to_str().unwrap(),
        "--steps",
        "2",
    ])
    .unwrap();
    assert_eq!(execute(cli, &config).unwrap(), ExitCode::SUCCESS);

    let (save, _) = load_document(&path).unwrap();
    assert_eq!(save.state.template.page.width, 640.0);
    assert_eq!(save.state.books.len(), 2);
}

#[test]
fn test_execute_check_reports_through_exit_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.json");
    cmd_new(&path, &blank(1), DocFormat::Json, false, TEXT).unwrap();

    let (mut save, format) = load_document(&path).unwrap();
    if let Some(page) = save.state.pages.get_mut(ItemId(0)) {
        page.steps.push(ItemId(77));
    }
    save_document(&path, &save, format, 2).unwrap();

    let cli = Cli::try_parse_from(["folio", "check", path.to_str().unwrap()]).unwrap();
    assert_eq!(execute(cli, &Config::default()).unwrap(), ExitCode::from(2));
}
