//! Tests for DocumentService

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use routekit::application::services::DocumentService;
use routekit::application::ApplicationError;
use routekit::config::Settings;
use routekit::domain::schema;
use routekit::domain::DocumentShape;
use routekit::infrastructure::traits::RealFileSystem;
use routekit::util::testing;

fn service(settings: Settings) -> DocumentService {
    testing::init_test_setup();
    DocumentService::new(
        Arc::new(RealFileSystem),
        schema::global().expect("builtin catalog"),
        Arc::new(settings),
    )
}

fn write_flow(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write flow file");
    path
}

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources/flows")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

#[test]
fn given_canonical_file_when_formatting_then_unchanged() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, "timer-log.yaml", &fixture("timer-log.yaml"));
    let service = service(Settings::default());

    // Act
    let outcome = service.format(&path).unwrap();

    // Assert
    assert!(!outcome.changed);
    assert_eq!(outcome.text, fixture("timer-log.yaml"));
}

#[test]
fn given_shorthand_file_when_formatting_then_changed_and_file_untouched() {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, "shorthand.yaml", &fixture("shorthand.yaml"));
    let service = service(Settings::default());

    let outcome = service.format(&path).unwrap();

    assert!(outcome.changed);
    assert!(outcome.text.starts_with("- route:"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), fixture("shorthand.yaml"));
}

#[test]
fn given_loaded_document_when_saved_elsewhere_then_reloads_equal_text() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let source = write_flow(&temp, "orders.yaml", &fixture("orders-integration.yaml"));
    let target = temp.path().join("copy/orders.yaml");
    let service = service(Settings::default());

    // Act
    let doc = service.load(&source).unwrap();
    service.save(&target, &doc).unwrap();

    // Assert
    assert_eq!(doc.name, "orders.yaml");
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        fixture("orders-integration.yaml")
    );
}

#[test]
fn given_missing_file_when_loading_then_operation_failed_with_path() {
    let temp = TempDir::new().unwrap();
    let service = service(Settings::default());

    let err = service.load(&temp.path().join("absent.yaml")).unwrap_err();

    match err {
        ApplicationError::OperationFailed { context, .. } => {
            assert!(context.contains("absent.yaml"), "{context}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn given_file_with_problems_when_checking_then_findings_returned() {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, "secrets.yaml", &fixture("secrets.yaml"));
    let service = service(Settings::default());

    let findings = service.check(&path).unwrap();

    assert_eq!(findings.len(), 2);
}

#[test]
fn given_file_with_placeholders_when_listing_then_all_scopes_found() {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, "secrets.yaml", &fixture("secrets.yaml"));
    let service = service(Settings::default());

    let found = service.placeholders(&path).unwrap();

    assert_eq!(found.global.len(), 1);
    assert_eq!(found.route.len(), 1);
    assert_eq!(found.exchange.len(), 2);
}

#[test]
fn given_document_when_rendering_tree_then_step_names_and_ids_shown() {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, "timer-log.yaml", &fixture("timer-log.yaml"));
    let service = service(Settings::default());
    let doc = service.load(&path).unwrap();

    let rendered = service.render_tree(&doc).to_string();

    assert!(rendered.starts_with("timer-log.yaml (plain)"), "{rendered}");
    assert!(rendered.contains("route [ticker]"), "{rendered}");
    assert!(rendered.contains("route [audit]"), "{rendered}");
    assert!(rendered.contains("from ["), "{rendered}");
    assert!(rendered.contains("log ["), "{rendered}");
}

#[test]
fn given_crd_default_shape_when_creating_then_integration_written_with_file_stem() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("flows/new-orders.yaml");
    let mut settings = Settings::default();
    settings.codec.default_shape = DocumentShape::Crd;
    let service = service(settings);

    // Act
    let doc = service.create(&path, None, None).unwrap();

    // Assert
    assert_eq!(doc.shape, DocumentShape::Crd);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("kind: Integration"), "{text}");
    assert!(text.contains("name: new-orders"), "{text}");
}

#[test]
fn given_existing_file_when_creating_then_already_exists_and_untouched() {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, "timer-log.yaml", &fixture("timer-log.yaml"));
    let service = service(Settings::default());

    let err = service.create(&path, Some(DocumentShape::Plain), None).unwrap_err();

    assert!(matches!(err, ApplicationError::AlreadyExists(_)));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), fixture("timer-log.yaml"));
}

#[test]
fn given_plain_shape_when_creating_then_empty_list_written() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.yaml");
    let service = service(Settings::default());

    service.create(&path, Some(DocumentShape::Plain), Some("ignored")).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
}
