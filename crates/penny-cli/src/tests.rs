//! CLI command tests against a temp database

use std::fs;

use tempfile::tempdir;

use crate::commands;

#[test]
fn test_init_and_status() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("penny.db");

    commands::cmd_init(&db_path).unwrap();
    assert!(db_path.exists());
    commands::cmd_status(&db_path).unwrap();
}

#[test]
fn test_ingest_from_json_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("penny.db");
    let config_path = dir.path().join("penny.toml");
    commands::cmd_init(&db_path).unwrap();

    let doc_path = dir.path().join("invoice.json");
    fs::write(
        &doc_path,
        r#"{
            "document_type": "invoice",
            "vendor_name": "Home Depot Inc.",
            "invoice_date": "2025-06-12",
            "total_amount": 45.0,
            "line_items": [
                {
                    "description": "2x4 stud",
                    "quantity": 10.0,
                    "unit_price": 4.5,
                    "line_total": 45.0
                }
            ]
        }"#,
    )
    .unwrap();

    commands::cmd_ingest(&db_path, &config_path, &doc_path).unwrap();

    let db = commands::open_db(&db_path).unwrap();
    assert_eq!(db.list_documents(10).unwrap().len(), 1);
    assert_eq!(db.list_recent_jobs(10).unwrap().len(), 1);

    // Re-ingesting the same file is a no-op
    commands::cmd_ingest(&db_path, &config_path, &doc_path).unwrap();
    assert_eq!(db.list_documents(10).unwrap().len(), 1);
}

#[test]
fn test_ingest_rejects_invalid_totals() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("penny.db");
    let config_path = dir.path().join("penny.toml");
    commands::cmd_init(&db_path).unwrap();

    let doc_path = dir.path().join("bad.json");
    fs::write(
        &doc_path,
        r#"{
            "document_type": "invoice",
            "vendor_name": "Home Depot Inc.",
            "line_items": [
                {
                    "description": "2x4 stud",
                    "quantity": 10.0,
                    "unit_price": 4.5,
                    "line_total": 46.0
                }
            ]
        }"#,
    )
    .unwrap();

    assert!(commands::cmd_ingest(&db_path, &config_path, &doc_path).is_err());

    let db = commands::open_db(&db_path).unwrap();
    assert!(db.list_documents(10).unwrap().is_empty());
}

#[test]
fn test_rules_and_budgets_roundtrip() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("penny.db");
    commands::cmd_init(&db_path).unwrap();

    commands::cmd_rules_add(
        &db_path,
        "home depot lumber",
        Some("Home Depot"),
        Some("stud|lumber"),
        "materials_lumber",
        None,
        None,
        5,
        0.9,
    )
    .unwrap();
    commands::cmd_rules_list(&db_path).unwrap();
    commands::cmd_categorize(&db_path, "2x4 stud", 45.0, "Home Depot Inc.").unwrap();

    commands::cmd_projects_add(&db_path, "Kitchen", "kitchen_remodel", Some(15000.0)).unwrap();
    let db = commands::open_db(&db_path).unwrap();
    let project = db.get_project_by_name("Kitchen").unwrap().unwrap();

    commands::cmd_budgets_set(&db_path, project.id, Some("labor_contractor"), 5000.0, 80.0)
        .unwrap();
    commands::cmd_budgets_list(&db_path).unwrap();

    assert!(commands::cmd_budgets_set(&db_path, 999, None, 100.0, 80.0).is_err());
    assert!(commands::cmd_rules_add(
        &db_path,
        "bad category",
        Some("X"),
        None,
        "not_a_category",
        None,
        None,
        0,
        0.8,
    )
    .is_err());
}

#[test]
fn test_query_command() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("penny.db");
    commands::cmd_init(&db_path).unwrap();

    // Unrecognized question still succeeds with a clarification
    commands::cmd_query(&db_path, "tell me a joke").unwrap();
    // Plain search over an empty database
    commands::cmd_query(&db_path, "show my expenses").unwrap();

    let db = commands::open_db(&db_path).unwrap();
    assert_eq!(db.list_query_log(10).unwrap().len(), 2);
}
