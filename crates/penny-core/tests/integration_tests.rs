//! Integration tests for penny-core
//!
//! These tests exercise the full ingest -> categorize -> feedback -> query
//! -> alert workflow the way an API layer would drive it.

use chrono::NaiveDate;

use penny_core::{
    db::Database,
    models::{DocumentType, NewFinancialDocument, NewLineItem, NewRule, PaymentStatus, ProjectType},
    AlertState, DocumentIngestor, EngineConfig, ExpenseCategory, FeedbackDecision, FeedbackLoop,
    JobState, JobTracker, QueryIntent, QueryPipeline, QueryResult,
};

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
}

fn line(description: &str, quantity: f64, unit_price: f64) -> NewLineItem {
    NewLineItem {
        description: description.to_string(),
        quantity,
        unit_price,
        line_total: quantity * unit_price,
        category: None,
        subcategory: None,
        tax_rate: None,
        tax_amount: None,
        project_id: None,
    }
}

fn invoice(
    vendor: &str,
    invoice_number: &str,
    date: NaiveDate,
    project_id: Option<i64>,
    line_items: Vec<NewLineItem>,
) -> NewFinancialDocument {
    let total: f64 = line_items.iter().map(|i| i.line_total).sum();
    NewFinancialDocument {
        document_type: DocumentType::Invoice,
        vendor_name: vendor.to_string(),
        invoice_number: Some(invoice_number.to_string()),
        invoice_date: Some(date),
        subtotal: Some(total),
        total_tax: None,
        total_amount: Some(total),
        currency: "USD".to_string(),
        project_id,
        payment_status: PaymentStatus::Pending,
        line_items,
    }
}

fn lumber_rule() -> NewRule {
    NewRule {
        name: "home depot lumber".to_string(),
        vendor_patterns: vec!["Home Depot".to_string()],
        description_patterns: vec!["stud|lumber|plywood".to_string()],
        amount_min: None,
        amount_max: None,
        category: ExpenseCategory::MaterialsLumber,
        subcategory: None,
        project_id: None,
        priority: 5,
        confidence_threshold: 0.9,
    }
}

#[test]
fn test_ingest_categorize_accept_workflow() {
    let db = Database::in_memory().unwrap();
    let config = EngineConfig::default();
    db.create_rule(&lumber_rule()).unwrap();

    let ingestor = DocumentIngestor::new(&db, &config);
    let outcome = ingestor
        .ingest(
            &invoice(
                "Home Depot Inc.",
                "INV-100",
                NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
                None,
                vec![line("2x4 stud", 10.0, 4.5), line("shop towels", 2.0, 6.0)],
            ),
            "inv-100.pdf",
        )
        .unwrap();

    assert!(outcome.job.completed);
    assert_eq!(outcome.suggestions.len(), 2);

    // The stud matched the rule on vendor and description: confidence at
    // the rule threshold, auto-finalized above the acceptance threshold
    let stud = &outcome.suggestions[0];
    assert_eq!(stud.category, ExpenseCategory::MaterialsLumber);
    assert!(stud.confidence >= 0.9);
    let item = db.get_line_item(stud.line_item_id).unwrap().unwrap();
    assert_eq!(item.category, Some(ExpenseCategory::MaterialsLumber));

    // The towels matched on vendor only: scaled-down confidence, pending
    let towels = &outcome.suggestions[1];
    assert!(towels.confidence < 0.9);
    assert!(db
        .get_line_item(towels.line_item_id)
        .unwrap()
        .unwrap()
        .category
        .is_none());

    // Explicit acceptance finalizes the pending one and credits the rule
    let feedback = FeedbackLoop::new(&db, &config);
    feedback
        .submit(towels.id, FeedbackDecision::Accept, None)
        .unwrap();
    assert!(db
        .get_line_item(towels.line_item_id)
        .unwrap()
        .unwrap()
        .category
        .is_some());

    let rules = db.list_rules(true).unwrap();
    assert_eq!(rules[0].usage_count, 1);
}

#[test]
fn test_end_to_end_query_over_ingested_data() {
    let db = Database::in_memory().unwrap();
    let config = EngineConfig::default();
    let ingestor = DocumentIngestor::new(&db, &config);

    let mut paint = line("interior paint 5gal", 1.0, 200.30);
    paint.category = Some(ExpenseCategory::PaintInterior);
    ingestor
        .ingest(
            &invoice(
                "Sherwin-Williams",
                "R-1",
                NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
                None,
                vec![paint],
            ),
            "r1.pdf",
        )
        .unwrap();

    let mut supplies = line("paint roller kit", 1.0, 45.0);
    supplies.category = Some(ExpenseCategory::PaintSupplies);
    ingestor
        .ingest(
            &invoice(
                "Home Depot",
                "R-2",
                NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
                None,
                vec![supplies],
            ),
            "r2.pdf",
        )
        .unwrap();

    let outcome = QueryPipeline::new(&db)
        .run("How much did I spend on paint this summer?", reference_date())
        .unwrap();

    assert_eq!(outcome.intent, QueryIntent::CategoryAnalysis);
    match outcome.result {
        QueryResult::CategoryAnalysis {
            total_spent, count, ..
        } => {
            assert!((total_spent - 245.30).abs() < 0.001);
            assert_eq!(count, 2);
        }
        ref other => panic!("unexpected result {:?}", other),
    }

    // Query execution is side-effect free beyond the log: same result twice
    let again = QueryPipeline::new(&db)
        .run("How much did I spend on paint this summer?", reference_date())
        .unwrap();
    assert_eq!(again.data_points, outcome.data_points);
    assert_eq!(db.list_query_log(10).unwrap().len(), 2);
}

#[test]
fn test_budget_lifecycle_through_ingestion() {
    let db = Database::in_memory().unwrap();
    let config = EngineConfig::default();
    let project_id = db
        .create_project("Master Bath Remodel", ProjectType::BathroomRemodel, Some(15000.0))
        .unwrap();
    let ingestor = DocumentIngestor::new(&db, &config);

    // 12500 of 15000 = 83.3%: warning
    let outcome = ingestor
        .ingest(
            &invoice(
                "Contractor Co",
                "INV-1",
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                Some(project_id),
                vec![line("demo and framing", 1.0, 12500.0)],
            ),
            "inv1.pdf",
        )
        .unwrap();
    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].state, AlertState::Warning);
    assert!((outcome.alerts[0].percentage_used - 83.33).abs() < 0.01);

    // Spend to 15200: exceeded
    let outcome = ingestor
        .ingest(
            &invoice(
                "Contractor Co",
                "INV-2",
                NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                Some(project_id),
                vec![line("tile work", 1.0, 2700.0)],
            ),
            "inv2.pdf",
        )
        .unwrap();
    assert_eq!(outcome.alerts[0].state, AlertState::Exceeded);
    assert!(outcome.alerts[0].severity.priority() >= 3);

    // Acknowledge, then deleting a document reverts state and clears it
    let alert = db.acknowledge_budget_alert(outcome.alerts[0].id).unwrap();
    assert!(alert.is_acknowledged);

    let alerts = ingestor.delete_document(outcome.document_id).unwrap();
    assert_eq!(alerts[0].state, AlertState::Warning);
    assert!(alerts[0].is_acknowledged);

    let doc = db.list_documents(10).unwrap().remove(0);
    let alerts = ingestor.delete_document(doc.id).unwrap();
    assert_eq!(alerts[0].state, AlertState::Dormant);
    assert!(!alerts[0].is_acknowledged);
}

#[test]
fn test_job_snapshots_poll_to_completion() {
    let db = Database::in_memory().unwrap();
    let tracker = JobTracker::new(&db);

    let job = tracker.create("upload-7.pdf").unwrap();
    let first = tracker.snapshot(job.id).unwrap();
    assert_eq!(first.status, JobState::Pending);
    assert!(!first.completed);

    tracker
        .advance(job.id, JobState::Validating, "Validating document", 10.0)
        .unwrap();
    tracker
        .advance(job.id, JobState::Extracting, "Storing line items", 30.0)
        .unwrap();

    let mid = tracker.snapshot(job.id).unwrap();
    assert!(mid.progress >= first.progress);

    tracker
        .advance(job.id, JobState::Completed, "Processing completed", 100.0)
        .unwrap();
    let done = tracker.snapshot(job.id).unwrap();
    assert!(done.completed);
    assert_eq!(done.progress, 100.0);
}

#[test]
fn test_similarity_learns_from_feedback_history() {
    let db = Database::in_memory().unwrap();
    let config = EngineConfig::default();
    let ingestor = DocumentIngestor::new(&db, &config);
    let feedback = FeedbackLoop::new(&db, &config);

    // First pass: unknown item, rejected with an override
    let outcome = ingestor
        .ingest(
            &invoice(
                "Ace Hardware",
                "R-1",
                NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                None,
                vec![line("copper pipe 10ft", 1.0, 30.0)],
            ),
            "r1.pdf",
        )
        .unwrap();
    feedback
        .submit(
            outcome.suggestions[0].id,
            FeedbackDecision::Reject,
            Some(ExpenseCategory::PlumbingPipes),
        )
        .unwrap();

    // Second pass: a near-identical item now gets the corrected category
    // through similarity, ranked below any rule confidence
    let outcome = ingestor
        .ingest(
            &invoice(
                "Ace Hardware",
                "R-2",
                NaiveDate::from_ymd_opt(2025, 5, 8).unwrap(),
                None,
                vec![line("copper pipe 20ft", 1.0, 55.0)],
            ),
            "r2.pdf",
        )
        .unwrap();

    let suggestion = &outcome.suggestions[0];
    assert_eq!(suggestion.category, ExpenseCategory::PlumbingPipes);
    assert!(suggestion.rule_id.is_none());
    assert!(!suggestion.similar_items.is_empty());
    assert!(suggestion.confidence <= config.similarity_confidence_cap);
}
