use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dbreader_lib::ai::provider::{GenerationProvider, ScriptedProvider};
use dbreader_lib::engine::cursor::MemoryCursor;
use dbreader_lib::engine::error::{EngineError, EngineResult};
use dbreader_lib::engine::safety::SafetyViolation;
use dbreader_lib::engine::shaper::collect_bounded;
use dbreader_lib::engine::traits::{ExportSink, QueryEngine};
use dbreader_lib::engine::types::{NativeValue, QueryResult, Value};
use dbreader_lib::export::csv::export_cursor;
use dbreader_lib::export::ExportSummary;
use dbreader_lib::schema::{Column, ForeignKey, SchemaCache, StaticCatalog, Table};
use dbreader_lib::service::{GeneratedQuery, ReaderService};

/// Engine serving one fixed table from memory, ignoring the query text
struct FixtureEngine {
    columns: Vec<String>,
    rows: Vec<Vec<NativeValue>>,
}

impl FixtureEngine {
    fn customers(count: i64) -> Self {
        let rows = (1..=count)
            .map(|id| {
                vec![
                    NativeValue::Int(id),
                    NativeValue::Text(format!("user{id}@example.com")),
                    if id % 2 == 0 {
                        NativeValue::Null
                    } else {
                        NativeValue::Timestamp(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())
                    },
                ]
            })
            .collect();

        Self {
            columns: vec!["id".into(), "email".into(), "verified_at".into()],
            rows,
        }
    }

    fn cursor(&self) -> MemoryCursor {
        MemoryCursor::new(self.columns.clone(), self.rows.clone())
    }
}

#[async_trait]
impl QueryEngine for FixtureEngine {
    fn driver_id(&self) -> &'static str {
        "fixture"
    }

    async fn execute_bounded(&self, _query: &str, limit: usize) -> EngineResult<QueryResult> {
        collect_bounded(&mut self.cursor(), limit, Instant::now()).await
    }

    async fn export_csv(&self, _query: &str, sink: ExportSink<'_>) -> EngineResult<ExportSummary> {
        export_cursor(&mut self.cursor(), sink).await
    }
}

fn customers_table() -> Table {
    let mut id = Column::new("id", "integer", false);
    id.is_primary_key = true;
    Table {
        name: "customers".into(),
        columns: vec![id, Column::new("email", "text", true)],
        foreign_keys: vec![],
        row_estimate: 0,
    }
}

async fn service(engine: FixtureEngine, provider: Option<Arc<dyn GenerationProvider>>) -> ReaderService {
    let cache = Arc::new(SchemaCache::new());
    cache
        .load(&StaticCatalog::new(vec![customers_table()]))
        .await
        .expect("fixture schema loads");
    ReaderService::new(Arc::new(engine), cache, provider)
}

#[tokio::test]
async fn test_generated_candidate_then_rejected_write() {
    let provider = Arc::new(ScriptedProvider::answering(
        "```sql\nSELECT email FROM customers LIMIT 10\n```",
    ));
    let svc = service(FixtureEngine::customers(3), Some(provider)).await;

    let generated = svc.generate_query("emails of our customers").await.unwrap();
    assert_eq!(generated.query(), Some("SELECT email FROM customers LIMIT 10"));

    let provider = Arc::new(ScriptedProvider::answering("DROP TABLE customers;"));
    let svc = service(FixtureEngine::customers(3), Some(provider)).await;

    let err = svc.generate_query("remove the customers table").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::GeneratedQueryInvalid {
            violation: SafetyViolation::NotReadOnly
        }
    );
    assert_ne!(err.reason(), EngineError::NotReadOnly.reason());
}

#[tokio::test]
async fn test_generate_then_execute() {
    let provider = Arc::new(ScriptedProvider::answering("SELECT id, email, verified_at FROM customers"));
    let svc = service(FixtureEngine::customers(5), Some(provider)).await;

    let query = match svc.generate_query("all customers").await.unwrap() {
        GeneratedQuery::Candidate { query, .. } => query,
        other => panic!("expected candidate, got {other:?}"),
    };
    let result = svc.execute_query(&query, 3).await.unwrap();

    assert_eq!(result.columns, vec!["id", "email", "verified_at"]);
    assert_eq!(result.count, 3);
    assert!(result.more);
    assert_eq!(result.rows[0][2], Value::Text("2025-01-02T03:04:05.000000000Z".into()));
    assert_eq!(result.rows[1][2], Value::Null);
}

#[tokio::test]
async fn test_execute_limits_and_flags() {
    let svc = service(FixtureEngine::customers(1500), None).await;

    let default = svc.execute_query("SELECT * FROM customers", 0).await.unwrap();
    assert_eq!(default.count, 200);
    assert!(default.more);

    let capped = svc.execute_query("SELECT * FROM customers", 10_000).await.unwrap();
    assert_eq!(capped.count, 1000);
    assert!(capped.more);

    let svc = service(FixtureEngine::customers(4), None).await;
    let all = svc.execute_query("select * from customers", 10).await.unwrap();
    assert_eq!(all.count, 4);
    assert!(!all.more);

    let svc = service(FixtureEngine::customers(0), None).await;
    let none = svc.execute_query("select * from customers", 10).await.unwrap();
    assert_eq!(none.count, 0);
    assert!(none.rows.is_empty());
    assert!(!none.more);
    assert_eq!(none.columns.len(), 3);
}

#[tokio::test]
async fn test_export_to_file_has_no_row_limit() {
    let svc = service(FixtureEngine::customers(1200), None).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("customers.csv");

    let mut file = tokio::fs::File::create(&path).await.unwrap();
    let summary = svc
        .export_csv("SELECT * FROM customers", &mut file)
        .await
        .unwrap();
    drop(file);

    assert_eq!(summary.rows_exported, 1200);

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("id,email,verified_at"));
    assert_eq!(lines.next(), Some("1,user1@example.com,2025-01-02T03:04:05Z"));
    assert_eq!(lines.next(), Some("2,user2@example.com,"));
    assert_eq!(contents.lines().count(), 1201);
    assert_eq!(summary.bytes_written, contents.len() as u64);
}

#[tokio::test]
async fn test_export_rejects_writes_before_touching_sink() {
    let svc = service(FixtureEngine::customers(2), None).await;
    let mut sink = Vec::new();

    let err = svc.export_csv("TRUNCATE customers", &mut sink).await.unwrap_err();

    assert_eq!(err.to_response().reason, "not_read_only");
    assert!(sink.is_empty());
}

/// Two catalog generations whose tables all carry a column naming the
/// generation, so a reader can tell if a snapshot mixes them.
fn generation(tag: &str, tables: usize) -> StaticCatalog {
    let tables = (0..tables)
        .map(|i| Table {
            name: format!("t{i:02}"),
            columns: vec![Column::new(format!("col_{tag}"), "text", true)],
            foreign_keys: vec![ForeignKey {
                column: format!("col_{tag}"),
                referenced_table: format!("ref_{tag}"),
                referenced_column: "id".into(),
            }],
            row_estimate: 1,
        })
        .collect();
    StaticCatalog::new(tables)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_mixed_snapshots() {
    let cache = Arc::new(SchemaCache::new());
    let old = generation("old", 12);
    let new = generation("new", 7);
    cache.load(&old).await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let cache = Arc::clone(&cache);
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            for i in 0..500 {
                let catalog = if i % 2 == 0 { &new } else { &old };
                cache.load(catalog).await.unwrap();
                tokio::task::yield_now().await;
            }
            stop.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                let mut observed = 0usize;
                loop {
                    let done = stop.load(Ordering::SeqCst);
                    let snapshot = cache.snapshot();
                    let tag = &snapshot.tables[0].columns[0].name;
                    let expected_len = if tag == "col_old" { 12 } else { 7 };

                    assert_eq!(snapshot.tables.len(), expected_len);
                    for table in &snapshot.tables {
                        assert_eq!(&table.columns[0].name, tag);
                        assert_eq!(table.foreign_keys[0].column, *tag);
                    }

                    let text = cache.to_text();
                    assert!(
                        !(text.contains("col_old") && text.contains("col_new")),
                        "text mixes generations"
                    );
                    observed += 1;
                    if done {
                        break observed;
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }
}
