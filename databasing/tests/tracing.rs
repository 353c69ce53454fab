//! Trace entry/exit records, captured through a JSON `tracing` subscriber.

use serde_json::Value;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::instrument::WithSubscriber;

use databasing::{
    postgresql, Connector, Context, LogLevel, MessageLogger, PostgresqlExecutor, SqlExecutor,
    SqlExecutorImpl,
};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let writer = self.clone();
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish()
    }

    /// Records emitted from a message catalog, in order
    fn messages(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|record| record["fields"].get("message_id").is_some())
            .collect()
    }

    fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

fn message_ids(records: &[Value]) -> Vec<u64> {
    records
        .iter()
        .map(|record| record["fields"]["message_id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn trace_level_emits_entry_and_exit_with_elapsed() {
    let capture = Capture::default();

    async {
        let connector = Connector::new("sqlite::memory:").unwrap();
        let mut executor = PostgresqlExecutor::new(
            connector,
            MessageLogger::new(postgresql::PRODUCT_ID, LogLevel::Info),
        );
        let ctx = Context::background();

        executor.set_log_level(&ctx, LogLevel::Trace).await.unwrap();
        capture.clear();

        // SQLite has no pg_class; the call fails but is still traced.
        assert!(executor.get_current_watermark(&ctx).await.is_err());
    }
    .with_subscriber(capture.subscriber())
    .await;

    let records = capture.messages();
    assert_eq!(message_ids(&records), vec![1, 2]);

    let entry = &records[0];
    assert_eq!(entry["level"], "TRACE");
    assert_eq!(entry["fields"]["code"], "databasing-64230001");
    assert!(entry["fields"].get("elapsed_ns").is_none());

    let exit = &records[1];
    assert!(exit["fields"]["elapsed_ns"].as_u64().is_some());
    assert!(exit["fields"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Exit  GetCurrentWatermark()"));
}

#[tokio::test]
async fn failed_connect_still_traces_exit() {
    let capture = Capture::default();

    async {
        let connector = Connector::new("sqlite::memory:").unwrap();
        let executor = PostgresqlExecutor::new(
            connector.clone(),
            MessageLogger::new(postgresql::PRODUCT_ID, LogLevel::Trace),
        );
        let (ctx, cancel) = Context::background().with_cancel();
        cancel.cancel();

        let result = executor.get_current_watermark(&ctx).await;
        assert!(matches!(result, Err(databasing::Error::Cancelled)));
        assert_eq!(connector.open_handles(), 0);
    }
    .with_subscriber(capture.subscriber())
    .await;

    let records = capture.messages();
    assert_eq!(message_ids(&records), vec![1, 2]);
    assert!(records[1]["fields"]["message"]
        .as_str()
        .unwrap()
        .contains("Context cancelled"));
}

#[tokio::test]
async fn file_processing_nests_scanner_traces() {
    let capture = Capture::default();
    let dir = tempfile::tempdir().unwrap();
    let statements = dir.path().join("statements.sql");
    std::fs::write(&statements, "CREATE TABLE t (id INTEGER);\n").unwrap();

    async {
        let connector = Connector::new("sqlite::memory:").unwrap();
        let executor = SqlExecutorImpl::new(
            connector,
            MessageLogger::new(databasing::sqlexecutor::PRODUCT_ID, LogLevel::Trace),
        );
        let ctx = Context::background();

        executor.process_file_name(&ctx, &statements).await.unwrap();
    }
    .with_subscriber(capture.subscriber())
    .await;

    let trace_ids: Vec<u64> = message_ids(&capture.messages())
        .into_iter()
        .filter(|id| *id < 1000)
        .collect();
    assert_eq!(trace_ids, vec![1, 3, 4, 2]);
}

#[tokio::test]
async fn less_verbose_level_suppresses_traces() {
    let capture = Capture::default();

    async {
        let connector = Connector::new("sqlite::memory:").unwrap();
        let mut executor = PostgresqlExecutor::new(
            connector,
            MessageLogger::new(postgresql::PRODUCT_ID, LogLevel::Trace),
        );
        let ctx = Context::background();

        executor.set_log_level(&ctx, LogLevel::Debug).await.unwrap();
        capture.clear();

        assert!(executor.get_current_watermark(&ctx).await.is_err());
    }
    .with_subscriber(capture.subscriber())
    .await;

    assert!(capture.messages().is_empty());
}

#[tokio::test]
async fn set_log_level_traces_against_the_new_level() {
    let capture = Capture::default();

    async {
        let connector = Connector::new("sqlite::memory:").unwrap();
        let mut executor = SqlExecutorImpl::new(
            connector,
            MessageLogger::new(databasing::sqlexecutor::PRODUCT_ID, LogLevel::Info),
        );
        let ctx = Context::background();

        // Entry is checked before the change, exit after it.
        executor.set_log_level(&ctx, LogLevel::Trace).await.unwrap();
        executor.set_log_level(&ctx, LogLevel::Warn).await.unwrap();
    }
    .with_subscriber(capture.subscriber())
    .await;

    assert_eq!(message_ids(&capture.messages()), vec![8, 7]);
}

#[tokio::test]
async fn failed_statements_are_logged_as_warnings() {
    let capture = Capture::default();

    async {
        let connector = Connector::new("sqlite::memory:").unwrap();
        let executor = SqlExecutorImpl::new(
            connector,
            MessageLogger::new(databasing::sqlexecutor::PRODUCT_ID, LogLevel::Warn),
        );
        let ctx = Context::background();
        let mut reader = tokio::io::BufReader::new("SELECT * FROM missing;\n".as_bytes());

        executor.process_scanner(&ctx, &mut reader).await.unwrap();
    }
    .with_subscriber(capture.subscriber())
    .await;

    let records = capture.messages();
    assert_eq!(message_ids(&records), vec![3001]);
    assert_eq!(records[0]["level"], "WARN");
    assert_eq!(records[0]["fields"]["code"], "databasing-64223001");
    assert!(records[0]["fields"]["details"]
        .as_str()
        .unwrap()
        .starts_with("1|1|"));
}
