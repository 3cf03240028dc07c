//! Log records emitted by a run, captured through a scoped subscriber.

mod common;

use std::io;
use std::sync::{Arc, Mutex};

use netsec_pipeline::config::ValidationPolicy;
use netsec_pipeline::data::CsvSource;
use netsec_pipeline::{RootConfig, TrainingPipeline};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn captured_run(policy: ValidationPolicy, break_schema: bool) -> String {
    let dir = TempDir::new().unwrap();
    let settings = common::workspace(dir.path(), 40, 0.25, policy);
    if break_schema {
        common::break_schema(&settings);
    }

    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let root = RootConfig::at(settings.clone(), common::instant(5));
        let source = CsvSource::new(common::source_path(&settings), ',');
        let mut pipeline = TrainingPipeline::with_root(root, source).unwrap();
        let _ = pipeline.run();
    });
    capture.text()
}

#[test]
fn run_logs_start_and_end_markers_inside_the_run_span() {
    let logs = captured_run(ValidationPolicy::Record, false);

    assert!(logs.contains("Training pipeline started"), "{logs}");
    assert!(logs.contains("Training pipeline finished"), "{logs}");
    assert!(logs.contains("run_id=02_14_2025_09_30_05"), "{logs}");
    assert!(logs.contains("pipeline=NetworkSecurity"), "{logs}");
    for stage in ["ingestion", "validation", "transformation", "training"] {
        assert!(logs.contains(stage), "missing {stage} in {logs}");
    }
    assert_eq!(logs.matches("Stage completed").count(), 4);
}

#[test]
fn halted_run_logs_the_failure() {
    let logs = captured_run(ValidationPolicy::Halt, true);

    assert!(logs.contains("Validation check failed"), "{logs}");
    assert!(logs.contains("Training pipeline failed"), "{logs}");
    assert!(!logs.contains("Training pipeline finished"), "{logs}");
    assert_eq!(logs.matches("Stage completed").count(), 2);
}
