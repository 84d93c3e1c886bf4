use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildc::exec::{action, ActionRegistry, BoxFuture, Runnable};
use buildc::spec::JobArgs;

/// Shared, ordered log of executed job labels.
pub type ExecLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &ExecLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A fake job that:
/// - optionally sleeps
/// - records its label in the shared log
/// - reports a fixed outcome.
#[derive(Debug)]
pub struct RecordingJob {
    label: String,
    log: ExecLog,
    succeed: bool,
    delay: Option<Duration>,
}

impl RecordingJob {
    pub fn ok(label: &str, log: &ExecLog) -> Arc<dyn Runnable> {
        Arc::new(Self {
            label: label.to_string(),
            log: Arc::clone(log),
            succeed: true,
            delay: None,
        })
    }

    pub fn failing(label: &str, log: &ExecLog) -> Arc<dyn Runnable> {
        Arc::new(Self {
            label: label.to_string(),
            log: Arc::clone(log),
            succeed: false,
            delay: None,
        })
    }

    pub fn delayed(label: &str, log: &ExecLog, delay: Duration, succeed: bool) -> Arc<dyn Runnable> {
        Arc::new(Self {
            label: label.to_string(),
            log: Arc::clone(log),
            succeed,
            delay: Some(delay),
        })
    }
}

impl Runnable for RecordingJob {
    fn run(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log.lock().unwrap().push(self.label.clone());
            self.succeed
        })
    }

    fn describe(&self) -> String {
        format!("record {}", self.label)
    }
}

/// Registry with:
/// - `record`: appends its first positional argument to `log`
/// - `fail`: appends its first positional argument, then fails.
pub fn recording_registry(log: &ExecLog) -> ActionRegistry {
    let ok_log = Arc::clone(log);
    let fail_log = Arc::clone(log);

    ActionRegistry::new()
        .with(
            "record",
            action(move |args: &JobArgs| {
                ok_log.lock().unwrap().push(label_of(args));
                Ok(())
            }),
        )
        .with(
            "fail",
            action(move |args: &JobArgs| {
                fail_log.lock().unwrap().push(label_of(args));
                anyhow::bail!("action failed on purpose")
            }),
        )
}

fn label_of(args: &JobArgs) -> String {
    args.get(0)
        .and_then(|v| v.as_str())
        .unwrap_or("<unnamed>")
        .to_string()
}
