/// Outcome ledger for one job invocation.
///
/// Every cluster mutation records its result here instead of aborting the
/// run, so independent operations still get their chance and the job can
/// report every failure distinctly at the end.
#[derive(Default)]
pub struct JobReport {
    succeeded: Vec<String>,
    failed: Vec<FailedOperation>,
}

struct FailedOperation {
    operation: String,
    cause: anyhow::Error,
}

impl JobReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, operation: impl Into<String>) {
        self.succeeded.push(operation.into());
    }

    pub fn failure(&mut self, operation: impl Into<String>, cause: anyhow::Error) {
        let operation = operation.into();
        log::debug!("{} failed: {:#}", operation, cause);
        self.failed.push(FailedOperation { operation, cause });
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failed_operations(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.operation.as_str()).collect()
    }

    pub fn log_summary(&self) {
        log::info!(
            "{} operations succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        );
        for failure in &self.failed {
            log::error!("{}: {:#}", failure.operation, failure.cause);
        }
    }
}
