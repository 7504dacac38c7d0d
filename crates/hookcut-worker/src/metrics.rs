//! Worker metrics.

use metrics::counter;

pub mod names {
    pub const WORKFLOW_RUNS_TOTAL: &str = "hookcut_workflow_runs_total";
    pub const WORKFLOW_STEPS_TOTAL: &str = "hookcut_workflow_steps_total";
    pub const WORKFLOW_RETRIES_TOTAL: &str = "hookcut_workflow_retries_total";
    pub const GUARDIAN_TIMEOUTS_TOTAL: &str = "hookcut_guardian_timeouts_total";
    pub const LEASE_CONTENTION_TOTAL: &str = "hookcut_lease_contention_total";
}

/// `outcome` is one of `completed`, `retrying`, `deferred`, `failed`.
pub fn record_run(workflow: &'static str, outcome: &'static str) {
    counter!(names::WORKFLOW_RUNS_TOTAL, "workflow" => workflow, "outcome" => outcome).increment(1);
}

/// `source` is `executed` or `replayed`.
pub fn record_step(step: &'static str, source: &'static str) {
    counter!(names::WORKFLOW_STEPS_TOTAL, "step" => step, "source" => source).increment(1);
}

pub fn record_retry(workflow: &'static str) {
    counter!(names::WORKFLOW_RETRIES_TOTAL, "workflow" => workflow).increment(1);
}

pub fn record_guardian_timeout() {
    counter!(names::GUARDIAN_TIMEOUTS_TOTAL).increment(1);
}

pub fn record_lease_contention(workflow: &'static str) {
    counter!(names::LEASE_CONTENTION_TOTAL, "workflow" => workflow).increment(1);
}
