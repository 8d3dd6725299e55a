//! Links to generated analysis reports.

use crate::models::{JobId, StatusReport};

/// Placeholder substituted in URL templates.
pub const JOB_ID_PLACEHOLDER: &str = "{job_id}";

/// Fill `reference` into a report URL template.
///
/// URLs without a scheme get `https://` prepended.
pub fn report_url(template: &str, reference: &str) -> String {
    let url = template.replace(JOB_ID_PLACEHOLDER, reference);
    if url.starts_with("http://") || url.starts_with("https://") {
        url
    } else {
        format!("https://{}", url)
    }
}

/// Report URL for a completed job; falls back to the job id when the
/// status payload carries no reference of its own.
pub fn completed_report_url(template: &str, job_id: &JobId, report: &StatusReport) -> String {
    let reference = report
        .result_reference()
        .unwrap_or_else(|| job_id.to_string());
    report_url(template, &reference)
}
