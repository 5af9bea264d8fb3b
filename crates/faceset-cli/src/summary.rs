use faceset_core::{CaptureReport, CapturePolicy, EndReason, Outcome, SessionDir};
use std::fmt::Write;
use std::path::Path;

const RULE_WIDTH: usize = 70;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// One line explaining an early stop, if the target was not reached.
pub fn end_notice(end: &EndReason) -> Option<String> {
    match end {
        EndReason::TargetReached => None,
        EndReason::Cancelled => Some("Cancelled".to_string()),
        EndReason::ReadFailed(e) => Some(format!("Error reading frame: {e}")),
        EndReason::Failed(e) => Some(format!("Capture stopped: {e}")),
    }
}

/// Text printed after the camera and preview are closed.
pub fn render_summary(
    report: &CaptureReport,
    policy: &CapturePolicy,
    session: &SessionDir,
    dataset_root: &Path,
) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "\n{}", rule());
    let _ = writeln!(s, "CAPTURE SUMMARY");
    let _ = writeln!(s, "{}", rule());

    match report.outcome(policy.min_success) {
        Outcome::Success => {
            let _ = writeln!(s, "SUCCESS!");
            let _ = writeln!(s, "   Name: {}", session.name());
            let _ = writeln!(s, "   Images: {}", report.captured);
            let _ = writeln!(s, "   Location: {}", session.path().display());
            let _ = writeln!(s);
            let _ = writeln!(s, "NEXT STEPS:");
            let _ = writeln!(s, "1. Capture more people (run this command again)");
            let _ = writeln!(s, "2. When done, create a zip file:");
            let _ = writeln!(s, "   zip -r dataset.zip {}", dataset_root.display());
            let _ = writeln!(s, "3. Upload dataset.zip to your training environment");
        }
        Outcome::Incomplete => {
            let _ = writeln!(s, "INCOMPLETE");
            let _ = writeln!(s, "   Only {} images", report.captured);
            let _ = writeln!(s, "   Minimum {} required", policy.min_success);
        }
    }

    let _ = writeln!(s, "{}", rule());
    s
}
