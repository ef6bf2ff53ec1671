pub mod export;
pub mod load;
pub mod schema;
pub mod search;
pub mod visualize;

use crate::config::RuntimePaths;
use crate::locate::load_canonical_table;
use crate::metrics::{DerivationOptions, DerivationOutcome, RowIssue, derive_metrics};

struct CanonicalAnalysis {
    outcome: DerivationOutcome,
    warnings: Vec<String>,
}

fn analyze_canonical(
    runtime_paths: &RuntimePaths,
    options: &DerivationOptions,
) -> CanonicalAnalysis {
    let located = load_canonical_table(&runtime_paths.data_dir);
    let outcome = derive_metrics(&located.rows, options);

    let mut warnings = located.warnings;
    warnings.extend(outcome.warnings.iter().cloned());
    CanonicalAnalysis { outcome, warnings }
}

fn describe_issue(issue: &RowIssue) -> String {
    let action = if issue.excluded {
        "row excluded"
    } else {
        "metric left empty"
    };
    format!(
        "row {} (contactid={}): `{}` {}; {action}",
        issue.row,
        issue.contactid.as_deref().unwrap_or("None"),
        issue.field,
        issue.reason
    )
}
