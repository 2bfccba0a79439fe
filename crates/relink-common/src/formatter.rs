use crate::failure::DiagnosticError;
use crate::refs::ReferenceTable;

/// Sensitive words that cause quoted values in console output to be masked.
const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "cvv",
    "ssn",
    "card_number",
    "credit_card",
];

/// Render a [`DiagnosticError`] the way agents read it.
///
/// ```text
/// Error: click @e3 failed after 3 attempts: Unknown ref: e3
/// # kind: stale_ref
/// # ref: e3
/// # attempts: 3
/// # recoveries: resnap, resnap
/// # console:
/// #   TypeError: x is undefined
/// Suggestion: Run a new snapshot ...
/// ```
pub fn format_diagnostic(err: &DiagnosticError) -> String {
    let mut output = format!("Error: {}\n", err.message);
    output.push_str(&format!("# kind: {}\n", err.kind));
    if let Some(token) = &err.ref_token {
        output.push_str(&format!("# ref: {}\n", token));
    }
    output.push_str(&format!("# attempts: {}\n", err.attempts));

    if err.retry_log.is_empty() {
        output.push_str("# recoveries: none\n");
    } else {
        output.push_str(&format!("# recoveries: {}\n", err.retry_log.join(", ")));
    }

    if !err.console_errors.is_empty() {
        output.push_str("# console:\n");
        for line in &err.console_errors {
            output.push_str(&format!("#   {}\n", mask_sensitive_log(line)));
        }
    }

    output.push_str(&format!("Suggestion: {}", err.suggestion));
    output
}

/// One line per ref, e.g. `[e2] button "Save" (nth=1)`.
pub fn format_ref_table(table: &ReferenceTable) -> String {
    if table.is_empty() {
        return "(no refs)".to_string();
    }

    let mut lines = Vec::with_capacity(table.len());
    for (token, role_ref) in table.iter() {
        let mut line = format!("[{}] {}", token, role_ref.role);
        if let Some(name) = &role_ref.name {
            line.push_str(&format!(" {:?}", name));
        }
        if let Some(nth) = role_ref.nth {
            line.push_str(&format!(" (nth={})", nth));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Mask the first quoted span of a log line that mentions a sensitive key.
pub fn mask_sensitive_log(log: &str) -> String {
    let mut masked = log.to_string();
    let lower_log = log.to_lowercase();

    for key in DEFAULT_SENSITIVE_FIELDS {
        if lower_log.contains(key) {
            if let Some(start) = masked.find('"')
                && let Some(end) = masked[start + 1..].rfind('"')
            {
                masked.replace_range(start + 1..start + 1 + end, "********");
            }
            break;
        }
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;
    use crate::refs::{RefMode, RoleRef};

    fn diagnostic() -> DiagnosticError {
        DiagnosticError {
            message: "click @e3 failed after 2 attempts: Unknown ref: e3".into(),
            ref_token: Some("e3".into()),
            kind: FailureKind::StaleRef,
            attempts: 2,
            retry_log: vec!["resnap".into()],
            console_errors: vec!["login failed for password \"hunter2\"".into()],
            suggestion: FailureKind::StaleRef.suggestion().into(),
        }
    }

    #[test]
    fn diagnostic_lists_every_field() {
        let out = format_diagnostic(&diagnostic());
        assert!(out.starts_with("Error: click @e3 failed after 2 attempts"));
        assert!(out.contains("# kind: stale_ref\n"));
        assert!(out.contains("# ref: e3\n"));
        assert!(out.contains("# attempts: 2\n"));
        assert!(out.contains("# recoveries: resnap\n"));
        assert!(out.contains("Suggestion: The page changed"));
    }

    #[test]
    fn diagnostic_masks_console_secrets() {
        let out = format_diagnostic(&diagnostic());
        assert!(!out.contains("hunter2"));
        assert!(out.contains("\"********\""));
    }

    #[test]
    fn diagnostic_without_recoveries() {
        let mut err = diagnostic();
        err.retry_log.clear();
        err.console_errors.clear();
        err.ref_token = None;
        let out = format_diagnostic(&err);
        assert!(out.contains("# recoveries: none"));
        assert!(!out.contains("# console"));
        assert!(!out.contains("# ref"));
    }

    #[test]
    fn ref_table_lines() {
        let mut table = ReferenceTable::new(RefMode::Role);
        table.insert("e1", RoleRef::new("button", Some("Save".into())));
        let mut dup = RoleRef::new("link", None);
        dup.nth = Some(1);
        table.insert("e2", dup);

        assert_eq!(
            format_ref_table(&table),
            "[e1] button \"Save\"\n[e2] link (nth=1)"
        );
        assert_eq!(
            format_ref_table(&ReferenceTable::default()),
            "(no refs)"
        );
    }
}
