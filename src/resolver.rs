use crate::responses::{CLEAR_COMMAND, ResponseTable, canonical_key};

pub const EXIT_GUIDANCE: &str = "Use the \"Stop Cluster\" control to end your session.";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Resolution {
    Output(String),
    Clear,
}

impl Resolution {
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Output(text) => Some(text),
            Self::Clear => None,
        }
    }
}

/// Maps one submitted line to its outcome. Pure in `(raw, table)`.
///
/// Lookup runs on the trimmed, lower-cased line; synthesized messages quote the
/// line as typed. Blank input is filtered by the caller and never reaches here.
pub fn resolve(raw: &str, table: &ResponseTable) -> Resolution {
    let typed = raw.trim();
    let normalized = canonical_key(typed);

    if let Some(entry) = table.exact(&normalized) {
        if entry.key == CLEAR_COMMAND {
            return Resolution::Clear;
        }
        return Resolution::Output(entry.output.clone());
    }

    // `clear` never prints, so a prefix hit on it falls through to the fallbacks.
    if let Some(entry) = table.first_prefix(&normalized)
        && entry.key != CLEAR_COMMAND
    {
        return Resolution::Output(entry.output.clone());
    }

    if normalized.starts_with("kubectl") {
        let args = typed.split_once(' ').map(|(_, rest)| rest).unwrap_or("");
        return Resolution::Output(format!(
            "error: unknown command \"{args}\"\nRun 'kubectl --help' for usage."
        ));
    }

    if normalized == "exit" {
        return Resolution::Output(EXIT_GUIDANCE.to_string());
    }

    let program = typed.split_whitespace().next().unwrap_or(typed);
    Resolution::Output(format!("bash: {program}: command not found"))
}
