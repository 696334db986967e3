//! Turn a pipeline outcome into reply text.

use shitu_core::{DisplayStyle, ModelSelector};

use crate::messages::results;
use crate::recognition::{CharacterMatch, ErrorKind, PipelineOutcome};

/// Number of ranked candidates shown in a reply.
pub const MAX_SHOWN: usize = 5;

pub fn render(outcome: &PipelineOutcome, model: ModelSelector, style: DisplayStyle) -> String {
    match outcome {
        PipelineOutcome::Success(result) if result.matches.is_empty() => {
            results::NO_CHARACTERS.to_string()
        }
        PipelineOutcome::Success(result) => render_matches(&result.matches, model, style),
        PipelineOutcome::EmptyMatch => results::NO_MATCH.to_string(),
        PipelineOutcome::Failure { kind, .. } => render_failure(*kind).to_string(),
    }
}

fn render_failure(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ServiceRejected => results::SERVICE_UNAVAILABLE,
        ErrorKind::DecodeFailed => results::UNSUPPORTED_FORMAT,
        ErrorKind::Timeout => results::TIMED_OUT,
        ErrorKind::FetchFailed => results::FETCH_FAILED,
    }
}

fn render_matches(matches: &[CharacterMatch], model: ModelSelector, style: DisplayStyle) -> String {
    let shown = matches.iter().take(MAX_SHOWN).enumerate();
    let truncated = matches.len() > MAX_SHOWN;
    let mut lines = Vec::new();

    match style {
        DisplayStyle::Decorated => {
            lines.push(format!("**{} {}结果**", model.emoji(), model.display_name()));
            lines.push("=".repeat(20));
            for (i, m) in shown {
                lines.push(format!("{}. **{}** — 《{}》", i + 1, m.character, m.work));
            }
            if truncated {
                lines.push(String::new());
                lines.push(format!("> {}", results::more_results(matches.len(), MAX_SHOWN)));
            }
            lines.push(String::new());
            lines.push(results::DATA_SOURCE.to_string());
        }
        DisplayStyle::Plain => {
            lines.push(format!("{}结果:", model.display_name()));
            for (i, m) in shown {
                lines.push(format!("{}. {} — {}", i + 1, m.character, m.work));
            }
            if truncated {
                lines.push(results::more_results(matches.len(), MAX_SHOWN));
            }
        }
    }

    lines.join("\n")
}
