//! Plain-text rendering of analyzer results for the terminal.

use std::borrow::Cow;

use crate::analyzer::{FileOverview, FileStats, FileTable};
use crate::generator::GeneratedTranslations;
use crate::languages::LanguageRegistry;
use crate::providers::ProviderUsage;
use crate::session::SaveOutcome;

const EMPTY_CELL: &str = "<empty>";

pub fn format_stats(stats: &FileStats) -> String {
    format!(
        "Total Keys: {}\nFilled Keys: {}\nEmpty Keys: {}\nCompletion: {:.2}%",
        stats.total_keys, stats.filled_keys, stats.empty_keys, stats.completion_percentage
    )
}

/// One line per file: name, completion, and the locales it was missing from.
pub fn format_overview(overview: &[FileOverview]) -> String {
    if overview.is_empty() {
        return "no catalog files".to_string();
    }
    overview
        .iter()
        .map(|item| {
            let mut line = format!("{}\t{:.2}%", item.file, item.stats.completion_percentage);
            if !item.missing_locales.is_empty() {
                let missing = item
                    .missing_locales
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                line.push_str(&format!("\tmissing: {}", missing));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_table(table: &FileTable) -> String {
    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    let mut header = vec!["key"];
    header.extend(table.locales.iter().map(String::as_str));
    lines.push(header.join("\t"));
    for row in &table.rows {
        let mut cells = vec![escape_cell(&row.key)];
        cells.extend(row.values.iter().map(|value| {
            if value.is_empty() {
                Cow::Borrowed(EMPTY_CELL)
            } else {
                escape_cell(value)
            }
        }));
        lines.push(cells.join("\t"));
    }
    lines.join("\n")
}

/// Keeps one row per line: tabs, line breaks and backslashes are escaped.
fn escape_cell(value: &str) -> Cow<'_, str> {
    if !value.contains(['\t', '\n', '\r', '\\']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            ch => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

pub fn format_save(outcome: SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Saved { files } => format!("Changes have been saved ({} files).", files),
        SaveOutcome::NothingToSave => "There are no changes to save.".to_string(),
    }
}

pub fn format_generation(
    generated: &GeneratedTranslations,
    updated: &[String],
    registry: &LanguageRegistry,
) -> String {
    let mut lines = generated
        .translations
        .iter()
        .map(|(locale, text)| {
            let marker = if updated.contains(locale) {
                "\t(updated)"
            } else {
                ""
            };
            format!("{}\t{}{}", registry.display(locale), text, marker)
        })
        .collect::<Vec<_>>();
    lines.push(format!(
        "model: {}",
        generated.model.as_deref().unwrap_or("unavailable")
    ));
    lines.push(format_usage(generated.usage.as_ref()));
    lines.join("\n")
}

fn format_usage(usage: Option<&ProviderUsage>) -> String {
    let Some(usage) = usage else {
        return "tokens: unavailable".to_string();
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });

    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }

    if parts.is_empty() {
        "tokens: unavailable".to_string()
    } else {
        format!("tokens: {}", parts.join(", "))
    }
}
