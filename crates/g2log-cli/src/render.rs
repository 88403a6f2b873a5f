//! Summary documents written to disk.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::NaiveDate;

/// Title shown above a summary.
pub fn summary_title(author: &str) -> String {
    let author = author.trim();
    if author.is_empty() {
        "Team work summary".to_string()
    } else {
        format!("{author}'s work summary")
    }
}

/// Markdown document: title line with the time range, then the summary.
pub fn markdown_document(title: &str, since: &str, until: &str, summary: &str) -> String {
    format!("# {title} ({since} to {until})\n\n{summary}")
}

/// `YYYY-MM-DD` for relative or absolute date expressions, else the input.
///
/// `today` and `yesterday` resolve against `today`; other expressions that
/// do not parse as a date stay as written.
pub fn normalize_date(value: &str, today: NaiveDate) -> String {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "today" | "now" => return today.format("%Y-%m-%d").to_string(),
        "yesterday" => {
            if let Some(day) = today.pred_opt() {
                return day.format("%Y-%m-%d").to_string();
            }
        }
        _ => {}
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    value.to_string()
}

/// Replaces characters that are unsafe in file names.
pub fn sanitize_file_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// `work-summary_<author|team>_<since>_to_<until>.md` inside `dir`.
pub fn default_output_path(
    dir: &Path,
    author: &str,
    since: &str,
    until: &str,
    today: NaiveDate,
) -> PathBuf {
    let who = if author.trim().is_empty() {
        "team".to_string()
    } else {
        sanitize_file_component(author)
    };
    let since = sanitize_file_component(&normalize_date(since, today));
    let until = sanitize_file_component(&normalize_date(until, today));
    dir.join(format!("work-summary_{who}_{since}_to_{until}.md"))
}

/// Path of the HTML page that accompanies `markdown_path`.
pub fn html_path_for(markdown_path: &Path) -> PathBuf {
    markdown_path.with_extension("html")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Renders markdown to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    use pulldown_cmark::{Options, Parser, html};
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, Options::ENABLE_TABLES));
    out
}

/// Standalone HTML page for a summary.
pub fn html_document(title: &str, since: &str, until: &str, summary: &str) -> String {
    let title = escape_html(title);
    let range = escape_html(&format!("{since} to {until}"));
    let body = markdown_to_html(summary);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
<style>body{{font-family:sans-serif;max-width:48rem;margin:2rem auto;line-height:1.6;white-space:normal}}\
.range{{color:#666}}</style>\n</head>\n<body>\n<h1>{title}</h1>\n<p class=\"range\">{range}</p>\n{body}</body>\n</html>\n"
    )
}

/// Writes `contents` to `path`, creating the parent directory.
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
