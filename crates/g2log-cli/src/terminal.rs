use std::io::Write as _;

use console::{Style, Term};
use g2log_ai::{LiveSink, StreamEvent};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

const DIVIDER_WIDTH: usize = 40;

/// Echoes streamed output to stdout as it arrives.
///
/// Reasoning is dimmed; a divider separates it from the answer.
pub struct ConsoleSink {
    out: Term,
    reasoning: Style,
    divider: Style,
    wrote_reasoning: bool,
}

impl ConsoleSink {
    pub fn new(colors: bool) -> Self {
        Self {
            out: Term::stdout(),
            reasoning: Style::new().dim().force_styling(colors),
            divider: Style::new().cyan().force_styling(colors),
            wrote_reasoning: false,
        }
    }

    /// Text echoed for one event.
    pub fn render(&mut self, event: StreamEvent) -> String {
        match event {
            StreamEvent::Reasoning { text } => {
                let styled = self.reasoning.apply_to(text).to_string();
                if self.wrote_reasoning {
                    return styled;
                }
                self.wrote_reasoning = true;
                let header = self.divider.apply_to("Thinking...");
                format!("{header}\n{styled}")
            }
            StreamEvent::ThinkingFinished => {
                let line = self.divider.apply_to("-".repeat(DIVIDER_WIDTH));
                format!("\n{line}\n")
            }
            StreamEvent::Content { text, .. } => text,
        }
    }

    fn write(&mut self, text: &str) {
        // A closed stdout only loses the echo.
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl LiveSink for ConsoleSink {
    fn emit(&mut self, event: StreamEvent) {
        let text = self.render(event);
        self.write(&text);
    }
}

/// Section heading for terminal output.
pub fn heading(text: &str, colors: bool) -> String {
    Style::new()
        .bold()
        .green()
        .force_styling(colors)
        .apply_to(text)
        .to_string()
}

pub fn dim(text: &str, colors: bool) -> String {
    Style::new()
        .dim()
        .force_styling(colors)
        .apply_to(text)
        .to_string()
}

pub fn warning(text: &str, colors: bool) -> String {
    Style::new()
        .yellow()
        .force_styling(colors)
        .apply_to(text)
        .to_string()
}

pub fn error(text: &str, colors: bool) -> String {
    Style::new()
        .red()
        .force_styling(colors)
        .apply_to(text)
        .to_string()
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks a y/n question on stderr. Without a terminal the answer is no.
pub fn confirm(question: &str, colors: bool) -> bool {
    let term = Term::stderr();
    if !term.is_term() {
        return false;
    }
    let prompt = Style::new()
        .cyan()
        .force_styling(colors)
        .apply_to(format!("{question} (y/n): "));
    if term.write_str(&prompt.to_string()).is_err() {
        return false;
    }
    term.read_line().is_ok_and(|answer| is_yes(&answer))
}

fn heading_style(level: HeadingLevel) -> Style {
    match level {
        HeadingLevel::H1 => Style::new().bold(),
        HeadingLevel::H2 => Style::new().cyan(),
        HeadingLevel::H3 => Style::new().green(),
        _ => Style::new().yellow(),
    }
}

fn apply_all(styles: &[Style], text: &str, colors: bool) -> String {
    styles.iter().fold(text.to_string(), |acc, style| {
        style.clone().force_styling(colors).apply_to(acc).to_string()
    })
}

/// Markdown restyled for the terminal.
///
/// Heading markers become colors, bullets become `•`, emphasis and code are
/// styled. With `colors` off the result is plain text.
pub fn render_markdown(markdown: &str, colors: bool) -> String {
    let mut out = String::new();
    let mut styles: Vec<Style> = Vec::new();
    // One entry per open list: the next number, or None for bullets.
    let mut lists: Vec<Option<u64>> = Vec::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => styles.push(heading_style(level)),
                Tag::Strong => styles.push(Style::new().bold()),
                Tag::Emphasis => styles.push(Style::new().italic()),
                Tag::CodeBlock(_) => styles.push(Style::new().dim()),
                Tag::List(start) => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    lists.push(start);
                }
                Tag::Item => {
                    out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                    match lists.last_mut() {
                        Some(Some(n)) => {
                            out.push_str(&format!("{n}. "));
                            *n += 1;
                        }
                        _ => out.push_str("• "),
                    }
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Heading(_) => {
                    styles.pop();
                    out.push_str("\n\n");
                }
                TagEnd::Strong | TagEnd::Emphasis => {
                    styles.pop();
                }
                TagEnd::CodeBlock => {
                    styles.pop();
                    out.push('\n');
                }
                TagEnd::Paragraph => out.push_str(if lists.is_empty() { "\n\n" } else { "\n" }),
                TagEnd::Item => {
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                TagEnd::List(_) => {
                    lists.pop();
                    if lists.is_empty() {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(text) => out.push_str(&apply_all(&styles, &text, colors)),
            Event::Code(code) => out.push_str(&apply_all(&[Style::new().cyan()], &code, colors)),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                out.push_str(&"-".repeat(DIVIDER_WIDTH));
                out.push_str("\n\n");
            }
            _ => {}
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_styles_add_no_escape_codes() {
        assert_eq!(heading("Summary", false), "Summary");
        assert_eq!(warning("careful", false), "careful");
    }

    #[test]
    fn forced_styles_wrap_text() {
        let styled = error("boom", true);
        assert!(styled.contains("boom"));
        assert!(styled.contains('\u{1b}'));
    }

    fn reasoning(text: &str) -> StreamEvent {
        StreamEvent::Reasoning { text: text.into() }
    }

    #[test]
    fn sink_writes_thinking_header_once_then_divider() {
        let mut sink = ConsoleSink::new(false);
        assert_eq!(sink.render(reasoning("weigh")), "Thinking...\nweigh");
        assert_eq!(sink.render(reasoning(" options")), " options");
        assert_eq!(
            sink.render(StreamEvent::ThinkingFinished),
            format!("\n{}\n", "-".repeat(DIVIDER_WIDTH))
        );
        let content = StreamEvent::Content {
            seq: 0,
            text: "Done.".into(),
        };
        assert_eq!(sink.render(content), "Done.");
    }

    #[test]
    fn sink_passes_content_through_without_header() {
        let mut sink = ConsoleSink::new(true);
        let content = StreamEvent::Content {
            seq: 3,
            text: "plain".into(),
        };
        assert_eq!(sink.render(content), "plain");
        assert!(!sink.wrote_reasoning);
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes(" Y\n"));
        assert!(is_yes("yes"));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
    }

    #[test]
    fn markdown_is_restyled_as_plain_text() {
        let md = "# Week\n\nShipped **login** and `api`.\n\n- api\n- web\n  - nested\n\n1. one\n2. two\n";
        assert_eq!(
            render_markdown(md, false),
            "Week\n\nShipped login and api.\n\n• api\n• web\n  • nested\n\n1. one\n2. two"
        );
    }

    #[test]
    fn markdown_headings_are_colored() {
        let styled = render_markdown("## Backend\n\ntext", true);
        assert!(styled.contains('\u{1b}'));
        assert!(styled.contains("Backend"));
        assert!(!styled.contains("##"));
        assert_eq!(render_markdown("plain summary", true), "plain summary");
    }
}
