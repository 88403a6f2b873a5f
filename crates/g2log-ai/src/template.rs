//! Prompt templates with user-customizable placeholders.

/// Built-in prompt used when the configuration has no custom template.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
Write a work summary from the git commit records below. Scale the level of detail \
to the amount and importance of the work that was actually committed.

Git commit records:

{{GIT_LOGS}}

Requirements:
1. Organize the content by date and by project.
2. Adapt the level of detail to the number of commits:
   - few commits: be brief and highlight the key results
   - many commits: list the work in detail so nothing important is lost
   - describe major features and significant bug fixes in detail
3. Use clear, professional, plain language.
4. Highlight feature work, bug fixes and improvements.
5. The result should be ready to paste into a daily report.
6. Follow this output format exactly (one line per project, project and description on the same line):
   [Date]: YYYY-MM-DD
   Project 1: description of the work
   Project 2: description of the work

   [Date]: YYYY-MM-DD
   Project 1: description of the work
7. Separate dates with one blank line.
8. Put different projects of the same day on consecutive lines.
9. Do not add anything else, do not use markdown and do not use list markers.
";

/// System turn sent with every summary request.
pub const SYSTEM_PROMPT: &str = "You are a professional work-summary assistant \
who turns git commit records into clear work reports.";

/// Label substituted for the author when no author filter is set.
pub const ALL_AUTHORS: &str = "all authors";

/// Values substituted into a prompt template.
#[derive(Clone, Copy, Debug)]
pub struct PromptVars<'a> {
    pub logs: &'a str,
    /// Empty means every author.
    pub author: &'a str,
    pub since: &'a str,
    pub until: &'a str,
}

impl PromptVars<'_> {
    fn author_label(&self) -> &str {
        if self.author.trim().is_empty() {
            ALL_AUTHORS
        } else {
            self.author
        }
    }
}

#[derive(Clone, Copy)]
enum Var {
    Logs,
    Author,
    Since,
    Until,
}

const PLACEHOLDERS: &[(&str, Var)] = &[
    ("{{GIT_LOGS}}", Var::Logs),
    ("{log_content}", Var::Logs),
    ("{{AUTHOR}}", Var::Author),
    ("{author}", Var::Author),
    ("{{SINCE}}", Var::Since),
    ("{since}", Var::Since),
    ("{{UNTIL}}", Var::Until),
    ("{until}", Var::Until),
];

/// Substitutes every known placeholder in `template`.
///
/// Unknown `{...}` text is kept verbatim. Substituted values are not scanned
/// again, so commit messages that happen to contain placeholder text reach the
/// model unchanged.
pub fn render_prompt(template: &str, vars: &PromptVars<'_>) -> String {
    let mut out = String::with_capacity(template.len() + vars.logs.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match PLACEHOLDERS
            .iter()
            .find(|(token, _)| tail.starts_with(token))
        {
            Some((token, var)) => {
                out.push_str(match var {
                    Var::Logs => vars.logs,
                    Var::Author => vars.author_label(),
                    Var::Since => vars.since,
                    Var::Until => vars.until,
                });
                rest = &tail[token.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
