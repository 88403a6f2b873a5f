//! Commit log extraction through the `git` binary.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context as _, Result, bail};
use ignore::WalkBuilder;
use tracing::{debug, warn};

const DATE_FORMAT_ARG: &str = "--date=format:%Y-%m-%d %H:%M:%S";

/// How many levels below a search root repositories are looked for.
pub const SEARCH_DEPTH: usize = 3;

const SEARCH_DIRS: &[&str] = &[
    "Projects",
    "projects",
    "Workspace",
    "workspace",
    "Development",
    "development",
    "code",
    "src",
];

// Hidden directories (`.git`, `.vscode`, `.idea`) are skipped by the walker.
const SKIP_DIRS: &[&str] = &["node_modules", "dist", "build", "target", "vendor"];

/// A repository to read commits from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repository {
    pub alias: String,
    pub path: PathBuf,
}

/// Per-commit line layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// `<alias> | <date> | <subject>`; used when several repositories are read.
    Tagged,
    /// `<date>: <subject>`; used for the single repository around the working
    /// directory.
    Local,
}

/// Commit filter shared by every repository.
#[derive(Clone, Copy, Debug)]
pub struct LogQuery<'a> {
    /// Empty means every author.
    pub author: &'a str,
    pub since: &'a str,
    pub until: &'a str,
}

/// Logs gathered from all repositories.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectedLogs {
    pub text: String,
    pub commit_count: usize,
    pub repositories_read: usize,
}

impl CollectedLogs {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Walks up from `start` and returns the first directory containing `.git`.
pub fn find_git_repository(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// Usual project folders under `home`, then `home` itself.
pub fn default_search_roots(home: &Path) -> Vec<PathBuf> {
    SEARCH_DIRS
        .iter()
        .map(|dir| home.join(dir))
        .chain(std::iter::once(home.to_path_buf()))
        .collect()
}

/// Git repositories up to `max_depth` levels below each root.
///
/// Hidden and build output directories are not entered, and neither is
/// anything inside a repository that was found. A repository reachable from
/// several roots is listed once, under the first root that reached it. The
/// alias is the folder name.
pub fn find_repositories(roots: &[PathBuf], max_depth: usize) -> Vec<Repository> {
    let mut seen = BTreeSet::new();
    let mut found = Vec::new();
    for root in roots.iter().filter(|root| root.is_dir()) {
        let mut wb = WalkBuilder::new(root);
        wb.standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .max_depth(Some(max_depth))
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                let skipped = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIP_DIRS.contains(&name));
                let inside_repo =
                    entry.depth() > 1 && entry.path().parent().is_some_and(is_repository);
                is_dir && !skipped && !inside_repo
            });
        for entry in wb.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.depth() == 0 || !is_repository(entry.path()) {
                continue;
            }
            let path = entry.into_path();
            if !seen.insert(path.clone()) {
                continue;
            }
            let alias = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("repo")
                .to_string();
            found.push(Repository { alias, path });
        }
    }
    found
}

/// Chooses the repositories to read and their line layout.
///
/// Configured repositories win unless `local` is set or none are configured;
/// then the repository around `cwd` is used.
pub fn resolve_repositories(
    configured: &BTreeMap<String, String>,
    local: bool,
    cwd: &Path,
) -> Result<(Vec<Repository>, LogFormat)> {
    if !local && !configured.is_empty() {
        let repos = configured
            .iter()
            .map(|(alias, path)| Repository {
                alias: alias.clone(),
                path: PathBuf::from(path),
            })
            .collect();
        return Ok((repos, LogFormat::Tagged));
    }
    let Some(path) = find_git_repository(cwd) else {
        bail!(
            "no git repository found searching upward from {}; run inside a repository or add one with `g2log config add-repo`",
            cwd.display()
        );
    };
    let alias = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("local")
        .to_string();
    Ok((vec![Repository { alias, path }], LogFormat::Local))
}

/// Maps the `today` shorthand to git's start of day; other values pass through.
pub fn since_arg(since: &str) -> &str {
    if since.trim().eq_ignore_ascii_case("today") {
        "midnight"
    } else {
        since
    }
}

fn pretty_arg(repo: &Repository, format: LogFormat) -> String {
    match format {
        LogFormat::Tagged => format!(
            "--pretty=format:{} | %ad | %s%n%b%n",
            repo.alias.replace('%', "%%")
        ),
        LogFormat::Local => "--pretty=format:%ad: %s%n%b%n".to_string(),
    }
}

fn filter_args(query: &LogQuery<'_>) -> Vec<String> {
    let mut args = Vec::new();
    if !query.author.trim().is_empty() {
        args.push(format!("--author={}", query.author.trim()));
    }
    args.push(format!("--since={}", since_arg(query.since)));
    args.push(format!("--until={}", query.until));
    args.push("--no-merges".to_string());
    args
}

/// Arguments for `git` that print the commits of `repo` matching `query`.
pub fn log_args(repo: &Repository, query: &LogQuery<'_>, format: LogFormat) -> Vec<String> {
    let mut args = vec![
        "-C".to_string(),
        repo.path.display().to_string(),
        "log".to_string(),
    ];
    args.extend(filter_args(query));
    args.push(DATE_FORMAT_ARG.to_string());
    args.push(pretty_arg(repo, format));
    args
}

fn run_git(args: &[String]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .context("failed to run git; is it installed and on PATH?")?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// True when `path` is inside a git work tree.
pub fn is_work_tree(path: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["rev-parse", "--is-inside-work-tree"])
        .output()
        .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true")
        .unwrap_or(false)
}

/// Formatted commit log of one repository.
pub fn read_log(repo: &Repository, query: &LogQuery<'_>, format: LogFormat) -> Result<String> {
    run_git(&log_args(repo, query, format))
}

/// Number of commits of one repository matching `query`.
pub fn count_commits(repo: &Repository, query: &LogQuery<'_>) -> Result<usize> {
    let mut args = vec![
        "-C".to_string(),
        repo.path.display().to_string(),
        "rev-list".to_string(),
        "--count".to_string(),
    ];
    args.extend(filter_args(query));
    args.push("HEAD".to_string());
    let out = run_git(&args)?;
    out.trim()
        .parse()
        .with_context(|| format!("unexpected rev-list output: {}", out.trim()))
}

/// Reads every repository and joins the non-empty logs with a blank line.
///
/// Invalid or unreadable repositories are skipped with a warning.
pub fn collect_logs(
    repos: &[Repository],
    query: &LogQuery<'_>,
    format: LogFormat,
) -> CollectedLogs {
    let mut parts = Vec::new();
    let mut collected = CollectedLogs::default();
    for repo in repos {
        if !is_work_tree(&repo.path) {
            warn!(alias = %repo.alias, path = %repo.path.display(), "not a git work tree, skipping");
            continue;
        }
        let log = match read_log(repo, query, format) {
            Ok(log) => log,
            Err(err) => {
                warn!(alias = %repo.alias, error = %err, "failed to read git log, skipping");
                continue;
            }
        };
        collected.repositories_read += 1;
        if log.trim().is_empty() {
            debug!(alias = %repo.alias, "no matching commits");
            continue;
        }
        match count_commits(repo, query) {
            Ok(count) => collected.commit_count += count,
            Err(err) => debug!(alias = %repo.alias, error = %err, "commit count unavailable"),
        }
        parts.push(log.trim_end().to_string());
    }
    collected.text = parts.join("\n\n");
    collected
}
