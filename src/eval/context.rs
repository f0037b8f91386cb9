use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The event that triggered the CI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GithubEvent {
    Push,
    #[default]
    PullRequest,
    PullRequestReview,
    PullRequestTarget,
    PullRequestWorkflow,
    Schedule,
    WorkflowRun,
}

impl GithubEvent {
    pub const ALL: &'static [GithubEvent] = &[
        GithubEvent::Push,
        GithubEvent::PullRequest,
        GithubEvent::PullRequestReview,
        GithubEvent::PullRequestTarget,
        GithubEvent::PullRequestWorkflow,
        GithubEvent::Schedule,
        GithubEvent::WorkflowRun,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GithubEvent::Push => "push",
            GithubEvent::PullRequest => "pull_request",
            GithubEvent::PullRequestReview => "pull_request_review",
            GithubEvent::PullRequestTarget => "pull_request_target",
            GithubEvent::PullRequestWorkflow => "pull_request_workflow",
            GithubEvent::Schedule => "schedule",
            GithubEvent::WorkflowRun => "workflow_run",
        }
    }

    /// Push and scheduled runs always exercise the full matrix.
    pub fn is_push_or_schedule(self) -> bool {
        matches!(self, GithubEvent::Push | GithubEvent::Schedule)
    }
}

impl fmt::Display for GithubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown github event {0:?}")]
pub struct UnknownEvent(pub String);

impl FromStr for GithubEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GithubEvent::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

fn default_branch() -> String {
    "main".into()
}

/// Everything known about a single CI run.
///
/// Built once per invocation; the engine takes ownership and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunContext {
    /// Changed file paths, relative to the repository root, in diff order.
    #[serde(default)]
    pub files: Vec<String>,
    /// Branch the run targets.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Commit under test. Absent when the diff base is unknown.
    #[serde(default)]
    pub commit_ref: Option<String>,
    /// Labels attached to the triggering pull request.
    #[serde(default)]
    pub pr_labels: BTreeSet<String>,
    #[serde(default)]
    pub github_event: GithubEvent,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            default_branch: default_branch(),
            commit_ref: None,
            pr_labels: BTreeSet::new(),
            github_event: GithubEvent::default(),
        }
    }
}

impl RunContext {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_commit_ref(mut self, commit_ref: impl Into<String>) -> Self {
        self.commit_ref = Some(commit_ref.into());
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.pr_labels.insert(label.into());
        self
    }

    pub fn with_event(mut self, event: GithubEvent) -> Self {
        self.github_event = event;
        self
    }

    /// An empty commit ref is as good as none.
    pub fn has_commit_ref(&self) -> bool {
        self.commit_ref.as_deref().is_some_and(|r| !r.is_empty())
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.pr_labels.contains(label)
    }
}
