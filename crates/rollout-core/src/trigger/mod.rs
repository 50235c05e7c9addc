//! Run metadata: which branch, commit and actor triggered the pipeline.

pub mod git;

use serde::Serialize;

use crate::types::TriggerEvent;

pub use git::metadata_from_repository;

/// Identity of a pipeline run, as reported in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    pub repository: String,
    pub branch: String,
    pub commit: String,
    pub actor: String,
    pub event: TriggerEvent,
}

impl RunMetadata {
    pub fn new(branch: impl Into<String>, event: TriggerEvent) -> Self {
        Self {
            repository: String::new(),
            branch: branch.into(),
            commit: String::new(),
            actor: String::new(),
            event,
        }
    }

    /// Read GitHub Actions variables through `lookup`.
    ///
    /// Returns `None` unless `GITHUB_ACTIONS` is `true`. Pull requests use
    /// the head branch; pushes use the ref name.
    pub fn from_github_env<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("GITHUB_ACTIONS").as_deref() != Some("true") {
            return None;
        }

        let event = lookup("GITHUB_EVENT_NAME")
            .as_deref()
            .and_then(TriggerEvent::parse)
            .unwrap_or_default();

        let branch = match event {
            TriggerEvent::PullRequest => lookup("GITHUB_HEAD_REF").filter(|b| !b.is_empty()),
            TriggerEvent::Push => None,
        }
        .or_else(|| lookup("GITHUB_REF_NAME"))
        .unwrap_or_default();

        Some(Self {
            repository: lookup("GITHUB_REPOSITORY").unwrap_or_default(),
            branch,
            commit: lookup("GITHUB_SHA").unwrap_or_default(),
            actor: lookup("GITHUB_ACTOR").unwrap_or_default(),
            event,
        })
    }

    /// Read GitHub Actions variables from the process environment.
    pub fn from_process_env() -> Option<Self> {
        Self::from_github_env(|key| std::env::var(key).ok())
    }

    /// Abbreviated commit id for display.
    pub fn short_commit(&self) -> &str {
        let end = self
            .commit
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.commit.len());
        &self.commit[..end]
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = commit.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }
}
