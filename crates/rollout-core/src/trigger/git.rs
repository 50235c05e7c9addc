//! Run metadata from a local git checkout.

use std::path::Path;

use anyhow::Context;
use git2::Repository;

use crate::types::TriggerEvent;

use super::RunMetadata;

/// Discover the repository containing `path` and describe its HEAD as a push.
pub fn metadata_from_repository(path: &Path) -> anyhow::Result<RunMetadata> {
    let repo = Repository::discover(path)
        .with_context(|| format!("No git repository found at {}", path.display()))?;

    let head = repo
        .head()
        .context("Repository has no HEAD commit yet. Pass --branch and --commit explicitly")?;
    if !head.is_branch() {
        anyhow::bail!("HEAD is detached. Pass --branch explicitly");
    }
    let branch = head
        .shorthand()
        .ok_or_else(|| anyhow::anyhow!("Branch name is not valid UTF-8"))?
        .to_string();
    let commit = head
        .peel_to_commit()
        .context("Failed to resolve HEAD commit")?
        .id()
        .to_string();

    let repository = origin_slug(&repo)
        .or_else(|| {
            repo.workdir()
                .and_then(|dir| dir.file_name())
                .map(|name| name.to_string_lossy().to_string())
        })
        .unwrap_or_default();

    let actor = repo
        .config()
        .ok()
        .and_then(|config| config.get_string("user.name").ok())
        .unwrap_or_default();

    Ok(RunMetadata {
        repository,
        branch,
        commit,
        actor,
        event: TriggerEvent::Push,
    })
}

fn origin_slug(repo: &Repository) -> Option<String> {
    let remote = repo.find_remote("origin").ok()?;
    remote.url().and_then(slug_from_remote_url)
}

/// `git@github.com:owner/repo.git` and `https://github.com/owner/repo` both
/// become `owner/repo`.
pub fn slug_from_remote_url(url: &str) -> Option<String> {
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/')?.1,
        None => url.split_once(':')?.1,
    };
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.rsplit('/');
    let repo = parts.next().filter(|s| !s.is_empty())?;
    match parts.next().filter(|s| !s.is_empty()) {
        Some(owner) => Some(format!("{owner}/{repo}")),
        None => Some(repo.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_ssh_url() {
        assert_eq!(
            slug_from_remote_url("git@github.com:acme/inventory-api.git").as_deref(),
            Some("acme/inventory-api")
        );
    }

    #[test]
    fn slug_from_https_url() {
        assert_eq!(
            slug_from_remote_url("https://github.com/acme/inventory-api").as_deref(),
            Some("acme/inventory-api")
        );
    }

    #[test]
    fn slug_from_local_path_is_none() {
        assert_eq!(slug_from_remote_url("/srv/git/repo"), None);
    }
}
