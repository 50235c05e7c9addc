use std::collections::HashMap;

use rollout_core::trigger::RunMetadata;
use rollout_core::types::TriggerEvent;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn outside_actions_is_none() {
    assert!(RunMetadata::from_github_env(lookup(&[("GITHUB_REF_NAME", "main")])).is_none());
    assert!(RunMetadata::from_github_env(lookup(&[("GITHUB_ACTIONS", "false")])).is_none());
}

#[test]
fn push_uses_ref_name() {
    let run = RunMetadata::from_github_env(lookup(&[
        ("GITHUB_ACTIONS", "true"),
        ("GITHUB_EVENT_NAME", "push"),
        ("GITHUB_REF_NAME", "feature/login"),
        ("GITHUB_HEAD_REF", ""),
        ("GITHUB_SHA", "9f2c1e7b4d0a8c6e"),
        ("GITHUB_REPOSITORY", "acme/billing"),
        ("GITHUB_ACTOR", "octocat"),
    ]))
    .unwrap();

    assert_eq!(run.event, TriggerEvent::Push);
    assert_eq!(run.branch, "feature/login");
    assert_eq!(run.commit, "9f2c1e7b4d0a8c6e");
    assert_eq!(run.short_commit(), "9f2c1e7");
    assert_eq!(run.repository, "acme/billing");
    assert_eq!(run.actor, "octocat");
}

#[test]
fn pull_request_uses_head_ref() {
    let run = RunMetadata::from_github_env(lookup(&[
        ("GITHUB_ACTIONS", "true"),
        ("GITHUB_EVENT_NAME", "pull_request"),
        ("GITHUB_REF_NAME", "42/merge"),
        ("GITHUB_HEAD_REF", "bug/crash"),
    ]))
    .unwrap();

    assert_eq!(run.event, TriggerEvent::PullRequest);
    assert_eq!(run.branch, "bug/crash");
}

#[test]
fn unknown_event_defaults_to_push() {
    let run = RunMetadata::from_github_env(lookup(&[
        ("GITHUB_ACTIONS", "true"),
        ("GITHUB_EVENT_NAME", "workflow_dispatch"),
        ("GITHUB_REF_NAME", "main"),
    ]))
    .unwrap();

    assert_eq!(run.event, TriggerEvent::Push);
    assert_eq!(run.branch, "main");
}

#[test]
fn event_names_parse() {
    assert_eq!(TriggerEvent::parse("push"), Some(TriggerEvent::Push));
    assert_eq!(TriggerEvent::parse("pr"), Some(TriggerEvent::PullRequest));
    assert_eq!(
        TriggerEvent::parse("pull-request"),
        Some(TriggerEvent::PullRequest)
    );
    assert_eq!(TriggerEvent::parse("tag"), None);
}
