use rollout_core::environment::{HostnameOverrides, resolve_environment};
use mockito::Matcher;
use rollout_core::notify::{Notification, Notifier, NotifyStatus, SlackNotifier, SlackPayload};
use rollout_core::trigger::RunMetadata;
use rollout_core::types::TriggerEvent;
use serde_json::json;
use url::Url;

fn run() -> RunMetadata {
    RunMetadata::new("main", TriggerEvent::Push)
        .with_repository("acme/billing")
        .with_commit("9f2c1e7b4d0a8c6e")
        .with_actor("octocat")
}

fn field<'a>(payload: &'a SlackPayload, title: &str) -> Option<&'a str> {
    payload.attachments[0]
        .fields
        .iter()
        .find(|f| f.title == title)
        .map(|f| f.value.as_str())
}

#[test]
fn success_payload_names_target() {
    let selection = resolve_environment("main", &HostnameOverrides::default()).unwrap();
    let notification = Notification::new(NotifyStatus::Success, "billing", &run(), Some(&selection));

    let payload = SlackPayload::from_notification(&notification);

    assert_eq!(
        payload.text,
        ":white_check_mark: billing pipeline success to Production (prod01)"
    );
    assert_eq!(payload.attachments[0].color, "good");
    assert_eq!(field(&payload, "Status"), Some("success"));
    assert_eq!(field(&payload, "Repository"), Some("acme/billing"));
    assert_eq!(field(&payload, "Branch"), Some("main"));
    assert_eq!(field(&payload, "Commit"), Some("9f2c1e7"));
    assert_eq!(field(&payload, "Triggered by"), Some("octocat"));
    assert_eq!(field(&payload, "Failed stage"), None);
}

#[test]
fn failure_payload_without_environment() {
    let notification =
        Notification::new(NotifyStatus::Failure, "billing", &run(), None).with_failed_stage("lint");

    let payload = SlackPayload::from_notification(&notification);

    assert_eq!(payload.text, ":x: billing pipeline failure");
    assert_eq!(payload.attachments[0].color, "danger");
    assert_eq!(field(&payload, "Failed stage"), Some("lint"));
}

#[test]
fn payload_serializes_to_webhook_shape() {
    let notification = Notification::new(NotifyStatus::Success, "billing", &run(), None);
    let json = serde_json::to_value(SlackPayload::from_notification(&notification)).unwrap();

    assert!(json["text"].is_string());
    let fields = json["attachments"][0]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[0]["title"], "Status");
    assert_eq!(fields[0]["short"], true);
}

fn webhook(server: &mockito::Server) -> Url {
    Url::parse(&format!("{}/services/T0/B0/X", server.url())).unwrap()
}

#[test]
fn notifier_posts_payload_to_webhook() {
    let notification =
        Notification::new(NotifyStatus::Failure, "billing", &run(), None).with_failed_stage("deploy");
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/services/T0/B0/X")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "text": ":x: billing pipeline failure",
            "attachments": [{ "color": "danger" }],
        })))
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create();

    SlackNotifier::new(webhook(&server))
        .notify(&notification)
        .unwrap();

    mock.assert();
}

#[test]
fn notifier_fails_on_error_status() {
    let notification = Notification::new(NotifyStatus::Success, "billing", &run(), None);
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/services/T0/B0/X")
        .with_status(500)
        .with_body("internal_error")
        .create();

    let err = SlackNotifier::new(webhook(&server))
        .notify(&notification)
        .unwrap_err();

    assert!(err.to_string().contains("Slack webhook returned HTTP 500"));
}
