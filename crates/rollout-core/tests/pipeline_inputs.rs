use rollout_core::config::RolloutConfig;
use rollout_core::environment::OverrideError;
use rollout_core::inputs::{InputError, InputOverrides, PipelineInputs};
use rollout_core::types::Environment;

fn config() -> RolloutConfig {
    let mut config = RolloutConfig::new();
    config.app.name = Some("billing".to_string());
    config
}

#[test]
fn defaults_apply_when_unset() {
    let inputs = PipelineInputs::resolve(&config(), &InputOverrides::default()).unwrap();

    assert_eq!(inputs.app_name, "billing");
    assert_eq!(inputs.app_port, 7868);
    assert_eq!(inputs.python_version, "3.12");
    assert_eq!(inputs.health_check_path, "/health");
    assert!(inputs.environment_hostnames.is_empty());
    assert!(inputs.slack_webhook_url.is_none());
}

#[test]
fn app_name_is_required() {
    let err = PipelineInputs::resolve(&RolloutConfig::new(), &InputOverrides::default())
        .unwrap_err();
    assert_eq!(err, InputError::MissingAppName);

    let blank = InputOverrides {
        app_name: Some("  ".to_string()),
        ..InputOverrides::default()
    };
    assert_eq!(
        PipelineInputs::resolve(&RolloutConfig::new(), &blank).unwrap_err(),
        InputError::MissingAppName
    );
}

#[test]
fn flags_replace_config_values() {
    let mut config = config();
    config.app.port = Some(8000);
    config.app.environment_hostnames = Some("dev=from-config".to_string());

    let overrides = InputOverrides {
        app_port: Some("9000".to_string()),
        python_version: Some("3.11".to_string()),
        environment_hostnames: Some("prod=from-flag".to_string()),
        ..InputOverrides::default()
    };
    let inputs = PipelineInputs::resolve(&config, &overrides).unwrap();

    assert_eq!(inputs.app_port, 9000);
    assert_eq!(inputs.python_version, "3.11");
    assert_eq!(
        inputs.environment_hostnames.get(Environment::Production),
        Some("from-flag")
    );
    assert_eq!(inputs.environment_hostnames.get(Environment::Development), None);
}

#[test]
fn config_port_used_without_flag() {
    let mut config = config();
    config.app.port = Some(8000);

    let inputs = PipelineInputs::resolve(&config, &InputOverrides::default()).unwrap();
    assert_eq!(inputs.app_port, 8000);
}

#[test]
fn invalid_port_rejected() {
    for raw in ["0", "65536", "http", ""] {
        let overrides = InputOverrides {
            app_port: Some(raw.to_string()),
            ..InputOverrides::default()
        };
        assert!(
            matches!(
                PipelineInputs::resolve(&config(), &overrides),
                Err(InputError::InvalidPort { .. })
            ),
            "{raw:?}"
        );
    }
}

#[test]
fn relative_health_path_rejected() {
    let overrides = InputOverrides {
        health_check_path: Some("health".to_string()),
        ..InputOverrides::default()
    };
    assert_eq!(
        PipelineInputs::resolve(&config(), &overrides).unwrap_err(),
        InputError::InvalidHealthPath {
            value: "health".to_string()
        }
    );
}

#[test]
fn protocol_relative_health_path_rejected() {
    for raw in ["//health", "//evil.example/health"] {
        let overrides = InputOverrides {
            health_check_path: Some(raw.to_string()),
            ..InputOverrides::default()
        };
        assert_eq!(
            PipelineInputs::resolve(&config(), &overrides).unwrap_err(),
            InputError::InvalidHealthPath {
                value: raw.to_string()
            }
        );
    }
}

#[test]
fn protocol_relative_health_path_rejected_in_config() {
    let mut config = config();
    config.app.health_check_path = Some("//other/x".to_string());
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("app.health_check_path"));
}

#[test]
fn webhook_must_be_http_url() {
    let valid = InputOverrides {
        slack_webhook_url: Some("https://hooks.slack.com/services/T0/B0/X".to_string()),
        ..InputOverrides::default()
    };
    let inputs = PipelineInputs::resolve(&config(), &valid).unwrap();
    assert_eq!(
        inputs.slack_webhook_url.unwrap().host_str(),
        Some("hooks.slack.com")
    );

    let ftp = InputOverrides {
        slack_webhook_url: Some("ftp://example.com/hook".to_string()),
        ..InputOverrides::default()
    };
    assert!(matches!(
        PipelineInputs::resolve(&config(), &ftp),
        Err(InputError::InvalidWebhookUrl { .. })
    ));

    let garbage = InputOverrides {
        slack_webhook_url: Some("not a url".to_string()),
        ..InputOverrides::default()
    };
    assert!(PipelineInputs::resolve(&config(), &garbage).is_err());
}

#[test]
fn blank_webhook_means_no_notification() {
    let overrides = InputOverrides {
        slack_webhook_url: Some(String::new()),
        ..InputOverrides::default()
    };
    let inputs = PipelineInputs::resolve(&config(), &overrides).unwrap();
    assert!(inputs.slack_webhook_url.is_none());
}

#[test]
fn malformed_hostnames_surface_override_error() {
    let overrides = InputOverrides {
        environment_hostnames: Some("dev".to_string()),
        ..InputOverrides::default()
    };
    assert_eq!(
        PipelineInputs::resolve(&config(), &overrides).unwrap_err(),
        InputError::Hostnames(OverrideError::MissingSeparator {
            segment: "dev".to_string()
        })
    );
}

#[test]
fn serialized_inputs_hide_webhook() {
    let overrides = InputOverrides {
        slack_webhook_url: Some("https://hooks.slack.com/services/T0/B0/SECRET".to_string()),
        environment_hostnames: Some("dev=d1".to_string()),
        ..InputOverrides::default()
    };
    let inputs = PipelineInputs::resolve(&config(), &overrides).unwrap();
    let json = serde_json::to_string(&inputs).unwrap();

    assert!(!json.contains("SECRET"));
    assert!(json.contains("\"environment_hostnames\":\"dev=d1\""));
}
