//! Settings, credential wiring and output documents. No network access.

use clap::Parser;
use msk_admin::auth::{keys, AuthError, Credential, Mechanism};
use msk_admin::connect::{bootstrap_servers, delete_topic, resolve_credential};
use msk_admin::output::{error_kind, failure, success};
use msk_admin::profiles::{ProfileCatalog, ProfileError};
use msk_admin::schema::RegistryError;
use msk_admin::topics::AdminError;
use msk_admin::{LogFormat, Settings};
use serde_json::json;

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    settings: Settings,
}

fn parse(args: &[&str]) -> Settings {
    let mut argv = vec!["msk-admin"];
    argv.extend_from_slice(args);
    TestCli::try_parse_from(argv).unwrap().settings
}

#[test]
fn test_flags_map_to_env_names() {
    let settings = parse(&[
        "--aws-region",
        "eu-central-1",
        "--bootstrap",
        "b-1:9096",
        "--security-protocol",
        "SASL_SSL",
        "--sasl-mechanism",
        "SCRAM-SHA-512",
        "--sasl-username",
        "admin",
        "--sasl-password",
        "hunter2",
        "--glue-registry-name",
        "events",
    ]);

    let map = settings.to_settings_map();
    assert_eq!(map.get("AWS_REGION").map(String::as_str), Some("eu-central-1"));
    assert_eq!(map.get("KAFKA_BOOTSTRAP").map(String::as_str), Some("b-1:9096"));
    assert_eq!(map.get(keys::KAFKA_SASL_USERNAME).map(String::as_str), Some("admin"));
    assert_eq!(map.get(keys::KAFKA_SASL_PASSWORD).map(String::as_str), Some("hunter2"));
    assert_eq!(map.get("GLUE_REGISTRY_NAME").map(String::as_str), Some("events"));
    assert_eq!(settings.mechanism().unwrap(), Mechanism::ScramSha512);
}

#[test]
fn test_blank_values_left_out_of_settings_map() {
    let settings = parse(&["--sasl-username", "  ", "--bootstrap", ""]);
    let map = settings.to_settings_map();
    assert!(!map.contains_key(keys::KAFKA_SASL_USERNAME));
    assert!(!map.contains_key("KAFKA_BOOTSTRAP"));
    assert!(settings.bootstrap().is_none());
}

#[test]
fn test_masked_hides_secrets() {
    let settings = parse(&[
        "--sasl-password",
        "hunter2",
        "--aws-secret-access-key",
        "wJalrXUtnFEMI",
        "--ssl-key-location",
        "/etc/kafka/client.key",
        "--sasl-username",
        "admin",
        "--log-format",
        "json",
    ]);
    assert_eq!(settings.log_format, LogFormat::Json);

    let masked = settings.masked();
    let rendered = serde_json::to_string(&masked).unwrap();
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("wJalrXUtnFEMI"));
    assert!(!rendered.contains("client.key"));
    assert_eq!(
        masked.get("KAFKA_SASL_PASSWORD").cloned().flatten().as_deref(),
        Some("***MASKED***")
    );
    assert_eq!(
        masked.get("KAFKA_SASL_USERNAME").cloned().flatten().as_deref(),
        Some("admin")
    );
    assert_eq!(masked.get("LOG_FORMAT").cloned().flatten().as_deref(), Some("json"));
}

#[test]
fn test_resolve_credential_names_missing_setting() {
    let settings = parse(&[
        "--security-protocol",
        "SASL_SSL",
        "--sasl-mechanism",
        "SCRAM-SHA-512",
        "--sasl-username",
        "admin",
    ]);
    let err = resolve_credential(&settings).unwrap_err();
    assert_eq!(error_kind(&err), "MissingCredentialField");
    assert!(err.to_string().contains(keys::KAFKA_SASL_PASSWORD));
}

#[test]
fn test_resolve_credential_iam_static_keys() {
    let settings = parse(&[
        "--security-protocol",
        "SASL_SSL",
        "--sasl-mechanism",
        "OAUTHBEARER",
        "--aws-region",
        "us-west-2",
        "--aws-access-key-id",
        "AKIDEXAMPLE",
        "--aws-secret-access-key",
        "secret",
    ]);
    let (mechanism, credential) = resolve_credential(&settings).unwrap();
    assert_eq!(mechanism, Mechanism::IamOauthBearer);
    match credential {
        Credential::Iam(identity) => assert_eq!(identity.region, "us-west-2"),
        other => panic!("unexpected credential {other:?}"),
    }
}

#[test]
fn test_plaintext_is_unsupported() {
    let settings = parse(&["--security-protocol", "PLAINTEXT"]);
    let err = resolve_credential(&settings).unwrap_err();
    assert_eq!(error_kind(&err), "UnsupportedMechanism");
}

#[tokio::test]
async fn test_explicit_bootstrap_wins() {
    let settings = parse(&["--bootstrap", " b-1:9098,b-2:9098 "]);
    let servers = bootstrap_servers(&settings, Mechanism::IamOauthBearer)
        .await
        .unwrap();
    assert_eq!(servers, "b-1:9098,b-2:9098");
}

#[tokio::test]
async fn test_unconfirmed_delete_fails_before_connecting() {
    // password missing: any connection attempt fails on credentials
    let settings = parse(&[
        "--security-protocol",
        "SASL_SSL",
        "--sasl-mechanism",
        "SCRAM-SHA-512",
        "--sasl-username",
        "admin",
        "--bootstrap",
        "b-1:9096",
    ]);
    let catalog = ProfileCatalog::builtin();

    let err = delete_topic(&settings, &catalog, "orders", false)
        .await
        .unwrap_err();
    assert_eq!(error_kind(&err), "ConfirmationRequired");
    assert!(err.to_string().contains("orders"));

    let err = delete_topic(&settings, &catalog, "orders", true)
        .await
        .unwrap_err();
    assert_eq!(error_kind(&err), "MissingCredentialField");
}

#[test]
fn test_error_kind_through_context() {
    let err = anyhow::Error::from(AdminError::TopicNotFound("orders".to_string()))
        .context("topics delete failed");
    assert_eq!(error_kind(&err), "TopicNotFound");

    let err = anyhow::Error::from(RegistryError::IncompatibleSchema {
        name: "user_event".to_string(),
        reason: "required field 'email' was removed".to_string(),
    });
    assert_eq!(error_kind(&err), "IncompatibleSchema");

    let err = anyhow::Error::from(AdminError::from(ProfileError::UnknownProfile {
        name: "fast".to_string(),
        available: "general_throughput".to_string(),
    }));
    assert_eq!(error_kind(&err), "UnknownProfile");

    let err = anyhow::Error::from(AuthError::CredentialUnavailable("expired".to_string()));
    assert_eq!(error_kind(&err), "CredentialUnavailable");

    assert_eq!(error_kind(&anyhow::anyhow!("boom")), "Error");
}

#[test]
fn test_success_merges_object_payload() {
    let doc = success("list_topics", &json!({ "count": 1, "topics": ["orders"] })).unwrap();
    assert_eq!(
        doc,
        json!({
            "status": "success",
            "operation": "list_topics",
            "count": 1,
            "topics": ["orders"],
        })
    );

    let doc = success("version", &"0.3.0").unwrap();
    assert_eq!(doc["result"], json!("0.3.0"));
}

#[test]
fn test_failure_document() {
    let err = anyhow::Error::from(AdminError::PropagationTimeout {
        topic: "orders".to_string(),
        waited_ms: 30000,
    });
    let doc = failure("create_topic", &err);
    assert_eq!(doc["status"], json!("error"));
    assert_eq!(doc["operation"], json!("create_topic"));
    assert_eq!(doc["error_type"], json!("PropagationTimeout"));
    assert!(doc["error"].as_str().unwrap().contains("orders"));
}
