use std::fs;

use grading_orchestrator::models::{load_submission_manifest, Payload};
use tempfile::tempdir;
use tokio_test::{assert_err, assert_ok};

const MANIFEST: &str = r#"
[[submissions]]
id = "alice-essay"
kind = "text"
content = "The French Revolution began in 1789."
subject = "history"
feedback_language = "hi"
audio_feedback = true
voice_profile = "teacher"

[[submissions]]
id = "bob-worksheet"
kind = "handwritten"
file = "scans/bob.png"
subject = "mathematics"
"#;

#[tokio::test]
async fn test_load_manifest_and_payloads() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("scans")).unwrap();
    fs::write(dir.path().join("scans/bob.png"), [0x89, b'P', b'N', b'G']).unwrap();
    let manifest_path = dir.path().join("submissions.toml");
    fs::write(&manifest_path, MANIFEST).unwrap();

    let manifest = assert_ok!(load_submission_manifest(&manifest_path).await);

    assert_eq!(manifest.submissions.len(), 2);
    assert_eq!(manifest.base_dir, dir.path());

    let alice = &manifest.submissions[0];
    assert!(alice.audio_feedback);
    assert_eq!(alice.options().subject.as_deref(), Some("history"));
    assert_eq!(
        assert_ok!(alice.load_payload(&manifest.base_dir).await),
        Payload::Text("The French Revolution began in 1789.".to_string())
    );

    let bob = &manifest.submissions[1];
    assert!(!bob.audio_feedback);
    assert_eq!(
        assert_ok!(bob.load_payload(&manifest.base_dir).await),
        Payload::Bytes(vec![0x89, b'P', b'N', b'G'])
    );
}

#[tokio::test]
async fn test_entry_needs_exactly_one_source() {
    let dir = tempdir().unwrap();
    let manifest_path = dir.path().join("submissions.toml");
    fs::write(
        &manifest_path,
        r#"
[[submissions]]
id = "both"
kind = "text"
content = "inline"
file = "answer.txt"

[[submissions]]
id = "neither"
kind = "text"
"#,
    )
    .unwrap();

    let manifest = assert_ok!(load_submission_manifest(&manifest_path).await);

    for entry in &manifest.submissions {
        assert_err!(entry.load_payload(&manifest.base_dir).await);
    }
}

#[tokio::test]
async fn test_missing_manifest_is_an_error() {
    let dir = tempdir().unwrap();
    assert_err!(load_submission_manifest(&dir.path().join("nope.toml")).await);
}

#[tokio::test]
async fn test_unknown_kind_is_kept_for_dispatch() {
    let dir = tempdir().unwrap();
    let manifest_path = dir.path().join("submissions.toml");
    fs::write(
        &manifest_path,
        "[[submissions]]\nid = \"clip\"\nkind = \"video\"\ncontent = \"...\"\n",
    )
    .unwrap();

    let manifest = assert_ok!(load_submission_manifest(&manifest_path).await);
    assert_eq!(manifest.submissions[0].kind, "video");
}
