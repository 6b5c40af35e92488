//! Tests for the `upload_volume` use-case against in-memory ports.

#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::time::Duration;

use hcutils_cli::application::services::upload::{UploadRequest, upload_volume};
use hcutils_cli::domain::error::{HcError, find_hc_error};
use hcutils_cli::domain::transfer::upload_command;
use tempfile::TempDir;

use crate::fakes::{FakeCloud, FakeProbe, FakeShell, ScriptedPrompt, World, tar_gz};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn world() -> World {
    World::new(
        FakeCloud::default(),
        FakeShell::serving(Vec::new()),
        ScriptedPrompt::default(),
    )
}

/// A gzipped tarball on disk and a request to upload it.
fn archive_request(dir: &TempDir, name: Option<&str>) -> (UploadRequest, Vec<u8>) {
    let bytes = tar_gz(&[
        ("etc/app.conf", b"port = 8080\n".as_slice()),
        ("data/blob", [7u8; 4096].as_slice()),
    ]);
    let source = dir.path().join("volume.tar.gz");
    std::fs::write(&source, &bytes).expect("write archive");
    let req = UploadRequest {
        source,
        name: name.map(str::to_string),
        location: "fsn1".into(),
        size_gb: 10,
    };
    (req, bytes)
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_creates_volume_and_streams_archive() {
    let dir = TempDir::new().expect("tempdir");
    let world = world();
    let (req, bytes) = archive_request(&dir, None);

    let report = upload_volume(&world.pipeline(), &req).await.expect("upload");

    assert!(report.volume.name.starts_with("hcutil-uploaded-volume-"));
    assert_eq!(report.volume.size_gb, 10);
    assert_eq!(report.volume.location, "fsn1");
    assert_eq!(report.bytes, bytes.len() as u64);

    let log = world.shell.log();
    assert_eq!(log.received, bytes);
    assert_eq!(log.commands, vec![upload_command(report.volume.id)]);
    drop(log);

    let state = world.cloud.state.lock().expect("lock");
    let spec = &state.volume_specs[0];
    assert!(spec.automount);
    assert_eq!(spec.format, "ext4");
    assert_eq!(spec.labels.get("created-by").map(String::as_str), Some("hcutils"));
    assert!(state.volumes.contains_key(&report.volume.id), "uploaded volume is kept");
}

#[tokio::test]
async fn upload_uses_requested_volume_name() {
    let dir = TempDir::new().expect("tempdir");
    let world = world();
    let (req, _) = archive_request(&dir, Some("my-uploaded-volume"));

    let report = upload_volume(&world.pipeline(), &req).await.expect("upload");
    assert_eq!(report.volume.name, "my-uploaded-volume");
}

#[tokio::test]
async fn key_registration_is_removed_right_after_server_creation() {
    let dir = TempDir::new().expect("tempdir");
    let world = world();
    let (req, _) = archive_request(&dir, Some("restore"));

    upload_volume(&world.pipeline(), &req).await.expect("upload");

    let (servers, keys) = world.cloud.created();
    assert_eq!(
        world.cloud.calls(),
        vec![
            "create_ssh_key".to_string(),
            "create_server fsn1".to_string(),
            format!("delete_ssh_key {}", keys[0]),
            "create_volume restore 10".to_string(),
            format!("delete_server {}", servers[0]),
        ]
    );
    assert!(world.cloud.leftovers().is_empty());
}

// ── Failures and teardown ─────────────────────────────────────────────────────

#[tokio::test]
async fn reachability_timeout_deletes_server_and_key() {
    let dir = TempDir::new().expect("tempdir");
    let mut world = world();
    world.probe = FakeProbe::down();
    world.settings.poll.reachability_timeout = Duration::from_millis(20);
    let (req, _) = archive_request(&dir, None);

    let err = upload_volume(&world.pipeline(), &req).await.expect_err("timeout");

    assert!(matches!(
        err.downcast_ref::<HcError>(),
        Some(HcError::ReachabilityTimeout { .. })
    ));
    let calls = world.cloud.calls();
    assert!(!calls.iter().any(|c| c.starts_with("create_volume")));
    assert!(world.cloud.leftovers().is_empty());
}

#[tokio::test]
async fn early_key_deletion_failure_stops_before_volume_is_created() {
    let dir = TempDir::new().expect("tempdir");
    let world = World::new(
        FakeCloud::default().failing(|f| f.delete_ssh_key = true),
        FakeShell::serving(Vec::new()),
        ScriptedPrompt::default(),
    );
    let (req, _) = archive_request(&dir, None);

    let err = upload_volume(&world.pipeline(), &req)
        .await
        .expect_err("key cleanup failed");

    assert!(format!("{err:#}").contains("failed to delete SSH key"));
    let (servers, keys) = world.cloud.created();
    assert_eq!(
        world.cloud.calls(),
        vec![
            "create_ssh_key".to_string(),
            "create_server fsn1".to_string(),
            format!("delete_ssh_key {}", keys[0]),
            format!("delete_server {}", servers[0]),
            format!("delete_ssh_key {}", keys[0]),
        ],
        "no volume is created and the key deletion is retried during teardown"
    );
    assert!(world.shell.log().opened.is_empty());
    assert!(world.cloud.state.lock().expect("lock").servers.is_empty());
}

#[tokio::test]
async fn key_left_by_failed_early_deletion_is_removed_in_teardown() {
    let dir = TempDir::new().expect("tempdir");
    let world = World::new(
        FakeCloud::default().failing(|f| f.delete_ssh_key_once = true),
        FakeShell::serving(Vec::new()),
        ScriptedPrompt::default(),
    );
    let (req, _) = archive_request(&dir, None);

    let err = upload_volume(&world.pipeline(), &req)
        .await
        .expect_err("early key deletion failed");

    assert!(matches!(
        find_hc_error(&err),
        Some(HcError::Api { status: 503, .. })
    ));
    assert!(world.cloud.leftovers().is_empty(), "no orphaned key or server");
    assert!(world.cloud.state.lock().expect("lock").volume_specs.is_empty());
}

#[tokio::test]
async fn volume_creation_failure_removes_server() {
    let dir = TempDir::new().expect("tempdir");
    let world = World::new(
        FakeCloud::default().failing(|f| f.create_volume = true),
        FakeShell::serving(Vec::new()),
        ScriptedPrompt::default(),
    );
    let (req, _) = archive_request(&dir, None);

    let err = upload_volume(&world.pipeline(), &req).await.expect_err("create volume");

    assert!(format!("{err:#}").contains("failed to create volume"));
    assert!(world.cloud.leftovers().is_empty());
    assert!(world.shell.log().opened.is_empty());
}

#[tokio::test]
async fn remote_extract_failure_is_a_transfer_error() {
    let dir = TempDir::new().expect("tempdir");
    let mut world = world();
    world.shell.exit = hcutils_cli::application::ports::RemoteExit {
        code: Some(2),
        stderr: "gzip: stdin: not in gzip format".into(),
    };
    let (req, _) = archive_request(&dir, None);

    let err = upload_volume(&world.pipeline(), &req).await.expect_err("extract");

    assert!(matches!(
        find_hc_error(&err),
        Some(HcError::Transfer { code: Some(2), .. })
    ));
    assert!(world.cloud.leftovers().is_empty());
}

// ── Input validation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_input_is_rejected_before_anything_is_created() {
    let dir = TempDir::new().expect("tempdir");
    let world = world();
    let (good, _) = archive_request(&dir, None);

    let cases = [
        UploadRequest { size_gb: 5, ..good.clone() },
        UploadRequest { size_gb: 20_000, ..good.clone() },
        UploadRequest { location: String::new(), ..good.clone() },
        UploadRequest { name: Some("  ".into()), ..good.clone() },
        UploadRequest { source: dir.path().to_path_buf(), ..good.clone() },
    ];
    for req in &cases {
        let err = upload_volume(&world.pipeline(), req).await.expect_err("invalid");
        assert!(
            matches!(err.downcast_ref::<HcError>(), Some(HcError::InvalidInput(_))),
            "unexpected error for {req:?}: {err:#}"
        );
    }
    assert!(world.cloud.calls().is_empty());
}

#[tokio::test]
async fn missing_source_file_is_a_local_error() {
    let world = world();
    let req = UploadRequest {
        source: PathBuf::from("/nonexistent/volume.tar.gz"),
        name: None,
        location: "fsn1".into(),
        size_gb: 10,
    };

    let err = upload_volume(&world.pipeline(), &req).await.expect_err("missing file");

    assert!(matches!(err.downcast_ref::<HcError>(), Some(HcError::LocalIo { .. })));
    assert!(world.cloud.calls().is_empty());
}
