//! Integration tests for certificate rotation and rollback

mod common;

use common::{fixture, snapshot, FakeRunner};
use pki_ops::config::ReloadMethod;
use pki_ops::models::{RotationState, StepStatus};
use pki_ops::openssl::KeySpec;
use pki_ops::rotation::{default_state_file, RotationConfig, Rotator};
use pki_ops::utils::RotationError;
use pki_ops::ToolkitError;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use tempfile::TempDir;

/// Temp tree with `certs/web.{crt,key}` copied from the fixtures
struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new(cert: &str, key: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let certs = root.path().join("certs");
        fs::create_dir_all(&certs).unwrap();
        fs::copy(fixture(cert), certs.join("web.crt")).unwrap();
        fs::copy(fixture(key), certs.join("web.key")).unwrap();
        Self { root }
    }

    fn cert_dir(&self) -> PathBuf {
        self.root.path().join("certs")
    }

    fn backup_root(&self) -> PathBuf {
        self.root.path().join("backups")
    }

    fn config(&self) -> RotationConfig {
        RotationConfig {
            service: "web".to_string(),
            cert_dir: self.cert_dir(),
            backup_root: self.backup_root(),
            state_file: default_state_file(&self.backup_root(), "web"),
            key: KeySpec::Rsa { bits: 2048 },
            days: 90,
            subject: "/CN=web.example.com".to_string(),
            sans: vec!["web.example.com".to_string(), "10.0.0.5".to_string()],
            ca_url: None,
            reload: ReloadMethod::None,
            renew_within: None,
            force: false,
            dry_run: false,
        }
    }
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let ws = Workspace::new("service.crt", "service.key");
    let before = snapshot(ws.root.path());

    let runner = FakeRunner::new();
    let mut config = ws.config();
    config.dry_run = true;
    config.reload = ReloadMethod::Systemctl;
    let outcome = Rotator::new(&runner, "openssl", config).rotate().await.unwrap();

    assert_eq!(snapshot(ws.root.path()), before);
    assert!(runner.calls().is_empty());
    assert!(outcome.dry_run);
    assert!(!outcome.changed);
    assert!(outcome.state.is_none());
    assert_eq!(outcome.steps[0].status, StepStatus::Done);
    assert!(outcome.steps[1..]
        .iter()
        .all(|s| s.status == StepStatus::Planned));
    assert!(outcome
        .steps
        .iter()
        .any(|s| s.description == "Reload web via systemctl"));
}

#[tokio::test]
async fn test_rotation_then_rollback_restores_original_bytes() {
    let ws = Workspace::new("service.crt", "service.key");
    let original = snapshot(&ws.cert_dir());
    let original_cert = fs::read(ws.cert_dir().join("web.crt")).unwrap();

    let runner = FakeRunner::new();
    let rotator = Rotator::new(&runner, "openssl", ws.config());
    let outcome = rotator.rotate().await.unwrap();
    assert!(outcome.changed);

    // new material is installed, staging is gone
    let rotated_cert = fs::read(ws.cert_dir().join("web.crt")).unwrap();
    assert_ne!(rotated_cert, original_cert);
    assert_eq!(rotated_cert, fs::read(fixture("expiring.crt")).unwrap());
    assert!(ws.cert_dir().join("web.csr").exists());
    assert_eq!(fs::read_dir(ws.cert_dir()).unwrap().count(), 3);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(ws.cert_dir().join("web.key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let req = &runner.calls_to("openssl", "req")[0];
    assert!(req.contains("-subj /CN=web.example.com"));
    assert!(req.contains("subjectAltName=DNS:web.example.com,IP:10.0.0.5"));

    let state_path = default_state_file(&ws.backup_root(), "web");
    let state = RotationState::load(&state_path).unwrap();
    assert_eq!(Some(&state), outcome.state.as_ref());
    assert!(state.backup_path.starts_with(ws.backup_root()));
    assert_eq!(
        fs::read(state.backup_path.join("web.crt")).unwrap(),
        original_cert
    );
    assert!(state.fingerprint.is_some());

    let rollback = rotator.rollback(|_| true).unwrap();
    assert!(rollback.changed);
    assert_eq!(snapshot(&ws.cert_dir()), original);
}

#[tokio::test]
async fn test_reload_runs_after_state_is_recorded() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new().failing_program("systemctl");
    let mut config = ws.config();
    config.reload = ReloadMethod::Systemctl;

    let err = Rotator::new(&runner, "openssl", config)
        .rotate()
        .await
        .unwrap_err();
    assert!(matches!(err, ToolkitError::Command(_)));
    assert!(runner.calls().contains(&"systemctl reload web".to_string()));
    assert!(default_state_file(&ws.backup_root(), "web").exists());
}

#[tokio::test]
async fn test_certificate_not_due_is_left_alone() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new();
    let mut config = ws.config();
    config.renew_within = Some(30);

    let outcome = Rotator::new(&runner, "openssl", config).rotate().await.unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.steps.last().unwrap().status, StepStatus::Skipped);
    assert!(runner.calls().is_empty());
    assert!(!ws.backup_root().exists());
}

#[tokio::test]
async fn test_expiring_certificate_is_rotated() {
    let ws = Workspace::new("expiring.crt", "expiring.key");
    let runner = FakeRunner::new();
    let mut config = ws.config();
    config.renew_within = Some(30);

    let outcome = Rotator::new(&runner, "openssl", config).rotate().await.unwrap();
    assert!(outcome.changed);
    assert_eq!(runner.calls_to("openssl", "genpkey").len(), 1);
}

#[tokio::test]
async fn test_force_overrides_the_renewal_window() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new();
    let mut config = ws.config();
    config.renew_within = Some(30);
    config.force = true;

    let outcome = Rotator::new(&runner, "openssl", config).rotate().await.unwrap();
    assert!(outcome.changed);
}

#[tokio::test]
async fn test_missing_cert_dir_is_an_error() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new();
    let mut config = ws.config();
    config.cert_dir = ws.root.path().join("nope");

    let err = Rotator::new(&runner, "openssl", config)
        .rotate()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::Rotation(RotationError::CertDirMissing { .. })
    ));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_failed_swap_records_the_newest_backup() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new();
    let rotator = Rotator::new(&runner, "openssl", ws.config());
    let first = rotator.rotate().await.unwrap().state.unwrap();

    // second generation on disk; a directory in place of the CSR makes the swap fail
    fs::write(ws.cert_dir().join("web.crt"), "GEN1 CERT").unwrap();
    fs::remove_file(ws.cert_dir().join("web.csr")).unwrap();
    fs::create_dir(ws.cert_dir().join("web.csr")).unwrap();
    thread::sleep(std::time::Duration::from_millis(5));

    let err = rotator.rotate().await.unwrap_err();
    assert!(matches!(err, ToolkitError::Io(_)));

    let state = RotationState::load(&default_state_file(&ws.backup_root(), "web")).unwrap();
    assert_ne!(state.backup_path, first.backup_path);
    let newest = fs::read_dir(ws.backup_root())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .max()
        .unwrap();
    assert_eq!(state.backup_path, newest);
    assert_eq!(
        fs::read_to_string(state.backup_path.join("web.crt")).unwrap(),
        "GEN1 CERT"
    );
}

#[tokio::test]
async fn test_self_signing_needs_openssl_3() {
    let ws = Workspace::new("service.crt", "service.key");
    let original = fs::read(ws.cert_dir().join("web.crt")).unwrap();
    let runner = FakeRunner::new().with_version("OpenSSL 1.1.1w  11 Sep 2023");

    let err = Rotator::new(&runner, "openssl", ws.config())
        .rotate()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::Rotation(RotationError::OpensslTooOld { .. })
    ));
    assert!(runner.calls_to("openssl", "x509").is_empty());
    assert_eq!(fs::read(ws.cert_dir().join("web.crt")).unwrap(), original);
}

#[test]
fn test_rollback_without_backup_fails_and_touches_nothing() {
    let ws = Workspace::new("service.crt", "service.key");
    let config = ws.config();
    RotationState {
        service: "web".to_string(),
        cert_dir: ws.cert_dir(),
        backup_path: ws.backup_root().join("web-20240101T000000.000Z"),
        timestamp: chrono::Utc::now(),
        fingerprint: None,
    }
    .save(&config.state_file)
    .unwrap();
    let before = snapshot(&ws.cert_dir());

    let runner = FakeRunner::new();
    let err = Rotator::new(&runner, "openssl", config)
        .rollback(|_| true)
        .unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::Rotation(RotationError::BackupMissing { .. })
    ));
    assert_eq!(snapshot(&ws.cert_dir()), before);
}

#[test]
fn test_rollback_without_state_file_fails() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new();
    let err = Rotator::new(&runner, "openssl", ws.config())
        .rollback(|_| true)
        .unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::Rotation(RotationError::StateMissing { .. })
    ));
}

#[tokio::test]
async fn test_declined_rollback_changes_nothing() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new();
    let rotator = Rotator::new(&runner, "openssl", ws.config());
    rotator.rotate().await.unwrap();
    let rotated = snapshot(&ws.cert_dir());

    let err = rotator.rollback(|_| false).unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::Rotation(RotationError::RollbackDeclined)
    ));
    assert_eq!(snapshot(&ws.cert_dir()), rotated);
}

#[tokio::test]
async fn test_dry_run_rollback_only_plans() {
    let ws = Workspace::new("service.crt", "service.key");
    let runner = FakeRunner::new();
    Rotator::new(&runner, "openssl", ws.config())
        .rotate()
        .await
        .unwrap();
    let rotated = snapshot(ws.root.path());

    let mut config = ws.config();
    config.dry_run = true;
    let outcome = Rotator::new(&runner, "openssl", config)
        .rollback(|_| panic!("dry run must not ask"))
        .unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.steps.last().unwrap().status, StepStatus::Planned);
    assert_eq!(snapshot(ws.root.path()), rotated);
}

/// Accept one HTTP request, answer it, and hand back the raw request
fn serve_once(status: &'static str, body: Vec<u8>) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/sign", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "connection closed before headers");
            request.extend_from_slice(&chunk[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&request[..header_end]).to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while request.len() < header_end + length {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "connection closed before body");
            request.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/x-pem-file\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request).to_string()
    });
    (url, handle)
}

#[tokio::test]
async fn test_ca_signed_certificate_is_installed() {
    let ws = Workspace::new("expiring.crt", "expiring.key");
    let issued = fs::read(fixture("service.crt")).unwrap();
    let (url, server) = serve_once("200 OK", issued.clone());

    let runner = FakeRunner::new();
    let mut config = ws.config();
    config.ca_url = Some(url);
    let outcome = Rotator::new(&runner, "openssl", config).rotate().await.unwrap();

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /sign"));
    assert!(request
        .to_ascii_lowercase()
        .contains("content-type: application/pkcs10"));
    assert!(request.contains("BEGIN CERTIFICATE REQUEST"));

    assert!(outcome.changed);
    assert_eq!(fs::read(ws.cert_dir().join("web.crt")).unwrap(), issued);
    assert!(runner.calls_to("openssl", "x509").is_empty());
}

#[tokio::test]
async fn test_ca_rejection_leaves_certificate_in_place() {
    let ws = Workspace::new("expiring.crt", "expiring.key");
    let original = fs::read(ws.cert_dir().join("web.crt")).unwrap();
    let (url, server) = serve_once("403 Forbidden", b"not allowed".to_vec());

    let runner = FakeRunner::new();
    let mut config = ws.config();
    config.ca_url = Some(url);
    let err = Rotator::new(&runner, "openssl", config)
        .rotate()
        .await
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(
        err,
        ToolkitError::Rotation(RotationError::CaSubmission { .. })
    ));
    assert!(err.to_string().contains("403"));
    assert_eq!(fs::read(ws.cert_dir().join("web.crt")).unwrap(), original);
    assert!(!ws.cert_dir().join("web.csr").exists());
}
