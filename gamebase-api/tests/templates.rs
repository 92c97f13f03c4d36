use std::fs;
use std::path::{Path, PathBuf};

use gamebase_api::resources::{ResourceKind, ResourceWrapper};
use gamebase_api::templates::{TemplateLoadError, TemplateRegistry};
use gamebase_telemetry::init_test_tracing;
use tempfile::TempDir;

fn catalog_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Copies the echo template into `root` under `name`.
fn copy_echo(root: &Path, name: &str) -> PathBuf {
    let source = catalog_root().join("echo");
    let target = root.join(name);
    fs::create_dir_all(&target).unwrap();
    for kind in ResourceKind::ALL {
        let manifest = fs::read_to_string(source.join(kind.manifest_file())).unwrap();
        fs::write(
            target.join(kind.manifest_file()),
            manifest.replace("gameserver: echo", &format!("gameserver: {name}")),
        )
        .unwrap();
    }

    target
}

#[test]
fn the_bundled_catalog_loads() {
    init_test_tracing();

    let registry = TemplateRegistry::load_all(&catalog_root()).unwrap();

    assert_eq!(registry.names(), vec!["echo".to_string()]);
    let echo = registry.get("echo").unwrap();
    assert_eq!(echo.config_map().name(), None);
    assert_eq!(
        echo.deployment().object().metadata.generate_name.as_deref(),
        Some("echo-deployment-")
    );
}

#[test]
fn a_template_missing_a_manifest_is_excluded() {
    init_test_tracing();
    let root = TempDir::new().unwrap();
    copy_echo(root.path(), "arena");
    let broken = copy_echo(root.path(), "lobby");
    fs::remove_file(broken.join(ResourceKind::Service.manifest_file())).unwrap();

    let registry = TemplateRegistry::load_all(root.path()).unwrap();

    assert_eq!(registry.names(), vec!["arena".to_string()]);
    assert!(registry.get("lobby").is_none());
}

#[test]
fn a_deployment_without_containers_is_excluded() {
    init_test_tracing();
    let root = TempDir::new().unwrap();
    copy_echo(root.path(), "arena");
    let broken = copy_echo(root.path(), "empty");
    fs::write(
        broken.join(ResourceKind::Deployment.manifest_file()),
        r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: empty
  labels:
    gameserver: empty
    deploymentType: gameserver
spec:
  selector:
    matchLabels:
      gameserver: empty
  template:
    metadata:
      labels:
        gameserver: empty
    spec:
      containers: []
"#,
    )
    .unwrap();

    let registry = TemplateRegistry::load_all(root.path()).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.get("empty").is_none());
}

#[test]
fn a_manifest_of_the_wrong_kind_is_excluded() {
    init_test_tracing();
    let root = TempDir::new().unwrap();
    let broken = copy_echo(root.path(), "swapped");
    fs::copy(
        broken.join(ResourceKind::Service.manifest_file()),
        broken.join(ResourceKind::VolumeClaim.manifest_file()),
    )
    .unwrap();

    let registry = TemplateRegistry::load_all(root.path()).unwrap();

    assert!(registry.is_empty());
}

#[test]
fn an_unreadable_root_fails_the_load() {
    init_test_tracing();
    let root = TempDir::new().unwrap();

    let err = TemplateRegistry::load_all(&root.path().join("missing")).unwrap_err();

    assert!(matches!(err, TemplateLoadError::ReadRoot { .. }));
}
