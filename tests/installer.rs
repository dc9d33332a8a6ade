//! Installing into versioned and unversioned local paths

mod helper;

use std::sync::Arc;

use isofetch::fetch::FetchSession;
use isofetch::installer::{FileTemplate, backup_path, install};
use isofetch::manager::MirrorManager;

use helper::{FakeMirror, GOOD_CONTENT, serve_all};

async fn manager(mirrors: &[FakeMirror]) -> MirrorManager {
    let session = FetchSession::new(Arc::new(serve_all(mirrors)));
    MirrorManager::new(mirrors.iter().map(FakeMirror::mirror).collect(), session)
        .await
        .unwrap()
}

#[tokio::test]
async fn versioned_install_replaces_previous_version() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tool-1.1.iso"), b"previous").unwrap();
    let template = FileTemplate::new(dir.path().join("tool-[[VER]].iso")).unwrap();
    let mut manager = manager(&[FakeMirror::new("a.test", "1.2", 1)]).await;

    let path = install(&template, &mut manager).await.unwrap();

    assert_eq!(path, dir.path().join("tool-1.2.iso"));
    assert_eq!(std::fs::read(&path).unwrap(), GOOD_CONTENT);
    assert!(!dir.path().join("tool-1.1.iso").exists());
}

#[tokio::test]
async fn versioned_install_keeps_previous_version_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tool-1.1.iso"), b"previous").unwrap();
    let template = FileTemplate::new(dir.path().join("tool-[[VER]].iso")).unwrap();
    let mut manager = manager(&[FakeMirror::new("a.test", "1.2", 1).corrupted()]).await;

    install(&template, &mut manager).await.unwrap_err();

    assert_eq!(std::fs::read(dir.path().join("tool-1.1.iso")).unwrap(), b"previous");
    assert!(!dir.path().join("tool-1.2.iso").exists());
}

#[tokio::test]
async fn unversioned_install_replaces_file_and_drops_backup() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("tool.iso");
    std::fs::write(&target, b"previous").unwrap();
    let template = FileTemplate::new(&target).unwrap();
    let mut manager = manager(&[FakeMirror::new("a.test", "1.2", 1)]).await;

    install(&template, &mut manager).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), GOOD_CONTENT);
    assert!(!backup_path(&target).exists());
}

#[tokio::test]
async fn unversioned_install_restores_backup_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("tool.iso");
    std::fs::write(&target, b"previous").unwrap();
    let template = FileTemplate::new(&target).unwrap();
    let mut manager = manager(&[FakeMirror::new("a.test", "1.2", 1).corrupted()]).await;

    install(&template, &mut manager).await.unwrap_err();

    assert_eq!(std::fs::read(&target).unwrap(), b"previous");
    assert!(!backup_path(&target).exists());
}

#[tokio::test]
async fn update_check_uses_manager_version() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tool-1.2.iso"), b"current").unwrap();
    let template = FileTemplate::new(dir.path().join("tool-[[VER]].iso")).unwrap();
    let manager = manager(&[FakeMirror::new("a.test", "1.2", 1)]).await;

    let available = template.update_available(manager.version().unwrap()).unwrap();

    assert!(!available);
}
