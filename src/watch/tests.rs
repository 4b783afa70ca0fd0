use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use super::*;

fn set_mtime(path: &Path, secs: u64) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

/// Three manifests with pinned mtimes.
fn make_files() -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    let paths: Vec<_> = ["a.toml", "b.toml", "c.toml"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            fs::write(&path, format!("# {name}")).unwrap();
            set_mtime(&path, 1_000);
            path
        })
        .collect();
    (dir, paths)
}

#[test]
fn test_poll_after_baseline_is_empty() {
    let (_dir, paths) = make_files();
    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(paths.clone());

    assert_eq!(watcher.len(), 3);
    assert!(watcher.poll().is_empty());
    assert!(watcher.poll().is_empty());
}

#[test]
fn test_poll_reports_only_touched_location() {
    let (_dir, paths) = make_files();

    for target in &paths {
        let mut watcher = ChangeWatcher::new(false);
        watcher.baseline(paths.clone());

        set_mtime(target, 2_000);
        assert_eq!(watcher.poll(), vec![target.clone()]);

        // restore for the next iteration
        set_mtime(target, 1_000);
    }
}

#[test]
fn test_poll_does_not_consume_changes() {
    let (_dir, paths) = make_files();
    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(paths.clone());

    set_mtime(&paths[1], 2_000);
    assert_eq!(watcher.poll(), vec![paths[1].clone()]);
    assert_eq!(watcher.poll(), vec![paths[1].clone()]);

    watcher.baseline(paths.clone());
    assert!(watcher.poll().is_empty());
}

#[test]
fn test_deleted_file_counts_as_changed() {
    let (_dir, paths) = make_files();
    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(paths.clone());

    fs::remove_file(&paths[0]).unwrap();
    assert_eq!(watcher.poll(), vec![paths[0].clone()]);

    // Advancing over the missing file settles it
    watcher.baseline(paths.clone());
    assert!(watcher.poll().is_empty());
    assert_eq!(watcher.entries()[0].mtime, None);

    // Restoring it is a change again
    fs::write(&paths[0], "# restored").unwrap();
    assert_eq!(watcher.poll(), vec![paths[0].clone()]);
}

#[test]
fn test_baseline_replaces_previous_set() {
    let (_dir, paths) = make_files();
    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(paths.clone());
    watcher.baseline(vec![paths[2].clone()]);

    assert_eq!(watcher.len(), 1);
    assert!(!watcher.is_watching(&paths[0]));

    set_mtime(&paths[0], 2_000);
    assert!(watcher.poll().is_empty());
}

#[test]
fn test_baseline_dedups() {
    let (_dir, paths) = make_files();
    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(vec![
        paths[1].clone(),
        paths[0].clone(),
        paths[1].clone(),
    ]);

    assert_eq!(watcher.len(), 2);
    assert_eq!(watcher.entries()[0].path, paths[1]);
}

#[test]
fn test_package_member_added() {
    let dir = TempDir::new().unwrap();
    let package = dir.path().join("orders");
    fs::create_dir(&package).unwrap();
    fs::write(package.join("processor.toml"), "").unwrap();

    let mut watcher = ChangeWatcher::new(true);
    watcher.baseline(vec![package.clone()]);
    assert!(watcher.entries()[0].hash.is_none());
    assert_eq!(
        watcher.entries()[0].members,
        Some(vec![package.join("processor.toml")])
    );

    fs::write(package.join("refunds.toml"), "").unwrap();
    assert_eq!(watcher.poll(), vec![package]);
}

#[test]
fn test_package_ignores_non_manifests() {
    let dir = TempDir::new().unwrap();
    let package = dir.path().join("orders");
    fs::create_dir(&package).unwrap();
    fs::write(package.join("processor.toml"), "").unwrap();

    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(vec![package.clone()]);

    fs::write(package.join(".processor.toml.swp"), "swap").unwrap();
    fs::write(package.join("processor.toml~"), "backup").unwrap();
    fs::write(package.join("README.md"), "# orders").unwrap();
    assert!(watcher.poll().is_empty());

    fs::remove_file(package.join("processor.toml")).unwrap();
    assert_eq!(watcher.poll(), vec![package.clone()]);
}

#[test]
fn test_package_removed_counts_as_changed() {
    let dir = TempDir::new().unwrap();
    let package = dir.path().join("orders");
    fs::create_dir(&package).unwrap();

    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(vec![package.clone()]);
    assert_eq!(watcher.entries()[0].members, Some(Vec::new()));

    fs::remove_dir(&package).unwrap();
    assert_eq!(watcher.poll(), vec![package]);
}

#[test]
fn test_touch_reported_without_content_hash() {
    let (_dir, paths) = make_files();
    let mut watcher = ChangeWatcher::new(false);
    watcher.baseline(paths.clone());

    set_mtime(&paths[0], 2_000);
    assert_eq!(watcher.poll(), vec![paths[0].clone()]);
}

#[test]
fn test_content_hash_absorbs_touch() {
    let (_dir, paths) = make_files();
    let mut watcher = ChangeWatcher::new(true);
    watcher.baseline(paths.clone());

    set_mtime(&paths[0], 2_000);
    assert!(watcher.poll().is_empty());
    // The entry now carries the new mtime, no rehash on the next poll
    assert_eq!(
        watcher.entries()[0].mtime,
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(2_000))
    );

    fs::write(&paths[0], "# edited").unwrap();
    set_mtime(&paths[0], 3_000);
    assert_eq!(watcher.poll(), vec![paths[0].clone()]);
}
