// tests/integration_test.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Repository as Git2Repo, Signature, Time};
use tempfile::TempDir;
use version_sync::config::{Config, ManifestConfig, SourceConfig};
use version_sync::git::{Git2Repository, Repository};
use version_sync::orchestration::Reconciler;
use version_sync::publish::Persisted;
use version_sync::reconcile::Outcome;
use version_sync::warning::SyncWarning;

/// 2025-03-05 17:30 UTC
const COMMIT_TIME: i64 = 1_741_195_800;

fn init_repo(path: &Path) -> Git2Repo {
    let repo = Git2Repo::init(path).expect("Could not init git repo");
    {
        let mut config = repo.config().expect("Could not get config");
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }
    repo
}

/// Commit `files` on HEAD with a fixed committer time.
fn commit_files(repo: &Git2Repo, files: &[(&str, &str)], offset_minutes: i32) -> git2::Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (name, content) in files {
        fs::write(workdir.join(name), content).unwrap();
        index.add_path(Path::new(name)).unwrap();
    }
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::new(
        "Test User",
        "test@example.com",
        &Time::new(COMMIT_TIME, offset_minutes),
    )
    .unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, "work", &tree, &parents)
        .unwrap()
}

/// Monitored repository with a `development` branch at a single commit.
fn source_repo(dir: &Path) -> git2::Oid {
    let repo = init_repo(dir);
    let oid = commit_files(&repo, &[("game.txt", "level 1")], -180);
    let commit = repo.find_commit(oid).unwrap();
    repo.branch("development", &commit, false).unwrap();
    oid
}

fn expected_label(oid: git2::Oid) -> String {
    format!(
        "HYPE-05.03-14.30-{}",
        oid.to_string()[..7].to_uppercase()
    )
}

fn config(source: &Path, work: &Path) -> Config {
    Config {
        workdir: work.to_path_buf(),
        source: SourceConfig {
            repo_path: source.to_path_buf(),
            ..SourceConfig::default()
        },
        manifest: Some(ManifestConfig {
            path: PathBuf::from("hype.rb"),
            branch: None,
        }),
        ..Config::default()
    }
}

#[test]
fn test_version_sync_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_version-sync"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version-sync"));
    assert!(stdout.contains("--once"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_once_with_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "interval_secs = 0\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_version-sync"))
        .arg("--once")
        .arg("--config")
        .arg(&path)
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}

#[test]
fn test_commit_stamp_uses_committer_offset() {
    let dir = TempDir::new().unwrap();
    let oid = source_repo(dir.path());
    let repo = Git2Repository::open(dir.path()).unwrap();

    let id = repo.resolve_ref("development").unwrap();
    assert_eq!(id, oid.to_string());

    let stamp = repo.commit_stamp(&id).unwrap();
    assert_eq!(stamp.committed_at.format("%d.%m-%H.%M").to_string(), "05.03-14.30");
}

#[test]
fn test_full_pass_against_real_repositories() {
    let source_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();

    let tip = source_repo(source_dir.path());
    let label = expected_label(tip);

    let work = init_repo(work_dir.path());
    commit_files(
        &work,
        &[
            ("hype_maps", "HYPE-01.01-00.00-OLDHASH"),
            ("hype.rb", "cask 'hype' do\n  version \"HYPE-01.01-00.00-OLDHASH\"\nend\n"),
        ],
        0,
    );
    Git2Repo::init_bare(remote_dir.path()).unwrap();
    work.remote("origin", remote_dir.path().to_str().unwrap())
        .unwrap();

    let reconciler = Reconciler::new(
        config(source_dir.path(), work_dir.path()),
        Git2Repository::open(source_dir.path()).unwrap(),
        Git2Repository::from_git2(work),
    );

    let report = reconciler.run_pass().unwrap();

    // the monitored repository has no remote to fetch from
    assert!(matches!(
        report.warnings.as_slice(),
        [SyncWarning::FetchFailed { .. }]
    ));
    assert_eq!(report.version.to_string(), label);
    assert_eq!(
        fs::read_to_string(work_dir.path().join("hype_maps")).unwrap(),
        label
    );
    assert_eq!(
        fs::read_to_string(work_dir.path().join("hype.rb")).unwrap(),
        format!("cask 'hype' do\n  version \"{}\"\nend\n", label)
    );
    assert!(matches!(
        report.marker.persisted,
        Persisted::Committed { pushed: true, .. }
    ));

    let manifest = report.manifest.expect("manifest report");
    let head = match manifest.persisted {
        Persisted::Committed { commit, pushed } => {
            assert!(pushed);
            commit
        }
        other => panic!("manifest not committed: {:?}", other),
    };

    // both commits reached the remote and the tree is clean
    let work = reconciler.work();
    let branch = work.current_branch().unwrap();
    let remote = Git2Repository::open(remote_dir.path()).unwrap();
    assert_eq!(remote.resolve_ref(&branch).unwrap(), head);
    assert!(work.status().unwrap().is_empty());

    let again = reconciler.run_pass().unwrap();
    assert_eq!(again.marker.outcome, Outcome::Unchanged);
    assert_eq!(again.marker.persisted, Persisted::Skipped);
    assert_eq!(
        again.manifest.map(|m| m.outcome),
        Some(Outcome::Unchanged)
    );
}

#[test]
fn test_missing_reference_branch_fails_pass() {
    let source_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();

    let source = init_repo(source_dir.path());
    commit_files(&source, &[("game.txt", "level 1")], 0);
    let work = init_repo(work_dir.path());
    commit_files(&work, &[("hype_maps", "HYPE-01.01-00.00-OLDHASH")], 0);

    let mut config = config(source_dir.path(), work_dir.path());
    config.manifest = None;
    let reconciler = Reconciler::new(
        config,
        Git2Repository::from_git2(source),
        Git2Repository::from_git2(work),
    );

    assert!(reconciler.run_pass().is_err());
    assert_eq!(
        fs::read_to_string(work_dir.path().join("hype_maps")).unwrap(),
        "HYPE-01.01-00.00-OLDHASH"
    );
}

#[test]
fn test_pass_with_workdir_in_subdirectory() {
    let source_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();

    let tip = source_repo(source_dir.path());
    let work = init_repo(work_dir.path());
    fs::create_dir(work_dir.path().join("sub")).unwrap();
    commit_files(&work, &[("sub/hype_maps", "HYPE-01.01-00.00-OLDHASH")], 0);

    let subdir = work_dir.path().join("sub");
    let mut config = config(source_dir.path(), &subdir);
    config.manifest = None;
    config.behavior.push = false;
    let reconciler = Reconciler::new(
        config,
        Git2Repository::open(source_dir.path()).unwrap(),
        Git2Repository::open(&subdir).unwrap(),
    );

    let report = reconciler.run_pass().unwrap();

    assert!(report.marker.outcome.is_changed());
    assert!(matches!(
        report.marker.persisted,
        Persisted::Committed { pushed: false, .. }
    ));
    assert!(reconciler.work().status().unwrap().is_empty());

    let tree = work.head().unwrap().peel_to_tree().unwrap();
    let blob = work
        .find_blob(tree.get_path(Path::new("sub/hype_maps")).unwrap().id())
        .unwrap();
    assert_eq!(blob.content(), expected_label(tip).as_bytes());

    let again = reconciler.run_pass().unwrap();
    assert_eq!(again.marker.outcome, Outcome::Unchanged);
    assert_eq!(again.marker.persisted, Persisted::Skipped);
}
