mod common;

use std::time::Duration;

use common::*;
use tsforge::config::UserOptions;
use tsforge::engine::Coordinator;

fn watched_project() -> TestProject {
    TestProject::new()
        .with_file("src/a.ts", "export const a = 'one';\n")
        .with_file("src/b.ts", "export const b = 2;\n")
        .with_file("tsforge.toml", "entry = [\"src/a.ts\"]\nwatch = true\n")
}

#[tokio::test]
async fn config_edit_restarts_with_new_entries() {
    init_tracing();
    let project = watched_project();
    let backend = TranscribingBackend::new();
    let session = session_with(project.options(), backend.clone()).without_watcher();

    let state = session.build_all().await.unwrap();
    assert!(state.is_watching());
    assert!(project.exists("dist/a.mjs"));
    assert!(!project.exists("dist/b.mjs"));

    let coordinator = Coordinator::new(session, state).unwrap();
    let handle = coordinator.handle();
    let run = tokio::spawn(coordinator.run());

    let config = project.write("tsforge.toml", "entry = [\"src/a.ts\", \"src/b.ts\"]\nwatch = true\n");
    handle.notify_changed(vec![config]).await;

    wait_until(|| project.exists("dist/b.mjs")).await;
    assert!(project.exists("dist/a.mjs"));

    handle.request_shutdown().await;
    with_timeout(run).await.unwrap().unwrap();
}

#[tokio::test]
async fn source_edit_rebuilds_without_restart() {
    let project = watched_project();
    let backend = TranscribingBackend::new();
    let session = session_with(project.options(), backend.clone()).without_watcher();

    let state = session.build_all().await.unwrap();
    let coordinator = Coordinator::new(session, state).unwrap();
    let handle = coordinator.handle();
    let run = tokio::spawn(coordinator.run());

    let source = project.write("src/a.ts", "export const a = 'two';\n");
    handle.notify_changed(vec![source]).await;

    wait_until(|| project.try_read("dist/a.mjs").is_some_and(|s| s.contains("'two'"))).await;
    assert_eq!(backend.invocations(), 2);

    handle.request_shutdown().await;
    with_timeout(run).await.unwrap().unwrap();
}

#[tokio::test]
async fn broken_config_keeps_previous_build() {
    let project = watched_project();
    let backend = TranscribingBackend::new();
    let session = session_with(project.options(), backend.clone()).without_watcher();

    let state = session.build_all().await.unwrap();
    let coordinator = Coordinator::new(session, state).unwrap();
    let handle = coordinator.handle();
    let run = tokio::spawn(coordinator.run());

    let config = project.write("tsforge.toml", "entry = [\"src/missing.ts\"]\nwatch = true\n");
    handle.notify_changed(vec![config]).await;

    // Still serving rebuilds from the old drivers.
    let source = project.write("src/a.ts", "export const a = 'three';\n");
    handle.notify_changed(vec![source]).await;
    wait_until(|| project.try_read("dist/a.mjs").is_some_and(|s| s.contains("'three'"))).await;

    handle.request_shutdown().await;
    with_timeout(run).await.unwrap().unwrap();
}

#[tokio::test]
async fn real_watcher_picks_up_changes() {
    let project = watched_project();
    let backend = TranscribingBackend::new();
    let session = session_with(project.options(), backend.clone())
        .with_debounce(Duration::from_millis(50));

    let state = session.build_all().await.unwrap();
    let coordinator = Coordinator::new(session, state).unwrap();
    let handle = coordinator.handle();
    let run = tokio::spawn(coordinator.run());

    // Let the OS watcher settle before editing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    project.write("src/a.ts", "export const a = 'watched';\n");

    wait_until(|| project.try_read("dist/a.mjs").is_some_and(|s| s.contains("'watched'"))).await;

    handle.request_shutdown().await;
    with_timeout(run).await.unwrap().unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_cwd_does_not_rebuild_on_own_output() {
    let project = watched_project();
    let links = tempfile::tempdir().unwrap();
    let link = links.path().join("project");
    std::os::unix::fs::symlink(project.root(), &link).unwrap();

    let user = UserOptions {
        cwd: Some(link),
        ..project.options()
    };
    let backend = TranscribingBackend::new();
    let session = session_with(user, backend.clone()).with_debounce(Duration::from_millis(50));

    let state = session.build_all().await.unwrap();
    let coordinator = Coordinator::new(session, state).unwrap();
    let handle = coordinator.handle();
    let run = tokio::spawn(coordinator.run());

    tokio::time::sleep(Duration::from_millis(200)).await;
    project.write("src/a.ts", "export const a = 'once';\n");
    wait_until(|| project.try_read("dist/a.mjs").is_some_and(|s| s.contains("'once'"))).await;

    // Output writes land under the watched root; none of them may trigger a cycle.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.invocations(), 2);

    handle.request_shutdown().await;
    with_timeout(run).await.unwrap().unwrap();
}
