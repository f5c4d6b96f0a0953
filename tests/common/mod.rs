#![allow(dead_code)]

use std::time::Duration;

pub use tsforge_test_utils::{
    CountingCleaner, RecordingBackend, TestProject, TranscribingBackend, init_tracing,
    session_with, with_timeout,
};

/// Poll `cond` every 20ms until it holds (bounded by `with_timeout`).
pub async fn wait_until<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    with_timeout(async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}
