#![allow(dead_code)]

pub use watchgraph_test_utils::builders;
pub use watchgraph_test_utils::fakes;
pub use watchgraph_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;

use watchgraph::fs::FileSystem;
use watchgraph::orchestrator::Orchestrator;

/// Orchestrator for package `nrser` rooted at `/pkg` on the given mock fs.
pub fn orchestrator(fs: Arc<dyn FileSystem>) -> Orchestrator {
    Orchestrator::new("nrser", "/pkg", fs).expect("valid package")
}

/// Poll `cond` every 10ms until it holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    with_timeout(async {
        while !cond() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
}
