mod support;

use docsql::{is_any_query_pending, pending_queries, stmt::FindOptions};
use std::time::Duration;
use support::RecordingDriver;

// Kept as the only test in this binary; the counter is process-wide.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queries_are_counted_while_executing() {
    let driver = RecordingDriver::new();
    driver.delay(Duration::from_millis(200));
    let posts = support::db(&driver).collection("Posts").unwrap();
    assert!(!is_any_query_pending());

    let task = tokio::spawn({
        let posts = posts.clone();
        async move { posts.find((), FindOptions::new()).fetch().await }
    });

    while driver.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(pending_queries(), 1);

    task.await.unwrap().unwrap();
    assert!(!is_any_query_pending());

    // failures release their slot too
    driver.fail("connection reset");
    let _ = posts.find((), FindOptions::new().quiet(true)).fetch().await;
    assert_eq!(pending_queries(), 0);
}
