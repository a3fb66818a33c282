//! Dispatcher driven by real filesystem notifications.

mod common;

use std::fs;
use std::time::Duration;

use common::{Inbox, ScriptedEngine, engine, fast_settings};
use docsplit::watcher::{InboxFilter, InboxWatcher, scan_backlog};
use tokio_util::sync::CancellationToken;

/// Poll `condition` until it holds or ten seconds pass.
async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_backlog_then_renamed_arrival() {
    let inbox = Inbox::new();
    inbox.drop_document("Alpha.pdf", &["One"]);
    inbox.drop_document("Beta.pdf", &["Two"]);
    let backlog = scan_backlog(&inbox.input, &InboxFilter::new("pdf")).await;

    let engine = engine(ScriptedEngine::new());
    let watcher = InboxWatcher::builder()
        .config(inbox.config())
        .engine(engine.clone())
        .settings(fast_settings())
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(watcher.run(shutdown.clone()));

    assert!(
        wait_for(|| !inbox.input.join("Alpha.pdf").exists() && !inbox.input.join("Beta.pdf").exists())
            .await,
        "backlog was not processed"
    );

    // Write under a foreign extension, then rename into place so the
    // document is complete when it appears
    let staging = inbox.input.join("Gamma.part");
    fs::write(&staging, "Three:z").unwrap();
    fs::rename(&staging, inbox.input.join("Gamma.pdf")).unwrap();

    assert!(
        wait_for(|| inbox.output("GammaThree.pdf").exists() && inbox.copied("Gamma.pdf").exists())
            .await,
        "renamed arrival was not processed"
    );
    assert!(wait_for(|| !inbox.input.join("Gamma.pdf").exists()).await);

    shutdown.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(stats.relocated, 3);
    assert_eq!(stats.failed, 0);

    let mut expected = backlog;
    expected.push(inbox.input.join("Gamma.pdf"));
    assert_eq!(engine.opened(), expected);
    assert!(!staging.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_stops_an_idle_watcher() {
    let inbox = Inbox::new();
    let engine = engine(ScriptedEngine::new());
    let watcher = InboxWatcher::builder()
        .config(inbox.config())
        .engine(engine.clone())
        .settings(fast_settings())
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(watcher.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("watcher did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(stats.processed(), 0);
    assert!(engine.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_document_written_in_two_chunks_is_split_whole() {
    use std::io::Write;

    let inbox = Inbox::new();
    let engine = engine(ScriptedEngine::new());
    let mut settings = fast_settings();
    settings.watch.poll_interval_ms = 300;

    let watcher = InboxWatcher::builder()
        .config(inbox.config())
        .engine(engine.clone())
        .settings(settings)
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(watcher.run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Written in place without a lock, pausing between the sections
    let path = inbox.input.join("Report.pdf");
    let mut writer = fs::File::create(&path).unwrap();
    writer.write_all(b"Cover:1\n").unwrap();
    writer.flush().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    writer.write_all(b"Body:2").unwrap();
    drop(writer);

    assert!(
        wait_for(|| inbox.copied("Report.pdf").exists() && !path.exists()).await,
        "document was not relocated"
    );

    shutdown.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert!(inbox.output("ReportCover.pdf").exists());
    assert!(inbox.output("ReportBody.pdf").exists());
    assert_eq!(
        fs::read_to_string(inbox.copied("Report.pdf")).unwrap(),
        "Cover:1\nBody:2"
    );
    assert_eq!(stats.relocated, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(engine.opened(), vec![path]);
}
