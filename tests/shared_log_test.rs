//! Shared log tests with several independent writers contending for the lock.

use motor_ctrl::{FileLock, MotorCtrlError, SharedLog};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WRITERS: usize = 6;
const LINES_PER_WRITER: usize = 40;

fn writer(dir: &Path, tag: &str) -> SharedLog {
    // Each writer gets its own lock handle, as a separate process would
    let lock = FileLock::new(dir.join("log.lock"), Duration::from_millis(1))
        .with_timeout(Some(Duration::from_secs(10)));
    SharedLog::new(dir.join("system_log.txt"), tag, lock)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_never_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let payload = "x".repeat(4096);

    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let log = writer(dir.path(), &format!("W{w}"));
        let payload = payload.clone();
        handles.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            for n in 0..LINES_PER_WRITER {
                log.log(&format!("line {n} {payload}"), &cancel).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let contents = std::fs::read_to_string(dir.path().join("system_log.txt")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), WRITERS * LINES_PER_WRITER);

    let mut next_expected: HashMap<String, usize> = HashMap::new();
    for line in lines {
        let (tag, rest) = line
            .strip_prefix('[')
            .and_then(|l| l.split_once("] "))
            .unwrap_or_else(|| panic!("corrupted line: {:.80}", line));
        let (index, body) = rest
            .strip_prefix("line ")
            .and_then(|r| r.split_once(' '))
            .unwrap_or_else(|| panic!("corrupted line: {:.80}", line));
        assert_eq!(body, payload, "payload of {tag} line {index} was interleaved");

        // Lines from one writer keep their call order
        let expected = next_expected.entry(tag.to_string()).or_insert(0);
        assert_eq!(index.parse::<usize>().unwrap(), *expected);
        *expected += 1;
    }

    assert_eq!(next_expected.len(), WRITERS);
    assert!(next_expected.values().all(|&n| n == LINES_PER_WRITER));
    assert!(!dir.path().join("log.lock").exists());
}

#[tokio::test]
async fn test_failed_append_leaves_no_lock_behind() {
    let dir = tempfile::tempdir().unwrap();
    let lock = FileLock::new(dir.path().join("log.lock"), Duration::from_millis(1));
    let broken = SharedLog::new(dir.path().join("missing").join("system_log.txt"), "C", lock);

    let cancel = CancellationToken::new();
    let err = broken.log("Process C started.", &cancel).await.unwrap_err();
    assert!(matches!(err, MotorCtrlError::LogWriteFailure { .. }));

    // A healthy sibling can still take the lock straight away
    let healthy = writer(dir.path(), "B");
    healthy.log("Process B started.", &cancel).await.unwrap();
    let contents = std::fs::read_to_string(healthy.path()).unwrap();
    assert_eq!(contents, "[B] Process B started.\n");
}

#[tokio::test]
async fn test_writer_waits_for_sibling_holding_lock() {
    let dir = tempfile::tempdir().unwrap();
    let sibling = FileLock::new(dir.path().join("log.lock"), Duration::from_millis(1));
    let guard = sibling.acquire(&CancellationToken::new()).await.unwrap();

    let log = writer(dir.path(), "C");
    let handle =
        tokio::spawn(async move { log.log("after sibling", &CancellationToken::new()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!dir.path().join("system_log.txt").exists());

    guard.release().await.unwrap();
    handle.await.unwrap().unwrap();

    let contents = std::fs::read_to_string(dir.path().join("system_log.txt")).unwrap();
    assert_eq!(contents, "[C] after sibling\n");
}
