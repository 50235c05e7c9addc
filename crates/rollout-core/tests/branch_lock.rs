use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use rollout_core::pipeline::lock::{lock_path, read_lock};
use rollout_core::pipeline::{BranchLock, PipelineError, force_unlock};

#[test]
fn acquire_writes_lock_info() {
    let temp = TempDir::new().unwrap();
    let lock = BranchLock::acquire(temp.path(), "feature/login", Duration::ZERO).unwrap();

    assert!(lock.path().exists());
    let info = read_lock(lock.path()).unwrap().unwrap();
    assert_eq!(info.branch, "feature/login");
    assert_eq!(info.pid, std::process::id());
    assert_eq!(&info, lock.info());
}

#[test]
fn drop_removes_lock_file() {
    let temp = TempDir::new().unwrap();
    let path = {
        let lock = BranchLock::acquire(temp.path(), "dev", Duration::ZERO).unwrap();
        lock.path().to_path_buf()
    };

    assert!(!path.exists());
    assert!(read_lock(&path).unwrap().is_none());
}

#[test]
fn second_holder_is_refused_without_wait() {
    let temp = TempDir::new().unwrap();
    let _held = BranchLock::acquire(temp.path(), "main", Duration::ZERO).unwrap();

    let err = BranchLock::acquire(temp.path(), "main", Duration::ZERO).unwrap_err();
    match err {
        PipelineError::LockBusy { branch, holder } => {
            assert_eq!(branch, "main");
            assert!(holder.unwrap().contains(&format!("pid {}", std::process::id())));
        }
        other => panic!("expected LockBusy, got {other:?}"),
    }
}

#[test]
fn different_branches_do_not_contend() {
    let temp = TempDir::new().unwrap();
    let _main = BranchLock::acquire(temp.path(), "main", Duration::ZERO).unwrap();
    let _dev = BranchLock::acquire(temp.path(), "dev", Duration::ZERO).unwrap();

    assert_ne!(
        lock_path(temp.path(), "main"),
        lock_path(temp.path(), "dev")
    );
}

#[test]
fn waiter_acquires_after_release() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_path_buf();
    let held = BranchLock::acquire(&dir, "test", Duration::ZERO).unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    let waiter = thread::spawn(move || {
        started_tx.send(()).unwrap();
        let start = Instant::now();
        let lock = BranchLock::acquire(&dir, "test", Duration::from_secs(10));
        (lock.is_ok(), start.elapsed())
    });

    started_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(300));
    drop(held);

    let (acquired, waited) = waiter.join().unwrap();
    assert!(acquired);
    assert!(waited >= Duration::from_millis(200));
}

#[test]
fn waiter_times_out_while_held() {
    let temp = TempDir::new().unwrap();
    let _held = BranchLock::acquire(temp.path(), "test", Duration::ZERO).unwrap();

    let start = Instant::now();
    let result = BranchLock::acquire(temp.path(), "test", Duration::from_millis(300));

    assert!(matches!(result, Err(PipelineError::LockBusy { .. })));
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[test]
fn force_unlock_removes_stale_lock() {
    let temp = TempDir::new().unwrap();
    let held = BranchLock::acquire(temp.path(), "main", Duration::ZERO).unwrap();
    // Simulate a crashed holder.
    std::mem::forget(held);

    assert!(force_unlock(temp.path(), "main").unwrap());
    assert!(!force_unlock(temp.path(), "main").unwrap());
    assert!(BranchLock::acquire(temp.path(), "main", Duration::ZERO).is_ok());
}

#[test]
fn full_ref_shares_lock_with_short_name() {
    let temp = TempDir::new().unwrap();
    let _held = BranchLock::acquire(temp.path(), "main", Duration::ZERO).unwrap();

    let err = BranchLock::acquire(temp.path(), "refs/heads/main", Duration::ZERO).unwrap_err();
    assert!(matches!(err, PipelineError::LockBusy { ref branch, .. } if branch == "main"));
    assert_eq!(
        lock_path(temp.path(), "refs/heads/main"),
        lock_path(temp.path(), "main")
    );
}

#[test]
fn force_unlock_accepts_full_ref() {
    let temp = TempDir::new().unwrap();
    std::mem::forget(BranchLock::acquire(temp.path(), "dev", Duration::ZERO).unwrap());

    assert!(force_unlock(temp.path(), "refs/heads/dev").unwrap());
    assert!(BranchLock::acquire(temp.path(), "dev", Duration::ZERO).is_ok());
}
