use simple_platform::sync::Lock;
use simple_platform::thread::{self, Delegate};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Basic test to make sure that acquire/release/try_acquire don't crash.

struct BasicLockTestThread {
    lock: Arc<Lock>,
    acquired: AtomicI32,
}

impl Delegate for BasicLockTestThread {
    fn thread_main(&self) {
        for _ in 0..10 {
            self.lock.acquire();
            self.acquired.fetch_add(1, Ordering::SeqCst);
            unsafe { self.lock.release() };
        }
        for i in 0..10 {
            self.lock.acquire();
            self.acquired.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(i % 5));
            unsafe { self.lock.release() };
        }
        for i in 0..10 {
            if self.lock.try_acquire() {
                self.acquired.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(i % 5));
                unsafe { self.lock.release() };
            }
        }
    }
}

#[test]
fn basic() {
    let lock = Arc::new(Lock::new());
    let delegate = Arc::new(BasicLockTestThread {
        lock: lock.clone(),
        acquired: AtomicI32::new(0),
    });

    let handle = thread::spawn(delegate.clone()).unwrap();

    let mut acquired = 0;
    for _ in 0..5 {
        lock.acquire();
        acquired += 1;
        unsafe { lock.release() };
    }
    for i in 0..10 {
        lock.acquire();
        acquired += 1;
        thread::sleep(Duration::from_millis(i % 5));
        unsafe { lock.release() };
    }
    for i in 0..10 {
        if lock.try_acquire() {
            acquired += 1;
            thread::sleep(Duration::from_millis(i % 5));
            unsafe { lock.release() };
        }
    }
    for i in 0..5 {
        lock.acquire();
        acquired += 1;
        thread::sleep(Duration::from_millis(i % 5));
        unsafe { lock.release() };
    }

    handle.join();

    assert!(acquired >= 20);
    assert!(delegate.acquired.load(Ordering::SeqCst) >= 20);
}

// Test that try_acquire works as expected.

struct TryLockTestThread {
    lock: Arc<Lock>,
    got_lock: AtomicBool,
}

impl Delegate for TryLockTestThread {
    fn thread_main(&self) {
        let got = self.lock.try_acquire();
        self.got_lock.store(got, Ordering::SeqCst);
        if got {
            unsafe { self.lock.release() };
        }
    }
}

#[test]
fn try_lock() {
    let lock = Arc::new(Lock::new());

    assert!(lock.try_acquire());
    // The lock is held by this thread now...

    // ...so another thread cannot get it.
    {
        let delegate = Arc::new(TryLockTestThread {
            lock: lock.clone(),
            got_lock: AtomicBool::new(false),
        });
        let handle = thread::spawn(delegate.clone()).unwrap();
        handle.join();
        assert!(!delegate.got_lock.load(Ordering::SeqCst));
    }

    unsafe { lock.release() };

    // Unheld again: another thread's try_acquire succeeds.
    {
        let delegate = Arc::new(TryLockTestThread {
            lock: lock.clone(),
            got_lock: AtomicBool::new(false),
        });
        let handle = thread::spawn(delegate.clone()).unwrap();
        handle.join();
        assert!(delegate.got_lock.load(Ordering::SeqCst));
    }

    // That thread released it on its way out, so we can have it back.
    assert!(lock.try_acquire());
    unsafe { lock.release() };
}

// Tests that locks actually exclude.

/// A counter whose accesses are serialized by a `Lock` in the tests below.
struct Counter(UnsafeCell<i32>);

unsafe impl Sync for Counter {}

struct MutexLockTestThread {
    lock: Arc<Lock>,
    value: Arc<Counter>,
}

impl MutexLockTestThread {
    // Static helper so the main thread can do the same work as the spawned
    // ones. Increments the counter 40 times with a non-atomic
    // read-sleep-write, which miscounts unless the lock excludes.
    fn do_stuff(lock: &Lock, value: &Counter) {
        for i in 0..40 {
            let _held = lock.guard();
            let v = unsafe { *value.0.get() };
            thread::sleep(Duration::from_millis(i % 3));
            unsafe { *value.0.get() = v + 1 };
        }
    }
}

impl Delegate for MutexLockTestThread {
    fn thread_main(&self) {
        Self::do_stuff(&self.lock, &self.value);
    }
}

fn mutex_n_threads(spawned: usize) {
    let lock = Arc::new(Lock::new());
    let value = Arc::new(Counter(UnsafeCell::new(0)));

    let handles: Vec<_> = (0..spawned)
        .map(|_| {
            thread::spawn(Arc::new(MutexLockTestThread {
                lock: lock.clone(),
                value: value.clone(),
            }))
            .unwrap()
        })
        .collect();

    MutexLockTestThread::do_stuff(&lock, &value);

    for handle in handles {
        handle.join();
    }

    let total = (spawned + 1) as i32 * 40;
    assert_eq!(unsafe { *value.0.get() }, total);
}

#[test]
fn mutex_one_thread() {
    mutex_n_threads(0);
}

#[test]
fn mutex_two_threads() {
    mutex_n_threads(1);
}

#[test]
fn mutex_three_threads() {
    mutex_n_threads(2);
}

#[test]
fn mutex_four_threads() {
    mutex_n_threads(3);
}

// Debug-build contract violations are fatal assertions.

#[cfg(debug_assertions)]
mod violations {
    use super::*;

    // The violating lock is leaked so that unwinding doesn't try to destroy
    // a still-held mutex.

    #[test]
    #[should_panic]
    fn double_acquire_asserts() {
        let lock: &'static Lock = Box::leak(Box::new(Lock::new()));
        lock.acquire();
        lock.acquire();
    }

    #[test]
    #[should_panic]
    fn release_unheld_asserts() {
        let lock: &'static Lock = Box::leak(Box::new(Lock::new()));
        unsafe { lock.release() };
    }

    struct HolderThread {
        lock: &'static Lock,
        holding: AtomicBool,
    }

    impl Delegate for HolderThread {
        fn thread_main(&self) {
            self.lock.acquire();
            self.holding.store(true, Ordering::SeqCst);
            // Hold long enough for the main thread's bad release to run.
            thread::sleep(Duration::from_millis(500));
            unsafe { self.lock.release() };
        }
    }

    #[test]
    #[should_panic]
    fn release_by_non_owner_asserts() {
        let lock: &'static Lock = Box::leak(Box::new(Lock::new()));
        let delegate = Arc::new(HolderThread {
            lock,
            holding: AtomicBool::new(false),
        });
        thread::spawn_detached(delegate.clone()).unwrap();

        while !delegate.holding.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
        // This thread does not hold the lock.
        unsafe { lock.release() };
    }
}
