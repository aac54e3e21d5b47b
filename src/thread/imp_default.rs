use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub(crate) type RawHandle = std::thread::JoinHandle<()>;

type Entry = Box<dyn FnOnce() + Send + 'static>;

/// Process-local thread id counter. The platform has no cheap native id we
/// can reach here, so each thread gets a unique nonzero value on first ask.
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn current_id() -> u64 {
    CURRENT_THREAD_ID.with(|id| *id)
}

pub(crate) fn yield_now() {
    std::thread::yield_now();
}

pub(crate) fn sleep(duration: Duration) {
    // std's sleep already guarantees at least the requested duration and
    // resumes across spurious wakes.
    std::thread::sleep(duration);
}

fn builder(stack_size: usize) -> std::thread::Builder {
    let mut builder = std::thread::Builder::new();
    if stack_size > 0 {
        builder = builder.stack_size(stack_size);
    }
    builder
}

pub(crate) fn spawn(stack_size: usize, entry: Entry) -> io::Result<RawHandle> {
    builder(stack_size).spawn(entry)
}

pub(crate) fn spawn_detached(stack_size: usize, entry: Entry) -> io::Result<()> {
    // Dropping the handle detaches the thread.
    builder(stack_size).spawn(entry).map(|_| ())
}

pub(crate) fn join(handle: RawHandle) {
    // The entry closure catches panics, so join can only fail if the thread
    // was killed some other way.
    let rv = handle.join();
    debug_assert!(rv.is_ok());
}
