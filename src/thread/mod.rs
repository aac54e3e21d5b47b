use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
#[path = "imp_unix.rs"]
mod imp;

#[cfg(not(unix))]
#[path = "imp_default.rs"]
mod imp;

/// An identifier for a running thread, useful for logging and comparison.
///
/// `ThreadId`s are pure identity: they carry no ownership, are not ordered,
/// and are not guaranteed stable across OS releases. On Linux this is the
/// kernel thread id, on macOS the `pthread_threadid_np` value.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
pub struct ThreadId(u64);

impl ThreadId {
    pub(crate) fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_raw().fmt(f)
    }
}

/// A unit of work to run on a newly created thread.
///
/// [`thread_main`](Delegate::thread_main) is invoked exactly once, on the new
/// thread's execution context. Spawning takes an `Arc<dyn Delegate>`, so the
/// thread owns its own reference to the delegate and the caller is free to
/// drop or keep theirs; there is no lifetime to get wrong.
pub trait Delegate: Send + Sync + 'static {
    fn thread_main(&self);
}

/// An owned handle to a joinable thread, returned by [`spawn`] and
/// [`Builder::spawn`].
///
/// The handle is consumed by [`join`](JoinHandle::join), so a thread cannot
/// be joined twice. Detached threads ([`spawn_detached`]) produce no handle.
/// Dropping a `JoinHandle` without joining leaks the thread's OS record until
/// process exit; either join it or spawn detached.
#[derive(Debug)]
pub struct JoinHandle {
    raw: imp::RawHandle,
}

// The raw handle is an opaque thread identifier; moving it between threads
// is fine.
unsafe impl Send for JoinHandle {}

impl JoinHandle {
    /// Blocks the calling thread until the referenced thread has finished
    /// running its delegate, then releases the thread's OS resources.
    ///
    /// Completion of the delegate's work happens-before `join` returns.
    pub fn join(self) {
        imp::join(self.raw);
    }
}

/// Thread factory, which can be used in order to configure the properties of
/// a new thread.
///
/// The one configuration available is [`stack_size`](Builder::stack_size);
/// the default of 0 requests the platform default size.
///
/// # Examples
///
/// ```
/// use simple_platform::thread::{Builder, Delegate};
/// use std::sync::Arc;
///
/// struct Quiet;
///
/// impl Delegate for Quiet {
///     fn thread_main(&self) {}
/// }
///
/// let handle = Builder::new()
///     .stack_size(512 * 1024)
///     .spawn(Arc::new(Quiet))
///     .unwrap();
/// handle.join();
/// ```
#[must_use = "must eventually spawn the thread"]
#[derive(Debug)]
pub struct Builder {
    stack_size: usize,
}

impl Builder {
    /// Generates the base configuration for spawning a thread.
    pub fn new() -> Builder {
        Builder { stack_size: 0 }
    }

    /// Sets the size of the stack (in bytes) for the new thread, or 0 for
    /// the platform default. Platforms may round a nonzero request up to a
    /// platform-specific minimum.
    pub fn stack_size(mut self, size: usize) -> Builder {
        self.stack_size = size;
        self
    }

    /// Spawns a joinable thread running `delegate`'s
    /// [`thread_main`](Delegate::thread_main).
    ///
    /// On success the new thread is already running and the caller continues
    /// concurrently. On failure the OS error is returned and no thread
    /// exists.
    pub fn spawn(self, delegate: Arc<dyn Delegate>) -> io::Result<JoinHandle> {
        let raw = imp::spawn(self.stack_size, entry(delegate)).map_err(log_spawn_error)?;
        Ok(JoinHandle { raw })
    }

    /// Spawns a detached thread running `delegate`'s
    /// [`thread_main`](Delegate::thread_main).
    ///
    /// The thread cannot be joined; its OS resources are reclaimed
    /// automatically when it exits.
    pub fn spawn_detached(self, delegate: Arc<dyn Delegate>) -> io::Result<()> {
        imp::spawn_detached(self.stack_size, entry(delegate)).map_err(log_spawn_error)
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

fn log_spawn_error(e: io::Error) -> io::Error {
    tracing::error!(error = %e, "thread creation failed");
    e
}

/// Wraps the delegate invocation for the platform trampoline. Panics must
/// not unwind into foreign frames, so they stop here.
fn entry(delegate: Arc<dyn Delegate>) -> Box<dyn FnOnce() + Send + 'static> {
    Box::new(move || {
        let id = current_id();
        tracing::trace!(thread_id = %id, "thread started");
        if panic::catch_unwind(AssertUnwindSafe(|| delegate.thread_main())).is_err() {
            tracing::error!(thread_id = %id, "thread delegate panicked");
        }
        tracing::trace!(thread_id = %id, "thread finished");
    })
}

/// Spawns a joinable thread with the default stack size, returning a
/// [`JoinHandle`] for it.
///
/// # Examples
///
/// ```
/// use simple_platform::thread::{self, Delegate};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct DidRun(AtomicBool);
///
/// impl Delegate for DidRun {
///     fn thread_main(&self) {
///         self.0.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let delegate = Arc::new(DidRun(AtomicBool::new(false)));
/// let handle = thread::spawn(delegate.clone()).unwrap();
/// handle.join();
/// assert!(delegate.0.load(Ordering::SeqCst));
/// ```
pub fn spawn(delegate: Arc<dyn Delegate>) -> io::Result<JoinHandle> {
    Builder::new().spawn(delegate)
}

/// Spawns a detached thread with the default stack size.
pub fn spawn_detached(delegate: Arc<dyn Delegate>) -> io::Result<()> {
    Builder::new().spawn_detached(delegate)
}

/// Gets an identifier for the calling thread. Cheap, callable from any
/// thread, no side effects.
pub fn current_id() -> ThreadId {
    ThreadId(imp::current_id())
}

/// Hints to the scheduler that another runnable thread may execute. No
/// blocking or ordering guarantee.
pub fn yield_now() {
    imp::yield_now();
}

/// Puts the current thread to sleep for at least the specified amount of
/// time.
///
/// The thread may sleep longer than the duration specified due to scheduling
/// specifics or platform-dependent functionality. It will never sleep less,
/// even when the underlying wait is interrupted early by a signal.
pub fn sleep(duration: Duration) {
    imp::sleep(duration);
}
