use super::imp::LockImpl;
#[cfg(debug_assertions)]
use crate::thread;
use core::marker::PhantomData;
#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A non-reentrant mutual-exclusion lock backed by the platform's native
/// mutex primitive.
///
/// Unlike [`std::sync::Mutex`], a `Lock` protects no data of its own; it is a
/// bare exclusion primitive with explicit [`acquire`](Lock::acquire) /
/// [`release`](Lock::release) operations, plus a scoped RAII form via
/// [`guard`](Lock::guard). Any data guarded by a `Lock` must only be touched
/// while it is held.
///
/// In debug builds every transition is checked: acquiring a lock the calling
/// thread already holds, or releasing a lock held by a different thread (or
/// by nobody), is a fatal assertion. In release builds all bookkeeping is
/// compiled out and misuse is undefined behavior, which is why
/// [`release`](Lock::release) is `unsafe`.
///
/// No fairness is guaranteed: two threads contending for the lock observe
/// mutual exclusion, but waiters may be starved.
///
/// # Examples
///
/// ```
/// use simple_platform::sync::Lock;
///
/// let lock = Lock::new();
///
/// {
///     let _held = lock.guard();
///     lock.assert_acquired();
/// }
///
/// assert!(lock.try_acquire());
/// unsafe { lock.release() };
/// ```
pub struct Lock {
    lock: LockImpl,
    #[cfg(debug_assertions)]
    owned_by_thread: AtomicBool,
    #[cfg(debug_assertions)]
    owning_thread_id: AtomicU64,
}

impl Lock {
    /// Creates a new lock in the unheld state.
    pub fn new() -> Lock {
        Lock {
            lock: LockImpl::new(),
            #[cfg(debug_assertions)]
            owned_by_thread: AtomicBool::new(false),
            #[cfg(debug_assertions)]
            owning_thread_id: AtomicU64::new(0),
        }
    }

    /// Blocks the calling thread until the lock is acquired.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the calling thread already holds the lock.
    pub fn acquire(&self) {
        self.check_not_held_by_caller();
        self.lock.lock();
        self.check_unheld_and_mark();
    }

    /// Attempts to acquire the lock without blocking. Returns whether the
    /// lock is now held by the calling thread.
    ///
    /// On failure the lock's state is unchanged and the caller must not
    /// release it.
    pub fn try_acquire(&self) -> bool {
        if self.lock.try_lock() {
            self.check_unheld_and_mark();
            true
        } else {
            false
        }
    }

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The calling thread must currently hold the lock, i.e. this call must
    /// pair with an earlier [`acquire`](Lock::acquire) or successful
    /// [`try_acquire`](Lock::try_acquire) on the same thread. Debug builds
    /// assert this; release builds do not check.
    pub unsafe fn release(&self) {
        self.check_held_and_unmark();
        self.lock.unlock();
    }

    /// Acquires the lock and returns a guard that releases it when dropped.
    ///
    /// The guard cannot be sent to another thread, so the release always
    /// happens on the acquiring thread.
    pub fn guard(&self) -> LockGuard<'_> {
        self.acquire();
        LockGuard {
            lock: self,
            _make_unsend: PhantomData,
        }
    }

    /// Asserts that the calling thread holds the lock. Diagnostic only: does
    /// nothing in release builds.
    #[cfg(debug_assertions)]
    pub fn assert_acquired(&self) {
        assert!(self.owned_by_thread.load(Ordering::Relaxed));
        assert_eq!(
            self.owning_thread_id.load(Ordering::Relaxed),
            thread::current_id().as_raw()
        );
    }

    /// Asserts that the calling thread holds the lock. Diagnostic only: does
    /// nothing in release builds.
    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub fn assert_acquired(&self) {}

    // The ownership fields are only ever written by the thread that is
    // transitioning the lock between held and unheld, while the underlying
    // mutex is held, so relaxed ordering suffices.

    #[cfg(debug_assertions)]
    fn check_not_held_by_caller(&self) {
        // Catches self-deadlock before blocking on the OS mutex. Reading the
        // fields without holding the mutex is only decisive when the caller
        // itself is the recorded owner.
        assert!(
            !(self.owned_by_thread.load(Ordering::Relaxed)
                && self.owning_thread_id.load(Ordering::Relaxed)
                    == thread::current_id().as_raw()),
            "lock acquired twice by the same thread"
        );
    }

    #[cfg(debug_assertions)]
    fn check_unheld_and_mark(&self) {
        assert!(
            !self.owned_by_thread.load(Ordering::Relaxed),
            "lock acquired while already held"
        );
        self.owned_by_thread.store(true, Ordering::Relaxed);
        self.owning_thread_id
            .store(thread::current_id().as_raw(), Ordering::Relaxed);
    }

    #[cfg(debug_assertions)]
    fn check_held_and_unmark(&self) {
        assert!(
            self.owned_by_thread.load(Ordering::Relaxed),
            "lock released while not held"
        );
        assert_eq!(
            self.owning_thread_id.load(Ordering::Relaxed),
            thread::current_id().as_raw(),
            "lock released by a thread that does not hold it"
        );
        self.owned_by_thread.store(false, Ordering::Relaxed);
        self.owning_thread_id.store(0, Ordering::Relaxed);
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_not_held_by_caller(&self) {}

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_unheld_and_mark(&self) {}

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_held_and_unmark(&self) {}
}

impl Default for Lock {
    fn default() -> Lock {
        Lock::new()
    }
}

/// An RAII guard for a [`Lock`], returned by [`Lock::guard`]. The lock is
/// released when the guard is dropped.
#[must_use = "if unused the Lock will immediately release"]
pub struct LockGuard<'a> {
    lock: &'a Lock,
    _make_unsend: PhantomData<*const u8>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // The guard's existence proves this thread acquired the lock, and
        // !Send keeps the drop on the same thread.
        unsafe { self.lock.release() };
    }
}
