use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

/// Wrapper around a [`parking_lot::RawMutex`].
///
/// Used on platforms without a pthread mutex family; `parking_lot` provides
/// the same blocking/try/unlock contract everywhere, on top of the native
/// primitives of each OS. There is no error-checking mode here, so debug
/// misuse detection is carried entirely by the ownership bookkeeping in
/// [`Lock`](super::Lock).
pub(crate) struct LockImpl {
    raw: RawMutex,
}

impl LockImpl {
    pub(crate) fn new() -> LockImpl {
        LockImpl { raw: RawMutex::INIT }
    }

    /// Blocks until the mutex is acquired by the calling thread.
    pub(crate) fn lock(&self) {
        self.raw.lock();
    }

    /// Attempts to acquire the mutex without blocking. Returns whether the
    /// mutex is now held by the calling thread.
    pub(crate) fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    /// Releases the mutex.
    ///
    /// # Safety
    ///
    /// The calling thread must be the current holder.
    pub(crate) unsafe fn unlock(&self) {
        self.raw.unlock();
    }
}
