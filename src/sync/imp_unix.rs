use core::cell::UnsafeCell;
use core::mem;

/// Wrapper around a `pthread_mutex_t`.
///
/// The mutex lives in a `Box` because a pthread mutex must not move once it
/// has been initialized. In debug builds it is created with
/// `PTHREAD_MUTEX_ERRORCHECK` so that misuse (re-locking from the holding
/// thread, unlocking from a non-holder) comes back as an error code we can
/// assert on instead of deadlocking or corrupting state. Release builds use
/// the default attributes, which are the fastest the platform offers.
pub(crate) struct LockImpl {
    os_lock: Box<UnsafeCell<libc::pthread_mutex_t>>,
}

unsafe impl Send for LockImpl {}
unsafe impl Sync for LockImpl {}

impl LockImpl {
    #[cfg(debug_assertions)]
    pub(crate) fn new() -> LockImpl {
        let os_lock: Box<UnsafeCell<libc::pthread_mutex_t>> =
            Box::new(UnsafeCell::new(unsafe { mem::zeroed() }));
        unsafe {
            let mut attr: libc::pthread_mutexattr_t = mem::zeroed();
            let rv = libc::pthread_mutexattr_init(&mut attr);
            debug_assert_eq!(rv, 0);
            let rv = libc::pthread_mutexattr_settype(&mut attr, libc::PTHREAD_MUTEX_ERRORCHECK);
            debug_assert_eq!(rv, 0);
            let rv = libc::pthread_mutex_init(os_lock.get(), &attr);
            debug_assert_eq!(rv, 0);
            let rv = libc::pthread_mutexattr_destroy(&mut attr);
            debug_assert_eq!(rv, 0);
        }
        LockImpl { os_lock }
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn new() -> LockImpl {
        let os_lock: Box<UnsafeCell<libc::pthread_mutex_t>> =
            Box::new(UnsafeCell::new(unsafe { mem::zeroed() }));
        unsafe {
            libc::pthread_mutex_init(os_lock.get(), core::ptr::null());
        }
        LockImpl { os_lock }
    }

    /// Blocks until the mutex is acquired by the calling thread.
    pub(crate) fn lock(&self) {
        let rv = unsafe { libc::pthread_mutex_lock(self.os_lock.get()) };
        debug_assert_eq!(rv, 0);
    }

    /// Attempts to acquire the mutex without blocking. Returns whether the
    /// mutex is now held by the calling thread.
    pub(crate) fn try_lock(&self) -> bool {
        let rv = unsafe { libc::pthread_mutex_trylock(self.os_lock.get()) };
        debug_assert!(rv == 0 || rv == libc::EBUSY);
        rv == 0
    }

    /// Releases the mutex.
    ///
    /// # Safety
    ///
    /// The calling thread must be the current holder.
    pub(crate) unsafe fn unlock(&self) {
        let rv = libc::pthread_mutex_unlock(self.os_lock.get());
        debug_assert_eq!(rv, 0);
    }
}

impl Drop for LockImpl {
    fn drop(&mut self) {
        // Destroying a held mutex reports EBUSY in error-checking mode.
        let rv = unsafe { libc::pthread_mutex_destroy(self.os_lock.get()) };
        debug_assert_eq!(rv, 0);
    }
}
