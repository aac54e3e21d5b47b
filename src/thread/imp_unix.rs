use std::io;
use std::mem;
use std::ptr;
use std::time::Duration;

pub(crate) type RawHandle = libc::pthread_t;

type Entry = Box<dyn FnOnce() + Send + 'static>;

/// Fixed adapter bridging `pthread_create`'s C callback to the boxed entry
/// closure. The payload is a `Box<Entry>` so it crosses the FFI boundary as a
/// thin pointer.
extern "C" fn thread_func(payload: *mut libc::c_void) -> *mut libc::c_void {
    let entry = unsafe { Box::from_raw(payload as *mut Entry) };
    entry();
    ptr::null_mut()
}

pub(crate) fn current_id() -> u64 {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        // Pthreads has no thread-id concept, so reach down into the kernel.
        unsafe { libc::syscall(libc::SYS_gettid) as u64 }
    }
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        let mut tid: u64 = 0;
        unsafe { libc::pthread_threadid_np(libc::pthread_self(), &mut tid) };
        tid
    }
    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios"
    )))]
    {
        unsafe { libc::pthread_self() as u64 }
    }
}

pub(crate) fn yield_now() {
    unsafe { libc::sched_yield() };
}

/// Suspends the calling thread, restarting with the remaining time whenever
/// the sleep is cut short by a signal.
pub(crate) fn sleep(duration: Duration) {
    let mut sleep_time = libc::timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as _,
    };
    let mut remaining: libc::timespec = unsafe { mem::zeroed() };

    while unsafe { libc::nanosleep(&sleep_time, &mut remaining) } == -1 {
        if io::Error::last_os_error().raw_os_error() != Some(libc::EINTR) {
            break;
        }
        sleep_time = remaining;
    }
}

/// Resolves a zero (platform default) stack-size request on macOS.
///
/// The Mac pthread default stack is 512kB, which is not generous enough for
/// some deeply recursive callers that otherwise request the default by
/// passing 0. Adopt glibc's behavior, which is to use the ambient stack-size
/// limit (`ulimit -s`), clamped below by the attribute default and the
/// minimum usable stack. If the limit is unlimited or cannot be determined,
/// the request is left at 0 to get the system default.
#[cfg(target_os = "macos")]
fn resolve_default_stack_size(attributes: &libc::pthread_attr_t) -> usize {
    let mut default_stack_size: usize = 0;
    let mut stack_rlimit: libc::rlimit = unsafe { mem::zeroed() };
    let attr_ok =
        unsafe { libc::pthread_attr_getstacksize(attributes, &mut default_stack_size) } == 0;
    let rlimit_ok = unsafe { libc::getrlimit(libc::RLIMIT_STACK, &mut stack_rlimit) } == 0;
    if attr_ok && rlimit_ok && stack_rlimit.rlim_cur != libc::RLIM_INFINITY {
        default_stack_size
            .max(libc::PTHREAD_STACK_MIN)
            .max(stack_rlimit.rlim_cur as usize)
    } else {
        0
    }
}

fn create_thread(stack_size: usize, joinable: bool, entry: Entry) -> io::Result<RawHandle> {
    let mut attributes: libc::pthread_attr_t = unsafe { mem::zeroed() };
    unsafe { libc::pthread_attr_init(&mut attributes) };

    // Pthreads are joinable by default, so only set the detached attribute
    // when the thread should be non-joinable.
    if !joinable {
        unsafe {
            libc::pthread_attr_setdetachstate(&mut attributes, libc::PTHREAD_CREATE_DETACHED)
        };
    }

    #[cfg(target_os = "macos")]
    let stack_size = if stack_size == 0 {
        resolve_default_stack_size(&attributes)
    } else {
        stack_size
    };

    if stack_size > 0 {
        unsafe { libc::pthread_attr_setstacksize(&mut attributes, stack_size) };
    }

    let payload: *mut Entry = Box::into_raw(Box::new(entry));
    let mut handle: RawHandle = unsafe { mem::zeroed() };
    let rv = unsafe {
        libc::pthread_create(
            &mut handle,
            &attributes,
            thread_func,
            payload as *mut libc::c_void,
        )
    };

    unsafe { libc::pthread_attr_destroy(&mut attributes) };

    if rv == 0 {
        Ok(handle)
    } else {
        // The thread never started, so the payload is still ours to free.
        drop(unsafe { Box::from_raw(payload) });
        Err(io::Error::from_raw_os_error(rv))
    }
}

pub(crate) fn spawn(stack_size: usize, entry: Entry) -> io::Result<RawHandle> {
    create_thread(stack_size, true, entry)
}

pub(crate) fn spawn_detached(stack_size: usize, entry: Entry) -> io::Result<()> {
    create_thread(stack_size, false, entry).map(|_| ())
}

pub(crate) fn join(handle: RawHandle) {
    let rv = unsafe { libc::pthread_join(handle, ptr::null_mut()) };
    debug_assert_eq!(rv, 0);
}
