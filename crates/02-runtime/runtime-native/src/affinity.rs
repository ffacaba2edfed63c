//! Pinning pipeline threads to fixed cores.

use std::io;

use tracing::{debug, warn};

/// Restricts the calling thread to `core`.
///
/// Only Linux is supported; elsewhere this returns
/// [`io::ErrorKind::Unsupported`].
#[cfg(target_os = "linux")]
pub fn pin_current_thread(core: usize) -> io::Result<()> {
    if core >= libc::CPU_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("core {core} is outside the cpu set"),
        ));
    }
    // SAFETY: `cpu_set_t` is plain data and all-zero is the empty set. The
    // index was bounds-checked above.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Restricts the calling thread to `core`.
#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(core: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot pin to core {core}: thread affinity is only supported on linux"),
    ))
}

/// Number of cores the process may run on, or 1 when unknown.
pub fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Pins when a core is configured; failures leave the thread unpinned.
pub(crate) fn pin_or_warn(core: Option<usize>, role: &'static str) {
    let Some(core) = core else {
        return;
    };
    match pin_current_thread(core) {
        Ok(()) => debug!(role, core, "thread pinned"),
        Err(err) => warn!(role, core, %err, "could not pin thread; running unpinned"),
    }
}
