//! Ctrl-C handling: abort the whole run with status 1.
//!
//! Stage processes share the terminal's process group, so they receive the
//! same SIGINT and stop on their own.

#[cfg(unix)]
const INTERRUPTED: &[u8] = b"\nprocessing interrupted by user\n";

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: libc::c_int) {
    // SAFETY: write(2) and _exit(2) are async-signal-safe.
    unsafe {
        libc::write(
            libc::STDERR_FILENO,
            INTERRUPTED.as_ptr().cast::<libc::c_void>(),
            INTERRUPTED.len(),
        );
        libc::_exit(1);
    }
}

#[cfg(unix)]
pub fn install_interrupt_handler() {
    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only calls async-signal-safe functions.
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        eprintln!("warning: could not install interrupt handler");
    }
}

#[cfg(not(unix))]
pub fn install_interrupt_handler() {}
