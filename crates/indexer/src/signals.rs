//! Signal handling for both indexer process roles.
//!
//! Handlers only touch `AtomicBool` flags; all real work (reaping children,
//! restarting workers, breaking out of a deadline-exceeded search) happens
//! in the relevant `select()`/`pause()` loop in ordinary process context.
//! Forking or calling non-async-signal-safe functions directly from a
//! handler, which the original C coordinator does on SIGCHLD, is not
//! repeated here.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

pub const PARENT_CHECK_SECS: u32 = 30;

/// Worker: a command frame has arrived and is waiting to be read.
pub static CMD_READY: AtomicBool = AtomicBool::new(false);
/// Worker: SIGALRM fired; time to check whether the coordinator is still
/// our parent (a re-parent to init means it died without telling us).
pub static PARENT_CHECK_DUE: AtomicBool = AtomicBool::new(false);
/// Worker: SIGUSR2 arrived; the coordinator gave up waiting on the
/// in-flight command and wants an empty reply, not a process exit.
pub static SEARCH_ABORTED: AtomicBool = AtomicBool::new(false);
/// Coordinator: a child has exited and needs reaping.
pub static CHILD_EXITED: AtomicBool = AtomicBool::new(false);
/// Coordinator: the in-flight search's deadline has elapsed.
pub static SEARCH_DEADLINE: AtomicBool = AtomicBool::new(false);
/// Both roles: SIGHUP/SIGINT/SIGTERM asked for a graceful shutdown.
pub static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);

extern "C" fn on_cmd_ready(_: libc::c_int) {
    CMD_READY.store(true, Ordering::SeqCst);
}

extern "C" fn on_parent_check_alarm(_: libc::c_int) {
    PARENT_CHECK_DUE.store(true, Ordering::SeqCst);
}

extern "C" fn on_search_aborted(_: libc::c_int) {
    SEARCH_ABORTED.store(true, Ordering::SeqCst);
}

extern "C" fn on_child_exited(_: libc::c_int) {
    CHILD_EXITED.store(true, Ordering::SeqCst);
}

extern "C" fn on_search_deadline(_: libc::c_int) {
    SEARCH_DEADLINE.store(true, Ordering::SeqCst);
}

extern "C" fn on_shutdown_signal(_: libc::c_int) {
    SHOULD_EXIT.store(true, Ordering::SeqCst);
}

fn install(signal: Signal, handler: SigHandler) -> Result<(), nix::Error> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(signal, &action)? };
    Ok(())
}

fn ignore_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

/// Installs the worker role's handlers: SIGUSR1 (command ready), SIGALRM
/// (parent-liveness ping, fires every `PARENT_CHECK_SECS`), SIGUSR2
/// (coordinator gave up on us), and the shared shutdown triad.
pub fn install_worker_handlers() -> Result<(), nix::Error> {
    ignore_sigpipe();
    install(Signal::SIGUSR1, SigHandler::Handler(on_cmd_ready))?;
    install(Signal::SIGALRM, SigHandler::Handler(on_parent_check_alarm))?;
    install(Signal::SIGUSR2, SigHandler::Handler(on_search_aborted))?;
    install(Signal::SIGHUP, SigHandler::Handler(on_shutdown_signal))?;
    install(Signal::SIGINT, SigHandler::Handler(on_shutdown_signal))?;
    install(Signal::SIGTERM, SigHandler::Handler(on_shutdown_signal))?;
    Ok(())
}

/// Installs the coordinator role's handlers: SIGCHLD (child exited),
/// SIGALRM (search deadline, a different meaning than on the worker side),
/// and the shared shutdown triad.
pub fn install_coordinator_handlers() -> Result<(), nix::Error> {
    ignore_sigpipe();
    install(Signal::SIGCHLD, SigHandler::Handler(on_child_exited))?;
    install(Signal::SIGALRM, SigHandler::Handler(on_search_deadline))?;
    install(Signal::SIGHUP, SigHandler::Handler(on_shutdown_signal))?;
    install(Signal::SIGINT, SigHandler::Handler(on_shutdown_signal))?;
    install(Signal::SIGTERM, SigHandler::Handler(on_shutdown_signal))?;
    Ok(())
}

pub fn take(flag: &AtomicBool) -> bool {
    flag.swap(false, Ordering::SeqCst)
}
