//! Best-effort real-time setup for the audio thread.
//!
//! Both steps may fail without elevated privileges (CAP_IPC_LOCK for
//! `mlockall`, CAP_SYS_NICE for SCHED_FIFO); failures are reported and the
//! engine keeps running at default scheduling.

use std::io;

/// Process-wide real-time facilities.
pub trait RealtimeBootstrap {
    /// Lock current and future pages into RAM.
    fn lock_memory(&self) -> io::Result<()>;
    /// Switch the calling thread to a fixed-priority real-time class.
    fn raise_priority(&self) -> io::Result<()>;
}

/// Outcome of [`enter_realtime`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeStatus {
    pub memory_locked: bool,
    pub realtime_priority: bool,
}

/// `mlockall` + `SCHED_FIFO` at a fixed priority.
#[derive(Debug, Clone, Copy)]
pub struct PosixRealtime {
    pub priority: i32,
}

impl RealtimeBootstrap for PosixRealtime {
    fn lock_memory(&self) -> io::Result<()> {
        let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn raise_priority(&self) -> io::Result<()> {
        let param = libc::sched_param {
            sched_priority: self.priority,
        };
        // pthread_setschedparam returns the error number instead of setting errno.
        let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(())
    }
}

/// Leaves the process untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRealtime;

impl RealtimeBootstrap for NoRealtime {
    fn lock_memory(&self) -> io::Result<()> {
        Ok(())
    }

    fn raise_priority(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Run both steps once, before any device is opened. Never fails.
pub fn enter_realtime(bootstrap: &dyn RealtimeBootstrap) -> RealtimeStatus {
    let memory_locked = match bootstrap.lock_memory() {
        Ok(()) => true,
        Err(e) => {
            log::warn!("mlockall: {}", e);
            false
        }
    };

    let realtime_priority = match bootstrap.raise_priority() {
        Ok(()) => true,
        Err(e) => {
            log::warn!("SCHED_FIFO: {} (need cap_sys_nice)", e);
            false
        }
    };

    if memory_locked && realtime_priority {
        log::info!("Audio thread running with locked memory at real-time priority");
    }

    RealtimeStatus {
        memory_locked,
        realtime_priority,
    }
}
