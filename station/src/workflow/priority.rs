use log::{info, warn};

/// Moves the calling thread to SCHED_FIFO at `priority`.
///
/// Failure (usually a missing CAP_SYS_NICE) is logged and the loop keeps
/// running at normal priority. Returns whether the change took effect.
pub fn raise_realtime_priority(priority: Option<i32>) -> bool {
    let Some(priority) = priority else {
        return false;
    };
    match set_fifo(priority) {
        Ok(()) => {
            info!("running with SCHED_FIFO priority {}", priority);
            true
        }
        Err(err) => {
            warn!("could not raise to SCHED_FIFO {}: {}", priority, err);
            false
        }
    }
}

#[cfg(target_os = "linux")]
fn set_fifo(priority: i32) -> std::io::Result<()> {
    // SAFETY: sched_param is plain data; zeroing covers libc-specific padding fields.
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = priority;
    // SAFETY: pid 0 targets the calling thread and `param` outlives the call.
    if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
fn set_fifo(_priority: i32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "SCHED_FIFO is only requested on Linux",
    ))
}
