//! Process resource limits.

use std::io;

use tracing::{debug, warn};

/// Raises `RLIMIT_NOFILE` to `limit`.
///
/// Both the soft and the hard limit are requested. Without the privilege to raise the
/// hard limit, the soft limit is raised as far as the current hard limit allows. Returns
/// the soft limit in effect afterwards.
#[cfg(unix)]
pub fn raise_nofile(limit: u64) -> io::Result<u64> {
    let current = get_nofile()?;
    if current.rlim_cur as u64 >= limit {
        debug!(current = current.rlim_cur as u64, "open file limit already sufficient");
        return Ok(current.rlim_cur as u64);
    }

    match set_nofile(limit, limit) {
        Ok(()) => Ok(limit),
        Err(e) => {
            let hard = current.rlim_max as u64;
            warn!(requested = limit, hard, error = %e, "cannot raise hard open file limit");
            let soft = limit.min(hard);
            set_nofile(soft, hard)?;
            Ok(soft)
        }
    }
}

#[cfg(not(unix))]
pub fn raise_nofile(_limit: u64) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "rlimits are not supported on this platform",
    ))
}

#[cfg(unix)]
fn get_nofile() -> io::Result<libc::rlimit> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) };
    if rc != 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rlim)
    }
}

#[cfg(unix)]
fn set_nofile(soft: u64, hard: u64) -> io::Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: soft as libc::rlim_t,
        rlim_max: hard as libc::rlim_t,
    };
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &rlim) };
    if rc != 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
