//! Keeps the calling thread on one core while it reads per-core information.

use crate::Error;

#[cfg(target_os = "linux")]
use log::warn;
#[cfg(target_os = "linux")]
use nix::errno::Errno;
#[cfg(target_os = "linux")]
use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
#[cfg(target_os = "linux")]
use nix::unistd::Pid;

/// Restores the previous affinity of the thread when dropped.
#[must_use = "The thread is unpinned as soon as the guard is dropped"]
pub struct PinGuard {
    #[cfg(target_os = "linux")]
    old: CpuSet,
}

#[cfg(target_os = "linux")]
pub fn current_core() -> Result<usize, Error> {
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu < 0 {
        return Err(nix::Error::Sys(Errno::last()).into());
    }
    Ok(cpu as usize)
}

/// Pins the calling thread to the core it currently runs on.
#[cfg(target_os = "linux")]
pub fn pin_to_current_core() -> Result<PinGuard, Error> {
    let old = sched_getaffinity(Pid::from_raw(0))?;
    let mut core = CpuSet::new();
    core.set(current_core()?)?;
    sched_setaffinity(Pid::from_raw(0), &core)?;
    Ok(PinGuard { old })
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_current_core() -> Result<PinGuard, Error> {
    Ok(PinGuard {})
}

#[cfg(target_os = "linux")]
impl Drop for PinGuard {
    fn drop(&mut self) {
        if let Err(e) = sched_setaffinity(Pid::from_raw(0), &self.old) {
            warn!("Failed to restore cpu affinity: {}", e);
        }
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::{current_core, pin_to_current_core};
    use nix::sched::{sched_getaffinity, CpuSet};
    use nix::unistd::Pid;

    fn allowed_cores() -> Vec<usize> {
        let set = sched_getaffinity(Pid::from_raw(0)).unwrap();
        (0..CpuSet::count())
            .filter(|&i| set.is_set(i).unwrap())
            .collect()
    }

    #[test]
    fn pin_and_restore() {
        let before = allowed_cores();
        {
            let _pin = pin_to_current_core().unwrap();
            let pinned = allowed_cores();
            assert_eq!(pinned.len(), 1);
            assert!(before.contains(&pinned[0]));
            assert_eq!(current_core().unwrap(), pinned[0]);
        }
        assert_eq!(allowed_cores(), before);
    }
}
