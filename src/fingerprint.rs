// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device fingerprint used to seed the input registers.

/// Values identifying the running device at startup.
///
/// They end up in the input registers `1..=12`. None of them
/// affects the protocol handling, they are informational only.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    /// Effective user id
    pub uid: u16,
    /// Effective group id
    pub gid: u16,
    /// Process id
    pub pid: u16,
    /// Parent process id
    pub ppid: u16,
    pub elapsed_secs: u16,
    pub elapsed_millis: u16,
}

impl Fingerprint {
    /// Number of input registers occupied by a fingerprint.
    pub const LEN: usize = 12;

    /// The register values in slot order.
    #[must_use]
    pub const fn to_words(&self) -> [u16; Self::LEN] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.uid,
            self.gid,
            self.pid,
            self.ppid,
            self.elapsed_secs,
            self.elapsed_millis,
        ]
    }
}

/// Source of the [`Fingerprint`] a slave is seeded with.
pub trait DeviceFingerprint {
    fn fingerprint(&self) -> Fingerprint;
}

impl DeviceFingerprint for Fingerprint {
    fn fingerprint(&self) -> Fingerprint {
        *self
    }
}

#[cfg(feature = "std")]
pub use self::host::HostFingerprint;

#[cfg(feature = "std")]
mod host {
    use super::*;
    use chrono::{Datelike, Local, Timelike};
    use std::time::Instant;

    /// Fingerprint of the hosting process.
    ///
    /// The elapsed time is wall clock time measured from the creation
    /// of the provider, not the CPU time consumed by the process.
    #[derive(Debug, Clone, Copy)]
    pub struct HostFingerprint {
        started: Instant,
    }

    impl HostFingerprint {
        #[must_use]
        pub fn new() -> Self {
            Self {
                started: Instant::now(),
            }
        }
    }

    impl Default for HostFingerprint {
        fn default() -> Self {
            Self::new()
        }
    }

    impl DeviceFingerprint for HostFingerprint {
        fn fingerprint(&self) -> Fingerprint {
            let now = Local::now();
            let elapsed = self.started.elapsed();
            let ProcessIds { uid, gid, ppid } = ProcessIds::current();
            Fingerprint {
                year: now.year() as u16,
                month: now.month() as u16,
                day: now.day() as u16,
                hour: now.hour() as u16,
                minute: now.minute() as u16,
                second: now.second() as u16,
                uid,
                gid,
                pid: std::process::id() as u16,
                ppid,
                elapsed_secs: elapsed.as_secs() as u16,
                elapsed_millis: elapsed.as_millis() as u16,
            }
        }
    }

    /// Effective user and group id and parent process id,
    /// truncated to 16 bit.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    struct ProcessIds {
        uid: u16,
        gid: u16,
        ppid: u16,
    }

    impl ProcessIds {
        #[cfg(unix)]
        fn current() -> Self {
            // SAFETY: these calls cannot fail and have no preconditions.
            let (uid, gid, ppid) = unsafe { (libc::geteuid(), libc::getegid(), libc::getppid()) };
            Self {
                uid: uid as u16,
                gid: gid as u16,
                ppid: ppid as u16,
            }
        }

        #[cfg(not(unix))]
        fn current() -> Self {
            Self::default()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn host_fingerprint_has_a_plausible_date() {
            let fp = HostFingerprint::new().fingerprint();
            assert!(fp.year >= 2024);
            assert!((1..=12).contains(&fp.month));
            assert!((1..=31).contains(&fp.day));
            assert!(fp.hour < 24);
            assert_eq!(fp.pid, std::process::id() as u16);
        }

        #[cfg(unix)]
        #[test]
        fn host_fingerprint_has_effective_ids() {
            let fp = HostFingerprint::new().fingerprint();
            assert_eq!(fp.uid, unsafe { libc::geteuid() } as u16);
            assert_eq!(fp.gid, unsafe { libc::getegid() } as u16);
            assert_eq!(fp.ppid, std::os::unix::process::parent_id() as u16);
        }
    }
}
