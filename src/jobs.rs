//! Table of background jobs.
//!
//! Jobs live in a vector kept in insertion order. Identifiers come from a
//! counter owned by the table, start at 1 and are never reused, so removing
//! an entry never renumbers the others.

use std::process::Child;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Sequential job identifier.
pub type Jid = u32;

/// A background command whose child has not been reaped yet.
#[derive(Debug)]
pub struct Job {
    jid: Jid,
    child: Child,
    display: String,
}

impl Job {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Non-blocking status check. A failed check counts as terminated, since
    /// the child can no longer be waited on either.
    fn has_terminated(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(status) => status.is_some(),
            Err(e) => {
                warn!(jid = self.jid, pid = self.pid(), "status check failed: {e}");
                true
            }
        }
    }

    /// Blocks until the child exits and returns how long that took.
    /// Returns zero without blocking when it already has.
    fn reap(&mut self) -> Duration {
        if self.has_terminated() {
            return Duration::ZERO;
        }
        let started = Instant::now();
        if let Err(e) = self.child.wait() {
            warn!(jid = self.jid, pid = self.pid(), "wait failed: {e}");
        }
        started.elapsed()
    }
}

/// `myw` asked for an id outside the range of ids ever issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("jid {requested} was never issued")]
pub struct InvalidJid {
    pub requested: i64,
}

/// Outcome of [`JobTable::wait_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    /// Time spent blocked on the child; zero if it had already exited.
    pub elapsed: Duration,
    /// False when the id was issued but the job had already left the table.
    pub found: bool,
}

#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_jid: Jid,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_jid: 1,
        }
    }

    /// Highest id issued so far, or 0 if none.
    pub fn last_issued(&self) -> Jid {
        self.next_jid - 1
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Consumes an id for a command that is not tracked in the table:
    /// foreground commands and commands whose program could not be started.
    pub fn consume_jid(&mut self) -> Jid {
        let jid = self.next_jid;
        self.next_jid += 1;
        jid
    }

    /// Appends a background job and returns its id.
    pub fn insert(&mut self, child: Child, text: String) -> Jid {
        let jid = self.consume_jid();
        debug!(jid, pid = child.id(), cmd = %text, "job added");
        self.jobs.push(Job {
            jid,
            child,
            display: text,
        });
        jid
    }

    /// Iterates over jobs that are still running, removing finished ones as
    /// it goes. Entries are visited once, in insertion order.
    pub fn poll_and_list(&mut self) -> PollAndList<'_> {
        PollAndList {
            table: self,
            index: 0,
        }
    }

    /// Waits for job `requested` to finish and removes it from the table.
    ///
    /// An id that was issued but is no longer in the table is reported as
    /// terminated with zero elapsed time. An id that was never issued is an
    /// error.
    pub fn wait_on(&mut self, requested: i64) -> Result<WaitReport, InvalidJid> {
        let Some(index) = self
            .jobs
            .iter()
            .position(|job| i64::from(job.jid) == requested)
        else {
            if requested < 1 || requested > i64::from(self.last_issued()) {
                return Err(InvalidJid { requested });
            }
            return Ok(WaitReport {
                elapsed: Duration::ZERO,
                found: false,
            });
        };

        let mut job = self.jobs.remove(index);
        let elapsed = job.reap();
        debug!(jid = job.jid, elapsed_us = elapsed.as_micros() as u64, "job waited on");
        Ok(WaitReport {
            elapsed,
            found: true,
        })
    }

    /// Reaps every remaining job, blocking on those still running.
    pub fn drain_blocking(&mut self) {
        for mut job in self.jobs.drain(..) {
            debug!(jid = job.jid, pid = job.pid(), "draining job");
            job.reap();
        }
    }
}

/// Lazy listing returned by [`JobTable::poll_and_list`].
///
/// Yields `(jid, display)` for every job still running when it is reached.
/// Jobs found finished are dropped from the table and skipped.
pub struct PollAndList<'a> {
    table: &'a mut JobTable,
    index: usize,
}

impl Iterator for PollAndList<'_> {
    type Item = (Jid, String);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(job) = self.table.jobs.get_mut(self.index) {
            if job.has_terminated() {
                let job = self.table.jobs.remove(self.index);
                debug!(jid = job.jid, "job finished, removed");
                continue;
            }
            self.index += 1;
            return Some((job.jid, job.display.clone()));
        }
        None
    }
}
