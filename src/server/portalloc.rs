//! The passive port allocator: the one piece of mutable state shared by all sessions.
//!
//! Ports are handed out lowest first. A lease that is never connected to is taken back once its
//! deadline has passed; there is no timer for that, every call into the allocator sweeps expired
//! leases first. Once the data connection is accepted the lease is pinned and only goes back to
//! the free set when the [`PortLease`] guard is dropped.

use super::session::TraceId;
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    ops::RangeInclusive,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};
use thiserror::Error;

/// Returned by [`PassivePortAllocator::lease`] when every port of the range is leased.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAllocationError {
    /// No free port is left in the range.
    #[error("no free passive port")]
    Exhausted,
}

#[derive(Debug)]
struct LeaseEntry {
    id: u64,
    session: TraceId,
    acquired_at: Instant,
    pinned: bool,
}

#[derive(Debug)]
struct PortTable {
    free: BTreeSet<u16>,
    leased: HashMap<u16, LeaseEntry>,
    next_id: u64,
}

impl PortTable {
    fn sweep(&mut self, now: Instant, lease_timeout: Duration, logger: &slog::Logger) {
        let expired: Vec<u16> = self
            .leased
            .iter()
            .filter(|(_, entry)| !entry.pinned && now.duration_since(entry.acquired_at) >= lease_timeout)
            .map(|(port, _)| *port)
            .collect();
        for port in expired {
            if let Some(entry) = self.leased.remove(&port) {
                slog::info!(logger, "Reclaiming abandoned passive port {}", port; "trace-id" => %entry.session);
            }
            self.free.insert(port);
        }
    }
}

pub(crate) struct PassivePortAllocator {
    range: RangeInclusive<u16>,
    lease_timeout: Duration,
    table: Mutex<PortTable>,
    logger: slog::Logger,
}

impl fmt::Debug for PassivePortAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassivePortAllocator")
            .field("range", &self.range)
            .field("lease_timeout", &self.lease_timeout)
            .finish()
    }
}

impl PassivePortAllocator {
    pub fn new(range: RangeInclusive<u16>, lease_timeout: Duration, logger: slog::Logger) -> Self {
        PassivePortAllocator {
            table: Mutex::new(PortTable {
                free: range.clone().collect(),
                leased: HashMap::new(),
                next_id: 0,
            }),
            range,
            lease_timeout,
            logger,
        }
    }

    // Every mutation of the table is a single insert/remove pair, so a poisoned table is still
    // consistent.
    fn table(&self) -> MutexGuard<'_, PortTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Leases the lowest free port on behalf of `session`.
    pub fn lease(self: &Arc<Self>, session: TraceId) -> Result<PortLease, PortAllocationError> {
        let now = Instant::now();
        let mut table = self.table();
        table.sweep(now, self.lease_timeout, &self.logger);
        let port = table.free.pop_first().ok_or(PortAllocationError::Exhausted)?;
        table.next_id += 1;
        let id = table.next_id;
        table.leased.insert(
            port,
            LeaseEntry {
                id,
                session,
                acquired_at: now,
                pinned: false,
            },
        );
        Ok(PortLease {
            port,
            id,
            allocator: Arc::clone(self),
        })
    }

    fn pin(&self, port: u16, id: u64) -> bool {
        let mut table = self.table();
        match table.leased.get_mut(&port) {
            Some(entry) if entry.id == id => {
                entry.pinned = true;
                true
            }
            _ => false,
        }
    }

    fn release(&self, port: u16, id: u64) {
        let mut table = self.table();
        table.sweep(Instant::now(), self.lease_timeout, &self.logger);
        // The lease may have expired and the port been handed to someone else since.
        if table.leased.get(&port).is_some_and(|entry| entry.id == id) {
            table.leased.remove(&port);
            table.free.insert(port);
        }
    }

    /// Takes back every lease held by `session`, pinned or not.
    pub fn release_session(&self, session: TraceId) {
        let mut table = self.table();
        let ports: Vec<u16> = table.leased.iter().filter(|(_, e)| e.session == session).map(|(p, _)| *p).collect();
        for port in ports {
            table.leased.remove(&port);
            table.free.insert(port);
        }
    }

    /// The ports currently free, in ascending order. Expired leases count as free.
    #[cfg(test)]
    pub fn free_ports(&self) -> Vec<u16> {
        let mut table = self.table();
        table.sweep(Instant::now(), self.lease_timeout, &self.logger);
        table.free.iter().copied().collect()
    }

    pub fn range(&self) -> &RangeInclusive<u16> {
        &self.range
    }
}

/// A leased passive port. The port goes back to the free set when this is dropped.
pub(crate) struct PortLease {
    port: u16,
    id: u64,
    allocator: Arc<PassivePortAllocator>,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Exempts the lease from expiry, used once the data connection was accepted. Returns false
    /// if the lease had already expired.
    pub fn pin(&self) -> bool {
        self.allocator.pin(self.port, self.id)
    }
}

impl fmt::Debug for PortLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortLease").field("port", &self.port).field("id", &self.id).finish()
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.allocator.release(self.port, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn allocator(range: RangeInclusive<u16>, lease_timeout: Duration) -> Arc<PassivePortAllocator> {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        Arc::new(PassivePortAllocator::new(range, lease_timeout, logger))
    }

    #[test]
    fn leases_lowest_free_port_first() {
        let alloc = allocator(4000..=4002, Duration::from_secs(60));
        let session = TraceId::new();
        let a = alloc.lease(session).unwrap();
        let b = alloc.lease(session).unwrap();
        assert_eq!((a.port(), b.port()), (4000, 4001));
        drop(a);
        let c = alloc.lease(session).unwrap();
        assert_eq!(c.port(), 4000);
    }

    #[test]
    fn balanced_lease_and_release_restores_the_range() {
        let alloc = allocator(5000..=5009, Duration::from_secs(60));
        let session = TraceId::new();
        let leases: Vec<PortLease> = (0..7).map(|_| alloc.lease(session).unwrap()).collect();
        assert_eq!(alloc.free_ports(), vec![5007, 5008, 5009]);
        drop(leases);
        assert_eq!(alloc.free_ports(), (5000..=5009).collect::<Vec<_>>());
    }

    #[test]
    fn exhausted_when_nothing_is_free() {
        let alloc = allocator(6000..=6009, Duration::from_secs(60));
        let session = TraceId::new();
        let mut held: Vec<PortLease> = (0..10).map(|_| alloc.lease(session).unwrap()).collect();
        assert!(held.iter().all(|l| alloc.range().contains(&l.port())));
        assert_eq!(alloc.lease(session).unwrap_err(), PortAllocationError::Exhausted);

        drop(held.remove(3));
        assert_eq!(alloc.lease(session).unwrap().port(), 6003);
    }

    #[test]
    fn abandoned_lease_is_reclaimed_after_deadline() {
        let alloc = allocator(7000..=7000, Duration::from_millis(20));
        let stale = alloc.lease(TraceId::new()).unwrap();
        assert!(alloc.lease(TraceId::new()).is_err());

        std::thread::sleep(Duration::from_millis(30));
        let fresh = alloc.lease(TraceId::new()).unwrap();
        assert_eq!(fresh.port(), 7000);
        assert!(!stale.pin());

        // Dropping the stale guard must not free the port that now belongs to `fresh`.
        drop(stale);
        assert!(alloc.free_ports().is_empty());
        drop(fresh);
        assert_eq!(alloc.free_ports(), vec![7000]);
    }

    #[test]
    fn pinned_lease_survives_its_deadline() {
        let alloc = allocator(8000..=8000, Duration::from_millis(10));
        let lease = alloc.lease(TraceId::new()).unwrap();
        assert!(lease.pin());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(alloc.lease(TraceId::new()).unwrap_err(), PortAllocationError::Exhausted);
    }

    #[test]
    fn release_session_frees_all_its_ports() {
        let alloc = allocator(9000..=9003, Duration::from_secs(60));
        let (alice, bob) = (TraceId::new(), TraceId::new());
        let _a1 = alloc.lease(alice).unwrap();
        let _b = alloc.lease(bob).unwrap();
        let _a2 = alloc.lease(alice).unwrap();
        alloc.release_session(alice);
        assert_eq!(alloc.free_ports(), vec![9000, 9002, 9003]);
    }
}
