//! Mock SMF client context
//!
//! All mutable client state lives here, shared between the command thread
//! and the heartbeat thread: the message sequence allocator, the association
//! state, the session registry with its per-session rule change caches, and
//! the terminate flag.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use thiserror::Error;

use pfcp::header::PfcpMessageType;
use pfcp::PfcpError;

/// Offset between the NTP and Unix epochs, in seconds
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Recovery Time Stamp value for the current instant (NTP era seconds)
pub fn recovery_time_stamp_now() -> u32 {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    (unix + NTP_UNIX_OFFSET) as u32
}

/// Errors raised by client operations
#[derive(Debug, Error)]
pub enum SmfError {
    #[error("session with SEID {0} already exists")]
    DuplicateSession(u64),

    #[error("no session with SEID {0}")]
    UnknownSession(u64),

    #[error("peer SEID for session {0} has not yet been received")]
    PeerSeidNotAssigned(u64),

    #[error("expected {} but received {}", expected.name(), received.name())]
    UnexpectedResponse {
        expected: PfcpMessageType,
        received: PfcpMessageType,
    },

    #[error("UE pool holds {capacity} usable addresses, {requested} requested")]
    AddressPoolExhausted { requested: usize, capacity: usize },

    #[error(transparent)]
    Codec(#[from] PfcpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SmfResult<T> = Result<T, SmfError>;

// ============================================================================
// Sequence allocator
// ============================================================================

/// Allocator for PFCP message sequence numbers
///
/// Increment-then-return: after a reset the next allocated value is 1.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    current: Mutex<u32>,
}

impl SequenceCounter {
    pub fn next(&self) -> u32 {
        let mut current = self.current.lock().expect("sequence lock poisoned");
        *current = current.wrapping_add(1);
        *current
    }

    pub fn reset(&self) {
        *self.current.lock().expect("sequence lock poisoned") = 0;
    }
}

// ============================================================================
// Rule change cache
// ============================================================================

/// How a rule about to be sent relates to what was previously sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleChange {
    /// Never sent under this rule ID
    New,
    /// Byte-identical to the last transmission
    Unchanged,
    /// Sent before with different content
    Changed,
}

/// Cache of the last-sent canonical body per rule ID, for one rule kind
///
/// `classify` stores the candidate before comparing, so the rule counts as
/// sent even if the enclosing request never goes out or fails. This
/// optimistic ordering is deliberate and relied upon by callers.
#[derive(Debug, Default)]
pub struct RuleCache {
    sent: HashMap<u32, Bytes>,
}

impl RuleCache {
    pub fn classify(&mut self, rule_id: u32, body: Bytes) -> RuleChange {
        match self.sent.insert(rule_id, body.clone()) {
            None => RuleChange::New,
            Some(previous) if previous == body => RuleChange::Unchanged,
            Some(_) => RuleChange::Changed,
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// One PFCP session and the rules sent for it
#[derive(Debug)]
pub struct Session {
    pub our_seid: u64,
    /// The UPF's SEID for this session, from the establishment response
    pub peer_seid: Option<u64>,
    pub sent_pdrs: RuleCache,
    pub sent_fars: RuleCache,
    pub sent_qers: RuleCache,
    pub sent_urrs: RuleCache,
}

impl Session {
    pub fn new(our_seid: u64) -> Self {
        Self {
            our_seid,
            peer_seid: None,
            sent_pdrs: RuleCache::default(),
            sent_fars: RuleCache::default(),
            sent_qers: RuleCache::default(),
            sent_urrs: RuleCache::default(),
        }
    }

    pub fn peer_seid(&self) -> SmfResult<u64> {
        self.peer_seid
            .ok_or(SmfError::PeerSeidNotAssigned(self.our_seid))
    }
}

/// Association state toward the UPF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationState {
    Idle,
    Established,
}

// ============================================================================
// Context
// ============================================================================

/// The client context shared by both threads
#[derive(Debug)]
pub struct SmfContext {
    pub local_addr: Ipv4Addr,
    pub recovery_time_stamp: u32,
    sequence: SequenceCounter,
    associated: AtomicBool,
    terminating: AtomicBool,
    sessions: Mutex<HashMap<u64, Session>>,
}

impl SmfContext {
    pub fn new(local_addr: Ipv4Addr, recovery_time_stamp: u32) -> Self {
        Self {
            local_addr,
            recovery_time_stamp,
            sequence: SequenceCounter::default(),
            associated: AtomicBool::new(false),
            terminating: AtomicBool::new(false),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn next_sequence(&self) -> u32 {
        self.sequence.next()
    }

    pub fn reset_sequence(&self) {
        self.sequence.reset();
    }

    pub fn association_state(&self) -> AssociationState {
        if self.associated.load(Ordering::SeqCst) {
            AssociationState::Established
        } else {
            AssociationState::Idle
        }
    }

    pub fn is_established(&self) -> bool {
        self.association_state() == AssociationState::Established
    }

    pub fn set_established(&self, established: bool) {
        self.associated.store(established, Ordering::SeqCst);
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    pub fn set_terminating(&self) {
        self.terminating.store(true, Ordering::SeqCst);
    }

    /// Register a new session under our SEID
    pub fn register_session(&self, our_seid: u64) -> SmfResult<()> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        if sessions.contains_key(&our_seid) {
            return Err(SmfError::DuplicateSession(our_seid));
        }
        sessions.insert(our_seid, Session::new(our_seid));
        Ok(())
    }

    /// Run `f` against a registered session
    pub fn with_session<R>(
        &self,
        our_seid: u64,
        f: impl FnOnce(&mut Session) -> SmfResult<R>,
    ) -> SmfResult<R> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions
            .get_mut(&our_seid)
            .ok_or(SmfError::UnknownSession(our_seid))?;
        f(session)
    }

    /// Remove a session and drop its rule caches
    pub fn remove_session(&self, our_seid: u64) -> SmfResult<Session> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .remove(&our_seid)
            .ok_or(SmfError::UnknownSession(our_seid))
    }

    /// Our SEIDs of all registered sessions, in ascending order
    pub fn session_seids(&self) -> Vec<u64> {
        let sessions = self.sessions.lock().expect("session lock poisoned");
        let mut seids: Vec<u64> = sessions.keys().copied().collect();
        seids.sort_unstable();
        seids
    }

    /// Ungraceful local teardown: back to Idle, all sessions dropped,
    /// nothing sent to the peer
    pub fn interrupt(&self) {
        self.set_established(false);
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sequence_increments_from_one() {
        let counter = SequenceCounter::default();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.next(), 3);
    }

    #[test]
    fn sequence_reset_restarts_at_one() {
        let counter = SequenceCounter::default();
        counter.next();
        counter.next();
        counter.reset();
        assert_eq!(counter.next(), 1);
    }

    #[test]
    fn concurrent_allocations_are_distinct() {
        let counter = Arc::new(SequenceCounter::default());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || (0..500).map(|_| counter.next()).collect::<Vec<u32>>())
            })
            .collect();

        let mut allocated: Vec<u32> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        allocated.sort_unstable();
        allocated.dedup();
        assert_eq!(allocated.len(), 1000);
    }

    #[test]
    fn first_classification_is_new() {
        let mut cache = RuleCache::default();
        assert_eq!(
            cache.classify(1, Bytes::from_static(b"abc")),
            RuleChange::New
        );
    }

    #[test]
    fn identical_resubmission_is_unchanged() {
        let mut cache = RuleCache::default();
        cache.classify(1, Bytes::from_static(b"abc"));
        assert_eq!(
            cache.classify(1, Bytes::from_static(b"abc")),
            RuleChange::Unchanged
        );
    }

    #[test]
    fn differing_resubmission_is_changed_and_stored() {
        let mut cache = RuleCache::default();
        cache.classify(1, Bytes::from_static(b"abc"));
        assert_eq!(
            cache.classify(1, Bytes::from_static(b"xyz")),
            RuleChange::Changed
        );
        // The candidate was stored even though the caller may not send it
        assert_eq!(
            cache.classify(1, Bytes::from_static(b"xyz")),
            RuleChange::Unchanged
        );
    }

    #[test]
    fn rule_ids_are_independent() {
        let mut cache = RuleCache::default();
        cache.classify(1, Bytes::from_static(b"abc"));
        assert_eq!(
            cache.classify(2, Bytes::from_static(b"abc")),
            RuleChange::New
        );
    }

    #[test]
    fn duplicate_session_is_rejected() {
        let ctx = SmfContext::new(Ipv4Addr::LOCALHOST, 0);
        ctx.register_session(5).unwrap();
        assert!(matches!(
            ctx.register_session(5),
            Err(SmfError::DuplicateSession(5))
        ));
    }

    #[test]
    fn unknown_session_is_rejected() {
        let ctx = SmfContext::new(Ipv4Addr::LOCALHOST, 0);
        assert!(matches!(
            ctx.with_session(9, |_| Ok(())),
            Err(SmfError::UnknownSession(9))
        ));
        assert!(matches!(
            ctx.remove_session(9),
            Err(SmfError::UnknownSession(9))
        ));
    }

    #[test]
    fn peer_seid_must_be_assigned_before_use() {
        let ctx = SmfContext::new(Ipv4Addr::LOCALHOST, 0);
        ctx.register_session(1).unwrap();
        let err = ctx.with_session(1, |s| s.peer_seid()).unwrap_err();
        assert!(matches!(err, SmfError::PeerSeidNotAssigned(1)));

        ctx.with_session(1, |s| {
            s.peer_seid = Some(42);
            Ok(())
        })
        .unwrap();
        assert_eq!(ctx.with_session(1, |s| s.peer_seid()).unwrap(), 42);
    }

    #[test]
    fn interrupt_clears_state_locally() {
        let ctx = SmfContext::new(Ipv4Addr::LOCALHOST, 0);
        ctx.set_established(true);
        ctx.register_session(1).unwrap();
        ctx.register_session(2).unwrap();

        ctx.interrupt();
        assert!(!ctx.is_established());
        assert!(ctx.session_seids().is_empty());
    }
}
