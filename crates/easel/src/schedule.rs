//! Deferred calls keyed by id.
//!
//! The [`Scheduler`] holds at most one ticket per id. Scheduling under an id
//! that already has a ticket either leaves the existing ticket alone, which
//! coalesces bursts into a single call, or replaces it, which debounces them
//! so that the call happens once after the last request. Due tickets are
//! collected by the run loop, which owns the clock.
use std::{
    cell::Cell,
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
    rc::Rc,
    time::{Duration, Instant},
};

/// A scheduled entry on the heap. Entries whose sequence number no longer
/// matches the live ticket for their id are stale and skipped on collection.
#[derive(Debug)]
struct Pending {
    /// Scheduled time.
    due: Instant,
    /// Ticket sequence number.
    seq: u64,
    /// Ticket id.
    id: String,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

/// Reverse order so the closest deadline is at the top. Ties fire in
/// scheduling order.
impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse order so the closest deadline is at the top. Ties fire in
/// scheduling order.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A live ticket.
#[derive(Debug)]
struct Ticket<T> {
    /// Sequence number matching the heap entry.
    seq: u64,
    /// Scheduled time.
    due: Instant,
    /// Payload handed back when the ticket fires.
    payload: T,
}

/// Deferred-call tickets, at most one per id.
#[derive(Debug)]
pub struct Scheduler<T> {
    /// Live tickets by id.
    tickets: HashMap<String, Ticket<T>>,
    /// Deadline heap, possibly holding stale entries.
    heap: BinaryHeap<Pending>,
    /// Next sequence number.
    seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            tickets: HashMap::new(),
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }
}

impl<T> Scheduler<T> {
    /// Construct an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire under `id` after `delay` from `now`.
    ///
    /// If a ticket for `id` already exists and `replace` is false, nothing
    /// changes and the existing ticket keeps its deadline. With `replace`,
    /// the existing ticket is cancelled first. Returns true if a new ticket
    /// was created.
    pub fn schedule(
        &mut self,
        id: impl Into<String>,
        delay: Duration,
        payload: T,
        replace: bool,
        now: Instant,
    ) -> bool {
        let id = id.into();
        if self.tickets.contains_key(&id) {
            if !replace {
                return false;
            }
            self.cancel(&id);
        }
        self.seq += 1;
        let due = now + delay;
        self.heap.push(Pending {
            due,
            seq: self.seq,
            id: id.clone(),
        });
        self.tickets.insert(
            id,
            Ticket {
                seq: self.seq,
                due,
                payload,
            },
        );
        true
    }

    /// Cancel the ticket for `id`, returning its payload if one was pending.
    pub fn cancel(&mut self, id: &str) -> Option<T> {
        // The heap entry becomes stale and is dropped lazily.
        self.tickets.remove(id).map(|t| t.payload)
    }

    /// Cancel every outstanding ticket.
    pub fn cancel_all(&mut self) {
        self.tickets.clear();
        self.heap.clear();
    }

    /// Is a ticket pending for `id`?
    pub fn is_pending(&self, id: &str) -> bool {
        self.tickets.contains_key(id)
    }

    /// Number of live tickets.
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Are there no live tickets?
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// The earliest live deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tickets.values().map(|t| t.due).min()
    }

    /// Remove and return every ticket due at `now`, earliest first. Each
    /// ticket is removed before it is returned, so a payload may schedule a
    /// fresh ticket under its own id.
    pub fn take_due(&mut self, now: Instant) -> Vec<(String, T)> {
        let mut v = vec![];
        while let Some(top) = self.heap.peek() {
            if top.due > now {
                break;
            }
            let Some(p) = self.heap.pop() else { break };
            let live = self.tickets.get(&p.id).is_some_and(|t| t.seq == p.seq);
            if live && let Some(t) = self.tickets.remove(&p.id) {
                v.push((p.id, t.payload));
            }
        }
        v
    }
}

/// Cancellation token for a periodic task. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    /// Construct a live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the task.
    pub fn cancel(&self) {
        self.0.set(true);
    }

    /// Has the task been cancelled?
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn coalesce() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        assert!(s.schedule("redraw", ms(100), 1, false, now));
        assert!(!s.schedule("redraw", ms(100), 2, false, now + ms(50)));
        assert_eq!(s.len(), 1);
        assert!(s.take_due(now + ms(99)).is_empty());
        assert_eq!(s.take_due(now + ms(100)), vec![("redraw".to_string(), 1)]);
        assert!(s.take_due(now + ms(1000)).is_empty());
        assert!(!s.is_pending("redraw"));
    }

    #[test]
    fn replace() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        assert!(s.schedule("redraw", ms(100), 1, true, now));
        assert!(s.schedule("redraw", ms(100), 2, true, now + ms(30)));
        assert_eq!(s.next_deadline(), Some(now + ms(130)));
        // The first ticket's deadline passes without firing.
        assert!(s.take_due(now + ms(100)).is_empty());
        assert_eq!(s.take_due(now + ms(130)), vec![("redraw".to_string(), 2)]);
        assert!(s.is_empty());
    }

    #[test]
    fn cancel() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.schedule("a", ms(10), "a", false, now);
        s.schedule("b", ms(20), "b", false, now);
        s.schedule("c", ms(5), "c", false, now);
        assert_eq!(s.cancel("a"), Some("a"));
        assert_eq!(s.cancel("a"), None);
        assert_eq!(s.next_deadline(), Some(now + ms(5)));
        assert_eq!(
            s.take_due(now + ms(100)),
            vec![("c".to_string(), "c"), ("b".to_string(), "b")]
        );

        s.schedule("a", ms(10), "a", false, now);
        s.cancel_all();
        assert!(s.is_empty());
        assert_eq!(s.next_deadline(), None);
        assert!(s.take_due(now + ms(100)).is_empty());
    }

    #[test]
    fn reschedule_after_firing() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.schedule("timer", ms(100), (), false, now);
        for (id, ()) in s.take_due(now + ms(100)) {
            assert!(s.schedule(id, ms(100), (), false, now + ms(100)));
        }
        assert_eq!(s.next_deadline(), Some(now + ms(200)));
    }

    #[test]
    fn ordering() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.schedule("late", ms(30), 3, false, now);
        s.schedule("first", ms(10), 1, false, now);
        s.schedule("tie", ms(10), 2, false, now);
        let ids: Vec<_> = s.take_due(now + ms(30)).into_iter().map(|x| x.1).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn token() {
        let t = CancelToken::new();
        let t2 = t.clone();
        assert!(!t2.is_cancelled());
        t.cancel();
        assert!(t2.is_cancelled());
    }
}
