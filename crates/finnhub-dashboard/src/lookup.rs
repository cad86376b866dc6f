/*
[INPUT]:  Query text changes and timer expirations
[OUTPUT]: Decisions on when to issue symbol-search calls
[POS]:    Lookup layer - outbound call throttling
[UPDATE]: When changing the rate-limit interval or scheduling rules
*/

use std::time::{Duration, Instant};

pub const DEFAULT_LOOKUP_INTERVAL: Duration = Duration::from_millis(300);

/// What the caller should do with a query change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Issue the request now
    IssueNow,
    /// A request for this query is pending until `due`
    Scheduled { due: Instant },
}

#[derive(Debug)]
enum ThrottleState {
    Idle,
    Pending { query: String, due: Instant },
}

/// Throttle state machine for outbound lookup calls.
///
/// At most one call per interval is issued. A query arriving inside the
/// interval overwrites the pending slot (last query wins); the caller drives
/// a single timer from [`LookupThrottle::next_due`] and calls
/// [`LookupThrottle::fire`] when it expires.
#[derive(Debug)]
pub struct LookupThrottle {
    interval: Duration,
    last_issued: Option<Instant>,
    state: ThrottleState,
}

impl LookupThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_issued: None,
            state: ThrottleState::Idle,
        }
    }

    /// Record a query change. Either the call may go out immediately, or it
    /// replaces the pending query and waits for the interval to elapse.
    pub fn on_query_changed(&mut self, query: &str, now: Instant) -> ThrottleDecision {
        match self.last_issued {
            Some(last) if now.duration_since(last) < self.interval => {
                let due = last + self.interval;
                self.state = ThrottleState::Pending {
                    query: query.to_string(),
                    due,
                };
                ThrottleDecision::Scheduled { due }
            }
            _ => {
                self.last_issued = Some(now);
                self.state = ThrottleState::Idle;
                ThrottleDecision::IssueNow
            }
        }
    }

    /// The instant the pending query becomes due, if any
    pub fn next_due(&self) -> Option<Instant> {
        match &self.state {
            ThrottleState::Pending { due, .. } => Some(*due),
            ThrottleState::Idle => None,
        }
    }

    /// Consume the pending query if its due time has been reached.
    ///
    /// Returns `None` when nothing is pending or the timer fired early (a
    /// newer query may have re-armed it); the caller just re-reads
    /// `next_due` and sleeps again.
    pub fn fire(&mut self, now: Instant) -> Option<String> {
        let ThrottleState::Pending { query, due } =
            std::mem::replace(&mut self.state, ThrottleState::Idle)
        else {
            return None;
        };
        if now < due {
            self.state = ThrottleState::Pending { query, due };
            return None;
        }
        self.last_issued = Some(now);
        Some(query)
    }

    /// Bypass the throttle for an explicit manual search: the interval
    /// restarts and any pending query is discarded.
    pub fn force(&mut self, now: Instant) {
        self.last_issued = Some(now);
        self.state = ThrottleState::Idle;
    }
}

impl Default for LookupThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(300);

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_first_query_issues_immediately() {
        let mut throttle = LookupThrottle::new(INTERVAL);
        let base = Instant::now();
        assert_eq!(
            throttle.on_query_changed("A", base),
            ThrottleDecision::IssueNow
        );
        assert_eq!(throttle.next_due(), None);
    }

    #[test]
    fn test_burst_coalesces_to_last_query() {
        let mut throttle = LookupThrottle::new(INTERVAL);
        let base = Instant::now();

        assert_eq!(
            throttle.on_query_changed("AAP", base),
            ThrottleDecision::IssueNow
        );
        // Two more keystrokes inside the interval: both get scheduled, the
        // later one overwrites the pending slot.
        let due = at(base, 300);
        assert_eq!(
            throttle.on_query_changed("AAPL", at(base, 50)),
            ThrottleDecision::Scheduled { due }
        );
        assert_eq!(
            throttle.on_query_changed("AAPLE", at(base, 120)),
            ThrottleDecision::Scheduled { due }
        );

        // Timer fires at the baseline + interval: exactly one request, for
        // the last query of the burst.
        assert_eq!(throttle.fire(due), Some("AAPLE".to_string()));
        assert_eq!(throttle.next_due(), None);
        assert_eq!(throttle.fire(at(base, 400)), None);
    }

    #[test]
    fn test_fire_before_due_rearms() {
        let mut throttle = LookupThrottle::new(INTERVAL);
        let base = Instant::now();
        throttle.on_query_changed("A", base);
        throttle.on_query_changed("AB", at(base, 100));

        assert_eq!(throttle.fire(at(base, 200)), None);
        assert_eq!(throttle.next_due(), Some(at(base, 300)));
        assert_eq!(throttle.fire(at(base, 300)), Some("AB".to_string()));
    }

    #[test]
    fn test_interval_elapsed_issues_again() {
        let mut throttle = LookupThrottle::new(INTERVAL);
        let base = Instant::now();
        throttle.on_query_changed("A", base);
        assert_eq!(
            throttle.on_query_changed("B", at(base, 301)),
            ThrottleDecision::IssueNow
        );
    }

    #[test]
    fn test_force_discards_pending() {
        let mut throttle = LookupThrottle::new(INTERVAL);
        let base = Instant::now();
        throttle.on_query_changed("A", base);
        throttle.on_query_changed("AB", at(base, 100));

        throttle.force(at(base, 150));
        assert_eq!(throttle.next_due(), None);
        assert_eq!(throttle.fire(at(base, 300)), None);

        // The forced call restarts the interval.
        let due = at(base, 450);
        assert_eq!(
            throttle.on_query_changed("ABC", at(base, 200)),
            ThrottleDecision::Scheduled { due }
        );
    }
}
