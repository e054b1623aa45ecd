use std::fmt;
use std::ops::AddAssign;
use std::time::Duration;

/// Counters describing the effort spent by a single search.
///
/// A fresh set of metrics is produced by every search call; accumulate them
/// with `+=` when reporting over a whole instance set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchMetrics {
    /// Nodes removed from the open list and expanded.
    pub expanded: u64,
    /// Edges relaxed, i.e. successors looked at during expansions.
    pub touched: u64,
    /// Expansions of nodes that had already been expanded before.
    pub reopened: u64,
    /// Nodes generated, i.e. reached for the first time.
    pub generated: u64,
    /// Generated nodes that were never expanded.
    pub surplus: u64,
    /// Heap pushes, pops, and decrease-keys.
    pub heap_ops: u64,
    /// Wall-clock time spent searching.
    pub time: Duration,
}

impl AddAssign for SearchMetrics {
    fn add_assign(&mut self, rhs: SearchMetrics) {
        self.expanded += rhs.expanded;
        self.touched += rhs.touched;
        self.reopened += rhs.reopened;
        self.generated += rhs.generated;
        self.surplus += rhs.surplus;
        self.heap_ops += rhs.heap_ops;
        self.time += rhs.time;
    }
}

impl fmt::Display for SearchMetrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "time_elapsed_nano={} nodes expanded={} touched={} reopened={} \
             generated={} surplus={} heap-ops={}",
            self.time.as_nanos(),
            self.expanded,
            self.touched,
            self.reopened,
            self.generated,
            self.surplus,
            self.heap_ops,
        )
    }
}

#[test]
fn accumulates() {
    let mut total = SearchMetrics::default();
    let run = SearchMetrics {
        expanded: 10,
        touched: 35,
        reopened: 1,
        generated: 20,
        surplus: 11,
        heap_ops: 40,
        time: Duration::from_millis(3),
    };
    total += run;
    total += run;
    assert_eq!(total.expanded, 20);
    assert_eq!(total.surplus, 22);
    assert_eq!(total.time, Duration::from_millis(6));
}
