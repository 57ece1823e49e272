use std::collections::{BTreeMap, HashMap};

/// Running tally of favorite toys seen by one consumer session.
///
/// Counts only ever grow, and their sum is the number of accepted events.
/// Toy names are matched exactly, case and whitespace included.
#[derive(Debug, Default, Clone)]
pub struct ToyCounts {
    counts: HashMap<String, u64>,
    total: u64,
}

impl ToyCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation and returns the new count for `toy`.
    pub fn record(&mut self, toy: &str) -> u64 {
        self.total += 1;
        let count = self.counts.entry(toy.to_owned()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, toy: &str) -> u64 {
        self.counts.get(toy).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Point-in-time copy, sorted by toy name so reports are stable.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts
            .iter()
            .map(|(toy, count)| (toy.clone(), *count))
            .collect()
    }
}
