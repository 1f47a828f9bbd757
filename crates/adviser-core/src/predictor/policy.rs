//! Bounded reward table learned by the reinforcement style predictors.

use std::collections::HashMap;

use crate::package::PackageTuple;

/// Accumulated reward of one package tuple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyEntry {
    pub total_reward: f64,
    pub visits: u64,
}

impl PolicyEntry {
    pub fn average(&self) -> f64 {
        if self.visits == 0 {
            return 0.0;
        }
        self.total_reward / self.visits as f64
    }
}

/// Reward table keyed by package tuple.
///
/// The size is checked every `check_interval` iterations; when it exceeds
/// `max_size` the entries with the lowest average reward are dropped.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    entries: HashMap<PackageTuple, PolicyEntry>,
    max_size: usize,
    check_interval: usize,
    last_check: usize,
}

impl PolicyTable {
    pub fn new(max_size: usize, check_interval: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_size: max_size.max(1),
            check_interval: check_interval.max(1),
            last_check: 0,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, package_tuple: &PackageTuple) -> Option<&PolicyEntry> {
        self.entries.get(package_tuple)
    }

    pub fn average(&self, package_tuple: &PackageTuple) -> Option<f64> {
        self.entries.get(package_tuple).map(PolicyEntry::average)
    }

    /// Overwrite an entry
    pub fn insert(&mut self, package_tuple: PackageTuple, entry: PolicyEntry) {
        self.entries.insert(package_tuple, entry);
    }

    /// Add `reward` to the tuple's total and count one visit
    pub fn record(&mut self, package_tuple: &PackageTuple, reward: f64) {
        let entry = self
            .entries
            .entry(package_tuple.clone())
            .or_insert(PolicyEntry {
                total_reward: 0.0,
                visits: 0,
            });
        entry.total_reward += reward;
        entry.visits += 1;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_check = 0;
    }

    /// Shrink the table if a check is due at `iteration`; returns the number of dropped entries
    pub fn maybe_shrink(&mut self, iteration: usize) -> usize {
        if iteration < self.last_check + self.check_interval {
            return 0;
        }
        self.last_check = iteration;
        self.shrink()
    }

    /// Drop the lowest average entries until the table fits `max_size`
    pub fn shrink(&mut self) -> usize {
        if self.entries.len() <= self.max_size {
            return 0;
        }

        let mut ranked: Vec<(f64, PackageTuple)> = self
            .entries
            .iter()
            .map(|(tuple, entry)| (entry.average(), tuple.clone()))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let excess = self.entries.len() - self.max_size;
        for (_, tuple) in ranked.into_iter().take(excess) {
            self.entries.remove(&tuple);
        }
        log::debug!("Policy table shrunk by {} entries to {}", excess, self.entries.len());
        excess
    }
}
