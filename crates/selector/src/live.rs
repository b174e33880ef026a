//! Live match records for one selector component.
//!
//! A record remembers a `(level, sequence)` position where the component matched and
//! may still anchor the next component of the chain. Records are kept in insertion
//! order; anchoring always prefers the most recent (nearest-enclosing) one.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveMatch {
    pub level: u32,
    pub sequence: u32,
    pub active: bool,
}

#[derive(Clone, Debug, Default)]
pub struct LiveMatches {
    records: Vec<LiveMatch>,
}

impl LiveMatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, level: u32, sequence: u32) {
        // Retired records at this level can no longer anchor anything.
        self.records
            .retain(|record| record.active || record.level != level);
        let duplicate = self
            .records
            .iter()
            .any(|record| record.level == level && record.sequence == sequence);
        if !duplicate {
            self.records.push(LiveMatch {
                level,
                sequence,
                active: true,
            });
        }
    }

    pub fn deactivate_at(&mut self, level: u32) {
        for record in self.records.iter_mut().filter(|record| record.level == level) {
            record.active = false;
        }
    }

    pub fn remove_deeper_than(&mut self, level: u32) {
        self.records.retain(|record| record.level <= level);
    }

    /// Drop records at `level` and below it in the tree.
    pub fn remove_from(&mut self, level: u32) {
        self.records.retain(|record| record.level < level);
    }

    /// Active `(level, sequence)` pairs, most recent first.
    pub fn active_recent_first(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.records
            .iter()
            .rev()
            .filter(|record| record.active)
            .map(|record| (record.level, record.sequence))
    }

    pub fn has_active(&self) -> bool {
        self.records.iter().any(|record| record.active)
    }

    pub fn records(&self) -> &[LiveMatch] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
