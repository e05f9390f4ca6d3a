use seqkeep_model::FIRST_SEQUENCE;
use std::collections::BTreeMap;

/// Snapshot of how far a partition is from a dense ordering.
///
/// Values are stored sequence values, not caller-facing positions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DensityReport {
    /// Rows in the partition, assigned or not.
    pub members: usize,
    /// Expected values (`FIRST_SEQUENCE..FIRST_SEQUENCE + assigned`) that no row holds.
    pub gaps: Vec<i64>,
    /// Values held by more than one row.
    pub duplicates: Vec<i64>,
    /// Values outside the expected range.
    pub out_of_range: Vec<i64>,
    /// Rows with no sequence value.
    pub unassigned: usize,
}

impl DensityReport {
    /// Builds a report from the sequence values of every row in a partition.
    pub fn from_sequences(sequences: impl IntoIterator<Item = Option<i64>>) -> Self {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        let mut report = Self::default();
        for sequence in sequences {
            report.members += 1;
            match sequence {
                Some(seq) => *counts.entry(seq).or_default() += 1,
                None => report.unassigned += 1,
            }
        }

        let assigned = (report.members - report.unassigned) as i64;
        let expected = FIRST_SEQUENCE..FIRST_SEQUENCE + assigned;
        report.gaps = expected.clone().filter(|v| !counts.contains_key(v)).collect();
        for (&seq, &count) in &counts {
            if count > 1 {
                report.duplicates.push(seq);
            }
            if !expected.contains(&seq) {
                report.out_of_range.push(seq);
            }
        }
        report
    }

    pub fn is_dense(&self) -> bool {
        self.gaps.is_empty()
            && self.duplicates.is_empty()
            && self.out_of_range.is_empty()
            && self.unassigned == 0
    }
}
