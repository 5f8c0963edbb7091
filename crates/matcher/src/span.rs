//! Longest common contiguous word run between two documents.

/// A shared run of words: `len` words starting at `target_start` in the
/// target and `source_start` in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonRun {
    pub target_start: usize,
    pub source_start: usize,
    pub len: usize,
}

impl CommonRun {
    /// Index of the last target word in the run.
    pub fn target_last(&self) -> usize {
        self.target_start + self.len - 1
    }

    /// Index of the last source word in the run.
    pub fn source_last(&self) -> usize {
        self.source_start + self.len - 1
    }
}

/// Longest common substring over word hashes.
///
/// O(n·m) time and O(m) memory. Ties resolve to the earliest run in the
/// target, then in the source. `None` when the documents share no word.
pub fn longest_common_run(target: &[u64], source: &[u64]) -> Option<CommonRun> {
    if target.is_empty() || source.is_empty() {
        return None;
    }

    let mut prev = vec![0usize; source.len() + 1];
    let mut curr = vec![0usize; source.len() + 1];
    let mut best: Option<CommonRun> = None;

    for (i, t) in target.iter().enumerate() {
        for (j, s) in source.iter().enumerate() {
            curr[j + 1] = if t == s { prev[j] + 1 } else { 0 };
            let len = curr[j + 1];
            if len > best.map_or(0, |run| run.len) {
                best = Some(CommonRun {
                    target_start: i + 1 - len,
                    source_start: j + 1 - len,
                    len,
                });
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}
