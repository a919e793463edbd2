//! Knuth-Morris-Pratt search for frame markers

/// Precomputed matcher for a fixed byte pattern.
///
/// The failure table is built once, so the same matcher can scan any
/// number of buffers (or shrinking views of one buffer) in linear time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSearch {
    pattern: Vec<u8>,
    failure: Vec<usize>,
}

impl MarkerSearch {
    /// Build a matcher for `pattern`
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            pattern: pattern.to_vec(),
            failure: failure_table(pattern),
        }
    }

    /// The pattern being searched for
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Index of the leftmost occurrence of the pattern in `haystack`
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        let m = self.pattern.len();
        if m == 0 {
            return Some(0);
        }

        let mut j = 0;
        for (i, &byte) in haystack.iter().enumerate() {
            while j > 0 && self.pattern[j] != byte {
                j = self.failure[j - 1];
            }
            if self.pattern[j] == byte {
                j += 1;
            }
            if j == m {
                return Some(i + 1 - m);
            }
        }
        None
    }
}

/// `failure[i]` is the length of the longest proper prefix of
/// `pattern[..=i]` that is also a suffix of it.
fn failure_table(pattern: &[u8]) -> Vec<usize> {
    let mut failure = vec![0; pattern.len()];
    let mut j = 0;
    for i in 1..pattern.len() {
        while j > 0 && pattern[j] != pattern[i] {
            j = failure[j - 1];
        }
        if pattern[j] == pattern[i] {
            j += 1;
        }
        failure[i] = j;
    }
    failure
}
