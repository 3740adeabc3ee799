//! Double-array trie over token sequences.
//!
//! Used by generated handlers to decide whether a request field path was
//! already consumed by the body or a path parameter, and therefore must not be
//! populated again from the query string.

use std::collections::{BTreeMap, BTreeSet};
use std::iter;

/// A set of token sequences stored as a double-array trie.
///
/// Node `0` is the root. A child of node `n` reached by token code `c` lives
/// in slot `base[n] + c` and is valid only if `check[slot] == n + 1`. A
/// sequence ends where the child for the terminator code (the number of
/// distinct tokens) exists.
///
/// Tokens are encoded in lexical order and sequences are placed sorted and
/// deduplicated, so the same set of sequences always produces the same arrays
/// regardless of the order they were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoubleArray {
    encoding: BTreeMap<String, usize>,
    base: Vec<usize>,
    check: Vec<usize>,
}

impl DoubleArray {
    /// Build the trie from token sequences
    pub fn new<I, S, T>(seqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let seqs: Vec<Vec<String>> = seqs
            .into_iter()
            .map(|seq| seq.into_iter().map(|t| t.as_ref().to_string()).collect())
            .collect();
        if seqs.is_empty() {
            return Self::default();
        }

        let encoding: BTreeMap<String, usize> = seqs
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(code, token)| (token, code))
            .collect();
        let terminator = encoding.len();

        let mut encoded: Vec<Vec<usize>> = seqs
            .iter()
            .map(|seq| seq.iter().map(|t| encoding[t]).chain(iter::once(terminator)).collect())
            .collect();
        encoded.sort();
        encoded.dedup();

        let mut da = Self { encoding, base: vec![0], check: vec![0] };
        da.place(0, &encoded, 0);
        da.trim();
        da
    }

    /// Rebuild a trie from previously rendered arrays
    pub fn from_parts(encoding: &[(&str, usize)], base: &[usize], check: &[usize]) -> Self {
        Self {
            encoding: encoding.iter().map(|(t, c)| (t.to_string(), *c)).collect(),
            base: base.to_vec(),
            check: check.to_vec(),
        }
    }

    /// Token encoding, ordered by token
    pub fn encoding(&self) -> impl Iterator<Item = (&str, usize)> {
        self.encoding.iter().map(|(t, c)| (t.as_str(), *c))
    }

    /// Base array
    pub fn base(&self) -> &[usize] { &self.base }

    /// Check array
    pub fn check(&self) -> &[usize] { &self.check }

    /// Whether the trie holds no sequence
    pub fn is_empty(&self) -> bool { self.base.is_empty() }

    /// Whether `seq` is exactly one of the stored sequences
    pub fn contains<T: AsRef<str>>(&self, seq: &[T]) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut node = 0;
        for token in seq {
            match self.step(node, token.as_ref()) {
                Some(next) => node = next,
                None => return false,
            }
        }
        self.terminates(node)
    }

    /// Whether some stored sequence is a prefix of `seq` (or equal to it)
    pub fn has_common_prefix<T: AsRef<str>>(&self, seq: &[T]) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut node = 0;
        for token in seq {
            if self.terminates(node) {
                return true;
            }
            match self.step(node, token.as_ref()) {
                Some(next) => node = next,
                None => return false,
            }
        }
        self.terminates(node)
    }

    fn terminator(&self) -> usize { self.encoding.len() }

    fn child(&self, node: usize, code: usize) -> Option<usize> {
        let slot = *self.base.get(node)? + code;
        (self.check.get(slot) == Some(&(node + 1))).then_some(slot)
    }

    fn step(&self, node: usize, token: &str) -> Option<usize> {
        self.encoding.get(token).and_then(|&code| self.child(node, code))
    }

    fn terminates(&self, node: usize) -> bool { self.child(node, self.terminator()).is_some() }

    // `seqs` share their first `depth` codes and are sorted.
    fn place(&mut self, node: usize, seqs: &[Vec<usize>], depth: usize) {
        let mut groups: Vec<(usize, &[Vec<usize>])> = Vec::new();
        let mut start = 0;
        while start < seqs.len() {
            let code = seqs[start][depth];
            let len = seqs[start..].iter().take_while(|s| s[depth] == code).count();
            groups.push((code, &seqs[start..start + len]));
            start += len;
        }

        let base = self.free_base(groups.iter().map(|(code, _)| *code));
        self.base[node] = base;
        for (code, _) in &groups {
            let slot = base + code;
            self.reserve(slot);
            self.check[slot] = node + 1;
        }

        let terminator = self.terminator();
        for (code, group) in groups {
            if code != terminator {
                self.place(base + code, group, depth + 1);
            }
        }
    }

    fn free_base(&self, codes: impl Iterator<Item = usize> + Clone) -> usize {
        let mut base = 1;
        loop {
            if codes.clone().all(|code| self.check.get(base + code).map_or(true, |c| *c == 0)) {
                return base;
            }
            base += 1;
        }
    }

    fn reserve(&mut self, slot: usize) {
        if slot >= self.check.len() {
            self.base.resize(slot + 1, 0);
            self.check.resize(slot + 1, 0);
        }
    }

    fn trim(&mut self) {
        while self.check.len() > 1 && self.check.last() == Some(&0) {
            self.check.pop();
            self.base.pop();
        }
    }
}
