//! Property tests for the query-parameter filter trie

use proptest::prelude::*;
use triplegate_runtime::utilities::DoubleArray;

fn token() -> impl Strategy<Value = String> { prop::sample::select(vec!["a", "b", "c", "id", "name"]).prop_map(String::from) }

fn seq() -> impl Strategy<Value = Vec<String>> { prop::collection::vec(token(), 1..4) }

proptest! {
    #[test]
    fn insertion_order_does_not_matter(seqs in prop::collection::vec(seq(), 0..8).prop_shuffle(), seed in any::<u64>()) {
        let mut reordered = seqs.clone();
        let len = reordered.len().max(1);
        reordered.rotate_left((seed as usize) % len);
        reordered.reverse();
        prop_assert_eq!(DoubleArray::new(&seqs), DoubleArray::new(&reordered));
    }

    #[test]
    fn contains_exactly_the_inserted_set(seqs in prop::collection::vec(seq(), 0..8), query in seq()) {
        let da = DoubleArray::new(&seqs);
        for s in &seqs {
            prop_assert!(da.contains(s));
            prop_assert!(da.has_common_prefix(s));
        }
        prop_assert_eq!(da.contains(&query), seqs.contains(&query));
        let prefixed = seqs.iter().any(|s| query.starts_with(s));
        prop_assert_eq!(da.has_common_prefix(&query), prefixed);
    }
}
