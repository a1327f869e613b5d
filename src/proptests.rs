use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

/// Small alphabet so generated keys share prefixes and collide inside
/// buckets, forcing chain⇄tree conversions and table resizes.
const ALPHABET: [char; 6] = ['a', 'b', 'c', 'd', 'é', '本'];

fn key_strategy() -> impl Strategy<Value = String> + Clone {
    prop::collection::vec(0usize..ALPHABET.len(), 1..=6)
        .prop_map(|ix| ix.into_iter().map(|i| ALPHABET[i]).collect())
}

#[derive(Clone, Debug)]
enum Op {
    Put(String, u64),
    Remove(String),
    Get(String),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Put(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        25 => key.clone().prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=2000)
}

fn model_height(model: &BTreeMap<String, u64>) -> usize {
    model.keys().map(|k| k.chars().count()).max().unwrap_or(0)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_model_equivalence(ops in ops_strategy()) {
        let trie: StripedTrie<u64> = StripedTrie::new();
        let mut model: BTreeMap<String, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    let old_t = trie.put(&key, value).unwrap();
                    let old_m = model.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = trie.remove(&key).unwrap();
                    let old_m = model.remove(&key);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    let got_t = trie.get(&key).unwrap();
                    let got_m = model.get(&key).copied();
                    prop_assert_eq!(got_t, got_m);
                }
            }

            prop_assert_eq!(trie.len(), model.len());
        }

        prop_assert_eq!(trie.height(), model_height(&model));

        // Full enumeration agrees with the model, in the model's order.
        let got = trie.keys(usize::MAX);
        let expected: Vec<String> = model.keys().cloned().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_prefix_enumeration_matches_model(ops in ops_strategy(), prefix in key_strategy()) {
        let trie: StripedTrie<u64> = StripedTrie::new();
        let mut model: BTreeMap<String, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    trie.put(&key, value).unwrap();
                    model.insert(key, value);
                }
                Op::Remove(key) => {
                    trie.remove(&key).unwrap();
                    model.remove(&key);
                }
                Op::Get(_) => {}
            }
        }

        let got: Vec<String> = trie
            .keys_with_prefix(&prefix, usize::MAX, usize::MAX, true)
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        let expected: Vec<String> = model
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_longest_prefix_match_matches_model(ops in ops_strategy(), word in key_strategy()) {
        let trie: StripedTrie<u64> = StripedTrie::new();
        let mut model: BTreeMap<String, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    trie.put(&key, value).unwrap();
                    model.insert(key, value);
                }
                Op::Remove(key) => {
                    trie.remove(&key).unwrap();
                    model.remove(&key);
                }
                Op::Get(_) => {}
            }
        }

        let got = trie.prefix_match(&word, true).unwrap().map(|m| m.key);
        let expected = model
            .keys()
            .filter(|k| word.starts_with(k.as_str()))
            .max_by_key(|k| k.len())
            .cloned();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = ["a", "b", "ab", "abc", "abd", "ba"];

    for_each_permutation(&keys, |perm| {
        let trie: StripedTrie<u64> = StripedTrie::new();
        for (i, key) in perm.iter().enumerate() {
            trie.put(key, i as u64).unwrap();
        }
        let mut expected: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(trie.keys(usize::MAX), expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = ["a", "b", "ab", "abc", "abd", "ba"];

    for_each_permutation(&keys, |perm| {
        let trie: StripedTrie<u64> = StripedTrie::new();
        for (i, key) in keys.iter().enumerate() {
            trie.put(key, i as u64).unwrap();
        }
        for (i, key) in perm.iter().enumerate() {
            assert!(trie.remove(key).unwrap().is_some(), "missing {key}");
            assert_eq!(trie.len(), keys.len() - i - 1);
        }
        assert!(trie.is_empty());
        assert_eq!(trie.height(), 0);
    });
}
