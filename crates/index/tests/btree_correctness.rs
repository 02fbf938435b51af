use index::BPlusTree;
use tempfile::TempDir;

fn int_tree(dir: &TempDir, name: &str, fanout: usize) -> BPlusTree<i32> {
    BPlusTree::open(dir.path().join(name), fanout).expect("open tree")
}

#[test]
fn small_tree_scan_returns_sorted_window() {
    let dir = TempDir::new().unwrap();
    let mut tree = int_tree(&dir, "small.idx", 4);

    for (key, rid) in [(10, 0), (20, 1), (5, 2), (15, 3), (25, 4), (3, 5), (30, 6), (12, 7)] {
        tree.insert(key, rid).unwrap();
    }

    let hits = tree.scan(&5, Some(&20)).unwrap();
    assert_eq!(hits, vec![(5, 2), (10, 0), (12, 7), (15, 3), (20, 1)]);
}

#[test]
fn duplicate_keys_scan_in_insertion_order() {
    let dir = TempDir::new().unwrap();
    let mut tree = int_tree(&dir, "dups.idx", 4);

    for rid in 0..3 {
        tree.insert(7, rid).unwrap();
    }

    let hits = tree.scan(&7, Some(&7)).unwrap();
    assert_eq!(hits, vec![(7, 0), (7, 1), (7, 2)]);
}

#[test]
fn leaf_chain_yields_every_pair_in_key_order() {
    let dir = TempDir::new().unwrap();
    let mut tree = int_tree(&dir, "chain.idx", 4);

    // A fixed permutation of [0, 500) so every split path gets exercised.
    let keys: Vec<i32> = (0..500).map(|i| (i * 7919) % 500).collect();
    for (rid, &key) in keys.iter().enumerate() {
        tree.insert(key, rid as u32).unwrap();
    }

    let mut expected: Vec<(i32, u32)> = keys
        .iter()
        .enumerate()
        .map(|(rid, &key)| (key, rid as u32))
        .collect();
    expected.sort_by_key(|&(key, _)| key);

    let hits = tree.scan(&0, None).unwrap();
    assert_eq!(hits.len(), 500, "full scan visits every inserted pair once");
    assert_eq!(hits, expected);
}

#[test]
fn bounded_scan_matches_reference_filter() {
    let dir = TempDir::new().unwrap();
    let mut tree = int_tree(&dir, "window.idx", 4);

    let keys: Vec<i32> = (0..200).map(|i| (i * 37) % 100).collect();
    for (rid, &key) in keys.iter().enumerate() {
        tree.insert(key, rid as u32).unwrap();
    }

    for (start, end) in [(0, 99), (10, 20), (50, 50), (95, 99)] {
        let hits = tree.scan(&start, Some(&end)).unwrap();
        let mut expected: Vec<(i32, u32)> = keys
            .iter()
            .enumerate()
            .filter(|&(_, &key)| key >= start && key <= end)
            .map(|(rid, &key)| (key, rid as u32))
            .collect();
        // ascending key, insertion order on ties
        expected.sort_by_key(|&(key, rid)| (key, rid));
        assert_eq!(hits, expected, "scan [{}, {}]", start, end);
    }
}

#[test]
fn scan_on_empty_tree_is_empty() {
    let dir = TempDir::new().unwrap();
    let tree = int_tree(&dir, "empty.idx", 4);
    assert!(tree.is_empty());
    assert!(tree.scan(&0, Some(&100)).unwrap().is_empty());
    assert!(tree.scan(&0, None).unwrap().is_empty());
}

#[test]
fn root_and_count_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("persist.idx");

    {
        let mut tree = BPlusTree::<i32>::open(&path, 4).unwrap();
        for key in (0..50).rev() {
            tree.insert(key, key as u32).unwrap();
        }
        assert_eq!(tree.row_count(), 50);
    }

    let tree = BPlusTree::<i32>::open(&path, 4).unwrap();
    assert_eq!(tree.row_count(), 50);
    let hits = tree.scan(&10, Some(&12)).unwrap();
    assert_eq!(hits, vec![(10, 10), (11, 11), (12, 12)]);
}

#[test]
fn float_keys_scan_by_numeric_order() {
    let dir = TempDir::new().unwrap();
    let mut tree = BPlusTree::<f64>::open(dir.path().join("area.idx"), 4).unwrap();

    for (rid, area) in [121.0, 67.5, 82.0, 45.0, 99.5].iter().enumerate() {
        tree.insert(*area, rid as u32).unwrap();
    }

    let hits = tree.scan(&60.0, Some(&100.0)).unwrap();
    assert_eq!(hits, vec![(67.5, 1), (82.0, 2), (99.5, 4)]);
}

#[test]
fn string_keys_scan_lexicographically() {
    let dir = TempDir::new().unwrap();
    let mut tree = BPlusTree::<String>::open(dir.path().join("town.idx"), 4).unwrap();

    let towns = ["BEDOK", "ANG MO KIO", "YISHUN", "CLEMENTI", "BISHAN"];
    for (rid, town) in towns.iter().enumerate() {
        tree.insert(town.to_string(), rid as u32).unwrap();
    }

    let hits = tree
        .scan(&"B".to_string(), Some(&"C".to_string()))
        .unwrap();
    let keys: Vec<&str> = hits.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["BEDOK", "BISHAN"]);
}

#[test]
fn long_strings_collide_on_their_63_byte_prefix() {
    let dir = TempDir::new().unwrap();
    let mut tree = BPlusTree::<String>::open(dir.path().join("street.idx"), 4).unwrap();

    let prefix = "a".repeat(63);
    tree.insert(format!("{}XYZ", prefix), 0).unwrap();
    tree.insert(format!("{}123", prefix), 1).unwrap();

    // Both were stored as the 63-byte prefix, so an equality scan on the
    // prefix finds both records.
    let hits = tree.scan(&prefix.clone(), Some(&prefix)).unwrap();
    assert_eq!(hits.len(), 2);
}
