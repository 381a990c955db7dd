use std::thread;

use crate::common::{build_tree, crs, expected_hits, grid_entries};
use geotree_io::{
    ChildLink, FileTreeAccess, FixedDimension, MemoryTreeAccess, Node, NodeProperties,
    SharedTreeAccess, TreeAccess, TreeAccessConfig, TreeError,
};
use rand::Rng;
use tempfile::tempdir;

fn both_backends(entries: &[([f64; 4], u32)], fanout: usize) -> (tempfile::TempDir, FileTreeAccess, MemoryTreeAccess) {
    let config = TreeAccessConfig::default().with_buffer_size(1024);
    let dir = tempdir().unwrap();
    let mut file = FileTreeAccess::create(dir.path().join("search.tree"), &config, crs()).unwrap();
    let mut memory = MemoryTreeAccess::new(&config, crs()).unwrap();
    build_tree(&mut file, entries, fanout);
    build_tree(&mut memory, entries, fanout);
    (dir, file, memory)
}

#[test]
fn test_empty_tree_finds_nothing() {
    let (_dir, mut file, mut memory) = both_backends(&[], 4);
    let everything = [f64::MIN, f64::MIN, f64::MAX, f64::MAX];
    assert!(file.search(&everything).unwrap().is_empty());
    assert!(memory.search(&everything).unwrap().is_empty());
}

#[test]
fn test_fixed_regions_agree() {
    let entries = grid_entries(300);
    let (_dir, mut file, mut memory) = both_backends(&entries, 7);

    let regions = [
        // everything
        [-1.0, -1.0, 100.0, 100.0],
        // disjoint
        [200.0, 200.0, 300.0, 300.0],
        // partial
        [3.2, 4.0, 8.7, 9.1],
        // touching a single corner
        [4.5, 4.5, 4.5, 4.5],
    ];
    for region in &regions {
        let expected = expected_hits(&entries, region);
        assert_eq!(file.search(region).unwrap(), expected, "file {:?}", region);
        assert_eq!(memory.search(region).unwrap(), expected, "memory {:?}", region);
    }
    assert_eq!(file.search(&regions[0]).unwrap().len(), 300);
    assert_eq!(file.search(&regions[3]).unwrap().len(), 1);
}

#[test]
fn test_random_regions_agree() {
    let entries = grid_entries(500);
    let (_dir, mut file, mut memory) = both_backends(&entries, 11);
    let mut rng = rand::thread_rng();

    for _ in 0..100 {
        let x = rng.gen_range(-2.0..22.0);
        let y = rng.gen_range(-2.0..27.0);
        let region = [x, y, x + rng.gen_range(0.0..6.0), y + rng.gen_range(0.0..6.0)];
        let from_file = file.search(&region).unwrap();
        assert_eq!(from_file, memory.search(&region).unwrap());
        assert_eq!(from_file, expected_hits(&entries, &region));
    }
}

#[test]
fn test_results_grow_past_initial_capacity() {
    let entries = grid_entries(1000);
    let (_dir, mut file, _memory) = both_backends(&entries, 16);
    let hits = file.search(&[0.0, 0.0, 20.0, 50.0]).unwrap();
    assert_eq!(hits.len(), 1000);
    assert_eq!(hits, (1..=1000).collect::<Vec<u32>>());
}

#[test]
fn test_nan_sentinel_never_matches() {
    let config = TreeAccessConfig::default();
    let mut memory = MemoryTreeAccess::new(&config, crs()).unwrap();
    let dir = tempdir().unwrap();
    let mut file = FileTreeAccess::create(dir.path().join("nan.tree"), &config, crs()).unwrap();

    let root = Node::new(1, Some(vec![0.0, 0.0, 10.0, 10.0]), NodeProperties::LEAF, 0, 0, ChildLink::Node(2), 2);
    let hidden = Node::new(2, None, NodeProperties::DATA, 1, 3, ChildLink::Data(20), 0);
    let visible = Node::data_entry(3, vec![1.0, 1.0, 2.0, 2.0], 1, 30);
    for node in [&root, &hidden, &visible] {
        file.write_node(node).unwrap();
        memory.write_node(node).unwrap();
    }

    let everything = [f64::NEG_INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::INFINITY];
    assert_eq!(file.search(&everything).unwrap(), vec![30]);
    assert_eq!(memory.search(&everything).unwrap(), vec![30]);

    let nan_region = [f64::NAN; 4];
    assert!(file.search(&nan_region).unwrap().is_empty());
    assert!(memory.search(&nan_region).unwrap().is_empty());
}

#[test]
fn test_reopened_tree_searches_like_memory() {
    let entries = grid_entries(120);
    let (dir, mut file, mut memory) = both_backends(&entries, 5);
    file.close().unwrap();

    let path = dir.path().join("search.tree");
    let options = TreeAccessConfig::default().with_buffer_size(100).open_options();
    let mut reopened = FileTreeAccess::open(&path, &options, &FixedDimension(2)).unwrap();
    let region = [0.0, 0.0, 7.5, 3.5];
    assert_eq!(reopened.search(&region).unwrap(), memory.search(&region).unwrap());
}

#[test]
fn test_shared_file_access_across_threads() {
    let entries = grid_entries(200);
    let (_dir, file, _memory) = both_backends(&entries, 8);
    let shared = SharedTreeAccess::new(file);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            let entries = entries.clone();
            thread::spawn(move || {
                let x = (i * 5) as f64;
                let region = [x, 0.0, x + 4.0, 9.0];
                for _ in 0..20 {
                    assert_eq!(shared.search(&region).unwrap(), expected_hits(&entries, &region));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    shared.close().unwrap();
    assert!(shared.is_closed());
}

#[test]
fn test_backends_reject_the_same_links() {
    let (_dir, mut file, mut memory) = both_backends(&[], 4);
    let root = Node::new(1, Some(vec![0.0, 0.0, 10.0, 10.0]), NodeProperties::empty(), 0, 0, ChildLink::Node(2), 1);
    file.write_node(&root).unwrap();
    memory.write_node(&root).unwrap();

    let zero_data = Node::data_entry(2, vec![0.0, 0.0, 1.0, 1.0], 1, 0);
    let mut wide_child = Node::data_entry(2, vec![0.0, 0.0, 1.0, 1.0], 1, 5);
    wide_child.child = ChildLink::Node(3_000_000_000);
    let mut wide_parent = Node::data_entry(2, vec![0.0, 0.0, 1.0, 1.0], 1, 5);
    wide_parent.parent_id = 1 << 31;

    for node in [&zero_data, &wide_child, &wide_parent] {
        assert!(matches!(file.write_node(node), Err(TreeError::LinkOutOfRange { node_id: 2, .. })));
        assert!(matches!(memory.write_node(node), Err(TreeError::LinkOutOfRange { node_id: 2, .. })));
    }

    let largest = Node::data_entry(2, vec![0.0, 0.0, 1.0, 1.0], 1, 1 << 31);
    file.write_node(&largest).unwrap();
    memory.write_node(&largest).unwrap();
    let everything = [0.0, 0.0, 10.0, 10.0];
    assert_eq!(file.search(&everything).unwrap(), vec![1 << 31]);
    assert_eq!(memory.search(&everything).unwrap(), vec![1 << 31]);
}
