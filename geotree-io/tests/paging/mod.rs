use crate::common::{build_tree, crs, grid_entries};
use geotree_io::{
    ChildLink, FileTreeAccess, MemoryTreeAccess, Node, NodeId, NodeProperties, TreeAccess,
    TreeAccessConfig,
};
use rand::seq::SliceRandom;
use tempfile::tempdir;

const RECORD_SIZE: usize = 4 * 8 + 16 + 1;

#[test]
fn test_paging_with_three_windows_and_one() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("paging.tree");
    let records_per_window = 3;
    let config = TreeAccessConfig::default().with_buffer_size(RECORD_SIZE * records_per_window);
    let mut access = FileTreeAccess::create(&path, &config, crs()).unwrap();

    let total = (3 * records_per_window + 1) as NodeId;
    let nodes: Vec<Node> = (1..=total)
        .map(|id| {
            let v = id as f64;
            Node::new(id, Some(vec![v, v, v + 1.0, v + 1.0]), NodeProperties::LEAF, 0, 0, ChildLink::Data(id * 3), id)
        })
        .collect();
    for node in &nodes {
        access.write_node(node).unwrap();
    }
    assert!(access.stats().window_flushes >= 3);

    let mut order: Vec<&Node> = nodes.iter().collect();
    order.shuffle(&mut rand::thread_rng());
    for node in order {
        assert_eq!(&access.read_node(node.node_id).unwrap(), node);
    }
}

#[test]
fn test_file_matches_memory_node_by_node() {
    let entries = grid_entries(250);
    let config = TreeAccessConfig::default().with_buffer_size(RECORD_SIZE * 7 + 3);

    let dir = tempdir().unwrap();
    let mut file = FileTreeAccess::create(dir.path().join("nodes.tree"), &config, crs()).unwrap();
    let mut memory = MemoryTreeAccess::new(&config, crs()).unwrap();
    build_tree(&mut file, &entries, 9);
    build_tree(&mut memory, &entries, 9);

    let high_water = file.state().node_id_high_water();
    assert_eq!(high_water, memory.state().node_id_high_water());
    for id in (1..=high_water).rev() {
        assert_eq!(file.read_node(id).unwrap(), memory.read_node(id).unwrap(), "node {}", id);
    }
}

#[test]
fn test_file_length_is_header_plus_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("length.tree");
    let config = TreeAccessConfig::default().with_buffer_size(RECORD_SIZE * 4);
    let mut access = FileTreeAccess::create(&path, &config, crs()).unwrap();
    build_tree(&mut access, &grid_entries(40), 8);
    let nodes = access.state().node_id_high_water() as u64;
    let header_len = access.header().encoded_len() as u64;
    access.close().unwrap();

    let len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len, header_len + nodes * RECORD_SIZE as u64);
}

#[test]
fn test_read_only_session_writes_nothing_but_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("readonly.tree");
    let config = TreeAccessConfig::default().with_buffer_size(RECORD_SIZE * 2);
    let mut access = FileTreeAccess::create(&path, &config, crs()).unwrap();
    build_tree(&mut access, &grid_entries(30), 5);
    access.close().unwrap();
    let before = std::fs::read(&path).unwrap();

    let mut access = FileTreeAccess::open(&path, &config.open_options(), &geotree_io::FixedDimension(2)).unwrap();
    access.search(&[0.0, 0.0, 100.0, 100.0]).unwrap();
    assert_eq!(access.stats().window_flushes, 0);
    access.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), before);
}
