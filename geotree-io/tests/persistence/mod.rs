use std::cell::Cell;
use std::fs;

use crate::common::{build_tree, crs, expected_hits, grid_entries};
use geotree_io::{
    ByteOrder, FileTreeAccess, FixedDimension, Node, OpenOptions, SplitPolicy, TreeAccess,
    TreeAccessConfig, TreeError, TreeResult,
};
use tempfile::tempdir;

fn config() -> TreeAccessConfig {
    TreeAccessConfig::default()
        .with_magic_number(0x5254_5245)
        .with_version(2.0)
        .with_max_elements(12)
        .with_hilbert_order(3)
        .with_split(SplitPolicy::Linear)
        .with_buffer_size(512)
}

#[test]
fn test_header_roundtrip_both_byte_orders() {
    for order in [ByteOrder::Big, ByteOrder::Little] {
        let dir = tempdir().unwrap();
        let path = dir.path().join("header.tree");
        let config = config().with_byte_order(order);

        let mut access = FileTreeAccess::create(&path, &config, crs()).unwrap();
        build_tree(&mut access, &grid_entries(60), 12);
        access.set_tree_identifier(41);
        let root = access.read_node(1).unwrap();
        let high_water = access.state().node_id_high_water();
        access.close().unwrap();

        let header = FileTreeAccess::read_header(&path).unwrap();
        assert_eq!(header.byte_order, order);
        assert_eq!(header.node_id, high_water);

        let access = FileTreeAccess::open(&path, &config.open_options(), &FixedDimension(2)).unwrap();
        let state = access.state();
        assert_eq!(state.max_elements(), 12);
        assert_eq!(state.split(), SplitPolicy::Linear);
        assert_eq!(state.hilbert_order(), 3);
        assert_eq!(state.crs().encoded(), crs().encoded());
        assert_eq!(state.element_count(), 60);
        assert_eq!(state.tree_identifier(), 41);
        assert_eq!(state.node_id_high_water(), high_water);
        assert_eq!(access.root(), Some(&root));
    }
}

#[test]
fn test_corrupt_header_rejected_before_reading_nodes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.tree");
    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    build_tree(&mut access, &grid_entries(10), 4);
    access.close().unwrap();
    let pristine = fs::read(&path).unwrap();

    let codec_calls = Cell::new(0);
    let codec = |_: &[u8]| -> TreeResult<usize> {
        codec_calls.set(codec_calls.get() + 1);
        Ok(2)
    };

    let mut bytes = pristine.clone();
    bytes[0] ^= 0x01;
    fs::write(&path, &bytes).unwrap();
    let result = FileTreeAccess::open(&path, &config().open_options(), &codec);
    assert!(matches!(result, Err(TreeError::MagicMismatch { .. })));

    fs::write(&path, &pristine).unwrap();
    let options = OpenOptions::new(config().magic_number, 2.5);
    let result = FileTreeAccess::open(&path, &options, &codec);
    assert!(matches!(result, Err(TreeError::VersionMismatch { .. })));

    assert_eq!(codec_calls.get(), 0);
    assert!(FileTreeAccess::open(&path, &config().open_options(), &codec).is_ok());
    assert_eq!(codec_calls.get(), 1);
}

#[test]
fn test_never_closed_tree_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.tree");
    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    access.close().unwrap();

    let result = FileTreeAccess::open(&path, &config().open_options(), &FixedDimension(2));
    assert!(matches!(result, Err(TreeError::Unfinalized)));
}

#[test]
fn test_rewind_then_close_keeps_file_consistent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rewind.tree");
    let entries = grid_entries(80);
    let region = [2.0, 1.0, 9.0, 3.0];

    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    build_tree(&mut access, &entries, 6);
    access.close().unwrap();
    let first_len = fs::metadata(&path).unwrap().len();

    let mut access = FileTreeAccess::open(&path, &config().open_options(), &FixedDimension(2)).unwrap();
    access.rewind().unwrap();
    assert!(access.root().is_none());
    assert_eq!(access.state().node_id_high_water(), 0);
    assert_eq!(access.state().max_elements(), 12);

    build_tree(&mut access, &entries, 6);
    access.close().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), first_len);

    let mut access = FileTreeAccess::open(&path, &config().open_options(), &FixedDimension(2)).unwrap();
    assert_eq!(access.search(&region).unwrap(), expected_hits(&entries, &region));
}

#[test]
fn test_rewind_without_rebuild_keeps_previous_tree() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("abandoned.tree");
    let entries = grid_entries(30);
    let region = [0.0, 0.0, 20.0, 2.0];

    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    build_tree(&mut access, &entries, 5);
    access.set_element_count(entries.len() as i32);
    let high_water = access.state().node_id_high_water();
    access.rewind().unwrap();
    access.close().unwrap();

    let header = FileTreeAccess::read_header(&path).unwrap();
    assert_eq!(header.node_id, high_water);
    assert_eq!(header.element_count, 30);

    let mut access = FileTreeAccess::open(&path, &config().open_options(), &FixedDimension(2)).unwrap();
    assert_eq!(access.search(&region).unwrap(), expected_hits(&entries, &region));
}

#[test]
fn test_unwritten_ids_not_readable_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("allocated.tree");

    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    let ids: Vec<_> = (0..5).map(|_| access.new_node_id()).collect();
    for &id in &ids[..3] {
        access.write_node(&Node::data_entry(id, vec![0.0, 0.0, 1.0, 1.0], 0, id)).unwrap();
    }
    access.close().unwrap();

    let mut access = FileTreeAccess::open(&path, &config().open_options(), &FixedDimension(2)).unwrap();
    assert_eq!(access.header().node_id, 3);
    assert!(matches!(
        access.read_node(5),
        Err(TreeError::NodeOutOfRange { node_id: 5, limit: 3 })
    ));
    assert_eq!(access.new_node_id(), 4);
}

#[test]
fn test_rewind_to_smaller_tree_leaves_old_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shrink.tree");
    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    build_tree(&mut access, &grid_entries(100), 10);
    access.rewind().unwrap();

    let small = grid_entries(5);
    build_tree(&mut access, &small, 10);
    let high_water = access.state().node_id_high_water();
    access.close().unwrap();

    let mut access = FileTreeAccess::open(&path, &config().open_options(), &FixedDimension(2)).unwrap();
    assert_eq!(access.state().node_id_high_water(), high_water);
    let all = [0.0, 0.0, 100.0, 100.0];
    assert_eq!(access.search(&all).unwrap(), expected_hits(&small, &all));
    assert!(matches!(
        access.read_node(high_water + 1),
        Err(TreeError::NodeOutOfRange { .. })
    ));
}

#[test]
fn test_recycled_ids_reused_before_fresh() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("recycle.tree");
    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    build_tree(&mut access, &grid_entries(20), 5);
    let high_water = access.state().node_id_high_water();

    for id in [9, 4, 7] {
        let node = access.read_node(id).unwrap();
        access.remove_node(&node).unwrap();
    }
    assert_eq!(access.state().recycled_ids().collect::<Vec<_>>(), vec![4, 7, 9]);
    assert_eq!(access.new_node_id(), 4);

    let reused = Node::data_entry(7, vec![50.0, 50.0, 51.0, 51.0], 2, 700);
    access.write_node(&reused).unwrap();
    assert_eq!(access.new_node_id(), 9);
    assert_eq!(access.new_node_id(), high_water + 1);
}

#[test]
fn test_recycle_pool_not_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pool.tree");
    let mut access = FileTreeAccess::create(&path, &config(), crs()).unwrap();
    build_tree(&mut access, &grid_entries(20), 5);
    let high_water = access.state().node_id_high_water();
    let node = access.read_node(3).unwrap();
    access.remove_node(&node).unwrap();
    access.close().unwrap();

    let mut access = FileTreeAccess::open(&path, &config().open_options(), &FixedDimension(2)).unwrap();
    assert_eq!(access.state().recycled_ids().count(), 0);
    assert_eq!(access.new_node_id(), high_water + 1);
}
