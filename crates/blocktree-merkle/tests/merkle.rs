//! Integration tests for tree construction, lookup and the reverse reader

use blocktree_merkle::{
    checksum_of, merklefy, reverse_merklefy, HashAlgorithm, MerkleError, MerkleTree,
    ReverseSeekReader, TreeConfig,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::thread;

fn repeat(seq: &str, count: usize) -> Vec<u8> {
    seq.repeat(count).into_bytes()
}

fn sha(data: &[u8]) -> String {
    checksum_of(&mut *HashAlgorithm::Sha256.hasher(), data)
}

fn mixed_stream() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(repeat("a", 10));
    data.extend(repeat("b", 15));
    data.extend(repeat("c", 15));
    data.extend(repeat("de", 40));
    data.extend(repeat("a", 10));
    data
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

fn build(data: &[u8], block_size: u64) -> MerkleTree {
    merklefy(Some(Cursor::new(data.to_vec())), HashAlgorithm::Sha256.hasher(), block_size).unwrap()
}

fn assert_mixed_stream_lookups(algorithm: HashAlgorithm) {
    let data = mixed_stream();
    assert_eq!(data.len(), 130);
    let tree = merklefy(Some(Cursor::new(data)), algorithm.hasher(), 10).unwrap();
    assert_eq!(tree.algorithm(), algorithm.as_str());

    let sum = |data: &[u8]| checksum_of(&mut *algorithm.hasher(), data);
    let ranges = |checksum: &str| -> Vec<(u64, u64)> {
        tree.lookup(checksum)
            .unwrap()
            .iter()
            .map(|n| (n.start(), n.end()))
            .collect()
    };

    assert_eq!(ranges(&sum(&repeat("a", 10))), vec![(0, 10), (120, 130)]);

    let de: Vec<_> = (4..12).map(|i| (i * 10, i * 10 + 10)).collect();
    assert_eq!(ranges(&sum(&repeat("de", 5))), de);

    let mut bc = repeat("b", 5);
    bc.extend(repeat("c", 5));
    assert_eq!(ranges(&sum(&bc)), vec![(20, 30)]);

    assert!(ranges(&sum(&repeat("a", 12))).is_empty());
    assert!(ranges(&sum(&repeat("X", 10))).is_empty());
}

#[test]
fn test_mixed_stream_lookups() {
    assert_mixed_stream_lookups(HashAlgorithm::Sha256);
}

#[test]
fn test_mixed_stream_lookups_blake2b() {
    assert_mixed_stream_lookups(HashAlgorithm::Blake2b);

    // Same stream, different primitive: no checksum carries over.
    let data = mixed_stream();
    let tree = merklefy(Some(Cursor::new(data)), HashAlgorithm::Blake2b.hasher(), 10).unwrap();
    assert!(tree.lookup(&sha(&repeat("a", 10))).unwrap().is_empty());
}

#[test]
fn test_duplicate_internal_nodes_indexed() {
    // Four identical blocks: both level-one parents share a checksum.
    let tree = build(&repeat("z", 16), 4);
    let leaf = tree.leaves().next().unwrap().checksum().to_string();
    assert_eq!(tree.lookup(&leaf).unwrap().len(), 4);

    let root = tree.root().unwrap();
    let (left, _) = tree.children(root).unwrap();
    let matches = tree.lookup(left.checksum()).unwrap();
    let ranges: Vec<_> = matches.iter().map(|n| n.range()).collect();
    assert_eq!(ranges, vec![0..8, 8..16]);
    assert!(matches.iter().all(|n| !n.is_leaf()));
}

#[test]
fn test_leaf_count_and_ranges() {
    for (seed, len, block) in [(1, 1usize, 10u64), (2, 99, 10), (3, 100, 10), (4, 1000, 7), (5, 4097, 4096)] {
        let data = random_bytes(seed, len);
        let tree = build(&data, block);

        let expected = (len as u64 + block - 1) / block;
        assert_eq!(tree.leaf_count() as u64, expected, "len {} block {}", len, block);
        assert_eq!(tree.leaves().last().unwrap().end(), len as u64);
        assert_eq!(tree.root().unwrap().range(), 0..len as u64);

        let mut offset = 0;
        for leaf in tree.leaves() {
            assert_eq!(leaf.start(), offset);
            assert_eq!(leaf.checksum(), sha(&data[leaf.start() as usize..leaf.end() as usize]));
            offset = leaf.end();
        }
    }
}

#[test]
fn test_deterministic_rebuild() {
    let data = random_bytes(42, 5000);
    let first = build(&data, 64);
    let second = build(&data, 64);

    assert_eq!(first.root_checksum(), second.root_checksum());
    assert_eq!(first.index(), second.index());
}

#[test]
fn test_odd_level_carries_last_node() {
    // Three leaves: the third is carried up and becomes the root's right child.
    let data = repeat("abc", 4);
    let tree = build(&data, 4);
    assert_eq!(tree.leaf_count(), 3);

    let last = tree.leaves().last().unwrap();
    let root = tree.root().unwrap();
    let (_, right) = tree.children(root).unwrap();
    assert_eq!(right.id(), last.id());
    assert_eq!(right.range(), 8..12);
    assert_eq!(right.checksum(), sha(&data[8..12]));
    assert_eq!(tree.len(), 5);
}

#[test]
fn test_verify_built_trees() {
    for len in [1usize, 2, 3, 17, 256, 1023] {
        let mut tree = build(&random_bytes(len as u64, len), 8);
        tree.verify().unwrap();
    }
}

#[test]
fn test_lookup_before_and_after_build() {
    let mut tree = MerkleTree::with_algorithm(HashAlgorithm::Blake3);
    assert!(matches!(tree.lookup("00"), Err(MerkleError::NotIndexed)));

    tree.merklefy(Some(Cursor::new(Vec::new())), 10).unwrap();
    assert!(tree.lookup("00").unwrap().is_empty());
}

#[test]
fn test_concurrent_lookups() {
    let data = mixed_stream();
    let tree = Arc::new(build(&data, 10));
    let checksum = sha(&repeat("de", 5));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tree = Arc::clone(&tree);
            let checksum = checksum.clone();
            thread::spawn(move || {
                let mut visited = 0usize;
                tree.traverse(|_| visited += 1);
                (tree.lookup(&checksum).unwrap().len(), visited)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), (8, tree.len()));
    }
}

#[test]
fn test_reverse_reader_matches_forward_read() {
    let data = random_bytes(7, 10_000);
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    file.seek(SeekFrom::Start(0)).unwrap();
    let mut forward = Vec::new();
    file.read_to_end(&mut forward).unwrap();

    let mut reader = ReverseSeekReader::new(file).unwrap();
    let mut drained = Vec::new();
    let n = reader.read_to_end(&mut drained).unwrap();
    assert_eq!(n, data.len());

    drained.reverse();
    assert_eq!(drained, forward);
}

#[test]
fn test_reverse_reader_with_io_copy() {
    let data = random_bytes(9, 3333);
    let mut reader = ReverseSeekReader::new(Cursor::new(data.clone())).unwrap();
    let mut sink = Vec::new();
    let n = std::io::copy(&mut reader, &mut sink).unwrap();
    assert_eq!(n, 3333);
    assert!(reader.is_at_start());

    sink.reverse();
    assert_eq!(sink, data);
}

#[test]
fn test_reverse_merklefy_indexes_reversed_stream() {
    let data = b"0123456789abcdefXYZ".to_vec();
    let tree = reverse_merklefy(Some(Cursor::new(data.clone())), HashAlgorithm::Sha256.hasher(), 8).unwrap();

    let mut reversed = data.clone();
    reversed.reverse();
    let forward_of_reversed = build(&reversed, 8);

    assert_eq!(tree.root_checksum(), forward_of_reversed.root_checksum());
    assert_eq!(tree.byte_len(), data.len() as u64);
    assert_eq!(tree.lookup(&sha(b"ZYXfedcb")).unwrap()[0].range(), 0..8);
}

#[test]
fn test_build_with_config_from_file() {
    let data = mixed_stream();
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&data).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let config = TreeConfig {
        block_size: 10,
        ..Default::default()
    };
    let tree = MerkleTree::build_with_config(Some(file), &config).unwrap();
    assert_eq!(tree.root_checksum(), build(&data, 10).root_checksum());
    assert_eq!(tree.block_size(), 10);
}
