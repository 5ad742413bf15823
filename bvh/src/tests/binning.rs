use geometry::{Bounds3f, Vec3f};

use crate::binning::{find_split, split_fallback, split_serial};
use crate::tests::grid_mesh;
use crate::{
    AtomicList, BlockAllocator, BuildError, IdEncoding, Mapping, PrimInfo, PrimRef, PrimRefBlock,
    PrimRefList, TriangleSource, BIN_COUNT,
};

fn unit_ref(center: Vec3f, id: u32) -> PrimRef {
    let half = Vec3f::splat(0.25);
    PrimRef::new(
        Bounds3f {
            min: center - half,
            max: center + half,
        },
        id,
    )
}

fn populate(prims: &[PrimRef]) -> (PrimRefList, PrimInfo, BlockAllocator<PrimRefBlock>) {
    let alloc: BlockAllocator<PrimRefBlock> = BlockAllocator::new();
    let list = PrimRefList::new();
    let mut info = PrimInfo::EMPTY;
    let mut block = alloc.alloc();
    for &prim in prims {
        info.add(&prim);
        if !block.push(prim) {
            list.push(block);
            block = alloc.alloc();
            block.push(prim);
        }
    }
    list.push(block);
    (list, info, alloc)
}

#[test]
fn mapping_quantizes_centroids() {
    let bounds = Bounds3f {
        min: Vec3f::ZERO,
        max: Vec3f::splat(16.0),
    };
    let mapping = Mapping::new(&bounds);

    assert_eq!(mapping.bin(Vec3f::splat(0.0)), [0, 0, 0]);
    assert_eq!(mapping.bin(Vec3f::splat(16.0)), [BIN_COUNT - 1; 3]);
    assert!(mapping.is_left(Vec3f::splat(1.0), 0, 8));
    assert!(!mapping.is_left(Vec3f::splat(15.0), 0, 8));
}

#[test]
fn mapping_handles_flat_axes() {
    let bounds = Bounds3f {
        min: Vec3f::new(0.0, 5.0, 0.0),
        max: Vec3f::new(16.0, 5.0, 16.0),
    };
    let mapping = Mapping::new(&bounds);
    // Everything lands in bin 0 on the flat axis
    assert_eq!(mapping.bin(Vec3f::new(8.0, 5.0, 8.0))[1], 0);
}

#[test]
fn split_separates_two_clusters() {
    let mut prims = Vec::new();
    for i in 0..64 {
        prims.push(unit_ref(Vec3f::new(i as f32 * 0.01, 0.0, 0.0), i));
        prims.push(unit_ref(Vec3f::new(100.0 + i as f32 * 0.01, 0.0, 0.0), 64 + i));
    }
    let (mut list, info, _alloc) = populate(&prims);

    let split = find_split(&mut list, &info);
    assert!(split.is_valid());
    assert_eq!(split.axis, 0);
    assert_eq!(split.left_count, 64);
    assert_eq!(split.right_count, 64);
}

#[test]
fn split_serial_partitions_both_sides() {
    let mut prims = Vec::new();
    for i in 0..300 {
        let x = if i % 3 == 0 { 0.0 } else { 50.0 };
        prims.push(unit_ref(Vec3f::new(x, i as f32 * 0.01, 0.0), i));
    }
    let (mut list, info, alloc) = populate(&prims);
    let split = find_split(&mut list, &info);
    assert!(split.is_valid());

    let (left, right) = split_serial(&alloc, list, &split);
    assert_eq!(left.info.count + right.info.count, 300);
    assert_eq!(left.info.count, split.left_count);
    assert_eq!(right.info.count, split.right_count);
    assert!(left.info.geom_bounds.max.x < right.info.geom_bounds.min.x);
}

#[test]
fn fallback_split_halves_identical_centroids() {
    let prims: Vec<PrimRef> = (0..100).map(|i| unit_ref(Vec3f::ZERO, i)).collect();
    let (mut list, info, alloc) = populate(&prims);

    // Coincident centroids cannot be separated spatially
    let split = find_split(&mut list, &info);
    assert!(!split.is_valid());

    let (left, right) = split_fallback(&alloc, list, &info);
    assert_eq!(left.info.count, 50);
    assert_eq!(right.info.count, 50);
}

#[test]
fn id_encoding_round_trips() {
    let mesh = grid_mesh(4);
    let encoding = IdEncoding::new(&mesh).unwrap();
    for prim in 0..mesh.prim_count(0) as u32 {
        assert_eq!(encoding.decode(encoding.encode(0, prim)), (0, prim));
    }
}

#[test]
fn id_encoding_rejects_oversized_sources() {
    struct BigSource;
    impl TriangleSource for BigSource {
        fn group_count(&self) -> usize {
            1 << 20
        }
        fn prim_count(&self, _group: usize) -> usize {
            1 << 20
        }
        fn triangle(&self, _group: usize, _prim: usize, _sample: usize) -> [Vec3f; 3] {
            [Vec3f::ZERO; 3]
        }
    }

    match IdEncoding::new(&BigSource) {
        Err(BuildError::EncodingOverflow { groups, prims }) => {
            assert_eq!(groups, 1 << 20);
            assert_eq!(prims, 1 << 20);
        }
        _ => panic!("expected encoding overflow"),
    }
}

#[test]
fn atomic_list_orders_like_a_stack() {
    let mut list = AtomicList::new();
    list.push(1);
    list.push(2);
    list.push(3);
    assert_eq!(list.pop(), Some(3));
    assert_eq!(list.drain(), vec![2, 1]);
    assert!(list.is_empty());
}

#[test]
fn atomic_list_accepts_concurrent_pushes() {
    let list = AtomicList::new();
    std::thread::scope(|s| {
        for t in 0..4 {
            let list = &list;
            s.spawn(move || {
                for i in 0..1000 {
                    list.push(t * 1000 + i);
                }
            });
        }
    });

    let mut list = list;
    let mut items = list.drain();
    assert_eq!(items.len(), 4000);
    items.sort();
    items.dedup();
    assert_eq!(items.len(), 4000);
}

#[test]
fn block_allocator_recycles_cleared_blocks() {
    let alloc: BlockAllocator<PrimRefBlock> = BlockAllocator::new();
    let mut block = alloc.alloc();
    block.push(unit_ref(Vec3f::ZERO, 0));
    assert_eq!(block.len(), 1);
    alloc.free(block);

    let block = alloc.alloc();
    assert!(block.is_empty());

    let mut alloc = alloc;
    assert!(alloc.free_blocks() <= 1);
}
