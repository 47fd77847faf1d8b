//! Randomized allocator invariants: the free and allocated blocks always
//! partition the address space exactly, freeing always coalesces, and
//! best-fit picks the smallest sufficient block.

use proptest::prelude::*;
use spillway_heap::{Block, Handle, Heap, HeapManager};

#[derive(Debug, Clone)]
enum Op {
    Allocate(u64),
    /// Frees the nth live handle (modulo the live count).
    Free(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0_u64..600).prop_map(Op::Allocate),
        any::<usize>().prop_map(Op::Free),
    ]
}

fn apply(manager: &mut HeapManager, live: &mut Vec<Handle>, op: &Op) {
    match op {
        Op::Allocate(length) => {
            let handle = manager.allocate(*length).expect("allocation should succeed");
            live.push(handle);
        }
        Op::Free(selector) => {
            if live.is_empty() {
                return;
            }
            let handle = live.swap_remove(selector % live.len());
            manager.free(handle).expect("freeing a live handle should succeed");
        }
    }
}

/// Allocated ∪ free must cover `[0, heap_length)` with no gaps or overlaps.
fn assert_partition(manager: &HeapManager) {
    let mut blocks: Vec<Block> = manager
        .allocated_blocks()
        .chain(manager.free_blocks())
        .copied()
        .collect();
    blocks.sort_unstable_by_key(|block| (block.offset(), block.length()));

    let mut cursor = 0;
    for block in &blocks {
        assert!(
            block.offset() <= cursor,
            "gap before offset {}: cursor only reached {cursor}",
            block.offset()
        );
        assert!(
            block.length() == 0 || block.offset() == cursor,
            "block at {} overlaps the block ending at {cursor}",
            block.offset()
        );
        cursor = cursor.max(block.end());
    }
    assert_eq!(cursor, manager.heap_length(), "blocks must reach the heap end");
}

fn assert_no_adjacent_free(manager: &HeapManager) {
    let mut free: Vec<Block> = manager.free_blocks().copied().collect();
    free.sort_unstable_by_key(Block::offset);
    for window in free.windows(2) {
        assert!(
            window[0].end() != window[1].offset() || window[0].length() == 0,
            "free blocks at {} and {} are adjacent",
            window[0].offset(),
            window[1].offset()
        );
    }
}

proptest! {
    #[test]
    fn partition_holds_under_random_ops(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let mut manager = HeapManager::new(64);
        let mut live = Vec::new();
        for op in &ops {
            apply(&mut manager, &mut live, op);
            assert_partition(&manager);
            prop_assert_eq!(manager.allocated_count(), live.len());
        }
    }

    #[test]
    fn free_always_coalesces(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let mut manager = HeapManager::new(64);
        let mut live = Vec::new();
        for op in &ops {
            apply(&mut manager, &mut live, op);
            if matches!(op, Op::Free(_)) {
                assert_no_adjacent_free(&manager);
            }
        }
    }

    #[test]
    fn best_fit_selects_the_smallest_sufficient_block(
        ops in proptest::collection::vec(op_strategy(), 1..120),
        request in 0_u64..600,
    ) {
        let mut manager = HeapManager::new(64);
        let mut live = Vec::new();
        for op in &ops {
            apply(&mut manager, &mut live, op);
        }

        let expected = manager
            .free_blocks()
            .filter(|block| block.length() >= request)
            .map(Block::length)
            .min();
        let found = manager.find_free_block(request);
        prop_assert_eq!(found.map(|block| block.length()), expected);
    }

    #[test]
    fn allocated_lengths_are_exact(lengths in proptest::collection::vec(0_u64..600, 1..60)) {
        let mut manager = HeapManager::new(64);
        for &length in &lengths {
            let handle = manager.allocate(length).expect("allocation should succeed");
            let block = manager.allocated_block(handle).expect("block is live");
            prop_assert_eq!(block.length(), length);
        }
    }

    #[test]
    fn heap_round_trips_arbitrary_payloads(payloads in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..300),
        1..20,
    )) {
        let mut heap = Heap::in_memory(128);
        let handles: Vec<_> = payloads
            .iter()
            .map(|payload| {
                let handle = heap.allocate(payload.len() as u64).expect("should allocate");
                heap.write(handle, payload).expect("should write");
                handle
            })
            .collect();

        for (handle, payload) in handles.iter().zip(&payloads) {
            prop_assert_eq!(&heap.read(*handle).expect("should read"), payload);
        }
    }
}
