//! Property tests for linear memory bounds

use kiln_foundation::{MemoryType, PAGE_SIZE};
use kiln_runtime::{LinearMemory, TrapCode};
use proptest::prelude::*;

const PAGES: u32 = 2;

fn filled() -> LinearMemory {
    let mut memory = LinearMemory::allocate(MemoryType::new(PAGES, Some(PAGES)), PAGES).unwrap();
    let size = memory.data_size();
    for (i, byte) in memory.bytes_mut().iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    assert_eq!(size, PAGES as usize * PAGE_SIZE);
    memory
}

fn offsets() -> impl Strategy<Value = u64> {
    let size = u64::from(PAGES) * PAGE_SIZE as u64;
    prop_oneof![0..size, size - 16..size + 16, any::<u64>()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn accesses_succeed_exactly_when_in_bounds(addr in offsets(), width in prop::sample::select(vec![1u32, 2, 4, 8])) {
        let mut memory = filled();
        let before = memory.bytes().to_vec();
        let in_bounds = addr.checked_add(u64::from(width)).is_some_and(|end| end <= before.len() as u64);

        let loaded = memory.load(addr, width);
        prop_assert_eq!(loaded.is_ok(), in_bounds);

        let stored = memory.store(addr, width, u64::MAX);
        if in_bounds {
            prop_assert!(stored.is_ok());
            let start = addr as usize;
            prop_assert!(memory.bytes()[start..start + width as usize].iter().all(|&b| b == 0xFF));
        } else {
            prop_assert_eq!(stored, Err(TrapCode::OutOfBoundsMemoryAccess));
            prop_assert_eq!(memory.bytes(), &before[..]);
        }
    }

    #[test]
    fn failed_bulk_operations_touch_nothing(dst in offsets(), src in offsets(), len in 0u64..70_000) {
        let mut memory = filled();
        let before = memory.bytes().to_vec();
        let size = before.len() as u64;
        let fits = |at: u64| at.checked_add(len).is_some_and(|end| end <= size);

        if memory.fill(dst, 0, len).is_err() {
            prop_assert!(!fits(dst));
            prop_assert_eq!(memory.bytes(), &before[..]);
        }

        let mut memory = filled();
        let copied = memory.copy(dst, src, len);
        prop_assert_eq!(copied.is_ok(), fits(dst) && fits(src));
        if copied.is_err() {
            prop_assert_eq!(memory.bytes(), &before[..]);
        }
    }

    #[test]
    fn grow_is_all_or_nothing(delta in 0u32..4) {
        let mut memory = filled();
        let result = memory.grow(delta);
        if delta == 0 {
            prop_assert_eq!(result.ok(), Some(PAGES));
        } else {
            prop_assert!(result.is_err());
        }
        prop_assert_eq!(memory.size(), PAGES);
    }
}
