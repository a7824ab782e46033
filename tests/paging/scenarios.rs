use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use virtmem::error::Result;
use virtmem::pager::frame::PageState;
use virtmem::pager::replacer::Policy;
use virtmem::pager::Stats;

use crate::FRAME_SIZE;

const POLICIES: [Policy; 3] = [Policy::Random, Policy::Fifo, Policy::Custom];

fn addr(page: usize) -> usize {
    page * FRAME_SIZE
}

#[test]
fn fifo_read_scan() -> Result<()> {
    setup!(vm, 4, 2, Policy::Fifo);
    vm.read_u8(addr(0))?;
    vm.read_u8(addr(1))?;
    vm.read_u8(addr(2))?;
    // the first admitted page goes first
    assert_eq!(Some(PageState::Absent), vm.handler().state(0));
    assert_eq!(Some(PageState::Clean), vm.handler().state(1));
    assert_eq!(Stats { faults: 3, reads: 3, writes: 0 }, vm.handler().stats());

    vm.read_u8(addr(3))?;
    assert_eq!(vec![2, 3], vm.handler().resident_pages());
    assert_eq!(Stats { faults: 4, reads: 4, writes: 0 }, vm.handler().stats());
    Ok(())
}

#[test]
fn fifo_dirty_page_is_written_back_once() -> Result<()> {
    setup!(vm, 4, 2, Policy::Fifo);
    vm.read_u8(addr(0))?;
    vm.write_u8(addr(0), 42)?;
    assert_eq!(Some(PageState::Dirty), vm.handler().state(0));
    vm.read_u8(addr(1))?;
    assert_eq!(Stats { faults: 3, reads: 2, writes: 0 }, vm.handler().stats());

    vm.read_u8(addr(2))?;
    assert_eq!(Stats { faults: 4, reads: 3, writes: 1 }, vm.handler().stats());
    vm.read_u8(addr(3))?;
    assert_eq!(Stats { faults: 5, reads: 4, writes: 1 }, vm.handler().stats());

    assert_eq!(42, vm.read_u8(addr(0))?);
    Ok(())
}

#[test]
fn custom_evicts_clean_before_dirty() -> Result<()> {
    setup!(vm, 4, 2, Policy::Custom);
    vm.write_u8(addr(0), 1)?;
    vm.read_u8(addr(1))?;
    vm.read_u8(addr(2))?;
    assert_eq!(vec![0, 2], vm.handler().resident_pages());
    assert_eq!(0, vm.handler().stats().writes);

    // both resident pages dirty, the oldest one is written back
    vm.write_u8(addr(2), 2)?;
    vm.read_u8(addr(3))?;
    assert_eq!(vec![2, 3], vm.handler().resident_pages());
    assert_eq!(1, vm.handler().stats().writes);
    Ok(())
}

#[test]
fn identity_mapping_faults_once_per_page() -> Result<()> {
    setup!(vm, 4, 4, Policy::Fifo);
    for page in 0..4 {
        vm.read_u8(addr(page))?;
    }
    assert_eq!(Stats { faults: 4, reads: 4, writes: 0 }, vm.handler().stats());

    for page in 0..4 {
        vm.write_u8(addr(page) + 1, page as u8)?;
        assert_eq!(page as u8, vm.read_u8(addr(page) + 1)?);
    }
    assert_eq!(Stats { faults: 4, reads: 4, writes: 0 }, vm.handler().stats());
    vm.handler().verify(vm.table())?;
    Ok(())
}

#[test]
fn contents_survive_eviction() -> Result<()> {
    for policy in POLICIES {
        setup!(vm, 8, 2, policy);
        for page in 0..8 {
            vm.write_u8(addr(page) + 3, page as u8 + 100)?;
        }
        for page in (0..8).rev() {
            assert_eq!(page as u8 + 100, vm.read_u8(addr(page) + 3)?);
            assert_eq!(0, vm.read_u8(addr(page))?);
        }
        vm.handler().verify(vm.table())?;
    }
    Ok(())
}

#[test]
fn random_traces_keep_invariants() -> Result<()> {
    const NPAGES: usize = 16;
    const NFRAMES: usize = 5;
    for policy in POLICIES {
        setup!(vm, NPAGES, NFRAMES, policy);
        let mut rng = StdRng::seed_from_u64(99);
        let mut dirty_evictions: u64 = 0;
        for _ in 0..2000 {
            let a = addr(rng.gen_range(0..NPAGES)) + rng.gen_range(0..FRAME_SIZE);
            let before: Vec<_> = (0..NPAGES).map(|p| vm.handler().state(p)).collect();
            if rng.gen_bool(0.3) {
                vm.write_u8(a, 1)?;
            } else {
                vm.read_u8(a)?;
            }
            for (page, state) in before.iter().enumerate() {
                if *state == Some(PageState::Dirty)
                    && vm.handler().state(page) == Some(PageState::Absent)
                {
                    dirty_evictions += 1;
                }
            }
            vm.handler().verify(vm.table())?;
            assert!(vm.handler().frames().resident_count() <= NFRAMES);
        }
        let stats = vm.handler().stats();
        assert_eq!(dirty_evictions, stats.writes);
        assert!(stats.reads <= stats.faults);
        assert!(vm.handler().frames().is_full());
    }
    Ok(())
}
