const FRAME_SIZE: usize = 64;

macro_rules! setup {
    ($vm:ident, $npages:expr, $nframes:expr, $policy:expr) => {
        let _ = env_logger::builder().is_test(true).try_init();
        let disk = Box::new(virtmem::storage::memory::Memory::new(crate::FRAME_SIZE, $npages)?);
        let replacer = virtmem::pager::replacer::new_replacer($policy, Some(11));
        let pager = virtmem::pager::Pager::new($npages, $nframes, replacer, disk)?;
        let table = virtmem::mmu::PageTable::new($npages, $nframes, crate::FRAME_SIZE)?;
        let mut $vm = virtmem::mmu::VirtualMemory::new(table, pager);
    };
}

mod scenarios;
mod workloads;
