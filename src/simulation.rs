use log::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::mmu::{PageTable, VirtualMemory};
use crate::pager::replacer::{new_replacer, Policy};
use crate::pager::{Pager, Stats};
use crate::storage::new_storage;
use crate::workload::Program;

/// Outcome of a single run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub stats: Stats,
    /// The program's checksum over the final memory contents.
    pub checksum: u64,
}

/// One workload over one virtual memory configuration.
#[derive(Copy, Clone, Debug)]
pub struct Simulation {
    pub npages: usize,
    pub nframes: usize,
    pub policy: Policy,
    pub program: Program,
}

impl Simulation {
    /// Set up the backing store, pager and page table, run the program to
    /// completion and tear everything down again.
    pub fn run(&self, cfg: &Config) -> Result<Report> {
        cfg.validate()?;
        if self.nframes > self.npages {
            warn!(
                "{} frames for {} pages, {} frames will never be used",
                self.nframes,
                self.npages,
                self.nframes - self.npages
            );
        }
        // geometry is checked here, before the backing store exists
        let table = PageTable::new(self.npages, self.nframes, cfg.frame_size)?;
        let disk = new_storage(cfg.storage_type, &cfg.disk_path, cfg.frame_size, self.npages)?;
        let replacer = new_replacer(self.policy, cfg.seed);
        let pager = Pager::new(self.npages, self.nframes, replacer, disk)?;
        info!(
            "running {:?} over {} pages in {} frames of {} bytes with {}",
            self.program,
            self.npages,
            self.nframes,
            cfg.frame_size,
            pager.replacer_name()
        );

        let mut vm = VirtualMemory::new(table, pager);
        let checksum = self.program.run(&mut vm)?;

        let (_, pager) = vm.into_parts();
        let stats = pager.stats();
        pager.into_disk()?;
        Ok(Report { stats, checksum })
    }
}
