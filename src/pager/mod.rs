use std::fmt::{Display, Formatter};

use log::{debug, trace};

use self::frame::{FrameId, FrameTable, PageId, PageState};
use self::replacer::Replacer;
use crate::error::Result;
use crate::invariant_err;
use crate::mmu::{FaultHandler, PageTable, Prot};
use crate::storage::BlockDevice;

pub mod frame;
pub mod replacer;

/// Running tallies, reported once the workload completes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub faults: u64,
    /// Blocks read from the backing store.
    pub reads: u64,
    /// Dirty frames written back to the backing store.
    pub writes: u64,
}

impl Stats {
    pub fn csv(&self) -> String {
        format!("{},{},{}", self.faults, self.reads, self.writes)
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "-------------------------------------------")?;
        writeln!(f, "                  SUMMARY                  ")?;
        writeln!(f, "-------------------------------------------")?;
        writeln!(f, "  * page faults: {}", self.faults)?;
        writeln!(f, "  * disk reads:  {}", self.reads)?;
        writeln!(f, "  * disk writes: {}", self.writes)?;
        write!(f, "-------------------------------------------")
    }
}

/// The pager services page faults for a `PageTable`.
///
/// It owns the frame table, the permission state of every virtual page,
/// the replacement policy and the backing store. On each fault it either
/// loads the page into a free frame, upgrades a read-only page to read
/// write, or evicts a victim chosen by the replacer (writing it back when
/// dirty) and loads the page there.
///
/// When there are as many frames as pages every page simply lives in the
/// frame with the same index and never leaves it.
pub struct Pager {
    npages: usize,
    /// As many frames as pages, each page lives in its own frame.
    identity: bool,
    frames: FrameTable,
    /// Permission state of every virtual page, indexed by page id.
    states: Vec<PageState>,
    replacer: Box<dyn Replacer>,
    disk: Box<dyn BlockDevice>,
    stats: Stats,
}

impl Pager {
    pub fn new(
        npages: usize,
        nframes: usize,
        replacer: Box<dyn Replacer>,
        disk: Box<dyn BlockDevice>,
    ) -> Result<Self> {
        if npages == 0 || nframes == 0 {
            return Err(crate::value_err!(
                "need at least one page and one frame, got {} pages and {} frames",
                npages,
                nframes
            ));
        }
        if disk.num_blocks() < npages {
            return Err(crate::value_err!(
                "backing store has {} blocks, {} pages need one each",
                disk.num_blocks(),
                npages
            ));
        }
        Ok(Pager {
            npages,
            identity: nframes == npages,
            // a frame past npages can never be bound
            frames: FrameTable::new(nframes.min(npages)),
            states: vec![PageState::Absent; npages],
            replacer,
            disk,
            stats: Stats::default(),
        })
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn state(&self, page_id: PageId) -> Option<PageState> {
        self.states.get(page_id).copied()
    }

    /// Pages currently bound to a frame, in ascending order.
    pub fn resident_pages(&self) -> Vec<PageId> {
        let mut pages: Vec<PageId> = self.frames.iter().filter_map(|(_, f)| f.owner()).collect();
        pages.sort_unstable();
        pages
    }

    pub fn replacer_name(&self) -> &'static str {
        self.replacer.name()
    }

    /// Flush the backing store and hand it back.
    pub fn into_disk(mut self) -> Result<Box<dyn BlockDevice>> {
        self.disk.flush()?;
        Ok(self.disk)
    }

    fn handle(&mut self, table: &mut PageTable, page_id: PageId) -> Result<()> {
        self.stats.faults += 1;
        let state = *self
            .states
            .get(page_id)
            .ok_or_else(|| invariant_err!("fault on page {} out of range", page_id))?;
        debug!("page fault #{} on page {} ({})", self.stats.faults, page_id, state);

        if self.identity {
            return self.map_identity(table, page_id, state);
        }

        match state {
            PageState::Absent if !self.frames.is_full() => {
                let frame_id = self.frames.find_free_frame()?;
                self.load(table, page_id, frame_id)
            }
            PageState::Clean => {
                let frame_id = self.frames.frame_of(page_id).ok_or_else(|| {
                    invariant_err!("clean page {} is not bound to any frame", page_id)
                })?;
                debug!("page {} in frame {} becomes writable", page_id, frame_id);
                self.states[page_id] = PageState::Dirty;
                table.set_entry(page_id, frame_id, Prot::READ_WRITE)
            }
            PageState::Absent => {
                let frame_id = self.replacer.select_victim(&self.frames, &self.states)?;
                self.evict(table, frame_id)?;
                self.load(table, page_id, frame_id)
            }
            PageState::Dirty => {
                let (frame_id, prot) = table.get_entry(page_id)?;
                Err(invariant_err!(
                    "fault on dirty page {} (frame {}, {}), the page table is out of sync",
                    page_id,
                    frame_id,
                    prot
                ))
            }
        }
    }

    fn map_identity(
        &mut self,
        table: &mut PageTable,
        page_id: PageId,
        state: PageState,
    ) -> Result<()> {
        if state == PageState::Absent {
            self.frames.bind(page_id, page_id)?;
            self.read_in(table, page_id, page_id)?;
            self.states[page_id] = PageState::Dirty;
        }
        table.set_entry(page_id, page_id, Prot::READ_WRITE)
    }

    /// Bind `frame_id` to `page_id` and read the page in, read only.
    fn load(&mut self, table: &mut PageTable, page_id: PageId, frame_id: FrameId) -> Result<()> {
        self.frames.bind(frame_id, page_id)?;
        self.read_in(table, page_id, frame_id)?;
        self.states[page_id] = PageState::Clean;
        table.set_entry(page_id, frame_id, Prot::READ)
    }

    /// Unbind `frame_id`, writing its page back first when dirty.
    fn evict(&mut self, table: &mut PageTable, frame_id: FrameId) -> Result<()> {
        let victim = self.frames.unbind(frame_id)?;
        let state = self.states[victim];
        debug!(
            "evicting page {} ({}) from frame {} with {}",
            victim,
            state,
            frame_id,
            self.replacer.name()
        );
        if state == PageState::Dirty {
            self.disk.write_block(victim, table.frame(frame_id)?)?;
            self.stats.writes += 1;
        }
        self.states[victim] = PageState::Absent;
        table.set_entry(victim, 0, Prot::NONE)
    }

    fn read_in(&mut self, table: &mut PageTable, page_id: PageId, frame_id: FrameId) -> Result<()> {
        self.disk.read_block(page_id, table.frame_mut(frame_id)?)?;
        self.stats.reads += 1;
        trace!("page {} loaded into frame {}\n{}", page_id, frame_id, self.frames);
        Ok(())
    }

    /// Check the pager's bookkeeping against itself and against `table`:
    /// the resident count matches the occupied frames and the resident
    /// pages, no page is bound twice, and every translation entry grants
    /// exactly what the page's state allows.
    pub fn verify(&self, table: &PageTable) -> Result<()> {
        let occupied = self.frames.iter().filter(|(_, f)| f.is_occupied()).count();
        let resident = self.states.iter().filter(|s| s.is_resident()).count();
        if occupied != self.frames.resident_count() || resident != occupied {
            return Err(invariant_err!(
                "resident count {}, occupied frames {}, resident pages {}",
                self.frames.resident_count(),
                occupied,
                resident
            ));
        }
        if self.frames.resident_count() > self.frames.len() {
            return Err(invariant_err!(
                "{} resident pages in {} frames",
                self.frames.resident_count(),
                self.frames.len()
            ));
        }

        let mut owners = vec![None; self.npages];
        for (frame_id, frame) in self.frames.iter() {
            let Some(page_id) = frame.owner() else {
                continue;
            };
            let slot = owners
                .get_mut(page_id)
                .ok_or_else(|| invariant_err!("frame {} holds unknown page {}", frame_id, page_id))?;
            if let Some(other) = slot.replace(frame_id) {
                return Err(invariant_err!(
                    "page {} bound to frames {} and {}",
                    page_id,
                    other,
                    frame_id
                ));
            }
        }

        for (page_id, state) in self.states.iter().enumerate() {
            let (frame_id, prot) = table.get_entry(page_id)?;
            let ok = match (state, owners[page_id]) {
                (PageState::Absent, None) => prot == Prot::NONE,
                (PageState::Clean, Some(owner)) => owner == frame_id && prot == Prot::READ,
                (PageState::Dirty, Some(owner)) => owner == frame_id && prot == Prot::READ_WRITE,
                _ => false,
            };
            if !ok {
                return Err(invariant_err!(
                    "page {} is {} with owner {:?} but maps to frame {} ({})",
                    page_id,
                    state,
                    owners[page_id],
                    frame_id,
                    prot
                ));
            }
        }
        Ok(())
    }
}

impl FaultHandler for Pager {
    fn handle_fault(&mut self, table: &mut PageTable, page_id: PageId) -> Result<()> {
        self.handle(table, page_id)
    }
}
