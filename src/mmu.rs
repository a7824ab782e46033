//! A software stand-in for address translation hardware.
//!
//! `PageTable` holds one entry per virtual page, `(frame, protection)`, and
//! owns the physical memory buffer. `VirtualMemory` resolves every access
//! through the table and calls the installed `FaultHandler` whenever the
//! entry does not permit it, then retries.

use std::fmt::{Display, Formatter};
use std::ops::BitOr;

use crate::error::Result;
use crate::pager::frame::{FrameId, PageId};
use crate::storage::zeroed;
use crate::{invariant_err, value_err};

/// Protection bits of a translation entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Prot(u8);

impl Prot {
    pub const NONE: Prot = Prot(0);
    pub const READ: Prot = Prot(1);
    pub const WRITE: Prot = Prot(2);
    pub const READ_WRITE: Prot = Prot(3);

    pub fn contains(self, other: Prot) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Prot {
    type Output = Prot;

    fn bitor(self, rhs: Prot) -> Prot {
        Prot(self.0 | rhs.0)
    }
}

impl Display for Prot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.contains(Prot::READ), self.contains(Prot::WRITE)) {
            (false, false) => write!(f, "-"),
            (true, false) => write!(f, "R"),
            (false, true) => write!(f, "W"),
            (true, true) => write!(f, "RW"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    fn required(self) -> Prot {
        match self {
            Access::Read => Prot::READ,
            Access::Write => Prot::WRITE,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct Entry {
    frame: FrameId,
    prot: Prot,
}

/// Page table plus the physical memory it maps into.
#[derive(Debug)]
pub struct PageTable {
    frame_size: usize,
    nframes: usize,
    entries: Vec<Entry>,
    physmem: Vec<u8>,
}

impl PageTable {
    /// Frames past `npages` can never be bound, only `min(nframes, npages)`
    /// frames of physical memory are allocated.
    pub fn new(npages: usize, nframes: usize, frame_size: usize) -> Result<PageTable> {
        if npages == 0 || nframes == 0 || frame_size == 0 || frame_size % 4 != 0 {
            return Err(value_err!(
                "couldn't create page table: {} pages, {} frames of {} bytes",
                npages,
                nframes,
                frame_size
            ));
        }
        let nframes = nframes.min(npages);
        // the whole virtual address space must be addressable
        npages.checked_mul(frame_size).ok_or_else(|| {
            value_err!("{} pages of {} bytes overflow the address space", npages, frame_size)
        })?;
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(npages)
            .map_err(|e| value_err!("couldn't allocate {} page table entries: {}", npages, e))?;
        entries.resize(npages, Entry::default());
        Ok(PageTable { frame_size, nframes, entries, physmem: zeroed(nframes, frame_size)? })
    }

    pub fn npages(&self) -> usize {
        self.entries.len()
    }

    pub fn nframes(&self) -> usize {
        self.nframes
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Size in bytes of the virtual address space.
    pub fn virtmem_len(&self) -> usize {
        self.entries.len() * self.frame_size
    }

    pub fn get_entry(&self, page_id: PageId) -> Result<(FrameId, Prot)> {
        let entry = self
            .entries
            .get(page_id)
            .ok_or_else(|| value_err!("page {} out of range", page_id))?;
        Ok((entry.frame, entry.prot))
    }

    pub fn set_entry(&mut self, page_id: PageId, frame_id: FrameId, prot: Prot) -> Result<()> {
        if frame_id >= self.nframes {
            return Err(value_err!("frame {} out of range", frame_id));
        }
        let entry = self
            .entries
            .get_mut(page_id)
            .ok_or_else(|| value_err!("page {} out of range", page_id))?;
        *entry = Entry { frame: frame_id, prot };
        Ok(())
    }

    pub fn physmem(&self) -> &[u8] {
        &self.physmem
    }

    /// The bytes of physical frame `frame_id`.
    pub fn frame(&self, frame_id: FrameId) -> Result<&[u8]> {
        let range = self.frame_range(frame_id)?;
        Ok(&self.physmem[range])
    }

    pub fn frame_mut(&mut self, frame_id: FrameId) -> Result<&mut [u8]> {
        let range = self.frame_range(frame_id)?;
        Ok(&mut self.physmem[range])
    }

    fn frame_range(&self, frame_id: FrameId) -> Result<std::ops::Range<usize>> {
        if frame_id >= self.nframes {
            return Err(value_err!("frame {} out of range", frame_id));
        }
        Ok(frame_id * self.frame_size..(frame_id + 1) * self.frame_size)
    }

    /// Physical address of `addr` if the entry allows `access`.
    fn translate(&self, addr: usize, access: Access) -> Result<Option<usize>> {
        let page_id = addr / self.frame_size;
        let (frame_id, prot) = self.get_entry(page_id)?;
        if !prot.contains(access.required()) {
            return Ok(None);
        }
        Ok(Some(frame_id * self.frame_size + addr % self.frame_size))
    }
}

/// Called by `VirtualMemory` when an access is not permitted by the page
/// table. The handler must leave the entry in a state that permits the
/// access, possibly after one more fault.
pub trait FaultHandler {
    fn handle_fault(&mut self, table: &mut PageTable, page_id: PageId) -> Result<()>;
}

/// A write to a page that is not resident faults twice: once to load it
/// read only, once to upgrade it.
const MAX_FAULTS_PER_ACCESS: usize = 2;

/// Byte and word accessors over the virtual address space.
pub struct VirtualMemory<H: FaultHandler> {
    table: PageTable,
    handler: H,
}

impl<H: FaultHandler> VirtualMemory<H> {
    pub fn new(table: PageTable, handler: H) -> Self {
        VirtualMemory { table, handler }
    }

    pub fn len(&self) -> usize {
        self.table.virtmem_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn table(&self) -> &PageTable {
        &self.table
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_parts(self) -> (PageTable, H) {
        (self.table, self.handler)
    }

    fn resolve(&mut self, addr: usize, width: usize, access: Access) -> Result<usize> {
        if addr.checked_add(width).map_or(true, |end| end > self.len()) {
            return Err(value_err!("address {} out of range", addr));
        }
        if addr % width != 0 {
            return Err(value_err!("address {} is not aligned to {} bytes", addr, width));
        }
        let page_id = addr / self.table.frame_size;
        let mut faults = 0;
        loop {
            if let Some(paddr) = self.table.translate(addr, access)? {
                return Ok(paddr);
            }
            if faults == MAX_FAULTS_PER_ACCESS {
                let (frame_id, prot) = self.table.get_entry(page_id)?;
                return Err(invariant_err!(
                    "{:?} of page {} still not permitted after {} faults (frame {}, {})",
                    access,
                    page_id,
                    faults,
                    frame_id,
                    prot
                ));
            }
            faults += 1;
            self.handler.handle_fault(&mut self.table, page_id)?;
        }
    }

    pub fn read_u8(&mut self, addr: usize) -> Result<u8> {
        let paddr = self.resolve(addr, 1, Access::Read)?;
        Ok(self.table.physmem[paddr])
    }

    pub fn write_u8(&mut self, addr: usize, value: u8) -> Result<()> {
        let paddr = self.resolve(addr, 1, Access::Write)?;
        self.table.physmem[paddr] = value;
        Ok(())
    }

    /// Reads a little-endian word. `addr` must be 4-byte aligned, so with a
    /// frame size that is a multiple of 4 a word never straddles two pages.
    pub fn read_u32(&mut self, addr: usize) -> Result<u32> {
        let paddr = self.resolve(addr, 4, Access::Read)?;
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.table.physmem[paddr..paddr + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn write_u32(&mut self, addr: usize, value: u32) -> Result<()> {
        let paddr = self.resolve(addr, 4, Access::Write)?;
        self.table.physmem[paddr..paddr + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}
