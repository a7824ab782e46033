use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};
use crate::invariant_err;

/// Index of a virtual page, in range `[0, npages)`.
pub type PageId = usize;

/// Index of a physical frame, in range `[0, nframes)`.
pub type FrameId = usize;

/// Where a virtual page stands in the paging state machine.
///
/// `Absent -> Clean` on a first fault (one backing-store read),
/// `Clean -> Dirty` on a write fault (permission upgrade only), and
/// `Clean | Dirty -> Absent` on eviction, with a write-back for `Dirty`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PageState {
    /// No frame bound, every access faults.
    #[default]
    Absent,
    /// Bound to a frame, read only, same contents as the backing store.
    Clean,
    /// Bound to a frame, read write, may differ from the backing store.
    Dirty,
}

impl PageState {
    pub fn is_resident(&self) -> bool {
        !matches!(self, PageState::Absent)
    }
}

impl Display for PageState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PageState::Absent => write!(f, "-"),
            PageState::Clean => write!(f, "R"),
            PageState::Dirty => write!(f, "RW"),
        }
    }
}

/// A physical frame slot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    owner: Option<PageId>,
    /// Position in the global admission order, stamped on every bind.
    admission_sequence: u64,
}

impl Frame {
    pub fn is_occupied(&self) -> bool {
        self.owner.is_some()
    }

    pub fn owner(&self) -> Option<PageId> {
        self.owner
    }

    pub fn admission_sequence(&self) -> u64 {
        self.admission_sequence
    }
}

/// Fixed-capacity registry of physical frames and the pages that occupy
/// them. `bind` and `unbind` are the only mutators, every resident page is
/// owned by exactly one frame.
#[derive(Debug)]
pub struct FrameTable {
    frames: Vec<Frame>,
    resident_count: usize,
    next_sequence: u64,
}

impl FrameTable {
    pub fn new(nframes: usize) -> Self {
        FrameTable { frames: vec![Frame::default(); nframes], resident_count: 0, next_sequence: 0 }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn resident_count(&self) -> usize {
        self.resident_count
    }

    pub fn is_full(&self) -> bool {
        self.resident_count == self.frames.len()
    }

    pub fn get(&self, frame_id: FrameId) -> Option<&Frame> {
        self.frames.get(frame_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameId, &Frame)> {
        self.frames.iter().enumerate()
    }

    /// First unoccupied frame in index order. Callers are expected to check
    /// `is_full` first.
    pub fn find_free_frame(&self) -> Result<FrameId> {
        self.frames.iter().position(|f| !f.is_occupied()).ok_or(Error::NoFreeFrame)
    }

    /// The frame currently holding `page_id`, if the page is resident.
    pub fn frame_of(&self, page_id: PageId) -> Option<FrameId> {
        self.frames.iter().position(|f| f.owner == Some(page_id))
    }

    /// The occupied frame admitted the longest time ago.
    pub fn oldest(&self) -> Option<FrameId> {
        self.iter()
            .filter(|(_, f)| f.is_occupied())
            .min_by_key(|(_, f)| f.admission_sequence)
            .map(|(id, _)| id)
    }

    pub fn bind(&mut self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let sequence = self.next_sequence;
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or_else(|| invariant_err!("bind to frame {} out of range", frame_id))?;
        if let Some(owner) = frame.owner {
            return Err(invariant_err!(
                "bind page {} to frame {} already holding page {}",
                page_id,
                frame_id,
                owner
            ));
        }
        frame.owner = Some(page_id);
        frame.admission_sequence = sequence;
        self.next_sequence += 1;
        self.resident_count += 1;
        Ok(())
    }

    /// Release `frame_id` and return the page that occupied it.
    pub fn unbind(&mut self, frame_id: FrameId) -> Result<PageId> {
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or_else(|| invariant_err!("unbind frame {} out of range", frame_id))?;
        let page_id =
            frame.owner.take().ok_or_else(|| invariant_err!("unbind free frame {}", frame_id))?;
        self.resident_count -= 1;
        Ok(page_id)
    }
}

impl Display for FrameTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Frame\t|\tPage\t|\tAdmitted")?;
        for (id, frame) in self.iter() {
            match frame.owner {
                Some(page) => writeln!(f, "{}\t\t{}\t\t{}", id, page, frame.admission_sequence)?,
                None => writeln!(f, "{}\t\t-\t\t-", id)?,
            }
        }
        Ok(())
    }
}
