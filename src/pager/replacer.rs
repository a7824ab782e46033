use std::str::FromStr;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::frame::{FrameId, FrameTable, PageState};
use crate::error::{Error, Result};
use crate::{invariant_err, value_err};

/// Replacer picks the frame to reclaim once every frame is occupied.
pub trait Replacer {
    fn name(&self) -> &'static str;

    /// Choose a victim frame. Only called when the frame table is full; the
    /// returned frame is always occupied. `states` is indexed by page id.
    ///
    /// Selection never mutates the frame table, unbinding the victim and
    /// writing it back is up to the caller.
    fn select_victim(&mut self, frames: &FrameTable, states: &[PageState]) -> Result<FrameId>;
}

fn ensure_full(frames: &FrameTable) -> Result<()> {
    if frames.is_empty() || !frames.is_full() {
        return Err(invariant_err!(
            "victim requested with {} of {} frames resident",
            frames.resident_count(),
            frames.len()
        ));
    }
    Ok(())
}

/// Evicts a uniformly random frame.
pub struct RandomReplacer {
    rng: StdRng,
}

impl RandomReplacer {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        RandomReplacer { rng }
    }
}

impl Replacer for RandomReplacer {
    fn name(&self) -> &'static str {
        "rand"
    }

    fn select_victim(&mut self, frames: &FrameTable, _states: &[PageState]) -> Result<FrameId> {
        ensure_full(frames)?;
        // never hand back a free frame
        loop {
            let frame_id = self.rng.gen_range(0..frames.len());
            if frames.get(frame_id).is_some_and(|f| f.is_occupied()) {
                return Ok(frame_id);
            }
        }
    }
}

/// Evicts the frame admitted first.
#[derive(Default)]
pub struct FifoReplacer;

impl Replacer for FifoReplacer {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn select_victim(&mut self, frames: &FrameTable, _states: &[PageState]) -> Result<FrameId> {
        ensure_full(frames)?;
        frames.oldest().ok_or_else(|| invariant_err!("full frame table has no oldest frame"))
    }
}

/// Prefers frames holding clean pages, which cost only a read to bring
/// back, and falls back to FIFO when every resident page is dirty.
#[derive(Default)]
pub struct CustomReplacer {
    fallback: FifoReplacer,
}

impl Replacer for CustomReplacer {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn select_victim(&mut self, frames: &FrameTable, states: &[PageState]) -> Result<FrameId> {
        ensure_full(frames)?;
        let clean = frames.iter().find_map(|(id, f)| match f.owner() {
            Some(page) if states.get(page) == Some(&PageState::Clean) => Some(id),
            _ => None,
        });
        match clean {
            Some(frame_id) => Ok(frame_id),
            None => self.fallback.select_victim(frames, states),
        }
    }
}

/// Replacement policy, chosen once at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    Random,
    Fifo,
    Custom,
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rand" => Ok(Policy::Random),
            "fifo" => Ok(Policy::Fifo),
            "custom" => Ok(Policy::Custom),
            _ => Err(value_err!("unknown page replacement type: {}", s)),
        }
    }
}

pub fn new_replacer(policy: Policy, seed: Option<u64>) -> Box<dyn Replacer> {
    match policy {
        Policy::Random => Box::new(RandomReplacer::new(seed)),
        Policy::Fifo => Box::new(FifoReplacer),
        Policy::Custom => Box::new(CustomReplacer::default()),
    }
}
