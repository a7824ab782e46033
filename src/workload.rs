use std::str::FromStr;

use log::info;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::mmu::{FaultHandler, VirtualMemory};
use crate::value_err;

const SORT_SEED: u64 = 4856;
const FOCUS_SEED: u64 = 38290;

/// Rounds of random writes done by `focus`.
const FOCUS_ROUNDS: usize = 100;
/// Writes per round.
const FOCUS_WRITES: usize = 100;
/// Words a round's writes are spread over.
const FOCUS_WINDOW: usize = 25;

const SCAN_PASSES: usize = 10;

/// Synthetic programs that generate traffic over the whole virtual address
/// space. Each returns a checksum of the final contents, which depends only
/// on the program and the memory size, never on how the pages were managed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Program {
    /// Random words sorted in place.
    Sort,
    /// Sequential fill, then repeated sequential reads.
    Scan,
    /// Bursts of writes clustered around random spots.
    Focus,
}

impl FromStr for Program {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sort" => Ok(Program::Sort),
            "scan" => Ok(Program::Scan),
            "focus" => Ok(Program::Focus),
            _ => Err(value_err!("unknown program: {}", s)),
        }
    }
}

impl Program {
    pub fn run<H: FaultHandler>(&self, vm: &mut VirtualMemory<H>) -> Result<u64> {
        let result = match self {
            Program::Sort => sort(vm)?,
            Program::Scan => scan(vm)?,
            Program::Focus => focus(vm)?,
        };
        info!("{:?} result is {}", self, result);
        Ok(result)
    }
}

fn scan<H: FaultHandler>(vm: &mut VirtualMemory<H>) -> Result<u64> {
    let len = vm.len();
    for addr in 0..len {
        vm.write_u8(addr, (addr % 256) as u8)?;
    }
    let mut total: u64 = 0;
    for _ in 0..SCAN_PASSES {
        for addr in 0..len {
            total += u64::from(vm.read_u8(addr)?);
        }
    }
    Ok(total)
}

fn sort<H: FaultHandler>(vm: &mut VirtualMemory<H>) -> Result<u64> {
    let words = vm.len() / 4;
    let mut rng = StdRng::seed_from_u64(SORT_SEED);
    for i in 0..words {
        vm.write_u32(i * 4, rng.gen())?;
    }
    quicksort(vm, words)?;
    sum_words(vm)
}

fn focus<H: FaultHandler>(vm: &mut VirtualMemory<H>) -> Result<u64> {
    let words = vm.len() / 4;
    let mut rng = StdRng::seed_from_u64(FOCUS_SEED);
    for i in 0..words {
        vm.write_u32(i * 4, 0)?;
    }
    for _ in 0..FOCUS_ROUNDS {
        let start = rng.gen_range(0..words);
        for _ in 0..FOCUS_WRITES {
            let i = (start + rng.gen_range(0..FOCUS_WINDOW)) % words;
            vm.write_u32(i * 4, rng.gen())?;
        }
    }
    sum_words(vm)
}

fn sum_words<H: FaultHandler>(vm: &mut VirtualMemory<H>) -> Result<u64> {
    let mut total: u64 = 0;
    for i in 0..vm.len() / 4 {
        total = total.wrapping_add(u64::from(vm.read_u32(i * 4)?));
    }
    Ok(total)
}

fn swap<H: FaultHandler>(vm: &mut VirtualMemory<H>, a: usize, b: usize) -> Result<()> {
    if a == b {
        return Ok(());
    }
    let x = vm.read_u32(a * 4)?;
    let y = vm.read_u32(b * 4)?;
    vm.write_u32(a * 4, y)?;
    vm.write_u32(b * 4, x)
}

/// In-place quicksort over the first `len` words, middle element as pivot.
fn quicksort<H: FaultHandler>(vm: &mut VirtualMemory<H>, len: usize) -> Result<()> {
    // half-open ranges still to be sorted
    let mut pending = vec![(0, len)];
    while let Some((lo, hi)) = pending.pop() {
        if hi - lo < 2 {
            continue;
        }
        swap(vm, lo + (hi - lo) / 2, hi - 1)?;
        let pivot = vm.read_u32((hi - 1) * 4)?;
        let mut store = lo;
        for i in lo..hi - 1 {
            if vm.read_u32(i * 4)? < pivot {
                swap(vm, i, store)?;
                store += 1;
            }
        }
        swap(vm, store, hi - 1)?;
        pending.push((lo, store));
        pending.push((store + 1, hi));
    }
    Ok(())
}
