use std::fmt::Debug;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;

pub mod disk;
pub mod memory;

/// A block device backing the virtual address space, one fixed-size block
/// per virtual page. The block size always equals the frame size so a
/// block can be copied straight into or out of a physical frame.
///
/// The trait is kept object safe, the pager holds it as `Box<dyn BlockDevice>`
/// and never needs to know which medium sits behind it.
pub trait BlockDevice: Debug {
    /// Size of a single block in bytes.
    fn block_size(&self) -> usize;

    /// Number of addressable blocks.
    fn num_blocks(&self) -> usize;

    /// Copies block `block` into `buf`, which must be exactly one block long.
    fn read_block(&mut self, block: usize, buf: &mut [u8]) -> Result<()>;

    /// Overwrites block `block` with `buf`, which must be exactly one block long.
    fn write_block(&mut self, block: usize, buf: &[u8]) -> Result<()>;

    /// Flushes any buffered data to the underlying medium.
    fn flush(&mut self) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    File,
    Memory,
}

pub fn new_storage(
    typ: StorageType,
    path: &str,
    block_size: usize,
    num_blocks: usize,
) -> Result<Box<dyn BlockDevice>> {
    match typ {
        StorageType::File => Ok(Box::new(disk::Disk::create(path, block_size, num_blocks)?)),
        StorageType::Memory => Ok(Box::new(memory::Memory::new(block_size, num_blocks)?)),
    }
}

/// A zero-filled buffer of `count` blocks of `size` bytes, or a value error
/// when it cannot be addressed or allocated.
pub(crate) fn zeroed(count: usize, size: usize) -> Result<Vec<u8>> {
    let len = count
        .checked_mul(size)
        .ok_or_else(|| crate::value_err!("{} blocks of {} bytes overflow", count, size))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| crate::value_err!("couldn't allocate {} blocks of {} bytes: {}", count, size, e))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Rejects a transfer that is out of range or not exactly one block long.
pub(crate) fn check_transfer(dev: &dyn BlockDevice, block: usize, len: usize) -> Result<()> {
    if block >= dev.num_blocks() {
        return Err(crate::value_err!(
            "block {} out of range, device has {} blocks",
            block,
            dev.num_blocks()
        ));
    }
    if len != dev.block_size() {
        return Err(crate::value_err!(
            "incorrect block size {}, expected {}",
            len,
            dev.block_size()
        ));
    }
    Ok(())
}
