use log::trace;

use super::{check_transfer, zeroed};
use super::BlockDevice;
use crate::error::Result;

/// An in-memory block device. Contents are lost when it is dropped.
#[derive(Debug)]
pub struct Memory {
    block_size: usize,
    num_blocks: usize,
    blocks: Vec<u8>,
}

impl Memory {
    pub fn new(block_size: usize, num_blocks: usize) -> Result<Memory> {
        Ok(Memory { block_size, num_blocks, blocks: zeroed(num_blocks, block_size)? })
    }

    fn range(&self, block: usize) -> std::ops::Range<usize> {
        block * self.block_size..(block + 1) * self.block_size
    }
}

impl BlockDevice for Memory {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&mut self, block: usize, buf: &mut [u8]) -> Result<()> {
        check_transfer(&*self, block, buf.len())?;
        trace!("read block[{}]", block);
        buf.copy_from_slice(&self.blocks[self.range(block)]);
        Ok(())
    }

    fn write_block(&mut self, block: usize, buf: &[u8]) -> Result<()> {
        check_transfer(&*self, block, buf.len())?;
        trace!("write block[{}]", block);
        let range = self.range(block);
        self.blocks[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_read_write() -> Result<()> {
        let mut m = Memory::new(16, 4)?;
        let mut block = [0u8; 16];
        block[0] = 7;
        block[15] = 9;
        m.write_block(2, &block)?;

        let mut buf = [0u8; 16];
        m.read_block(2, &mut buf)?;
        assert_eq!(block, buf);

        // neighbours are untouched
        m.read_block(1, &mut buf)?;
        assert_eq!([0u8; 16], buf);
        m.read_block(3, &mut buf)?;
        assert_eq!([0u8; 16], buf);
        Ok(())
    }

    #[test]
    fn test_over_capacity() -> Result<()> {
        let mut m = Memory::new(16, 4)?;
        let mut buf = [0u8; 16];
        assert!(matches!(m.read_block(4, &mut buf), Err(Error::Value(_))));
        assert!(matches!(m.write_block(4, &buf), Err(Error::Value(_))));
        Ok(())
    }

    #[test]
    fn test_incorrect_block_size() -> Result<()> {
        let mut m = Memory::new(16, 4)?;
        let mut buf = [0u8; 8];
        assert!(matches!(m.read_block(0, &mut buf), Err(Error::Value(_))));
        assert!(matches!(m.write_block(0, &[0u8; 32]), Err(Error::Value(_))));
        Ok(())
    }

    #[test]
    fn test_too_large() {
        assert!(matches!(Memory::new(4096, usize::MAX / 2), Err(Error::Value(_))));
    }
}
