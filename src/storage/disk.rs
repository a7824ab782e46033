use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::path::{Path, PathBuf};

use log::{info, trace};

use super::check_transfer;
use super::BlockDevice;
use crate::error::Result;
use crate::value_err;

/// | block size: u32 | number of blocks: u32 |, both big endian.
const HEADER_SIZE: usize = size_of::<u32>() * 2;

/// A block device stored in a flat file: a small header followed by the
/// blocks laid out back to back.
#[derive(Debug)]
pub struct Disk {
    path: PathBuf,
    file: File,
    block_size: usize,
    num_blocks: usize,
}

fn write_header(file: &mut File, block_size: u32, num_blocks: u32) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&block_size.to_be_bytes())?;
    file.write_all(&num_blocks.to_be_bytes())?;
    Ok(())
}

fn read_header(file: &mut File) -> Result<(u32, u32)> {
    let mut block_size = [0; size_of::<u32>()];
    let mut num_blocks = [0; size_of::<u32>()];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut block_size)?;
    file.read_exact(&mut num_blocks)?;
    Ok((u32::from_be_bytes(block_size), u32::from_be_bytes(num_blocks)))
}

impl Disk {
    /// Create a zero-filled disk at `path`, truncating whatever was there.
    pub fn create(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> Result<Disk> {
        if block_size == 0 || num_blocks == 0 {
            return Err(value_err!(
                "couldn't create virtual disk with {} blocks of {} bytes",
                num_blocks,
                block_size
            ));
        }
        let path = path.as_ref().to_path_buf();
        let geometry_err = || {
            value_err!(
                "couldn't create virtual disk {} with {} blocks of {} bytes: too large",
                path.display(),
                num_blocks,
                block_size
            )
        };
        let header_block_size = u32::try_from(block_size).map_err(|_| geometry_err())?;
        let header_num_blocks = u32::try_from(num_blocks).map_err(|_| geometry_err())?;
        let len = block_size
            .checked_mul(num_blocks)
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(geometry_err)?;

        let mut file = File::options()
            .truncate(true)
            .write(true)
            .read(true)
            .create(true)
            .open(&path)
            .map_err(|e| value_err!("couldn't create virtual disk {}: {}", path.display(), e))?;
        file.set_len(len)?;
        write_header(&mut file, header_block_size, header_num_blocks)?;
        info!("created disk {} with {} blocks of {} bytes", path.display(), num_blocks, block_size);
        Ok(Disk { path, file, block_size, num_blocks })
    }

    /// Open an existing disk, the header must match the expected geometry.
    pub fn open(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> Result<Disk> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::options()
            .write(true)
            .read(true)
            .open(&path)
            .map_err(|e| value_err!("couldn't open virtual disk {}: {}", path.display(), e))?;
        let (bs, nb) = read_header(&mut file)?;
        if bs as usize != block_size || nb as usize != num_blocks {
            return Err(value_err!(
                "disk {} has {} blocks of {} bytes, expected {} blocks of {} bytes",
                path.display(),
                nb,
                bs,
                num_blocks,
                block_size
            ));
        }
        Ok(Disk { path, file, block_size, num_blocks })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seek_block(&mut self, block: usize) -> Result<()> {
        let offset = HEADER_SIZE + block * self.block_size;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        Ok(())
    }
}

impl BlockDevice for Disk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&mut self, block: usize, buf: &mut [u8]) -> Result<()> {
        check_transfer(&*self, block, buf.len())?;
        trace!("read block[{}]", block);
        self.seek_block(block)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, block: usize, buf: &[u8]) -> Result<()> {
        check_transfer(&*self, block, buf.len())?;
        trace!("write block[{}]", block);
        self.seek_block(block)?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::remove_file;

    use super::*;
    use crate::error::Error;

    fn disk_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("virtmem_disk_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_create_and_open() -> Result<()> {
        let path = disk_path("create_and_open");
        let disk = Disk::create(&path, 512, 4)?;
        assert_eq!(path.as_path(), disk.path());
        drop(disk);

        let disk = Disk::open(&path, 512, 4)?;
        assert_eq!(512, disk.block_size());
        assert_eq!(4, disk.num_blocks());
        drop(disk);

        // geometry mismatch
        assert!(matches!(Disk::open(&path, 256, 4), Err(Error::Value(_))));
        remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn test_read_write() -> Result<()> {
        let path = disk_path("read_write");
        let mut disk = Disk::create(&path, 512, 4)?;
        let mut block = vec![0u8; 512];
        block[0] = 1;
        block[511] = 2;
        disk.write_block(3, &block)?;

        let mut buf = vec![0u8; 512];
        disk.read_block(3, &mut buf)?;
        assert_eq!(block, buf);
        disk.read_block(0, &mut buf)?;
        assert_eq!(vec![0u8; 512], buf);
        drop(disk);

        // survives reopening
        let mut disk = Disk::open(&path, 512, 4)?;
        disk.read_block(3, &mut buf)?;
        assert_eq!(block, buf);
        remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn test_read_write_over_capacity() -> Result<()> {
        let path = disk_path("over_capacity");
        let mut disk = Disk::create(&path, 512, 2)?;
        let mut block = vec![0u8; 512];
        assert!(matches!(disk.write_block(2, &block), Err(Error::Value(_))));
        assert!(matches!(disk.read_block(2, &mut block), Err(Error::Value(_))));
        remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn test_too_large_leaves_no_file() {
        let path = disk_path("too_large");
        let too_many = u32::MAX as usize + 1;
        assert!(matches!(Disk::create(&path, 512, too_many), Err(Error::Value(_))));
        assert!(matches!(Disk::create(&path, usize::MAX / 2, 4), Err(Error::Value(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_write_incorrect_block_size() -> Result<()> {
        let path = disk_path("incorrect_block_size");
        let mut disk = Disk::create(&path, 512, 2)?;
        assert!(matches!(disk.write_block(0, &[0u8; 256]), Err(Error::Value(_))));
        assert!(matches!(disk.write_block(0, &[0u8; 1024]), Err(Error::Value(_))));
        remove_file(&path)?;
        Ok(())
    }
}
