//! The simulated block device (spec.md §1 lists this as an external
//! collaborator; a minimal concrete implementation is supplied here so the
//! engine is runnable end to end).
//!
//! Grounded on the teacher's `mkfs/src/main.rs` `read_sector`/`write_sector`
//! helpers, which use `std::os::unix::fs::FileExt::{read_at, write_at}` to
//! do positional, whole-sector I/O against a single backing file.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::error::FsError;

/// Fixed-size sector read/write plus whole-image save/load, exactly as
/// described for the external block device in spec.md §1.
pub trait Disk {
    fn sector_size(&self) -> u32;
    fn total_sectors(&self) -> u32;

    fn read_sector(&mut self, sector: u32, buf: &mut [u8]) -> Result<(), FsError>;
    fn write_sector(&mut self, sector: u32, buf: &[u8]) -> Result<(), FsError>;

    /// Flushes any buffered writes to the backing store.
    fn sync(&mut self) -> Result<(), FsError>;
}

/// A disk image backed by a single host file, one sector per positional
/// read/write.
pub struct FileDisk {
    file: File,
    sector_size: u32,
    total_sectors: u32,
}

impl FileDisk {
    /// Opens an existing image and validates its length matches `sector_size * total_sectors`.
    pub fn open_existing(path: &Path, sector_size: u32, total_sectors: u32) -> Result<Self, FsError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len != sector_size as u64 * total_sectors as u64 {
            return Err(FsError::General);
        }
        Ok(Self {
            file,
            sector_size,
            total_sectors,
        })
    }

    /// Creates a fresh, zero-filled image of `sector_size * total_sectors` bytes.
    pub fn create_fresh(path: &Path, sector_size: u32, total_sectors: u32) -> Result<Self, FsError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(sector_size as u64 * total_sectors as u64)?;
        Ok(Self {
            file,
            sector_size,
            total_sectors,
        })
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    fn offset(&self, sector: u32) -> u64 {
        sector as u64 * self.sector_size as u64
    }
}

impl Disk for FileDisk {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn total_sectors(&self) -> u32 {
        self.total_sectors
    }

    fn read_sector(&mut self, sector: u32, buf: &mut [u8]) -> Result<(), FsError> {
        debug_assert_eq!(buf.len(), self.sector_size as usize);
        self.file.read_at(buf, self.offset(sector)).map_err(map_io)?;
        Ok(())
    }

    fn write_sector(&mut self, sector: u32, buf: &[u8]) -> Result<(), FsError> {
        debug_assert_eq!(buf.len(), self.sector_size as usize);
        self.file.write_at(buf, self.offset(sector)).map_err(map_io)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), FsError> {
        self.file.sync_all().map_err(map_io)
    }
}

fn map_io(err: io::Error) -> FsError {
    log::warn!("disk I/O error: {err}");
    FsError::General
}
