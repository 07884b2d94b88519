//! Open-file table & byte I/O (C7, spec.md §4.7).
//!
//! A process-wide fixed array of open-file records, shared by every caller
//! under the single-threaded assumption (spec.md §5). `inode == 0` marks a
//! free slot; inode 0 is the root directory and can never be opened as a
//! regular file, so the sentinel is safe (spec.md §9).

use crate::bitmap;
use crate::disk::Disk;
use crate::error::FsError;
use crate::fs;
use crate::geometry::DiskGeometry;
use crate::inode;

/// One slot of the open-file table.
#[derive(Debug, Clone, Copy, Default)]
struct OpenFileRecord {
    inode: i32,
    size: i32,
    pos: i32,
}

/// The fixed-size, process-wide open-file table.
#[derive(Debug)]
pub struct OpenFileTable {
    records: Vec<OpenFileRecord>,
}

impl OpenFileTable {
    /// Builds an all-empty table with `capacity` slots (`O` in spec.md §3).
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![OpenFileRecord::default(); capacity],
        }
    }

    /// `IsOpen(inode)`: a linear scan for any record naming `inode`.
    pub fn is_open(&self, inode: i32) -> bool {
        self.records.iter().any(|r| r.inode == inode)
    }

    fn slot(&self, fd: usize) -> Result<&OpenFileRecord, FsError> {
        self.records.get(fd).filter(|r| r.inode != 0).ok_or_else(|| {
            log::warn!("bad file descriptor: {fd}");
            FsError::BadFd
        })
    }

    fn slot_mut(&mut self, fd: usize) -> Result<&mut OpenFileRecord, FsError> {
        self.records.get_mut(fd).filter(|r| r.inode != 0).ok_or_else(|| {
            log::warn!("bad file descriptor: {fd}");
            FsError::BadFd
        })
    }

    /// `Open(path) -> fd`: resolves the path, requires a file (not a
    /// directory), and claims the lowest free slot.
    pub fn open(&mut self, disk: &mut impl Disk, geometry: &DiskGeometry, path: &str) -> Result<usize, FsError> {
        let resolved = fs::resolve(disk, geometry, path)?;
        if resolved.child < 0 {
            log::warn!("file_open: no such file: {path}");
            return Err(FsError::NoSuchFile);
        }

        let target = inode::read(disk, geometry, resolved.child as u32)?;
        if !target.is_file() {
            return Err(FsError::General);
        }

        let fd = self.records.iter().position(|r| r.inode == 0).ok_or_else(|| {
            log::warn!("file_open: open-file table full, refusing {path}");
            FsError::TooManyOpen
        })?;

        self.records[fd] = OpenFileRecord {
            inode: resolved.child,
            size: target.size,
            pos: 0,
        };
        Ok(fd)
    }

    /// `Close(fd)`.
    pub fn close(&mut self, fd: usize) -> Result<(), FsError> {
        self.slot_mut(fd)?.inode = 0;
        Ok(())
    }

    /// `Seek(fd, offset)`.
    pub fn seek(&mut self, fd: usize, offset: i32) -> Result<(), FsError> {
        let rec = self.slot_mut(fd)?;
        if offset < 0 || offset > rec.size {
            log::warn!("seek: offset {offset} out of bounds for fd {fd} (size {})", rec.size);
            return Err(FsError::SeekOutOfBounds);
        }
        rec.pos = offset;
        Ok(())
    }

    /// `Read(fd, buf, n)`: returns 0 at EOF without treating it as an error.
    pub fn read(&mut self, disk: &mut impl Disk, geometry: &DiskGeometry, fd: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        let rec = *self.slot(fd)?;
        if rec.pos == rec.size {
            return Ok(0);
        }

        let target = inode::read(disk, geometry, rec.inode as u32)?;
        let sector_size = geometry.sector_size;

        let mut pos = rec.pos as u32;
        let mut copied = 0usize;
        let mut sector_buf = vec![0u8; sector_size as usize];

        while copied < buf.len() && pos < rec.size as u32 {
            let sector_idx = (pos / sector_size) as usize;
            let sector_off = (pos % sector_size) as usize;
            let n = ((sector_size as usize - sector_off))
                .min(buf.len() - copied)
                .min(rec.size as usize - pos as usize);

            disk.read_sector(target.data[sector_idx] as u32, &mut sector_buf)?;
            buf[copied..copied + n].copy_from_slice(&sector_buf[sector_off..sector_off + n]);

            copied += n;
            pos += n as u32;
        }

        self.slot_mut(fd)?.pos = pos as i32;
        Ok(copied)
    }

    /// `Write(fd, buf, n)`: allocates whatever new data sectors the write
    /// needs before touching the inode, rolling back those allocations if
    /// the bitmap runs out mid-way (spec.md §4.7/§7).
    pub fn write(&mut self, disk: &mut impl Disk, geometry: &DiskGeometry, fd: usize, buf: &[u8]) -> Result<usize, FsError> {
        let rec = *self.slot(fd)?;
        let pos = rec.pos as u32;
        let n = buf.len() as u32;

        if pos as u64 + n as u64 > geometry.max_file_bytes() {
            log::warn!("write: fd {fd} would exceed max file size ({} bytes)", geometry.max_file_bytes());
            return Err(FsError::FileTooBig);
        }

        let mut target = inode::read(disk, geometry, rec.inode as u32)?;
        let sector_size = geometry.sector_size;

        let currently_used = target.used_file_sectors(sector_size);
        let needed = (pos + n).div_ceil(sector_size) as usize;

        let mut allocated = Vec::new();
        for idx in currently_used..needed {
            match bitmap::allocate_first_free(
                disk,
                geometry.data_bitmap_start(),
                geometry.data_bitmap_len(),
                geometry.total_sectors,
            ) {
                Ok(sector) => {
                    target.data[idx] = sector as i32;
                    allocated.push(sector);
                }
                Err(err) => {
                    log::warn!("write: rolling back {} sector(s) after allocation failure", allocated.len());
                    for sector in allocated {
                        let _ = bitmap::free(disk, geometry.data_bitmap_start(), sector);
                    }
                    return Err(err);
                }
            }
        }

        target.size = (pos + n) as i32;
        inode::write(disk, geometry, rec.inode as u32, &target)?;

        let mut p = pos;
        let mut written = 0usize;
        let mut sector_buf = vec![0u8; sector_size as usize];
        while written < buf.len() {
            let sector_idx = (p / sector_size) as usize;
            let sector_off = (p % sector_size) as usize;
            let chunk = (sector_size as usize - sector_off).min(buf.len() - written);

            disk.read_sector(target.data[sector_idx] as u32, &mut sector_buf)?;
            sector_buf[sector_off..sector_off + chunk].copy_from_slice(&buf[written..written + chunk]);
            disk.write_sector(target.data[sector_idx] as u32, &sector_buf)?;

            written += chunk;
            p += chunk as u32;
        }

        let rec = self.slot_mut(fd)?;
        rec.size = target.size;
        rec.pos = p as i32;
        Ok(written)
    }
}
