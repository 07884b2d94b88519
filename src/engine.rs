//! Boot/format (spec.md §4.8) and the top-level engine tying C1–C7
//! together behind the API surface listed in spec.md §6.

use std::path::Path;

use crate::bitmap;
use crate::codec::{self, DiskInode};
use crate::disk::{Disk, FileDisk};
use crate::error::FsError;
use crate::file::OpenFileTable;
use crate::fs;
use crate::geometry::{DiskGeometry, KIND_DIR, KIND_FILE, MAGIC, ROOT_INODE};
use crate::inode;

/// Formats a fresh image: magic superblock, inode bitmap with bit 0 (root)
/// set, sector bitmap with the metadata region reserved, every inode-table
/// sector zeroed except the first (which carries the root directory inode).
pub fn format(disk: &mut impl Disk, geometry: &DiskGeometry) -> Result<(), FsError> {
    log::info!(
        "formatting fresh image: {} sectors of {} bytes, {} inodes",
        geometry.total_sectors, geometry.sector_size, geometry.max_files
    );

    let mut sb_buf = vec![0u8; geometry.sector_size as usize];
    codec::encode_superblock(&mut sb_buf, MAGIC);
    disk.write_sector(geometry.superblock_start(), &sb_buf)?;

    bitmap::initialize(disk, geometry.inode_bitmap_start(), geometry.inode_bitmap_len(), 1)?;
    bitmap::initialize(
        disk,
        geometry.data_bitmap_start(),
        geometry.data_bitmap_len(),
        geometry.data_region_start(),
    )?;

    let zero = vec![0u8; geometry.sector_size as usize];
    for s in 0..geometry.inode_table_len() {
        disk.write_sector(geometry.inode_table_start() + s, &zero)?;
    }

    inode::write(disk, geometry, ROOT_INODE as u32, &DiskInode::new_dir())?;

    Ok(())
}

/// Verifies an existing image's length and superblock magic.
fn verify_superblock(disk: &mut impl Disk, geometry: &DiskGeometry) -> Result<(), FsError> {
    let mut buf = vec![0u8; geometry.sector_size as usize];
    disk.read_sector(geometry.superblock_start(), &mut buf)?;
    if codec::decode_superblock_magic(&buf) != MAGIC {
        log::warn!("superblock magic mismatch on mount");
        return Err(FsError::General);
    }
    Ok(())
}

/// The engine: a disk, its geometry, and the process-wide open-file table.
pub struct Engine<D: Disk> {
    disk: D,
    geometry: DiskGeometry,
    open_files: OpenFileTable,
}

impl<D: Disk> Engine<D> {
    /// Formats `disk` fresh and mounts it.
    pub fn format_and_mount(mut disk: D, geometry: DiskGeometry) -> Result<Self, FsError> {
        geometry.validate()?;
        format(&mut disk, &geometry)?;
        Ok(Self {
            disk,
            geometry,
            open_files: OpenFileTable::new(geometry.max_open_files),
        })
    }

    /// Mounts an already-formatted `disk`, verifying its superblock.
    pub fn mount_existing(mut disk: D, geometry: DiskGeometry) -> Result<Self, FsError> {
        geometry.validate()?;
        verify_superblock(&mut disk, &geometry)?;
        Ok(Self {
            disk,
            geometry,
            open_files: OpenFileTable::new(geometry.max_open_files),
        })
    }

    pub fn geometry(&self) -> &DiskGeometry {
        &self.geometry
    }

    /// `Sync()`: flushes the backing store.
    pub fn sync(&mut self) -> Result<(), FsError> {
        self.disk.sync()
    }

    /// `FileCreate(path)`.
    pub fn file_create(&mut self, path: &str) -> Result<(), FsError> {
        fs::create(&mut self.disk, &self.geometry, path, KIND_FILE)
    }

    /// `DirCreate(path)`.
    pub fn dir_create(&mut self, path: &str) -> Result<(), FsError> {
        fs::create(&mut self.disk, &self.geometry, path, KIND_DIR)
    }

    /// `FileOpen(path) -> fd`.
    pub fn file_open(&mut self, path: &str) -> Result<usize, FsError> {
        self.open_files.open(&mut self.disk, &self.geometry, path)
    }

    /// `FileRead(fd, buf, n)`.
    pub fn file_read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        self.open_files.read(&mut self.disk, &self.geometry, fd, buf)
    }

    /// `FileWrite(fd, buf, n)`.
    pub fn file_write(&mut self, fd: usize, buf: &[u8]) -> Result<usize, FsError> {
        self.open_files.write(&mut self.disk, &self.geometry, fd, buf)
    }

    /// `FileSeek(fd, off)`.
    pub fn file_seek(&mut self, fd: usize, offset: i32) -> Result<(), FsError> {
        self.open_files.seek(fd, offset)
    }

    /// `FileClose(fd)`.
    pub fn file_close(&mut self, fd: usize) -> Result<(), FsError> {
        self.open_files.close(fd)
    }

    /// `FileUnlink(path)`.
    pub fn file_unlink(&mut self, path: &str) -> Result<(), FsError> {
        fs::file_unlink(&mut self.disk, &self.geometry, &self.open_files, path)
    }

    /// `DirUnlink(path)`.
    pub fn dir_unlink(&mut self, path: &str) -> Result<(), FsError> {
        fs::directory_unlink(&mut self.disk, &self.geometry, path)
    }

    /// `DirSize(path)`.
    pub fn dir_size(&mut self, path: &str) -> Result<u32, FsError> {
        fs::dir_size(&mut self.disk, &self.geometry, path)
    }

    /// `DirRead(path, buf, cap)`: packs the live dirents (spec.md §3's
    /// `{name: [u8; L], inode: i32}` layout, unpadded) into `buf` and
    /// returns the entry count.
    pub fn dir_read(&mut self, path: &str, buf: &mut [u8], cap: usize) -> Result<u32, FsError> {
        let (count, entries) = fs::dir_read(&mut self.disk, &self.geometry, path, cap)?;
        for (i, entry) in entries.iter().enumerate() {
            let offset = i * self.geometry.dirent_size();
            entry.encode_into(&mut buf[offset..offset + self.geometry.dirent_size()]);
        }
        Ok(count)
    }

    /// `inode_kind(path)`: resolves `path` and returns its `KIND_FILE`/
    /// `KIND_DIR` tag, without the caller needing a full `DirRead`.
    pub fn inode_kind(&mut self, path: &str) -> Result<i32, FsError> {
        let resolved = fs::resolve(&mut self.disk, &self.geometry, path)?;
        if resolved.child < 0 {
            return Err(FsError::NoSuchFile);
        }
        let inode = inode::read(&mut self.disk, &self.geometry, resolved.child as u32)?;
        Ok(inode.kind)
    }

    /// `inode_len(path)`: resolves `path` and returns its `size` field —
    /// byte length for a file, `size * dirent_size()` for a directory.
    pub fn inode_len(&mut self, path: &str) -> Result<u32, FsError> {
        let resolved = fs::resolve(&mut self.disk, &self.geometry, path)?;
        if resolved.child < 0 {
            return Err(FsError::NoSuchFile);
        }
        let inode = inode::read(&mut self.disk, &self.geometry, resolved.child as u32)?;
        Ok(inode.size as u32)
    }
}

impl Engine<FileDisk> {
    /// `Boot(filename)`: formats a fresh image if `filename` doesn't exist,
    /// otherwise mounts the existing one after validating its length and
    /// superblock magic.
    pub fn boot(path: impl AsRef<Path>, geometry: DiskGeometry) -> Result<Self, FsError> {
        let path = path.as_ref();
        if FileDisk::exists(path) {
            let disk = FileDisk::open_existing(path, geometry.sector_size, geometry.total_sectors)?;
            Self::mount_existing(disk, geometry)
        } else {
            let disk = FileDisk::create_fresh(path, geometry.sector_size, geometry.total_sectors)?;
            Self::format_and_mount(disk, geometry)
        }
    }
}
