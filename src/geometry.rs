//! Fixed parameters and derived on-disk layout (spec.md §3).

use crate::error::FsError;

/// Maximum name length `L` (16 bytes including the NUL terminator).
pub const MAX_NAME_LEN: usize = 16;
/// Maximum data sectors per file `M`.
pub const MAX_DATA_SECTORS: usize = 30;

/// `0xdeadbeef`, written to the first four bytes of the superblock sector.
pub const MAGIC: u32 = 0xdead_beef;

/// Inode `type` tag: regular file.
pub const KIND_FILE: i32 = 0;
/// Inode `type` tag: directory.
pub const KIND_DIR: i32 = 1;

/// The root inode's fixed id.
pub const ROOT_INODE: i32 = 0;

/// Runtime-configurable disk geometry.
///
/// `S`, `T`, `F`, `O` and `P` are exposed as constructor parameters instead
/// of compile-time constants so the same engine binary can format and mount
/// images of different sizes (the five-region *layout* they describe is
/// still fixed for the lifetime of a given image, per spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    /// Sector size in bytes (`S`).
    pub sector_size: u32,
    /// Total sector count (`T`).
    pub total_sectors: u32,
    /// Maximum number of inodes (`F`).
    pub max_files: u32,
    /// Maximum number of simultaneously open files (`O`).
    pub max_open_files: usize,
    /// Maximum absolute path length in bytes (`P`).
    pub max_path_len: usize,
}

impl DiskGeometry {
    /// Geometry matching the concrete scenarios in spec.md §8: `S=512`, `M=30`, `L=16`.
    pub fn with_defaults(total_sectors: u32) -> Self {
        Self {
            sector_size: 512,
            total_sectors,
            max_files: 128,
            max_open_files: 256,
            max_path_len: 256,
        }
    }

    pub fn inode_size(&self) -> usize {
        // { size: i32, type: i32, data: [i32; M] }
        8 + MAX_DATA_SECTORS * 4
    }

    pub fn dirent_size(&self) -> usize {
        // { name: [u8; L], inode: i32 }
        MAX_NAME_LEN + 4
    }

    pub fn inodes_per_sector(&self) -> u32 {
        self.sector_size / self.inode_size() as u32
    }

    pub fn dirents_per_sector(&self) -> u32 {
        self.sector_size / self.dirent_size() as u32
    }

    fn ceil_div(a: u32, b: u32) -> u32 {
        a.div_ceil(b)
    }

    /// Sectors occupied by the superblock region (always 1).
    pub fn superblock_start(&self) -> u32 {
        0
    }

    pub fn inode_bitmap_start(&self) -> u32 {
        self.superblock_start() + 1
    }

    pub fn inode_bitmap_len(&self) -> u32 {
        Self::ceil_div(self.max_files, self.sector_size * 8)
    }

    pub fn data_bitmap_start(&self) -> u32 {
        self.inode_bitmap_start() + self.inode_bitmap_len()
    }

    pub fn data_bitmap_len(&self) -> u32 {
        Self::ceil_div(self.total_sectors, self.sector_size * 8)
    }

    pub fn inode_table_start(&self) -> u32 {
        self.data_bitmap_start() + self.data_bitmap_len()
    }

    pub fn inode_table_len(&self) -> u32 {
        Self::ceil_div(self.max_files, self.inodes_per_sector())
    }

    pub fn data_region_start(&self) -> u32 {
        self.inode_table_start() + self.inode_table_len()
    }

    pub fn data_region_len(&self) -> u32 {
        self.total_sectors - self.data_region_start()
    }

    pub fn max_file_bytes(&self) -> u64 {
        MAX_DATA_SECTORS as u64 * self.sector_size as u64
    }

    /// Validates that the layout fits within `total_sectors` and that the
    /// inode/dirent records fit a sector without straddling boundaries.
    pub fn validate(&self) -> Result<(), FsError> {
        if self.sector_size == 0 || self.total_sectors == 0 || self.max_files == 0 {
            return Err(FsError::General);
        }
        if self.inode_size() > self.sector_size as usize {
            return Err(FsError::General);
        }
        if self.dirent_size() > self.sector_size as usize {
            return Err(FsError::General);
        }
        if self.data_region_start() >= self.total_sectors {
            return Err(FsError::General);
        }
        Ok(())
    }
}
