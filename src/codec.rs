//! Sector codec (C1, spec.md §4.1).
//!
//! All multi-byte integers are stored in host byte order; the image is not
//! required to be portable across endianness. Inode and directory-entry
//! records are `#[repr(C)]` `Pod` types, decoded/encoded via `bytemuck` —
//! the same approach the teacher's `mkfs/src/main.rs` uses for its
//! `SuperBlock`/`DiskInode`/`Directory` records.

use bytemuck::{Pod, Zeroable};

use crate::geometry::{KIND_DIR, KIND_FILE, MAX_DATA_SECTORS, MAX_NAME_LEN};

/// On-disk inode record: `{ size: i32, type: i32, data: [i32; M] }`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq, Eq)]
pub struct DiskInode {
    pub size: i32,
    pub kind: i32,
    pub data: [i32; MAX_DATA_SECTORS],
}

impl DiskInode {
    pub const SIZE: usize = size_of::<Self>();

    pub fn new_file() -> Self {
        Self {
            size: 0,
            kind: KIND_FILE,
            data: [0; MAX_DATA_SECTORS],
        }
    }

    pub fn new_dir() -> Self {
        Self {
            size: 0,
            kind: KIND_DIR,
            data: [0; MAX_DATA_SECTORS],
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == KIND_DIR
    }

    pub fn is_file(&self) -> bool {
        self.kind == KIND_FILE
    }

    /// Number of data sectors in use, given this inode's role.
    pub fn used_file_sectors(&self, sector_size: u32) -> usize {
        (self.size as u32).div_ceil(sector_size) as usize
    }

    pub fn used_dir_sectors(&self, dirents_per_sector: u32) -> usize {
        (self.size as u32).div_ceil(dirents_per_sector.max(1)) as usize
    }

    pub fn decode(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn encode_into(&self, bytes: &mut [u8]) {
        bytes[..Self::SIZE].copy_from_slice(bytemuck::bytes_of(self));
    }
}

/// On-disk directory entry: `{ name: [u8; L], inode: i32 }`, packed without padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; MAX_NAME_LEN],
    pub inode: i32,
}

impl DirEntry {
    pub const SIZE: usize = size_of::<Self>();

    pub fn new(name: &str, inode: i32) -> Self {
        let mut bytes = [0u8; MAX_NAME_LEN];
        let n = name.as_bytes();
        bytes[..n.len()].copy_from_slice(n);
        Self { name: bytes, inode }
    }

    pub fn empty() -> Self {
        Self::zeroed()
    }

    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        // The name grammar restricts bytes to ASCII, so this is always valid UTF-8.
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn decode(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn encode_into(&self, bytes: &mut [u8]) {
        bytes[..Self::SIZE].copy_from_slice(bytemuck::bytes_of(self));
    }
}

/// Writes the magic number into a freshly zeroed superblock sector buffer.
pub fn encode_superblock(buf: &mut [u8], magic: u32) {
    buf[..4].copy_from_slice(&magic.to_ne_bytes());
}

/// Reads the magic number out of a superblock sector buffer.
pub fn decode_superblock_magic(buf: &[u8]) -> u32 {
    u32::from_ne_bytes(buf[..4].try_into().unwrap())
}
