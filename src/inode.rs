//! Inode store (C3, spec.md §4.3).
//!
//! Given inode id `n`, its sector is `inode_table_start + n / inodes_per_sector`
//! and its offset within that sector is `(n mod inodes_per_sector) * inode_size`.
//! Writes always bypass any cache and go straight to the sector; nothing
//! here implicitly writes back a caller's mutated copy.

use crate::codec::DiskInode;
use crate::disk::Disk;
use crate::error::FsError;
use crate::geometry::DiskGeometry;

/// Returns `(sector, byte offset within sector)` for inode `inum`.
pub fn location(geometry: &DiskGeometry, inum: u32) -> (u32, usize) {
    let per_sector = geometry.inodes_per_sector();
    let sector = geometry.inode_table_start() + inum / per_sector;
    let offset = (inum % per_sector) as usize * geometry.inode_size();
    (sector, offset)
}

/// Reads inode `inum` directly from disk (no cache).
pub fn read(disk: &mut impl Disk, geometry: &DiskGeometry, inum: u32) -> Result<DiskInode, FsError> {
    let (sector, offset) = location(geometry, inum);
    let mut buf = vec![0u8; geometry.sector_size as usize];
    disk.read_sector(sector, &mut buf)?;
    Ok(DiskInode::decode(&buf[offset..offset + DiskInode::SIZE]))
}

/// Read-modify-writes inode `inum`'s sector with the given record.
pub fn write(
    disk: &mut impl Disk,
    geometry: &DiskGeometry,
    inum: u32,
    inode: &DiskInode,
) -> Result<(), FsError> {
    let (sector, offset) = location(geometry, inum);
    let mut buf = vec![0u8; geometry.sector_size as usize];
    disk.read_sector(sector, &mut buf)?;
    inode.encode_into(&mut buf[offset..offset + DiskInode::SIZE]);
    disk.write_sector(sector, &buf)?;
    Ok(())
}

/// The one-sector metadata cache threaded through path resolution
/// (spec.md §4.5 step 4, §9). Reads bypass a disk round-trip when the
/// requested inode lives in the sector already cached from the previous
/// descent; writes never touch the cache (spec.md §4.3).
#[derive(Debug, Default)]
pub struct InodeCache {
    cached_sector: Option<u32>,
    cached_bytes: Vec<u8>,
}

impl InodeCache {
    pub fn new() -> Self {
        Self {
            cached_sector: None,
            cached_bytes: Vec::new(),
        }
    }

    pub fn read(
        &mut self,
        disk: &mut impl Disk,
        geometry: &DiskGeometry,
        inum: u32,
    ) -> Result<DiskInode, FsError> {
        let (sector, offset) = location(geometry, inum);

        if self.cached_sector != Some(sector) {
            let mut buf = vec![0u8; geometry.sector_size as usize];
            disk.read_sector(sector, &mut buf)?;
            self.cached_bytes = buf;
            self.cached_sector = Some(sector);
        }

        Ok(DiskInode::decode(
            &self.cached_bytes[offset..offset + DiskInode::SIZE],
        ))
    }
}
