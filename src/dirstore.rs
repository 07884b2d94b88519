//! Directory store (C4, spec.md §4.4).
//!
//! A directory's entries are the concatenation of its `size` live entries
//! across `ceil(size/D)` data sectors, in insertion order. `remove` zeroes
//! a slot but never decrements `size` and never reclaims sectors — the
//! tombstone quirk described in spec.md §4.4/§9 is preserved verbatim.

use crate::bitmap;
use crate::codec::{DirEntry, DiskInode};
use crate::disk::Disk;
use crate::error::FsError;
use crate::geometry::DiskGeometry;
use crate::inode;

fn read_sector_buf(disk: &mut impl Disk, geometry: &DiskGeometry, sector: u32) -> Result<Vec<u8>, FsError> {
    let mut buf = vec![0u8; geometry.sector_size as usize];
    disk.read_sector(sector, &mut buf)?;
    Ok(buf)
}

/// Appends `(name, child_id)` to `parent`'s directory, persisting the
/// touched data sector and the parent inode.
pub fn append(
    disk: &mut impl Disk,
    geometry: &DiskGeometry,
    parent_inum: u32,
    parent: &mut DiskInode,
    name: &str,
    child_id: i32,
) -> Result<(), FsError> {
    let d = geometry.dirents_per_sector();
    let size = parent.size as u32;
    let slot_in_sector = (size % d) as usize;
    let group = (size / d) as usize;

    if group >= crate::geometry::MAX_DATA_SECTORS {
        // I4: a directory's size never exceeds M * D. A new group past that
        // bound has nowhere to land in `parent.data`.
        return Err(FsError::NoSpace);
    }

    let sector = if slot_in_sector == 0 {
        // The returned bit index IS the absolute sector number: the sector
        // bitmap's first `data_region_start()` bits are pre-marked in-use
        // at format time (spec.md §4.2/§4.8), so the scan never returns a
        // bit below that boundary.
        let sector = bitmap::allocate_first_free(
            disk,
            geometry.data_bitmap_start(),
            geometry.data_bitmap_len(),
            geometry.total_sectors,
        )?;
        disk.write_sector(sector, &vec![0u8; geometry.sector_size as usize])?;
        parent.data[group] = sector as i32;
        sector
    } else {
        parent.data[group] as u32
    };

    let mut buf = read_sector_buf(disk, geometry, sector)?;
    let entry = DirEntry::new(name, child_id);
    let offset = slot_in_sector * DirEntry::SIZE;
    entry.encode_into(&mut buf[offset..offset + DirEntry::SIZE]);
    disk.write_sector(sector, &buf)?;

    parent.size = (size + 1) as i32;
    inode::write(disk, geometry, parent_inum, parent)?;

    Ok(())
}

/// Zeroes the entry matching `child_id` in place. Does not decrement
/// `size` and does not free the data sector (spec.md §4.4).
pub fn remove(
    disk: &mut impl Disk,
    geometry: &DiskGeometry,
    parent: &DiskInode,
    child_id: i32,
) -> Result<(), FsError> {
    let d = geometry.dirents_per_sector();
    let size = parent.size as u32;
    let groups = parent.used_dir_sectors(d);

    let mut remaining = size;
    for group in 0..groups {
        let sector = parent.data[group] as u32;
        let mut buf = read_sector_buf(disk, geometry, sector)?;
        let live_here = remaining.min(d);

        let mut touched = false;
        for slot in 0..live_here as usize {
            let offset = slot * DirEntry::SIZE;
            let entry = DirEntry::decode(&buf[offset..offset + DirEntry::SIZE]);
            if entry.inode == child_id {
                DirEntry::empty().encode_into(&mut buf[offset..offset + DirEntry::SIZE]);
                touched = true;
                break;
            }
        }

        if touched {
            disk.write_sector(sector, &buf)?;
            return Ok(());
        }

        remaining -= live_here;
    }

    Err(FsError::General)
}

/// Looks up `name` among `parent`'s live entries, returning the child inode
/// id if found.
pub fn scan(
    disk: &mut impl Disk,
    geometry: &DiskGeometry,
    parent: &DiskInode,
    name: &str,
) -> Result<Option<i32>, FsError> {
    let d = geometry.dirents_per_sector();
    let size = parent.size as u32;
    let groups = parent.used_dir_sectors(d);

    let mut remaining = size;
    for group in 0..groups {
        let sector = parent.data[group] as u32;
        let buf = read_sector_buf(disk, geometry, sector)?;
        let live_here = remaining.min(d);

        for slot in 0..live_here as usize {
            let offset = slot * DirEntry::SIZE;
            let entry = DirEntry::decode(&buf[offset..offset + DirEntry::SIZE]);
            if entry.name_str() == name {
                return Ok(Some(entry.inode));
            }
        }

        remaining -= live_here;
    }

    Ok(None)
}

/// Copies every live entry (including tombstones, which decode to an
/// empty name and inode 0) into `out`, matching `DirRead`'s contract.
pub fn read_all(
    disk: &mut impl Disk,
    geometry: &DiskGeometry,
    parent: &DiskInode,
) -> Result<Vec<DirEntry>, FsError> {
    let d = geometry.dirents_per_sector();
    let size = parent.size as u32;
    let groups = parent.used_dir_sectors(d);

    let mut out = Vec::with_capacity(size as usize);
    let mut remaining = size;
    for group in 0..groups {
        let sector = parent.data[group] as u32;
        let buf = read_sector_buf(disk, geometry, sector)?;
        let live_here = remaining.min(d);

        for slot in 0..live_here as usize {
            let offset = slot * DirEntry::SIZE;
            out.push(DirEntry::decode(&buf[offset..offset + DirEntry::SIZE]));
        }

        remaining -= live_here;
    }

    Ok(out)
}
