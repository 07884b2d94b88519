//! Path resolver (C5, spec.md §4.5) and namespace operations (C6, spec.md
//! §4.6) built on top of the inode store, bitmap allocator, and directory
//! store.

use crate::bitmap;
use crate::codec::{DirEntry, DiskInode};
use crate::disk::Disk;
use crate::dirstore;
use crate::error::FsError;
use crate::file::OpenFileTable;
use crate::geometry::{DiskGeometry, ROOT_INODE};
use crate::inode::{self, InodeCache};
use crate::name;

/// Result of resolving an absolute path (spec.md §4.5).
///
/// `child == -1` means the parent exists but the final component does not;
/// `last_name` is the final path component (empty for `/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub parent: i32,
    pub child: i32,
    pub last_name: String,
}

/// Resolves `path` to `(parent_inode, child_inode_or_absent, last_name)`.
///
/// `/` always resolves to `(0, 0, "")` — the parent of root is root itself.
pub fn resolve(disk: &mut impl Disk, geometry: &DiskGeometry, path: &str) -> Result<Resolved, FsError> {
    name::validate_path_shape(path, geometry)?;
    let components = name::split_components(path);

    if components.is_empty() {
        return Ok(Resolved {
            parent: ROOT_INODE,
            child: ROOT_INODE,
            last_name: String::new(),
        });
    }

    let mut cache = InodeCache::new();
    let mut parent: i32 = ROOT_INODE;
    let mut child: i32 = ROOT_INODE;

    let last = components.len() - 1;
    for (i, component) in components.iter().enumerate() {
        name::validate_component(component)?;

        if child < 0 {
            // A prior component was missing; there is nothing left to descend into.
            return Err(FsError::General);
        }

        let dir = cache.read(disk, geometry, child as u32)?;
        if !dir.is_dir() {
            return Err(FsError::General);
        }
        parent = child;

        match dirstore::scan(disk, geometry, &dir, component)? {
            Some(id) => child = id,
            None if i == last => {
                return Ok(Resolved {
                    parent,
                    child: -1,
                    last_name: component.to_string(),
                });
            }
            None => return Err(FsError::General),
        }
    }

    Ok(Resolved {
        parent,
        child,
        last_name: components[last].to_string(),
    })
}

/// `CreateFileOrDirectory` (spec.md §4.6): allocates an inode of `kind` and
/// appends it to the parent directory. Releases the inode bit if the
/// directory-append step fails after allocation.
pub fn create(disk: &mut impl Disk, geometry: &DiskGeometry, path: &str, kind: i32) -> Result<(), FsError> {
    let resolved = resolve(disk, geometry, path)?;
    if resolved.child >= 0 {
        return Err(FsError::Create);
    }
    if resolved.last_name.is_empty() {
        // path == "/" — already exists, and is not a creatable target.
        return Err(FsError::Create);
    }

    let inum = bitmap::allocate_first_free(
        disk,
        geometry.inode_bitmap_start(),
        geometry.inode_bitmap_len(),
        geometry.max_files,
    )
    .map_err(|_| FsError::Create)?;

    let new_inode = if kind == crate::geometry::KIND_DIR {
        DiskInode::new_dir()
    } else {
        DiskInode::new_file()
    };
    inode::write(disk, geometry, inum, &new_inode)?;

    let mut parent_inode = inode::read(disk, geometry, resolved.parent as u32)?;
    if let Err(err) = dirstore::append(
        disk,
        geometry,
        resolved.parent as u32,
        &mut parent_inode,
        &resolved.last_name,
        inum as i32,
    ) {
        log::warn!("create: rolling back inode {inum} after append failure");
        let _ = bitmap::free(disk, geometry.inode_bitmap_start(), inum);
        return Err(err);
    }

    Ok(())
}

/// `FileUnlink` (spec.md §4.6): refuses files that are currently open,
/// frees every data sector the file owns, tombstones its directory entry,
/// and frees the inode bit.
pub fn file_unlink(
    disk: &mut impl Disk,
    geometry: &DiskGeometry,
    open_files: &OpenFileTable,
    path: &str,
) -> Result<(), FsError> {
    let resolved = resolve(disk, geometry, path)?;
    if resolved.child < 0 {
        log::warn!("file_unlink: no such file: {path}");
        return Err(FsError::NoSuchFile);
    }
    if open_files.is_open(resolved.child) {
        log::warn!("file_unlink: {path} is still open (inode {})", resolved.child);
        return Err(FsError::InUse);
    }

    let mut child = inode::read(disk, geometry, resolved.child as u32)?;
    if !child.is_file() {
        return Err(FsError::General);
    }

    let used = child.used_file_sectors(geometry.sector_size);
    for sector_slot in child.data.iter_mut().take(used) {
        bitmap::free(disk, geometry.data_bitmap_start(), *sector_slot as u32)?;
        *sector_slot = 0;
    }
    child.size = 0;
    inode::write(disk, geometry, resolved.child as u32, &child)?;

    let parent = inode::read(disk, geometry, resolved.parent as u32)?;
    dirstore::remove(disk, geometry, &parent, resolved.child)?;
    log::debug!("file_unlink: tombstoned entry for inode {} in parent {}", resolved.child, resolved.parent);

    bitmap::free(disk, geometry.inode_bitmap_start(), resolved.child as u32)?;

    Ok(())
}

/// `DirectoryUnlink` (spec.md §4.6). Refuses `/`, non-empty directories
/// (including ones whose only entries are tombstones — see spec.md §4.4),
/// and anything that isn't a directory. Never reclaims the directory's
/// backing data sectors (the deliberate leak documented in spec.md §9).
pub fn directory_unlink(disk: &mut impl Disk, geometry: &DiskGeometry, path: &str) -> Result<(), FsError> {
    name::validate_path_shape(path, geometry)?;
    if name::split_components(path).is_empty() {
        log::warn!("directory_unlink: refusing to remove root");
        return Err(FsError::RootDir);
    }

    let resolved = resolve(disk, geometry, path)?;
    if resolved.child < 0 {
        log::warn!("directory_unlink: no such directory: {path}");
        return Err(FsError::NoSuchDir);
    }

    let child = inode::read(disk, geometry, resolved.child as u32)?;
    if !child.is_dir() {
        return Err(FsError::General);
    }
    if child.size > 0 {
        log::warn!("directory_unlink: {path} still has entries (size={})", child.size);
        return Err(FsError::NotEmpty);
    }

    let parent = inode::read(disk, geometry, resolved.parent as u32)?;
    dirstore::remove(disk, geometry, &parent, resolved.child)?;
    bitmap::free(disk, geometry.inode_bitmap_start(), resolved.child as u32)?;

    Ok(())
}

/// `DirSize` (spec.md §4.6): `size * dirent_size` bytes.
pub fn dir_size(disk: &mut impl Disk, geometry: &DiskGeometry, path: &str) -> Result<u32, FsError> {
    let resolved = resolve(disk, geometry, path)?;
    if resolved.child < 0 {
        return Err(FsError::NoSuchDir);
    }
    let child = inode::read(disk, geometry, resolved.child as u32)?;
    if !child.is_dir() {
        return Err(FsError::General);
    }
    Ok(child.size as u32 * geometry.dirent_size() as u32)
}

/// `DirRead` (spec.md §4.6): returns the entry count and the live dirents
/// (full sector groups, then the partial tail), in insertion order.
pub fn dir_read(
    disk: &mut impl Disk,
    geometry: &DiskGeometry,
    path: &str,
    cap: usize,
) -> Result<(u32, Vec<DirEntry>), FsError> {
    let resolved = resolve(disk, geometry, path)?;
    if resolved.child < 0 {
        return Err(FsError::NoSuchDir);
    }
    let child = inode::read(disk, geometry, resolved.child as u32)?;
    if !child.is_dir() {
        return Err(FsError::General);
    }
    if cap < child.size as usize * geometry.dirent_size() {
        return Err(FsError::BufferTooSmall);
    }

    let entries = dirstore::read_all(disk, geometry, &child)?;
    Ok((child.size as u32, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::tests::MemDisk;
    use crate::geometry::{DiskGeometry, KIND_DIR, KIND_FILE};

    fn booted(total_sectors: u32) -> (MemDisk, DiskGeometry) {
        let geometry = DiskGeometry::with_defaults(total_sectors);
        let mut disk = MemDisk::new(geometry.sector_size, geometry.total_sectors);
        crate::engine::format(&mut disk, &geometry).unwrap();
        (disk, geometry)
    }

    #[test]
    fn root_resolves_to_itself() {
        let (mut disk, geometry) = booted(64);
        let resolved = resolve(&mut disk, &geometry, "/").unwrap();
        assert_eq!(resolved, Resolved { parent: 0, child: 0, last_name: String::new() });
    }

    #[test]
    fn missing_leaf_reports_parent_and_name() {
        let (mut disk, geometry) = booted(64);
        let resolved = resolve(&mut disk, &geometry, "/a").unwrap();
        assert_eq!(resolved.parent, 0);
        assert_eq!(resolved.child, -1);
        assert_eq!(resolved.last_name, "a");
    }

    #[test]
    fn create_then_resolve_finds_child() {
        let (mut disk, geometry) = booted(64);
        create(&mut disk, &geometry, "/a", KIND_DIR).unwrap();
        let resolved = resolve(&mut disk, &geometry, "/a").unwrap();
        assert_eq!(resolved.parent, 0);
        assert!(resolved.child > 0);
    }

    #[test]
    fn create_twice_fails_exists() {
        let (mut disk, geometry) = booted(64);
        create(&mut disk, &geometry, "/a", KIND_FILE).unwrap();
        let err = create(&mut disk, &geometry, "/a", KIND_FILE).unwrap_err();
        assert_eq!(err, FsError::Create);
    }

    #[test]
    fn non_directory_component_mid_path_errors() {
        let (mut disk, geometry) = booted(64);
        create(&mut disk, &geometry, "/a", KIND_FILE).unwrap();
        let err = resolve(&mut disk, &geometry, "/a/b").unwrap_err();
        assert_eq!(err, FsError::General);
    }

    #[test]
    fn directory_unlink_refuses_root_and_populated_dir() {
        let (mut disk, geometry) = booted(64);
        let err = directory_unlink(&mut disk, &geometry, "/").unwrap_err();
        assert_eq!(err, FsError::RootDir);

        create(&mut disk, &geometry, "/a", KIND_DIR).unwrap();
        create(&mut disk, &geometry, "/a/f", KIND_FILE).unwrap();
        let err = directory_unlink(&mut disk, &geometry, "/a").unwrap_err();
        assert_eq!(err, FsError::NotEmpty);
    }

    #[test]
    fn directory_unlink_rejects_malformed_path_before_root_dir_check() {
        let (mut disk, geometry) = booted(64);
        // An empty string never starts with `/`, so spec.md §4.5 step 1
        // requires a `General` error, not `RootDir` (which `split_components`
        // alone can't distinguish from a malformed path).
        let err = directory_unlink(&mut disk, &geometry, "").unwrap_err();
        assert_eq!(err, FsError::General);
    }

    #[test]
    fn directory_unlink_of_nonexistent_fails() {
        let (mut disk, geometry) = booted(64);
        let err = directory_unlink(&mut disk, &geometry, "/nope").unwrap_err();
        assert_eq!(err, FsError::NoSuchDir);
    }

    #[test]
    fn file_unlink_frees_inode_and_data_bits() {
        let (mut disk, geometry) = booted(64);
        create(&mut disk, &geometry, "/f", KIND_FILE).unwrap();
        let resolved = resolve(&mut disk, &geometry, "/f").unwrap();
        let inum = resolved.child as u32;

        let open_files = OpenFileTable::new(geometry.max_open_files);
        file_unlink(&mut disk, &geometry, &open_files, "/f").unwrap();

        assert!(!bitmap::is_set(&mut disk, geometry.inode_bitmap_start(), inum).unwrap());
        assert_eq!(resolve(&mut disk, &geometry, "/f").unwrap().child, -1);
    }

    #[test]
    fn tombstone_quirk_blocks_directory_removal_even_when_empty_again() {
        let (mut disk, geometry) = booted(64);
        create(&mut disk, &geometry, "/a", KIND_DIR).unwrap();
        create(&mut disk, &geometry, "/a/f", KIND_FILE).unwrap();

        let open_files = OpenFileTable::new(geometry.max_open_files);
        file_unlink(&mut disk, &geometry, &open_files, "/a/f").unwrap();

        // The directory is now logically empty of live entries, but `size`
        // was never decremented, so removal must still be refused.
        let err = directory_unlink(&mut disk, &geometry, "/a").unwrap_err();
        assert_eq!(err, FsError::NotEmpty);
    }
}
