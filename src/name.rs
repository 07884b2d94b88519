//! Name and path grammar (spec.md §6).

use crate::error::FsError;
use crate::geometry::{DiskGeometry, MAX_NAME_LEN};

fn is_legal_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}

/// Validates a single path component: 1..=L-1 bytes from `[A-Za-z0-9._-]`.
/// `.` and `..` are legal leaf names here (no special interpretation).
pub fn validate_component(component: &str) -> Result<(), FsError> {
    let bytes = component.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NAME_LEN - 1 {
        return Err(FsError::General);
    }
    if !bytes.iter().all(|&b| is_legal_byte(b)) {
        return Err(FsError::General);
    }
    Ok(())
}

/// Validates the overall path shape: starts with `/`, total length `<= P-1`.
pub fn validate_path_shape(path: &str, geometry: &DiskGeometry) -> Result<(), FsError> {
    if !path.starts_with('/') {
        return Err(FsError::General);
    }
    if path.len() > geometry.max_path_len - 1 {
        return Err(FsError::General);
    }
    Ok(())
}

/// Splits a path on `/`, collapsing consecutive separators and dropping
/// empty components.
pub fn split_components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}
