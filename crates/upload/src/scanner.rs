//! Collecting upload items from the local filesystem.
//!
//! Plain files become items without a relative path. Directories are
//! walked recursively; their files get a relative path that starts with
//! the directory's own name, normalized to forward slashes, so the tree
//! is recreated under the destination.

use std::path::Path;

use seeker_transfer::{TransferError, UploadItem};
use tracing::debug;

use crate::error::UploadError;

/// Builds upload items from files and directories, in the given order.
///
/// Directory entries are visited in name order.
pub fn collect_upload_items<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<UploadItem>, UploadError> {
    let mut items = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;

        if metadata.is_dir() {
            let root_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    TransferError::InvalidPath(format!("no directory name: {}", path.display()))
                })?;
            walk_dir(path, &root_name, &mut items)?;
        } else {
            items.push(UploadItem::from_path(path)?);
        }
    }

    Ok(items)
}

/// Sum of all item sizes in bytes.
pub fn total_size(items: &[UploadItem]) -> u64 {
    items.iter().map(UploadItem::size).sum()
}

fn walk_dir(current: &Path, prefix: &str, items: &mut Vec<UploadItem>) -> Result<(), UploadError> {
    let mut entries = std::fs::read_dir(current)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel_path = format!("{prefix}/{name}");

        // Symlinked files are followed like top-level paths; symlinked
        // directories are not walked.
        let is_link = entry.file_type()?.is_symlink();
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if is_link => {
                debug!(path = %path.display(), error = %e, "skipping dangling symlink");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            if is_link {
                debug!(path = %path.display(), "skipping symlinked directory");
                continue;
            }
            walk_dir(&path, &rel_path, items)?;
        } else if metadata.is_file() {
            items.push(UploadItem::from_path(&path)?.with_relative_path(rel_path));
        } else {
            debug!(path = %path.display(), "skipping special file");
        }
    }

    Ok(())
}
