use crate::TransferError;
use crate::types::UploadItem;

/// Normalises a client-supplied relative path.
///
/// - Backslashes become `/`.
/// - Leading slashes, empty segments and `.` segments are dropped.
/// - `..` segments are rejected.
///
/// Returns an empty string when nothing remains.
pub fn normalize_relative_path(raw: &str) -> Result<String, TransferError> {
    let unified = raw.replace('\\', "/");
    let mut parts = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {raw}"
                )));
            }
            s => parts.push(s),
        }
    }

    Ok(parts.join("/"))
}

/// Resolves the `(path, filename)` pair sent to init and finalize.
///
/// Items without a relative path land directly in `destination`. Items
/// from a directory upload land in `destination` joined with the
/// directory part of their relative path.
pub fn destination_for(
    destination: &str,
    item: &UploadItem,
) -> Result<(String, String), TransferError> {
    let (dir, filename) = match item.relative_path() {
        Some(rel) => {
            let normalized = normalize_relative_path(rel)?;
            match normalized.rsplit_once('/') {
                Some((dir, file)) => (dir.to_string(), file.to_string()),
                None if normalized.is_empty() => (String::new(), item.name().to_string()),
                None => (String::new(), normalized),
            }
        }
        None => (String::new(), item.name().to_string()),
    };

    validate_filename(&filename)?;
    Ok((join_destination(destination, &dir), filename))
}

fn validate_filename(filename: &str) -> Result<(), TransferError> {
    if filename.is_empty() {
        return Err(TransferError::InvalidPath("empty file name".into()));
    }
    if filename == "." || filename == ".." {
        return Err(TransferError::InvalidPath(format!(
            "reserved file name: {filename}"
        )));
    }
    if filename.contains(['/', '\\']) {
        return Err(TransferError::InvalidPath(format!(
            "file name contains a separator: {filename}"
        )));
    }
    Ok(())
}

fn join_destination(destination: &str, dir: &str) -> String {
    if dir.is_empty() {
        return destination.to_string();
    }
    let base = destination.trim_end_matches('/');
    if base.is_empty() && !destination.starts_with('/') {
        dir.to_string()
    } else {
        format!("{base}/{dir}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> UploadItem {
        UploadItem::from_bytes(name, vec![1u8, 2, 3])
    }

    #[test]
    fn normalizes_separators_and_leading_slashes() {
        assert_eq!(
            normalize_relative_path("\\photos\\2024/a.jpg").unwrap(),
            "photos/2024/a.jpg"
        );
        assert_eq!(normalize_relative_path("//a//b/./c").unwrap(), "a/b/c");
        assert_eq!(normalize_relative_path("./").unwrap(), "");
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(normalize_relative_path("../../../etc/passwd").is_err());
        assert!(normalize_relative_path("sub/../../escape").is_err());
        assert!(normalize_relative_path("..").is_err());
    }

    #[test]
    fn accepts_dotfiles() {
        assert_eq!(
            normalize_relative_path(".config/settings.json").unwrap(),
            ".config/settings.json"
        );
    }

    #[test]
    fn plain_item_goes_to_destination() {
        let (path, filename) = destination_for("/docs", &item("report.pdf")).unwrap();
        assert_eq!(path, "/docs");
        assert_eq!(filename, "report.pdf");
    }

    #[test]
    fn relative_path_round_trips_to_finalize_fields() {
        let it = item("a.jpg").with_relative_path("/photos\\2024/a.jpg");
        let (path, filename) = destination_for("/media/", &it).unwrap();
        assert_eq!(path, "/media/photos/2024");
        assert_eq!(filename, "a.jpg");
    }

    #[test]
    fn relative_path_under_root_destination() {
        let it = item("a.txt").with_relative_path("proj/a.txt");
        assert_eq!(destination_for("/", &it).unwrap().0, "/proj");
        assert_eq!(destination_for("", &it).unwrap().0, "proj");
    }

    #[test]
    fn relative_path_without_directory() {
        let it = item("a.txt").with_relative_path("a.txt");
        assert_eq!(
            destination_for("/docs", &it).unwrap(),
            ("/docs".to_string(), "a.txt".to_string())
        );
    }

    #[test]
    fn empty_relative_path_falls_back_to_name() {
        let it = item("a.txt").with_relative_path("/");
        assert_eq!(destination_for("/docs", &it).unwrap().1, "a.txt");
    }

    #[test]
    fn traversal_in_relative_path_is_rejected() {
        let it = item("x").with_relative_path("../x");
        assert!(matches!(
            destination_for("/docs", &it),
            Err(TransferError::InvalidPath(_))
        ));
    }

    #[test]
    fn separator_in_name_is_rejected() {
        assert!(destination_for("/docs", &item("a/b.txt")).is_err());
        assert!(destination_for("/docs", &item("")).is_err());
        assert!(destination_for("/docs", &item("..")).is_err());
    }
}
