use std::path::Path;

/// Dot-prefixed names are hidden everywhere
fn has_dot_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(unix)]
pub fn is_hidden(path: &Path) -> bool {
    has_dot_name(path)
}

/// Also honours the hidden and system attributes
#[cfg(windows)]
pub fn is_hidden(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

    let flagged = path
        .symlink_metadata()
        .map(|m| m.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0)
        .unwrap_or(false);
    flagged || has_dot_name(path)
}

/// ENOTDIR, reported when a path component is a regular file
#[cfg(unix)]
pub fn is_not_a_directory(error: &std::io::Error) -> bool {
    error.raw_os_error() == Some(20)
}

/// ERROR_DIRECTORY
#[cfg(windows)]
pub fn is_not_a_directory(error: &std::io::Error) -> bool {
    error.raw_os_error() == Some(267)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_names_are_hidden() {
        assert!(is_hidden(Path::new("/media/.thumbs")));
        assert!(is_hidden(Path::new(".git")));
        assert!(!is_hidden(Path::new("/media/clip.mp4")));
        assert!(!is_hidden(Path::new("keep")));
    }

    #[cfg(unix)]
    #[test]
    fn enotdir_is_detected() {
        assert!(is_not_a_directory(&std::io::Error::from_raw_os_error(20)));
        assert!(!is_not_a_directory(&std::io::Error::from_raw_os_error(2)));
    }
}
