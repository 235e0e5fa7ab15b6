//! Filesystem helpers for backups and restores

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Regular files directly inside `dir`, sorted by name.
///
/// Subdirectories (including staging and backup directories) are ignored.
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Copy every regular file from `src` into `dst`, creating `dst` if needed.
///
/// Returns the destination paths in name order.
pub fn copy_files(src: &Path, dst: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dst)?;
    let mut copied = Vec::new();
    for file in list_files(src)? {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = dst.join(name);
        fs::copy(&file, &target)?;
        copied.push(target);
    }
    Ok(copied)
}

/// Write `contents` to `path`, creating missing parent directories
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Restrict a file to owner read/write (private keys)
#[cfg(unix)]
pub fn set_private_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
pub fn set_private_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// File name as a displayable string, or the whole path when there is none
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
