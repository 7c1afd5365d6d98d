//! Utility functions shared across the crate.

use std::path::{Path, PathBuf};

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Get the user's cache directory following XDG conventions.
///
/// Returns `$XDG_CACHE_HOME` if set, otherwise `$HOME/.cache`.
pub fn cache_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
}

/// Get the user's data directory following XDG conventions.
///
/// Returns `$XDG_DATA_HOME` if set, otherwise `$HOME/.local/share`.
pub fn data_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
        })
}

/// Get the default post-edit cache path.
pub fn post_edit_cache_path() -> PathBuf {
    cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("doc-translator")
}

/// Default location for application data (history database).
pub fn default_data_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from(".data"))
        .join("doc-translator")
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Returns `None` for names that are empty, hidden, or try to escape the
/// target directory.
pub fn safe_file_name(name: &str) -> Option<&str> {
    let name = name.trim();
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..")
    {
        return None;
    }
    Some(name)
}

/// Lower-cased extension of a file name, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Total size in bytes of the regular files below `dir`.
///
/// Missing directories count as empty.
pub fn dir_size(dir: &Path) -> std::io::Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut total = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}

/// Space on the filesystem holding a path, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeUsage {
    pub total: u64,
    /// Blocks in use, reserved ones included
    pub used: u64,
    /// Space available to unprivileged users
    pub free: u64,
}

impl VolumeUsage {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let stats = fs2::statvfs(path)?;
        Ok(Self {
            total: stats.total_space(),
            used: stats.total_space().saturating_sub(stats.free_space()),
            free: stats.available_space(),
        })
    }
}

/// Whole gibibytes, rounded down: `"12 GB"`.
pub fn format_gigabytes(bytes: u64) -> String {
    format!("{} GB", bytes >> 30)
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name_rejects_traversal() {
        assert_eq!(safe_file_name("report.docx"), Some("report.docx"));
        assert_eq!(safe_file_name("  french.pdf "), Some("french.pdf"));
        assert_eq!(safe_file_name("../etc/passwd"), None);
        assert_eq!(safe_file_name("a/b.docx"), None);
        assert_eq!(safe_file_name("a\\b.docx"), None);
        assert_eq!(safe_file_name(".env"), None);
        assert_eq!(safe_file_name(""), None);
    }

    #[test]
    fn test_extension_of_is_lowercase() {
        assert_eq!(extension_of("Glossary.XLSX").as_deref(), Some("xlsx"));
        assert_eq!(extension_of("notes"), None);
    }

    #[test]
    fn test_dir_size_counts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), [0u8; 10]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.bin"), [0u8; 5]).unwrap();

        assert_eq!(dir_size(dir.path()).unwrap(), 15);
        assert_eq!(dir_size(&dir.path().join("missing")).unwrap(), 0);
    }

    #[test]
    fn test_volume_usage_is_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let usage = VolumeUsage::of(dir.path()).unwrap();
        assert!(usage.total > 0);
        assert!(usage.used <= usage.total);
        assert!(usage.free <= usage.total);
        assert!(VolumeUsage::of(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_format_gigabytes_rounds_down() {
        assert_eq!(format_gigabytes(0), "0 GB");
        assert_eq!(format_gigabytes((5 << 30) + (1 << 29)), "5 GB");
    }
}
