//! Input discovery: expand files and directories into a job list.
//!
//! The extension filter is only a convenience for walking directories. The
//! validation gate still sniffs every file's content before decoding.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::LimitsConfig;
use crate::types::SourceFormat;

/// Finds candidate images under a path.
pub struct FileDiscovery {
    limits: LimitsConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Discover all candidate image files at a path.
    ///
    /// An explicit file path is always returned, whatever its extension, so
    /// that a disguised file still reaches the gate and fails there. A
    /// directory is walked recursively for allow-listed extensions.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return match std::fs::metadata(path) {
                Ok(meta) => vec![DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                }],
                Err(e) => {
                    tracing::warn!("Cannot stat {:?}: {}", path, e);
                    vec![]
                }
            };
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            if entry_path.is_file() && self.is_supported(entry_path) {
                if let Ok(meta) = entry.metadata() {
                    files.push(DiscoveredFile {
                        path: entry_path.to_path_buf(),
                        size: meta.len(),
                    });
                }
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Discover across several inputs, keeping their order and dropping
    /// repeats.
    pub fn discover_all(&self, paths: &[PathBuf]) -> Vec<DiscoveredFile> {
        let mut seen = std::collections::HashSet::new();
        paths
            .iter()
            .flat_map(|p| self.discover(p))
            .filter(|f| seen.insert(f.path.clone()))
            .collect()
    }

    /// Check if a file's extension names an allowed format.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(SourceFormat::from_name)
            .map(|format| self.limits.allows(format.name()))
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(LimitsConfig::default());

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.jpeg")));
        assert!(discovery.is_supported(Path::new("test.png")));
        assert!(discovery.is_supported(Path::new("test.webp")));
        assert!(discovery.is_supported(Path::new("test.heic")));
        assert!(!discovery.is_supported(Path::new("test.gif")));
        assert!(!discovery.is_supported(Path::new("test.tiff")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("noext")));
    }

    #[test]
    fn test_discover_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"bb").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.webp"), b"ccc").unwrap();

        let files = FileDiscovery::new(LimitsConfig::default()).discover(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png"),
                PathBuf::from("nested/c.webp")
            ]
        );
        assert_eq!(FileDiscovery::total_size(&files), 6);
    }

    #[test]
    fn test_explicit_file_kept_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let discovery = FileDiscovery::new(LimitsConfig::default());
        let files = discovery.discover_all(&[path.clone(), path.clone()]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, path);
    }

    #[test]
    fn test_total_size() {
        let files = vec![
            DiscoveredFile {
                path: PathBuf::from("a.jpg"),
                size: 100,
            },
            DiscoveredFile {
                path: PathBuf::from("b.jpg"),
                size: 200,
            },
        ];

        assert_eq!(FileDiscovery::total_size(&files), 300);
    }
}
