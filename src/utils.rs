use std::env;
use std::path::{Path, PathBuf};

/// Absolute form of `source_path` for handing to an engine that may run in
/// another working directory. Symlinks are not resolved, so the sidecar cache
/// stays next to the path the user gave.
pub fn absolute_path(source_path: &Path) -> PathBuf {
    let absolute = std::path::absolute(source_path).unwrap_or_else(|_| {
        env::current_dir()
            .unwrap_or_default()
            .join(source_path)
    });

    // dunce drops \\?\ prefixes on Windows
    dunce::simplified(&absolute).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_path_becomes_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.exe");
        std::fs::write(&file, b"MZ").unwrap();

        let dotted = dir.path().join(".").join("app.exe");
        let abs = absolute_path(&dotted);
        assert!(abs.is_absolute());
        assert_eq!(abs.file_name().unwrap(), "app.exe");
        assert!(!abs.components().any(|c| c == std::path::Component::CurDir));
    }

    #[test]
    fn missing_path_is_kept_absolute() {
        let abs = absolute_path(Path::new("does/not/exist.bin"));
        assert!(abs.is_absolute());
        assert!(abs.ends_with("does/not/exist.bin"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real.so");
        std::fs::write(&target, b"\x7fELF").unwrap();
        let link = dir.path().join("link.so");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let abs = absolute_path(&link);
        assert_eq!(abs.file_name().unwrap(), "link.so");
        assert_eq!(
            crate::cache::sidecar_path(&abs).file_name().unwrap(),
            "link.so.discache"
        );
    }
}
