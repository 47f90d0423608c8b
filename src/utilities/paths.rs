//! Path resolution for profile storage.

use std::env;
use std::path::PathBuf;

/// Returns the root directory for profile storage.
///
/// Uses the `SOULKEEPER_STORAGE_DIR` environment variable if set, otherwise
/// the platform-specific data directory:
/// - Linux: `~/.local/share/Soulkeeper/profiles`
/// - macOS: `~/Library/Application Support/Soulkeeper/profiles`
/// - Windows: `%LOCALAPPDATA%\Soulkeeper\profiles`
pub fn storage_root() -> PathBuf {
    if let Ok(dir) = env::var("SOULKEEPER_STORAGE_DIR") {
        return PathBuf::from(dir);
    }

    let app_dir = "Soulkeeper";
    let base = if cfg!(target_os = "linux") {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".local").join("share").join(app_dir)
    } else if cfg!(target_os = "macos") {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join(app_dir)
    } else if cfg!(target_os = "windows") {
        let local_app_data = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("APPDATA").unwrap_or_else(|_| "C:\\tmp".to_string()));
        PathBuf::from(local_app_data).join(app_dir)
    } else {
        PathBuf::from("/tmp").join(app_dir)
    };

    base.join("profiles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_root_ends_with_profiles() {
        assert!(storage_root().ends_with("profiles"));
    }
}
