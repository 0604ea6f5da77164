//! Environment constants and path utilities for the command queue.
//!
//! This module centralizes the defaults and file locations used throughout
//! the crate, making them easier to maintain and modify.

use std::path::{Path, PathBuf};

/// Main application directory name (hidden directory like .git, .vscode)
pub const MUDCQ_DIR_NAME: &str = ".mudcq";

/// Configuration file name inside [`MUDCQ_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up directly in the working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "mudcq.toml";

/// Scheduling defaults shared by tasks, queues and the manager
pub mod defaults {
    use std::time::Duration;

    /// Queue used when a task names no queue, or an unknown one
    pub const QUEUE_NAME: &str = "any";

    /// Neutral priority for both queues and tasks
    pub const PRIORITY: i32 = 50;

    /// Pacing window applied after a task is sent
    pub const DURATION: Duration = Duration::from_secs(1);

    /// Number of dispatched commands kept in the history buffer
    pub const HISTORY_SIZE: usize = 16384;

    /// Cadence of the live session loop
    pub const TICK_INTERVAL_MS: u64 = 50;
}

/// Build the .mudcq directory path from a root directory
pub fn mudcq_dir_path(root: &Path) -> PathBuf {
    root.join(MUDCQ_DIR_NAME)
}

/// Build the local config file path (`<root>/.mudcq/config.toml`)
pub fn local_config_file_path(root: &Path) -> PathBuf {
    mudcq_dir_path(root).join(CONFIG_FILE_NAME)
}

/// Build the user config directory path (`~/.mudcq`)
pub fn user_config_dir_path(home: &Path) -> PathBuf {
    mudcq_dir_path(home)
}

/// Build the user config file path (`~/.mudcq/config.toml`)
pub fn user_config_file_path(home: &Path) -> PathBuf {
    user_config_dir_path(home).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let root = Path::new("/srv/mud");
        assert_eq!(
            local_config_file_path(root),
            PathBuf::from("/srv/mud/.mudcq/config.toml")
        );
        assert_eq!(
            user_config_file_path(Path::new("/home/player")),
            PathBuf::from("/home/player/.mudcq/config.toml")
        );
    }
}
