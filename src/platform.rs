//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione cross-platform dei binari esterni
//! usati dal runtime di transcodifica (`ffmpeg`, `ffprobe`).
//!
//! ## Strategia di risoluzione (priorità decrescente):
//! 1. Path esplicito dalla configurazione
//! 2. Variabile d'ambiente `GHOSTPRESS_<TOOL>` (es. `GHOSTPRESS_FFMPEG`)
//! 3. Ricerca nel `PATH` di sistema con il nome specifico della piattaforma

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        if cfg!(windows) {
            commands.insert("ffmpeg", "ffmpeg.exe");
            commands.insert("ffprobe", "ffprobe.exe");
        } else {
            commands.insert("ffmpeg", "ffmpeg");
            commands.insert("ffprobe", "ffprobe");
        }

        Self { commands }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        self.commands.get(base_name).copied().unwrap_or(base_name)
    }

    /// Environment variable that overrides the location of a tool
    pub fn override_var(base_name: &str) -> String {
        format!("GHOSTPRESS_{}", base_name.to_ascii_uppercase())
    }

    /// Resolve a tool: explicit path, then environment override, then PATH
    pub fn resolve(&self, base_name: &str, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                debug!("Using configured {}: {}", base_name, path.display());
                return Some(path.to_path_buf());
            }
            warn!("Configured {} does not exist: {}", base_name, path.display());
            return None;
        }

        if let Some(path) = env::var_os(Self::override_var(base_name)).map(PathBuf::from) {
            if path.exists() {
                debug!("Using {} from environment: {}", base_name, path.display());
                return Some(path);
            }
            warn!("{} points to a missing file: {}", Self::override_var(base_name), path.display());
        }

        self.find_in_system_path(base_name)
    }

    fn find_in_system_path(&self, base_name: &str) -> Option<PathBuf> {
        let command_name = self.get_command(base_name);
        let found = env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(command_name))
            .find(|path| path.is_file());

        match found {
            Some(ref path) => debug!("Resolved {} -> {}", base_name, path.display()),
            None => debug!("{} not found in PATH", base_name),
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_platform_commands() {
        let platform = PlatformCommands::instance();

        let ffmpeg = platform.get_command("ffmpeg");
        assert!(ffmpeg.starts_with("ffmpeg"));
        assert_eq!(platform.get_command("unknown-tool"), "unknown-tool");
    }

    #[test]
    fn test_override_var_name() {
        assert_eq!(PlatformCommands::override_var("ffprobe"), "GHOSTPRESS_FFPROBE");
    }

    #[test]
    fn test_explicit_path_wins() {
        let temp_dir = TempDir::new().unwrap();
        let fake = temp_dir.path().join("my-ffmpeg");
        std::fs::write(&fake, b"").unwrap();

        let platform = PlatformCommands::instance();
        assert_eq!(platform.resolve("ffmpeg", Some(&fake)), Some(fake.clone()));

        let missing = temp_dir.path().join("absent");
        assert_eq!(platform.resolve("ffmpeg", Some(&missing)), None);
    }

    #[test]
    fn test_missing_tool_is_none() {
        let platform = PlatformCommands::instance();
        assert_eq!(platform.find_in_system_path("ghostpress-no-such-tool"), None);
    }
}
