use std::fs;
use std::path::Path;
use std::process::Command;

use log::{info, warn};

use crate::error::ApplyError;
use crate::services::WallpaperService;

const BACKGROUND_SCHEMA: &str = "org.gnome.desktop.background";

/// Desktop reported by the session, lowercased.
pub fn get_desktop_environment() -> Option<String> {
    ["XDG_CURRENT_DESKTOP", "DESKTOP_SESSION"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.to_lowercase())
        .find(|value| !value.is_empty())
}

/// Sessions that read `org.gnome.desktop.background`.
pub fn uses_gnome_background(desktop: &str) -> bool {
    ["gnome", "unity", "ubuntu", "pop", "budgie"]
        .iter()
        .any(|name| desktop.contains(name))
}

pub fn file_uri(path: &Path) -> Result<String, ApplyError> {
    let s = path
        .to_str()
        .ok_or_else(|| ApplyError::NonUtf8Path(path.to_path_buf()))?;
    Ok(format!("file://{}", s))
}

/// Light and dark picture plus the display mode, in the order they are applied.
pub fn gsettings_commands(uri: &str) -> [[&str; 4]; 3] {
    [
        ["set", BACKGROUND_SCHEMA, "picture-uri", uri],
        ["set", BACKGROUND_SCHEMA, "picture-uri-dark", uri],
        ["set", BACKGROUND_SCHEMA, "picture-options", "zoom"],
    ]
}

/// Sets the GNOME background through `gsettings`.
#[derive(Debug, Clone)]
pub struct GnomeWallpaper {
    program: String,
}

impl Default for GnomeWallpaper {
    fn default() -> Self {
        Self::with_program("gsettings")
    }
}

impl GnomeWallpaper {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl WallpaperService for GnomeWallpaper {
    fn set_wallpaper_from_path(&self, file_path: &Path) -> Result<(), ApplyError> {
        if let Some(desktop) = get_desktop_environment() {
            if !uses_gnome_background(&desktop) {
                warn!("Desktop environment '{}' may ignore GNOME background settings", desktop);
            }
        }

        let absolute = fs::canonicalize(file_path).map_err(|source| ApplyError::Canonicalize {
            path: file_path.to_path_buf(),
            source,
        })?;
        let uri = file_uri(&absolute)?;

        // Any failing step aborts the rest.
        for args in gsettings_commands(&uri) {
            let command = format!("{} {}", self.program, args.join(" "));
            let output = Command::new(&self.program)
                .args(args)
                .output()
                .map_err(|source| ApplyError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            if !output.status.success() {
                return Err(ApplyError::Status {
                    command,
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        }

        info!("Wallpaper set successfully to: {}", uri);
        Ok(())
    }
}
