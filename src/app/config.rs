//! Configuration for a display connection

use serde::{Deserialize, Serialize};

use crate::native::Modifiers;
use crate::render::CursorStyle;

/// Display connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Font names
    pub fonts: FontConfig,
    /// Colour settings
    pub colors: ColorConfig,
    /// Window settings
    pub window: WindowConfig,
    /// Delay before buffered drawing is pushed to the display
    pub flush_delay_ms: u64,
    /// How often to poll for a missing copy acknowledgement before
    /// redrawing instead
    pub copy_ack_retries: u32,
    /// Upper bound on the whole acknowledgement wait
    pub copy_ack_timeout_ms: u64,
    /// Modifier that turns on motion reporting while held: `mod1`..`mod5`,
    /// `control`, `shift`, `alt`/`meta`, `super` or `hyper`
    pub prefix: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fonts: FontConfig::default(),
            colors: ColorConfig::default(),
            window: WindowConfig::default(),
            flush_delay_ms: 100,
            copy_ack_retries: 2,
            copy_ack_timeout_ms: 50,
            prefix: String::new(),
        }
    }
}

/// Font names; empty variant names are derived from the base font
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub base: String,
    pub bold: String,
    pub italic: String,
    pub bold_italic: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            base: "fixed".to_string(),
            bold: String::new(),
            italic: String::new(),
            bold_italic: String::new(),
        }
    }
}

/// Colour configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Palette overrides, `key=value` pairs such as `colour1=#cc0000`
    pub palette: String,
    /// Default foreground colour name; white when empty
    pub foreground: String,
    /// Default background colour name; black when empty
    pub background: String,
    /// Cursor colour name; inverse when empty
    pub cursor: String,
    /// Cursor style number
    pub cursor_style: CursorStyle,
}

/// Window configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Resource name
    pub name: String,
    /// Resource class
    pub class: String,
    /// Initial width in columns
    pub columns: u32,
    /// Initial height in rows
    pub rows: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            name: "paneglass".to_string(),
            class: "Paneglass".to_string(),
            columns: 80,
            rows: 24,
        }
    }
}

impl DisplayConfig {
    /// Load configuration from a file
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: DisplayConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from default location or return default config
    pub fn load_or_default() -> Self {
        // Try to load from ~/.config/paneglass/config.json
        if let Some(config_dir) = dirs_config_path() {
            let config_path = config_dir.join("config.json");
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("ignoring {}: {}", config_path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Modifier bits of the configured prefix; empty when unset or unknown
    pub fn prefix_modifiers(&self) -> Modifiers {
        let prefix = self.prefix.to_ascii_lowercase();
        match prefix.as_str() {
            "" => Modifiers::empty(),
            "mod1" | "alt" | "meta" => Modifiers::MOD1,
            "mod2" => Modifiers::MOD2,
            "mod3" | "hyper" => Modifiers::MOD3,
            "mod4" | "super" => Modifiers::MOD4,
            "mod5" => Modifiers::MOD5,
            "control" | "ctrl" => Modifiers::CONTROL,
            "shift" => Modifiers::SHIFT,
            _ => {
                tracing::debug!("unknown prefix modifier {:?}", self.prefix);
                Modifiers::empty()
            }
        }
    }
}

/// Get the configuration directory path
fn dirs_config_path() -> Option<std::path::PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| std::path::PathBuf::from(home).join(".config").join("paneglass"))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
