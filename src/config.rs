use crate::daemon;
use crate::menu::{MenuEvent, MenuListener, SEPARATOR};
use crate::paths;
use crate::tray::{icon, TrayIcon};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PLACEHOLDER_ICON_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    #[default]
    Log,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntryConfig {
    pub label: String,
    #[serde(default)]
    pub action: MenuAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrayConfig {
    pub caption: String,
    pub tooltip: String,
    pub icon: Option<PathBuf>,
    pub template: bool,
    pub auto_size: bool,
    /// Use the in-memory status bar instead of the platform one.
    pub headless: bool,
    /// Tray events buffered per observer.
    pub event_buffer: usize,
    pub menu: Vec<MenuEntryConfig>,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            caption: String::new(),
            tooltip: "Status Bar Tray".into(),
            icon: None,
            template: false,
            auto_size: true,
            headless: false,
            event_buffer: daemon::DEFAULT_BUFFER,
            menu: vec![MenuEntryConfig {
                label: "Quit".into(),
                action: MenuAction::Quit,
            }],
        }
    }
}

impl TrayConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: TrayConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Sets caption, tooltip, image and menu on `icon`. `quit` backs every
    /// entry whose action is [`MenuAction::Quit`].
    pub fn apply_to(&self, icon: &TrayIcon, quit: MenuListener) -> Result<()> {
        icon.set_caption(self.caption.as_str())?;
        icon.set_tooltip(self.tooltip.as_str())?;
        icon.set_icon_auto_size(self.auto_size);

        match &self.icon {
            Some(path) => {
                let image = icon::load(path)
                    .with_context(|| format!("Failed to load icon {}", path.display()))?;
                icon.set_icon(&image, self.template)?;
            }
            None => icon.set_icon(&icon::placeholder(PLACEHOLDER_ICON_SIZE), self.template)?,
        }

        for (index, entry) in self.menu.iter().enumerate() {
            let listener: Option<MenuListener> = if entry.label == SEPARATOR {
                None
            } else {
                match entry.action {
                    MenuAction::Quit => Some(quit.clone()),
                    MenuAction::Log => Some(Arc::new(|event: &MenuEvent| {
                        log::info!("Menu item selected: {} (tag {})", event.label, event.tag);
                    })),
                }
            };
            icon.add_item(&entry.label, index, listener)?;
        }
        Ok(())
    }
}
