use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn data_dir() -> PathBuf {
    let d = match std::env::var("PLAYDESK_DATA_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::data_local_dir()
            .map(|p| p.join("playdesk"))
            .unwrap_or_else(|| PathBuf::from("playdesk-data")),
    };
    let _ = std::fs::create_dir_all(&d);
    d
}

pub fn settings_file() -> PathBuf {
    data_dir().join("settings.json")
}

pub fn nickname_file() -> PathBuf {
    data_dir().join("nickname.json")
}

// ── JSON helpers ──────────────────────────────────────────────────────────────

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_chat_host")]
    pub host: String,
    #[serde(default = "default_chat_port")]
    pub port: u16,
    #[serde(default = "default_chat_channel")]
    pub channel: String,
    #[serde(default)]
    pub key: String,
}

fn default_chat_host() -> String {
    "localhost".to_string()
}

const fn default_chat_port() -> u16 {
    20080
}

fn default_chat_channel() -> String {
    "Rambler channel".to_string()
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            host: default_chat_host(),
            port: default_chat_port(),
            channel: default_chat_channel(),
            key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub theme: String,
    #[serde(default)]
    pub chat: ChatSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "Green".into(),
            chat: ChatSettings::default(),
        }
    }
}

pub fn load_settings() -> Settings {
    load_json(&settings_file())
}

pub fn save_settings(d: &Settings) {
    let _ = save_json(&settings_file(), d);
}

// ── Global mutable state ──────────────────────────────────────────────────────

static NICKNAME: OnceLock<RwLock<Option<String>>> = OnceLock::new();
static APP_SETTINGS: OnceLock<RwLock<Settings>> = OnceLock::new();

fn nickname_lock() -> &'static RwLock<Option<String>> {
    NICKNAME.get_or_init(|| RwLock::new(None))
}

fn settings_lock() -> &'static RwLock<Settings> {
    APP_SETTINGS.get_or_init(|| RwLock::new(Settings::default()))
}

pub fn get_nickname() -> Option<String> {
    nickname_lock().read().ok()?.clone()
}

// Scores still get a name when nobody has logged in.
pub fn display_name() -> String {
    get_nickname().unwrap_or_else(|| "Unknown Hero".to_string())
}

pub fn set_nickname(nickname: Option<&str>) {
    if let Ok(mut guard) = nickname_lock().write() {
        *guard = nickname.map(str::to_string);
    }
    match nickname {
        Some(n) => {
            let _ = save_json(&nickname_file(), &n);
        }
        None => {
            let _ = std::fs::remove_file(nickname_file());
        }
    }
}

pub fn reload_nickname() {
    let stored: Option<String> = load_json(&nickname_file());
    if let Ok(mut guard) = nickname_lock().write() {
        *guard = stored.filter(|s| !s.is_empty());
    }
}

pub fn get_settings() -> Settings {
    settings_lock()
        .read()
        .map(|g| g.clone())
        .unwrap_or_default()
}

pub fn reload_settings() {
    let s = load_settings();
    if let Ok(mut guard) = settings_lock().write() {
        *guard = s;
    }
}

pub fn update_settings<F: FnOnce(&mut Settings)>(f: F) {
    if let Ok(mut guard) = settings_lock().write() {
        f(&mut guard);
    }
}

pub fn persist_settings() {
    let s = get_settings();
    save_settings(&s);
}

// ── Themes ────────────────────────────────────────────────────────────────────

use ratatui::style::Color;

pub const THEMES: &[(&str, Color)] = &[
    ("Green", Color::Green),
    ("Amber", Color::Yellow),
    ("White", Color::White),
    ("Cyan", Color::Cyan),
    ("Magenta", Color::Magenta),
];

pub fn theme_color(name: &str) -> Color {
    THEMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
        .unwrap_or(Color::Green)
}

pub fn current_theme_color() -> Color {
    theme_color(&get_settings().theme)
}

pub fn cycle_theme() {
    update_settings(|s| {
        let idx = THEMES
            .iter()
            .position(|(n, _)| *n == s.theme)
            .unwrap_or(0);
        s.theme = THEMES[(idx + 1) % THEMES.len()].0.to_string();
    });
    persist_settings();
}

pub const APP_TITLE: &str = "PLAYDESK";
