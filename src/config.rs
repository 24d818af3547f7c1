use crate::game::playback::PlaybackConfig;
use log::{LevelFilter, info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "replayview.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    pub fn parse(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Marker lifetime in milliseconds.
    pub fade_window_ms: f64,
    /// Half-width of the accuracy bar in seconds.
    pub accuracy_range_s: f64,
    /// Grace period after the replay duration before playback finishes.
    pub completion_buffer_s: f64,
    /// Accuracy bar width in terminal cells.
    pub canvas_width: u16,
    pub frame_rate: u32,
    /// Extra plays of the same replay after the first one finishes.
    pub repeat: u32,
    pub show_event_log: bool,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            fade_window_ms: 2000.0,
            accuracy_range_s: 0.15,
            completion_buffer_s: 0.1,
            canvas_width: 60,
            frame_rate: 60,
            repeat: 0,
            show_event_log: true,
            color: true,
        }
    }
}

impl Config {
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            fade_window_ms: self.fade_window_ms,
            accuracy_range_s: self.accuracy_range_s,
            completion_buffer_s: self.completion_buffer_s,
            canvas_width: f64::from(self.canvas_width),
        }
    }

    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }

    /// Builds a config from `[Options]`, falling back to defaults for missing
    /// or malformed keys and clamping numeric values into range.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();
        let finite = |key: &str| option::<f64>(conf, key).filter(|v| v.is_finite());

        Self {
            log_level: option::<LogLevel>(conf, "LogLevel").unwrap_or(default.log_level),
            fade_window_ms: finite("FadeWindowMs")
                .map_or(default.fade_window_ms, |v| v.clamp(100.0, 10_000.0)),
            accuracy_range_s: finite("AccuracyRange")
                .map_or(default.accuracy_range_s, |v| v.clamp(0.01, 1.0)),
            completion_buffer_s: finite("CompletionBuffer")
                .map_or(default.completion_buffer_s, |v| v.clamp(0.0, 5.0)),
            canvas_width: option::<u16>(conf, "CanvasWidth")
                .map_or(default.canvas_width, |v| v.clamp(10, 400)),
            frame_rate: option::<u32>(conf, "FrameRate")
                .map_or(default.frame_rate, |v| v.clamp(1, 1000)),
            repeat: option::<u32>(conf, "Repeat").map_or(default.repeat, |v| v.min(100)),
            show_event_log: bool_option(conf, "ShowEventLog").unwrap_or(default.show_event_log),
            color: bool_option(conf, "Color").unwrap_or(default.color),
        }
    }
}

fn option<T: FromStr>(conf: &SimpleIni, key: &str) -> Option<T> {
    let raw = conf.get("Options", key)?;
    let parsed = raw.parse::<T>().ok();
    if parsed.is_none() {
        warn!("Invalid value '{raw}' for {key} in '{CONFIG_PATH}'; using default.");
    }
    parsed
}

fn bool_option(conf: &SimpleIni, key: &str) -> Option<bool> {
    let raw = conf.get("Options", key)?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        warn!("Invalid value '{raw}' for {key} in '{CONFIG_PATH}'; using default.");
    }
    parsed
}

fn parse_bool(v: &str) -> Option<bool> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

const OPTION_KEYS: [&str; 9] = [
    "AccuracyRange",
    "CanvasWidth",
    "Color",
    "CompletionBuffer",
    "FadeWindowMs",
    "FrameRate",
    "LogLevel",
    "Repeat",
    "ShowEventLog",
];

fn render_options(cfg: &Config) -> String {
    let mut content = String::new();

    // [Options] section - keys in alphabetical order
    content.push_str("[Options]\n");
    content.push_str(&format!("AccuracyRange={}\n", cfg.accuracy_range_s));
    content.push_str(&format!("CanvasWidth={}\n", cfg.canvas_width));
    content.push_str(&format!("Color={}\n", if cfg.color { "1" } else { "0" }));
    content.push_str(&format!("CompletionBuffer={}\n", cfg.completion_buffer_s));
    content.push_str(&format!("FadeWindowMs={}\n", cfg.fade_window_ms));
    content.push_str(&format!("FrameRate={}\n", cfg.frame_rate));
    content.push_str(&format!("LogLevel={}\n", cfg.log_level.as_str()));
    content.push_str(&format!("Repeat={}\n", cfg.repeat));
    content.push_str(&format!(
        "ShowEventLog={}\n",
        if cfg.show_event_log { "1" } else { "0" }
    ));
    content.push('\n');
    content
}

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    std::fs::write(CONFIG_PATH, render_options(&Config::default()))
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(CONFIG_PATH) {
        Ok(()) => {
            let loaded = Config::from_ini(&conf);
            *CONFIG.lock().unwrap() = loaded;
            info!("Configuration loaded from '{CONFIG_PATH}'.");

            // Only rewrite the file when keys are missing, keeping user values.
            let missing = OPTION_KEYS
                .iter()
                .any(|key| conf.get("Options", key).is_none());
            if missing {
                info!("'{CONFIG_PATH}' is missing options; writing the full set.");
                if let Err(e) = std::fs::write(CONFIG_PATH, render_options(&loaded)) {
                    warn!("Failed to save config file: {e}");
                }
            }
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
        }
    }
}

pub fn get() -> Config {
    *CONFIG.lock().unwrap()
}
