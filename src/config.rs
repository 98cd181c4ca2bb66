use crate::game::frame::EngineConfig;
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

pub const CONFIG_PATH: &str = "judgeline.ini";

const OPTIONS_KEYS: [&str; 5] =
    ["Autoplay", "ChartSpeed", "HitFxDuration", "HitFxFrequency", "LogLevel"];

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
        let mut current_section = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                current_section = line[1..line.len() - 1].trim().to_string();
                self.sections.entry(current_section.clone()).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                self.sections
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key.to_string(), value.trim().to_string());
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

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
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
    pub chart_speed: f64,
    pub hit_fx_duration: f64,
    pub hit_fx_frequency: f64,
    pub autoplay: bool,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            log_level: LogLevel::Warn,
            chart_speed: engine.chart_speed,
            hit_fx_duration: engine.hit_fx_duration,
            hit_fx_frequency: engine.hit_fx_frequency,
            autoplay: engine.autoplay,
        }
    }
}

impl Config {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            chart_speed: self.chart_speed,
            hit_fx_duration: self.hit_fx_duration,
            hit_fx_frequency: self.hit_fx_frequency,
            autoplay: self.autoplay,
        }
    }

    /// Reads `[Options]`, falling back to the default for every missing or
    /// malformed key.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Config::default();
        let positive = |key: &str, fallback: f64| {
            conf.get("Options", key)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(fallback)
        };
        Config {
            log_level: conf
                .get("Options", "LogLevel")
                .and_then(|v| LogLevel::from_str(&v).ok())
                .unwrap_or(default.log_level),
            chart_speed: conf
                .get("Options", "ChartSpeed")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default.chart_speed),
            hit_fx_duration: positive("HitFxDuration", default.hit_fx_duration),
            hit_fx_frequency: positive("HitFxFrequency", default.hit_fx_frequency),
            autoplay: conf
                .get("Options", "Autoplay")
                .and_then(|v| v.parse::<u8>().ok())
                .map_or(default.autoplay, |v| v != 0),
        }
    }

    fn to_ini_string(self) -> String {
        // [Options] section - keys in alphabetical order
        let mut content = String::new();
        content.push_str("[Options]\n");
        content.push_str(&format!("Autoplay={}\n", if self.autoplay { "1" } else { "0" }));
        content.push_str(&format!("ChartSpeed={}\n", self.chart_speed));
        content.push_str(&format!("HitFxDuration={}\n", self.hit_fx_duration));
        content.push_str(&format!("HitFxFrequency={}\n", self.hit_fx_frequency));
        content.push_str(&format!("LogLevel={}\n", self.log_level.as_str()));
        content
    }
}

static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, Config::default().to_ini_string())
}

pub fn load() {
    load_from(Path::new(CONFIG_PATH));
}

pub fn load_from(path: &Path) {
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            let cfg = Config::from_ini(&conf);
            *CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = cfg;
            info!("Configuration loaded from '{}'.", path.display());

            // Only rewrite the file if any key is missing.
            if OPTIONS_KEYS.iter().any(|k| conf.get("Options", k).is_none()) {
                match std::fs::write(path, cfg.to_ini_string()) {
                    Ok(()) => info!(
                        "'{}' updated with default values for any missing fields.",
                        path.display()
                    ),
                    Err(e) => warn!("Failed to update '{}': {e}", path.display()),
                }
            }
        }
        Err(e) => {
            warn!("Failed to load '{}': {e}. Using default values.", path.display());
        }
    }
}

pub fn get() -> Config {
    *CONFIG.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{Config, LogLevel, SimpleIni};

    #[test]
    fn ini_values_override_defaults() {
        let mut ini = SimpleIni::new();
        ini.parse(
            "; comment\n[Options]\nChartSpeed = 1.5\nLogLevel=debug\nAutoplay=0\nHitFxDuration=0.3\n",
        );
        let cfg = Config::from_ini(&ini);
        assert_eq!(cfg.chart_speed, 1.5);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert!(!cfg.autoplay);
        assert_eq!(cfg.hit_fx_duration, 0.3);
        assert_eq!(cfg.hit_fx_frequency, Config::default().hit_fx_frequency);
    }

    #[test]
    fn malformed_values_fall_back() {
        let mut ini = SimpleIni::new();
        ini.parse("[Options]\nHitFxFrequency=-1\nLogLevel=loud\nChartSpeed=fast\n");
        let cfg = Config::from_ini(&ini);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn written_defaults_read_back() {
        let text = Config::default().to_ini_string();
        let mut ini = SimpleIni::new();
        ini.parse(&text);
        assert_eq!(Config::from_ini(&ini), Config::default());
        assert_eq!(Config::default().engine(), crate::game::frame::EngineConfig::default());
    }
}
