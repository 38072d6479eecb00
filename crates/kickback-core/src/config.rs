//! Configuration loading and typed config structures for kickback.
//!
//! The canonical configuration lives in `kickback-config.yaml` next to the
//! binary. This module defines strongly-typed structs that mirror the YAML
//! structure, and a loader that reads and validates the file. Every field
//! has a default, so a missing key (or a missing file) falls back cleanly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kickback_types::Color;
use serde::Deserialize;

use crate::clock::{ClockError, TickRate, TickSpan};

/// Environment variable that overrides the configuration file path.
pub const CONFIG_PATH_ENV: &str = "KICKBACK_CONFIG";

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "kickback-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A duration or tick rate could not be converted.
    #[error("invalid timing in config: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
///
/// Mirrors the structure of `kickback-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Fixed step rate.
    #[serde(default)]
    pub time: TimeConfig,

    /// Combo buffering, regen, and ring colors.
    #[serde(default)]
    pub combo: ComboConfig,

    /// Player serve and swing tuning.
    #[serde(default)]
    pub player: PlayerConfig,

    /// Game over and victory sequence.
    #[serde(default)]
    pub session: SessionConfig,

    /// Encounter script and object map.
    #[serde(default)]
    pub encounter: EncounterConfig,

    /// Host loop bounds and pacing.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path: `KICKBACK_CONFIG` when set, otherwise
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist. Returns the config and whether a file was read.
    ///
    /// # Errors
    ///
    /// Any error other than a missing file is returned.
    pub fn load_or_default(path: &Path) -> Result<(Self, bool), ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok((Self::parse(&contents)?, true)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                Ok((config, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Check every value that parsed but may still be out of range.
    ///
    /// # Errors
    ///
    /// Returns the first offending value as [`ConfigError::Invalid`] or
    /// [`ConfigError::Clock`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.time.tick_rate()?;
        self.combo.validate(rate)?;
        self.player.validate(rate)?;
        self.session.validate()?;
        self.encounter.validate()?;
        Ok(())
    }
}

/// Fixed step configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeConfig {
    /// Simulation steps per second.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
}

impl TimeConfig {
    /// The configured step rate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Clock`] if the rate is zero.
    pub fn tick_rate(&self) -> Result<TickRate, ConfigError> {
        Ok(TickRate::new(self.ticks_per_second)?)
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: default_ticks_per_second(),
        }
    }
}

/// Combo state machine and ring rendering configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComboConfig {
    /// How long an unmatched hit stays buffered.
    #[serde(default = "default_hurt_buffer_millis")]
    pub hurt_buffer_millis: u64,

    /// Regen duration of one ring, in seconds.
    #[serde(default = "default_regen_seconds")]
    pub regen_seconds: f64,

    /// Longest regen any ring may have; ring thickness is relative to it.
    #[serde(default = "default_max_total_seconds")]
    pub max_total_seconds: f64,

    /// Ring colors by hit type.
    #[serde(default)]
    pub colors: RingColors,
}

impl ComboConfig {
    /// Hit buffer window in ticks.
    pub fn hurt_buffer(&self, rate: TickRate) -> TickSpan {
        rate.span(Duration::from_millis(self.hurt_buffer_millis))
    }

    /// Regen duration in ticks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Clock`] for a negative or non-finite value.
    pub fn regen(&self, rate: TickRate) -> Result<TickSpan, ConfigError> {
        Ok(rate.seconds(self.regen_seconds)?)
    }

    /// Maximum total regen in ticks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Clock`] for a negative or non-finite value.
    pub fn max_total(&self, rate: TickRate) -> Result<TickSpan, ConfigError> {
        Ok(rate.seconds(self.max_total_seconds)?)
    }

    fn validate(&self, rate: TickRate) -> Result<(), ConfigError> {
        let regen = self.regen(rate)?;
        if regen.is_zero() {
            return Err(ConfigError::Invalid {
                field: "combo.regen_seconds",
                reason: "must be at least one tick".to_owned(),
            });
        }
        let max_total = self.max_total(rate)?;
        if max_total < regen {
            return Err(ConfigError::Invalid {
                field: "combo.max_total_seconds",
                reason: format!("{max_total} is shorter than the regen duration {regen}"),
            });
        }
        self.colors.validate()
    }
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            hurt_buffer_millis: default_hurt_buffer_millis(),
            regen_seconds: default_regen_seconds(),
            max_total_seconds: default_max_total_seconds(),
            colors: RingColors::default(),
        }
    }
}

/// Ring color per hit type.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RingColors {
    /// Color for red requirements.
    #[serde(default = "default_red")]
    pub red: Color,
    /// Color for green requirements.
    #[serde(default = "default_green")]
    pub green: Color,
    /// Color for blue requirements.
    #[serde(default = "default_blue")]
    pub blue: Color,
}

impl RingColors {
    /// Color for one hit type.
    pub const fn of(&self, hurt: kickback_types::HurtType) -> Color {
        match hurt {
            kickback_types::HurtType::Red => self.red,
            kickback_types::HurtType::Green => self.green,
            kickback_types::HurtType::Blue => self.blue,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, color) in [
            ("combo.colors.red", self.red),
            ("combo.colors.green", self.green),
            ("combo.colors.blue", self.blue),
        ] {
            if !color.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "channels must be finite".to_owned(),
                });
            }
        }
        Ok(())
    }
}

impl Default for RingColors {
    fn default() -> Self {
        Self {
            red: default_red(),
            green: default_green(),
            blue: default_blue(),
        }
    }
}

/// Player serve and swing tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerConfig {
    /// How long a swing stays active without a release.
    #[serde(default = "default_swing_window_ticks")]
    pub swing_window_ticks: u64,

    /// Charge ticks at which a serve is at full power.
    #[serde(default = "default_max_serve_charge_ticks")]
    pub max_serve_charge_ticks: u64,

    /// Radius of the contact overlap query.
    #[serde(default = "default_contact_radius")]
    pub contact_radius: f32,

    /// Hit-stop applied on contact, in seconds.
    #[serde(default = "default_hit_stop_seconds")]
    pub hit_stop_seconds: f64,

    /// Camera shake intensity on contact.
    #[serde(default = "default_camera_shake")]
    pub camera_shake: f32,
}

impl PlayerConfig {
    /// Hit-stop duration in ticks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Clock`] for a negative or non-finite value.
    pub fn hit_stop(&self, rate: TickRate) -> Result<TickSpan, ConfigError> {
        Ok(rate.seconds(self.hit_stop_seconds)?)
    }

    fn validate(&self, rate: TickRate) -> Result<(), ConfigError> {
        let _ = self.hit_stop(rate)?;
        if self.max_serve_charge_ticks == 0 {
            return Err(ConfigError::Invalid {
                field: "player.max_serve_charge_ticks",
                reason: "must be positive".to_owned(),
            });
        }
        if !self.contact_radius.is_finite() || self.contact_radius < 0.0 {
            return Err(ConfigError::Invalid {
                field: "player.contact_radius",
                reason: format!("{} is not a non-negative finite radius", self.contact_radius),
            });
        }
        if !self.camera_shake.is_finite() {
            return Err(ConfigError::Invalid {
                field: "player.camera_shake",
                reason: "must be finite".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            swing_window_ticks: default_swing_window_ticks(),
            max_serve_charge_ticks: default_max_serve_charge_ticks(),
            contact_radius: default_contact_radius(),
            hit_stop_seconds: default_hit_stop_seconds(),
            camera_shake: default_camera_shake(),
        }
    }
}

/// Game over and victory sequence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Number of fireworks launched on victory.
    #[serde(default = "default_firework_count")]
    pub firework_count: u32,

    /// Shortest delay before a firework, in milliseconds.
    #[serde(default = "default_firework_delay_min_millis")]
    pub firework_delay_min_millis: u64,

    /// Longest delay before a firework, in milliseconds (exclusive).
    #[serde(default = "default_firework_delay_max_millis")]
    pub firework_delay_max_millis: u64,

    /// Delay before the replay prompt is appended, in milliseconds.
    #[serde(default = "default_replay_prompt_millis")]
    pub replay_prompt_millis: u64,

    /// Mob codes fireworks are drawn from.
    #[serde(default = "default_firework_codes")]
    pub firework_codes: Vec<String>,
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.firework_delay_min_millis >= self.firework_delay_max_millis {
            return Err(ConfigError::Invalid {
                field: "session.firework_delay_min_millis",
                reason: format!(
                    "{} must be below firework_delay_max_millis {}",
                    self.firework_delay_min_millis, self.firework_delay_max_millis
                ),
            });
        }
        if self.firework_count > 0 && self.firework_codes.is_empty() {
            return Err(ConfigError::Invalid {
                field: "session.firework_codes",
                reason: "at least one code is required when fireworks are enabled".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            firework_count: default_firework_count(),
            firework_delay_min_millis: default_firework_delay_min_millis(),
            firework_delay_max_millis: default_firework_delay_max_millis(),
            replay_prompt_millis: default_replay_prompt_millis(),
            firework_codes: default_firework_codes(),
        }
    }
}

/// Encounter script and the grid character to mob code map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncounterConfig {
    /// Wave script text.
    #[serde(default = "default_encounter_script")]
    pub script: String,

    /// Grid character (a one-character key) to mob code.
    #[serde(default = "default_encounter_objects")]
    pub objects: BTreeMap<String, String>,
}

impl EncounterConfig {
    /// The object map keyed by grid character.
    pub fn object_map(&self) -> BTreeMap<char, String> {
        self.objects
            .iter()
            .filter_map(|(key, code)| single_char(key).map(|c| (c, code.clone())))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for key in self.objects.keys() {
            if single_char(key).is_none() {
                return Err(ConfigError::Invalid {
                    field: "encounter.objects",
                    reason: format!("key `{key}` must be exactly one character"),
                });
            }
        }
        Ok(())
    }
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            script: default_encounter_script(),
            objects: default_encounter_objects(),
        }
    }
}

/// Host loop bounds and pacing.
///
/// A value of 0 for `max_ticks` means unlimited; a value of 0 for
/// `tick_interval_ms` runs steps back to back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Maximum number of steps before the loop ends (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Real-time milliseconds between steps.
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// Random seed for fireworks and the scripted hit feed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            tick_interval_ms: 0,
            seed: default_seed(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_ticks_per_second() -> u32 {
    60
}

const fn default_hurt_buffer_millis() -> u64 {
    200
}

const fn default_regen_seconds() -> f64 {
    1.0
}

const fn default_max_total_seconds() -> f64 {
    3.0
}

const fn default_red() -> Color {
    Color::rgb(1.0, 0.15, 0.1)
}

const fn default_green() -> Color {
    Color::rgb(0.2, 1.0, 0.3)
}

const fn default_blue() -> Color {
    Color::rgb(0.15, 0.4, 1.0)
}

const fn default_swing_window_ticks() -> u64 {
    30
}

const fn default_max_serve_charge_ticks() -> u64 {
    60
}

const fn default_contact_radius() -> f32 {
    1.5
}

const fn default_hit_stop_seconds() -> f64 {
    0.5
}

const fn default_camera_shake() -> f32 {
    20.0
}

const fn default_firework_count() -> u32 {
    20
}

const fn default_firework_delay_min_millis() -> u64 {
    300
}

const fn default_firework_delay_max_millis() -> u64 {
    1200
}

const fn default_replay_prompt_millis() -> u64 {
    5000
}

fn default_firework_codes() -> Vec<String> {
    ["R", "G", "B", "R,G", "G,B", "R,B", "R,G,B"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_encounter_script() -> String {
    // Two waves: a delay line, then four grid rows each.
    [
        "1", "  1", "", " 2 3", "", "4", "1   2", "  4", "", "3 5 3",
    ]
    .join("\n")
}

fn default_encounter_objects() -> BTreeMap<String, String> {
    [
        ("1", "R"),
        ("2", "G"),
        ("3", "B"),
        ("4", "R,GB"),
        ("5", "rR,G,BB"),
    ]
    .into_iter()
    .map(|(key, code)| (key.to_owned(), code.to_owned()))
    .collect()
}

const fn default_max_ticks() -> u64 {
    3600
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}
