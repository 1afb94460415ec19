/// Layered scan settings
///
/// Precedence, lowest first: built-in defaults, TOML preset, `RGSCAN_*`
/// environment variables, command-line flags. Every value ends up in one of
/// the validated `parse_*` functions before a [`Config`] exists.
use crate::cli::ScanOptions;
use anyhow::{Context, Result};
use rgscan_scanner::config::{
    parse_clip_mode, parse_id3v2_version, parse_max_peak_level, parse_tag_mode,
    parse_target_loudness,
};
use rgscan_scanner::Config;
use serde::Deserialize;
use std::path::Path;

/// Values read from a preset file and the environment
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub album: Option<bool>,
    pub true_peak: Option<bool>,
    pub tag_mode: Option<String>,
    pub target_loudness: Option<f64>,
    pub clip_mode: Option<String>,
    pub max_peak_level: Option<f64>,
    pub tab_output: Option<bool>,
    pub lowercase: Option<bool>,
    pub strip: Option<bool>,
    pub id3v2_version: Option<u8>,
}

impl Settings {
    /// Load the optional preset, then overlay `RGSCAN_*` environment variables
    pub fn load(preset: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = preset {
            if !path.is_file() {
                anyhow::bail!("Preset file {} does not exist", path.display());
            }
            settings = settings.add_source(
                config::File::from(path).format(config::FileFormat::Toml),
            );
        }

        settings = settings.add_source(config::Environment::with_prefix("RGSCAN").try_parsing(true));

        settings
            .build()
            .and_then(config::Config::try_deserialize)
            .context("Failed to load settings")
    }

    /// Apply command-line flags on top of the loaded values
    pub fn merge(mut self, options: &ScanOptions) -> Self {
        // Switches can only turn features on
        if options.album {
            self.album = Some(true);
        }
        if options.true_peak {
            self.true_peak = Some(true);
        }
        if options.output {
            self.tab_output = Some(true);
        }
        if options.lowercase {
            self.lowercase = Some(true);
        }
        if options.strip {
            self.strip = Some(true);
        }

        self.tag_mode = options.tag_mode.clone().or(self.tag_mode);
        self.clip_mode = options.clip_mode.clone().or(self.clip_mode);
        self
    }

    /// Build the scan configuration, validating numeric flags given as text
    pub fn into_config(self, options: &ScanOptions) -> Result<Config> {
        let target_loudness = match (&options.loudness, self.target_loudness) {
            (Some(text), _) => Some(parse_target_loudness(text)?),
            (None, Some(value)) => Some(parse_target_loudness(&value.to_string())?),
            (None, None) => None,
        };
        let max_peak_level = match (&options.max_peak, self.max_peak_level) {
            (Some(text), _) => Some(parse_max_peak_level(text)?),
            (None, Some(value)) => Some(parse_max_peak_level(&value.to_string())?),
            (None, None) => None,
        };
        let id3v2_version = match (&options.id3v2_version, self.id3v2_version) {
            (Some(text), _) => Some(parse_id3v2_version(text)?),
            (None, Some(value)) => Some(parse_id3v2_version(&value.to_string())?),
            (None, None) => None,
        };

        let mut builder = Config::builder()
            .album(self.album.unwrap_or(false))
            .true_peak(self.true_peak.unwrap_or(false))
            .tab_output(self.tab_output.unwrap_or(false))
            .lowercase(self.lowercase.unwrap_or(false))
            .strip(self.strip.unwrap_or(false));

        if let Some(mode) = self.tag_mode.as_deref() {
            builder = builder.tag_mode(parse_tag_mode(mode)?);
        }
        if let Some(mode) = self.clip_mode.as_deref() {
            builder = builder.clip_mode(parse_clip_mode(mode)?);
        }
        if let Some(lufs) = target_loudness {
            builder = builder.target_loudness(lufs)?;
        }
        if let Some(db) = max_peak_level {
            builder = builder.max_peak_level(db)?;
        }
        if let Some(version) = id3v2_version {
            builder = builder.id3v2_version(version);
        }

        Ok(builder.build())
    }
}

/// Resolve the full configuration for a run
pub fn resolve(options: &ScanOptions) -> Result<Config> {
    Settings::load(options.preset.as_deref())?
        .merge(options)
        .into_config(options)
}
