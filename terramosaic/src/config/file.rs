//! INI-backed configuration file.
//!
//! Settings live in `config.ini` under the platform config directory
//! (`~/.config/terramosaic/` on Linux). Every field is optional; unset
//! values fall back to [`AssemblerConfig`](super::AssemblerConfig)
//! defaults at build time.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

/// Errors from loading, saving or mutating the config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    #[error("failed to write config file: {0}")]
    Write(#[from] std::io::Error),

    #[error("invalid value '{value}' for key {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Path to the configuration file.
///
/// Falls back to the current directory when no platform config
/// directory can be determined.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("terramosaic")
        .join("config.ini")
}

/// Parsed configuration file contents.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub catalog: CatalogSection,
    pub mosaic: MosaicSection,
    pub storage: StorageSection,
    pub pipeline: PipelineSection,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Default)]
pub struct CatalogSection {
    pub url: Option<String>,
    pub collection: Option<String>,
    pub preview_asset: Option<String>,
}

/// `[mosaic]` section.
#[derive(Debug, Clone, Default)]
pub struct MosaicSection {
    pub grid_resolution: Option<u8>,
    pub acceptance_threshold: Option<f64>,
    pub saturation_threshold: Option<u8>,
    pub percentile_low: Option<f64>,
    pub percentile_high: Option<f64>,
    pub gamma: Option<f64>,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default)]
pub struct StorageSection {
    pub bucket: Option<String>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default)]
pub struct PipelineSection {
    pub working_dir: Option<PathBuf>,
    pub external_timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Load the configuration from [`config_file_path`].
    ///
    /// A missing file yields the default (all-unset) configuration.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load the configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        Ok(Self::from_ini(&ini))
    }

    /// Save the configuration to [`config_file_path`], creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save the configuration to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        Ok(())
    }

    fn from_ini(ini: &Ini) -> Self {
        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(str::to_string)
        };
        Self {
            catalog: CatalogSection {
                url: get("catalog", "url"),
                collection: get("catalog", "collection"),
                preview_asset: get("catalog", "preview_asset"),
            },
            mosaic: MosaicSection {
                grid_resolution: get("mosaic", "grid_resolution").and_then(|v| v.parse().ok()),
                acceptance_threshold: get("mosaic", "acceptance_threshold")
                    .and_then(|v| v.parse().ok()),
                saturation_threshold: get("mosaic", "saturation_threshold")
                    .and_then(|v| v.parse().ok()),
                percentile_low: get("mosaic", "percentile_low").and_then(|v| v.parse().ok()),
                percentile_high: get("mosaic", "percentile_high").and_then(|v| v.parse().ok()),
                gamma: get("mosaic", "gamma").and_then(|v| v.parse().ok()),
            },
            storage: StorageSection {
                bucket: get("storage", "bucket"),
            },
            pipeline: PipelineSection {
                working_dir: get("pipeline", "working_dir").map(PathBuf::from),
                external_timeout_secs: get("pipeline", "external_timeout_secs")
                    .and_then(|v| v.parse().ok()),
            },
        }
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        {
            let mut section = ini.with_section(Some("catalog"));
            if let Some(v) = &self.catalog.url {
                section.set("url", v.clone());
            }
            if let Some(v) = &self.catalog.collection {
                section.set("collection", v.clone());
            }
            if let Some(v) = &self.catalog.preview_asset {
                section.set("preview_asset", v.clone());
            }
        }
        {
            let mut section = ini.with_section(Some("mosaic"));
            if let Some(v) = self.mosaic.grid_resolution {
                section.set("grid_resolution", v.to_string());
            }
            if let Some(v) = self.mosaic.acceptance_threshold {
                section.set("acceptance_threshold", v.to_string());
            }
            if let Some(v) = self.mosaic.saturation_threshold {
                section.set("saturation_threshold", v.to_string());
            }
            if let Some(v) = self.mosaic.percentile_low {
                section.set("percentile_low", v.to_string());
            }
            if let Some(v) = self.mosaic.percentile_high {
                section.set("percentile_high", v.to_string());
            }
            if let Some(v) = self.mosaic.gamma {
                section.set("gamma", v.to_string());
            }
        }
        {
            let mut section = ini.with_section(Some("storage"));
            if let Some(v) = &self.storage.bucket {
                section.set("bucket", v.clone());
            }
        }
        {
            let mut section = ini.with_section(Some("pipeline"));
            if let Some(v) = &self.pipeline.working_dir {
                section.set("working_dir", v.display().to_string());
            }
            if let Some(v) = self.pipeline.external_timeout_secs {
                section.set("external_timeout_secs", v.to_string());
            }
        }
        ini
    }
}

/// Known configuration keys, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    CatalogUrl,
    CatalogCollection,
    CatalogPreviewAsset,
    MosaicGridResolution,
    MosaicAcceptanceThreshold,
    MosaicSaturationThreshold,
    MosaicPercentileLow,
    MosaicPercentileHigh,
    MosaicGamma,
    StorageBucket,
    PipelineWorkingDir,
    PipelineExternalTimeoutSecs,
}

impl ConfigKey {
    /// All keys in display order, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::CatalogUrl,
            ConfigKey::CatalogCollection,
            ConfigKey::CatalogPreviewAsset,
            ConfigKey::MosaicGridResolution,
            ConfigKey::MosaicAcceptanceThreshold,
            ConfigKey::MosaicSaturationThreshold,
            ConfigKey::MosaicPercentileLow,
            ConfigKey::MosaicPercentileHigh,
            ConfigKey::MosaicGamma,
            ConfigKey::StorageBucket,
            ConfigKey::PipelineWorkingDir,
            ConfigKey::PipelineExternalTimeoutSecs,
        ]
    }

    /// Full key name in `section.key` form.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::CatalogUrl => "catalog.url",
            ConfigKey::CatalogCollection => "catalog.collection",
            ConfigKey::CatalogPreviewAsset => "catalog.preview_asset",
            ConfigKey::MosaicGridResolution => "mosaic.grid_resolution",
            ConfigKey::MosaicAcceptanceThreshold => "mosaic.acceptance_threshold",
            ConfigKey::MosaicSaturationThreshold => "mosaic.saturation_threshold",
            ConfigKey::MosaicPercentileLow => "mosaic.percentile_low",
            ConfigKey::MosaicPercentileHigh => "mosaic.percentile_high",
            ConfigKey::MosaicGamma => "mosaic.gamma",
            ConfigKey::StorageBucket => "storage.bucket",
            ConfigKey::PipelineWorkingDir => "pipeline.working_dir",
            ConfigKey::PipelineExternalTimeoutSecs => "pipeline.external_timeout_secs",
        }
    }

    /// Section part of the key name.
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Key part of the key name.
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or("")
    }

    /// Read the current value as a display string. Unset values yield
    /// an empty string.
    pub fn get(&self, config: &ConfigFile) -> String {
        fn show<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(T::to_string).unwrap_or_default()
        }
        match self {
            ConfigKey::CatalogUrl => show(&config.catalog.url),
            ConfigKey::CatalogCollection => show(&config.catalog.collection),
            ConfigKey::CatalogPreviewAsset => show(&config.catalog.preview_asset),
            ConfigKey::MosaicGridResolution => show(&config.mosaic.grid_resolution),
            ConfigKey::MosaicAcceptanceThreshold => show(&config.mosaic.acceptance_threshold),
            ConfigKey::MosaicSaturationThreshold => show(&config.mosaic.saturation_threshold),
            ConfigKey::MosaicPercentileLow => show(&config.mosaic.percentile_low),
            ConfigKey::MosaicPercentileHigh => show(&config.mosaic.percentile_high),
            ConfigKey::MosaicGamma => show(&config.mosaic.gamma),
            ConfigKey::StorageBucket => show(&config.storage.bucket),
            ConfigKey::PipelineWorkingDir => config
                .pipeline
                .working_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            ConfigKey::PipelineExternalTimeoutSecs => {
                show(&config.pipeline.external_timeout_secs)
            }
        }
    }

    /// Parse and store a value for this key.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigFileError> {
        fn parse<T: FromStr>(key: &ConfigKey, value: &str) -> Result<T, ConfigFileError>
        where
            T::Err: std::fmt::Display,
        {
            value.parse().map_err(|e: T::Err| ConfigFileError::InvalidValue {
                key: key.name().to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            })
        }
        match self {
            ConfigKey::CatalogUrl => config.catalog.url = Some(value.to_string()),
            ConfigKey::CatalogCollection => config.catalog.collection = Some(value.to_string()),
            ConfigKey::CatalogPreviewAsset => {
                config.catalog.preview_asset = Some(value.to_string())
            }
            ConfigKey::MosaicGridResolution => {
                config.mosaic.grid_resolution = Some(parse(self, value)?)
            }
            ConfigKey::MosaicAcceptanceThreshold => {
                config.mosaic.acceptance_threshold = Some(parse(self, value)?)
            }
            ConfigKey::MosaicSaturationThreshold => {
                config.mosaic.saturation_threshold = Some(parse(self, value)?)
            }
            ConfigKey::MosaicPercentileLow => {
                config.mosaic.percentile_low = Some(parse(self, value)?)
            }
            ConfigKey::MosaicPercentileHigh => {
                config.mosaic.percentile_high = Some(parse(self, value)?)
            }
            ConfigKey::MosaicGamma => config.mosaic.gamma = Some(parse(self, value)?),
            ConfigKey::StorageBucket => config.storage.bucket = Some(value.to_string()),
            ConfigKey::PipelineWorkingDir => {
                config.pipeline.working_dir = Some(PathBuf::from(value))
            }
            ConfigKey::PipelineExternalTimeoutSecs => {
                config.pipeline.external_timeout_secs = Some(parse(self, value)?)
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .find(|key| key.name() == s)
            .copied()
            .ok_or(())
    }
}
