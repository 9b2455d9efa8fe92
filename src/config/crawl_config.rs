use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::crawl::SymlinkPolicy;
use crate::ext::PathExt;
use crate::tree::DEFAULT_COMPRESSION_LEVEL;

const CONFIG_FILE_NAME: &str = ".treecrawl.yaml";

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Settings read from `.treecrawl.yaml` in the root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub symlinks: SymlinkPolicy,
    pub path_keys: bool,
    pub compression_level: i32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            symlinks: SymlinkPolicy::default(),
            path_keys: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CrawlConfig {
    /// Reads the config file below `root`, falling back to defaults when
    /// there is none.
    pub async fn read(root: &Path) -> Result<Self, ConfigCreationError> {
        Self::from_path(get_config_file_path(root)).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, ConfigCreationError> {
        debug!("Opening config file: {}", path.display_best_effort());
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("No config file, using defaults");
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(error).context(ReadSnafu {
                    file_path: path.display_best_effort(),
                });
            }
        };
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.display_best_effort(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_symlinks(value: &Yaml<'_>) -> Result<SymlinkPolicy, ConfigCreationError> {
        match value {
            Yaml::Value(Scalar::String(policy)) => match &**policy {
                "error" => Ok(SymlinkPolicy::Error),
                "skip" => Ok(SymlinkPolicy::Skip),
                "as-file" => Ok(SymlinkPolicy::AsFile),
                other => InvalidValueSnafu {
                    key: "symlinks",
                    value: other,
                }
                .fail(),
            },
            other => InvalidValueSnafu {
                key: "symlinks",
                value: format!("{other:?}"),
            }
            .fail(),
        }
    }

    fn parse_path_keys(value: &Yaml<'_>) -> Result<bool, ConfigCreationError> {
        match value {
            Yaml::Value(Scalar::Boolean(flag)) => Ok(*flag),
            other => InvalidValueSnafu {
                key: "path_keys",
                value: format!("{other:?}"),
            }
            .fail(),
        }
    }

    fn parse_compression_level(value: &Yaml<'_>) -> Result<i32, ConfigCreationError> {
        match value {
            Yaml::Value(Scalar::Integer(level)) => {
                i32::try_from(*level).ok().context(InvalidValueSnafu {
                    key: "compression_level",
                    value: level.to_string(),
                })
            }
            other => InvalidValueSnafu {
                key: "compression_level",
                value: format!("{other:?}"),
            }
            .fail(),
        }
    }

    fn lookup<'a, 'input>(
        top_level: &'a LinkedHashMap<Yaml<'input>, Yaml<'input>>,
        key: &'static str,
    ) -> Option<&'a Yaml<'input>> {
        top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key))))
    }
}

impl TryFrom<&str> for CrawlConfig {
    type Error = ConfigCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        // An empty file configures nothing.
        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };
        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let mut config = Self::default();
        if let Some(value) = Self::lookup(top_level, "symlinks") {
            config.symlinks = Self::parse_symlinks(value)?;
        }
        if let Some(value) = Self::lookup(top_level, "path_keys") {
            config.path_keys = Self::parse_path_keys(value)?;
        }
        if let Some(value) = Self::lookup(top_level, "compression_level") {
            config.compression_level = Self::parse_compression_level(value)?;
        }

        for (key, _) in top_level {
            if let Yaml::Value(Scalar::String(name)) = key {
                if !matches!(&**name, "symlinks" | "path_keys" | "compression_level") {
                    debug!("Ignoring unknown config key: {name}");
                }
            }
        }

        Ok(config)
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigCreationError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file is not valid UTF-8: {}", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Invalid value for '{}': {}", key, value))]
    InvalidValue { key: &'static str, value: String },
}
