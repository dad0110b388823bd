//! Converter configuration.
//!
//! Defaults are resolved once at process startup (built-ins, then an optional dcm2bids JSON
//! config file, then command-line overrides) and passed into [`crate::Dcm2niix`], so the runner
//! never reads environment variables or files on its own.

use crate::constants::{
    DCM2NIIX_BIN, DEFAULT_DCM2NIIX_OPTIONS, HELPER_DIR_NAME, MIN_DCM2NIIX_VERSION, TMP_DIR_NAME,
};
use crate::version::LooseVersion;
use crate::{ConverterError, ConverterResult};
use std::path::Path;

/// Converter configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ConverterConfig {
    binary_name: String,
    default_options: String,
    minimum_version: LooseVersion,
    tmp_dir_name: String,
    helper_dir_name: String,
}

impl ConverterConfig {
    /// Create a new `ConverterConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ConverterError::InvalidInput` if the binary name or either directory name is
    /// blank, or if a directory name is not a single path component.
    pub fn new(
        binary_name: String,
        default_options: String,
        minimum_version: LooseVersion,
        tmp_dir_name: String,
        helper_dir_name: String,
    ) -> ConverterResult<Self> {
        if binary_name.trim().is_empty() {
            return Err(ConverterError::InvalidInput(
                "binary_name cannot be empty".into(),
            ));
        }
        validate_dir_name("tmp_dir_name", &tmp_dir_name)?;
        validate_dir_name("helper_dir_name", &helper_dir_name)?;

        Ok(Self {
            binary_name,
            default_options,
            minimum_version,
            tmp_dir_name,
            helper_dir_name,
        })
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn default_options(&self) -> &str {
        &self.default_options
    }

    pub fn minimum_version(&self) -> &LooseVersion {
        &self.minimum_version
    }

    pub fn tmp_dir_name(&self) -> &str {
        &self.tmp_dir_name
    }

    pub fn helper_dir_name(&self) -> &str {
        &self.helper_dir_name
    }

    /// Returns a copy using `binary_name` instead of the configured binary.
    pub fn with_binary_name(self, binary_name: String) -> ConverterResult<Self> {
        Self::new(
            binary_name,
            self.default_options,
            self.minimum_version,
            self.tmp_dir_name,
            self.helper_dir_name,
        )
    }

    /// Returns a copy using `options` as the default dcm2niix options.
    pub fn with_default_options(mut self, options: String) -> Self {
        self.default_options = options;
        self
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary_name: DCM2NIIX_BIN.into(),
            default_options: DEFAULT_DCM2NIIX_OPTIONS.into(),
            minimum_version: LooseVersion::parse(MIN_DCM2NIIX_VERSION)
                .expect("MIN_DCM2NIIX_VERSION is a valid version"),
            tmp_dir_name: TMP_DIR_NAME.into(),
            helper_dir_name: HELPER_DIR_NAME.into(),
        }
    }
}

fn validate_dir_name(field: &str, value: &str) -> ConverterResult<()> {
    if value.trim().is_empty() {
        return Err(ConverterError::InvalidInput(format!(
            "{field} cannot be empty"
        )));
    }

    let mut components = Path::new(value).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    );
    if !single_normal {
        return Err(ConverterError::InvalidInput(format!(
            "{field} must be a single directory name: {value:?}"
        )));
    }

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct BidsConfigFile {
    #[serde(rename = "dcm2niixOptions", default)]
    dcm2niix_options: Option<String>,
}

/// Reads the `dcm2niixOptions` key from a dcm2bids JSON configuration file.
///
/// Other keys (descriptions, search method, ...) are ignored here.
pub fn load_dcm2niix_options(config_file: &Path) -> ConverterResult<Option<String>> {
    let contents = std::fs::read_to_string(config_file).map_err(ConverterError::ConfigRead)?;
    let parsed: BidsConfigFile =
        serde_json::from_str(&contents).map_err(ConverterError::ConfigParse)?;
    Ok(parsed.dcm2niix_options)
}
