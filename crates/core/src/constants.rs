//! Constants used throughout the dcm2bids core crate.
//!
//! These are the built-in defaults for [`crate::ConverterConfig`] plus the fixed names the
//! runner relies on.

/// Name of the converter binary looked up on `PATH`.
pub const DCM2NIIX_BIN: &str = "dcm2niix";

/// Default options passed to dcm2niix: BIDS sidecars, anonymised sidecars, gzip output, and the
/// `<series>_<folder>_<protocol>_<time>` filename template.
pub const DEFAULT_DCM2NIIX_OPTIONS: &str = "-b y -ba y -z y -f '%3s_%f_%p_%t'";

/// Oldest dcm2niix release known to produce usable sidecars.
pub const MIN_DCM2NIIX_VERSION: &str = "v1.0.20181125";

/// Directory under the BIDS root holding raw converter output.
pub const TMP_DIR_NAME: &str = "tmp_dcm2bids";

/// Output directory name used when no participant is given.
pub const HELPER_DIR_NAME: &str = "helper";

/// Glob matched against the output directory to find sidecars.
pub const SIDECAR_PATTERN: &str = "*.json";

/// Where to get dcm2niix.
pub const DCM2NIIX_URL: &str = "https://github.com/rordenlab/dcm2niix";

/// Status returned by a successful run.
pub const EX_OK: i32 = 0;
