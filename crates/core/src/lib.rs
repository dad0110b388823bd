//! # dcm2bids core
//!
//! Runs the external `dcm2niix` converter for a BIDS dataset:
//! - resolves `<bids_dir>/tmp_dcm2bids/<participant prefix | helper>` as the output directory
//! - skips, cleans or creates that directory depending on previous output and `force`
//! - converts each DICOM directory in turn and collects the JSON sidecars produced
//! - checks the installed converter against a minimum version
//!
//! **No CLI concerns**: argument parsing and logging setup belong in the `dcm2bids-run` binary.

pub mod command;
pub mod config;
pub mod constants;
pub mod dcm2niix;
mod error;
pub mod sidecar;
pub mod version;

pub use bids_types::Participant;
pub use command::{CommandRunner, SystemCommandRunner};
pub use config::{load_dcm2niix_options, ConverterConfig};
pub use dcm2niix::{dcm2niix_version, Dcm2niix};
pub use error::{ConverterError, ConverterResult};
pub use version::LooseVersion;
