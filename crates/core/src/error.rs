use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConverterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{program} does not appear to be installed: {source}")]
    BinaryNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "command `{command}` failed (exit code: {code}): {stderr}",
        code = code.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("could not parse dcm2niix version from output: {0:?}")]
    VersionParse(String),
    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),
    #[error("old dcm2niix version: {installed} is older than {required}")]
    OldVersion { installed: String, required: String },
    #[error("invalid dcm2niix options (unbalanced quotes?): {0:?}")]
    InvalidOptions(String),
    #[error("failed to create output directory {path}: {source}", path = path.display())]
    OutputDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sidecar pattern: {0}")]
    SidecarPattern(#[from] glob::PatternError),
    #[error("failed to read config file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to parse config file: {0}")]
    ConfigParse(serde_json::Error),
}

pub type ConverterResult<T> = std::result::Result<T, ConverterError>;
