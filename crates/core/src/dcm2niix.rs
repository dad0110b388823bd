//! dcm2niix execution.
//!
//! [`Dcm2niix`] converts one participant's DICOM directories into
//! `<bids_dir>/tmp_dcm2bids/<prefix>/` and remembers the JSON sidecars found there afterwards.
//!
//! A run is skipped when the output directory already holds files, unless `force` is set, in
//! which case the directory is wiped and the conversion repeated. The installed converter is
//! checked against [`ConverterConfig::minimum_version`] before every batch.

use crate::command::{command_line, split_options, CommandRunner, SystemCommandRunner};
use crate::constants::{DCM2NIIX_URL, EX_OK};
use crate::sidecar::{collect_sidecars, has_previous_output};
use crate::version::{parse_version_output, LooseVersion};
use crate::{ConverterConfig, ConverterError, ConverterResult};
use bids_types::Participant;
use std::fs;
use std::path::{Path, PathBuf};

/// Runs dcm2niix over a list of DICOM directories.
#[derive(Debug)]
pub struct Dcm2niix<'a, R = SystemCommandRunner> {
    dicom_dirs: Vec<PathBuf>,
    bids_dir: PathBuf,
    participant: Option<&'a Participant>,
    options: String,
    config: &'a ConverterConfig,
    runner: R,
    sidecar_files: Vec<PathBuf>,
}

impl<'a> Dcm2niix<'a> {
    /// Creates a runner using the configured default options and the system process runner.
    ///
    /// # Arguments
    ///
    /// * `dicom_dirs` - Directories to convert, in order
    /// * `bids_dir` - Root of the BIDS dataset
    /// * `participant` - Participant whose prefix names the output directory; the helper
    ///   directory is used when `None`
    /// * `config` - Converter configuration resolved at startup
    pub fn new(
        dicom_dirs: Vec<PathBuf>,
        bids_dir: impl Into<PathBuf>,
        participant: Option<&'a Participant>,
        config: &'a ConverterConfig,
    ) -> Self {
        Self {
            dicom_dirs,
            bids_dir: bids_dir.into(),
            participant,
            options: config.default_options().to_string(),
            config,
            runner: SystemCommandRunner,
            sidecar_files: Vec::new(),
        }
    }
}

impl<'a, R: CommandRunner> Dcm2niix<'a, R> {
    /// Replaces the options passed to dcm2niix.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Replaces the process runner.
    pub fn with_runner<R2: CommandRunner>(self, runner: R2) -> Dcm2niix<'a, R2> {
        Dcm2niix {
            dicom_dirs: self.dicom_dirs,
            bids_dir: self.bids_dir,
            participant: self.participant,
            options: self.options,
            config: self.config,
            runner,
            sidecar_files: self.sidecar_files,
        }
    }

    /// Sidecars found in the output directory by the last [`Dcm2niix::run`].
    pub fn sidecar_files(&self) -> &[PathBuf] {
        &self.sidecar_files
    }

    /// Directory receiving all dcm2niix output for this runner.
    ///
    /// `<bids_dir>/<tmp_dir_name>/<participant prefix | helper_dir_name>`
    pub fn output_dir(&self) -> PathBuf {
        let leaf = match self.participant {
            Some(participant) => participant.prefix(),
            None => self.config.helper_dir_name().to_string(),
        };
        self.bids_dir.join(self.config.tmp_dir_name()).join(leaf)
    }

    /// Runs dcm2niix if necessary and records the sidecars in the output directory.
    ///
    /// Existing output is kept and conversion skipped unless `force` is set, in which case
    /// the output directory is removed and the conversion redone. Sidecars are collected in
    /// every case, so a skipped run still reports the files of the previous one.
    ///
    /// # Returns
    ///
    /// [`EX_OK`] on success.
    ///
    /// # Errors
    ///
    /// Returns the first error from the version check, the output directory creation or any
    /// dcm2niix invocation. Remaining directories are not converted after a failure.
    pub fn run(&mut self, force: bool) -> ConverterResult<i32> {
        let output_dir = self.output_dir();
        let old_output = has_previous_output(&output_dir);

        if old_output && force {
            tracing::warn!("Previous dcm2niix directory output found:");
            tracing::warn!("{}", output_dir.display());
            tracing::warn!("'force' argument is set to True");
            tracing::warn!("Cleaning the previous directory and running dcm2niix");

            if let Err(e) = fs::remove_dir_all(&output_dir) {
                tracing::debug!("ignoring cleanup error for {}: {}", output_dir.display(), e);
            }
            create_output_dir(&output_dir)?;
            self.execute(&output_dir)?;
        } else if old_output {
            tracing::warn!("Previous dcm2niix directory output found:");
            tracing::warn!("{}", output_dir.display());
            tracing::warn!("Use --force-dcm2niix to rerun dcm2niix");
        } else {
            create_output_dir(&output_dir)?;
            self.execute(&output_dir)?;
        }

        self.sidecar_files = collect_sidecars(&output_dir)?;

        Ok(EX_OK)
    }

    fn execute(&self, output_dir: &Path) -> ConverterResult<()> {
        self.version()?;

        let options = split_options(&self.options)?;
        for dicom_dir in &self.dicom_dirs {
            let mut args = options.clone();
            args.push("-o".into());
            args.push(output_dir.as_os_str().to_owned());
            args.push(dicom_dir.as_os_str().to_owned());

            tracing::debug!("{}", command_line(self.config.binary_name(), &args));
            let output = self.runner.run(self.config.binary_name(), &args)?;
            tracing::info!("\n{}", output);
        }

        Ok(())
    }

    /// Version of the installed dcm2niix, checked against the configured minimum.
    pub fn version(&self) -> ConverterResult<String> {
        dcm2niix_version(&self.runner, self.config)
    }
}

fn create_output_dir(path: &Path) -> ConverterResult<()> {
    fs::create_dir_all(path).map_err(|source| ConverterError::OutputDirCreation {
        path: path.to_path_buf(),
        source,
    })
}

/// Probes the installed dcm2niix and returns its version string.
///
/// dcm2niix is run without arguments and the version is read from its banner.
///
/// # Errors
///
/// - the binary cannot be run (logged with an installation pointer)
/// - the banner carries no version (`VersionParse`)
/// - the version is below `config.minimum_version()` (`OldVersion`, logged)
pub fn dcm2niix_version(
    runner: &impl CommandRunner,
    config: &ConverterConfig,
) -> ConverterResult<String> {
    let output = match runner.run(config.binary_name(), &[]) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!("dcm2niix does not appear to be installed");
            tracing::error!("See: {}", DCM2NIIX_URL);
            return Err(e);
        }
    };

    let version = parse_version_output(&output)?;
    let installed = LooseVersion::parse(&version)?;
    let required = config.minimum_version();

    if installed < *required {
        tracing::error!("Your version of dcm2niix is older than {}", required);
        tracing::error!("See: {}", DCM2NIIX_URL);
        return Err(ConverterError::OldVersion {
            installed: version,
            required: required.to_string(),
        });
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::ffi::OsString;
    use tempfile::TempDir;

    const BANNER: &str =
        "Chris Rorden's dcm2niiX version v1.0.20190902  GCC7.4.0 (64-bit Linux)\nusage: ...\n";

    /// Records every invocation and writes one sidecar per converted directory.
    struct FakeRunner {
        banner: String,
        fail_on: Option<OsString>,
        calls: RefCell<Vec<Vec<OsString>>>,
    }

    impl FakeRunner {
        fn new() -> Self {
            Self {
                banner: BANNER.into(),
                fail_on: None,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn conversions(&self) -> Vec<Vec<OsString>> {
            self.calls
                .borrow()
                .iter()
                .filter(|args| !args.is_empty())
                .cloned()
                .collect()
        }

        fn probes(&self) -> usize {
            self.calls.borrow().iter().filter(|a| a.is_empty()).count()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[OsString]) -> ConverterResult<String> {
            assert_eq!(program, "dcm2niix");
            self.calls.borrow_mut().push(args.to_vec());

            if args.is_empty() {
                return Ok(self.banner.clone());
            }

            let n = args.len();
            let (output_dir, dicom_dir) = (&args[n - 2], &args[n - 1]);
            if self.fail_on.as_ref() == Some(dicom_dir) {
                return Err(ConverterError::CommandFailed {
                    command: command_line(program, args),
                    code: Some(1),
                    stderr: "conversion failed".into(),
                });
            }

            let stem = Path::new(dicom_dir)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned();
            fs::write(Path::new(output_dir).join(format!("{stem}.json")), "{}").unwrap();
            fs::write(Path::new(output_dir).join(format!("{stem}.nii.gz")), "").unwrap();
            Ok(format!("Convert 1 DICOM as {stem}\n"))
        }
    }

    fn dicom_dirs(root: &Path) -> Vec<PathBuf> {
        vec![root.join("dicom").join("a"), root.join("dicom").join("b")]
    }

    #[test]
    fn test_output_dir_helper() {
        let config = ConverterConfig::default();
        let runner = Dcm2niix::new(vec![], "/data/bids", None, &config);
        assert_eq!(
            runner.output_dir(),
            PathBuf::from("/data/bids/tmp_dcm2bids/helper")
        );
        assert_eq!(runner.output_dir(), runner.output_dir());
    }

    #[test]
    fn test_output_dir_participant() {
        let config = ConverterConfig::default();
        let participant = Participant::new("01", Some("pre")).unwrap();
        let runner = Dcm2niix::new(vec![], "/data/bids", Some(&participant), &config);
        assert_eq!(
            runner.output_dir(),
            PathBuf::from("/data/bids/tmp_dcm2bids/sub-01_ses-pre")
        );
    }

    #[test]
    fn test_output_dir_has_no_side_effects() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let runner = Dcm2niix::new(vec![], temp.path(), None, &config);
        let _ = runner.output_dir();
        assert!(!temp.path().join("tmp_dcm2bids").exists());
    }

    #[test]
    fn test_run_fresh_converts_each_dir_in_order() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let mut runner =
            Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config).with_runner(&fake);
        let output_dir = runner.output_dir();

        assert_eq!(runner.run(false).unwrap(), EX_OK);

        assert!(output_dir.is_dir());
        let conversions = fake.conversions();
        assert_eq!(conversions.len(), 2);
        let expected_first: Vec<OsString> =
            ["-b", "y", "-ba", "y", "-z", "y", "-f", "%3s_%f_%p_%t", "-o"]
                .into_iter()
                .map(OsString::from)
                .chain([
                    output_dir.clone().into_os_string(),
                    temp.path().join("dicom").join("a").into_os_string(),
                ])
                .collect();
        assert_eq!(conversions[0], expected_first);
        assert!(Path::new(conversions[1].last().unwrap()).ends_with("dicom/b"));

        assert_eq!(
            runner.sidecar_files(),
            &[output_dir.join("a.json"), output_dir.join("b.json")]
        );
    }

    #[test]
    fn test_run_existing_empty_dir_is_fresh() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let mut runner =
            Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config).with_runner(&fake);
        fs::create_dir_all(runner.output_dir()).unwrap();

        runner.run(false).unwrap();
        assert_eq!(fake.conversions().len(), 2);
    }

    #[test]
    fn test_run_skips_previous_output_without_force() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let mut runner =
            Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config).with_runner(&fake);
        let output_dir = runner.output_dir();
        fs::create_dir_all(&output_dir).unwrap();
        fs::write(output_dir.join("old.json"), "{\"old\": true}").unwrap();
        fs::write(output_dir.join("old.nii.gz"), "data").unwrap();

        assert_eq!(runner.run(false).unwrap(), EX_OK);

        assert!(fake.calls.borrow().is_empty());
        assert_eq!(
            fs::read_to_string(output_dir.join("old.json")).unwrap(),
            "{\"old\": true}"
        );
        assert!(output_dir.join("old.nii.gz").exists());
        assert_eq!(runner.sidecar_files(), &[output_dir.join("old.json")]);
    }

    #[test]
    fn test_run_force_cleans_and_reruns() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let mut runner =
            Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config).with_runner(&fake);
        let output_dir = runner.output_dir();
        fs::create_dir_all(output_dir.join("nested")).unwrap();
        fs::write(output_dir.join("old.json"), "{}").unwrap();

        assert_eq!(runner.run(true).unwrap(), EX_OK);

        assert!(!output_dir.join("old.json").exists());
        assert!(!output_dir.join("nested").exists());
        assert_eq!(fake.conversions().len(), 2);
        assert_eq!(
            runner.sidecar_files(),
            &[output_dir.join("a.json"), output_dir.join("b.json")]
        );
    }

    #[test]
    fn test_run_twice_skips_second_time() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let mut runner =
            Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config).with_runner(&fake);

        runner.run(false).unwrap();
        runner.run(false).unwrap();

        assert_eq!(fake.conversions().len(), 2);
        assert_eq!(fake.probes(), 1);
        assert_eq!(runner.sidecar_files().len(), 2);
    }

    #[test]
    fn test_old_version_prevents_conversion() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let fake = FakeRunner {
            banner: "Chris Rorden's dcm2niiX version v1.0.20170130 GCC5.4.0\n".into(),
            ..FakeRunner::new()
        };
        let mut runner =
            Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config).with_runner(&fake);

        let err = runner.run(false).unwrap_err();
        match err {
            ConverterError::OldVersion {
                installed,
                required,
            } => {
                assert_eq!(installed, "v1.0.20170130");
                assert_eq!(required, "v1.0.20181125");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fake.conversions().is_empty());
        assert!(runner.sidecar_files().is_empty());
    }

    #[test]
    fn test_unparseable_banner_is_error() {
        let config = ConverterConfig::default();
        let fake = FakeRunner {
            banner: "dcm2niiX\n".into(),
            ..FakeRunner::new()
        };
        assert!(matches!(
            dcm2niix_version(&fake, &config),
            Err(ConverterError::VersionParse(_))
        ));
    }

    #[test]
    fn test_version_returns_installed_version() {
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let runner = Dcm2niix::new(vec![], "/data", None, &config).with_runner(&fake);
        assert_eq!(runner.version().unwrap(), "v1.0.20190902");
    }

    #[test]
    fn test_missing_binary_propagates() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default()
            .with_binary_name("dcm2bids-no-such-binary-for-tests".into())
            .unwrap();
        let mut runner = Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config);

        assert!(matches!(
            runner.run(false),
            Err(ConverterError::BinaryNotFound { .. })
        ));
    }

    #[test]
    fn test_failure_aborts_remaining_dirs() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let dirs = dicom_dirs(temp.path());
        let fake = FakeRunner {
            fail_on: Some(dirs[0].clone().into_os_string()),
            ..FakeRunner::new()
        };
        let mut runner = Dcm2niix::new(dirs, temp.path(), None, &config).with_runner(&fake);

        assert!(matches!(
            runner.run(false),
            Err(ConverterError::CommandFailed { code: Some(1), .. })
        ));
        assert_eq!(fake.conversions().len(), 1);
        assert!(runner.sidecar_files().is_empty());
    }

    #[test]
    fn test_custom_options_and_invalid_options() {
        let temp = TempDir::new().unwrap();
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let mut runner = Dcm2niix::new(dicom_dirs(temp.path()), temp.path(), None, &config)
            .with_options("-z n")
            .with_runner(&fake);
        runner.run(false).unwrap();
        assert_eq!(
            fake.conversions()[0][..3].to_vec(),
            vec![OsString::from("-z"), OsString::from("n"), OsString::from("-o")]
        );

        let other = TempDir::new().unwrap();
        let mut runner = Dcm2niix::new(dicom_dirs(other.path()), other.path(), None, &config)
            .with_options("-f '%p")
            .with_runner(&fake);
        assert!(matches!(
            runner.run(false),
            Err(ConverterError::InvalidOptions(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_passes_non_utf8_paths_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let bids_dir = temp.path().join(OsStr::from_bytes(b"bids-\xff"));
        let dicom_dir = temp.path().join(OsStr::from_bytes(b"dicom-\xfe"));
        let config = ConverterConfig::default();
        let fake = FakeRunner::new();
        let mut runner = Dcm2niix::new(vec![dicom_dir.clone()], &bids_dir, None, &config)
            .with_runner(&fake);
        let output_dir = runner.output_dir();

        runner.run(false).unwrap();

        let conversions = fake.conversions();
        let args = &conversions[0];
        let n = args.len();
        assert_eq!(args[n - 2], output_dir.clone().into_os_string());
        assert_eq!(args[n - 1], dicom_dir.into_os_string());

        let stem = OsStr::from_bytes(b"dicom-\xfe").to_string_lossy().into_owned();
        assert_eq!(
            runner.sidecar_files(),
            &[output_dir.join(format!("{stem}.json"))]
        );
    }
}
