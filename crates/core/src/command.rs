//! External process execution.
//!
//! The converter is only ever reached through [`CommandRunner`], so tests can substitute a
//! recording fake for the real binary.

use crate::{ConverterError, ConverterResult};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::process::Command;

/// Runs a program to completion and returns its combined output.
pub trait CommandRunner {
    /// Runs `program` with `args`, blocking until it exits.
    ///
    /// Arguments are passed through unchanged, so paths need not be valid UTF-8.
    ///
    /// # Errors
    ///
    /// Implementations return `BinaryNotFound` when the program cannot be located,
    /// `Spawn` for other launch failures and `CommandFailed` for a non-zero exit.
    fn run(&self, program: &str, args: &[OsString]) -> ConverterResult<String>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[OsString]) -> ConverterResult<String> {
        (**self).run(program, args)
    }
}

/// [`CommandRunner`] backed by [`std::process::Command`].
///
/// On success the returned text is stdout followed by stderr (when the latter is not empty).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> ConverterResult<String> {
        tracing::debug!("running: {}", command_line(program, args));

        let output = Command::new(program).args(args).output().map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConverterError::BinaryNotFound {
                    program: program.to_string(),
                    source,
                }
            } else {
                ConverterError::Spawn {
                    program: program.to_string(),
                    source,
                }
            }
        })?;

        if !output.status.success() {
            return Err(ConverterError::CommandFailed {
                command: command_line(program, args),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        Ok(combined)
    }
}

/// Renders a command line for logs and error messages, quoting arguments that need it.
///
/// Non-UTF-8 arguments are shown lossily; the rendering is never executed.
pub fn command_line(program: &str, args: &[OsString]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
        .map(|part| match shlex::try_quote(&part) {
            Ok(quoted) => quoted.into_owned(),
            Err(_) => part,
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Splits an options string using POSIX shell quoting rules.
///
/// # Errors
///
/// Returns `ConverterError::InvalidOptions` for unbalanced quotes or trailing escapes.
pub fn split_options(options: &str) -> ConverterResult<Vec<OsString>> {
    shlex::split(options)
        .map(|args| args.into_iter().map(OsString::from).collect())
        .ok_or_else(|| ConverterError::InvalidOptions(options.to_string()))
}
