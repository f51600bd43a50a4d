// src/system/registry.rs

use std::process::{Command as StdCommand, Output, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Command '{command}' could not be executed: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command '{command}' exited with a non-zero error code: {stderr}")]
    NonZeroExitStatus { command: String, stderr: String },
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("Image '{image}' does not carry a '{label}' label.")]
    MissingVersion { image: String, label: String },
}

/// The registry/runtime operations the image resolution depends on.
pub trait ImageRegistry: std::fmt::Debug {
    /// Returns the concrete version currently available for `image`.
    fn get_version(&self, image: &str) -> Result<String, RegistryError>;

    /// Fetches the latest content of `image`.
    fn pull(&self, image: &str) -> Result<(), RegistryError>;
}

/// An [`ImageRegistry`] backed by the `docker` command line.
///
/// The version of an image is read from one of its labels.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    version_label: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            version_label: "version".to_string(),
        }
    }
}

impl DockerCli {
    fn run(&self, args: &[&str]) -> Result<String, RegistryError> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        log::debug!("Running '{}'", command_line);

        let Output { status, stdout, stderr } = StdCommand::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RegistryError::CommandFailed {
                command: command_line.clone(),
                source: e,
            })?;

        if !status.success() {
            return Err(RegistryError::NonZeroExitStatus {
                command: command_line,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        String::from_utf8(stdout).map_err(|e| RegistryError::InvalidUtf8Output {
            command: command_line,
            source: e,
        })
    }

    fn inspect_version(&self, image: &str) -> Result<String, RegistryError> {
        let format = format!("{{{{ index .Config.Labels \"{}\" }}}}", self.version_label);
        let output = self.run(&["image", "inspect", "--format", &format, image])?;
        let version = output.trim();
        if version.is_empty() || version == "<no value>" {
            return Err(RegistryError::MissingVersion {
                image: image.to_string(),
                label: self.version_label.clone(),
            });
        }
        Ok(version.to_string())
    }
}

impl ImageRegistry for DockerCli {
    fn get_version(&self, image: &str) -> Result<String, RegistryError> {
        match self.inspect_version(image) {
            Err(RegistryError::NonZeroExitStatus { .. }) => {
                // Not present locally yet.
                self.pull(image)?;
                self.inspect_version(image)
            }
            result => result,
        }
    }

    fn pull(&self, image: &str) -> Result<(), RegistryError> {
        log::info!("Pulling image '{}'", image);
        self.run(&["pull", image]).map(|_| ())
    }
}
