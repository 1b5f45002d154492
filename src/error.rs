//! Error types shared by the teardown command and its collaborators.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error returned by subsystem clients.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One unit of teardown work, in the order it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TeardownStep {
    StopLinuxKit,
    DestroyLinuxKit,
    StopVpnKit,
    DestroyVpnKit,
    UninstallCfdevd,
    RemoveAliases,
}

impl TeardownStep {
    /// Every step, in execution and priority order.
    pub const ALL: [TeardownStep; 6] = [
        TeardownStep::StopLinuxKit,
        TeardownStep::DestroyLinuxKit,
        TeardownStep::StopVpnKit,
        TeardownStep::DestroyVpnKit,
        TeardownStep::UninstallCfdevd,
        TeardownStep::RemoveAliases,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn action(self) -> &'static str {
        match self {
            TeardownStep::StopLinuxKit => "stop linuxkit",
            TeardownStep::DestroyLinuxKit => "destroy linuxkit",
            TeardownStep::StopVpnKit => "stop vpnkit",
            TeardownStep::DestroyVpnKit => "destroy vpnkit",
            TeardownStep::UninstallCfdevd => "uninstall cfdevd",
            TeardownStep::RemoveAliases => "remove IP aliases",
        }
    }
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// A failed teardown step together with the collaborator's error.
#[derive(Debug, Error)]
#[error("failed to {step}: {source}")]
pub struct StepError {
    pub step: TeardownStep,
    #[source]
    pub source: BoxError,
}

/// The single error reported by `cf dev stop`.
#[derive(Debug, Error)]
#[error("cf dev stop: {0}")]
pub struct StopError(#[from] pub StepError);

impl StopError {
    pub fn step(&self) -> TeardownStep {
        self.0.step
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HOME is not set; unable to determine the cfdev home directory")]
    NoHome,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
