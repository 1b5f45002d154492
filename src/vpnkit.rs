use crate::commands::stop::Proxy;
use crate::error::BoxError;
use crate::process::{remove_dir_if_exists, stop_pid_file};
use std::path::{Path, PathBuf};

const VPNKIT_DIR: &str = "vpnkit";
const PID_FILE: &str = "vpnkit.pid";
const PROGRAM: &str = "vpnkit";

/// vpnkit network proxy; sockets and pid file live under `<state_dir>/vpnkit`.
pub struct VpnKit {
    dir: PathBuf,
}

impl VpnKit {
    pub fn new(state_dir: &Path) -> Self {
        VpnKit {
            dir: state_dir.join(VPNKIT_DIR),
        }
    }
}

impl Proxy for VpnKit {
    fn stop(&self) -> Result<(), BoxError> {
        stop_pid_file(&self.dir.join(PID_FILE), "vpnkit", PROGRAM)
    }

    fn destroy(&self) -> Result<(), BoxError> {
        log::info!("Removing vpnkit state {}...", self.dir.display());
        remove_dir_if_exists(&self.dir)
    }
}
