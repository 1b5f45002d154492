use crate::commands::stop::Hypervisor;
use crate::error::BoxError;
use crate::process::{
    process_is_named, process_is_running, read_pid_file, remove_dir_if_exists, stop_pid_file,
};
use std::path::{Path, PathBuf};

const LINUXKIT_DIR: &str = "linuxkit";
const PID_FILE: &str = "hyperkit.pid";
const PROGRAM: &str = "hyperkit";

/// Hyperkit-backed VM whose state lives under `<state_dir>/linuxkit`.
pub struct LinuxKit {
    dir: PathBuf,
}

impl LinuxKit {
    pub fn new(state_dir: &Path) -> Self {
        LinuxKit {
            dir: state_dir.join(LINUXKIT_DIR),
        }
    }
}

impl Hypervisor for LinuxKit {
    fn stop(&self) -> Result<(), BoxError> {
        stop_pid_file(&self.dir.join(PID_FILE), "linuxkit", PROGRAM)
    }

    fn destroy(&self) -> Result<(), BoxError> {
        if let Some(pid) = read_pid_file(&self.dir.join(PID_FILE)) {
            if process_is_running(pid) && process_is_named(pid, PROGRAM) {
                return Err(format!("VM is still running (pid {})", pid).into());
            }
        }
        log::info!("Removing VM state {}...", self.dir.display());
        remove_dir_if_exists(&self.dir)
    }
}
