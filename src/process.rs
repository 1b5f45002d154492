use crate::error::BoxError;
use std::fs;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const STOP_POLL_ATTEMPTS: u32 = 20;
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Run an external command with inherited stdio. Fails on non-zero exit.
pub fn run_cmd(program: &str, args: &[&str]) -> Result<(), BoxError> {
    log::debug!("Running: {} {}", program, args.join(" "));
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        return Err(format!("{} exited with {}", program, status).into());
    }
    Ok(())
}

/// Run an external command and capture stdout.
pub fn run_cmd_output(program: &str, args: &[&str]) -> Result<String, BoxError> {
    log::debug!("Running: {} {}", program, args.join(" "));
    let output = Command::new(program).args(args).output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} exited with {}: {}", program, output.status, stderr.trim()).into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

pub fn read_pid_file(path: &Path) -> Option<u32> {
    let contents = fs::read_to_string(path).ok()?;
    contents.trim().parse::<u32>().ok()
}

pub fn process_is_running(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Whether the command line of `pid` mentions `program`.
pub fn process_is_named(pid: u32, program: &str) -> bool {
    let output = Command::new("ps")
        .args(["-p", &pid.to_string(), "-o", "command="])
        .output();
    let Ok(output) = output else {
        return false;
    };
    if !output.status.success() {
        return false;
    }

    let cmd = String::from_utf8_lossy(&output.stdout);
    cmd.contains(program)
}

/// Stop the `program` process recorded in `pid_path`. Already-stopped is success.
pub fn stop_pid_file(pid_path: &Path, name: &str, program: &str) -> Result<(), BoxError> {
    if !pid_path.exists() {
        log::debug!("{} has no pid file at {}", name, pid_path.display());
        return Ok(());
    }

    let pid = match read_pid_file(pid_path) {
        Some(pid) => pid,
        None => {
            log::warn!("Ignoring unreadable {} pid file {}", name, pid_path.display());
            remove_file_if_exists(pid_path)?;
            return Ok(());
        }
    };

    if !process_is_running(pid) {
        log::debug!("{} (pid {}) is not running", name, pid);
        remove_file_if_exists(pid_path)?;
        return Ok(());
    }
    if !process_is_named(pid, program) {
        log::warn!(
            "Refusing to stop pid {} from {} pid file because it is not a {} process",
            pid,
            name,
            program
        );
        remove_file_if_exists(pid_path)?;
        return Ok(());
    }

    let pid_str = pid.to_string();
    log::info!("Stopping {} (pid {})...", name, pid);
    let signalled = Command::new("kill")
        .arg(&pid_str)
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !signalled && process_is_running(pid) {
        return Err(format!("failed to signal {} process {}", name, pid).into());
    }

    for _ in 0..STOP_POLL_ATTEMPTS {
        if !process_is_running(pid) {
            remove_file_if_exists(pid_path)?;
            log::info!("{} stopped", name);
            return Ok(());
        }
        thread::sleep(STOP_POLL_INTERVAL);
    }

    log::warn!("{} (pid {}) ignored SIGTERM, sending SIGKILL", name, pid);
    let forced = Command::new("kill")
        .args(["-9", &pid_str])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    thread::sleep(STOP_POLL_INTERVAL);
    if !forced || process_is_running(pid) {
        return Err(format!("{} process {} did not terminate", name, pid).into());
    }

    remove_file_if_exists(pid_path)?;
    log::info!("{} stopped", name);
    Ok(())
}

pub fn remove_file_if_exists(path: &Path) -> Result<(), BoxError> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => {
            Err(format!("failed to remove {}: {}", path.display(), err).into())
        }
        _ => Ok(()),
    }
}

pub fn remove_dir_if_exists(path: &Path) -> Result<(), BoxError> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => {
            Err(format!("failed to remove {}: {}", path.display(), err).into())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Instant;

    /// Spawn `sleep 60`; a waiter thread reaps it and reports when it exits.
    fn spawn_sleep() -> (u32, mpsc::Receiver<()>) {
        let mut child = Command::new("sleep").arg("60").spawn().unwrap();
        let pid = child.id();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = child.wait();
            let _ = tx.send(());
        });
        (pid, rx)
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cfdev-process-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn read_pid_file_trims_and_rejects_garbage() {
        let dir = temp_dir();
        let path = dir.join("a.pid");
        fs::write(&path, " 4242\n").unwrap();
        assert_eq!(read_pid_file(&path), Some(4242));
        fs::write(&path, "not-a-pid").unwrap();
        assert_eq!(read_pid_file(&path), None);
        assert_eq!(read_pid_file(&dir.join("missing.pid")), None);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stop_pid_file_without_pid_file_is_ok() {
        let dir = temp_dir();
        assert!(stop_pid_file(&dir.join("missing.pid"), "vm", "hyperkit").is_ok());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stop_pid_file_cleans_up_garbage_pid_file() {
        let dir = temp_dir();
        let path = dir.join("vm.pid");
        fs::write(&path, "garbage").unwrap();
        assert!(stop_pid_file(&path, "vm", "hyperkit").is_ok());
        assert!(!path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn remove_helpers_tolerate_missing_paths() {
        let dir = temp_dir();
        assert!(remove_file_if_exists(&dir.join("nope")).is_ok());
        assert!(remove_dir_if_exists(&dir.join("nope")).is_ok());
        assert!(remove_dir_if_exists(&dir).is_ok());
        assert!(!dir.exists());
    }

    #[test]
    fn stop_pid_file_leaves_unrelated_process_alone() {
        let dir = temp_dir();
        let path = dir.join("hyperkit.pid");
        let (pid, exited) = spawn_sleep();
        fs::write(&path, format!("{pid}\n")).unwrap();

        assert!(stop_pid_file(&path, "linuxkit", "hyperkit").is_ok());
        assert!(!path.exists());
        assert!(exited.recv_timeout(Duration::from_millis(500)).is_err());
        assert!(process_is_running(pid));

        let _ = Command::new("kill").args(["-9", &pid.to_string()]).status();
        exited.recv_timeout(Duration::from_secs(5)).unwrap();
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stop_pid_file_terminates_matching_process() {
        let dir = temp_dir();
        let path = dir.join("sleep.pid");
        let (pid, exited) = spawn_sleep();
        fs::write(&path, format!("{pid}\n")).unwrap();

        let started = Instant::now();
        stop_pid_file(&path, "sleeper", "sleep").unwrap();
        exited.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!path.exists());
        assert!(started.elapsed() < Duration::from_secs(10));
        fs::remove_dir_all(&dir).unwrap();
    }
}
