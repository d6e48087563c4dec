use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{ProcwatchError, Result};

/// Start `program` detached from our terminal and return its pid.
///
/// The child is reaped on a background thread so it never lingers as a
/// zombie after exit; the sampler then sees it as gone.
pub fn launch_executable(program: &Path, args: &[String]) -> Result<u32> {
    if !program.is_file() {
        return Err(ProcwatchError::launch(format!(
            "executable not found: {}",
            program.display()
        )));
    }

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            ProcwatchError::launch(format!("failed to start {}: {}", program.display(), e))
        })?;

    let pid = child.id();
    log::info!("Launched {} as process {}", program.display(), pid);

    std::thread::Builder::new()
        .name(format!("procwatch-reaper-{}", pid))
        .spawn(move || match child.wait() {
            Ok(status) => log::info!("Process {} exited with {}", pid, status),
            Err(e) => log::warn!("Failed to wait for process {}: {}", pid, e),
        })?;

    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_missing_executable_is_config_error() {
        let err = launch_executable(Path::new("/definitely/not/here"), &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = launch_executable(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, ProcwatchError::Launch(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_returns_live_pid() {
        let pid = launch_executable(Path::new("/bin/sh"), &["-c".into(), "sleep 1".into()])
            .unwrap();
        assert!(pid > 0);
    }
}
