use std::{
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Result};
use tempfile::tempdir;

#[test]
fn test_second_instance_exits_without_touching_files() -> Result<()> {
    let first_dir = tempdir()?;
    let second_dir = tempdir()?;
    let config_home = tempdir()?;

    let mut first = Command::new(env!("CARGO_BIN_EXE_hydrowatch"))
        .arg("--dir")
        .arg(first_dir.path())
        .arg("run")
        .env("XDG_CONFIG_HOME", config_home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()?;

    let started = Instant::now();
    while !first_dir.path().join("config.json").exists() {
        if started.elapsed() > Duration::from_secs(20) {
            first.kill()?;
            bail!("First instance never created its config");
        }
        thread::sleep(Duration::from_millis(50));
    }

    // Not created up front: the second instance must not create it either.
    let second_app_dir = second_dir.path().join("app");
    let second = Command::new(env!("CARGO_BIN_EXE_hydrowatch"))
        .arg("--dir")
        .arg(&second_app_dir)
        .arg("run")
        .env("XDG_CONFIG_HOME", config_home.path())
        .stdin(Stdio::null())
        .output()?;

    first.kill()?;
    first.wait()?;

    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("already running"));
    assert!(!second_app_dir.exists());
    Ok(())
}
