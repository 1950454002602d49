//! Shell-command volume control
//!
//! Mute and unmute shell out to the configured mixer commands (amixer by
//! default). The command line is split on whitespace; no shell is involved.

use crate::error::{Error, Result};
use crate::playback::VolumeControl;
use async_trait::async_trait;
use radiobox_common::config::VolumeControlConfig;
use tokio::process::Command;
use tracing::debug;

pub struct ShellVolumeControl {
    mute_cmd: String,
    unmute_cmd: String,
}

impl ShellVolumeControl {
    pub fn new(config: &VolumeControlConfig) -> Self {
        Self {
            mute_cmd: config.mute.clone(),
            unmute_cmd: config.unmute.clone(),
        }
    }

    async fn run(&self, command_line: &str) -> Result<()> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::VolumeControl("empty mixer command".to_string()))?;

        debug!("running mixer command: {}", command_line);
        let output = Command::new(program)
            .args(parts)
            .output()
            .await
            .map_err(|e| Error::VolumeControl(format!("{}: {}", program, e)))?;

        if !output.status.success() {
            return Err(Error::VolumeControl(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VolumeControl for ShellVolumeControl {
    async fn mute(&self) -> Result<()> {
        self.run(&self.mute_cmd).await
    }

    async fn unmute(&self) -> Result<()> {
        self.run(&self.unmute_cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(mute: &str, unmute: &str) -> ShellVolumeControl {
        ShellVolumeControl::new(&VolumeControlConfig {
            mute: mute.to_string(),
            unmute: unmute.to_string(),
        })
    }

    #[tokio::test]
    async fn successful_command_is_ok() {
        let vc = control("true", "true");
        assert!(vc.mute().await.is_ok());
        assert!(vc.unmute().await.is_ok());
    }

    #[tokio::test]
    async fn failing_command_is_err() {
        let vc = control("false", "false");
        assert!(vc.mute().await.is_err());
    }

    #[tokio::test]
    async fn missing_binary_is_err() {
        let vc = control("/nonexistent/mixer -q", "/nonexistent/mixer -q");
        assert!(vc.unmute().await.is_err());
    }

    #[tokio::test]
    async fn empty_command_is_err() {
        let vc = control("", "");
        assert!(vc.mute().await.is_err());
    }
}
