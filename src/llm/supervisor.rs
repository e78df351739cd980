//! Inference server supervision
//!
//! The llama-server process is shared infrastructure: if something already
//! answers the health endpoint, the supervisor leaves it alone. Otherwise it
//! launches the server pinned to a CPU range away from the vision workload
//! and waits for readiness. Readiness timeout is non-fatal; later queries
//! fail loudly instead.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::{Error, Result};

/// Health probe timeout
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait for a freshly launched server to become ready
const STARTUP_POLLS: u32 = 60;

/// Bounded wait for the child to exit after a kill
const STOP_WAIT: Duration = Duration::from_secs(5);

/// Launches and tears down the local inference server
pub struct LlmSupervisor {
    config: LlmConfig,
    probe: reqwest::blocking::Client,
    child: Option<Child>,
}

impl LlmSupervisor {
    /// Create a supervisor; nothing is launched yet
    ///
    /// # Errors
    ///
    /// Returns error if the health-probe client cannot be constructed
    pub fn new(config: LlmConfig) -> Result<Self> {
        let probe = reqwest::blocking::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            config,
            probe,
            child: None,
        })
    }

    /// Ensure an inference server is reachable, launching one if needed
    ///
    /// Blocks up to a minute waiting for a freshly launched server. A server
    /// that never becomes ready is logged as a warning and tolerated.
    ///
    /// # Errors
    ///
    /// Returns error only when the process itself cannot be spawned
    pub fn ensure_running(&mut self) -> Result<()> {
        if self.is_healthy() {
            tracing::info!(url = %self.config.health_url, "inference server already up");
            return Ok(());
        }

        let server_bin = expand_home(&self.config.server_bin);
        let model_path = expand_home(&self.config.model_path);

        tracing::info!(
            bin = %server_bin,
            model = %model_path,
            cpus = %self.config.cpu_affinity,
            "launching inference server"
        );

        let child = Command::new("taskset")
            .arg("-c")
            .arg(&self.config.cpu_affinity)
            .arg(&server_bin)
            .args(["-m", &model_path])
            .args(["-t", "4"])
            .args(["-c", "2048"])
            .args(["--port", "8081"])
            .args(["--host", "127.0.0.1"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Supervisor(format!("failed to launch inference server: {e}")))?;

        self.child = Some(child);

        for attempt in 1..=STARTUP_POLLS {
            std::thread::sleep(Duration::from_secs(1));
            if self.is_healthy() {
                tracing::info!(seconds = attempt, "inference server ready");
                return Ok(());
            }
        }

        tracing::warn!(
            seconds = STARTUP_POLLS,
            "inference server not ready; queries will fail until it is"
        );
        Ok(())
    }

    /// Terminate a supervised server, waiting briefly for it to exit
    ///
    /// A server found already running is never touched.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        tracing::info!("stopping inference server");
        if let Err(e) = child.kill() {
            tracing::warn!(error = %e, "failed to signal inference server");
        }

        let deadline = std::time::Instant::now() + STOP_WAIT;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, "inference server exited");
                    return;
                }
                Ok(None) => {
                    if std::time::Instant::now() >= deadline {
                        tracing::warn!("inference server did not exit in time");
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to reap inference server");
                    return;
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.probe
            .get(&self.config.health_url)
            .send()
            .is_ok_and(|r| r.status().is_success())
    }
}

impl Drop for LlmSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Expand a leading `~/` using the HOME environment variable
fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{home}/{rest}");
        }
    }
    path.to_string()
}
