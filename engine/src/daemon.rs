//! The long-running control loop: load config, run a cycle, sleep, repeat.

use std::future::Future;
use std::path::PathBuf;

use kjeller_config::{Config, ConfigError};
use kjeller_providers::{DeconzClient, RetryConfig, TibberClient};
use thiserror::Error;
use tokio::time::sleep;

use crate::clock::{Clock, SystemClock};
use crate::controller::{Controller, CycleReport};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct Daemon<C: Clock = SystemClock> {
    config_path: PathBuf,
    http: reqwest::Client,
    retry: RetryConfig,
    clock: C,
    config: Config,
    controller: Controller<TibberClient, DeconzClient>,
}

impl Daemon<SystemClock> {
    /// Load the configuration at `config_path` and build the clients.
    ///
    /// A configuration that cannot be loaded here is fatal.
    pub fn load(config_path: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        Self::with_clock(config_path, SystemClock)
    }
}

impl<C: Clock> Daemon<C> {
    pub fn with_clock(config_path: impl Into<PathBuf>, clock: C) -> Result<Self, DaemonError> {
        let config_path = config_path.into();
        let config = Config::load(&config_path)?;
        Self::from_config(config_path, config, clock)
    }

    /// Build around a configuration the caller already loaded from `config_path`.
    pub fn from_config(
        config_path: impl Into<PathBuf>,
        config: Config,
        clock: C,
    ) -> Result<Self, DaemonError> {
        let config_path = config_path.into();
        let http = kjeller_providers::http_client()?;
        let retry = RetryConfig::default();
        let (tibber, deconz) = clients(&http, &config, &retry);

        tracing::info!(
            path = %config_path.display(),
            rooms = config.rooms.len(),
            latitude = ?config.global.latitude,
            longitude = ?config.global.longitude,
            "Loaded configuration"
        );

        Ok(Self {
            config_path,
            http,
            retry,
            clock,
            config,
            controller: Controller::new(tibber, deconz),
        })
    }

    /// Use `retry` for every request from the next cycle on.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        let (tibber, deconz) = clients(&self.http, &self.config, &self.retry);
        self.controller.set_sources(tibber, deconz);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Re-read the configuration file.
    ///
    /// On failure the previous configuration stays in effect and the error is
    /// logged. Returns whether the new file was applied.
    pub fn reload(&mut self) -> bool {
        match Config::load(&self.config_path) {
            Ok(config) => {
                let (tibber, deconz) = clients(&self.http, &config, &self.retry);
                self.controller.set_sources(tibber, deconz);
                self.config = config;
                true
            }
            Err(e) => {
                tracing::error!("{e}; keeping previous configuration");
                false
            }
        }
    }

    /// Reload the configuration and run a single control cycle.
    pub async fn run_once(&mut self) -> CycleReport {
        self.reload();
        let now = self.clock.now();
        tracing::debug!("Cycle at {now}");
        let report = self.controller.run_cycle(&self.config, now).await;
        if report.failed() > 0 {
            tracing::warn!(
                failed = report.failed(),
                "Some thermostats could not be updated"
            );
        }
        report
    }

    /// Run cycles until `shutdown` resolves, sleeping `global.sleep` seconds
    /// between them. A cycle in progress is finished before returning.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            self.run_once().await;
            let interval = self.config.sleep_interval();
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Shutting down");
                    return;
                }
                () = sleep(interval) => {}
            }
        }
    }
}

fn clients(
    http: &reqwest::Client,
    config: &Config,
    retry: &RetryConfig,
) -> (TibberClient, DeconzClient) {
    let tibber = TibberClient::new(
        http.clone(),
        config.tibber.endpoint(),
        config.tibber.access_token.clone(),
        config.tibber.house_id.clone(),
    )
    .with_retry(retry.clone());
    let deconz = DeconzClient::new(
        http.clone(),
        &config.deconz.endpoint,
        config.deconz.api_key.clone(),
    )
    .with_retry(retry.clone());
    (tibber, deconz)
}
