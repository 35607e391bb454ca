//! JSON-lines process bridge
//!
//! Reads one command per line from the input, writes one event per line to
//! the output. Every event goes out through the manager's unclaimed stream;
//! the bridge never subscribes to individual identities.

use super::config::BridgeConfig;
use super::runner::{BinaryRunner, RunConfig};
use super::shutdown::ShutdownManager;
use sockmux::{Command, ConnectionManager, TaggedEvent, Transport, UnclaimedEvents};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{debug, info, warn};

/// Counters reported on shutdown
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    pub commands: u64,
    pub rejected: u64,
    pub events: u64,
}

/// The bridge application: stdin commands in, stdout events out
pub struct BridgeApp<R, W> {
    run_config: RunConfig,
    config: BridgeConfig,
    manager: ConnectionManager,
    unclaimed: UnclaimedEvents,
    input: Lines<R>,
    output: W,
    shutdown: ShutdownManager,
    stats: BridgeStats,
}

impl<R, W> BridgeApp<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Start a manager on `transport` and wire it to `input` / `output`
    pub fn new<T: Transport>(config: BridgeConfig, transport: T, input: R, output: W) -> Self {
        let (manager, unclaimed) = ConnectionManager::with_config(config.manager_config(), transport);
        let run_config = RunConfig::new("sockmux-bridge").with_heartbeat(config.heartbeat_interval_secs);

        Self {
            run_config,
            config,
            manager,
            unclaimed,
            input: input.lines(),
            output,
            shutdown: ShutdownManager::new(),
            stats: BridgeStats::default(),
        }
    }

    /// Handle to the shutdown switch (Ctrl+C, tests)
    pub fn shutdown_handle(&self) -> ShutdownManager {
        self.shutdown.clone()
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn bridge_stats(&self) -> BridgeStats {
        self.stats
    }

    fn open_startup_connections(&self) -> anyhow::Result<()> {
        for connection in &self.config.connections {
            info!("Opening startup connection {}", connection.id);
            self.manager.open(
                connection.id.clone(),
                connection.protocols.clone(),
                self.config.policy_for(connection),
            )?;
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let result = Command::decode(line).and_then(|command| {
            debug!("Command '{}' for {}", command.tag(), command.id());
            self.manager.execute(command)
        });

        match result {
            Ok(()) => self.stats.commands += 1,
            Err(e) => {
                self.stats.rejected += 1;
                warn!("Rejected command: {}", e);
            }
        }
    }

    async fn write_event(&mut self, event: TaggedEvent) -> anyhow::Result<()> {
        let mut line = event.to_json()?;
        line.push('\n');
        self.output.write_all(line.as_bytes()).await?;
        self.output.flush().await?;
        self.stats.events += 1;
        Ok(())
    }

    async fn log_heartbeat(&self) {
        match self.manager.connections().await {
            Ok(connections) => {
                let open = connections
                    .iter()
                    .filter(|c| c.state == sockmux::ConnectionState::Open)
                    .count();
                info!(
                    "Heartbeat: {}/{} connection(s) open, {} event(s) written",
                    open,
                    connections.len(),
                    self.stats.events
                );
            }
            Err(e) => warn!("Heartbeat failed: {}", e),
        }
    }
}

impl<R, W> BinaryRunner for BridgeApp<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn run(&mut self) -> anyhow::Result<()> {
        self.open_startup_connections()?;

        let mut heartbeat =
            tokio::time::interval(Duration::from_secs(self.run_config.heartbeat_interval_secs));
        heartbeat.tick().await;

        let shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                line = self.input.next_line() => {
                    match line? {
                        Some(line) => self.handle_line(&line),
                        None => {
                            info!("Input closed");
                            break;
                        }
                    }
                }
                Some(event) = self.unclaimed.recv() => self.write_event(event).await?,
                _ = heartbeat.tick() => self.log_heartbeat().await,
                _ = shutdown.wait() => break,
            }
        }

        self.manager.clone().shutdown().await?;

        // Events emitted before the teardown are still owed to the consumer
        while let Ok(event) = self.unclaimed.try_recv() {
            self.write_event(event).await?;
        }

        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!(
            "Commands: {} accepted, {} rejected; events written: {}",
            self.stats.commands, self.stats.rejected, self.stats.events
        ))
    }
}
