//! Automatic reconnection with exponential backoff

use super::manager::{Inbound, ManagerTask, ReconnectDue};
use crate::core::connection_state::ConnectionState;
use crate::core::entry::ReconnectTimer;
use crate::core::event::Event;
use crate::traits::{CloseCode, ReconnectDecision};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

impl ManagerTask {
    /// Decide what follows an unintentional close
    pub(super) fn schedule_reconnect(&mut self, identity: &str, code: CloseCode) {
        let token = self.allocate_timer_token();
        let inbox = self.inbox.clone();

        let Some(entry) = self.registry.get_mut(identity) else {
            return;
        };
        let Some(policy) = entry.reconnect.as_ref() else {
            return;
        };
        let decision = policy.decide(entry.retry_count, code);
        let max_retries = policy.max_retries;

        match decision {
            ReconnectDecision::Skip => {
                debug!("Close code {} for '{}' is not retried", code, identity);
            }
            ReconnectDecision::Exhausted => {
                entry.state = ConnectionState::Failed;
                warn!(
                    "Giving up on '{}' after {} reconnection attempt(s)",
                    identity, entry.retry_count
                );
                self.emit(identity, Event::ReconnectFailed);
            }
            ReconnectDecision::Retry { attempt, delay_ms } => {
                entry.retry_count = attempt;
                entry.state = ConnectionState::ReconnectPending;

                let due = ReconnectDue {
                    identity: entry.identity.clone(),
                    token,
                };
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    if let Some(inbox) = inbox.upgrade() {
                        let _ = inbox.send(Inbound::ReconnectDue(due));
                    }
                });
                // Replacing an older timer aborts it
                entry.reconnect_timer = Some(ReconnectTimer::new(token, handle));

                info!(
                    "Reconnecting '{}' in {}ms (attempt {}/{})",
                    identity,
                    delay_ms,
                    attempt,
                    max_retries.map_or_else(|| "unlimited".to_string(), |max| max.to_string())
                );
                self.emit(
                    identity,
                    Event::Reconnecting {
                        attempt,
                        next_delay_ms: delay_ms,
                        max_retries,
                    },
                );
            }
        }
    }

    /// A reconnect timer fired
    pub(super) fn handle_reconnect_due(&mut self, due: ReconnectDue) {
        let Some(entry) = self.registry.get_mut(&due.identity) else {
            trace!("Reconnect timer for removed connection '{}' ignored", due.identity);
            return;
        };
        if entry.reconnect_timer.as_ref().map(ReconnectTimer::token) != Some(due.token) {
            trace!("Stale reconnect timer for '{}' ignored", due.identity);
            return;
        }

        entry.reconnect_timer = None;
        entry.intentional_close = false;
        debug!(
            "Reconnect timer fired for '{}' (attempt {})",
            due.identity, entry.retry_count
        );

        self.connect(&due.identity, true);
    }
}
