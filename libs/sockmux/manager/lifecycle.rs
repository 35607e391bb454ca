//! Connection lifecycle steps run by the manager task

use super::manager::ManagerTask;
use crate::core::bridge::{BinaryRecv, BinarySendStatus};
use crate::core::config::BinaryDelivery;
use crate::core::connection_state::ConnectionState;
use crate::core::entry::ActiveSocket;
use crate::core::event::Event;
use crate::core::registry::REPLACED_REASON;
use crate::traits::transport::SocketNotice;
use crate::traits::*;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

impl ManagerTask {
    /// Hand an event to the dispatcher
    pub(super) fn emit(&mut self, identity: &str, event: Event) {
        trace!("Event '{}' for '{}'", event.tag(), identity);
        self.dispatcher.dispatch(identity, event);
    }

    pub(super) fn open(
        &mut self,
        identity: Identity,
        protocols: Vec<String>,
        reconnect: Option<ReconnectPolicy>,
    ) {
        info!("Opening connection '{}'", identity);

        if let Some(replaced) = self.registry.upsert(identity.clone(), protocols, reconnect) {
            // The old socket's own Closed signal will be ignored as stale,
            // so report the replacement now, before the new socket exists.
            if replaced.had_socket {
                self.emit(
                    &identity,
                    Event::Closed {
                        code: CloseCode::Normal,
                        reason: REPLACED_REASON.to_string(),
                        was_clean: true,
                    },
                );
            }
        }

        self.connect(&identity, false);
    }

    /// Create a socket for an existing entry
    pub(super) fn connect(&mut self, identity: &str, reopening: bool) {
        let socket_id = self.allocate_socket_id();
        let Some(entry) = self.registry.get_mut(identity) else {
            return;
        };

        let request = ConnectRequest {
            identity: entry.identity.clone(),
            protocols: entry.protocols.clone(),
        };
        let sink = SignalSink::new(entry.identity.clone(), socket_id, self.inbox.clone());
        let handle = self.transport.connect(request, sink);

        entry.socket = Some(ActiveSocket {
            id: socket_id,
            handle,
        });
        entry.state = ConnectionState::Connecting;
        entry.reopening = reopening;

        debug!("Socket {} created for '{}'", socket_id, identity);
    }

    pub(super) fn send_text(&mut self, identity: &str, data: String) {
        let Some(entry) = self.registry.get(identity) else {
            debug!("Dropping text for unknown connection '{}'", identity);
            return;
        };

        match entry.socket.as_ref() {
            Some(socket) if entry.is_open() => {
                if let Err(e) = socket.handle.send(WsMessage::Text(data)) {
                    debug!("Dropping text for '{}': {}", identity, e);
                }
            }
            _ => debug!("Dropping text for '{}': not open ({})", identity, entry.state),
        }
    }

    pub(super) fn close(&mut self, identity: &str, code: Option<CloseCode>, reason: Option<String>) {
        let Some(entry) = self.registry.get_mut(identity) else {
            debug!("Close for unknown connection '{}' ignored", identity);
            return;
        };

        let code = code.unwrap_or_default();
        let reason = reason.unwrap_or_default();
        let had_socket = entry.begin_close(code, &reason);

        info!(
            "Closing connection '{}' (code {}, socket attached: {})",
            identity, code, had_socket
        );
    }

    pub(super) fn configure_reconnect(&mut self, identity: &str, reconnect: Option<ReconnectPolicy>) {
        let Some(entry) = self.registry.get_mut(identity) else {
            debug!("Reconnect policy for unknown connection '{}' ignored", identity);
            return;
        };

        let enabled = reconnect.is_some();
        entry.reconnect = reconnect;

        if !enabled && entry.cancel_reconnect() {
            entry.state = ConnectionState::Closed;
            info!("Reconnection disabled for '{}'; pending attempt canceled", identity);
        } else {
            debug!("Reconnect policy for '{}' updated (enabled: {})", identity, enabled);
        }
    }

    pub(super) fn send_binary(&mut self, identity: &str, data: Vec<u8>) -> BinarySendStatus {
        let Some(entry) = self.registry.get(identity) else {
            return BinarySendStatus::NotOpen;
        };

        match entry.socket.as_ref() {
            Some(socket) if entry.is_open() => match socket.handle.send(WsMessage::Binary(data)) {
                Ok(()) => BinarySendStatus::Forwarded,
                Err(e) => {
                    debug!("Binary send to '{}' failed: {}", identity, e);
                    BinarySendStatus::NotOpen
                }
            },
            _ => BinarySendStatus::NotOpen,
        }
    }

    pub(super) fn recv_binary(&mut self, identity: &str, reply: oneshot::Sender<BinaryRecv>) {
        match self.registry.get_mut(identity) {
            Some(entry) => {
                let park = !entry.state.is_terminal();
                entry.binary.request(reply, park);
            }
            None => {
                let _ = reply.send(BinaryRecv::Terminated);
            }
        }
    }

    /// Apply a signal from a socket
    pub(super) fn handle_signal(&mut self, notice: SocketNotice) {
        let SocketNotice {
            identity,
            socket,
            signal,
        } = notice;

        let Some(entry) = self.registry.get_mut(&identity) else {
            trace!("Signal for removed connection '{}' ignored", identity);
            return;
        };
        if entry.socket_id() != Some(socket) {
            trace!("Signal from superseded socket {} of '{}' ignored", socket, identity);
            return;
        }

        match signal {
            SocketSignal::Opened => {
                entry.retry_count = 0;
                if entry.state == ConnectionState::Connecting {
                    entry.state = ConnectionState::Open;
                }
                let reopened = std::mem::take(&mut entry.reopening);

                info!("Connection '{}' opened", identity);
                self.emit(&identity, Event::Opened);
                if reopened {
                    self.emit(&identity, Event::Reconnected);
                }
            }
            SocketSignal::Text(text) => {
                self.emit(&identity, Event::MessageReceived(text));
            }
            SocketSignal::Binary(frame) => match self.config.binary_delivery {
                BinaryDelivery::Bridge => entry.binary.deliver(frame),
                BinaryDelivery::Event => self.emit(&identity, Event::BinaryReceived(frame)),
            },
            SocketSignal::Error(message) => {
                warn!("Connection '{}' error: {}", identity, message);
                self.emit(&identity, Event::Error(message));
            }
            SocketSignal::Closed {
                code,
                reason,
                was_clean,
            } => self.on_closed(&identity, code, reason, was_clean),
        }
    }

    fn on_closed(&mut self, identity: &str, code: CloseCode, reason: String, was_clean: bool) {
        let Some(entry) = self.registry.get_mut(identity) else {
            return;
        };

        entry.socket = None;
        entry.reopening = false;
        entry.state = ConnectionState::Closed;
        entry.binary.terminate();
        let intentional = entry.intentional_close;
        let has_policy = entry.reconnect.is_some();

        info!(
            "Connection '{}' closed (code {}, clean: {}, intentional: {})",
            identity, code, was_clean, intentional
        );
        self.emit(
            identity,
            Event::Closed {
                code,
                reason,
                was_clean,
            },
        );

        if !intentional && has_policy {
            self.schedule_reconnect(identity, code);
        }
    }
}
