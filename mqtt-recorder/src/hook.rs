//! Bridges protocol-engine hook callbacks to the durable logs and carries
//! the accept-all connection policy.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use rmqtt::{
    context::ServerContext,
    hook::{Handler, HookResult, Parameter, Register, ReturnType, Type},
    macros::Plugin,
    plugin::{PackageInfo, Plugin},
    register,
    types::AuthResult,
    Result,
};

use crate::config::PluginConfig;
use crate::record::MessageRecord;
use crate::store::RecordStore;

/// Session boundary marker in the event log.
pub const SEPARATOR: &str = "-------------------------------------------------------";

register!(RecorderPlugin::new);

#[derive(Plugin)]
struct RecorderPlugin {
    register: Box<dyn Register>,
    cfg: PluginConfig,
    store: Arc<RecordStore>,
}

impl RecorderPlugin {
    #[inline]
    async fn new<N: Into<String>>(scx: ServerContext, name: N) -> Result<Self> {
        let name = name.into();
        let cfg = scx.plugins.read_config_default::<PluginConfig>(&name)?;
        log::debug!("{} RecorderPlugin cfg: {:?}", name, cfg);
        let register = scx.extends.hook_mgr().register();
        let store = Arc::new(RecordStore::new(&cfg));
        Ok(Self { register, cfg, store })
    }
}

#[async_trait]
impl Plugin for RecorderPlugin {
    #[inline]
    async fn init(&mut self) -> Result<()> {
        log::info!("{} init", self.name());
        let store = &self.store;
        self.register.add(Type::ClientConnect, Box::new(RecorderHandler::new(store))).await;
        self.register.add(Type::ClientAuthenticate, Box::new(RecorderHandler::new(store))).await;
        self.register.add(Type::ClientConnected, Box::new(RecorderHandler::new(store))).await;
        self.register.add(Type::ClientDisconnected, Box::new(RecorderHandler::new(store))).await;
        self.register.add(Type::SessionSubscribed, Box::new(RecorderHandler::new(store))).await;
        self.register.add(Type::SessionUnsubscribed, Box::new(RecorderHandler::new(store))).await;
        self.register.add(Type::MessagePublish, Box::new(RecorderHandler::new(store))).await;
        Ok(())
    }

    #[inline]
    async fn get_config(&self) -> Result<serde_json::Value> {
        self.cfg.to_json()
    }

    #[inline]
    async fn start(&mut self) -> Result<()> {
        log::info!("{} start", self.name());
        self.register.start().await;
        Ok(())
    }

    #[inline]
    async fn stop(&mut self) -> Result<bool> {
        log::info!("{} stop", self.name());
        self.register.stop().await;
        Ok(true)
    }
}

struct RecorderHandler {
    store: Arc<RecordStore>,
}

impl RecorderHandler {
    fn new(store: &Arc<RecordStore>) -> Self {
        Self { store: store.clone() }
    }

    /// Mirrors the line to the console and appends it to the event log.
    /// Logging failures are reported and dropped; they never reach the
    /// engine or affect message delivery.
    async fn record_event(&self, line: &str) {
        log::info!("{line}");
        if let Err(e) = self.store.append_event(line).await {
            log::warn!("failed to append event line, {e:?}");
        }
    }

    async fn record_publish(&self, client_id: &str, topic: &str, payload: &str) {
        let record = MessageRecord::new(topic, payload);
        if let Err(e) = self.store.append_record(&record).await {
            log::warn!("failed to append message record, {e:?}");
        }
        self.record_event(&published_line(client_id, topic, payload)).await;
    }
}

#[async_trait]
impl Handler for RecorderHandler {
    async fn hook(&self, param: &Parameter, acc: Option<HookResult>) -> ReturnType {
        match param {
            Parameter::ClientConnect(connect_info) => {
                let endpoint =
                    connect_info.id().remote_addr.map(|addr| addr.to_string()).unwrap_or_default();
                self.record_event(&connected_from_line(&client_ip(&endpoint))).await;
            }

            // Accept-all policy: every connection attempt resolves to Allow.
            Parameter::ClientAuthenticate(_) => {
                return (false, Some(HookResult::AuthResult(AuthResult::Allow(false, None))));
            }

            Parameter::ClientConnected(session) => {
                self.record_event(&connected_line(&session.id.client_id)).await;
            }

            Parameter::ClientDisconnected(session, _reason) => {
                self.record_event(&disconnected_line(&session.id.client_id)).await;
                // The separator is file-only in the historical log.
                if let Err(e) = self.store.append_event(SEPARATOR).await {
                    log::warn!("failed to append event line, {e:?}");
                }
            }

            Parameter::SessionSubscribed(session, subscribe) => {
                self.record_event(&subscribed_line(&session.id.client_id, &subscribe.topic_filter))
                    .await;
            }

            Parameter::SessionUnsubscribed(session, unsubscribe) => {
                self.record_event(&unsubscribed_line(
                    &session.id.client_id,
                    &unsubscribe.topic_filter,
                ))
                .await;
            }

            Parameter::MessagePublish(_session, from, publish) => {
                let payload = String::from_utf8_lossy(publish.payload.as_ref());
                self.record_publish(&from.client_id, &publish.topic, &payload).await;
            }

            _ => {
                log::error!("unimplemented, {param:?}");
            }
        }
        (true, acc)
    }
}

/// Extracts the address portion of a `host:port` endpoint. Anything that
/// does not parse as a socket address (missing port, non-numeric port,
/// empty string) degrades to `Unknown` rather than failing the connection.
fn client_ip(endpoint: &str) -> String {
    endpoint
        .parse::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "Unknown".into())
}

fn connected_from_line(addr: &str) -> String {
    format!("Client connected from IPv4 address: {addr}")
}

fn connected_line(client_id: &str) -> String {
    format!("Client connected: {client_id}")
}

fn disconnected_line(client_id: &str) -> String {
    format!("Client disconnected: {client_id}")
}

fn subscribed_line(client_id: &str, topic_filter: &str) -> String {
    format!("Client {client_id} subscribed to topic: {topic_filter}")
}

fn unsubscribed_line(client_id: &str, topic_filter: &str) -> String {
    format!("Client {client_id} unsubscribed from topic: {topic_filter}")
}

fn published_line(client_id: &str, topic: &str, payload: &str) -> String {
    format!("Client {client_id} published message: Topic: {topic} Payload: {payload}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip() {
        assert_eq!(client_ip("192.168.1.10:51123"), "192.168.1.10");
        assert_eq!(client_ip("[::1]:1883"), "::1");
        assert_eq!(client_ip("192.168.1.10"), "Unknown");
        assert_eq!(client_ip("192.168.1.10:abc"), "Unknown");
        assert_eq!(client_ip(""), "Unknown");
    }

    #[test]
    fn test_event_lines() {
        assert_eq!(
            connected_from_line("10.0.0.7"),
            "Client connected from IPv4 address: 10.0.0.7"
        );
        assert_eq!(connected_line("dev-1"), "Client connected: dev-1");
        assert_eq!(disconnected_line("dev-1"), "Client disconnected: dev-1");
        assert_eq!(
            subscribed_line("dev-1", "sensors/#"),
            "Client dev-1 subscribed to topic: sensors/#"
        );
        assert_eq!(
            unsubscribed_line("dev-1", "sensors/#"),
            "Client dev-1 unsubscribed from topic: sensors/#"
        );
        assert_eq!(
            published_line("dev-1", "sensors/1", "10.5,2.3"),
            "Client dev-1 published message: Topic: sensors/1 Payload: 10.5,2.3"
        );
    }

    #[test]
    fn test_separator() {
        assert_eq!(SEPARATOR.len(), 55);
        assert!(SEPARATOR.chars().all(|c| c == '-'));
    }
}
