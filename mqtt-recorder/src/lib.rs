#![deny(unsafe_code)]

//! MQTT recording broker service.
//!
//! A policy layer on top of the [`rmqtt`] protocol engine: every client
//! connection is accepted, lifecycle events are appended to a plaintext
//! event log, and each published message is mapped positionally into a
//! fixed 23-column CSV row.
//!
//! ```rust,no_run
//! use mqtt_recorder::server::Broker;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let broker = Broker::new();
//!     broker.start(([0, 0, 0, 0], 1883).into()).await?;
//!     broker.run_until_stopped().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod hook;
pub mod netif;
pub mod record;
pub mod server;
pub mod store;

pub use rmqtt::Result;
