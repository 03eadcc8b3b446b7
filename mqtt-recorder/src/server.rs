//! Broker lifecycle control: owns the protocol engine and drives it
//! through an explicit Stopped → Starting → Running → Stopping → Stopped
//! state machine.

use std::net::SocketAddr;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rmqtt::context::ServerContext;
use rmqtt::net::Builder;
use rmqtt::server::MqttServer;

use crate::hook;

/// Lifecycle states of the broker service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker is already started")]
    AlreadyStarted,
    #[error("failed to bind {laddr}, {source}")]
    Bind {
        laddr: SocketAddr,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to register the recorder plugin, {0}")]
    Plugin(#[source] anyhow::Error),
}

/// The broker service.
///
/// `start` binds the listener, registers the recorder plugin with the
/// engine and spawns the accept loop; `stop` releases the listening
/// endpoint. A stopped broker can be started again.
pub struct Broker {
    state: Mutex<BrokerState>,
    serving: Mutex<Option<Serving>>,
}

struct Serving {
    shutdown: CancellationToken,
    serve: JoinHandle<()>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        Self { state: Mutex::new(BrokerState::Stopped), serving: Mutex::new(None) }
    }

    #[inline]
    pub fn state(&self) -> BrokerState {
        *self.state.lock()
    }

    /// Starts the broker on `laddr`. Only valid from `Stopped`; a bind or
    /// registration failure rolls the state back to `Stopped` and leaves no
    /// listener open.
    pub async fn start(&self, laddr: SocketAddr) -> Result<(), BrokerError> {
        {
            let mut state = self.state.lock();
            if *state != BrokerState::Stopped {
                return Err(BrokerError::AlreadyStarted);
            }
            *state = BrokerState::Starting;
        }

        match Self::spawn_engine(laddr).await {
            Ok(serving) => {
                *self.serving.lock() = Some(serving);
                *self.state.lock() = BrokerState::Running;
                log::info!("MQTT broker started on {laddr}");
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = BrokerState::Stopped;
                Err(e)
            }
        }
    }

    async fn spawn_engine(laddr: SocketAddr) -> Result<Serving, BrokerError> {
        // Bind first: an unavailable address must fail startup before any
        // engine state is created.
        let listener = Builder::new()
            .name("external/tcp")
            .laddr(laddr)
            .bind()
            .and_then(|l| l.tcp())
            .map_err(|e| BrokerError::Bind { laddr, source: e })?;

        let scx = ServerContext::new().build().await;
        hook::register(&scx, true, false).await.map_err(BrokerError::Plugin)?;

        let server = MqttServer::new(scx).listener(listener).build();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let serve = tokio::spawn(async move {
            tokio::select! {
                r = server.run() => {
                    if let Err(e) = r {
                        log::error!("MQTT server terminated, {e:?}");
                    }
                }
                // Dropping the engine future closes its listeners.
                _ = token.cancelled() => {}
            }
        });
        Ok(Serving { shutdown, serve })
    }

    /// Suspends the caller until `stop` is invoked. Returns immediately
    /// when the broker is not running.
    pub async fn run_until_stopped(&self) {
        let token = self.serving.lock().as_ref().map(|s| s.shutdown.clone());
        if let Some(token) = token {
            token.cancelled().await;
        }
    }

    /// Stops the broker and releases the listening endpoint. A no-op when
    /// already stopped.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                BrokerState::Stopped | BrokerState::Stopping => return,
                _ => *state = BrokerState::Stopping,
            }
        }

        let serving = self.serving.lock().take();
        if let Some(serving) = serving {
            serving.shutdown.cancel();
            if let Err(e) = serving.serve.await {
                if !e.is_cancelled() {
                    log::warn!("serve task terminated abnormally, {e:?}");
                }
            }
        }

        *self.state.lock() = BrokerState::Stopped;
        log::info!("MQTT broker stopped");
    }
}
