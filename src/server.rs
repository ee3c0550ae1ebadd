//! HTTP and WebSocket transport
//!
//! Routes:
//! - `GET /ws` upgrades to a WebSocket and runs one [`StreamingLoop`] for the connection
//! - `GET /health` answers `OK`
//! - `GET /api/fields` lists the active field map as JSON
//! - anything else is served from the dashboard directory, when configured
//!
//! When live acquisition is enabled a single [`LiveReader`] owns the serial
//! link and every connection reads its packets through a [`LiveSource`].
//! The reader and every loop run under the server's shutdown token, so
//! cancelling it stops all streams before the listener closes.

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::driver::{Acquisition, StreamingLoop};
use crate::provider::PacketSource;
use crate::providers::{LiveReader, LiveSource, SerialLink, SyntheticSource};
use crate::sink::FrameSink;
use crate::types::{FieldMap, FieldSpec};
use crate::{EcmError, Result};

/// State shared by every route.
pub struct AppState {
    map: Arc<FieldMap>,
    live: Option<LiveSource>,
    tick_interval: Duration,
    shutdown: CancellationToken,
}

impl AppState {
    /// Build the shared state, failing if the map cannot drive synthetic data.
    ///
    /// With live acquisition enabled this starts the serial reader, which runs
    /// until `shutdown` is cancelled. Must be called within a tokio runtime.
    pub fn new(map: Arc<FieldMap>, config: &Config, shutdown: CancellationToken) -> Result<Self> {
        // Every connection needs a synthetic fallback; check the map supports one
        SyntheticSource::new(&map)?;

        let live = config.live.enabled.then(|| {
            let link = SerialLink::new(config.live.serial_settings(map.max_extent()));
            info!("Live acquisition enabled on {} at {} baud", config.live.port, config.live.baud_rate);
            let reader = LiveReader::new(link, config.stream.tick_interval(), config.live.timeout());
            let source = reader.source(config.live.max_age());
            reader.spawn(shutdown.clone());
            source
        });
        if live.is_none() {
            info!("Live acquisition disabled, streaming synthetic data");
        }

        Ok(Self { map, live, tick_interval: config.stream.tick_interval(), shutdown })
    }

    fn acquisition(&self) -> Result<Acquisition> {
        let live = self.live.clone().map(|source| Box::new(source) as Box<dyn PacketSource>);
        Ok(Acquisition::new(live, SyntheticSource::new(&self.map)?))
    }
}

/// Sink writing text frames to one WebSocket.
pub struct WsSink {
    tx: SplitSink<WebSocket, Message>,
}

#[async_trait::async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.tx
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| EcmError::sink_closed(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.tx.close().await.map_err(|e| EcmError::sink_closed(e.to_string()))
    }
}

/// Build the router over `state`.
pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    let api = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/fields", get(fields_handler))
        .with_state(state);

    match &config.server.static_dir {
        Some(dir) => {
            if !dir.is_dir() {
                warn!("Dashboard directory {} not found, only the API will be served", dir.display());
            }
            api.fallback_service(ServeDir::new(dir))
        }
        None => api,
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn fields_handler(State(state): State<Arc<AppState>>) -> Json<Vec<FieldSpec>> {
    Json(state.map.all().to_vec())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket client connected");

    let acquisition = match state.acquisition() {
        Ok(acquisition) => acquisition,
        Err(e) => {
            error!("Cannot start stream: {}", e);
            return;
        }
    };

    let (tx, mut rx) = socket.split();
    let cancel = state.shutdown.child_token();

    // Incoming frames are ignored; a close or read error ends the stream
    let reader_cancel = cancel.clone();
    let reader = tokio::spawn(async move {
        while let Some(message) = rx.next().await {
            match message {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("WebSocket read failed: {}", e);
                    break;
                }
            }
        }
        reader_cancel.cancel();
    });

    let mut stream = StreamingLoop::new(
        Arc::clone(&state.map),
        acquisition,
        WsSink { tx },
        state.tick_interval,
        cancel.clone(),
    );
    let report = stream.run().await;

    cancel.cancel();
    reader.abort();
    info!(sent = report.sent, termination = ?report.termination, "WebSocket client disconnected");
}

/// A bound, not yet running, server.
pub struct Server {
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
}

impl Server {
    /// Bind the listener and prepare the routes.
    pub async fn bind(config: &Config, map: FieldMap, shutdown: CancellationToken) -> Result<Self> {
        let state = Arc::new(AppState::new(Arc::new(map), config, shutdown.clone())?);
        let app = router(state, config);

        let listener = TcpListener::bind(config.server.bind).await.map_err(|e| {
            EcmError::config(format!("cannot listen on {}: {}", config.server.bind, e))
        })?;

        Ok(Self { listener, app, shutdown })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the shutdown token is cancelled.
    pub async fn run(self) -> Result<()> {
        info!("Serving dashboard on http://{}", self.local_addr()?);
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(self.shutdown.cancelled_owned())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::buegb_field_map;

    fn config() -> Config {
        let mut config = Config::default();
        config.server.static_dir = None;
        config
    }

    #[tokio::test]
    async fn state_rejects_map_without_synthetic_fields() {
        let map = FieldMap::from_specs([FieldSpec::new("RPM", 11, 2, 1.0, 0.0).unwrap()]).unwrap();
        let result = AppState::new(Arc::new(map), &config(), CancellationToken::new());
        assert!(matches!(result, Err(EcmError::UnknownField { .. })));
    }

    #[tokio::test]
    async fn live_source_follows_config() {
        let map = Arc::new(buegb_field_map().unwrap());
        let state = AppState::new(Arc::clone(&map), &config(), CancellationToken::new()).unwrap();
        assert!(state.live.is_none());

        let mut live = config();
        live.live.enabled = true;
        live.live.port = "/dev/ecmwatch-test-missing".into();
        let shutdown = CancellationToken::new();
        let state = AppState::new(map, &live, shutdown.clone()).unwrap();
        assert_eq!(state.live.as_ref().map(|l| l.max_age()), Some(Duration::from_millis(300)));

        // no ECM behind the port: connections fall back without waiting
        let mut source = state.live.clone().unwrap();
        assert!(source.attempt().await.is_none());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn health_says_ok() {
        assert_eq!(health_handler().await, "OK");
    }

    #[tokio::test]
    async fn fields_lists_map_in_order() {
        let map = Arc::new(buegb_field_map().unwrap());
        let state = Arc::new(AppState::new(Arc::clone(&map), &config(), CancellationToken::new()).unwrap());
        let Json(fields) = fields_handler(State(state)).await;
        assert_eq!(fields.len(), map.len());
        assert_eq!(fields[0], map.all()[0]);
    }
}
