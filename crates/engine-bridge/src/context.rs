//! Engine context: launch, remote class handles, and teardown

use crate::config::EngineConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{EngineEvent, EngineMessage, RemoteRef, serialize};
use crate::tcp::{TcpReadWrapper, TcpWriteWrapper};
use crate::transport::{AsyncReader, AsyncWriter, Responder, reader_task};
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

/// Package views imported on connect: (view name, package)
pub const ENGINE_VIEWS: [(&str, &str); 12] = [
    ("game", "net.demilich.metastone.game.*"),
    ("entities", "net.demilich.metastone.game.entities.*"),
    ("decks", "net.demilich.metastone.game.decks.*"),
    ("events", "net.demilich.metastone.game.events.*"),
    ("actions", "net.demilich.metastone.game.actions.*"),
    ("logic", "net.demilich.metastone.game.logic.*"),
    ("cards", "net.demilich.metastone.game.cards.*"),
    ("spells", "net.demilich.metastone.game.spells.*"),
    ("targeting", "net.demilich.metastone.game.targeting.*"),
    ("utils", "net.demilich.metastone.game.utils.*"),
    ("behaviour", "net.demilich.metastone.game.behaviour.*"),
    ("spellsource", "com.hiddenswitch.spellsource"),
];

/// View for classes addressed by their fully qualified name
pub const JVM_VIEW: &str = "jvm";

/// Named class handles exposed by a context: (name, view, class)
pub const CLASS_REFERENCES: [(&str, &str, &str); 24] = [
    ("GameAction", "actions", "GameAction"),
    ("ActionType", "actions", "ActionType"),
    ("GameContext", "game", "GameContext"),
    ("GameEventType", "game", "events.GameEventType"),
    ("Card", "cards", "CardCatalogue"),
    ("CardCatalogue", "cards", "CardCatalogue"),
    ("Rarity", "cards", "Rarity"),
    ("CardType", "cards", "CardType"),
    ("CardSet", "cards", "CardSet"),
    ("Deck", "decks", "Deck"),
    ("Entity", "entities", "Entity"),
    ("Actor", "entities", "Actor"),
    ("EntityType", "entities", "EntityType"),
    ("Weapon", "entities", "weapons.Weapon"),
    ("Minion", "entities", "minions.Minion"),
    ("Hero", "entities", "heroes.Hero"),
    ("HeroClass", "entities", "heroes.HeroClass"),
    ("GameEvent", "events", "GameEvent"),
    ("Attribute", "utils", "Attribute"),
    ("GameLogic", "logic", "GameLogic"),
    ("Zones", "targeting", "Zones"),
    ("Spellsource", "spellsource", "Spellsource"),
    ("PythonBridge", JVM_VIEW, "com.hiddenswitch.spellsource.applications.PythonBridge"),
    ("ArrayList", JVM_VIEW, "java.util.ArrayList"),
];

/// The narrow surface callers need from an engine connection
#[async_trait]
pub trait EngineGateway: Send {
    /// Call `method` on a remote class and return its result
    async fn invoke(&mut self, target: &RemoteRef, method: &str, args: Vec<Value>) -> Result<Value>;

    /// Shut the engine down and release the connection
    async fn close(&mut self) -> Result<()>;

    /// Whether calls can still be made
    fn is_open(&self) -> bool;
}

/// Local handle for a remote class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteClass {
    /// Name the handle is exposed under
    pub name: &'static str,
    /// Where the class lives on the engine side
    pub target: RemoteRef,
}

impl RemoteClass {
    /// Call a static method on this class through `gateway`
    pub async fn call<G>(&self, gateway: &mut G, method: &str, args: Vec<Value>) -> Result<Value>
    where
        G: EngineGateway + ?Sized,
    {
        gateway.invoke(&self.target, method, args).await
    }
}

/// Connection state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Handshake done, calls accepted
    Ready,
    /// The connection dropped underneath the context
    Failed,
    /// `close` was called
    Closed,
}

/// A running engine and the gateway connection to it
pub struct EngineContext {
    /// Launch and connection settings
    config: EngineConfig,
    /// Writer half of the connection
    writer: Arc<Mutex<Option<Box<dyn AsyncWriter>>>>,
    /// Channel registering responders with the reader task
    request_tx: mpsc::Sender<Responder>,
    /// Broadcast channel for pushed engine events
    event_tx: broadcast::Sender<EngineEvent>,
    /// Engine name reported in Ready
    engine_name: String,
    /// Engine version reported in Ready
    engine_version: String,
    /// Views the engine confirmed
    views: Vec<String>,
    /// Engine process, if this context launched it
    child: Option<Child>,
    /// Background reader task handle
    reader_handle: Option<JoinHandle<()>>,
    /// Set once `close` has run
    closed: bool,
}

impl EngineContext {
    fn new(config: EngineConfig) -> Self {
        let (request_tx, _request_rx) = mpsc::channel(16);
        let (event_tx, _) = broadcast::channel(64);

        Self {
            config,
            writer: Arc::new(Mutex::new(None)),
            request_tx,
            event_tx,
            engine_name: "Unknown".into(),
            engine_version: "0.0.0".into(),
            views: Vec::new(),
            child: None,
            reader_handle: None,
            closed: false,
        }
    }

    /// Start the engine process and connect to the port it reports
    ///
    /// The engine is killed if the context is dropped without `close`.
    pub async fn launch(config: EngineConfig) -> Result<Self> {
        if config.engine_jar.is_none() {
            warn!("Engine jar not found, relying on the default classpath");
        }

        let args = config.command_args();
        info!("Launching engine: {} {}", config.java.display(), args.join(" "));

        let mut child = Command::new(&config.java)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::Launch(format!("Failed to spawn {}: {}", config.java.display(), e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Launch("Engine stdout not captured".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        let line = timeout(config.startup_timeout, lines.next_line())
            .await
            .map_err(|_| BridgeError::Timeout("Engine did not report its gateway port".into()))?
            .map_err(|e| BridgeError::Launch(format!("Failed to read engine output: {}", e)))?
            .ok_or_else(|| BridgeError::Launch("Engine exited before reporting a port".into()))?;
        let port: u16 = line.trim().parse().map_err(|_| {
            BridgeError::ProtocolError(format!("Expected gateway port, got {:?}", line))
        })?;

        // Keep draining stdout so the engine never blocks on a full pipe
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("[engine] {}", line);
            }
        });

        let addr = format!("{}:{}", config.host, port);
        let mut context = Self::connect(config, &addr).await?;
        context.child = Some(child);
        Ok(context)
    }

    /// Connect to an engine that is already listening on `addr`
    pub async fn connect(config: EngineConfig, addr: &str) -> Result<Self> {
        info!("Connecting to engine at {}", addr);

        let stream = timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| BridgeError::Timeout(format!("Connection timeout to {}", addr)))?
            .map_err(|e| BridgeError::IpcError(format!("Failed to connect to {}: {}", addr, e)))?;

        // Disable Nagle's algorithm for low latency
        stream
            .set_nodelay(true)
            .map_err(|e| BridgeError::IpcError(format!("Failed to set TCP_NODELAY: {}", e)))?;

        let (read_half, write_half) = stream.into_split();
        let mut context = Self::new(config);
        context
            .attach(TcpReadWrapper(read_half), Box::new(TcpWriteWrapper(write_half)))
            .await?;
        Ok(context)
    }

    /// Connect to an engine listening on a Unix domain socket
    #[cfg(unix)]
    pub async fn connect_unix(config: EngineConfig, socket_path: &str) -> Result<Self> {
        use crate::unix::{UnixReadWrapper, UnixWriteWrapper};
        use tokio::net::UnixStream;

        info!("Connecting to engine at {}", socket_path);
        let stream = timeout(config.connect_timeout, UnixStream::connect(socket_path))
            .await
            .map_err(|_| BridgeError::Timeout(format!("Connection timeout to {}", socket_path)))?
            .map_err(|e| BridgeError::IpcError(format!("Failed to connect: {}", e)))?;

        let (read_half, write_half) = stream.into_split();
        let mut context = Self::new(config);
        context
            .attach(UnixReadWrapper(read_half), Box::new(UnixWriteWrapper(write_half)))
            .await?;
        Ok(context)
    }

    /// Start the reader task, wait for Ready, import views, load cards
    async fn attach<R>(&mut self, reader: R, writer: Box<dyn AsyncWriter>) -> Result<()>
    where
        R: AsyncReader + 'static,
    {
        {
            let mut guard = self.writer.lock().await;
            *guard = Some(writer);
        }

        let (request_tx, request_rx) = mpsc::channel(16);
        self.request_tx = request_tx;

        // The first message on a connection is Ready; register for it
        // before the reader task can see it
        let (ready_tx, ready_rx) = oneshot::channel();
        self.request_tx
            .send(ready_tx)
            .await
            .map_err(|_| BridgeError::IpcError("Failed to register for Ready".into()))?;

        let handle = tokio::spawn(reader_task(reader, request_rx, self.event_tx.clone()));
        self.reader_handle = Some(handle);

        let msg = timeout(self.config.connect_timeout, ready_rx)
            .await
            .map_err(|_| BridgeError::Timeout("Engine never sent Ready".into()))?
            .map_err(|_| BridgeError::IpcError("Reader task died".into()))??;

        match msg {
            EngineMessage::Ready { name, version } => {
                info!("Connected to {} v{}", name, version);
                self.engine_name = name;
                self.engine_version = version;
            }
            other => {
                return Err(BridgeError::ProtocolError(format!(
                    "Expected Ready message, got {:?}",
                    other
                )));
            }
        }

        for (view, package) in ENGINE_VIEWS {
            let response = self
                .request(EngineMessage::ImportPackage {
                    view: view.into(),
                    package: package.into(),
                })
                .await?;
            match response {
                EngineMessage::Imported { view: imported } => {
                    if imported != view {
                        warn!("Imported view mismatch: expected {}, got {}", view, imported);
                    }
                    self.views.push(view.to_string());
                }
                EngineMessage::Error { code, message } => {
                    return Err(BridgeError::Remote { code, message });
                }
                other => {
                    return Err(BridgeError::ProtocolError(format!(
                        "Unexpected response to ImportPackage: {:?}",
                        other
                    )));
                }
            }
        }

        let catalogue = RemoteRef::new("cards", "CardCatalogue");
        self.invoke(&catalogue, "loadCardsFromPackage", vec![]).await?;
        info!("Engine ready with {} views", self.views.len());
        Ok(())
    }

    /// Send a message and wait for its response
    async fn request(&mut self, msg: EngineMessage) -> Result<EngineMessage> {
        if self.closed {
            return Err(BridgeError::Closed);
        }

        let data = serialize(&msg)?;
        let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
        debug!("[Rust→Engine] len={} json={}", data.len(), json_preview);

        // Register before writing so the reply cannot arrive first
        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(response_tx)
            .await
            .map_err(|_| BridgeError::IpcError("Reader task not running".into()))?;

        {
            let mut guard = self.writer.lock().await;
            let writer = guard
                .as_mut()
                .ok_or_else(|| BridgeError::IpcError("Not connected".into()))?;
            writer.write_message(&data).await?;
        }

        response_rx
            .await
            .map_err(|_| BridgeError::IpcError("Reader task died waiting for response".into()))?
    }

    /// Send a message without waiting for a response
    async fn send(&mut self, msg: EngineMessage) -> Result<()> {
        let data = serialize(&msg)?;
        debug!("[Rust→Engine] len={} {:?}", data.len(), msg);

        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| BridgeError::IpcError("Not connected".into()))?;
        writer.write_message(&data).await
    }

    /// Handle for one of the named classes in [`CLASS_REFERENCES`]
    pub fn reference(&self, name: &str) -> Option<RemoteClass> {
        CLASS_REFERENCES
            .iter()
            .find(|(ref_name, _, _)| *ref_name == name)
            .map(|&(name, view, class)| RemoteClass {
                name,
                target: RemoteRef::new(view, class),
            })
    }

    /// Every named class handle
    pub fn references(&self) -> Vec<RemoteClass> {
        CLASS_REFERENCES
            .iter()
            .map(|&(name, view, class)| RemoteClass {
                name,
                target: RemoteRef::new(view, class),
            })
            .collect()
    }

    /// Views confirmed by the engine during the handshake
    pub fn views(&self) -> &[String] {
        &self.views
    }

    /// Engine name and version from the handshake
    pub fn engine_info(&self) -> (&str, &str) {
        (&self.engine_name, &self.engine_version)
    }

    /// Current connection state
    pub fn status(&self) -> EngineStatus {
        if self.closed {
            EngineStatus::Closed
        } else if self
            .reader_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            EngineStatus::Ready
        } else {
            EngineStatus::Failed
        }
    }

    /// Subscribe to events pushed by the engine
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }
}

#[async_trait]
impl EngineGateway for EngineContext {
    async fn invoke(&mut self, target: &RemoteRef, method: &str, args: Vec<Value>) -> Result<Value> {
        let response = self
            .request(EngineMessage::Invoke {
                target: target.clone(),
                method: method.to_string(),
                args,
            })
            .await?;

        match response {
            EngineMessage::ReturnValue { value } => Ok(value),
            EngineMessage::Error { code, message } => Err(BridgeError::Remote { code, message }),
            other => Err(BridgeError::ProtocolError(format!(
                "Unexpected response to {}.{}: {:?}",
                target, method, other
            ))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.send(EngineMessage::Shutdown).await {
            warn!("Failed to send Shutdown: {}", e);
        }
        {
            let mut guard = self.writer.lock().await;
            *guard = None;
        }
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }

        if let Some(mut child) = self.child.take() {
            match timeout(Duration::from_secs(5), child.wait()).await {
                Ok(Ok(status)) => info!("Engine exited with {}", status),
                Ok(Err(e)) => warn!("Failed to wait for engine: {}", e),
                Err(_) => {
                    warn!("Engine did not exit after Shutdown, killing it");
                    child
                        .kill()
                        .await
                        .map_err(|e| BridgeError::IpcError(format!("Failed to kill engine: {}", e)))?;
                }
            }
        }

        info!("Engine context closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.status() == EngineStatus::Ready
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::deserialize;
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Minimal engine stand-in: answers the handshake and a few methods
    async fn fake_engine(listener: TcpListener) -> Vec<EngineMessage> {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut reader = TcpReadWrapper(read_half);
        let mut writer = TcpWriteWrapper(write_half);
        let mut received = Vec::new();

        let ready = EngineMessage::Ready {
            name: "Spellsource".into(),
            version: "1.3.0".into(),
        };
        writer.write_message(&serialize(&ready).unwrap()).await.unwrap();

        while let Ok(data) = reader.read_message().await {
            let msg = deserialize(&data).unwrap();
            received.push(msg.clone());
            let reply = match msg {
                EngineMessage::ImportPackage { view, .. } => EngineMessage::Imported { view },
                EngineMessage::Invoke { method, args, .. } => match method.as_str() {
                    "explode" => EngineMessage::Error {
                        code: 500,
                        message: "NullPointerException".into(),
                    },
                    "echo" => {
                        let event = EngineEvent {
                            name: "Echoed".into(),
                            payload: json!(args.len()),
                        };
                        writer
                            .write_message(&serialize(&EngineMessage::Event { event }).unwrap())
                            .await
                            .unwrap();
                        EngineMessage::ReturnValue { value: json!(args) }
                    }
                    _ => EngineMessage::ReturnValue { value: Value::Null },
                },
                EngineMessage::Shutdown => break,
                other => panic!("Unexpected message: {:?}", other),
            };
            writer.write_message(&serialize(&reply).unwrap()).await.unwrap();
        }

        received
    }

    async fn connect_to_fake() -> (EngineContext, JoinHandle<Vec<EngineMessage>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let engine = tokio::spawn(fake_engine(listener));

        let context = EngineContext::connect(EngineConfig::default(), &addr)
            .await
            .unwrap();
        (context, engine)
    }

    #[tokio::test]
    async fn test_handshake_imports_views_and_loads_cards() {
        let (mut context, engine) = connect_to_fake().await;

        assert_eq!(context.engine_info(), ("Spellsource", "1.3.0"));
        assert_eq!(context.views().len(), ENGINE_VIEWS.len());
        assert!(context.is_open());

        context.close().await.unwrap();
        let received = engine.await.unwrap();

        assert_eq!(received.len(), ENGINE_VIEWS.len() + 2);
        match &received[ENGINE_VIEWS.len()] {
            EngineMessage::Invoke { target, method, .. } => {
                assert_eq!(target, &RemoteRef::new("cards", "CardCatalogue"));
                assert_eq!(method, "loadCardsFromPackage");
            }
            other => panic!("Expected catalogue load, got {:?}", other),
        }
        assert!(matches!(received.last(), Some(EngineMessage::Shutdown)));
    }

    #[tokio::test]
    async fn test_invoke_returns_value_and_pushes_events() {
        let (mut context, _engine) = connect_to_fake().await;
        let mut events = context.subscribe_events();

        let game = context.reference("GameContext").unwrap();
        let value = game
            .call(&mut context, "echo", vec![json!("a"), json!(2)])
            .await
            .unwrap();

        assert_eq!(value, json!(["a", 2]));
        let event = events.recv().await.unwrap();
        assert_eq!(event.name, "Echoed");
        assert_eq!(event.payload, json!(2));

        context.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_error_surfaces() {
        let (mut context, _engine) = connect_to_fake().await;
        let logic = context.reference("GameLogic").unwrap();

        match logic.call(&mut context, "explode", vec![]).await {
            Err(BridgeError::Remote { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "NullPointerException");
            }
            other => panic!("Expected remote error, got {:?}", other),
        }

        // The connection stays usable after a remote error
        let value = logic.call(&mut context, "ping", vec![]).await.unwrap();
        assert!(value.is_null());

        context.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_calls() {
        let (mut context, _engine) = connect_to_fake().await;

        context.close().await.unwrap();
        context.close().await.unwrap();

        assert_eq!(context.status(), EngineStatus::Closed);
        assert!(!context.is_open());

        let deck = context.reference("Deck").unwrap();
        assert!(matches!(
            deck.call(&mut context, "size", vec![]).await,
            Err(BridgeError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_references_cover_named_classes() {
        let (mut context, _engine) = connect_to_fake().await;

        let references = context.references();
        assert_eq!(references.len(), CLASS_REFERENCES.len());

        let hero = context.reference("Hero").unwrap();
        assert_eq!(hero.target, RemoteRef::new("entities", "heroes.Hero"));
        let card = context.reference("Card").unwrap();
        assert_eq!(card.target, context.reference("CardCatalogue").unwrap().target);
        assert!(context.reference("NoSuchClass").is_none());

        context.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(matches!(
            EngineContext::connect(EngineConfig::default(), &addr).await,
            Err(BridgeError::IpcError(_))
        ));
    }

    #[tokio::test]
    async fn test_launch_missing_java_fails() {
        let config = EngineConfig {
            java: "/nonexistent/bin/java".into(),
            ..Default::default()
        };

        assert!(matches!(
            EngineContext::launch(config).await,
            Err(BridgeError::Launch(_))
        ));
    }
}
