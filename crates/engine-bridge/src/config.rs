//! Engine launch configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine jar built by the server project
pub const ENGINE_JAR: &str = "net-1.3.0-all.jar";
/// Fiber instrumentation agent the engine needs at startup
pub const AGENT_JAR: &str = "quasar-core-0.7.9-jdk8.jar";
/// Entry point that starts the gateway inside the engine
pub const BRIDGE_APPLICATION: &str = "com.hiddenswitch.spellsource.applications.PythonBridge";

/// Configuration for launching and connecting to the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Java executable
    pub java: PathBuf,
    /// Engine jar, put on the classpath
    pub engine_jar: Option<PathBuf>,
    /// Java agent jar, loaded with `=mb`
    pub agent_jar: Option<PathBuf>,
    /// Maximum heap passed as `-Xmx`
    pub max_heap: String,
    /// Main class to run
    pub application: String,
    /// Host the gateway listens on
    pub host: String,
    /// Time allowed for the engine to report its port
    pub startup_timeout: Duration,
    /// Time allowed for the TCP connection and handshake
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let java = std::env::var_os("JAVA_HOME")
            .map(|home| PathBuf::from(home).join("bin").join("java"))
            .unwrap_or_else(|| PathBuf::from("java"));

        let engine_jar = std::env::var_os("CARDKIT_ENGINE_JAR")
            .map(PathBuf::from)
            .or_else(|| find_jar_path(ENGINE_JAR));
        let agent_jar = std::env::var_os("CARDKIT_AGENT_JAR")
            .map(PathBuf::from)
            .or_else(|| find_jar_path(AGENT_JAR));

        Self {
            java,
            engine_jar,
            agent_jar,
            max_heap: "2048m".into(),
            application: BRIDGE_APPLICATION.into(),
            host: "127.0.0.1".into(),
            startup_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Create config with an explicit engine jar
    pub fn with_jar(engine_jar: impl Into<PathBuf>) -> Self {
        Self {
            engine_jar: Some(engine_jar.into()),
            ..Default::default()
        }
    }

    /// Arguments passed to the Java executable
    ///
    /// The trailing `0` asks the engine to bind any free port and print it.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(agent) = &self.agent_jar {
            args.push(format!("-javaagent:{}=mb", agent.display()));
        }
        args.push(format!("-Xmx{}", self.max_heap));
        if let Some(jar) = &self.engine_jar {
            args.push("-cp".into());
            args.push(jar.display().to_string());
        }
        args.push(self.application.clone());
        args.push("0".into());
        args
    }
}

/// Places a jar is looked for, in order
fn candidate_paths(jar_file: &str) -> Vec<PathBuf> {
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    let prefix = std::env::var_os("PREFIX")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/usr/local"));

    vec![
        PathBuf::from(jar_file),
        here.join("../net/build/libs").join(jar_file),
        here.join("../net/lib").join(jar_file),
        here.join("../share/spellsource").join(jar_file),
        prefix.join("share/spellsource").join(jar_file),
        here.join("../../../../share/spellsource").join(jar_file),
    ]
}

/// Find a jar in the usual build and install locations
pub fn find_jar_path(jar_file: &str) -> Option<PathBuf> {
    candidate_paths(jar_file).into_iter().find(|path| path.exists())
}
