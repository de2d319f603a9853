//! Connection-per-call TCP server.
//!
//! The accept loop is serial by design: accept, read one JSON request,
//! handle, write one JSON response, close. Durable state lives behind
//! [`UserStore`]; shutdown is a cooperative token checked between accepts,
//! not a process-wide signal.

mod handlers;
mod store;

pub use handlers::Engine;
pub use store::UserStore;

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::crypto::kdf::KdfParams;
use crate::error::Result;
use crate::mnemonic::WordList;
use crate::protocol::{Request, Response};

/// How long the accept loop sleeps between polls when idle.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8080`. Port 0 picks a free port.
    pub bind_addr: String,
    /// The credential record file.
    pub users_file: PathBuf,
    /// Directory of per-user `<login>.vault` blobs.
    pub vault_dir: PathBuf,
    /// The 2048-word mnemonic dictionary.
    pub wordlist: PathBuf,
    pub kdf: KdfParams,
}

/// Cooperative stop signal shared between the accept loop and whoever
/// delivers shutdown (a ctrl-c handler, a test).
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Server {
    listener: TcpListener,
    engine: Engine,
    shutdown: ShutdownToken,
}

impl Server {
    /// Load the word list, open the store, and bind the listener. A missing
    /// or short dictionary fails here, before any client is accepted.
    pub fn bind(config: ServerConfig, shutdown: ShutdownToken) -> Result<Self> {
        let words = WordList::load(&config.wordlist)?;
        let store = UserStore::open(config.users_file, config.vault_dir)?;
        let engine = Engine::new(store, words, config.kdf);

        let listener = TcpListener::bind(&config.bind_addr)?;
        // Non-blocking accept so the shutdown token is polled while idle.
        listener.set_nonblocking(true)?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        Ok(Self {
            listener,
            engine,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the shutdown token fires. One client at a time; a
    /// failing client is logged and answered, never fatal to the loop.
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(error) = self.serve_client(stream) {
                        tracing::warn!(%peer, %error, "client connection failed");
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(error) => {
                    tracing::warn!(%error, "accept failed");
                }
            }
        }
        tracing::info!("shutdown requested, accept loop stopped");
        Ok(())
    }

    /// One full request/response exchange. The client half-closes its write
    /// side after sending, so the request is read to EOF.
    fn serve_client(&self, mut stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw)?;

        let response = match serde_json::from_slice::<Request>(&raw) {
            Ok(request) => self.engine.handle(request),
            Err(error) => {
                tracing::warn!(%error, "malformed request");
                Response::error(format!("malformed request: {error}"))
            }
        };

        stream.write_all(&serde_json::to_vec(&response)?)?;
        let _ = stream.shutdown(Shutdown::Write);
        Ok(())
    }
}
