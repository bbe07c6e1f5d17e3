//! Scripted in-memory devices for driving the executor and orchestrator.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use showgate::error::{ExecutionError, TransportError};
use showgate::{Connector, DeviceTarget, Route, Session};

/// What a device answers to one command.
#[derive(Debug, Clone)]
pub enum Reply {
    Output(String),
    Fail(String),
    Hang,
    Drop,
}

/// Behaviour of one scripted host. Unscripted commands echo `<command> output`.
#[derive(Debug, Clone, Default)]
pub struct HostScript {
    refuse: bool,
    connect_hangs: bool,
    replies: HashMap<String, Reply>,
    /// The session reports itself dead after this many commands.
    dies_after: Option<usize>,
    /// Recovery after a timeout leaves the session dead.
    unrecoverable: bool,
}

impl HostScript {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            connect_hangs: true,
            ..Self::default()
        }
    }

    pub fn reply(mut self, command: &str, reply: Reply) -> Self {
        self.replies.insert(command.to_string(), reply);
        self
    }

    pub fn unrecoverable(mut self) -> Self {
        self.unrecoverable = true;
        self
    }

    pub fn dies_after(mut self, commands: usize) -> Self {
        self.dies_after = Some(commands);
        self
    }
}

/// Counters shared by a connector and all of its sessions.
#[derive(Debug, Default)]
pub struct Stats {
    pub connects: AtomicUsize,
    pub opened: AtomicUsize,
    pub closes: AtomicUsize,
    pub recovers: AtomicUsize,
    active: AtomicUsize,
    pub peak_active: AtomicUsize,
    pub executed: Mutex<Vec<(String, String)>>,
    pub routes: Mutex<Vec<(String, String)>>,
}

impl Stats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn recovers(&self) -> usize {
        self.recovers.load(Ordering::SeqCst)
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<(String, String)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn route_of(&self, host: &str) -> Option<String> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(h, _)| h == host)
            .map(|(_, r)| r.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    scripts: HashMap<String, HostScript>,
    connect_delay: Option<Duration>,
    pub stats: Arc<Stats>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, hostname: &str, script: HostScript) -> Self {
        self.scripts.insert(hostname.to_string(), script);
        self
    }

    /// Sleep this long inside every connect.
    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }
}

impl Connector for MockConnector {
    type Session = MockSession;

    async fn open_session(
        &self,
        target: &DeviceTarget,
        route: &Route,
        _timeout: Duration,
    ) -> Result<MockSession, TransportError> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        self.stats
            .routes
            .lock()
            .unwrap()
            .push((target.hostname().to_string(), route.to_string()));

        let script = self.scripts.get(target.hostname()).cloned().unwrap_or_default();

        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_active.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if script.connect_hangs {
            std::future::pending::<()>().await;
        }
        if script.refuse {
            self.stats.active.fetch_sub(1, Ordering::SeqCst);
            return Err(TransportError::ConnectionFailed {
                host: target.hostname().to_string(),
                port: target.port(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            hostname: target.hostname().to_string(),
            script,
            executed: 0,
            alive: true,
            stats: Arc::clone(&self.stats),
        })
    }
}

pub struct MockSession {
    hostname: String,
    script: HostScript,
    executed: usize,
    alive: bool,
    stats: Arc<Stats>,
}

impl Session for MockSession {
    async fn execute(&mut self, command: &str, _timeout: Duration) -> Result<String, ExecutionError> {
        self.stats
            .executed
            .lock()
            .unwrap()
            .push((self.hostname.clone(), command.to_string()));
        self.executed += 1;
        if self.script.dies_after.is_some_and(|n| self.executed >= n) {
            self.alive = false;
        }

        match self.script.replies.get(command).cloned() {
            None => Ok(format!("{} output", command)),
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Fail(output)) => Err(ExecutionError::CommandFailed {
                message: "device reported '% Invalid input'".to_string(),
                output,
            }),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Drop) => {
                self.alive = false;
                Err(ExecutionError::Disconnected)
            }
        }
    }

    async fn recover(&mut self, _timeout: Duration) {
        self.stats.recovers.fetch_add(1, Ordering::SeqCst);
        if self.script.unrecoverable {
            self.alive = false;
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn close(self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn device_json(hostname: &str, os: &str) -> serde_json::Value {
    serde_json::json!({
        "hostname": hostname,
        "username": "admin",
        "password": "secret",
        "os": os,
    })
}
