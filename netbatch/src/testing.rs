//! In-memory session provider and sleeper for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{Credentials, DeviceDescriptor};
use crate::connection::Sleeper;
use crate::error::{ConnectError, SessionError};
use crate::platform::PlatformDefinition;
use crate::session::{Session, SessionProvider};

#[derive(Clone)]
enum ConnectScript {
    Fail(ConnectError),
    FailFirst(u32, ConnectError),
    Slow(Duration),
    Hang,
    Panic,
}

#[derive(Default)]
struct FakeState {
    attempts: Mutex<HashMap<String, u32>>,
    opened: AtomicUsize,
    enables: AtomicUsize,
    closed: Mutex<Vec<String>>,
    commands: Mutex<Vec<(String, String)>>,
}

/// Scripted provider that counts attempts, opens, closes and commands.
#[derive(Clone, Default)]
pub(crate) struct FakeProvider {
    connect: HashMap<String, ConnectScript>,
    responses: HashMap<String, Result<String, SessionError>>,
    failing_enable: Vec<String>,
    panic_on: Option<String>,
    state: Arc<FakeState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every open of `device` fails with `error`.
    pub fn fail(mut self, device: &str, error: ConnectError) -> Self {
        self.connect.insert(device.to_string(), ConnectScript::Fail(error));
        self
    }

    /// The first `times` opens of `device` fail with `error`.
    pub fn fail_first(mut self, device: &str, times: u32, error: ConnectError) -> Self {
        self.connect
            .insert(device.to_string(), ConnectScript::FailFirst(times, error));
        self
    }

    /// Opens of `device` never complete.
    pub fn hang(mut self, device: &str) -> Self {
        self.connect.insert(device.to_string(), ConnectScript::Hang);
        self
    }

    /// Opens of `device` take `delay` before succeeding.
    pub fn slow(mut self, device: &str, delay: Duration) -> Self {
        self.connect.insert(device.to_string(), ConnectScript::Slow(delay));
        self
    }

    /// Opening `device` panics.
    pub fn panic_on_open(mut self, device: &str) -> Self {
        self.connect.insert(device.to_string(), ConnectScript::Panic);
        self
    }

    /// `enable()` fails on `device`.
    pub fn fail_enable(mut self, device: &str) -> Self {
        self.failing_enable.push(device.to_string());
        self
    }

    /// Output for `command` on every device.
    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.responses
            .insert(command.to_string(), Ok(output.to_string()));
        self
    }

    /// Error for `command` on every device.
    pub fn respond_err(mut self, command: &str, error: SessionError) -> Self {
        self.responses.insert(command.to_string(), Err(error));
        self
    }

    /// Running `command` panics.
    pub fn panic_on(mut self, command: &str) -> Self {
        self.panic_on = Some(command.to_string());
        self
    }

    pub fn attempts(&self, device: &str) -> u32 {
        lock(&self.state.attempts).get(device).copied().unwrap_or(0)
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn enables(&self) -> usize {
        self.state.enables.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        lock(&self.state.closed).len()
    }

    pub fn closed_for(&self, device: &str) -> usize {
        lock(&self.state.closed)
            .iter()
            .filter(|name| *name == device)
            .count()
    }

    /// Commands sent to `device`, in order.
    pub fn commands_for(&self, device: &str) -> Vec<String> {
        lock(&self.state.commands)
            .iter()
            .filter(|(name, _)| name == device)
            .map(|(_, command)| command.clone())
            .collect()
    }

    pub fn command_count(&self) -> usize {
        lock(&self.state.commands).len()
    }
}

impl SessionProvider for FakeProvider {
    type Session = FakeSession;

    async fn open(
        &self,
        device: &DeviceDescriptor,
        _credentials: &Credentials,
    ) -> Result<FakeSession, ConnectError> {
        let attempt = {
            let mut attempts = lock(&self.state.attempts);
            let count = attempts.entry(device.name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        match self.connect.get(&device.name) {
            Some(ConnectScript::Fail(error)) => return Err(error.clone()),
            Some(ConnectScript::FailFirst(times, error)) if attempt <= *times => {
                return Err(error.clone());
            }
            Some(ConnectScript::Slow(delay)) => tokio::time::sleep(*delay).await,
            Some(ConnectScript::Hang) => std::future::pending::<()>().await,
            Some(ConnectScript::Panic) => panic!("scripted panic opening '{}'", device.name),
            _ => {}
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            device: device.name.clone(),
            platform: device.vendor.platform(),
            enable_fails: self.failing_enable.contains(&device.name),
            provider: self.clone(),
        })
    }
}

/// Session handed out by [`FakeProvider`].
pub(crate) struct FakeSession {
    device: String,
    platform: &'static PlatformDefinition,
    enable_fails: bool,
    provider: FakeProvider,
}

impl Session for FakeSession {
    async fn run(&mut self, command: &str) -> Result<String, SessionError> {
        lock(&self.provider.state.commands).push((self.device.clone(), command.to_string()));

        if self.provider.panic_on.as_deref() == Some(command) {
            panic!("scripted panic on '{command}'");
        }

        self.provider
            .responses
            .get(command)
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }

    async fn enter_config_mode(&mut self) -> Result<String, SessionError> {
        self.run(self.platform.config_enter).await
    }

    async fn exit_config_mode(&mut self) -> Result<String, SessionError> {
        self.run(self.platform.config_exit).await
    }

    async fn enable(&mut self) -> Result<(), SessionError> {
        self.provider.state.enables.fetch_add(1, Ordering::SeqCst);
        if self.enable_fails {
            return Err(SessionError::Privilege("enable secret rejected".into()));
        }
        Ok(())
    }

    async fn close(self) -> Result<(), SessionError> {
        lock(&self.provider.state.closed).push(self.device);
        Ok(())
    }
}

/// Records requested delays and returns immediately.
#[derive(Clone, Default)]
pub(crate) struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.delays).clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.delays).push(duration);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
