//! Scripted fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backup::store::{SnapshotStore, filter_and_order};
use crate::connector::{ConnectOutcome, Connector};
use crate::error::{Result, StorageError, TransportError};
use crate::inventory::{Credential, Device, DeviceLevel, Inventory};
use crate::transport::Session;

pub(crate) fn test_device(name: &str, platform: &str, segment: &str) -> Device {
    Device {
        name: name.to_string(),
        address: format!("192.0.2.{}", name.len()),
        platform: platform.to_string(),
        level: DeviceLevel::Router,
        segment: segment.to_string(),
        credential: Credential::new("netops", "secret"),
    }
}

pub(crate) fn test_inventory() -> Inventory {
    Inventory::from_devices([
        test_device("R1", "cisco_ios", "core"),
        test_device("R2", "cisco_ios", "core"),
        test_device("SW1", "huawei_vrp", "office"),
    ])
}

/// Session answering from a canned command -> reply map.
pub(crate) struct ScriptedSession {
    replies: HashMap<String, String>,
    fail_on: Option<String>,
    transcript: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub fn new<'a>(replies: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::from_map(
            replies
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn from_map(replies: HashMap<String, String>) -> Self {
        Self {
            replies,
            fail_on: None,
            transcript: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail with a transport error when this command is run.
    pub fn failing_on(mut self, command: &str) -> Self {
        self.fail_on = Some(command.to_string());
        self
    }

    pub fn with_closed_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.closed = counter;
        self
    }

    /// Commands run so far, in order.
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().unwrap().clone()
    }
}

impl Session for ScriptedSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        self.transcript.lock().unwrap().push(command.to_string());
        if self.fail_on.as_deref() == Some(command) {
            return Err(TransportError::Disconnected.into());
        }
        Ok(self.replies.get(command).cloned().unwrap_or_default())
    }

    async fn close(self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// How a scripted connector treats one device.
pub(crate) enum DeviceBehavior {
    Unreachable,
    AuthFailed,
    /// Never resolves; exercises dispatch deadlines.
    Hang,
    Respond(HashMap<String, String>),
    RespondFailing {
        replies: HashMap<String, String>,
        fail_on: String,
    },
}

impl DeviceBehavior {
    pub fn respond<'a>(replies: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::Respond(
            replies
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn respond_failing<'a>(
        replies: impl IntoIterator<Item = (&'a str, &'a str)>,
        fail_on: &str,
    ) -> Self {
        Self::RespondFailing {
            replies: replies
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fail_on: fail_on.to_string(),
        }
    }
}

/// Connector with a scripted behavior per device name.
pub(crate) struct ScriptedConnector {
    behaviors: HashMap<String, DeviceBehavior>,
    closed_sessions: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, DeviceBehavior)>) -> Self {
        Self {
            behaviors: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            closed_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many sessions produced by this connector were closed.
    pub fn closed_count(&self) -> usize {
        self.closed_sessions.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self, device: &Device) -> ConnectOutcome<ScriptedSession> {
        match self.behaviors.get(&device.name) {
            None => ConnectOutcome::Failed(TransportError::Disconnected.into()),
            Some(DeviceBehavior::Unreachable) => ConnectOutcome::Unreachable,
            Some(DeviceBehavior::AuthFailed) => ConnectOutcome::AuthFailed,
            Some(DeviceBehavior::Hang) => std::future::pending().await,
            Some(DeviceBehavior::Respond(replies)) => ConnectOutcome::Connected(
                ScriptedSession::from_map(replies.clone())
                    .with_closed_counter(self.closed_sessions.clone()),
            ),
            Some(DeviceBehavior::RespondFailing { replies, fail_on }) => {
                ConnectOutcome::Connected(
                    ScriptedSession::from_map(replies.clone())
                        .failing_on(fail_on)
                        .with_closed_counter(self.closed_sessions.clone()),
                )
            }
        }
    }
}

/// In-memory snapshot store preserving insertion order.
pub(crate) struct MemoryStore {
    files: Mutex<Vec<(String, String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, segment: &str, filename: &str, content: &str) {
        self.files.lock().unwrap().push((
            segment.to_string(),
            filename.to_string(),
            content.to_string(),
        ));
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn content(&self, segment: &str, filename: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(s, f, _)| s == segment && f == filename)
            .map(|(_, _, c)| c.clone())
    }
}

impl SnapshotStore for MemoryStore {
    async fn list(&self, segment: &str, device: Option<&str>) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _, _)| s == segment)
            .map(|(_, f, _)| f.clone())
            .collect();
        Ok(filter_and_order(names, device))
    }

    async fn fetch(&self, segment: &str, filename: &str) -> Result<String> {
        self.content(segment, filename)
            .ok_or_else(|| {
                StorageError::Unavailable {
                    message: format!("{}/{} not found", segment, filename),
                }
                .into()
            })
    }

    async fn write(&self, segment: &str, filename: &str, content: &str) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        match files
            .iter_mut()
            .find(|(s, f, _)| s == segment && f == filename)
        {
            Some(existing) => existing.2 = content.to_string(),
            None => files.push((
                segment.to_string(),
                filename.to_string(),
                content.to_string(),
            )),
        }
        Ok(())
    }
}
