//! SSH transport implementation using russh.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, trace};
use regex::bytes::Regex;
use russh::client::{self, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use super::buffer::PromptBuffer;
use super::{DialError, Session};
use crate::config::ConnectOptions;
use crate::error::{PlatformError, Result, TransportError};
use crate::inventory::{Credential, Device};
use crate::platform::PlatformCatalog;

/// How many bytes from the end of the buffer to search for prompts.
const SEARCH_DEPTH: usize = 1000;

/// Opens authenticated SSH sessions to fleet devices.
///
/// Prompt patterns are compiled once per platform at construction; a dial
/// only looks them up.
pub struct SshDialer {
    options: ConnectOptions,
    catalog: Arc<PlatformCatalog>,
    prompts: IndexMap<String, Arc<Regex>>,
}

impl SshDialer {
    /// Create a dialer for the platforms in `catalog`.
    pub fn new(options: ConnectOptions, catalog: Arc<PlatformCatalog>) -> Result<Self> {
        let mut prompts = IndexMap::new();
        for name in catalog.names() {
            let platform = catalog.get(name)?;
            let pattern = Regex::new(&platform.prompt_pattern).map_err(|e| {
                PlatformError::InvalidDefinition {
                    message: format!("bad prompt pattern for '{}': {}", name, e),
                }
            })?;
            prompts.insert(name.to_string(), Arc::new(pattern));
        }
        Ok(Self {
            options,
            catalog,
            prompts,
        })
    }
}

impl super::Dialer for SshDialer {
    type Session = SshSession;

    async fn dial(
        &self,
        device: &Device,
        credential: &Credential,
    ) -> std::result::Result<SshSession, DialError> {
        let timeout = self.options.timeout();
        let prompt = self
            .prompts
            .get(&device.platform)
            .cloned()
            .ok_or_else(|| {
                DialError::Other(
                    PlatformError::Unknown {
                        name: device.platform.clone(),
                    }
                    .into(),
                )
            })?;

        debug!("connecting to {} ({})", device.name, device.address);

        let config = Arc::new(client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        });

        let mut handle = tokio::time::timeout(
            timeout,
            client::connect(
                config,
                (device.address.as_str(), self.options.port),
                AcceptingHandler,
            ),
        )
        .await
        .map_err(|_| DialError::Timeout(timeout))?
        .map_err(|e| DialError::Other(TransportError::Ssh(e).into()))?;

        let auth = tokio::time::timeout(
            timeout,
            handle.authenticate_password(
                &credential.username,
                credential.password.expose_secret(),
            ),
        )
        .await
        .map_err(|_| DialError::Timeout(timeout))?
        .map_err(|e| DialError::Other(TransportError::Ssh(e).into()))?;

        if !auth.success() {
            debug!(
                "authentication rejected for {}@{}",
                credential.username, device.address
            );
            return Err(DialError::AuthFailed {
                user: credential.username.clone(),
            });
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| DialError::Other(TransportError::Ssh(e).into()))?;
        channel
            .request_pty(true, "xterm", 511, 24, 0, 0, &[])
            .await
            .map_err(|e| DialError::Other(TransportError::Ssh(e).into()))?;
        channel
            .request_shell(true)
            .await
            .map_err(|e| DialError::Other(TransportError::Ssh(e).into()))?;

        let mut session = SshSession {
            handle,
            channel,
            prompt,
            buffer: PromptBuffer::new(SEARCH_DEPTH),
            timeout,
        };

        // Drain the login banner up to the first prompt.
        session.wait_for_prompt().await.map_err(DialError::Other)?;

        let platform = self
            .catalog
            .get(&device.platform)
            .map_err(DialError::Other)?;
        for command in &platform.on_open_commands {
            session.run(command).await.map_err(DialError::Other)?;
        }

        debug!("session established to {}", device.name);
        Ok(session)
    }
}

/// A live SSH shell session to one device.
pub struct SshSession {
    handle: client::Handle<AcceptingHandler>,
    channel: Channel<Msg>,
    prompt: Arc<Regex>,
    buffer: PromptBuffer,
    timeout: std::time::Duration,
}

impl SshSession {
    /// Read channel data until the prompt pattern appears, then return
    /// everything read (prompt included) as text.
    async fn wait_for_prompt(&mut self) -> Result<String> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            if self.buffer.find_prompt(&self.prompt).is_some() {
                return Ok(self.buffer.take_string());
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| TransportError::PromptTimeout(self.timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => {
                    trace!("read {} bytes", data.len());
                    self.buffer.extend(data);
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(TransportError::Disconnected.into());
                }
                Some(_) => {}
            }
        }
    }

    /// Strip the command echo and the trailing prompt line from raw output.
    fn normalize(command: &str, raw: &str) -> String {
        let output = raw
            .strip_prefix(command)
            .unwrap_or(raw)
            .trim_start_matches(['\r', '\n']);

        match output.rfind('\n') {
            Some(pos) => output[..pos].to_string(),
            None => String::new(),
        }
    }
}

impl Session for SshSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        self.buffer.clear();

        let line = format!("{command}\n");
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(TransportError::Ssh)?;

        let raw = self.wait_for_prompt().await?;
        Ok(Self::normalize(command, &raw))
    }

    async fn close(self) -> Result<()> {
        // A failed EOF is irrelevant once the disconnect goes through.
        let _ = self.channel.eof().await;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Client handler that accepts any host key.
///
/// Fleet gear regenerates host keys on RMA and redeploy, so keys are not
/// pinned.
pub(crate) struct AcceptingHandler;

impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "show version\nCisco IOS Software\nuptime is 1 week\nrouter#";
        let normalized = SshSession::normalize("show version", raw);
        assert_eq!(normalized, "Cisco IOS Software\nuptime is 1 week");
    }

    #[test]
    fn test_normalize_prompt_only() {
        let normalized = SshSession::normalize("configure terminal", "configure terminal\nrouter(config)#");
        assert_eq!(normalized, "");
    }
}
