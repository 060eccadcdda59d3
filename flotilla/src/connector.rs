//! Session establishment with reachability gating and credential fallback.
//!
//! Fleets accumulate heterogeneous legacy credentials; the connector tries
//! the device's own credential first and walks the process-wide fallback
//! list only after an authentication rejection. Timeouts never trigger
//! credential retries, and an unreachable host never produces an
//! authentication attempt at all.

use std::future::Future;

use log::{debug, error, warn};

use crate::error::Error;
use crate::inventory::{Credential, Device};
use crate::probe::ReachabilityProbe;
use crate::transport::{DialError, Dialer, Session};

/// Tagged result of one connect attempt against one device.
///
/// The connector never hands out a partially-authenticated session; every
/// non-`Connected` variant means no session exists.
pub enum ConnectOutcome<S> {
    /// An authenticated session is open.
    Connected(S),

    /// The reachability pre-check failed; no connection was attempted.
    Unreachable,

    /// Every credential was rejected.
    AuthFailed,

    /// Transport-level failure (timeout, protocol error).
    Failed(Error),
}

/// Capability of opening sessions to devices.
///
/// [`SessionConnector`] is the production implementation; tests script
/// their own.
pub trait Connector: Send + Sync {
    /// Session type produced on success.
    type Session: Session + Send + 'static;

    /// Connect to one device.
    fn connect(
        &self,
        device: &Device,
    ) -> impl Future<Output = ConnectOutcome<Self::Session>> + Send;
}

/// Opens authenticated sessions with reachability gating and multi-credential
/// fallback.
pub struct SessionConnector<D, P> {
    dialer: D,
    probe: P,
    fallback: Vec<Credential>,
}

impl<D: Dialer, P: ReachabilityProbe> SessionConnector<D, P> {
    /// Create a connector.
    ///
    /// `fallback` is the process-wide alternate credential list, tried in
    /// order after an authentication rejection.
    pub fn new(dialer: D, probe: P, fallback: Vec<Credential>) -> Self {
        Self {
            dialer,
            probe,
            fallback,
        }
    }

    /// Connect to `device`, optionally overriding its primary credential.
    pub async fn connect_with(
        &self,
        device: &Device,
        credential_override: Option<&Credential>,
    ) -> ConnectOutcome<D::Session> {
        if !self.probe.is_reachable(&device.address).await {
            warn!(
                "device {} ({}) is unreachable",
                device.name, device.address
            );
            return ConnectOutcome::Unreachable;
        }

        let primary = credential_override.unwrap_or(&device.credential);
        match self.dialer.dial(device, primary).await {
            Ok(session) => return ConnectOutcome::Connected(session),
            Err(DialError::AuthFailed { user }) => {
                debug!("primary credential '{}' rejected by {}", user, device.name);
            }
            // Timeouts are not auth problems; do not touch the fallback list.
            Err(err) => return ConnectOutcome::Failed(err.into()),
        }

        for credential in &self.fallback {
            match self.dialer.dial(device, credential).await {
                Ok(session) => {
                    debug!(
                        "fallback credential '{}' accepted by {}",
                        credential.username, device.name
                    );
                    return ConnectOutcome::Connected(session);
                }
                Err(DialError::AuthFailed { .. }) => continue,
                Err(err) => return ConnectOutcome::Failed(err.into()),
            }
        }

        error!("all authentication attempts failed for {}", device.name);
        ConnectOutcome::AuthFailed
    }
}

impl<D: Dialer, P: ReachabilityProbe> Connector for SessionConnector<D, P> {
    type Session = D::Session;

    fn connect(
        &self,
        device: &Device,
    ) -> impl Future<Output = ConnectOutcome<Self::Session>> + Send {
        self.connect_with(device, None)
    }
}
