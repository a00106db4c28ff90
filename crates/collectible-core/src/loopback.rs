//! In-process replication hub.
//!
//! [`LoopbackHub`] stands in for the network transport. Every dispatched
//! frame is appended to the hub's history and queued for every connected
//! peer, the sender included, so each peer sees each sender's frames in
//! dispatch order. A peer that joins late first receives the whole history,
//! then live frames.
//!
//! The hub can be told to deliver every frame twice to exercise receiver
//! deduplication.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use collectible_types::PeerId;
use tracing::{debug, info};

use crate::ports::{ActionChannel, ChannelError};

#[derive(Debug, Default)]
struct HubInner {
    history: Vec<Vec<u8>>,
    inboxes: BTreeMap<PeerId, VecDeque<Vec<u8>>>,
    authority: Option<PeerId>,
    redeliver: bool,
}

/// Shared in-memory hub. Cloning yields another handle to the same hub.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LoopbackHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hub that delivers every frame twice.
    pub fn with_redelivery() -> Self {
        let hub = Self::new();
        if let Ok(mut inner) = hub.inner.lock() {
            inner.redeliver = true;
        }
        hub
    }

    /// Connect a new peer. Its inbox starts with the full frame history.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::AuthorityTaken`] if `authority` is requested
    /// while another peer holds it, or [`ChannelError::HubUnavailable`] if
    /// the hub lock is poisoned.
    pub fn join(&self, authority: bool) -> Result<LoopbackChannel, ChannelError> {
        let mut inner = self.lock()?;
        let peer = PeerId::new();

        if authority {
            if let Some(existing) = inner.authority {
                return Err(ChannelError::AuthorityTaken { existing });
            }
            inner.authority = Some(peer);
        }

        let backlog: VecDeque<Vec<u8>> = inner.history.iter().cloned().collect();
        info!(
            %peer,
            authority,
            backlog = backlog.len(),
            "Peer joined replication hub"
        );
        inner.inboxes.insert(peer, backlog);

        Ok(LoopbackChannel {
            hub: self.clone(),
            peer,
            authority,
        })
    }

    /// Disconnect a peer. Its undelivered frames are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::HubUnavailable`] if the hub lock is poisoned.
    pub fn leave(&self, peer: PeerId) -> Result<(), ChannelError> {
        let mut inner = self.lock()?;
        inner.inboxes.remove(&peer);
        if inner.authority == Some(peer) {
            inner.authority = None;
        }
        info!(%peer, "Peer left replication hub");
        Ok(())
    }

    /// Number of frames dispatched so far.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::HubUnavailable`] if the hub lock is poisoned.
    pub fn history_len(&self) -> Result<usize, ChannelError> {
        Ok(self.lock()?.history.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HubInner>, ChannelError> {
        self.inner
            .lock()
            .map_err(|poison| ChannelError::HubUnavailable {
                reason: poison.to_string(),
            })
    }
}

/// One peer's connection to a [`LoopbackHub`].
#[derive(Debug)]
pub struct LoopbackChannel {
    hub: LoopbackHub,
    peer: PeerId,
    authority: bool,
}

impl ActionChannel for LoopbackChannel {
    fn peer_id(&self) -> PeerId {
        self.peer
    }

    fn is_authority(&self) -> bool {
        self.authority
    }

    fn dispatch(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
        let mut inner = self.hub.lock()?;
        if !inner.inboxes.contains_key(&self.peer) {
            return Err(ChannelError::Disconnected { peer: self.peer });
        }

        let copies = if inner.redeliver { 2 } else { 1 };
        for inbox in inner.inboxes.values_mut() {
            for _ in 0..copies {
                inbox.push_back(frame.clone());
            }
        }
        debug!(peer = %self.peer, bytes = frame.len(), "Frame broadcast");
        inner.history.push(frame);
        Ok(())
    }

    fn drain_inbound(&mut self) -> Result<Vec<Vec<u8>>, ChannelError> {
        let mut inner = self.hub.lock()?;
        let inbox = inner
            .inboxes
            .get_mut(&self.peer)
            .ok_or(ChannelError::Disconnected { peer: self.peer })?;
        Ok(inbox.drain(..).collect())
    }
}
