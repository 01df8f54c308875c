//! In-process transport hub: per-connection senders, tenant broadcast groups,
//! and the `tenant:user` address index used for targeted sends.
//!
//! Each live WebSocket connection owns an unbounded mpsc receiver; its
//! connection loop drains frames onto the socket. A sender whose receiver is
//! gone just fails the send, which the hub treats as "connection already
//! closed" and skips.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// A frame queued for delivery on one connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubFrame {
    pub command: String,
    pub payload: Value,
}

impl HubFrame {
    pub fn new(command: &str, payload: &impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            command: command.to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

pub type FrameSender = mpsc::UnboundedSender<HubFrame>;

/// Shared hub state. `DashMap` gives shard-level concurrency; values are
/// plain sets mutated under the shard guard.
pub struct TransportHub {
    /// connection id → frame sender.
    senders: DashMap<String, FrameSender>,
    /// broadcast group key (tenant id) → member connection ids.
    groups: DashMap<String, HashSet<String>>,
    /// `tenant:user` address key → that user's connection ids.
    addresses: DashMap<String, HashSet<String>>,
}

impl TransportHub {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
            groups: DashMap::new(),
            addresses: DashMap::new(),
        }
    }

    /// Attach a connection's sender. Called once per transport session,
    /// before any registration side effects.
    pub fn connect(&self, connection_id: &str, sender: FrameSender) {
        self.senders.insert(connection_id.to_string(), sender);
    }

    /// Drop a connection's sender and sweep it out of every group and
    /// address set. Safe to call for connections that never registered.
    pub fn disconnect(&self, connection_id: &str) {
        self.senders.remove(connection_id);
        self.groups.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
        self.addresses.retain(|_, conns| {
            conns.remove(connection_id);
            !conns.is_empty()
        });
    }

    pub fn join_group(&self, group_key: &str, connection_id: &str) {
        self.groups
            .entry(group_key.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    pub fn leave_group(&self, group_key: &str, connection_id: &str) {
        if let Some(mut members) = self.groups.get_mut(group_key) {
            members.remove(connection_id);
        }
        self.groups.remove_if(group_key, |_, members| members.is_empty());
    }

    /// Index a connection under its user's `tenant:user` address key.
    pub fn bind_address(&self, address_key: &str, connection_id: &str) {
        self.addresses
            .entry(address_key.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    pub fn unbind_address(&self, address_key: &str, connection_id: &str) {
        if let Some(mut conns) = self.addresses.get_mut(address_key) {
            conns.remove(connection_id);
        }
        self.addresses.remove_if(address_key, |_, conns| conns.is_empty());
    }

    /// Send to every connection bound under an address key. Returns the
    /// number of live sends (zero when the user has no live connections).
    pub fn send_to_user(&self, address_key: &str, frame: &HubFrame) -> usize {
        let targets = match self.addresses.get(address_key) {
            Some(conns) => conns.iter().cloned().collect::<Vec<_>>(),
            None => return 0,
        };
        self.send_to_connections(&targets, frame)
    }

    /// Send to every member of a broadcast group.
    pub fn send_to_group(&self, group_key: &str, frame: &HubFrame) -> usize {
        let targets = match self.groups.get(group_key) {
            Some(members) => members.iter().cloned().collect::<Vec<_>>(),
            None => return 0,
        };
        self.send_to_connections(&targets, frame)
    }

    /// Send to an explicit connection-id list. Unknown or closed connections
    /// are skipped, not errors.
    pub fn send_to_connections(&self, connection_ids: &[String], frame: &HubFrame) -> usize {
        let mut delivered = 0;
        for connection_id in connection_ids {
            if let Some(sender) = self.senders.get(connection_id) {
                if sender.send(frame.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }
}

impl Default for TransportHub {
    fn default() -> Self {
        Self::new()
    }
}
