//! Typed ServerQuery client over a [`QueryTransport`].

use idlemove_core::types::Channel;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::transport::QueryTransport;
use crate::wire::{escape, field_str, field_u64, parse_fields};

/// One `clientlist` entry. `client_type` distinguishes regular voice
/// clients (0) from ServerQuery sessions (1) — the mover must never
/// relocate its own query connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub id: u64,
    pub channel_id: u64,
    pub nickname: String,
    pub client_type: u64,
}

impl ClientEntry {
    pub fn is_regular(&self) -> bool {
        self.client_type == 0
    }
}

/// Subset of `clientinfo` the poller consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub idle_time_ms: u64,
}

/// Identity of the query session itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoAmI {
    pub client_id: u64,
    pub channel_id: u64,
    pub nickname: String,
}

/// Stateful client over a single shared connection, used serially.
pub struct QueryClient<T: QueryTransport> {
    transport: T,
}

impl<T: QueryTransport> QueryClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Consume the client and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn login(&mut self, user: &str, password: &str) -> Result<(), QueryError> {
        let command = format!(
            "login client_login_name={} client_login_password={}",
            escape(user),
            escape(password)
        );
        self.transport.exec(&command)?;
        Ok(())
    }

    /// Select the virtual server to operate on.
    pub fn use_server(&mut self, server_id: u64) -> Result<(), QueryError> {
        self.transport.exec(&format!("use sid={server_id}"))?;
        Ok(())
    }

    pub fn set_nickname(&mut self, nickname: &str) -> Result<(), QueryError> {
        self.transport
            .exec(&format!("clientupdate client_nickname={}", escape(nickname)))?;
        Ok(())
    }

    pub fn whoami(&mut self) -> Result<WhoAmI, QueryError> {
        let lines = self.transport.exec("whoami")?;
        let line = lines
            .first()
            .ok_or(QueryError::Protocol("empty whoami response".into()))?;
        let fields = parse_fields(line);
        Ok(WhoAmI {
            client_id: field_u64(&fields, "client_id")?,
            channel_id: field_u64(&fields, "client_channel_id")?,
            nickname: field_str(&fields, "client_nickname")?.to_string(),
        })
    }

    pub fn channel_list(&mut self) -> Result<Vec<Channel>, QueryError> {
        let lines = self.transport.exec("channellist")?;
        let mut channels = Vec::new();
        for entry in lines.iter().flat_map(|line| line.split('|')) {
            let fields = parse_fields(entry);
            channels.push(Channel {
                id: field_u64(&fields, "cid")?,
                name: field_str(&fields, "channel_name")?.to_string(),
            });
        }
        Ok(channels)
    }

    pub fn client_list(&mut self) -> Result<Vec<ClientEntry>, QueryError> {
        let lines = self.transport.exec("clientlist")?;
        let mut clients = Vec::new();
        for entry in lines.iter().flat_map(|line| line.split('|')) {
            let fields = parse_fields(entry);
            clients.push(ClientEntry {
                id: field_u64(&fields, "clid")?,
                channel_id: field_u64(&fields, "cid")?,
                nickname: field_str(&fields, "client_nickname")?.to_string(),
                client_type: field_u64(&fields, "client_type")?,
            });
        }
        Ok(clients)
    }

    /// Fetch a client's status and extract its idle time. Missing or
    /// non-numeric `client_idle_time` is a per-client parse failure, not
    /// "not idle".
    pub fn client_info(&mut self, client_id: u64) -> Result<ClientStatus, QueryError> {
        let lines = self.transport.exec(&format!("clientinfo clid={client_id}"))?;
        let line = lines
            .first()
            .ok_or(QueryError::Protocol("empty clientinfo response".into()))?;
        let fields = parse_fields(line);
        Ok(ClientStatus {
            idle_time_ms: field_u64(&fields, "client_idle_time")?,
        })
    }

    pub fn move_client(&mut self, client_id: u64, channel_id: u64) -> Result<(), QueryError> {
        self.transport
            .exec(&format!("clientmove clid={client_id} cid={channel_id}"))?;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
