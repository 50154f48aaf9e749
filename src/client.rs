//! Minimal asynchronous LDAP client.
//!
//! Just enough of a client for the entry store and the schema import pass:
//! simple bind, add, modify, search and unbind, one outstanding request at a
//! time. Non-success result codes are returned as [`LdapResult`]s, not errors;
//! [`ClientError`] covers transport and protocol failures only.

use crate::entry::DirectoryEntry;
use crate::protocol::{
    AddRequest, BindRequest, LdapCodec, LdapMessage, LdapResult, Modification, ModifyRequest,
    ProtocolError, ProtocolOp, SearchRequest, SearchResultEntry,
};
use futures::{SinkExt, StreamExt};
use log::debug;
use std::io;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// Transport-level client failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Connection closed by the server")]
    ConnectionClosed,

    /// The server sent a notice of disconnection.
    #[error("Server disconnected: {}: {}", .0.code, .0.message)]
    Disconnected(LdapResult),

    #[error("Expected {expected} for message #{id}, received {found}")]
    UnexpectedResponse {
        id: i32,
        expected: &'static str,
        found: &'static str,
    },
}

/// Entries and final result of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub entries: Vec<SearchResultEntry>,
    pub result: LdapResult,
}

/// A single LDAP connection.
#[derive(Debug)]
pub struct LdapClient {
    framed: Framed<TcpStream, LdapCodec>,
    next_id: i32,
}

impl LdapClient {
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| ClientError::Connect {
                address: address.to_string(),
                source,
            })?;
        debug!("Connected to LDAP server at {}", address);
        Ok(Self {
            framed: Framed::new(stream, LdapCodec::new()),
            next_id: 1,
        })
    }

    pub async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<LdapResult, ClientError> {
        let id = self
            .send(ProtocolOp::BindRequest(BindRequest::simple(dn, password)))
            .await?;
        match self.receive(id).await? {
            ProtocolOp::BindResponse(result) => Ok(result),
            other => Err(unexpected(id, "BindResponse", &other)),
        }
    }

    pub async fn add(&mut self, entry: &DirectoryEntry) -> Result<LdapResult, ClientError> {
        let request = AddRequest {
            dn: entry.dn.to_string(),
            attributes: entry.attributes.to_partial_attributes(),
        };
        let id = self.send(ProtocolOp::AddRequest(request)).await?;
        match self.receive(id).await? {
            ProtocolOp::AddResponse(result) => Ok(result),
            other => Err(unexpected(id, "AddResponse", &other)),
        }
    }

    pub async fn modify(
        &mut self,
        dn: &str,
        changes: Vec<Modification>,
    ) -> Result<LdapResult, ClientError> {
        let request = ModifyRequest {
            dn: dn.to_string(),
            changes,
        };
        let id = self.send(ProtocolOp::ModifyRequest(request)).await?;
        match self.receive(id).await? {
            ProtocolOp::ModifyResponse(result) => Ok(result),
            other => Err(unexpected(id, "ModifyResponse", &other)),
        }
    }

    /// Collect every entry up to the final `SearchResultDone`.
    pub async fn search(&mut self, request: SearchRequest) -> Result<SearchResponse, ClientError> {
        let id = self.send(ProtocolOp::SearchRequest(request)).await?;
        let mut entries = Vec::new();
        loop {
            match self.receive(id).await? {
                ProtocolOp::SearchResultEntry(entry) => entries.push(entry),
                ProtocolOp::SearchResultDone(result) => {
                    return Ok(SearchResponse { entries, result });
                }
                other => return Err(unexpected(id, "SearchResultEntry", &other)),
            }
        }
    }

    /// Send an unbind and close the connection.
    pub async fn unbind(mut self) -> Result<(), ClientError> {
        self.send(ProtocolOp::UnbindRequest).await?;
        self.framed.close().await?;
        Ok(())
    }

    async fn send(&mut self, op: ProtocolOp) -> Result<i32, ClientError> {
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        self.framed.send(LdapMessage::new(id, op)).await?;
        Ok(id)
    }

    async fn receive(&mut self, id: i32) -> Result<ProtocolOp, ClientError> {
        let message = self
            .framed
            .next()
            .await
            .ok_or(ClientError::ConnectionClosed)??;

        if message.id == 0
            && let ProtocolOp::GenericResponse { result, .. } = message.op
        {
            return Err(ClientError::Disconnected(result));
        }
        if message.id != id {
            return Err(ClientError::UnexpectedResponse {
                id,
                expected: "a response",
                found: message.op.name(),
            });
        }
        Ok(message.op)
    }
}

fn unexpected(id: i32, expected: &'static str, found: &ProtocolOp) -> ClientError {
    ClientError::UnexpectedResponse {
        id,
        expected,
        found: found.name(),
    }
}
