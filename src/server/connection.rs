//! One LDAP connection: decode requests, run them against a session, encode
//! the responses.

use super::core::DirectoryService;
use super::errors::{OperationError, OperationResult};
use super::session::CoreSession;
use crate::dn::Dn;
use crate::entry::{Attributes, DirectoryEntry};
use crate::protocol::message::{EXTENDED_RESPONSE, response_tag_for};
use crate::protocol::{
    BindAuthentication, BindRequest, LdapCodec, LdapMessage, LdapResult, PartialAttribute,
    ProtocolOp, ResultCode, SearchRequest, SearchResultEntry,
};
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

enum Reply {
    Messages(Vec<LdapMessage>),
    /// The client unbound.
    Close,
    /// Send a notice of disconnection, then close.
    Disconnect(LdapResult),
}

pub(super) struct Connection {
    framed: Framed<TcpStream, LdapCodec>,
    peer: SocketAddr,
    session: CoreSession,
}

impl Connection {
    pub(super) fn new(stream: TcpStream, peer: SocketAddr, service: DirectoryService) -> Self {
        Self {
            framed: Framed::new(stream, LdapCodec::new()),
            peer,
            session: service.session(),
        }
    }

    pub(super) async fn run(mut self, shutdown: CancellationToken) {
        debug!("Connection from {} opened", self.peer);
        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => break,
                frame = self.framed.next() => frame,
            };

            let message = match frame {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!("Dropping connection from {}: {}", self.peer, e);
                    let notice = LdapResult::new(ResultCode::ProtocolError, e.to_string());
                    self.send_notice(notice).await;
                    break;
                }
                None => break,
            };

            debug!("{} #{} {}", self.peer, message.id, message.op.name());
            match self.dispatch(message) {
                Reply::Messages(replies) => {
                    if let Err(e) = self.send_all(replies).await {
                        warn!("Failed to answer {}: {}", self.peer, e);
                        break;
                    }
                }
                Reply::Close => break,
                Reply::Disconnect(notice) => {
                    self.send_notice(notice).await;
                    break;
                }
            }
        }
        debug!("Connection from {} closed", self.peer);
    }

    /// The peer may already be gone, so a failed send is only logged.
    async fn send_notice(&mut self, notice: LdapResult) {
        if let Err(e) = self.framed.send(notice_of_disconnection(notice)).await {
            debug!("Could not send notice of disconnection to {}: {}", self.peer, e);
        }
    }

    async fn send_all(&mut self, replies: Vec<LdapMessage>) -> Result<(), crate::protocol::ProtocolError> {
        for reply in replies {
            self.framed.feed(reply).await?;
        }
        self.framed.flush().await
    }

    fn dispatch(&mut self, message: LdapMessage) -> Reply {
        let id = message.id;
        let single = |op| Reply::Messages(vec![LdapMessage::new(id, op)]);

        match message.op {
            ProtocolOp::BindRequest(request) => single(ProtocolOp::BindResponse(self.bind(request))),
            ProtocolOp::UnbindRequest => Reply::Close,
            ProtocolOp::SearchRequest(request) => Reply::Messages(self.search(id, &request)),
            ProtocolOp::ModifyRequest(request) => {
                let outcome = Dn::parse(&request.dn)
                    .map_err(OperationError::from)
                    .and_then(|dn| self.session.modify(&dn, &request.changes));
                single(ProtocolOp::ModifyResponse(to_ldap_result(outcome)))
            }
            ProtocolOp::AddRequest(request) => {
                let outcome = Dn::parse(&request.dn)
                    .map_err(OperationError::from)
                    .and_then(|dn| {
                        self.session.add(DirectoryEntry {
                            dn,
                            attributes: Attributes::from(request.attributes),
                        })
                    });
                single(ProtocolOp::AddResponse(to_ldap_result(outcome)))
            }
            ProtocolOp::AbandonRequest(_) => Reply::Messages(Vec::new()),
            ProtocolOp::Unsupported { tag } => match response_tag_for(tag) {
                Some(response_tag) => single(ProtocolOp::GenericResponse {
                    tag: response_tag,
                    result: LdapResult::new(
                        ResultCode::UnwillingToPerform,
                        "Operation not supported by this server",
                    ),
                }),
                None => Reply::Disconnect(LdapResult::new(
                    ResultCode::ProtocolError,
                    format!("Unknown protocol operation 0x{tag:02x}"),
                )),
            },
            other => Reply::Disconnect(LdapResult::new(
                ResultCode::ProtocolError,
                format!("Unexpected {} from client", other.name()),
            )),
        }
    }

    fn bind(&mut self, request: BindRequest) -> LdapResult {
        if request.version != 3 {
            return LdapResult::new(ResultCode::ProtocolError, "Only LDAPv3 is supported");
        }
        match request.authentication {
            BindAuthentication::Simple(password) => {
                to_ldap_result(self.session.bind(&request.name, &password))
            }
            BindAuthentication::Sasl { mechanism } => LdapResult::new(
                ResultCode::AuthMethodNotSupported,
                format!("SASL mechanism '{mechanism}' is not supported"),
            ),
        }
    }

    fn search(&self, id: i32, request: &SearchRequest) -> Vec<LdapMessage> {
        let outcome = match self.session.search(request) {
            Ok(outcome) => outcome,
            Err(e) => {
                return vec![LdapMessage::new(
                    id,
                    ProtocolOp::SearchResultDone(e.to_ldap_result()),
                )];
            }
        };

        let mut replies: Vec<_> = outcome
            .entries
            .into_iter()
            .map(|entry| {
                let attributes = entry
                    .attributes
                    .iter()
                    .map(|attribute| {
                        let values = if request.types_only {
                            Vec::new()
                        } else {
                            attribute.values.clone()
                        };
                        PartialAttribute::new(attribute.name.clone(), values)
                    })
                    .collect();
                LdapMessage::new(
                    id,
                    ProtocolOp::SearchResultEntry(SearchResultEntry {
                        dn: entry.dn.to_string(),
                        attributes,
                    }),
                )
            })
            .collect();

        let done = if outcome.size_limit_exceeded {
            LdapResult::new(ResultCode::SizeLimitExceeded, "Size limit exceeded")
        } else {
            LdapResult::success()
        };
        replies.push(LdapMessage::new(id, ProtocolOp::SearchResultDone(done)));
        replies
    }
}

fn to_ldap_result(outcome: OperationResult<()>) -> LdapResult {
    match outcome {
        Ok(()) => LdapResult::success(),
        Err(e) => {
            debug!("Operation failed: {}", e);
            e.to_ldap_result()
        }
    }
}

/// Unsolicited notification (message id 0) that the server is closing the
/// connection.
fn notice_of_disconnection(result: LdapResult) -> LdapMessage {
    LdapMessage::new(
        0,
        ProtocolOp::GenericResponse {
            tag: EXTENDED_RESPONSE,
            result,
        },
    )
}
