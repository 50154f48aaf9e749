//! LDAPv3 wire protocol: BER primitives, the message model and the framing
//! codec shared by the listener and the client.

pub mod ber;
pub mod codec;
pub mod message;

pub use ber::ProtocolError;
pub use codec::LdapCodec;
pub use message::{
    AddRequest, BindAuthentication, BindRequest, Filter, LdapMessage, LdapResult, Modification,
    ModifyOperation, ModifyRequest, PartialAttribute, ProtocolOp, ResultCode, SearchRequest,
    SearchResultEntry, SearchScope, SubstringFilter,
};
