//! LDAPv3 message model (RFC 4511) and its BER encoding.
//!
//! Only the operations the harness serves are modelled in full. Requests for
//! other operations decode to [`ProtocolOp::Unsupported`] so the server can
//! answer them with `unwillingToPerform` in the matching response type.

use super::ber::{
    BerReader, BerWriter, ProtocolError, TAG_BOOLEAN, TAG_ENUMERATED, TAG_INTEGER,
    TAG_OCTET_STRING, TAG_SEQUENCE, TAG_SET, decode_integer, decode_string,
};
use std::fmt;

pub const BIND_REQUEST: u8 = 0x60;
pub const BIND_RESPONSE: u8 = 0x61;
pub const UNBIND_REQUEST: u8 = 0x42;
pub const SEARCH_REQUEST: u8 = 0x63;
pub const SEARCH_RESULT_ENTRY: u8 = 0x64;
pub const SEARCH_RESULT_DONE: u8 = 0x65;
pub const MODIFY_REQUEST: u8 = 0x66;
pub const MODIFY_RESPONSE: u8 = 0x67;
pub const ADD_REQUEST: u8 = 0x68;
pub const ADD_RESPONSE: u8 = 0x69;
pub const DEL_REQUEST: u8 = 0x4a;
pub const DEL_RESPONSE: u8 = 0x6b;
pub const MODIFY_DN_REQUEST: u8 = 0x6c;
pub const MODIFY_DN_RESPONSE: u8 = 0x6d;
pub const COMPARE_REQUEST: u8 = 0x6e;
pub const COMPARE_RESPONSE: u8 = 0x6f;
pub const ABANDON_REQUEST: u8 = 0x50;
pub const EXTENDED_REQUEST: u8 = 0x77;
pub const EXTENDED_RESPONSE: u8 = 0x78;

const AUTH_SIMPLE: u8 = 0x80;
const AUTH_SASL: u8 = 0xa3;

const FILTER_AND: u8 = 0xa0;
const FILTER_OR: u8 = 0xa1;
const FILTER_NOT: u8 = 0xa2;
const FILTER_EQUALITY: u8 = 0xa3;
const FILTER_SUBSTRINGS: u8 = 0xa4;
const FILTER_GREATER_OR_EQUAL: u8 = 0xa5;
const FILTER_LESS_OR_EQUAL: u8 = 0xa6;
const FILTER_PRESENT: u8 = 0x87;
const FILTER_APPROX: u8 = 0xa8;

const SUBSTRING_INITIAL: u8 = 0x80;
const SUBSTRING_ANY: u8 = 0x81;
const SUBSTRING_FINAL: u8 = 0x82;

/// Response tag paired with a request the server does not implement.
pub fn response_tag_for(request_tag: u8) -> Option<u8> {
    match request_tag {
        DEL_REQUEST => Some(DEL_RESPONSE),
        MODIFY_DN_REQUEST => Some(MODIFY_DN_RESPONSE),
        COMPARE_REQUEST => Some(COMPARE_RESPONSE),
        EXTENDED_REQUEST => Some(EXTENDED_RESPONSE),
        _ => None,
    }
}

/// LDAP result codes used by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    OperationsError,
    ProtocolError,
    TimeLimitExceeded,
    SizeLimitExceeded,
    AuthMethodNotSupported,
    NoSuchAttribute,
    UndefinedAttributeType,
    ConstraintViolation,
    AttributeOrValueExists,
    InvalidAttributeSyntax,
    NoSuchObject,
    InvalidDnSyntax,
    InappropriateAuthentication,
    InvalidCredentials,
    InsufficientAccessRights,
    Unavailable,
    UnwillingToPerform,
    NamingViolation,
    ObjectClassViolation,
    NotAllowedOnRdn,
    EntryAlreadyExists,
    Other,
    Unknown(u32),
}

const KNOWN_CODES: &[(ResultCode, u32, &str)] = &[
    (ResultCode::Success, 0, "success"),
    (ResultCode::OperationsError, 1, "operationsError"),
    (ResultCode::ProtocolError, 2, "protocolError"),
    (ResultCode::TimeLimitExceeded, 3, "timeLimitExceeded"),
    (ResultCode::SizeLimitExceeded, 4, "sizeLimitExceeded"),
    (ResultCode::AuthMethodNotSupported, 7, "authMethodNotSupported"),
    (ResultCode::NoSuchAttribute, 16, "noSuchAttribute"),
    (ResultCode::UndefinedAttributeType, 17, "undefinedAttributeType"),
    (ResultCode::ConstraintViolation, 19, "constraintViolation"),
    (ResultCode::AttributeOrValueExists, 20, "attributeOrValueExists"),
    (ResultCode::InvalidAttributeSyntax, 21, "invalidAttributeSyntax"),
    (ResultCode::NoSuchObject, 32, "noSuchObject"),
    (ResultCode::InvalidDnSyntax, 34, "invalidDNSyntax"),
    (ResultCode::InappropriateAuthentication, 48, "inappropriateAuthentication"),
    (ResultCode::InvalidCredentials, 49, "invalidCredentials"),
    (ResultCode::InsufficientAccessRights, 50, "insufficientAccessRights"),
    (ResultCode::Unavailable, 52, "unavailable"),
    (ResultCode::UnwillingToPerform, 53, "unwillingToPerform"),
    (ResultCode::NamingViolation, 64, "namingViolation"),
    (ResultCode::ObjectClassViolation, 65, "objectClassViolation"),
    (ResultCode::NotAllowedOnRdn, 67, "notAllowedOnRDN"),
    (ResultCode::EntryAlreadyExists, 68, "entryAlreadyExists"),
    (ResultCode::Other, 80, "other"),
];

impl ResultCode {
    /// Numeric value carried on the wire.
    pub fn code(self) -> u32 {
        if let Self::Unknown(code) = self {
            return code;
        }
        KNOWN_CODES
            .iter()
            .find(|(known, _, _)| *known == self)
            .map(|(_, code, _)| *code)
            .unwrap_or(80)
    }

    pub fn from_code(code: u32) -> Self {
        KNOWN_CODES
            .iter()
            .find(|(_, known, _)| *known == code)
            .map(|(result, _, _)| *result)
            .unwrap_or(Self::Unknown(code))
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    fn name(self) -> &'static str {
        KNOWN_CODES
            .iter()
            .find(|(known, _, _)| *known == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// One LDAP protocol data unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LdapMessage {
    pub id: i32,
    pub op: ProtocolOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolOp {
    BindRequest(BindRequest),
    BindResponse(LdapResult),
    UnbindRequest,
    SearchRequest(SearchRequest),
    SearchResultEntry(SearchResultEntry),
    SearchResultDone(LdapResult),
    ModifyRequest(ModifyRequest),
    ModifyResponse(LdapResult),
    AddRequest(AddRequest),
    AddResponse(LdapResult),
    AbandonRequest(i32),
    /// A request the harness does not implement.
    Unsupported { tag: u8 },
    /// A bare `LDAPResult` sent under an arbitrary response tag.
    GenericResponse { tag: u8, result: LdapResult },
}

impl ProtocolOp {
    /// Short operation name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BindRequest(_) => "bind",
            Self::BindResponse(_) => "bindResponse",
            Self::UnbindRequest => "unbind",
            Self::SearchRequest(_) => "search",
            Self::SearchResultEntry(_) => "searchResultEntry",
            Self::SearchResultDone(_) => "searchResultDone",
            Self::ModifyRequest(_) => "modify",
            Self::ModifyResponse(_) => "modifyResponse",
            Self::AddRequest(_) => "add",
            Self::AddResponse(_) => "addResponse",
            Self::AbandonRequest(_) => "abandon",
            Self::Unsupported { .. } => "unsupported",
            Self::GenericResponse { .. } => "response",
        }
    }

    fn encode(&self, w: &mut BerWriter) {
        match self {
            Self::BindRequest(request) => w.write_constructed(BIND_REQUEST, |w| request.encode(w)),
            Self::BindResponse(result) => w.write_constructed(BIND_RESPONSE, |w| result.encode(w)),
            Self::UnbindRequest => w.write_element(UNBIND_REQUEST, &[]),
            Self::SearchRequest(request) => {
                w.write_constructed(SEARCH_REQUEST, |w| request.encode(w))
            }
            Self::SearchResultEntry(entry) => {
                w.write_constructed(SEARCH_RESULT_ENTRY, |w| entry.encode(w))
            }
            Self::SearchResultDone(result) => {
                w.write_constructed(SEARCH_RESULT_DONE, |w| result.encode(w))
            }
            Self::ModifyRequest(request) => {
                w.write_constructed(MODIFY_REQUEST, |w| request.encode(w))
            }
            Self::ModifyResponse(result) => {
                w.write_constructed(MODIFY_RESPONSE, |w| result.encode(w))
            }
            Self::AddRequest(request) => w.write_constructed(ADD_REQUEST, |w| request.encode(w)),
            Self::AddResponse(result) => w.write_constructed(ADD_RESPONSE, |w| result.encode(w)),
            Self::AbandonRequest(id) => w.write_integer(ABANDON_REQUEST, *id as i64),
            Self::Unsupported { tag } => w.write_element(*tag, &[]),
            Self::GenericResponse { tag, result } => w.write_constructed(*tag, |w| result.encode(w)),
        }
    }

    fn decode(tag: u8, content: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = BerReader::new(content);
        let op = match tag {
            BIND_REQUEST => Self::BindRequest(BindRequest::decode(&mut reader)?),
            BIND_RESPONSE => Self::BindResponse(LdapResult::decode(&mut reader)?),
            UNBIND_REQUEST => Self::UnbindRequest,
            SEARCH_REQUEST => Self::SearchRequest(SearchRequest::decode(&mut reader)?),
            SEARCH_RESULT_ENTRY => Self::SearchResultEntry(SearchResultEntry::decode(&mut reader)?),
            SEARCH_RESULT_DONE => Self::SearchResultDone(LdapResult::decode(&mut reader)?),
            MODIFY_REQUEST => Self::ModifyRequest(ModifyRequest::decode(&mut reader)?),
            MODIFY_RESPONSE => Self::ModifyResponse(LdapResult::decode(&mut reader)?),
            ADD_REQUEST => Self::AddRequest(AddRequest::decode(&mut reader)?),
            ADD_RESPONSE => Self::AddResponse(LdapResult::decode(&mut reader)?),
            ABANDON_REQUEST => Self::AbandonRequest(to_i32(decode_integer(content)?)?),
            DEL_RESPONSE | MODIFY_DN_RESPONSE | COMPARE_RESPONSE | EXTENDED_RESPONSE => {
                Self::GenericResponse {
                    tag,
                    result: LdapResult::decode(&mut reader)?,
                }
            }
            other => Self::Unsupported { tag: other },
        };
        Ok(op)
    }
}

impl LdapMessage {
    pub fn new(id: i32, op: ProtocolOp) -> Self {
        Self { id, op }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BerWriter::new();
        writer.write_constructed(TAG_SEQUENCE, |w| {
            w.write_integer(TAG_INTEGER, self.id as i64);
            self.op.encode(w);
        });
        writer.into_bytes()
    }

    /// Decode one complete `LDAPMessage` frame. Request controls are ignored.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut outer = BerReader::new(frame);
        let mut message = outer.read_constructed(TAG_SEQUENCE)?;
        let id = to_i32(message.read_integer(TAG_INTEGER)?)?;
        let (tag, content) = message.read_element()?;
        let op = ProtocolOp::decode(tag, content)?;
        Ok(Self { id, op })
    }
}

/// The `LDAPResult` shared by every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapResult {
    pub code: ResultCode,
    pub matched_dn: String,
    pub message: String,
}

impl LdapResult {
    pub fn success() -> Self {
        Self::new(ResultCode::Success, "")
    }

    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            matched_dn: String::new(),
            message: message.into(),
        }
    }

    fn encode(&self, w: &mut BerWriter) {
        w.write_integer(TAG_ENUMERATED, self.code.code() as i64);
        w.write_octets(TAG_OCTET_STRING, self.matched_dn.as_bytes());
        w.write_octets(TAG_OCTET_STRING, self.message.as_bytes());
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        let code = u32::try_from(r.read_integer(TAG_ENUMERATED)?)
            .map_err(|_| ProtocolError::IntegerOverflow)?;
        Ok(Self {
            code: ResultCode::from_code(code),
            matched_dn: r.read_string(TAG_OCTET_STRING, "matchedDN")?,
            message: r.read_string(TAG_OCTET_STRING, "diagnosticMessage")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAuthentication {
    Simple(String),
    Sasl { mechanism: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub version: u8,
    pub name: String,
    pub authentication: BindAuthentication,
}

impl BindRequest {
    pub fn simple(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            version: 3,
            name: name.into(),
            authentication: BindAuthentication::Simple(password.into()),
        }
    }

    fn encode(&self, w: &mut BerWriter) {
        w.write_integer(TAG_INTEGER, self.version as i64);
        w.write_octets(TAG_OCTET_STRING, self.name.as_bytes());
        match &self.authentication {
            BindAuthentication::Simple(password) => w.write_octets(AUTH_SIMPLE, password.as_bytes()),
            BindAuthentication::Sasl { mechanism } => w.write_constructed(AUTH_SASL, |w| {
                w.write_octets(TAG_OCTET_STRING, mechanism.as_bytes())
            }),
        }
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        let version =
            u8::try_from(r.read_integer(TAG_INTEGER)?).map_err(|_| ProtocolError::IntegerOverflow)?;
        let name = r.read_string(TAG_OCTET_STRING, "bind name")?;
        let (tag, content) = r.read_element()?;
        let authentication = match tag {
            AUTH_SIMPLE => BindAuthentication::Simple(decode_string(content, "bind password")?),
            AUTH_SASL => BindAuthentication::Sasl {
                mechanism: BerReader::new(content).read_string(TAG_OCTET_STRING, "SASL mechanism")?,
            },
            other => {
                return Err(ProtocolError::malformed(
                    "bind request",
                    format!("unknown authentication choice 0x{other:02x}"),
                ));
            }
        };
        Ok(Self {
            version,
            name,
            authentication,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    BaseObject,
    SingleLevel,
    WholeSubtree,
}

impl SearchScope {
    fn code(self) -> i64 {
        match self {
            Self::BaseObject => 0,
            Self::SingleLevel => 1,
            Self::WholeSubtree => 2,
        }
    }

    fn from_code(code: i64) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Self::BaseObject),
            1 => Ok(Self::SingleLevel),
            2 => Ok(Self::WholeSubtree),
            other => Err(ProtocolError::malformed(
                "search request",
                format!("unknown scope {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub deref_aliases: u8,
    pub size_limit: i32,
    pub time_limit: i32,
    pub types_only: bool,
    pub filter: Filter,
    /// Requested attribute names; empty means all user attributes.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    pub fn new(base: impl Into<String>, scope: SearchScope, filter: Filter) -> Self {
        Self {
            base: base.into(),
            scope,
            deref_aliases: 0,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
            filter,
            attributes: Vec::new(),
        }
    }

    fn encode(&self, w: &mut BerWriter) {
        w.write_octets(TAG_OCTET_STRING, self.base.as_bytes());
        w.write_integer(TAG_ENUMERATED, self.scope.code());
        w.write_integer(TAG_ENUMERATED, self.deref_aliases as i64);
        w.write_integer(TAG_INTEGER, self.size_limit as i64);
        w.write_integer(TAG_INTEGER, self.time_limit as i64);
        w.write_bool(TAG_BOOLEAN, self.types_only);
        self.filter.encode(w);
        w.write_constructed(TAG_SEQUENCE, |w| {
            for attribute in &self.attributes {
                w.write_octets(TAG_OCTET_STRING, attribute.as_bytes());
            }
        });
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        let base = r.read_string(TAG_OCTET_STRING, "search base")?;
        let scope = SearchScope::from_code(r.read_integer(TAG_ENUMERATED)?)?;
        let deref_aliases = u8::try_from(r.read_integer(TAG_ENUMERATED)?)
            .map_err(|_| ProtocolError::IntegerOverflow)?;
        let size_limit = to_i32(r.read_integer(TAG_INTEGER)?)?;
        let time_limit = to_i32(r.read_integer(TAG_INTEGER)?)?;
        let types_only = r.read_bool(TAG_BOOLEAN)?;
        let filter = Filter::decode(r)?;

        let mut list = r.read_constructed(TAG_SEQUENCE)?;
        let mut attributes = Vec::new();
        while !list.is_empty() {
            attributes.push(list.read_string(TAG_OCTET_STRING, "attribute selector")?);
        }

        Ok(Self {
            base,
            scope,
            deref_aliases,
            size_limit,
            time_limit,
            types_only,
            filter,
            attributes,
        })
    }
}

/// Search filter (RFC 4511 section 4.5.1.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality(String, String),
    Substrings(SubstringFilter),
    GreaterOrEqual(String, String),
    LessOrEqual(String, String),
    Present(String),
    Approx(String, String),
    /// Extensible match and anything else the server does not evaluate.
    Unsupported { tag: u8, raw: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringFilter {
    pub attribute: String,
    pub initial: Option<String>,
    pub any: Vec<String>,
    pub final_value: Option<String>,
}

impl Filter {
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equality(attribute.into(), value.into())
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present(attribute.into())
    }

    fn encode(&self, w: &mut BerWriter) {
        match self {
            Self::And(filters) => w.write_constructed(FILTER_AND, |w| {
                filters.iter().for_each(|filter| filter.encode(w))
            }),
            Self::Or(filters) => w.write_constructed(FILTER_OR, |w| {
                filters.iter().for_each(|filter| filter.encode(w))
            }),
            Self::Not(filter) => w.write_constructed(FILTER_NOT, |w| filter.encode(w)),
            Self::Equality(attribute, value) => encode_assertion(w, FILTER_EQUALITY, attribute, value),
            Self::GreaterOrEqual(attribute, value) => {
                encode_assertion(w, FILTER_GREATER_OR_EQUAL, attribute, value)
            }
            Self::LessOrEqual(attribute, value) => {
                encode_assertion(w, FILTER_LESS_OR_EQUAL, attribute, value)
            }
            Self::Approx(attribute, value) => encode_assertion(w, FILTER_APPROX, attribute, value),
            Self::Present(attribute) => w.write_octets(FILTER_PRESENT, attribute.as_bytes()),
            Self::Substrings(substrings) => w.write_constructed(FILTER_SUBSTRINGS, |w| {
                w.write_octets(TAG_OCTET_STRING, substrings.attribute.as_bytes());
                w.write_constructed(TAG_SEQUENCE, |w| {
                    if let Some(initial) = &substrings.initial {
                        w.write_octets(SUBSTRING_INITIAL, initial.as_bytes());
                    }
                    for any in &substrings.any {
                        w.write_octets(SUBSTRING_ANY, any.as_bytes());
                    }
                    if let Some(final_value) = &substrings.final_value {
                        w.write_octets(SUBSTRING_FINAL, final_value.as_bytes());
                    }
                });
            }),
            Self::Unsupported { tag, raw } => w.write_element(*tag, raw),
        }
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        let (tag, content) = r.read_element()?;
        let mut inner = BerReader::new(content);
        let filter = match tag {
            FILTER_AND | FILTER_OR => {
                let mut filters = Vec::new();
                while !inner.is_empty() {
                    filters.push(Self::decode(&mut inner)?);
                }
                if tag == FILTER_AND {
                    Self::And(filters)
                } else {
                    Self::Or(filters)
                }
            }
            FILTER_NOT => Self::Not(Box::new(Self::decode(&mut inner)?)),
            FILTER_EQUALITY => {
                let (attribute, value) = decode_assertion(&mut inner)?;
                Self::Equality(attribute, value)
            }
            FILTER_GREATER_OR_EQUAL => {
                let (attribute, value) = decode_assertion(&mut inner)?;
                Self::GreaterOrEqual(attribute, value)
            }
            FILTER_LESS_OR_EQUAL => {
                let (attribute, value) = decode_assertion(&mut inner)?;
                Self::LessOrEqual(attribute, value)
            }
            FILTER_APPROX => {
                let (attribute, value) = decode_assertion(&mut inner)?;
                Self::Approx(attribute, value)
            }
            FILTER_PRESENT => Self::Present(decode_string(content, "present filter")?),
            FILTER_SUBSTRINGS => {
                let attribute = inner.read_string(TAG_OCTET_STRING, "substring attribute")?;
                let mut parts = inner.read_constructed(TAG_SEQUENCE)?;
                let mut substrings = SubstringFilter {
                    attribute,
                    initial: None,
                    any: Vec::new(),
                    final_value: None,
                };
                while !parts.is_empty() {
                    let (part_tag, part) = parts.read_element()?;
                    let value = decode_string(part, "substring value")?;
                    match part_tag {
                        SUBSTRING_INITIAL => substrings.initial = Some(value),
                        SUBSTRING_ANY => substrings.any.push(value),
                        SUBSTRING_FINAL => substrings.final_value = Some(value),
                        other => {
                            return Err(ProtocolError::malformed(
                                "substring filter",
                                format!("unknown component 0x{other:02x}"),
                            ));
                        }
                    }
                }
                Self::Substrings(substrings)
            }
            other => Self::Unsupported {
                tag: other,
                raw: content.to_vec(),
            },
        };
        Ok(filter)
    }
}

fn encode_assertion(w: &mut BerWriter, tag: u8, attribute: &str, value: &str) {
    w.write_constructed(tag, |w| {
        w.write_octets(TAG_OCTET_STRING, attribute.as_bytes());
        w.write_octets(TAG_OCTET_STRING, value.as_bytes());
    });
}

fn decode_assertion(r: &mut BerReader<'_>) -> Result<(String, String), ProtocolError> {
    Ok((
        r.read_string(TAG_OCTET_STRING, "assertion attribute")?,
        r.read_string(TAG_OCTET_STRING, "assertion value")?,
    ))
}

fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Renders the RFC 4515 string form.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(filters) | Self::Or(filters) => {
                let op = if matches!(self, Self::And(_)) { '&' } else { '|' };
                write!(f, "({op}")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Self::Not(filter) => write!(f, "(!{filter})"),
            Self::Equality(a, v) => write!(f, "({a}={})", escape_filter_value(v)),
            Self::GreaterOrEqual(a, v) => write!(f, "({a}>={})", escape_filter_value(v)),
            Self::LessOrEqual(a, v) => write!(f, "({a}<={})", escape_filter_value(v)),
            Self::Approx(a, v) => write!(f, "({a}~={})", escape_filter_value(v)),
            Self::Present(a) => write!(f, "({a}=*)"),
            Self::Substrings(s) => {
                write!(f, "({}=", s.attribute)?;
                if let Some(initial) = &s.initial {
                    write!(f, "{}", escape_filter_value(initial))?;
                }
                write!(f, "*")?;
                for any in &s.any {
                    write!(f, "{}*", escape_filter_value(any))?;
                }
                if let Some(final_value) = &s.final_value {
                    write!(f, "{}", escape_filter_value(final_value))?;
                }
                write!(f, ")")
            }
            Self::Unsupported { tag, .. } => write!(f, "(?0x{tag:02x})"),
        }
    }
}

/// An attribute description with its values, as carried in add requests,
/// modifications and search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialAttribute {
    pub name: String,
    pub values: Vec<String>,
}

impl PartialAttribute {
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn encode(&self, w: &mut BerWriter) {
        w.write_constructed(TAG_SEQUENCE, |w| {
            w.write_octets(TAG_OCTET_STRING, self.name.as_bytes());
            w.write_constructed(TAG_SET, |w| {
                for value in &self.values {
                    w.write_octets(TAG_OCTET_STRING, value.as_bytes());
                }
            });
        });
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        let mut attribute = r.read_constructed(TAG_SEQUENCE)?;
        let name = attribute.read_string(TAG_OCTET_STRING, "attribute description")?;
        let mut set = attribute.read_constructed(TAG_SET)?;
        let mut values = Vec::new();
        while !set.is_empty() {
            values.push(set.read_string(TAG_OCTET_STRING, "attribute value")?);
        }
        Ok(Self { name, values })
    }
}

fn encode_attribute_list(w: &mut BerWriter, attributes: &[PartialAttribute]) {
    w.write_constructed(TAG_SEQUENCE, |w| {
        attributes.iter().for_each(|attribute| attribute.encode(w))
    });
}

fn decode_attribute_list(r: &mut BerReader<'_>) -> Result<Vec<PartialAttribute>, ProtocolError> {
    let mut list = r.read_constructed(TAG_SEQUENCE)?;
    let mut attributes = Vec::new();
    while !list.is_empty() {
        attributes.push(PartialAttribute::decode(&mut list)?);
    }
    Ok(attributes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultEntry {
    pub dn: String,
    pub attributes: Vec<PartialAttribute>,
}

impl SearchResultEntry {
    fn encode(&self, w: &mut BerWriter) {
        w.write_octets(TAG_OCTET_STRING, self.dn.as_bytes());
        encode_attribute_list(w, &self.attributes);
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            dn: r.read_string(TAG_OCTET_STRING, "entry name")?,
            attributes: decode_attribute_list(r)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOperation {
    Add,
    Delete,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub operation: ModifyOperation,
    pub attribute: PartialAttribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    pub dn: String,
    pub changes: Vec<Modification>,
}

impl ModifyRequest {
    fn encode(&self, w: &mut BerWriter) {
        w.write_octets(TAG_OCTET_STRING, self.dn.as_bytes());
        w.write_constructed(TAG_SEQUENCE, |w| {
            for change in &self.changes {
                w.write_constructed(TAG_SEQUENCE, |w| {
                    let operation = match change.operation {
                        ModifyOperation::Add => 0,
                        ModifyOperation::Delete => 1,
                        ModifyOperation::Replace => 2,
                    };
                    w.write_integer(TAG_ENUMERATED, operation);
                    change.attribute.encode(w);
                });
            }
        });
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        let dn = r.read_string(TAG_OCTET_STRING, "modify target")?;
        let mut list = r.read_constructed(TAG_SEQUENCE)?;
        let mut changes = Vec::new();
        while !list.is_empty() {
            let mut change = list.read_constructed(TAG_SEQUENCE)?;
            let operation = match change.read_integer(TAG_ENUMERATED)? {
                0 => ModifyOperation::Add,
                1 => ModifyOperation::Delete,
                2 => ModifyOperation::Replace,
                other => {
                    return Err(ProtocolError::malformed(
                        "modify request",
                        format!("unknown operation {other}"),
                    ));
                }
            };
            changes.push(Modification {
                operation,
                attribute: PartialAttribute::decode(&mut change)?,
            });
        }
        Ok(Self { dn, changes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub dn: String,
    pub attributes: Vec<PartialAttribute>,
}

impl AddRequest {
    fn encode(&self, w: &mut BerWriter) {
        w.write_octets(TAG_OCTET_STRING, self.dn.as_bytes());
        encode_attribute_list(w, &self.attributes);
    }

    fn decode(r: &mut BerReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            dn: r.read_string(TAG_OCTET_STRING, "entry name")?,
            attributes: decode_attribute_list(r)?,
        })
    }
}

fn to_i32(value: i64) -> Result<i32, ProtocolError> {
    i32::try_from(value).map_err(|_| ProtocolError::IntegerOverflow)
}
