//! Persist and load [`DomainRecord`]s in a running directory.
//!
//! [`LdapEntryStore`] talks LDAP to a listener: every operation opens its own
//! connection, binds, runs one request and unbinds. Entries live at
//! `uid=<username>,ou=users,<base>`.

use crate::client::{ClientError, LdapClient};
use crate::dn::{Dn, user_dn};
use crate::entry::codec::{ATTR_CN, ATTR_SPECIAL};
use crate::entry::{Attributes, DomainRecord, decode, encode};
use crate::error::{EntryStoreError, StoreResult};
use crate::protocol::{Filter, LdapResult, ResultCode, SearchRequest, SearchScope};
use log::debug;
use std::future::Future;
use std::time::Duration;

/// Storage for domain records.
pub trait RecordStore {
    /// Store a new record. Fails with `AlreadyExists` when the username is taken.
    fn persist(&self, record: &DomainRecord) -> impl Future<Output = StoreResult<()>> + Send;

    /// Fetch the record stored for `username`.
    fn load(&self, username: &str) -> impl Future<Output = StoreResult<DomainRecord>> + Send;
}

/// A [`RecordStore`] backed by an LDAP server.
///
/// # Examples
///
/// ```rust,no_run
/// use embedded_directory::dn::Dn;
/// use embedded_directory::entry::DomainRecord;
/// use embedded_directory::entry_store::{LdapEntryStore, RecordStore};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LdapEntryStore::new(
///     "127.0.0.1:53389",
///     Dn::parse("dc=example,dc=com")?,
///     "uid=admin,ou=system",
///     "secret",
/// )
/// .with_timeout(Duration::from_secs(5));
///
/// store.persist(&DomainRecord::new("alice", "likes tea")).await?;
/// let alice = store.load("alice").await?;
/// assert_eq!(alice.special(), "likes tea");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LdapEntryStore {
    address: String,
    base: Dn,
    bind_dn: String,
    password: String,
    timeout: Option<Duration>,
}

impl LdapEntryStore {
    pub fn new(
        address: impl Into<String>,
        base: Dn,
        bind_dn: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            base,
            bind_dn: bind_dn.into(),
            password: password.into(),
            timeout: None,
        }
    }

    /// Give up on any single operation after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base(&self) -> &Dn {
        &self.base
    }

    async fn within_deadline<T>(
        &self,
        operation: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, operation)
                .await
                .map_err(|_| {
                    EntryStoreError::unreachable(format!(
                        "no answer from {} within {:?}",
                        self.address, timeout
                    ))
                })?,
            None => operation.await,
        }
    }

    async fn bound_client(&self) -> StoreResult<LdapClient> {
        let mut client = LdapClient::connect(&self.address).await.map_err(unreachable)?;
        let result = client
            .simple_bind(&self.bind_dn, &self.password)
            .await
            .map_err(unreachable)?;
        if !result.code.is_success() {
            return Err(rejected(result));
        }
        Ok(client)
    }

    async fn add(&self, record: &DomainRecord) -> StoreResult<()> {
        let entry = encode(record)?.relocate(&self.base);
        let mut client = self.bound_client().await?;
        let result = client.add(&entry).await.map_err(unreachable)?;
        close(client).await;

        match result.code {
            ResultCode::Success => {
                debug!("Persisted {}", entry.dn);
                Ok(())
            }
            ResultCode::EntryAlreadyExists => Err(EntryStoreError::AlreadyExists {
                dn: entry.dn.to_string(),
            }),
            _ => Err(rejected(result)),
        }
    }

    async fn fetch(&self, username: &str) -> StoreResult<DomainRecord> {
        let dn = user_dn(username)?.join(&self.base);
        let mut request = SearchRequest::new(
            dn.to_string(),
            SearchScope::BaseObject,
            Filter::present("objectClass"),
        );
        request.attributes = vec![ATTR_CN.to_string(), ATTR_SPECIAL.to_string()];

        let mut client = self.bound_client().await?;
        let response = client.search(request).await.map_err(unreachable)?;
        close(client).await;

        match response.result.code {
            ResultCode::Success => {}
            ResultCode::NoSuchObject => {
                return Err(EntryStoreError::NotFound { dn: dn.to_string() });
            }
            _ => return Err(rejected(response.result)),
        }
        let Some(found) = response.entries.into_iter().next() else {
            return Err(EntryStoreError::NotFound { dn: dn.to_string() });
        };
        Ok(decode(&Attributes::from(found.attributes))?)
    }
}

impl RecordStore for LdapEntryStore {
    fn persist(&self, record: &DomainRecord) -> impl Future<Output = StoreResult<()>> + Send {
        async move { self.within_deadline(self.add(record)).await }
    }

    fn load(&self, username: &str) -> impl Future<Output = StoreResult<DomainRecord>> + Send {
        async move { self.within_deadline(self.fetch(username)).await }
    }
}

async fn close(client: LdapClient) {
    if let Err(e) = client.unbind().await {
        debug!("Unbind failed: {}", e);
    }
}

fn unreachable(error: ClientError) -> EntryStoreError {
    EntryStoreError::unreachable(error.to_string())
}

fn rejected(result: LdapResult) -> EntryStoreError {
    EntryStoreError::Rejected {
        code: result.code,
        message: result.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MappingError;
    use tokio::net::TcpListener;

    fn store(address: &str) -> LdapEntryStore {
        LdapEntryStore::new(
            address,
            Dn::parse("dc=example,dc=com").unwrap(),
            "uid=admin,ou=system",
            "secret",
        )
    }

    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        address
    }

    #[tokio::test]
    async fn test_mapping_errors_come_before_any_connection() {
        let store = store(&closed_port().await);

        assert!(matches!(
            store.persist(&DomainRecord::new(" ", "x")).await,
            Err(EntryStoreError::Mapping(MappingError::InvalidIdentifier { .. }))
        ));
        assert!(matches!(
            store.persist(&DomainRecord::new("alice", "")).await,
            Err(EntryStoreError::Mapping(MappingError::Encoding { .. }))
        ));
        assert!(matches!(
            store.load("").await,
            Err(EntryStoreError::Mapping(MappingError::InvalidIdentifier { .. }))
        ));
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let store = store(&closed_port().await);

        assert!(matches!(
            store.persist(&DomainRecord::new("alice", "x")).await,
            Err(EntryStoreError::Unreachable { .. })
        ));
        assert!(matches!(
            store.load("alice").await,
            Err(EntryStoreError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_silent_server_hits_the_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        // Accept and hold the connection without ever answering.
        let holder = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let store = store(&address).with_timeout(Duration::from_millis(200));
        match store.load("alice").await {
            Err(EntryStoreError::Unreachable { message }) => assert!(message.contains("within")),
            other => panic!("expected Unreachable, got {other:?}"),
        }
        holder.abort();
    }
}
