//! Sessions: a principal plus a handle on the directory service.

use super::core::DirectoryService;
use super::errors::OperationResult;
use super::operations::SearchOutcome;
use crate::auth::BindState;
use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::protocol::{Modification, SearchRequest};

/// An in-process session. Connections hold one each; the administrative
/// session used for context entries and LDIF import is another.
#[derive(Debug, Clone)]
pub struct CoreSession {
    service: DirectoryService,
    principal: BindState,
}

impl CoreSession {
    pub fn new(service: DirectoryService, principal: BindState) -> Self {
        Self { service, principal }
    }

    pub fn principal(&self) -> &BindState {
        &self.principal
    }

    pub fn service(&self) -> &DirectoryService {
        &self.service
    }

    /// Re-bind. A failed bind leaves the session anonymous.
    pub fn bind(&mut self, name: &str, password: &str) -> OperationResult<()> {
        self.principal = BindState::Anonymous;
        self.principal = self.service.bind(name, password)?;
        Ok(())
    }

    pub fn add(&self, entry: DirectoryEntry) -> OperationResult<()> {
        self.service.add(&self.principal, entry)
    }

    pub fn modify(&self, dn: &Dn, changes: &[Modification]) -> OperationResult<()> {
        self.service.modify(&self.principal, dn, changes)
    }

    pub fn search(&self, request: &SearchRequest) -> OperationResult<SearchOutcome> {
        self.service.search(&self.principal, request)
    }

    pub fn lookup(&self, dn: &Dn) -> OperationResult<Option<DirectoryEntry>> {
        self.service.lookup(dn)
    }

    pub fn exists(&self, dn: &Dn) -> OperationResult<bool> {
        self.service.exists(dn)
    }
}
