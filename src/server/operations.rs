//! Directory operations: bind, add, modify, search and lookup.
//!
//! Every operation takes the principal it runs as. Reads are open to anonymous
//! sessions; writes require an authenticated bind.

use super::core::{ChangeKind, DirectoryService};
use super::errors::{OperationError, OperationResult};
use super::filter::{indexable_equality, matches};
use super::schema_check::{
    add_rdn_attributes, canonicalize_names, check_entry, check_rdn_values, stored_name,
};
use super::subschema::{root_dse, subschema_dn, subschema_entry};
use crate::auth::{BindState, verify_password};
use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::partition::Partition;
use crate::protocol::{Modification, ModifyOperation, SearchRequest, SearchScope};
use crate::schema::{SchemaDefinition, SchemaRegistry};
use crate::schema::parser::{parse_attribute_type, parse_object_class};
use crate::error::SchemaError;
use log::{debug, info};

/// Generalized time as written to `createTimestamp` / `modifyTimestamp`.
const GENERALIZED_TIME: &str = "%Y%m%d%H%M%SZ";

/// Entries found by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub entries: Vec<DirectoryEntry>,
    /// More entries matched than the request's size limit allowed.
    pub size_limit_exceeded: bool,
    /// Candidates came from an attribute index rather than a full scan.
    pub used_index: bool,
}

impl DirectoryService {
    /// Check simple-bind credentials and return the resulting identity.
    ///
    /// An empty name with an empty password is an anonymous bind. Unknown
    /// names and wrong passwords are indistinguishable to the caller.
    pub fn bind(&self, name: &str, password: &str) -> OperationResult<BindState> {
        self.ensure_started()?;
        let dn = Dn::parse(name)?;

        if dn.is_root() {
            return if password.is_empty() {
                Ok(BindState::Anonymous)
            } else {
                Err(OperationError::unwilling_to_perform(
                    "A password was supplied without a bind DN",
                ))
            };
        }
        if password.is_empty() {
            return Err(OperationError::unwilling_to_perform(
                "Unauthenticated binds are not allowed",
            ));
        }

        let Some(entry) = self.lookup(&dn)? else {
            debug!("Bind as unknown DN {}", dn);
            return Err(OperationError::invalid_credentials());
        };
        let accepted = entry
            .attributes
            .values("userPassword")
            .iter()
            .any(|stored| verify_password(stored, password));
        if accepted {
            Ok(BindState::Authenticated(entry.dn))
        } else {
            debug!("Bind as {} rejected: wrong password", dn);
            Err(OperationError::invalid_credentials())
        }
    }

    /// Add a new entry.
    pub fn add(&self, principal: &BindState, mut entry: DirectoryEntry) -> OperationResult<()> {
        self.ensure_started()?;
        require_authenticated(principal, "add")?;

        if entry.dn.is_root() || entry.dn == subschema_dn() {
            return Err(OperationError::entry_already_exists(&entry.dn));
        }
        let partition = self
            .partition_for(&entry.dn)
            .ok_or_else(|| OperationError::no_such_object(&entry.dn))?;

        if entry.dn != *partition.suffix() {
            let parent = entry.dn.parent().unwrap_or_else(Dn::root);
            if !partition.backend().contains(&parent)? {
                let error = OperationError::no_such_object(&parent);
                return Err(match self.closest_existing(partition, &parent)? {
                    Some(matched) => error.with_matched_dn(matched),
                    None => error,
                });
            }
        }

        {
            let registry = self.registry();
            let registry = registry.read();
            canonicalize_names(&mut entry, &registry);
            add_rdn_attributes(&mut entry, &registry);
            reject_user_supplied_operational(&entry, &registry)?;
            check_entry(&entry, &registry)?;
        }

        let now = chrono::Utc::now().format(GENERALIZED_TIME).to_string();
        entry.attributes.set("createTimestamp", [now]);
        entry.attributes.set("creatorsName", [principal.dn().to_string()]);
        entry
            .attributes
            .set("entryUUID", [uuid::Uuid::new_v4().to_string()]);

        if !partition.backend().insert(&entry)? {
            return Err(OperationError::entry_already_exists(&entry.dn));
        }
        debug!("Added {} to partition '{}'", entry.dn, partition.id());
        self.record_change(ChangeKind::Add, &entry.dn, principal);
        Ok(())
    }

    /// Apply `changes` to the entry at `dn`, atomically.
    ///
    /// Modifying `cn=schema` registers new attribute types and object classes.
    pub fn modify(
        &self,
        principal: &BindState,
        dn: &Dn,
        changes: &[Modification],
    ) -> OperationResult<()> {
        self.ensure_started()?;
        require_authenticated(principal, "modify")?;

        if *dn == subschema_dn() {
            return self.modify_schema(principal, changes);
        }

        let partition = self
            .partition_for(dn)
            .ok_or_else(|| OperationError::no_such_object(dn))?;
        let Some(mut entry) = partition.backend().get(dn)? else {
            let error = OperationError::no_such_object(dn);
            return Err(match self.closest_existing(partition, dn)? {
                Some(matched) => error.with_matched_dn(matched),
                None => error,
            });
        };

        {
            let registry = self.registry();
            let registry = registry.read();
            for change in changes {
                apply_change(&mut entry, change, &registry)?;
            }
            check_rdn_values(&entry, &registry)?;
            check_entry(&entry, &registry)?;
        }

        let now = chrono::Utc::now().format(GENERALIZED_TIME).to_string();
        entry.attributes.set("modifyTimestamp", [now]);
        entry
            .attributes
            .set("modifiersName", [principal.dn().to_string()]);

        if !partition.backend().replace(&entry)? {
            return Err(OperationError::no_such_object(dn));
        }
        debug!("Modified {} ({} changes)", dn, changes.len());
        self.record_change(ChangeKind::Modify, dn, principal);
        Ok(())
    }

    fn modify_schema(&self, principal: &BindState, changes: &[Modification]) -> OperationResult<()> {
        let mut definitions = Vec::new();
        {
            let registry = self.registry();
            let registry = registry.read();
            for change in changes {
                if change.operation != ModifyOperation::Add {
                    return Err(OperationError::unwilling_to_perform(
                        "Schema elements can only be added",
                    ));
                }
                let name = &change.attribute.name;
                for value in &change.attribute.values {
                    let parsed = if registry.same_attribute(name, "attributeTypes") {
                        parse_attribute_type("cn=schema", value)
                            .map(SchemaDefinition::AttributeType)
                    } else if registry.same_attribute(name, "objectClasses") {
                        parse_object_class("cn=schema", value).map(SchemaDefinition::ObjectClass)
                    } else {
                        return Err(OperationError::unwilling_to_perform(format!(
                            "Cannot modify '{name}' on the subschema entry"
                        )));
                    };
                    definitions.push(
                        parsed.map_err(|e| OperationError::invalid_attribute_syntax(e.to_string()))?,
                    );
                }
            }
        }

        let count = definitions.len();
        let registry = self.registry();
        let mut registry = registry.write();
        let mut candidate = registry.clone();
        let errors = candidate.register_batch(definitions);
        if let Some(error) = errors.first() {
            return Err(if matches!(error, SchemaError::Duplicate { .. }) {
                OperationError::attribute_or_value_exists(&error.to_string())
            } else {
                OperationError::constraint_violation(error.to_string())
            });
        }
        *registry = candidate;
        drop(registry);

        info!("Registered {} schema element(s) through cn=schema", count);
        self.record_change(ChangeKind::SchemaModify, &subschema_dn(), principal);
        Ok(())
    }

    /// Run a search. Attribute selection follows the request; `typesOnly` is
    /// left to the caller that encodes the response.
    pub fn search(
        &self,
        _principal: &BindState,
        request: &SearchRequest,
    ) -> OperationResult<SearchOutcome> {
        self.ensure_started()?;
        let base = Dn::parse(&request.base)?;
        let registry = self.registry();
        let registry = registry.read();

        let mut outcome = SearchOutcome::default();
        let candidates = if base.is_root() {
            if request.scope == SearchScope::BaseObject {
                vec![root_dse(&self.naming_contexts())]
            } else {
                let mut all = Vec::new();
                for partition in self.partitions() {
                    all.extend(partition.backend().scan()?);
                }
                all
            }
        } else if base == subschema_dn() {
            vec![subschema_entry(&registry)]
        } else {
            let partition = self
                .partition_for(&base)
                .ok_or_else(|| OperationError::no_such_object(&base))?;
            if !partition.backend().contains(&base)? {
                let error = OperationError::no_such_object(&base);
                return Err(match self.closest_existing(partition, &base)? {
                    Some(matched) => error.with_matched_dn(matched),
                    None => error,
                });
            }
            let indexed = partition.backend().indexed_attributes();
            match indexable_equality(&request.filter, &indexed, &registry) {
                Some((attribute, value)) if request.scope != SearchScope::BaseObject => {
                    match partition.backend().lookup_index(&attribute, value)? {
                        Some(hits) => {
                            outcome.used_index = true;
                            hits
                        }
                        None => partition.backend().scan()?,
                    }
                }
                _ if request.scope == SearchScope::BaseObject => {
                    partition.backend().get(&base)?.into_iter().collect()
                }
                _ => partition.backend().scan()?,
            }
        };

        let mut found: Vec<DirectoryEntry> = candidates
            .into_iter()
            .filter(|entry| in_scope(&entry.dn, &base, request.scope))
            .filter(|entry| matches(&request.filter, entry, &registry))
            .collect();
        found.sort_by(|a, b| {
            a.dn.depth()
                .cmp(&b.dn.depth())
                .then_with(|| a.dn.normalized().cmp(b.dn.normalized()))
        });

        if request.size_limit > 0 && found.len() > request.size_limit as usize {
            found.truncate(request.size_limit as usize);
            outcome.size_limit_exceeded = true;
        }

        // A plain read of the root DSE returns its operational attributes too.
        let everything = ["*".to_string(), "+".to_string()];
        let requested: &[String] = if base.is_root()
            && request.scope == SearchScope::BaseObject
            && request.attributes.is_empty()
        {
            &everything
        } else {
            &request.attributes
        };
        outcome.entries = found
            .into_iter()
            .map(|entry| select_attributes(entry, requested, &registry))
            .collect();
        Ok(outcome)
    }

    /// The entry at `dn`, including the virtual root DSE and subschema entry.
    pub fn lookup(&self, dn: &Dn) -> OperationResult<Option<DirectoryEntry>> {
        self.ensure_started()?;
        if dn.is_root() {
            return Ok(Some(root_dse(&self.naming_contexts())));
        }
        if *dn == subschema_dn() {
            return Ok(Some(subschema_entry(&self.registry().read())));
        }
        match self.partition_for(dn) {
            Some(partition) => Ok(partition.backend().get(dn)?),
            None => Ok(None),
        }
    }

    pub fn exists(&self, dn: &Dn) -> OperationResult<bool> {
        Ok(self.lookup(dn)?.is_some())
    }

    fn closest_existing(&self, partition: &Partition, dn: &Dn) -> OperationResult<Option<Dn>> {
        let mut current = dn.parent();
        while let Some(candidate) = current {
            if !candidate.is_within(partition.suffix()) {
                break;
            }
            if partition.backend().contains(&candidate)? {
                return Ok(Some(candidate));
            }
            current = candidate.parent();
        }
        Ok(None)
    }
}

fn require_authenticated(principal: &BindState, operation: &str) -> OperationResult<()> {
    if principal.is_authenticated() {
        Ok(())
    } else {
        Err(OperationError::insufficient_access(format!(
            "Anonymous sessions may not {operation} entries"
        )))
    }
}

fn reject_user_supplied_operational(
    entry: &DirectoryEntry,
    registry: &SchemaRegistry,
) -> OperationResult<()> {
    for attribute in entry.attributes.iter() {
        if registry
            .attribute_type(&attribute.name)
            .is_some_and(|definition| definition.no_user_modification)
        {
            return Err(OperationError::constraint_violation(format!(
                "Attribute '{}' is maintained by the server",
                attribute.name
            )));
        }
    }
    Ok(())
}

fn apply_change(
    entry: &mut DirectoryEntry,
    change: &Modification,
    registry: &SchemaRegistry,
) -> OperationResult<()> {
    let requested = &change.attribute.name;
    let Some(definition) = registry.attribute_type(requested) else {
        return Err(OperationError::undefined_attribute_type(requested));
    };
    if definition.no_user_modification {
        return Err(OperationError::constraint_violation(format!(
            "Attribute '{requested}' is maintained by the server"
        )));
    }

    let name = stored_name(entry, requested, registry);
    let values = &change.attribute.values;
    match change.operation {
        ModifyOperation::Add => {
            if values.is_empty() {
                return Err(OperationError::constraint_violation(format!(
                    "Adding to '{requested}' requires at least one value"
                )));
            }
            for value in values {
                if !entry.attributes.add_value(&name, value.clone()) {
                    return Err(OperationError::attribute_or_value_exists(requested));
                }
            }
        }
        ModifyOperation::Delete if values.is_empty() => {
            if entry.attributes.remove(&name).is_none() {
                return Err(OperationError::no_such_attribute(requested));
            }
        }
        ModifyOperation::Delete => {
            for value in values {
                if !entry.attributes.remove_value(&name, value) {
                    return Err(OperationError::no_such_attribute(requested));
                }
            }
        }
        ModifyOperation::Replace => entry.attributes.set(&name, values.iter().cloned()),
    }
    Ok(())
}

fn in_scope(dn: &Dn, base: &Dn, scope: SearchScope) -> bool {
    match scope {
        SearchScope::BaseObject => dn == base,
        SearchScope::SingleLevel => dn.is_child_of(base),
        SearchScope::WholeSubtree => dn.is_within(base),
    }
}

/// Keep the attributes `requested` asks for: `*` (or nothing) for every user
/// attribute, `+` for every operational one, `1.1` for none, or names.
fn select_attributes(
    mut entry: DirectoryEntry,
    requested: &[String],
    registry: &SchemaRegistry,
) -> DirectoryEntry {
    let all_user = requested.is_empty() || requested.iter().any(|name| name == "*");
    let all_operational = requested.iter().any(|name| name == "+");

    let kept: Vec<_> = entry
        .attributes
        .iter()
        .filter(|attribute| {
            let named = requested
                .iter()
                .any(|name| registry.same_attribute(name, &attribute.name));
            if registry.is_operational(&attribute.name) {
                all_operational || named
            } else {
                all_user || named
            }
        })
        .map(|attribute| (attribute.name.clone(), attribute.values.clone()))
        .collect();

    entry.attributes = Default::default();
    for (name, values) in kept {
        entry.attributes.set(&name, values);
    }
    entry
}
