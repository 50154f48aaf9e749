//! Search filter evaluation.
//!
//! Values are compared under the attribute's equality rule: case-exact rules
//! only collapse insignificant whitespace, every other rule also folds case.
//! Attribute descriptions are matched through the schema, so a filter on
//! `commonName` finds values stored under `cn`.

use crate::dn::normalize_value;
use crate::entry::DirectoryEntry;
use crate::protocol::{Filter, SubstringFilter};
use crate::schema::SchemaRegistry;
use std::cmp::Ordering;

/// Whether `entry` satisfies `filter`.
pub fn matches(filter: &Filter, entry: &DirectoryEntry, registry: &SchemaRegistry) -> bool {
    Evaluator { registry }.eval(filter, entry)
}

/// An equality assertion the backend index can answer, as
/// `(indexed attribute, value)`.
///
/// Looks at the filter itself and, for an AND, at its direct children.
pub fn indexable_equality<'f>(
    filter: &'f Filter,
    indexed: &[String],
    registry: &SchemaRegistry,
) -> Option<(String, &'f str)> {
    let candidate = |attribute: &str, value: &'f str| {
        indexed
            .iter()
            .find(|name| registry.same_attribute(name, attribute))
            .map(|name| (name.clone(), value))
    };

    match filter {
        Filter::Equality(attribute, value) => candidate(attribute, value),
        Filter::And(children) => children.iter().find_map(|child| match child {
            Filter::Equality(attribute, value) => candidate(attribute, value),
            _ => None,
        }),
        _ => None,
    }
}

struct Evaluator<'r> {
    registry: &'r SchemaRegistry,
}

impl Evaluator<'_> {
    fn eval(&self, filter: &Filter, entry: &DirectoryEntry) -> bool {
        match filter {
            Filter::And(children) => children.iter().all(|child| self.eval(child, entry)),
            Filter::Or(children) => children.iter().any(|child| self.eval(child, entry)),
            Filter::Not(inner) => !self.eval(inner, entry),
            Filter::Equality(attribute, value) | Filter::Approx(attribute, value) => {
                let wanted = self.prepare(attribute, value);
                self.values(entry, attribute)
                    .any(|existing| self.prepare(attribute, existing) == wanted)
            }
            Filter::Present(attribute) => {
                attribute.eq_ignore_ascii_case("objectClass")
                    || self.values(entry, attribute).next().is_some()
            }
            Filter::Substrings(substrings) => self
                .values(entry, &substrings.attribute)
                .any(|existing| self.substring_match(substrings, existing)),
            Filter::GreaterOrEqual(attribute, value) => self
                .values(entry, attribute)
                .any(|existing| self.compare(attribute, existing, value) != Ordering::Less),
            Filter::LessOrEqual(attribute, value) => self
                .values(entry, attribute)
                .any(|existing| self.compare(attribute, existing, value) != Ordering::Greater),
            // Extensible match and anything else unknown evaluates to Undefined.
            Filter::Unsupported { .. } => false,
        }
    }

    fn values<'e>(
        &self,
        entry: &'e DirectoryEntry,
        attribute: &str,
    ) -> impl Iterator<Item = &'e String> {
        let attribute = base_name(attribute).to_string();
        let registry = self.registry;
        entry
            .attributes
            .iter()
            .filter(move |stored| registry.same_attribute(&stored.name, &attribute))
            .flat_map(|stored| stored.values.iter())
    }

    fn prepare(&self, attribute: &str, value: &str) -> String {
        if self.registry.is_case_exact(base_name(attribute)) {
            value.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            normalize_value(value)
        }
    }

    fn substring_match(&self, filter: &SubstringFilter, value: &str) -> bool {
        let attribute = &filter.attribute;
        let value = self.prepare(attribute, value);
        let mut rest = value.as_str();

        if let Some(initial) = &filter.initial {
            let initial = self.prepare(attribute, initial);
            let Some(after) = rest.strip_prefix(initial.as_str()) else {
                return false;
            };
            rest = after;
        }

        for any in &filter.any {
            let any = self.prepare(attribute, any);
            match rest.find(any.as_str()) {
                Some(position) => rest = &rest[position + any.len()..],
                None => return false,
            }
        }

        match &filter.final_value {
            Some(final_value) => rest.ends_with(self.prepare(attribute, final_value).as_str()),
            None => true,
        }
    }

    fn compare(&self, attribute: &str, left: &str, right: &str) -> Ordering {
        if let (Ok(left), Ok(right)) = (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
            return left.cmp(&right);
        }
        self.prepare(attribute, left)
            .cmp(&self.prepare(attribute, right))
    }
}

/// Attribute description without options (`cn;lang-de` -> `cn`).
fn base_name(description: &str) -> &str {
    description
        .split_once(';')
        .map_or(description, |(name, _)| name)
}
