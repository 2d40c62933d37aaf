//! Namespace prefix table.

use crate::vocab::{RDFS_NS, RDF_NS, VG_NS, XSD_NS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix → namespace IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixMap {
    entries: BTreeMap<String, String>,
}

impl Default for PrefixMap {
    fn default() -> Self {
        let mut map = Self::empty();
        map.insert("rdf", RDF_NS);
        map.insert("rdfs", RDFS_NS);
        map.insert("xsd", XSD_NS);
        map.insert("vg", VG_NS);
        map
    }
}

impl PrefixMap {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.entries.insert(prefix.into(), namespace.into());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.entries.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand `prefix:local`. Returns `None` when the prefix is unknown or the
    /// token has no colon.
    pub fn expand(&self, prefixed: &str) -> Option<String> {
        let (prefix, local) = prefixed.split_once(':')?;
        let ns = self.entries.get(prefix)?;
        Some(format!("{ns}{local}"))
    }

    /// Shorten an IRI to `prefix:local` using the longest matching namespace.
    pub fn shorten(&self, iri: &str) -> Option<String> {
        self.entries
            .iter()
            .filter(|(_, ns)| !ns.is_empty() && iri.len() > ns.len() && iri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{prefix}:{}", &iri[ns.len()..]))
    }

    /// Shortened form when a namespace matches, the full IRI otherwise.
    pub fn display(&self, iri: &str) -> String {
        self.shorten(iri).unwrap_or_else(|| iri.to_string())
    }

    pub fn merge(&mut self, other: &PrefixMap) {
        for (p, ns) in other.iter() {
            self.insert(p, ns);
        }
    }
}

impl<P: Into<String>, N: Into<String>> FromIterator<(P, N)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (P, N)>>(iter: I) -> Self {
        let mut map = Self::empty();
        for (p, ns) in iter {
            map.insert(p, ns);
        }
        map
    }
}
