//! Facts exported by the analysis of a package for its dependents.

use std::sync::Arc;

use ahash::AHashMap;
use gofix_inline::Callee;
use gofix_typecheck::{ObjectId, ObjectKind, Program, RecvInfo, full_qualifier};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::{trace, warn};

/// The object named on the right of `const A = B` or `type A = B`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub pkg_path: String,
    pub pkg_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fact {
    Func { callee: Box<Callee> },
    Const { target: Target },
    Alias { target: Target },
}

/// Content address of the fact about one package-level object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactKey(String);

impl FactKey {
    pub fn new(pkg_path: &str, name: &str, signature: &str) -> Self {
        let mut hasher = Sha1::new();
        for part in [pkg_path, name, signature] {
            hasher.update(part.as_bytes());
            hasher.update([0]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The key of `obj`; methods are named `T.m`.
    pub fn for_object(program: &Program, obj: ObjectId) -> Self {
        let object = program.object(obj);
        let name = match &object.kind {
            ObjectKind::Func {
                recv: Some(RecvInfo {
                    base: Some(base), ..
                }),
                ..
            } => format!("{}.{}", program.object(*base).name, object.name),
            _ => object.name.clone(),
        };
        let signature = format!(
            "{} {}",
            object.kind_name(),
            program.type_string(&object.ty, &full_qualifier)
        );
        Self::new(object.pkg_path.as_deref().unwrap_or_default(), &name, &signature)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Serialized facts shared between the analyses of different packages.
#[derive(Debug, Default)]
pub struct FactStore {
    entries: RwLock<AHashMap<FactKey, Arc<str>>>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export(&self, key: FactKey, fact: &Fact) -> serde_json::Result<()> {
        let json = serde_json::to_string(fact)?;
        trace!(key = key.as_str(), "exporting fact");
        self.entries.write().insert(key, Arc::from(json));
        Ok(())
    }

    pub fn import(&self, key: &FactKey) -> Option<Fact> {
        let json = self.entries.read().get(key).cloned()?;
        match serde_json::from_str(&json) {
            Ok(fact) => Some(fact),
            Err(err) => {
                warn!(key = key.as_str(), "discarding malformed fact: {err}");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_import() {
        let store = FactStore::new();
        let key = FactKey::new("example.com/p", "A", "const untyped int");
        let fact = Fact::Const {
            target: Target {
                pkg_path: "example.com/q".to_string(),
                pkg_name: "q".to_string(),
                name: "B".to_string(),
            },
        };
        assert!(store.import(&key).is_none());
        store.export(key.clone(), &fact).expect("serializes");
        assert_eq!(store.import(&key), Some(fact));
        assert_eq!(store.len(), 1);
        assert_ne!(key, FactKey::new("example.com/p", "A", "const int"));
    }
}
