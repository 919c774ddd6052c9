//! Shared cache of callee summaries.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use gofix_typecheck::{ObjectId, ObjectKind, Program, RecvInfo, full_qualifier};
use sha1::{Digest, Sha1};

use crate::callee::Callee;

/// Identity of a callee: its package, name and a digest of its signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalleeKey {
    pub pkg_path: String,
    pub name: String,
    pub signature_hash: String,
}

impl CalleeKey {
    pub fn new(pkg_path: &str, name: &str, signature: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(signature.as_bytes());
        Self {
            pkg_path: pkg_path.to_string(),
            name: name.to_string(),
            signature_hash: format!("{:x}", hasher.finalize()),
        }
    }

    /// The key of the summary [`analyze_callee`](crate::analyze_callee)
    /// would produce for `func`.
    pub fn for_func(program: &Program, func: ObjectId) -> Self {
        let obj = program.object(func);
        let name = match &obj.kind {
            ObjectKind::Func {
                recv: Some(RecvInfo {
                    base: Some(base), ..
                }),
                ..
            } => format!("{}.{}", program.object(*base).name, obj.name),
            _ => obj.name.clone(),
        };
        let signature = program.type_string(&obj.ty, &full_qualifier);
        Self::new(obj.pkg_path.as_deref().unwrap_or_default(), &name, &signature)
    }
}

/// Callee summaries shared between concurrent analyses.
///
/// Concurrent inserts for the same key are allowed; the last writer wins and
/// every writer stores an equivalent summary.
#[derive(Debug, Default)]
pub struct CalleeCache {
    entries: RwLock<AHashMap<CalleeKey, Arc<Callee>>>,
}

impl CalleeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CalleeKey) -> Option<Arc<Callee>> {
        self.entries.read().get(key).cloned()
    }

    pub fn insert(&self, callee: Callee) -> Arc<Callee> {
        let callee = Arc::new(callee);
        self.entries
            .write()
            .insert(callee.key(), Arc::clone(&callee));
        callee
    }

    /// Returns the cached summary for `key`, computing it with `analyze` on a
    /// miss. The computation runs without holding the lock.
    pub fn get_or_insert_with<E>(
        &self,
        key: &CalleeKey,
        analyze: impl FnOnce() -> Result<Callee, E>,
    ) -> Result<Arc<Callee>, E> {
        if let Some(callee) = self.get(key) {
            return Ok(callee);
        }
        let callee = Arc::new(analyze()?);
        self.entries.write().insert(key.clone(), Arc::clone(&callee));
        Ok(callee)
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
    fn test_key_hashes_signature() {
        let a = CalleeKey::new("example.com/p", "F", "func(int) int");
        let b = CalleeKey::new("example.com/p", "F", "func(int) int");
        let c = CalleeKey::new("example.com/p", "F", "func(string) int");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.signature_hash.len(), 40);
    }
}
