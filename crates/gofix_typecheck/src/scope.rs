use ahash::AHashMap;
use gofix_span::{FileId, Span};

use crate::objects::{ObjectId, Objects, ScopeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Universe,
    Package,
    File,
    /// Parameters, results and the top-level statements of a function body.
    Func,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Source extent; meaningful for file, function and block scopes.
    pub file: Option<FileId>,
    pub extent: Span,
    pub names: AHashMap<String, ObjectId>,
    pub children: Vec<ScopeId>,
}

impl Scope {
    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    fn covers(&self, file: FileId, offset: u32) -> bool {
        self.file == Some(file) && self.extent.start <= offset && offset <= self.extent.end
    }
}

/// Arena of scopes. The universe is always `ScopeId(0)`.
#[derive(Debug, Default)]
pub struct Scopes {
    list: Vec<Scope>,
}

impl Scopes {
    pub const UNIVERSE: ScopeId = ScopeId(0);

    pub(crate) fn alloc(
        &mut self,
        kind: ScopeKind,
        parent: Option<ScopeId>,
        file: Option<FileId>,
        extent: Span,
    ) -> ScopeId {
        let id = ScopeId(self.list.len() as u32);
        self.list.push(Scope {
            kind,
            parent,
            file,
            extent,
            names: AHashMap::new(),
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.list[parent.index()].children.push(id);
        }
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.list[id.index()]
    }

    pub(crate) fn insert(&mut self, scope: ScopeId, name: &str, object: ObjectId) -> Option<ObjectId> {
        self.list[scope.index()]
            .names
            .insert(name.to_string(), object)
    }

    /// The innermost scope below `start` whose extent contains `offset`.
    pub fn innermost(&self, start: ScopeId, file: FileId, offset: u32) -> ScopeId {
        let mut current = start;
        'descend: loop {
            for &child in &self.get(current).children {
                if self.get(child).covers(file, offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Resolves `name` as seen at `offset` from `scope`, walking outwards.
    ///
    /// Objects declared later in a function are not yet visible.
    pub fn lookup_parent(
        &self,
        objects: &Objects,
        scope: ScopeId,
        name: &str,
        offset: u32,
    ) -> Option<(ScopeId, ObjectId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(object) = scope.lookup(name) {
                let visible = objects
                    .get(object)
                    .scope_pos
                    .is_none_or(|scope_pos| scope_pos <= offset);
                if visible {
                    return Some((id, object));
                }
            }
            current = scope.parent;
        }
        None
    }

    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |id| self.get(*id).parent)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
