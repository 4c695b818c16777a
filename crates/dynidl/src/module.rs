//! The hierarchical symbol table: a rooted tree of named scopes.
//!
//! Modules own their declared builders and constants outright; every
//! cross-reference in the crate is a name-based lookup against this tree
//! (there is no shared ownership anywhere in the registry). Modules are
//! arena-allocated and addressed by [`ModuleId`].

use ahash::AHashSet;
use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;

use crate::{
    annotations::AnnotationDecl,
    ast::ScopedName,
    error::{ParseError, ParseResult},
    expr::{ConstantScope, DynData},
    registry::TypeBuilder,
};

/// Index of a module in the tree's arena. The root is always index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleId(u32);

impl ModuleId {
    pub(crate) const ROOT: ModuleId = ModuleId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The category a named type belongs to inside a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum TypeCategory {
    #[strum(serialize = "struct")]
    Structure,
    #[strum(serialize = "union")]
    Union,
    #[strum(serialize = "enum")]
    Enum,
    #[strum(serialize = "bitset")]
    Bitset,
    #[strum(serialize = "bitmask")]
    Bitmask,
    #[strum(serialize = "alias")]
    Alias,
}

const ALL_CATEGORIES: [TypeCategory; 6] = [
    TypeCategory::Structure,
    TypeCategory::Union,
    TypeCategory::Enum,
    TypeCategory::Bitset,
    TypeCategory::Bitmask,
    TypeCategory::Alias,
];

/// Result of an insertion attempt that did not hard-fail.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InsertOutcome {
    Inserted,
    /// The symbol already existed and `ignore_redefinition` kept the
    /// original; the message becomes a warning diagnostic.
    Ignored(String),
}

/// A named scope: one table per category, the constants, the declared
/// annotations, and the child modules.
///
/// Annotation names form their own namespace (the `@` sigil keeps them
/// unambiguous), so they do not participate in the cross-category symbol
/// collision check.
#[derive(Debug, Serialize)]
pub struct Module {
    name: String,
    parent: Option<ModuleId>,
    structs: IndexMap<String, TypeBuilder>,
    unions: IndexMap<String, TypeBuilder>,
    enums: IndexMap<String, TypeBuilder>,
    bitsets: IndexMap<String, TypeBuilder>,
    bitmasks: IndexMap<String, TypeBuilder>,
    aliases: IndexMap<String, TypeBuilder>,
    constants: IndexMap<String, DynData>,
    from_enum: Vec<String>,
    annotations: IndexMap<String, AnnotationDecl>,
    submodules: IndexMap<String, ModuleId>,
}

impl Module {
    fn new(name: String, parent: Option<ModuleId>) -> Self {
        Self {
            name,
            parent,
            structs: IndexMap::new(),
            unions: IndexMap::new(),
            enums: IndexMap::new(),
            bitsets: IndexMap::new(),
            bitmasks: IndexMap::new(),
            aliases: IndexMap::new(),
            constants: IndexMap::new(),
            from_enum: Vec::new(),
            annotations: IndexMap::new(),
            submodules: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ModuleId> {
        self.parent
    }

    fn table(&self, category: TypeCategory) -> &IndexMap<String, TypeBuilder> {
        match category {
            TypeCategory::Structure => &self.structs,
            TypeCategory::Union => &self.unions,
            TypeCategory::Enum => &self.enums,
            TypeCategory::Bitset => &self.bitsets,
            TypeCategory::Bitmask => &self.bitmasks,
            TypeCategory::Alias => &self.aliases,
        }
    }

    fn table_mut(&mut self, category: TypeCategory) -> &mut IndexMap<String, TypeBuilder> {
        match category {
            TypeCategory::Structure => &mut self.structs,
            TypeCategory::Union => &mut self.unions,
            TypeCategory::Enum => &mut self.enums,
            TypeCategory::Bitset => &mut self.bitsets,
            TypeCategory::Bitmask => &mut self.bitmasks,
            TypeCategory::Alias => &mut self.aliases,
        }
    }

    /// The category holding `key`, if any type table has it.
    pub fn category_of(&self, key: &str) -> Option<TypeCategory> {
        ALL_CATEGORIES.into_iter().find(|c| self.table(*c).contains_key(key))
    }

    /// Whether `key` names anything in this module, across every category
    /// (types, constants, child modules).
    pub fn has_local_symbol(&self, key: &str) -> bool {
        self.category_of(key).is_some() || self.constants.contains_key(key) || self.submodules.contains_key(key)
    }

    /// A tagged view over the type tables.
    pub fn builder(&self, key: &str) -> Option<&TypeBuilder> {
        self.category_of(key).map(|c| &self.table(c)[key])
    }

    pub fn constant(&self, key: &str) -> Option<&DynData> {
        self.constants.get(key)
    }

    /// Whether a constant was synthesized from an enumeration literal.
    pub fn constant_is_from_enum(&self, key: &str) -> bool {
        self.from_enum.iter().any(|n| n == key)
    }

    pub fn annotation(&self, key: &str) -> Option<&AnnotationDecl> {
        self.annotations.get(key)
    }

    pub fn constants(&self) -> impl Iterator<Item = (&str, &DynData)> {
        self.constants.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeBuilder> {
        ALL_CATEGORIES.into_iter().flat_map(|c| self.table(c).values())
    }

    pub fn submodules(&self) -> impl Iterator<Item = (&str, ModuleId)> {
        self.submodules.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// The arena-backed module tree. Created with the root scope in place and
/// the built-in annotations already registered on it.
#[derive(Debug, Serialize)]
pub struct ModuleTree {
    modules: Vec<Module>,
    /// Case-insensitive symbol handling (`ignore_case` context option):
    /// table keys are lowercased, declared spellings are preserved in the
    /// builders.
    ignore_case: bool,
}

impl ModuleTree {
    pub(crate) fn new(ignore_case: bool) -> Self {
        let mut root = Module::new(String::new(), None);
        for builtin in crate::annotations::builtin_annotations() {
            root.annotations.insert(builtin.name().to_owned(), builtin);
        }
        Self {
            modules: vec![root],
            ignore_case,
        }
    }

    pub fn root(&self) -> ModuleId {
        ModuleId::ROOT
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub(crate) fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    fn key(&self, name: &str) -> String {
        if self.ignore_case {
            name.to_lowercase()
        } else {
            name.to_owned()
        }
    }

    /// `A::B` path of a module; empty for the root.
    pub fn scope_of(&self, id: ModuleId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(module_id) = current {
            let module = self.module(module_id);
            if !module.name.is_empty() {
                segments.push(module.name.clone());
            }
            current = module.parent;
        }
        segments.reverse();
        segments.join("::")
    }

    /// The fully-qualified name of `name` declared inside module `id`.
    pub fn qualified_name(&self, id: ModuleId, name: &str) -> String {
        let scope = self.scope_of(id);
        if scope.is_empty() {
            name.to_owned()
        } else {
            format!("{scope}::{name}")
        }
    }

    /// Enter a child module, creating it on first mention. Reopening an
    /// existing submodule is normal IDL.
    pub(crate) fn create_or_enter_submodule(&mut self, parent: ModuleId, name: &str) -> ParseResult<ModuleId> {
        let key = self.key(name);
        if let Some(existing) = self.module(parent).submodules.get(&key) {
            return Ok(*existing);
        }
        if self.module(parent).has_local_symbol(&key) {
            return Err(ParseError::redefinition(format!(
                "'{name}' is already declared in this scope and cannot name a module"
            )));
        }
        let id = ModuleId(u32::try_from(self.modules.len()).expect("module arena fits u32"));
        self.modules.push(Module::new(name.to_owned(), Some(parent)));
        self.module_mut(parent).submodules.insert(key, id);
        Ok(id)
    }

    /// Whether `name` is visible from `from`, optionally searching enclosing
    /// scopes.
    pub fn has_symbol(&self, from: ModuleId, name: &str, extend: bool) -> bool {
        let key = self.key(name);
        let mut current = Some(from);
        while let Some(id) = current {
            if self.module(id).has_local_symbol(&key) {
                return true;
            }
            if !extend {
                return false;
            }
            current = self.module(id).parent;
        }
        false
    }

    /// Register a type builder under its category in `target`.
    ///
    /// `replace` overwrites an existing entry of the same category — the
    /// forward-declaration completion path. `ignore_redefinition` downgrades
    /// a collision to a kept-original warning.
    pub(crate) fn insert_builder(
        &mut self,
        target: ModuleId,
        category: TypeCategory,
        mut builder: TypeBuilder,
        replace: bool,
        ignore_redefinition: bool,
    ) -> ParseResult<InsertOutcome> {
        let declared_name = builder.name().to_owned();
        if declared_name.contains("::") {
            return Err(ParseError::unsupported(format!(
                "cannot insert scoped name '{declared_name}' directly into a module"
            )));
        }
        let key = self.key(&declared_name);
        let module = self.module(target);
        let collision = module.has_local_symbol(&key);
        if collision {
            let same_category = module.table(category).contains_key(&key);
            if !(replace && same_category) {
                if ignore_redefinition {
                    return Ok(InsertOutcome::Ignored(format!(
                        "ignoring redefinition of '{declared_name}'; keeping the original declaration"
                    )));
                }
                return Err(ParseError::redefinition(format!(
                    "'{declared_name}' is already declared in this scope"
                )));
            }
        }
        builder.set_name(self.qualified_name(target, &declared_name));
        self.module_mut(target).table_mut(category).insert(key, builder);
        Ok(InsertOutcome::Inserted)
    }

    /// Register a constant value in `target`.
    pub(crate) fn insert_constant(
        &mut self,
        target: ModuleId,
        name: &str,
        value: DynData,
        from_enumeration: bool,
        ignore_redefinition: bool,
    ) -> ParseResult<InsertOutcome> {
        if name.contains("::") {
            return Err(ParseError::unsupported(format!(
                "cannot insert scoped name '{name}' directly into a module"
            )));
        }
        let key = self.key(name);
        if self.module(target).has_local_symbol(&key) {
            if ignore_redefinition {
                return Ok(InsertOutcome::Ignored(format!(
                    "ignoring redefinition of constant '{name}'; keeping the original declaration"
                )));
            }
            return Err(ParseError::redefinition(format!(
                "'{name}' is already declared in this scope"
            )));
        }
        let module = self.module_mut(target);
        module.constants.insert(key, value);
        if from_enumeration {
            module.from_enum.push(name.to_owned());
        }
        Ok(InsertOutcome::Inserted)
    }

    /// Register a declared annotation. Duplicates are never fatal: the
    /// second declaration is ignored with a warning, and builtins can never
    /// be replaced.
    pub(crate) fn insert_annotation(&mut self, target: ModuleId, declaration: AnnotationDecl) -> InsertOutcome {
        let key = self.key(declaration.name());
        if self.module(target).annotations.contains_key(&key) || self.find_annotation(target, &key).is_some() {
            return InsertOutcome::Ignored(format!(
                "annotation '{}' is already declared; ignoring the new declaration",
                declaration.name()
            ));
        }
        self.module_mut(target).annotations.insert(key, declaration);
        InsertOutcome::Inserted
    }

    /// Look up an annotation declaration from `from`, walking enclosing
    /// scopes up to the root (where the builtins live).
    pub(crate) fn find_annotation(&self, from: ModuleId, name: &str) -> Option<&AnnotationDecl> {
        let key = self.key(name);
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(declaration) = self.module(id).annotations.get(&key) {
                return Some(declaration);
            }
            current = self.module(id).parent;
        }
        None
    }

    /// Look up an annotation declaration by possibly-qualified name:
    /// unqualified names walk enclosing scopes; qualified names descend a
    /// module path tried from every enclosing scope (or the root when
    /// absolute).
    pub(crate) fn find_annotation_scoped(&self, from: ModuleId, name: &crate::ast::ScopedName) -> Option<&AnnotationDecl> {
        if let Some(ident) = name.as_identifier() {
            return self.find_annotation(from, ident);
        }
        let (path, leaf) = name.segments.split_at(name.segments.len() - 1);
        let leaf_key = self.key(&leaf[0]);
        let mut start = Some(if name.absolute { self.root() } else { from });
        while let Some(base) = start {
            let mut current = Some(base);
            for segment in path {
                let key = self.key(segment);
                current = current.and_then(|id| self.module(id).submodules.get(&key).copied());
            }
            if let Some(found) = current.and_then(|id| self.module(id).annotations.get(&leaf_key)) {
                return Some(found);
            }
            if name.absolute {
                return None;
            }
            start = self.module(base).parent;
        }
        None
    }

    /// Resolve a scoped name from `from` to the module containing it plus
    /// the final unqualified key.
    ///
    /// Absolute names restart at the root;
    /// relative names descend through child modules, fall back to
    /// self-qualification when the first segment repeats the current
    /// module's name, and retry from enclosing scopes on failure. A
    /// visited-set on `(module, remaining-name)` pairs guarantees
    /// termination.
    pub fn resolve_scope(&self, from: ModuleId, name: &ScopedName) -> Option<(ModuleId, String)> {
        let segments: Vec<String> = name.segments.iter().map(|s| self.key(s)).collect();
        let mut visited = AHashSet::new();
        self.resolve_impl(from, name.absolute, &segments, name.absolute, &segments, &mut visited)
    }

    fn resolve_impl(
        &self,
        current: ModuleId,
        absolute: bool,
        segments: &[String],
        original_absolute: bool,
        original: &[String],
        visited: &mut AHashSet<(u32, String)>,
    ) -> Option<(ModuleId, String)> {
        let key = (current.0, format!("{}{}", if absolute { "::" } else { "" }, segments.join("::")));
        if !visited.insert(key) {
            return None;
        }

        if absolute {
            return self.resolve_impl(self.root(), false, original, original_absolute, original, visited);
        }

        let module = self.module(current);
        if segments.len() > 1 {
            // self-qualification: `A::x` while inside module `A`
            if segments[0] == self.key(&module.name) {
                if let Some(found) =
                    self.resolve_impl(current, false, &segments[1..], original_absolute, original, visited)
                {
                    return Some(found);
                }
            }
            if let Some(&child) = module.submodules.get(&segments[0]) {
                if let Some(found) =
                    self.resolve_impl(child, false, &segments[1..], original_absolute, original, visited)
                {
                    return Some(found);
                }
            }
            if let Some(parent) = module.parent {
                return self.resolve_impl(parent, original_absolute, original, original_absolute, original, visited);
            }
            return None;
        }

        let leaf = &segments[0];
        if module.has_local_symbol(leaf) {
            return Some((current, leaf.clone()));
        }
        if let Some(parent) = module.parent {
            return self.resolve_impl(parent, original_absolute, original, original_absolute, original, visited);
        }
        None
    }

    /// The builder declared directly in `id` under `name`, if any.
    pub(crate) fn local_builder(&self, id: ModuleId, name: &str) -> Option<&TypeBuilder> {
        self.module(id).builder(&self.key(name))
    }

    /// Whether `name` is declared directly in `id` (no outward search).
    pub(crate) fn has_local(&self, id: ModuleId, name: &str) -> bool {
        self.module(id).has_local_symbol(&self.key(name))
    }

    /// Resolve a scoped name and return the builder it denotes.
    pub fn lookup_builder(&self, from: ModuleId, name: &ScopedName) -> Option<&TypeBuilder> {
        let (module_id, leaf) = self.resolve_scope(from, name)?;
        self.module(module_id).builder(&leaf)
    }

    /// Resolve a scoped name to a constant value.
    pub fn lookup_constant(&self, from: ModuleId, name: &ScopedName) -> Option<&DynData> {
        let (module_id, leaf) = self.resolve_scope(from, name)?;
        self.module(module_id).constant(&leaf)
    }

    /// Find a type by fully-qualified name, descending from the root.
    pub fn find_type(&self, qualified_name: &str) -> Option<&TypeBuilder> {
        let path = qualified_name.trim_start_matches("::");
        let mut segments = path.split("::").collect::<Vec<_>>();
        let leaf = segments.pop()?;
        let mut current = self.root();
        for segment in segments {
            let key = self.key(segment);
            current = *self.module(current).submodules.get(&key)?;
        }
        self.module(current).builder(&self.key(leaf))
    }

    /// Find a constant by fully-qualified name, descending from the root.
    pub fn find_constant(&self, qualified_name: &str) -> Option<&DynData> {
        let path = qualified_name.trim_start_matches("::");
        let mut segments = path.split("::").collect::<Vec<_>>();
        let leaf = segments.pop()?;
        let mut current = self.root();
        for segment in segments {
            let key = self.key(segment);
            current = *self.module(current).submodules.get(&key)?;
        }
        self.module(current).constant(&self.key(leaf))
    }

    /// Find a module by fully-qualified path; the empty path is the root.
    pub fn find_module(&self, qualified_name: &str) -> Option<ModuleId> {
        let path = qualified_name.trim_start_matches("::");
        if path.is_empty() {
            return Some(self.root());
        }
        let mut current = self.root();
        for segment in path.split("::") {
            let key = self.key(segment);
            current = *self.module(current).submodules.get(&key)?;
        }
        Some(current)
    }

    /// Depth-first search for the first builder with the given unqualified
    /// name anywhere in the tree (used by the targeted parse form).
    pub fn find_type_recursive(&self, name: &str) -> Option<&TypeBuilder> {
        let key = self.key(name);
        self.find_type_recursive_in(self.root(), &key)
    }

    fn find_type_recursive_in(&self, id: ModuleId, key: &str) -> Option<&TypeBuilder> {
        if let Some(builder) = self.module(id).builder(key) {
            return Some(builder);
        }
        for (_, child) in self.module(id).submodules() {
            if let Some(builder) = self.find_type_recursive_in(child, key) {
                return Some(builder);
            }
        }
        None
    }
}

/// A position in the module tree, usable as the evaluator's constant scope.
pub(crate) struct ModuleScope<'a> {
    pub tree: &'a ModuleTree,
    pub current: ModuleId,
}

impl ConstantScope for ModuleScope<'_> {
    fn lookup_constant(&self, name: &ScopedName) -> Option<DynData> {
        self.tree.lookup_constant(self.current, name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    fn scoped(absolute: bool, segments: &[&str]) -> ScopedName {
        ScopedName {
            absolute,
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    fn tree_with_constant() -> (ModuleTree, ModuleId) {
        let mut tree = ModuleTree::new(false);
        let a = tree.create_or_enter_submodule(tree.root(), "A").unwrap();
        tree.insert_constant(a, "K", DynData::Int32(5), false, false).unwrap();
        (tree, a)
    }

    #[test]
    fn resolves_from_sibling_scope_through_the_root() {
        let (tree, _) = tree_with_constant();
        let (module, leaf) = tree.resolve_scope(tree.root(), &scoped(false, &["A", "K"])).unwrap();
        assert_eq!(leaf, "K");
        assert_eq!(tree.module(module).name(), "A");
    }

    #[test]
    fn absolute_names_restart_at_the_root() {
        let (tree, a) = tree_with_constant();
        let resolved = tree.resolve_scope(a, &scoped(true, &["A", "K"]));
        assert!(resolved.is_some());
        assert!(tree.resolve_scope(a, &scoped(true, &["Unknown"])).is_none());
    }

    #[test]
    fn unqualified_lookup_walks_outward() {
        let mut tree = ModuleTree::new(false);
        let a = tree.create_or_enter_submodule(tree.root(), "A").unwrap();
        let b = tree.create_or_enter_submodule(a, "B").unwrap();
        tree.insert_constant(a, "K", DynData::Int32(1), false, false).unwrap();
        let (module, leaf) = tree.resolve_scope(b, &scoped(false, &["K"])).unwrap();
        assert_eq!(tree.module(module).name(), "A");
        assert_eq!(leaf, "K");
    }

    #[test]
    fn self_qualified_names_resolve() {
        let mut tree = ModuleTree::new(false);
        let a = tree.create_or_enter_submodule(tree.root(), "A").unwrap();
        tree.insert_constant(a, "x", DynData::Int32(1), false, false).unwrap();
        // From inside A, `A::x` self-qualifies.
        let resolved = tree.resolve_scope(a, &scoped(false, &["A", "x"]));
        assert!(resolved.is_some());
    }

    #[test]
    fn nested_same_name_modules_terminate() {
        // module A { module A { const long x = 1; } }
        let mut tree = ModuleTree::new(false);
        let outer = tree.create_or_enter_submodule(tree.root(), "A").unwrap();
        let inner = tree.create_or_enter_submodule(outer, "A").unwrap();
        tree.insert_constant(inner, "x", DynData::Int32(1), false, false).unwrap();

        // From inside A::A, `A::A::x` must resolve and must not loop.
        let resolved = tree.resolve_scope(inner, &scoped(false, &["A", "A", "x"]));
        assert!(resolved.is_some());
        let (module, leaf) = resolved.unwrap();
        assert_eq!(leaf, "x");
        assert_eq!(module, inner);

        // An unresolvable name returns None instead of recursing forever.
        assert!(tree.resolve_scope(inner, &scoped(false, &["A", "A", "missing"])).is_none());
    }

    #[test]
    fn collisions_across_categories_are_rejected() {
        let mut tree = ModuleTree::new(false);
        let root = tree.root();
        tree.insert_builder(root, TypeCategory::Structure, TypeBuilder::structure("S"), false, false)
            .unwrap();
        let err = tree
            .insert_builder(root, TypeCategory::Enum, TypeBuilder::enumeration("S"), false, false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ParseErrorKind::RedefinitionError);

        let outcome = tree
            .insert_builder(root, TypeCategory::Enum, TypeBuilder::enumeration("S"), false, true)
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::Ignored(_)));
    }

    #[test]
    fn replace_overwrites_only_the_same_category() {
        let mut tree = ModuleTree::new(false);
        let root = tree.root();
        let mut forward = TypeBuilder::structure("S");
        forward.mark_incomplete();
        tree.insert_builder(root, TypeCategory::Structure, forward, false, false)
            .unwrap();
        let outcome = tree
            .insert_builder(root, TypeCategory::Structure, TypeBuilder::structure("S"), true, false)
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);
        assert!(!tree.find_type("S").unwrap().is_incomplete());
    }

    #[test]
    fn registered_names_become_fully_qualified() {
        let (tree, _) = tree_with_constant();
        let mut tree = tree;
        let a = tree.find_module("A").unwrap();
        tree.insert_builder(a, TypeCategory::Structure, TypeBuilder::structure("S"), false, false)
            .unwrap();
        assert_eq!(tree.find_type("A::S").unwrap().name(), "A::S");
    }

    #[test]
    fn ignore_case_normalizes_lookups() {
        let mut tree = ModuleTree::new(true);
        let root = tree.root();
        tree.insert_builder(root, TypeCategory::Structure, TypeBuilder::structure("Point"), false, false)
            .unwrap();
        assert!(tree.find_type("POINT").is_some());
        let err = tree
            .insert_builder(root, TypeCategory::Structure, TypeBuilder::structure("POINT"), false, false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ParseErrorKind::RedefinitionError);
    }

    #[test]
    fn builtin_annotations_are_visible_from_nested_scopes() {
        let mut tree = ModuleTree::new(false);
        let a = tree.create_or_enter_submodule(tree.root(), "A").unwrap();
        assert!(tree.find_annotation(a, "key").is_some());
        assert!(tree.find_annotation(a, "extensibility").is_some());
    }

    #[test]
    fn smallvec_names_round_trip() {
        let name = ScopedName {
            absolute: false,
            segments: smallvec!["A".to_owned(), "B".to_owned()],
        };
        assert_eq!(name.to_string(), "A::B");
    }
}
