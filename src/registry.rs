//! Fetch declarations attached to types and fields.
//!
//! Schema plugins know how a GraphQL type or field maps onto the data store;
//! the compiler does not. At schema-build time the host resolves those
//! declarations into a [`FetchRegistry`], a fixed lookup table keyed by type
//! name and field name, which the walk then consults read-only.

use crate::selection::FetchMap;
use crate::selection::FetchNode;
use crate::selection::FetchSpec;
use crate::JsonMap;
use apollo_compiler::Name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A fetch requirement computed from the field's resolved arguments and the
/// execution context.
///
/// The third parameter is a continuation the function may invoke to fold a
/// caller-declared sub-query together with the result of walking the field's
/// own sub-selections into a fresh child scope; its return value is the
/// nested specification for the field's relation.
pub type SelectFn<Ctx> = Arc<
    dyn Fn(&JsonMap, &Ctx, &mut dyn FnMut(Option<&CallerSelection<Ctx>>) -> FetchSpec) -> FetchMap
        + Send
        + Sync,
>;

/// A sub-query supplied by the caller of a relation field, folded into the
/// child scope before the field's own sub-selections are walked.
pub enum CallerSelection<Ctx> {
    Static(FetchSpec),
    Computed(Arc<dyn Fn(&JsonMap, &Ctx) -> FetchSpec + Send + Sync>),
}

impl<Ctx> fmt::Debug for CallerSelection<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(spec) => f.debug_tuple("Static").field(spec).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// What a field needs fetched into its own scope.
pub enum FieldRequirement<Ctx> {
    Static(FetchMap),
    Computed(SelectFn<Ctx>),
}

impl<Ctx> fmt::Debug for FieldRequirement<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(map) => f.debug_tuple("Static").field(map).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// One step of an indirect include: the wrapper field to traverse and the
/// wrapper type that declares it. Fragments encountered at this step expand
/// only when their type condition names that wrapper type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectStep {
    pub field: Name,
    pub type_name: Name,
}

impl IndirectStep {
    pub fn new(field: Name, type_name: Name) -> Self {
        Self { field, type_name }
    }
}

/// A declared chain of wrapper fields to traverse before reaching the type's
/// real fetch target, e.g. unwrapping a connection through `edges` and
/// `node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectInclude {
    pub path: Vec<IndirectStep>,
}

impl IndirectInclude {
    pub fn new(path: impl IntoIterator<Item = IndirectStep>) -> Self {
        Self {
            path: path.into_iter().collect(),
        }
    }
}

/// Fetch declarations for one type.
pub struct TypeFetch<Ctx> {
    pub(crate) include: FetchMap,
    pub(crate) select: FetchMap,
    pub(crate) indirect: Option<IndirectInclude>,
    pub(crate) fields: HashMap<Name, FieldFetch<Ctx>>,
}

impl<Ctx> TypeFetch<Ctx> {
    fn new() -> Self {
        Self {
            include: FetchMap::default(),
            select: FetchMap::default(),
            indirect: None,
            fields: HashMap::new(),
        }
    }

    /// Unconditionally includes a relation with its defaults whenever this
    /// type is visited.
    pub fn include_field(&mut self, name: Name) -> &mut Self {
        self.include.insert(name, FetchNode::Default);
        self
    }

    /// Unconditionally includes a relation with an explicit nested node.
    pub fn include(&mut self, name: Name, node: FetchNode) -> &mut Self {
        self.include.insert(name, node);
        self
    }

    /// Unconditionally selects an entry whenever this type is visited.
    pub fn select(&mut self, name: Name, node: FetchNode) -> &mut Self {
        self.select.insert(name, node);
        self
    }

    /// Declares that this type's real fetch target lives behind a chain of
    /// wrapper fields.
    pub fn indirect_include(&mut self, indirect: IndirectInclude) -> &mut Self {
        self.indirect = Some(indirect);
        self
    }

    /// Declarations for one of this type's fields.
    pub fn field(&mut self, name: Name) -> &mut FieldFetch<Ctx> {
        self.fields.entry(name).or_insert_with(FieldFetch::new)
    }
}

/// Fetch declarations for one field.
pub struct FieldFetch<Ctx> {
    pub(crate) select: Option<FieldRequirement<Ctx>>,
    pub(crate) parent_select: Option<FetchMap>,
}

impl<Ctx> FieldFetch<Ctx> {
    fn new() -> Self {
        Self {
            select: None,
            parent_select: None,
        }
    }

    /// The field's data is covered by fixed entries of its own scope's fetch.
    pub fn select_static(&mut self, select: FetchMap) -> &mut Self {
        self.select = Some(FieldRequirement::Static(select));
        self
    }

    /// The field's fetch requirement depends on its arguments, the execution
    /// context, and possibly the caller's own sub-query.
    pub fn select_with<F>(&mut self, select: F) -> &mut Self
    where
        F: Fn(&JsonMap, &Ctx, &mut dyn FnMut(Option<&CallerSelection<Ctx>>) -> FetchSpec) -> FetchMap
            + Send
            + Sync
            + 'static,
    {
        self.select = Some(FieldRequirement::Computed(Arc::new(select)));
        self
    }

    /// The field is a projection over data the enclosing scope fetches;
    /// these entries merge into the parent scope instead of this one.
    pub fn parent_select(&mut self, select: FetchMap) -> &mut Self {
        self.parent_select = Some(select);
        self
    }
}

/// All fetch declarations known for a schema, resolved once at build time.
pub struct FetchRegistry<Ctx = ()> {
    types: HashMap<Name, TypeFetch<Ctx>>,
}

impl<Ctx> FetchRegistry<Ctx> {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Declarations for the named type, created empty on first access.
    pub fn ty(&mut self, name: Name) -> &mut TypeFetch<Ctx> {
        self.types.entry(name).or_insert_with(TypeFetch::new)
    }

    pub(crate) fn type_fetch(&self, name: &Name) -> Option<&TypeFetch<Ctx>> {
        self.types.get(name)
    }

    pub(crate) fn field_fetch(&self, ty: &Name, field: &Name) -> Option<&FieldFetch<Ctx>> {
        self.types.get(ty)?.fields.get(field)
    }
}

impl<Ctx> Default for FetchRegistry<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}
