//! The fetch specification tree and the per-scope accumulator it is merged
//! into, with the merge, compatibility, and serialization operations.

use crate::mapping::FieldMappings;
use crate::JsonMap;
use crate::JsonValue;
use apollo_compiler::Name;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use serde::Serializer;

/// Named entries of one `select` or `include` block.
pub type FetchMap = IndexMap<Name, FetchNode>;

/// One entry of a [`FetchMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchNode {
    /// Fetch the named field or relation with its default sub-selection.
    /// Serializes as `true`.
    Default,
    /// Fetch the named relation with an explicit nested specification.
    Nested(FetchSpec),
}

/// One node of a fetch specification: what a data-store call should return
/// at this nesting level.
///
/// `select` returns exactly the named entries; `include` returns every scalar
/// field plus the named relations. A node never carries non-empty `select`
/// and `include` maps at the same time: since `include` already subsumes any
/// listed entry, `select` entries arriving at an `include` node fold into the
/// `include` map. The reverse direction (an `include` arriving at a `select`
/// node) changes the meaning of the node and is a compatibility failure.
///
/// `arguments` are passed through to the data store untouched (`take`,
/// `skip`, `where`, cursors, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSpec {
    pub arguments: JsonMap,
    pub select: FetchMap,
    pub include: FetchMap,
}

impl FetchSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A specification selecting exactly the given entries.
    pub fn with_select(select: FetchMap) -> Self {
        Self {
            select,
            ..Self::default()
        }
    }

    /// A specification including the given relations on top of all scalars.
    pub fn with_include(include: FetchMap) -> Self {
        Self {
            include,
            ..Self::default()
        }
    }

    /// Adds a passthrough argument such as `take` or `where`.
    pub fn with_argument(
        mut self,
        name: impl Into<serde_json_bytes::ByteString>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty() && self.select.is_empty() && self.include.is_empty()
    }

    /// Serializes to the data store's request shape:
    /// `{ ...arguments, "select"?: {...}, "include"?: {...} }`,
    /// omitting empty blocks.
    pub fn to_json(&self) -> JsonValue {
        let mut map = JsonMap::new();
        for (key, value) in &self.arguments {
            map.insert(key.clone(), value.clone());
        }
        if !self.select.is_empty() {
            map.insert("select", fetch_map_to_json(&self.select));
        }
        if !self.include.is_empty() {
            map.insert("include", fetch_map_to_json(&self.include));
        }
        JsonValue::Object(map)
    }
}

fn fetch_map_to_json(map: &FetchMap) -> JsonValue {
    let mut out = JsonMap::with_capacity(map.len());
    for (key, node) in map {
        let value = match node {
            FetchNode::Default => JsonValue::Bool(true),
            FetchNode::Nested(spec) => spec.to_json(),
        };
        out.insert(key.as_str(), value);
    }
    JsonValue::Object(out)
}

impl Serialize for FetchSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Mutable accumulator for one nesting scope of the walk: the fetch
/// specification assembled so far plus the output mapping being built
/// alongside it.
///
/// A scope does not own or point to its enclosing scope; the walk passes the
/// parent state down by `&mut` where a parent-scope merge may be needed.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub query: FetchSpec,
    pub mappings: FieldMappings,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Deep-merges a partial specification into `spec`.
///
/// Only called after [`selection_compatible`] passed, except for a type's
/// unconditional merge which runs before any field merge in its scope.
pub fn merge_selection(spec: &mut FetchSpec, partial: FetchSpec) {
    let FetchSpec {
        arguments,
        select,
        include,
    } = partial;
    for (key, value) in arguments {
        if !spec.arguments.contains_key(key.as_str()) {
            spec.arguments.insert(key, value);
        }
    }
    if !include.is_empty() {
        // Entering include mode: fold any accumulated select entries in,
        // include already returns every scalar they named.
        let folded = std::mem::take(&mut spec.select);
        for (key, node) in folded {
            merge_node(&mut spec.include, key, node);
        }
        for (key, node) in include {
            merge_node(&mut spec.include, key, node);
        }
    }
    for (key, node) in select {
        if spec.include.is_empty() {
            merge_node(&mut spec.select, key, node);
        } else {
            merge_node(&mut spec.include, key, node);
        }
    }
}

fn merge_node(map: &mut FetchMap, key: Name, node: FetchNode) {
    match map.entry(key) {
        Entry::Vacant(entry) => {
            entry.insert(node);
        }
        Entry::Occupied(mut entry) => match (entry.get_mut(), node) {
            (FetchNode::Nested(existing), FetchNode::Nested(incoming)) => {
                merge_selection(existing, incoming)
            }
            (FetchNode::Default, FetchNode::Default) => {}
            (slot @ FetchNode::Default, incoming @ FetchNode::Nested(_)) => *slot = incoming,
            (FetchNode::Nested(_), FetchNode::Default) => {}
        },
    }
}

/// Dry-run equivalent of [`merge_selection`]: would merging `partial` into
/// `spec` change the meaning of anything already accumulated?
///
/// Incompatible cases: a default-include entry and a nested specification
/// under the same key, `include` entries arriving at a node in `select`
/// mode, and (when `strict`) two different values for the same argument.
pub fn selection_compatible(spec: &FetchSpec, partial: &FetchSpec, strict: bool) -> bool {
    if strict {
        for (key, value) in &partial.arguments {
            if spec
                .arguments
                .get(key.as_str())
                .is_some_and(|existing| existing != value)
            {
                return false;
            }
        }
    }
    if !partial.include.is_empty() && spec.include.is_empty() && !spec.select.is_empty() {
        return false;
    }
    for (key, node) in &partial.include {
        if !node_compatible(spec.include.get(key), node, strict) {
            return false;
        }
    }
    // Select entries land wherever merge_selection would put them.
    let target = if spec.include.is_empty() {
        &spec.select
    } else {
        &spec.include
    };
    for (key, node) in &partial.select {
        if !node_compatible(target.get(key), node, strict) {
            return false;
        }
    }
    true
}

fn node_compatible(existing: Option<&FetchNode>, incoming: &FetchNode, strict: bool) -> bool {
    match (existing, incoming) {
        (None, _) => true,
        (Some(FetchNode::Default), FetchNode::Default) => true,
        (Some(FetchNode::Nested(existing)), FetchNode::Nested(incoming)) => {
            selection_compatible(existing, incoming, strict)
        }
        _ => false,
    }
}

/// Serializes a scope's accumulated specification into the minimal request
/// object: nested blocks left without entries or arguments collapse to a
/// default include, so the result never contains an empty `select` or
/// `include` block.
pub fn selection_to_query(state: &SelectionState) -> FetchSpec {
    prune(&state.query)
}

fn prune(spec: &FetchSpec) -> FetchSpec {
    let mut out = FetchSpec {
        arguments: spec.arguments.clone(),
        ..FetchSpec::default()
    };
    for (key, node) in &spec.select {
        out.select.insert(key.clone(), prune_node(node));
    }
    for (key, node) in &spec.include {
        out.include.insert(key.clone(), prune_node(node));
    }
    out
}

fn prune_node(node: &FetchNode) -> FetchNode {
    match node {
        FetchNode::Default => FetchNode::Default,
        FetchNode::Nested(spec) => {
            let pruned = prune(spec);
            if pruned.is_empty() {
                FetchNode::Default
            } else {
                FetchNode::Nested(pruned)
            }
        }
    }
}
