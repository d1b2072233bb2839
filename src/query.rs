//! The selection-set walk: turns one field resolution's selection tree plus
//! the registry's fetch declarations into a merged fetch specification and
//! the output mapping that locates each field in the fetch result.

use crate::arguments::coerce_argument_values;
use crate::arguments::InputCoercionError;
use crate::mapping::FieldMapping;
use crate::mapping::FieldMappings;
use crate::mapping::MappingStore;
use crate::mapping::ResponsePath;
use crate::registry::CallerSelection;
use crate::registry::FetchRegistry;
use crate::registry::FieldRequirement;
use crate::registry::IndirectStep;
use crate::selection::merge_selection;
use crate::selection::selection_compatible;
use crate::selection::selection_to_query;
use crate::selection::FetchSpec;
use crate::selection::SelectionState;
use crate::JsonMap;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use std::sync::Arc;

/// Errors that abort a walk before any data-store call is issued.
///
/// An incompatible fetch declaration is never an error: the field is left
/// out of the merged fetch and resolves independently at execution time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown field `{field}` on type `{ty}`")]
    UnknownField { field: Name, ty: Name },
    #[error("fragment `{0}` is not defined in this document")]
    UndefinedFragment(Name),
    #[error("can only resolve selections for object types, `{0}` is not an object type")]
    NonObjectType(Name),
    #[error(transparent)]
    InputCoercion(#[from] InputCoercionError),
}

/// The slice of the execution engine's resolve info the compiler consumes.
#[derive(Debug, Clone)]
pub struct ResolveInfo<'a> {
    pub schema: &'a Valid<Schema>,
    pub document: &'a Valid<ExecutableDocument>,
    pub variables: &'a JsonMap,
    /// Name of the type whose field is currently being resolved.
    pub parent_type: Name,
    /// The field selection under resolution.
    pub field: &'a Field,
    /// Response path of the resolution, used as the mapping-store key.
    pub path: ResponsePath,
}

/// A serialized fetch specification plus the mapping tree to persist before
/// the fetch executes.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub query: FetchSpec,
    pub mappings: FieldMappings,
}

/// Compiles the selection set of the field under resolution against `ty`,
/// the resolved type the selections apply to.
///
/// Walks the single field node of the current resolution; several
/// simultaneous root fields are not combined into one specification, each
/// resolution compiles its own.
pub fn include_from_selections<Ctx>(
    registry: &FetchRegistry<Ctx>,
    ty: &Name,
    context: &Ctx,
    info: &ResolveInfo<'_>,
) -> Result<CompiledQuery, CompileError> {
    let compiler = SelectionCompiler::new(registry, context, info);
    let mut state = SelectionState::new();
    compiler.add_type_selections(ty, &mut state, None, info.field, &[])?;
    Ok(CompiledQuery {
        query: selection_to_query(&state),
        mappings: state.mappings,
    })
}

/// [`include_from_selections`] for the field's own return type (or
/// `type_name` when the resolver returns a different concrete type), with
/// the mapping tree persisted into `store` under the resolution's path.
///
/// The returned specification is ready to pass to the data-store client.
pub fn query_from_info<Ctx>(
    registry: &FetchRegistry<Ctx>,
    context: &Ctx,
    info: &ResolveInfo<'_>,
    store: &MappingStore,
    type_name: Option<&Name>,
) -> Result<FetchSpec, CompileError> {
    let ty = type_name.unwrap_or_else(|| info.field.ty().inner_named_type());
    let compiled = include_from_selections(registry, ty, context, info)?;
    store.insert(info.path.clone(), compiled.mappings);
    Ok(compiled.query)
}

/// Compiles the single field under resolution against its parent type (or
/// `type_name`), for augmenting a fetch the execution engine issued on its
/// own rather than starting from an operation root.
///
/// Returns the raw, unserialized state so the caller can merge further
/// before finalizing with [`selection_to_query`].
pub fn selection_from_info<Ctx>(
    registry: &FetchRegistry<Ctx>,
    context: &Ctx,
    info: &ResolveInfo<'_>,
    type_name: Option<&Name>,
) -> Result<SelectionState, CompileError> {
    let ty = type_name.unwrap_or(&info.parent_type);
    let object = info
        .schema
        .get_object(ty.as_str())
        .ok_or_else(|| CompileError::NonObjectType(ty.clone()))?;
    let compiler = SelectionCompiler::new(registry, context, info);
    let mut state = SelectionState::new();
    compiler.add_field_selection(object, &mut state, None, info.field, &[])?;
    Ok(state)
}

struct SelectionCompiler<'a, Ctx> {
    registry: &'a FetchRegistry<Ctx>,
    schema: &'a Valid<Schema>,
    document: &'a Valid<ExecutableDocument>,
    variables: &'a JsonMap,
    context: &'a Ctx,
}

impl<'a, Ctx> SelectionCompiler<'a, Ctx> {
    fn new(registry: &'a FetchRegistry<Ctx>, context: &'a Ctx, info: &ResolveInfo<'a>) -> Self {
        Self {
            registry,
            schema: info.schema,
            document: info.document,
            variables: info.variables,
            context,
        }
    }

    /// Merges `ty`'s unconditional declarations into the scope, then walks
    /// the node's sub-selections. An indirect-include declaration on `ty`
    /// runs against the same node, in parallel with the regular walk.
    fn add_type_selections(
        &self,
        ty: &Name,
        state: &mut SelectionState,
        mut parent: Option<&mut SelectionState>,
        selection: &Field,
        indirect_path: &[Name],
    ) -> Result<(), CompileError> {
        if selection.name.as_str().starts_with("__") {
            return Ok(());
        }

        let type_fetch = self.registry.type_fetch(ty);

        if let Some(indirect) = type_fetch.and_then(|fetch| fetch.indirect.as_ref()) {
            self.resolve_indirect_include(
                ty,
                &selection.selection_set,
                &indirect.path,
                indirect_path.to_vec(),
                &mut |resolved_ty, field, path| {
                    self.add_type_selections(
                        resolved_ty,
                        &mut *state,
                        parent.as_deref_mut(),
                        field,
                        &path,
                    )
                },
            )?;
        }

        let Some(object) = self.schema.get_object(ty.as_str()) else {
            return Ok(());
        };

        if let Some(fetch) = type_fetch {
            if !fetch.include.is_empty() || !fetch.select.is_empty() {
                tracing::trace!(ty = %ty, "merging unconditional type declaration");
                merge_selection(
                    &mut state.query,
                    FetchSpec {
                        select: fetch.select.clone(),
                        include: fetch.include.clone(),
                        ..FetchSpec::default()
                    },
                );
            }
        }

        if !selection.selection_set.selections.is_empty() {
            self.add_nested_selections(
                object,
                state,
                parent,
                &selection.selection_set,
                indirect_path,
            )?;
        }
        Ok(())
    }

    /// Flattens a selection set onto the concrete type being walked:
    /// fragment spreads and inline fragments expand only when their type
    /// condition is absent or names that exact type.
    fn add_nested_selections(
        &self,
        object: &ObjectType,
        state: &mut SelectionState,
        mut parent: Option<&mut SelectionState>,
        selection_set: &SelectionSet,
        indirect_path: &[Name],
    ) -> Result<(), CompileError> {
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => self.add_field_selection(
                    object,
                    &mut *state,
                    parent.as_deref_mut(),
                    field.as_ref(),
                    indirect_path,
                )?,
                Selection::FragmentSpread(spread) => {
                    let fragment = self
                        .document
                        .fragments
                        .get(&spread.fragment_name)
                        .ok_or_else(|| {
                            CompileError::UndefinedFragment(spread.fragment_name.clone())
                        })?;
                    if *fragment.type_condition() != object.name {
                        continue;
                    }
                    self.add_nested_selections(
                        object,
                        &mut *state,
                        parent.as_deref_mut(),
                        &fragment.selection_set,
                        indirect_path,
                    )?;
                }
                Selection::InlineFragment(inline) => {
                    if inline
                        .type_condition
                        .as_ref()
                        .is_some_and(|condition| *condition != object.name)
                    {
                        continue;
                    }
                    self.add_nested_selections(
                        object,
                        &mut *state,
                        parent.as_deref_mut(),
                        &inline.selection_set,
                        indirect_path,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Resolves one field's declared fetch requirement and merges it into
    /// the current scope, or into the parent scope for a parent-scope
    /// declaration, recording the output mapping entry either way. A
    /// requirement incompatible with both scopes contributes nothing.
    fn add_field_selection(
        &self,
        object: &ObjectType,
        state: &mut SelectionState,
        parent: Option<&mut SelectionState>,
        field: &Field,
        indirect_path: &[Name],
    ) -> Result<(), CompileError> {
        if field.name.as_str().starts_with("__") {
            return Ok(());
        }

        let field_def = self
            .schema
            .type_field(object.name.as_str(), field.name.as_str())
            .map_err(|_| CompileError::UnknownField {
                field: field.name.clone(),
                ty: object.name.clone(),
            })?;

        let field_fetch = self.registry.field_fetch(&object.name, &field.name);
        let mut child_mappings = FieldMappings::default();

        let effective = match field_fetch.and_then(|fetch| fetch.select.as_ref()) {
            Some(FieldRequirement::Static(map)) => Some(map.clone()),
            Some(FieldRequirement::Computed(select)) => {
                let args = coerce_argument_values(field_def, field, self.variables)?;
                let return_ty = field_def.ty.inner_named_type();
                let select = Arc::clone(select);
                let mut walk_error = None;
                let map = select(&args, self.context, &mut |caller| {
                    let mut child = SelectionState::new();
                    if let Some(caller) = caller {
                        let query = match caller {
                            CallerSelection::Static(spec) => spec.clone(),
                            CallerSelection::Computed(compute) => compute(&args, self.context),
                        };
                        merge_selection(&mut child.query, query);
                    }
                    if let Err(error) =
                        self.add_type_selections(return_ty, &mut child, Some(&mut *state), field, &[])
                    {
                        walk_error = Some(error);
                    }
                    child_mappings = std::mem::take(&mut child.mappings);
                    selection_to_query(&child)
                });
                if let Some(error) = walk_error {
                    return Err(error);
                }
                Some(map)
            }
            None => None,
        };

        let entry = FieldMapping {
            field: field.name.clone(),
            mappings: child_mappings,
            indirect_path: indirect_path.to_vec(),
        };
        let response_key = field.response_key().clone();

        if let Some(map) = effective {
            let partial = FetchSpec::with_select(map);
            if selection_compatible(&state.query, &partial, true) {
                tracing::trace!(field = %field.name, "merging field requirement");
                merge_selection(&mut state.query, partial);
                state.mappings.insert(response_key, entry);
                return Ok(());
            }
            tracing::debug!(
                field = %field.name,
                ty = %object.name,
                "fetch requirement conflicts with the current scope"
            );
        }

        if let Some(parent_map) = field_fetch.and_then(|fetch| fetch.parent_select.as_ref()) {
            if let Some(parent) = parent {
                let partial = FetchSpec::with_select(parent_map.clone());
                if selection_compatible(&parent.query, &partial, true) {
                    merge_selection(&mut parent.query, partial);
                    state.mappings.insert(response_key, entry);
                    return Ok(());
                }
            }
        }

        // No usable requirement: the field resolves on its own at execution
        // time, it is simply absent from the combined fetch.
        tracing::debug!(
            field = %field.name,
            ty = %object.name,
            "field excluded from the combined fetch"
        );
        Ok(())
    }

    /// Follows a declared chain of wrapper fields through the node's
    /// sub-selections. Fragments expand under the same type-condition rule
    /// as the regular walk, carrying the same remaining path, so a wrapper
    /// declared once keeps working however deep the client's fragments nest
    /// it. Each matched field's response key extends the output path handed
    /// to `resolve`.
    fn resolve_indirect_include(
        &self,
        ty: &Name,
        selection_set: &SelectionSet,
        steps: &[IndirectStep],
        path: Vec<Name>,
        resolve: &mut dyn FnMut(&Name, &Field, Vec<Name>) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        let Some((step, rest)) = steps.split_first() else {
            return Ok(());
        };
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => {
                    if field.name != step.field || self.schema.get_object(ty.as_str()).is_none() {
                        continue;
                    }
                    let field_def = self
                        .schema
                        .type_field(ty.as_str(), field.name.as_str())
                        .map_err(|_| CompileError::UnknownField {
                            field: field.name.clone(),
                            ty: ty.clone(),
                        })?;
                    let return_ty = field_def.ty.inner_named_type();
                    let mut next = path.clone();
                    next.push(field.response_key().clone());
                    if rest.is_empty() {
                        resolve(return_ty, field.as_ref(), next)?;
                    } else {
                        self.resolve_indirect_include(
                            return_ty,
                            &field.selection_set,
                            rest,
                            next,
                            &mut *resolve,
                        )?;
                    }
                }
                Selection::FragmentSpread(spread) => {
                    let fragment = self
                        .document
                        .fragments
                        .get(&spread.fragment_name)
                        .ok_or_else(|| {
                            CompileError::UndefinedFragment(spread.fragment_name.clone())
                        })?;
                    if *fragment.type_condition() == step.type_name {
                        self.resolve_indirect_include(
                            &step.type_name,
                            &fragment.selection_set,
                            steps,
                            path.clone(),
                            &mut *resolve,
                        )?;
                    }
                }
                Selection::InlineFragment(inline) => {
                    let applies = inline
                        .type_condition
                        .as_ref()
                        .map_or(true, |condition| *condition == step.type_name);
                    if applies {
                        let next_ty = inline.type_condition.as_ref().unwrap_or(ty);
                        self.resolve_indirect_include(
                            next_ty,
                            &inline.selection_set,
                            steps,
                            path.clone(),
                            &mut *resolve,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}
