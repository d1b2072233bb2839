#![doc = include_str!("../README.md")]

pub mod arguments;
pub mod mapping;
pub mod query;
pub mod registry;
pub mod selection;

pub use self::arguments::coerce_argument_values;
pub use self::arguments::InputCoercionError;
pub use self::mapping::FieldMapping;
pub use self::mapping::FieldMappings;
pub use self::mapping::MappingStore;
pub use self::mapping::PathSegment;
pub use self::mapping::ResponsePath;
pub use self::query::include_from_selections;
pub use self::query::query_from_info;
pub use self::query::selection_from_info;
pub use self::query::CompileError;
pub use self::query::CompiledQuery;
pub use self::query::ResolveInfo;
pub use self::registry::CallerSelection;
pub use self::registry::FetchRegistry;
pub use self::registry::FieldFetch;
pub use self::registry::FieldRequirement;
pub use self::registry::IndirectInclude;
pub use self::registry::IndirectStep;
pub use self::registry::SelectFn;
pub use self::registry::TypeFetch;
pub use self::selection::merge_selection;
pub use self::selection::selection_compatible;
pub use self::selection::selection_to_query;
pub use self::selection::FetchMap;
pub use self::selection::FetchNode;
pub use self::selection::FetchSpec;
pub use self::selection::SelectionState;

/// A JSON-compatible dynamically-typed value.
pub type JsonValue = serde_json_bytes::Value;

/// A JSON-compatible object/map with string keys and dynamically-typed values.
pub type JsonMap = serde_json_bytes::Map<serde_json_bytes::ByteString, JsonValue>;
