use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::name;
use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Schema;
use graphql_fetch_plan::include_from_selections;
use graphql_fetch_plan::CompileError;
use graphql_fetch_plan::CompiledQuery;
use graphql_fetch_plan::FetchRegistry;
use graphql_fetch_plan::JsonMap;
use graphql_fetch_plan::ResolveInfo;

pub struct Fixture {
    pub schema: Valid<Schema>,
    pub document: Valid<ExecutableDocument>,
}

pub fn fixture(sdl: &str, query: &str) -> Fixture {
    let schema = Schema::parse_and_validate(sdl, "schema.graphql")
        .unwrap_or_else(|errors| panic!("invalid schema: {errors}"));
    let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql")
        .unwrap_or_else(|errors| panic!("invalid document: {errors}"));
    Fixture { schema, document }
}

/// The single root field of the document's anonymous operation.
pub fn root_field(document: &Valid<ExecutableDocument>) -> &Field {
    let operation = document
        .get_operation(None)
        .expect("document has one operation");
    match operation.selection_set.selections.first() {
        Some(Selection::Field(field)) => field.as_ref(),
        _ => panic!("operation does not start with a field"),
    }
}

pub fn compile(fixture: &Fixture, registry: &FetchRegistry) -> Result<CompiledQuery, CompileError> {
    compile_with_variables(fixture, registry, JsonMap::default())
}

pub fn compile_with_variables(
    fixture: &Fixture,
    registry: &FetchRegistry,
    variables: JsonMap,
) -> Result<CompiledQuery, CompileError> {
    let field = root_field(&fixture.document);
    let ty = field.ty().inner_named_type().clone();
    let info = ResolveInfo {
        schema: &fixture.schema,
        document: &fixture.document,
        variables: &variables,
        parent_type: name!("Query"),
        field,
        path: Vec::new(),
    };
    include_from_selections(registry, &ty, &(), &info)
}

pub fn query_json(compiled: &CompiledQuery) -> String {
    serde_json::to_string_pretty(&compiled.query).expect("specification serializes")
}
