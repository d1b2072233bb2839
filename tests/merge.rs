use apollo_compiler::name;
use apollo_compiler::Name;
use graphql_fetch_plan::merge_selection;
use graphql_fetch_plan::selection_compatible;
use graphql_fetch_plan::selection_to_query;
use graphql_fetch_plan::FetchMap;
use graphql_fetch_plan::FetchNode;
use graphql_fetch_plan::FetchSpec;
use graphql_fetch_plan::SelectionState;
use pretty_assertions::assert_eq;

fn select_of(entries: impl IntoIterator<Item = (Name, FetchNode)>) -> FetchSpec {
    FetchSpec::with_select(entries.into_iter().collect::<FetchMap>())
}

fn include_of(entries: impl IntoIterator<Item = (Name, FetchNode)>) -> FetchSpec {
    FetchSpec::with_include(entries.into_iter().collect::<FetchMap>())
}

#[test]
fn merge_is_idempotent() {
    let partial = select_of([
        (name!("title"), FetchNode::Default),
        (
            name!("comments"),
            FetchNode::Nested(FetchSpec::new().with_argument("take", 5)),
        ),
    ]);

    let mut once = FetchSpec::new();
    merge_selection(&mut once, partial.clone());
    let mut twice = once.clone();
    assert!(selection_compatible(&twice, &partial, true));
    merge_selection(&mut twice, partial);

    assert_eq!(once, twice);
}

#[test]
fn merge_of_compatible_parts_is_order_insensitive() {
    let parts = [
        select_of([(name!("title"), FetchNode::Default)]),
        select_of([(
            name!("author"),
            FetchNode::Nested(select_of([(name!("name"), FetchNode::Default)])),
        )]),
        select_of([(
            name!("author"),
            FetchNode::Nested(select_of([(name!("email"), FetchNode::Default)])),
        )]),
    ];

    let mut forward = FetchSpec::new();
    for part in parts.clone() {
        merge_selection(&mut forward, part);
    }
    let mut backward = FetchSpec::new();
    for part in parts.into_iter().rev() {
        merge_selection(&mut backward, part);
    }

    // Key order differs, the resulting trees do not.
    assert_eq!(forward.to_json(), backward.to_json());
}

#[test]
fn select_folds_into_include() {
    let mut spec = include_of([(name!("author"), FetchNode::Default)]);
    let partial = select_of([(name!("title"), FetchNode::Default)]);

    assert!(selection_compatible(&spec, &partial, true));
    merge_selection(&mut spec, partial);

    assert!(spec.select.is_empty());
    assert_eq!(
        spec.include.keys().collect::<Vec<_>>(),
        [&name!("author"), &name!("title")],
    );
}

#[test]
fn include_does_not_fold_into_select() {
    let spec = select_of([(name!("title"), FetchNode::Default)]);
    let partial = include_of([(name!("author"), FetchNode::Default)]);

    assert!(!selection_compatible(&spec, &partial, true));
}

#[test]
fn default_conflicts_with_nested_at_the_same_key() {
    let spec = select_of([(name!("author"), FetchNode::Default)]);
    let partial = select_of([(
        name!("author"),
        FetchNode::Nested(select_of([(name!("name"), FetchNode::Default)])),
    )]);

    assert!(!selection_compatible(&spec, &partial, true));
    assert!(!selection_compatible(&partial, &spec, true));
}

#[test]
fn strict_compatibility_compares_arguments() {
    let spec = select_of([(
        name!("comments"),
        FetchNode::Nested(FetchSpec::new().with_argument("take", 5)),
    )]);
    let partial = select_of([(
        name!("comments"),
        FetchNode::Nested(FetchSpec::new().with_argument("take", 10)),
    )]);

    assert!(!selection_compatible(&spec, &partial, true));
    assert!(selection_compatible(&spec, &partial, false));
}

#[test]
fn serialization_drops_empty_blocks() {
    let mut state = SelectionState::new();
    merge_selection(
        &mut state.query,
        select_of([
            (name!("posts"), FetchNode::Nested(FetchSpec::new())),
            (
                name!("comments"),
                FetchNode::Nested(FetchSpec::new().with_argument("take", 2)),
            ),
        ]),
    );

    let query = selection_to_query(&state);
    assert_eq!(
        serde_json::to_string(&query).unwrap(),
        r#"{"select":{"posts":true,"comments":{"take":2}}}"#,
    );
}

#[test]
fn empty_state_serializes_to_an_empty_object() {
    let state = SelectionState::new();
    let query = selection_to_query(&state);
    assert!(query.is_empty());
    assert_eq!(serde_json::to_string(&query).unwrap(), "{}");
}
