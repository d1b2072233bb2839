use crate::helpers::compile;
use crate::helpers::fixture;
use apollo_compiler::name;
use expect_test::expect;
use graphql_fetch_plan::FetchNode;
use graphql_fetch_plan::FetchRegistry;
use graphql_fetch_plan::IndirectInclude;
use graphql_fetch_plan::IndirectStep;
use pretty_assertions::assert_eq;

const CONNECTION_SDL: &str = r#"
    type Query {
        posts: PostConnection
    }
    type PostConnection {
        totalCount: Int
        edges: [PostEdge!]
    }
    type PostEdge {
        cursor: String
        node: Post
    }
    type Post {
        title: String
        author: User
    }
    type User {
        name: String
    }
"#;

/// Declares `PostConnection` as a two-level wrapper around `Post`: the
/// fetch requirements live on `Post`, the connection itself fetches
/// nothing.
fn connection_registry() -> FetchRegistry {
    let mut registry = FetchRegistry::new();
    registry
        .ty(name!("PostConnection"))
        .indirect_include(IndirectInclude::new([
            IndirectStep::new(name!("edges"), name!("PostConnection")),
            IndirectStep::new(name!("node"), name!("PostEdge")),
        ]));
    registry.ty(name!("Post")).include_field(name!("author"));
    registry
        .ty(name!("Post"))
        .field(name!("title"))
        .select_static([(name!("title"), FetchNode::Default)].into());
    registry
}

#[test]
fn wrapper_types_unwrap_to_the_underlying_object() {
    let fixture = fixture(
        CONNECTION_SDL,
        "{ posts { totalCount edges { cursor node { title author { name } } } } }",
    );
    let compiled = compile(&fixture, &connection_registry()).unwrap();

    // Requirements declared on Post surface at the top of the fetch; the
    // wrapper fields themselves contribute nothing.
    expect![[r#"
        {
          "include": {
            "author": true,
            "title": true
          }
        }"#]]
    .assert_eq(&crate::helpers::query_json(&compiled));

    let title = &compiled.mappings[&name!("title")];
    assert_eq!(title.field, name!("title"));
    assert_eq!(title.indirect_path, [name!("edges"), name!("node")]);
}

#[test]
fn indirect_paths_record_response_keys() {
    let fixture = fixture(
        CONNECTION_SDL,
        "{ posts { e: edges { n: node { title } } } }",
    );
    let compiled = compile(&fixture, &connection_registry()).unwrap();

    let title = &compiled.mappings[&name!("title")];
    assert_eq!(title.indirect_path, [name!("e"), name!("n")]);
}

#[test]
fn fragments_around_wrapper_fields_still_unwrap() {
    let spread = fixture(
        CONNECTION_SDL,
        "{ posts { ...connection } }
         fragment connection on PostConnection { edges { node { title } } }",
    );
    let inline = fixture(
        CONNECTION_SDL,
        "{ posts { edges { ... on PostEdge { node { title } } } } }",
    );
    let registry = connection_registry();

    for fixture in [&spread, &inline] {
        let compiled = compile(fixture, &registry).unwrap();
        assert_eq!(
            serde_json::to_string(&compiled.query).unwrap(),
            r#"{"include":{"author":true,"title":true}}"#,
        );
        assert_eq!(
            compiled.mappings[&name!("title")].indirect_path,
            [name!("edges"), name!("node")],
        );
    }
}

#[test]
fn unmatched_wrapper_selection_fetches_nothing() {
    let fixture = fixture(CONNECTION_SDL, "{ posts { totalCount } }");
    let compiled = compile(&fixture, &connection_registry()).unwrap();

    assert!(compiled.query.is_empty());
    assert!(compiled.mappings.is_empty());
}
