//! Integration tests for select compilation
//!
//! Drives the full path an application takes: operator names arriving as
//! strings, a condition tree accumulated in call order, field capabilities
//! parsed from mapping JSON, and the compiled outbound document.

use cuttle::condition::{
    Condition, MatchOperator, MultiMatchKind, MultiMatchOptions, Operand, OperatorOptions,
    QueryStringOptions,
};
use cuttle::{
    CompilerConfig, ConditionTree, NativeFieldCaps, Operator, SearchRequest, SelectCompiler,
    SortSpec, StaticFieldCaps,
};
use serde_json::json;

fn compile_with(caps: &StaticFieldCaps, request: &SearchRequest) -> serde_json::Value {
    let config = CompilerConfig::default();
    SelectCompiler::new(&config, caps).compile(request).unwrap()
}

fn product_caps() -> StaticFieldCaps {
    StaticFieldCaps::from_mapping(&json!({
        "products": {
            "mappings": {
                "properties": {
                    "name": {
                        "type": "text",
                        "fields": { "keyword": { "type": "keyword" } }
                    },
                    "description": { "type": "text" },
                    "category": { "type": "keyword" },
                    "price": { "type": "double" },
                    "created_at": { "type": "date" }
                }
            }
        }
    }))
    .unwrap()
}

#[test]
fn test_end_to_end_select_shape() {
    let caps = product_caps();
    let request = SearchRequest::new("products")
        .with_tree(
            ConditionTree::new()
                .and(Condition::eq("category", "tools"))
                .and(Condition::compare("price", Operator::Gt, 100)),
        )
        .with_sort(SortSpec::desc("price"))
        .with_size(10);
    let body = compile_with(&caps, &request);

    let must = body["query"]["bool"]["must"].as_array().unwrap();
    assert_eq!(must.len(), 2);
    assert_eq!(body["sort"], json!([{ "price": { "order": "desc" } }]));
    assert_eq!(body["size"], json!(10));
}

#[test]
fn test_operator_names_resolve_from_strings() {
    // The accumulation layer hands operator names over as strings
    for (name, expected) in [
        ("=", Operator::Eq),
        (">=", Operator::Gte),
        ("not between", Operator::NotBetween),
        ("like", Operator::Like),
        ("regexp", Operator::Regex),
        ("geo_distance", Operator::GeoDistance),
    ] {
        assert_eq!(name.parse::<Operator>().unwrap(), expected);
    }
    assert!("almost_equal".parse::<Operator>().is_err());
}

#[test]
fn test_in_resolves_through_mapping_variant() {
    let caps = product_caps();
    let request = SearchRequest::new("products").with_tree(
        ConditionTree::new().and(Condition::is_in("name", vec![json!("saw"), json!("drill")])),
    );
    let body = compile_with(&caps, &request);
    assert_eq!(
        body["query"],
        json!({ "terms": { "name.keyword": ["saw", "drill"] } })
    );
}

#[test]
fn test_exact_on_undeclared_text_fails() {
    let caps = product_caps();
    let config = CompilerConfig::default();
    let request = SearchRequest::new("products")
        .with_tree(ConditionTree::new().and(Condition::exact("description", "verbatim phrase")));
    let err = SelectCompiler::new(&config, &caps)
        .compile(&request)
        .unwrap_err();
    assert!(err.is_parameter());
    assert!(err.to_string().contains("description"));
}

#[test]
fn test_like_escapes_pattern_syntax() {
    let caps = product_caps();
    let request = SearchRequest::new("products")
        .with_tree(ConditionTree::new().and(Condition::like("name", r#"5/8" drive"#)));
    let body = compile_with(&caps, &request);
    assert_eq!(
        body["query"],
        json!({ "wildcard": { "name": "*5\\/8\\\" drive*" } })
    );
}

#[test]
fn test_or_grouping_matches_call_order() {
    let caps = product_caps();
    let request = SearchRequest::new("products").with_tree(
        ConditionTree::new()
            .and(Condition::eq("category", "tools"))
            .and(Condition::compare("price", Operator::Lt, 50))
            .or(Condition::eq("category", "garden")),
    );
    let body = compile_with(&caps, &request);
    let should = body["query"]["bool"]["should"].as_array().unwrap();
    assert_eq!(should.len(), 2);
    // First alternative keeps both AND terms
    assert_eq!(should[0]["bool"]["must"].as_array().unwrap().len(), 2);
    // Trailing bucket is the lone OR term
    assert_eq!(should[1], json!({ "match": { "category": "garden" } }));
}

#[test]
fn test_multi_match_and_query_string() {
    let caps = product_caps();
    let tree = ConditionTree::new()
        .and(Condition::multi_match(
            "cordless drill",
            MultiMatchOptions::fields(vec!["name^2".to_string(), "description".to_string()])
                .with_kind(MultiMatchKind::MostFields),
        ))
        .and(
            Condition::query_string("name:saw AND price:[10 TO 50]").with_options(
                OperatorOptions::QueryString(
                    QueryStringOptions::default().with_default_operator(MatchOperator::And),
                ),
            ),
        );
    let body = compile_with(&caps, &SearchRequest::new("products").with_tree(tree));
    let must = body["query"]["bool"]["must"].as_array().unwrap();
    assert_eq!(must[0]["multi_match"]["type"], json!("most_fields"));
    assert_eq!(must[0]["multi_match"]["fields"], json!(["name^2", "description"]));
    assert_eq!(
        must[1]["query_string"]["default_operator"],
        json!("and")
    );
}

#[test]
fn test_nested_condition_with_inner_hits() {
    let config = CompilerConfig::default();
    let request = SearchRequest::new("products").with_tree(
        ConditionTree::new().and(Condition::inner_nested(
            "variants",
            ConditionTree::new()
                .and(Condition::exact("sku", "X1"))
                .and(Condition::compare("stock", Operator::Gt, 0)),
        )),
    );
    let body = SelectCompiler::new(&config, &NativeFieldCaps)
        .compile(&request)
        .unwrap();
    let nested = &body["query"]["nested"];
    assert_eq!(nested["path"], json!("variants"));
    assert!(nested["inner_hits"].is_object());
    let inner_must = nested["query"]["bool"]["must"].as_array().unwrap();
    assert_eq!(inner_must[0], json!({ "term": { "variants.sku": "X1" } }));
    assert_eq!(
        inner_must[1],
        json!({ "range": { "variants.stock": { "gt": 0 } } })
    );
}

#[test]
fn test_filter_channel_is_part_of_the_tree_value() {
    let caps = product_caps();
    let tree = ConditionTree::new()
        .and(Condition::eq("name", "saw"))
        .filter(Condition::between("price", 10, 50))
        .filter(
            Condition::new(
                "category",
                Operator::NotIn,
                Operand::List(vec![json!("clearance")]),
            ),
        );
    let request = SearchRequest::new("products").with_tree(tree);
    let body = compile_with(&caps, &request);
    let bool_body = &body["query"]["bool"];
    assert_eq!(bool_body["must"].as_array().unwrap().len(), 1);
    assert_eq!(bool_body["filter"].as_array().unwrap().len(), 1);
    assert_eq!(bool_body["must_not"].as_array().unwrap().len(), 1);

    // Compiling the identical request again yields the identical document
    let again = compile_with(&caps, &request);
    assert_eq!(
        serde_json::to_string(&body).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}
