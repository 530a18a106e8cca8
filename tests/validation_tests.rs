use axum::http::{Method, StatusCode, Uri};
use contest_portal::{
    contract::{ParamKind, ParamValue, RouteContract, Schema},
    validation::{ValidationError, validate, validate_value},
};
use serde_json::json;

fn uri(text: &str) -> Uri {
    text.parse().unwrap()
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn fields(error: &ValidationError) -> Vec<&str> {
    error.issues.iter().map(|i| i.field.as_str()).collect()
}

fn update_contract() -> RouteContract {
    RouteContract::new("updateAnnouncement", Method::PUT, "/announcement/:announcementId")
        .path_param("announcementId", ParamKind::Integer)
        .body(
            Schema::object()
                .field("value", Schema::String)
                .optional("show", Schema::Boolean),
        )
        .response(StatusCode::OK, Schema::Null)
}

fn search_contract() -> RouteContract {
    RouteContract::new("getProblems", Method::GET, "/problem")
        .optional_query_param("search", ParamKind::String)
        .query_param("page", ParamKind::Integer)
        .response(StatusCode::OK, Schema::Null)
}

// --- Path Parameters ---

#[test]
fn valid_request_is_fully_typed() {
    let validated = validate(
        &update_contract(),
        &params(&[("announcementId", "12")]),
        &uri("/announcement/12"),
        br#"{"value":"hello","show":false}"#,
    )
    .unwrap();

    assert_eq!(validated.params.integer("announcementId"), Some(12));
    assert_eq!(validated.body, Some(json!({ "value": "hello", "show": false })));
}

#[test]
fn non_numeric_path_param_is_rejected() {
    let error = validate(
        &update_contract(),
        &params(&[("announcementId", "twelve")]),
        &uri("/announcement/twelve"),
        br#"{"value":"hello"}"#,
    )
    .unwrap_err();

    assert_eq!(error.issues.len(), 1);
    assert_eq!(error.issues[0].field, "params.announcementId");
    assert_eq!(error.issues[0].expected, "integer");
    assert_eq!(error.issues[0].received.as_deref(), Some("twelve"));
}

#[test]
fn every_issue_is_reported_in_order() {
    let error = validate(
        &update_contract(),
        &params(&[("announcementId", "1.5")]),
        &uri("/announcement/1.5"),
        br#"{"show":"yes"}"#,
    )
    .unwrap_err();

    assert_eq!(fields(&error), vec!["params.announcementId", "body.value", "body.show"]);
}

// --- Query ---

#[test]
fn query_params_are_coerced() {
    let validated = validate(&search_contract(), &[], &uri("/problem?page=2&search=path"), b"").unwrap();
    assert_eq!(validated.query.integer("page"), Some(2));
    assert_eq!(validated.query.get("search"), Some(&ParamValue::String("path".to_string())));
}

#[test]
fn optional_query_param_may_be_absent() {
    let validated = validate(&search_contract(), &[], &uri("/problem?page=1"), b"").unwrap();
    assert_eq!(validated.query.string("search"), None);
}

#[test]
fn missing_required_query_param_is_rejected() {
    let error = validate(&search_contract(), &[], &uri("/problem"), b"").unwrap_err();
    assert_eq!(fields(&error), vec!["query.page"]);
}

#[test]
fn unknown_query_param_is_rejected() {
    let error = validate(&search_contract(), &[], &uri("/problem?page=1&sort=asc"), b"").unwrap_err();
    assert_eq!(fields(&error), vec!["query.sort"]);
}

#[test]
fn repeated_query_param_is_rejected() {
    let error = validate(&search_contract(), &[], &uri("/problem?page=1&page=2"), b"").unwrap_err();
    assert_eq!(fields(&error), vec!["query.page"]);
    assert_eq!(error.issues[0].expected, "a single value");
}

#[test]
fn percent_encoded_query_values_are_decoded() {
    let validated =
        validate(&search_contract(), &[], &uri("/problem?page=1&search=a%20plus"), b"").unwrap();
    assert_eq!(validated.query.string("search"), Some("a plus"));
}

// --- Body ---

#[test]
fn unknown_body_field_is_rejected() {
    let error = validate(
        &update_contract(),
        &params(&[("announcementId", "1")]),
        &uri("/announcement/1"),
        br#"{"value":"x","pinned":true}"#,
    )
    .unwrap_err();
    assert_eq!(fields(&error), vec!["body.pinned"]);
}

#[test]
fn empty_body_is_rejected_when_schema_declared() {
    let error = validate(
        &update_contract(),
        &params(&[("announcementId", "1")]),
        &uri("/announcement/1"),
        b"",
    )
    .unwrap_err();
    assert_eq!(error.issues[0].received.as_deref(), Some("empty body"));
}

#[test]
fn malformed_json_is_rejected() {
    let error = validate(
        &update_contract(),
        &params(&[("announcementId", "1")]),
        &uri("/announcement/1"),
        b"{not json",
    )
    .unwrap_err();
    assert_eq!(error.issues[0].expected, "valid JSON");
}

#[test]
fn body_on_bodyless_contract_is_rejected() {
    let error = validate(&search_contract(), &[], &uri("/problem?page=1"), br#"{"a":1}"#).unwrap_err();
    assert_eq!(fields(&error), vec!["body"]);
    assert_eq!(error.issues[0].expected, "no body");
}

#[test]
fn whitespace_body_counts_as_empty() {
    assert!(validate(&search_contract(), &[], &uri("/problem?page=1"), b"  \n").is_ok());
}

// --- Values ---

#[test]
fn integer_schema_rejects_fractions() {
    let error = validate_value(&Schema::Integer, &json!(1.5), "response").unwrap_err();
    assert_eq!(error.issues[0].field, "response");
    assert_eq!(error.issues[0].received.as_deref(), Some("number"));
}

#[test]
fn nested_objects_report_full_paths() {
    let schema = Schema::array_of(Schema::object().field("id", Schema::Integer).into());
    let error = validate_value(&schema, &json!([{ "id": 1 }, { "id": "2" }]), "response").unwrap_err();
    assert_eq!(fields(&error), vec!["response[1].id"]);
}

#[test]
fn issues_serialize_without_absent_received() {
    let error = validate(&search_contract(), &[], &uri("/problem"), b"").unwrap_err();
    assert_eq!(
        serde_json::to_value(&error.issues).unwrap(),
        json!([{ "field": "query.page", "expected": "integer" }])
    );
}
