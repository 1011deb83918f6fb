use collection_literals::btree;
use isoresource_core::{Schema, Value};
use isoresource_form::{flatten, parse_form_body, FlatRecord, FormError, MAX_ARRAY_INDEX};
use rstest::rstest;

fn profile_schema() -> Schema {
    Schema::object([
        ("name", Schema::string()),
        ("age", Schema::number()),
        ("newsletter", Schema::boolean().default(false)),
        ("status", Schema::enumeration(["active", "paused"]).default("active")),
        ("hobbies", Schema::array(Schema::string().optional()).optional()),
        (
            "address",
            Schema::object([("city", Schema::string()), ("zip", Schema::string().optional())]).optional(),
        ),
    ])
}

#[test]
fn numeric_strings_become_numbers() {
    let schema = Schema::object([("age", Schema::number())]);
    let value = parse_form_body(&FlatRecord::from_pairs([("age", "20")]), &schema).unwrap();
    assert_eq!(value, Value::Map(btree! { "age".to_string() => Value::Integer(20) }));
}

#[test]
fn unindexed_arrays_collect_values() {
    let schema = Schema::object([("hobbies", Schema::array(Schema::string()))]);
    let record = FlatRecord::from_pairs([("hobbies[]", Value::from(vec!["guitar", "piano"]))]);
    let value = parse_form_body(&record, &schema).unwrap();
    assert_eq!(value.get("hobbies"), Some(&Value::from(vec!["guitar", "piano"])));
}

#[test]
fn indexed_arrays_leave_holes() {
    let schema = Schema::object([("hobbies", Schema::array(Schema::string().optional()))]);
    let record = FlatRecord::from_pairs([("hobbies[1]", "guitar"), ("hobbies[5]", "piano")]);
    let value = parse_form_body(&record, &schema).unwrap();

    let hobbies = value.get("hobbies").and_then(Value::as_array).unwrap();
    assert_eq!(hobbies.len(), 6);
    for hole in [0, 2, 3, 4] {
        assert!(hobbies[hole].is_undefined(), "index {} should be a hole", hole);
    }
    assert_eq!(hobbies[1], Value::from("guitar"));
    assert_eq!(hobbies[5], Value::from("piano"));
}

#[rstest]
#[case::usize_max(usize::MAX)]
#[case::one_past_limit(MAX_ARRAY_INDEX + 1)]
#[case::huge_allocation(4_000_000_000)]
fn oversized_indices_are_rejected(#[case] index: usize) {
    let schema = Schema::object([("hobbies", Schema::array(Schema::string().optional()))]);
    let key = format!("hobbies%5B{}%5D=x", index);
    let record = FlatRecord::from_urlencoded(key.as_bytes());
    assert_eq!(
        parse_form_body(&record, &schema),
        Err(FormError::IndexOutOfRange {
            key: format!("hobbies[{}]", index),
            index,
        })
    );
}

#[test]
fn index_at_limit_is_accepted() {
    let schema = Schema::object([("hobbies", Schema::array(Schema::string().optional()))]);
    let record = FlatRecord::from_pairs([(format!("hobbies[{}]", MAX_ARRAY_INDEX), "x")]);
    let value = parse_form_body(&record, &schema).unwrap();
    let hobbies = value.get("hobbies").and_then(Value::as_array).unwrap();
    assert_eq!(hobbies.len(), MAX_ARRAY_INDEX + 1);
    assert_eq!(hobbies[MAX_ARRAY_INDEX], Value::from("x"));
}

#[rstest]
#[case::past_max("9223372036854775808")]
#[case::past_min("-1e19")]
#[case::far_past_max("1e30")]
fn out_of_range_integers_are_rejected(#[case] raw: &str) {
    let schema = Schema::object([("id", Schema::integer())]);
    let record = FlatRecord::from_pairs([("id", raw)]);
    let Err(FormError::Validation(error)) = parse_form_body(&record, &schema) else {
        panic!("expected a validation error for {}", raw);
    };
    assert_eq!(error.issues.len(), 1);
    assert_eq!(error.issues[0].dotted_path(), "id");
}

#[test]
fn omitted_fields_receive_defaults() {
    let record = FlatRecord::from_pairs([("name", "Ada"), ("age", "36")]);
    let value = parse_form_body(&record, &profile_schema()).unwrap();
    assert_eq!(value.get("newsletter"), Some(&Value::Bool(false)));
    assert_eq!(value.get("status"), Some(&Value::from("active")));
    assert_eq!(value.get("hobbies"), None);
}

#[test]
fn empty_fields_fall_back_to_defaults() {
    let record = FlatRecord::from_pairs([("name", "Ada"), ("age", "36"), ("status", "")]);
    let value = parse_form_body(&record, &profile_schema()).unwrap();
    assert_eq!(value.get("status"), Some(&Value::from("active")));
}

#[test]
fn parse_matches_schema_validation() {
    let record = FlatRecord::from_pairs([("name", "Ada"), ("age", "old")]);
    let Err(FormError::Validation(error)) = parse_form_body(&record, &profile_schema()) else {
        panic!("expected a validation error");
    };
    assert_eq!(error.issues.len(), 1);
    assert_eq!(error.issues[0].dotted_path(), "age");
}

#[test]
fn arrays_must_use_brackets() {
    let record = FlatRecord::from_pairs([("name", "Ada"), ("age", "1"), ("hobbies", "chess")]);
    assert_eq!(
        parse_form_body(&record, &profile_schema()),
        Err(FormError::ArrayWithoutBrackets {
            key: "hobbies".to_string(),
            field: "hobbies".to_string(),
        })
    );
}

#[test]
fn nested_arrays_are_unsupported() {
    let schema = Schema::object([(
        "groups",
        Schema::array(Schema::object([("name", Schema::string())])),
    )]);
    let record = FlatRecord::from_pairs([("groups[].name", "admins")]);
    assert!(matches!(
        parse_form_body(&record, &schema),
        Err(FormError::NestedUnindexedArray { .. })
    ));
}

#[test]
fn unknown_paths_are_reported_with_their_key() {
    let record = FlatRecord::from_pairs([("address.country", "NZ")]);
    match parse_form_body(&record, &profile_schema()) {
        Err(FormError::UnexpectedPath { key, segment, .. }) => {
            assert_eq!(key, "address.country");
            assert_eq!(segment, "country");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn flatten_then_parse_is_idempotent() {
    let record = FlatRecord::from_urlencoded(
        b"name=Ada&age=36&newsletter=on&hobbies%5B1%5D=chess&hobbies%5B3%5D=go&address.city=London",
    );
    let schema = profile_schema();
    let first = parse_form_body(&record, &schema).unwrap();

    let reflattened: FlatRecord = flatten(&first).unwrap().into_iter().collect();
    let second = parse_form_body(&reflattened, &schema).unwrap();
    assert_eq!(first, second);
}
