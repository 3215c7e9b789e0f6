use crate::plan::*;

fn sample_limit() -> Operator {
    Operator::LimitOp(LimitOp { limit: 10 })
}

#[test]
fn json_round_trip() {
    let op = sample_limit();
    let text = op.to_json();
    assert_eq!(text, r#"{"LimitOp":{"limit":10}}"#);
    assert_eq!(Operator::from_json(&text).unwrap(), op);
}

#[test]
fn json_is_deterministic() {
    let op = Operator::MemSinkOp(MemorySinkOp {
        name: "out".to_string(),
        column_names: vec!["a".to_string(), "b".to_string()],
        column_types: vec![DataType::Int64, DataType::String],
    });
    assert_eq!(op.to_json(), op.to_json());
}

#[test]
fn malformed_json_is_rejected() {
    let err = Operator::from_json(r#"{"LimitOp":{"limit":"ten"}}"#).unwrap_err();
    assert!(matches!(err, crate::json::PlanError::Json(_)));
    assert!(Operator::from_json("{").is_err());
}
