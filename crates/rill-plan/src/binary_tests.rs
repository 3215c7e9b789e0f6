use crate::json::PlanError;
use crate::plan::*;

fn sample_map() -> Operator {
    Operator::MapOp(MapOp {
        column_names: vec!["out".to_string()],
        expressions: vec![ScalarExpression::Func(ScalarFunc {
            id: 1,
            name: "pl.add".to_string(),
            args: vec![
                ScalarExpression::Constant(ScalarValue {
                    data_type: DataType::Int64,
                    value: LiteralValue::Int64Value(10),
                }),
                ScalarExpression::Column(ColumnReference { node: 0, index: 4 }),
            ],
        })],
    })
}

#[test]
fn binary_round_trip() {
    let op = sample_map();
    let bytes = op.to_binary();
    let back = Operator::from_binary(&bytes).unwrap();
    assert_eq!(back, op);
}

#[test]
fn binary_is_deterministic() {
    assert_eq!(sample_map().to_binary(), sample_map().to_binary());
}

#[test]
fn optional_times_round_trip() {
    for times in [(None, None), (Some(10), Some(20))] {
        let op = Operator::MemSourceOp(MemorySourceOp {
            name: "t".to_string(),
            column_idxs: vec![1],
            column_names: vec!["c".to_string()],
            column_types: vec![DataType::Int64],
            start_time: times.0.map(|value| TimestampValue { value }),
            stop_time: times.1.map(|value| TimestampValue { value }),
        });
        assert_eq!(Operator::from_binary(&op.to_binary()).unwrap(), op);
    }
}

#[test]
fn truncated_input_is_rejected() {
    let bytes = sample_map().to_binary();
    let err = Operator::from_binary(&bytes[..bytes.len() / 2]).unwrap_err();
    assert!(matches!(err, PlanError::Binary(_)));
}
