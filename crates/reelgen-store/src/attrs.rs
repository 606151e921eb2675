//! JSON ↔ DynamoDB attribute conversion.
//!
//! Records serialize through serde_json and the resulting tree maps onto
//! attribute values structurally, so the table schema never needs to know
//! about individual input shapes.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{json, Value};

use reelgen_models::GenerationRecord;

use crate::error::{StoreError, StoreResult};

/// Convert a JSON value into a DynamoDB attribute value.
pub fn to_attr(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(to_attr).collect()),
        Value::Object(map) => {
            AttributeValue::M(map.into_iter().map(|(k, v)| (k, to_attr(v))).collect())
        }
    }
}

/// Convert a DynamoDB attribute value back into JSON.
pub fn from_attr(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => {
            if let Ok(i) = n.parse::<i64>() {
                json!(i)
            } else if let Ok(u) = n.parse::<u64>() {
                json!(u)
            } else if let Ok(f) = n.parse::<f64>() {
                json!(f)
            } else {
                Value::String(n.clone())
            }
        }
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attr).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attr(v)))
                .collect(),
        ),
        // Set types and binary never appear in our schema.
        _ => Value::Null,
    }
}

/// Serialize a record into a DynamoDB item.
pub fn record_to_item(record: &GenerationRecord) -> StoreResult<HashMap<String, AttributeValue>> {
    let value = serde_json::to_value(record)?;
    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, to_attr(v))).collect()),
        _ => Err(StoreError::backend(
            "serialize",
            "record did not serialize to an object",
        )),
    }
}

/// Deserialize a DynamoDB item into a record.
pub fn item_to_record(item: &HashMap<String, AttributeValue>) -> StoreResult<GenerationRecord> {
    let value = Value::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), from_attr(v)))
            .collect(),
    );
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_models::{
        GenerationAction, GenerationInput, GenerationOutputItem, GenerationRecord, Seed,
        Txt2imgParams,
    };

    fn record() -> GenerationRecord {
        GenerationRecord::completed(
            "a1b2c3d4e5".to_string(),
            1_700_000_000_000,
            GenerationAction::Txt2img,
            GenerationInput::Txt2img(Txt2imgParams {
                model_id: "ByteDance/SDXL-Lightning".to_string(),
                prompt: "a baby cat".to_string(),
                negative_prompt: String::new(),
                guidance_scale: 7.5,
                seed: Some(42),
                width: 512,
                height: 512,
                num_images_per_prompt: 2,
                user_id: Some("u1".to_string()),
            }),
            vec![GenerationOutputItem {
                url: "https://example.com/out.png".to_string(),
                seed: Seed::Num(42),
                nsfw: Some(false),
            }],
        )
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(to_attr(json!("x")), AttributeValue::S("x".to_string()));
        assert_eq!(to_attr(json!(12)), AttributeValue::N("12".to_string()));
        assert_eq!(to_attr(json!(true)), AttributeValue::Bool(true));
        assert_eq!(to_attr(Value::Null), AttributeValue::Null(true));

        assert_eq!(from_attr(&AttributeValue::N("12".to_string())), json!(12));
        assert_eq!(
            from_attr(&AttributeValue::N("0.5".to_string())),
            json!(0.5)
        );
    }

    #[test]
    fn test_nested_structure_roundtrip() {
        let value = json!({
            "outputs": [{"url": "https://a", "seed": 1}],
            "duration": 1234,
            "nested": {"k": null}
        });
        assert_eq!(from_attr(&to_attr(value.clone())), value);
    }

    #[test]
    fn test_record_item_roundtrip() {
        let rec = record();
        let item = record_to_item(&rec).unwrap();
        assert_eq!(item["id"], AttributeValue::S(rec.id.clone()));
        assert_eq!(
            item["timestamp"],
            AttributeValue::N(rec.timestamp.to_string())
        );
        assert_eq!(item["action"], AttributeValue::S("txt2img".to_string()));

        let back = item_to_record(&item).unwrap();
        assert_eq!(back.id, rec.id);
        assert_eq!(back.timestamp, rec.timestamp);
        assert_eq!(back.action, rec.action);
        assert_eq!(back.outputs.len(), 1);
        assert!(matches!(back.input, GenerationInput::Txt2img(_)));
    }

    #[test]
    fn test_absent_optionals_stay_absent() {
        let mut rec = record();
        rec.userid = None;
        rec.visibility = None;
        let item = record_to_item(&rec).unwrap();
        assert!(!item.contains_key("userid"));
        assert!(!item.contains_key("visibility"));
    }
}
