//! Two-stage decode of a model response: find the array, then decode it strictly.

use std::collections::BTreeMap;

use serde_json::value::RawValue;
use serde_json::{Map, Value};
use snapledger_core::RecordError;

type RawObject = BTreeMap<String, Box<RawValue>>;

/// Substring from the first `[` to the last `]`, inclusive.
///
/// Tolerates prose and code fences around the array.
pub fn locate_payload(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

/// Locate and decode the JSON array of objects embedded in `response`.
pub fn decode_payload(response: &str) -> Result<Vec<Map<String, Value>>, RecordError> {
    let payload = locate_payload(response).ok_or_else(|| RecordError::NoPayloadFound {
        response: response.to_string(),
    })?;

    let objects: Vec<RawObject> =
        serde_json::from_str(payload).map_err(|source| RecordError::MalformedPayload {
            response: response.to_string(),
            source,
        })?;
    Ok(objects.into_iter().map(decode_fields).collect())
}

// A field that can't be held as a `Value` (e.g. `1e400`) becomes null on its own.
fn decode_fields(object: RawObject) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(raw.get()).unwrap_or(Value::Null);
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_plain_array() {
        assert_eq!(locate_payload("[]"), Some("[]"));
        assert_eq!(locate_payload("[{\"a\":1}]"), Some("[{\"a\":1}]"));
    }

    #[test]
    fn test_locate_inside_prose_and_fences() {
        let r = "Sure! Here you go:\n```json\n[{\"merchant\":\"A\"}]\n```\nAnything else?";
        assert_eq!(locate_payload(r), Some("[{\"merchant\":\"A\"}]"));
    }

    #[test]
    fn test_locate_missing_brackets() {
        assert_eq!(locate_payload("I could not find anything."), None);
        assert_eq!(locate_payload("only an opening ["), None);
        assert_eq!(locate_payload("only a closing ]"), None);
        assert_eq!(locate_payload("backwards ] then ["), None);
    }

    #[test]
    fn test_decode_no_payload() {
        let err = decode_payload("nothing here").unwrap_err();
        assert!(matches!(
            err,
            RecordError::NoPayloadFound { ref response } if response == "nothing here"
        ));
    }

    #[test]
    fn test_decode_malformed_keeps_response() {
        let r = "Result: [{\"merchant\": \"A\",}] done";
        let err = decode_payload(r).unwrap_err();
        match err {
            RecordError::MalformedPayload { response, .. } => assert_eq!(response, r),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(matches!(
            decode_payload("[1, 2, 3]"),
            Err(RecordError::MalformedPayload { .. })
        ));
        assert!(matches!(
            decode_payload("[{\"a\":1}, \"b\"]"),
            Err(RecordError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_decode_spans_first_to_last_bracket() {
        // two arrays in one response are not a single valid payload
        assert!(matches!(
            decode_payload("[{\"a\":1}] and also [{\"b\":2}]"),
            Err(RecordError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_decode_objects_in_order() {
        let objs = decode_payload("x [{\"merchant\":\"A\"},{\"merchant\":\"B\"}] y").unwrap();
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0]["merchant"], "A");
        assert_eq!(objs[1]["merchant"], "B");
    }

    #[test]
    fn test_decode_out_of_range_number_nulls_that_field() {
        let objs = decode_payload(r#"[{"merchant":"A","amount":1e400},{"amount":3}]"#).unwrap();
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0]["merchant"], "A");
        assert_eq!(objs[0]["amount"], Value::Null);
        assert_eq!(objs[1]["amount"], 3);
    }
}
