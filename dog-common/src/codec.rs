//! JSON wire format for [`DogEvent`]: one flat UTF-8 object per message.

use thiserror::Error;

use crate::event::DogEvent;

#[derive(Error, Debug)]
#[error("failed to serialize dog event: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("received empty payload")]
    EmptyPayload,
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

pub fn encode(event: &DogEvent) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(event)?)
}

/// Decodes a message body. Invalid UTF-8, invalid JSON, a non-object body
/// and mistyped fields all come back as [`DecodeError::MalformedPayload`].
/// A missing toy is not an error here, see [`DogEvent`].
pub fn decode(payload: Option<&[u8]>) -> Result<DogEvent, DecodeError> {
    let payload = match payload {
        Some(p) if !p.is_empty() => p,
        _ => return Err(DecodeError::EmptyPayload),
    };

    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::UNKNOWN;
    use crate::generator::DogEventGenerator;

    fn decode_str(body: &str) -> Result<DogEvent, DecodeError> {
        decode(Some(body.as_bytes()))
    }

    #[test]
    fn generated_events_survive_a_round_trip() {
        for event in DogEventGenerator::with_seed(7).take(200) {
            let bytes = encode(&event).unwrap();
            assert_eq!(decode(Some(bytes.as_slice())).unwrap(), event);
        }
    }

    #[test]
    fn encodes_a_flat_object_with_fixed_field_names() {
        let event = DogEvent::new("Bubba", "Golden Retriever", 3, "Tennis ball");
        let value: serde_json::Value = serde_json::from_slice(&encode(&event).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "Bubba",
                "breed": "Golden Retriever",
                "age": 3,
                "favorite_toy": "Tennis ball"
            })
        );
    }

    #[test]
    fn decodes_the_abstract_and_csv_field_names() {
        let abstract_names = r#"{"subject_name":"Rex","category_a":"Poodle","numeric_attribute":9,"tagged_value":"Rope"}"#;
        assert_eq!(
            decode_str(abstract_names).unwrap(),
            DogEvent::new("Rex", "Poodle", 9, "Rope")
        );

        let csv_names = r#"{"timestamp":"2025-01-01T00:00:00","dog_name":"Duke","breed":"Beagle","toy":"Stick"}"#;
        let event = decode_str(csv_names).unwrap();
        assert_eq!(event.name, "Duke");
        assert_eq!(event.favorite_toy.as_deref(), Some("Stick"));
        assert_eq!(event.age, None);
    }

    #[test]
    fn missing_descriptive_fields_become_unknown() {
        let event = decode_str(r#"{"favorite_toy":"Frisbee"}"#).unwrap();
        assert_eq!(event.name, UNKNOWN);
        assert_eq!(event.breed, UNKNOWN);
        assert_eq!(event.age, None);
        assert_eq!(event.favorite_toy.as_deref(), Some("Frisbee"));

        let event = decode_str(r#"{"name":null,"breed":"Labrador","age":null}"#).unwrap();
        assert_eq!(event.name, UNKNOWN);
        assert_eq!(event.breed, "Labrador");
        assert_eq!(event.age, None);
    }

    #[test]
    fn missing_null_or_blank_toy_is_absent_not_an_error() {
        for body in [
            r#"{"name":"Daisy","breed":"Bulldog","age":4}"#,
            r#"{"name":"Daisy","breed":"Bulldog","age":4,"favorite_toy":null}"#,
            r#"{"name":"Daisy","breed":"Bulldog","age":4,"favorite_toy":"  "}"#,
        ] {
            let event = decode_str(body).unwrap();
            assert_eq!(event.favorite_toy, None);
            assert_eq!(event.name, "Daisy");
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let event = decode_str(r#"{"name":"Louie","favorite_toy":"Stuffie","owner":"Sam"}"#).unwrap();
        assert_eq!(event.favorite_toy.as_deref(), Some("Stuffie"));
    }

    #[test]
    fn consumer_does_not_assume_age_bounds() {
        let event = decode_str(r#"{"age":-4,"favorite_toy":"Rope"}"#).unwrap();
        assert_eq!(event.age, Some(-4));
        let event = decode_str(r#"{"age":4000,"favorite_toy":"Rope"}"#).unwrap();
        assert_eq!(event.age, Some(4000));
    }

    #[test]
    fn unrepresentable_age_keeps_the_record() {
        for body in [
            r#"{"name":"Rex","breed":"Poodle","age":10000000000000000000,"favorite_toy":"Rope"}"#,
            r#"{"name":"Rex","breed":"Poodle","age":-1e300,"favorite_toy":"Rope"}"#,
            r#"{"name":"Rex","breed":"Poodle","age":2.5,"favorite_toy":"Rope"}"#,
        ] {
            let event = decode_str(body).unwrap();
            assert_eq!(event.age, None);
            assert_eq!(event.name, "Rex");
            assert_eq!(event.favorite_toy.as_deref(), Some("Rope"));
        }
    }

    #[test]
    fn primary_field_names_win_over_their_aliases() {
        let event = decode_str(
            r#"{"subject_name":"Duke","name":"Rex","category_a":"Beagle","breed":"Poodle","numeric_attribute":9,"age":3,"toy":"Stick","favorite_toy":"Rope"}"#,
        )
        .unwrap();
        assert_eq!(event, DogEvent::new("Rex", "Poodle", 3, "Rope"));

        // A null or blank primary falls through to the alias
        let event = decode_str(
            r#"{"name":null,"subject_name":"Duke","favorite_toy":" ","tagged_value":"Frisbee"}"#,
        )
        .unwrap();
        assert_eq!(event.name, "Duke");
        assert_eq!(event.favorite_toy.as_deref(), Some("Frisbee"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        for body in [
            "not json",
            r#"{"name": "Rex""#,
            "[1, 2, 3]",
            r#""Rope""#,
            r#"{"age":"three","favorite_toy":"Rope"}"#,
            r#"{"favorite_toy":42}"#,
        ] {
            assert!(
                matches!(decode_str(body), Err(DecodeError::MalformedPayload(_))),
                "expected {body:?} to be malformed"
            );
        }
    }

    #[test]
    fn rejects_invalid_utf8() {
        let body: &[u8] = &[0xff, 0xfe, 0x00];
        assert!(matches!(
            decode(Some(body)),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn rejects_empty_payloads() {
        assert!(matches!(decode(None), Err(DecodeError::EmptyPayload)));
        assert!(matches!(decode_str(""), Err(DecodeError::EmptyPayload)));
    }
}
