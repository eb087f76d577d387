#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests decoding and re-encoding realistic ER7 messages
//!
//! Fixture files are stored with one segment per line; they are converted to
//! carriage-return delimited text before decoding.

use er7_codec::{AckCode, Er7Error, HeaderInfo, ParserOptions, PipeParser, UnexpectedSegmentBehavior};
use pretty_assertions::assert_eq;
use std::path::Path;

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name);
    let data = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    data.lines().map(|line| format!("{line}\r")).collect()
}

const FIXTURES: [&str; 4] = [
    "adt_a04.hl7",
    "oru_r01.hl7",
    "orm_o01.hl7",
    "custom_delimiters.hl7",
];

// --- Round trips ---

#[test]
fn fixtures_round_trip() {
    let parser = PipeParser::new();
    for name in FIXTURES {
        let text = fixture(name);
        let message = parser
            .decode(&text)
            .unwrap_or_else(|e| panic!("{name}: decode failed: {e}"));
        let encoded = parser
            .encode(&message)
            .unwrap_or_else(|e| panic!("{name}: encode failed: {e}"));
        assert_eq!(encoded, text, "{name}");
    }
}

#[test]
fn fixtures_decode_is_stable() {
    let parser = PipeParser::new();
    for name in FIXTURES {
        let first = parser.decode(&fixture(name)).expect("Test operation should succeed");
        let encoded = parser.encode(&first).expect("Test operation should succeed");
        let second = parser.decode(&encoded).expect("Test operation should succeed");
        assert_eq!(first, second, "{name}");
    }
}

// --- ADT ---

#[test]
fn adt_a04_uses_adt_a01_structure() {
    let parser = PipeParser::new();
    let text = fixture("adt_a04.hl7");

    let header = HeaderInfo::peek(&text).expect("Test operation should succeed");
    assert_eq!(header.structure, "ADT_A04");
    assert!(!header.explicit);

    let message = parser.decode(&text).expect("Test operation should succeed");
    assert_eq!(message.structure(), "ADT_A01");
    assert_eq!(message.version(), "2.5");
    assert_eq!(message.control_id(), Some("000001"));

    let pid = message.root().segment("PID", 0).expect("Test operation should succeed");
    assert_eq!(pid.value(3, 1, 1, 1), Some("371-66-9256"));
    assert_eq!(pid.value(3, 1, 5, 1), Some("SS"));
    assert_eq!(pid.value(5, 0, 2, 1), Some("ANDREW"));
    assert_eq!(pid.value(11, 0, 3, 1), Some("BIRMINGHAM"));

    let allergy = message.root().segment("AL1", 0).expect("Test operation should succeed");
    // An empty leading component holds no subcomponents
    assert_eq!(allergy.value(3, 0, 1, 1), None);
    assert_eq!(allergy.value(3, 0, 2, 1), Some("PENICILLIN"));
}

#[test]
fn adt_custom_segment_is_kept_inline() {
    let parser = PipeParser::new();
    let message = parser
        .decode(&fixture("adt_a04.hl7"))
        .expect("Test operation should succeed");

    let names: Vec<&str> = message.root().slots().iter().map(|s| s.name()).collect();
    let dg1 = names.iter().position(|n| *n == "DG1").expect("DG1 slot");
    assert_eq!(names[dg1 + 1], "ZPV");

    let slot = message.root().slot("ZPV").expect("Test operation should succeed");
    assert!(slot.is_non_standard());
    let zpv = message.root().segment("ZPV", 0).expect("Test operation should succeed");
    assert_eq!(zpv.value(2, 0, 2, 1), Some("data"));
}

#[test]
fn adt_custom_segment_can_fail() {
    let parser = PipeParser::new().with_options(
        ParserOptions::new().with_unexpected_segments(UnexpectedSegmentBehavior::Fail),
    );
    let result = parser.decode(&fixture("adt_a04.hl7"));
    assert_eq!(
        result.err(),
        Some(Er7Error::UnexpectedSegment {
            name: "ZPV".to_string(),
            line: 8,
        })
    );
}

// --- ORU ---

#[test]
fn oru_observations_are_grouped() {
    let parser = PipeParser::new();
    let message = parser
        .decode(&fixture("oru_r01.hl7"))
        .expect("Test operation should succeed");
    assert_eq!(message.version(), "2.5.1");

    let result = message
        .root()
        .group("PATIENT_RESULT", 0)
        .expect("Test operation should succeed");
    let orders = result.get_all("ORDER_OBSERVATION");
    assert_eq!(orders.len(), 2);

    let first = orders[0].as_group().expect("Test operation should succeed");
    assert_eq!(first.get_all("OBSERVATION").len(), 3);
    let order_note = first.segment("NTE", 0).expect("Test operation should succeed");
    assert_eq!(order_note.value(3, 0, 1, 1), Some("Sample slightly hemolyzed"));

    let last_observation = first
        .group("OBSERVATION", 2)
        .expect("Test operation should succeed");
    let note = last_observation
        .segment("NTE", 0)
        .expect("Test operation should succeed");
    assert_eq!(note.value(3, 0, 1, 1), Some("Called to clinic"));

    let second = orders[1].as_group().expect("Test operation should succeed");
    assert!(second.segment("ORC", 0).is_none());
    assert_eq!(second.get_all("OBSERVATION").len(), 1);
}

#[test]
fn oru_observation_values_follow_value_type() {
    let parser = PipeParser::new();
    let message = parser
        .decode(&fixture("oru_r01.hl7"))
        .expect("Test operation should succeed");

    let observations: Vec<_> = message
        .segments()
        .into_iter()
        .filter(|s| s.name() == "OBX")
        .collect();
    assert_eq!(observations.len(), 4);

    assert_eq!(observations[0].field_data_type(5), Some("NM"));
    assert_eq!(observations[0].value(5, 0, 1, 1), Some("7.2"));

    let coded = observations[1];
    assert_eq!(coded.field_data_type(5), Some("CE"));
    let ce = coded.resolved_type(5).expect("Test operation should succeed");
    assert_eq!(ce.components.first().map(String::as_str), Some("ST"));
    assert_eq!(coded.value(5, 0, 2, 1), Some("A Positive"));

    // Formatting escapes are not delimiters and stay in the value
    assert_eq!(
        observations[2].value(5, 0, 1, 1),
        Some("Result \\H\\reviewed\\N\\ by pathologist")
    );
}

// --- ORM ---

#[test]
fn orm_orders_repeat() {
    let parser = PipeParser::new();
    let message = parser
        .decode(&fixture("orm_o01.hl7"))
        .expect("Test operation should succeed");
    assert_eq!(message.structure(), "ORM_O01");

    assert!(message.root().segment("NTE", 0).is_some());
    let patient = message
        .root()
        .group("PATIENT", 0)
        .expect("Test operation should succeed");
    assert!(patient.group("PATIENT_VISIT", 0).is_some());

    let orders = message.root().get_all("ORDER");
    assert_eq!(orders.len(), 2);
    let detail = orders[0]
        .as_group()
        .and_then(|order| order.group("ORDER_DETAIL", 0))
        .expect("Test operation should succeed");
    assert!(detail.group("OBSERVATION", 0).is_some());
    assert_eq!(
        orders[1]
            .as_group()
            .and_then(|order| order.find_segment("OBR"))
            .and_then(|obr| obr.value(2, 0, 1, 1)),
        Some("ORD7782")
    );
}

// --- Delimiters ---

#[test]
fn custom_delimiters_are_honored() {
    let parser = PipeParser::new();
    let message = parser
        .decode(&fixture("custom_delimiters.hl7"))
        .expect("Test operation should succeed");

    let chars = message
        .encoding_characters()
        .expect("Test operation should succeed");
    assert_eq!(chars.field_separator(), '*');
    assert_eq!(chars.component_separator(), '%');
    assert_eq!(chars.repetition_separator(), '$');
    assert_eq!(chars.escape_character(), '!');
    assert_eq!(chars.subcomponent_separator(), '@');

    let pid = message.find_segment("PID").expect("Test operation should succeed");
    assert_eq!(pid.value(3, 0, 4, 1), Some("HOSP"));
    assert_eq!(pid.value(3, 1, 1, 1), Some("888"));

    let obx = message.find_segment("OBX").expect("Test operation should succeed");
    assert_eq!(obx.value(5, 0, 1, 1), Some("value with a star * inside"));
    assert_eq!(obx.value(6, 0, 1, 2), Some("dL"));
}

// --- Acknowledgments ---

#[test]
fn ack_for_each_fixture() {
    let parser = PipeParser::new();
    for name in FIXTURES {
        let message = parser.decode(&fixture(name)).expect("Test operation should succeed");
        let ack = parser
            .generate_ack(&message, AckCode::AE, Some("rejected for test"))
            .expect("Test operation should succeed");
        assert_eq!(ack.structure(), "ACK");
        assert_eq!(ack.version(), message.version());

        let text = parser.encode(&ack).expect("Test operation should succeed");
        let decoded = parser.decode(&text).expect("Test operation should succeed");
        let msa = decoded.find_segment("MSA").expect("Test operation should succeed");
        assert_eq!(msa.value(1, 0, 1, 1), Some("AE"));
        assert_eq!(msa.value(2, 0, 1, 1), message.control_id());
        assert_eq!(msa.value(3, 0, 1, 1), Some("rejected for test"));
        assert_eq!(
            decoded.encoding_characters().ok(),
            message.encoding_characters().ok(),
            "{name}"
        );
    }
}
