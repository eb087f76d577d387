//! Built-in structure catalog
//!
//! Covers the acknowledgment, admission, order and result messages that most
//! interfaces exchange, for every version from 2.3 to 2.6. Segment layouts list
//! the leading fields that carry routing and identity data; later fields decode
//! fine without a schema entry, they just have no name or declared type.

use super::{ChildSpec, DataTypeSchema, FieldSchema, GroupSchema, SegmentSchema, StaticRegistry};
use std::sync::{Arc, LazyLock};

/// Versions the catalog registers every structure for
pub const SUPPORTED_VERSIONS: [&str; 6] = ["2.3", "2.3.1", "2.4", "2.5", "2.5.1", "2.6"];

static STANDARD: LazyLock<Arc<StaticRegistry>> = LazyLock::new(|| Arc::new(build()));

/// Shared registry holding the built-in catalog
pub fn standard() -> Arc<StaticRegistry> {
    Arc::clone(&STANDARD)
}

/// Build a fresh registry holding the built-in catalog
///
/// Use this to extend the catalog with site-specific structures.
pub fn build() -> StaticRegistry {
    let mut registry = StaticRegistry::new();
    for version in SUPPORTED_VERSIONS {
        for schema in messages() {
            registry.message(version, schema);
        }
        for schema in groups() {
            registry.group(version, schema);
        }
        for schema in segments() {
            registry.segment(version, schema);
        }
        for schema in data_types() {
            registry.data_type(version, schema);
        }
        for (event, structure) in ALIASES {
            registry.alias(version, event, structure);
        }
    }
    registry
}

/// Event-derived message names that reuse another structure
const ALIASES: [(&str, &str); 10] = [
    ("ADT_A04", "ADT_A01"),
    ("ADT_A08", "ADT_A01"),
    ("ADT_A13", "ADT_A01"),
    ("ADT_A05", "ADT_A01"),
    ("ADT_A14", "ADT_A01"),
    ("ADT_A28", "ADT_A01"),
    ("ADT_A31", "ADT_A01"),
    ("ORU_R30", "ORU_R01"),
    ("ORM_O02", "ORM_O01"),
    ("ACK_A01", "ACK"),
];

fn seg(name: &str) -> ChildSpec {
    ChildSpec::segment(name)
}

fn opt(name: &str) -> ChildSpec {
    ChildSpec::segment(name).optional()
}

fn rep(name: &str) -> ChildSpec {
    ChildSpec::segment(name).optional().repeating()
}

fn messages() -> Vec<GroupSchema> {
    vec![
        GroupSchema::new(
            "ACK",
            vec![seg("MSH"), rep("SFT"), seg("MSA"), rep("ERR")],
        ),
        GroupSchema::new(
            "ADT_A01",
            vec![
                seg("MSH"),
                rep("SFT"),
                seg("EVN"),
                seg("PID"),
                opt("PD1"),
                rep("ROL"),
                rep("NK1"),
                seg("PV1"),
                opt("PV2"),
                rep("ROL"),
                rep("DB1"),
                rep("OBX"),
                rep("AL1"),
                rep("DG1"),
                opt("DRG"),
                ChildSpec::group("PROCEDURE", "ADT_A01_PROCEDURE")
                    .optional()
                    .repeating(),
                rep("GT1"),
                ChildSpec::group("INSURANCE", "ADT_A01_INSURANCE")
                    .optional()
                    .repeating(),
                opt("ACC"),
                opt("UB1"),
                opt("UB2"),
                opt("PDA"),
            ],
        ),
        GroupSchema::new(
            "ORU_R01",
            vec![
                seg("MSH"),
                rep("SFT"),
                ChildSpec::group("PATIENT_RESULT", "ORU_R01_PATIENT_RESULT").repeating(),
                opt("DSC"),
            ],
        ),
        GroupSchema::new(
            "ORM_O01",
            vec![
                seg("MSH"),
                rep("NTE"),
                ChildSpec::group("PATIENT", "ORM_O01_PATIENT").optional(),
                ChildSpec::group("ORDER", "ORM_O01_ORDER").repeating(),
            ],
        ),
    ]
}

fn groups() -> Vec<GroupSchema> {
    vec![
        GroupSchema::new("ADT_A01_PROCEDURE", vec![seg("PR1"), rep("ROL")]),
        GroupSchema::new(
            "ADT_A01_INSURANCE",
            vec![seg("IN1"), opt("IN2"), rep("IN3"), rep("ROL")],
        ),
        GroupSchema::new(
            "ORU_R01_PATIENT_RESULT",
            vec![
                ChildSpec::group("PATIENT", "ORU_R01_PATIENT").optional(),
                ChildSpec::group("ORDER_OBSERVATION", "ORU_R01_ORDER_OBSERVATION").repeating(),
            ],
        ),
        GroupSchema::new(
            "ORU_R01_PATIENT",
            vec![
                seg("PID"),
                opt("PD1"),
                rep("NTE"),
                rep("NK1"),
                ChildSpec::group("VISIT", "ORU_R01_VISIT").optional(),
            ],
        ),
        GroupSchema::new("ORU_R01_VISIT", vec![seg("PV1"), opt("PV2")]),
        GroupSchema::new(
            "ORU_R01_ORDER_OBSERVATION",
            vec![
                opt("ORC"),
                seg("OBR"),
                rep("NTE"),
                ChildSpec::group("TIMING_QTY", "ORU_R01_TIMING_QTY")
                    .optional()
                    .repeating(),
                opt("CTD"),
                ChildSpec::group("OBSERVATION", "ORU_R01_OBSERVATION")
                    .optional()
                    .repeating(),
                rep("FT1"),
                rep("CTI"),
                ChildSpec::group("SPECIMEN", "ORU_R01_SPECIMEN")
                    .optional()
                    .repeating(),
            ],
        ),
        GroupSchema::new("ORU_R01_TIMING_QTY", vec![seg("TQ1"), rep("TQ2")]),
        GroupSchema::new("ORU_R01_OBSERVATION", vec![seg("OBX"), rep("NTE")]),
        GroupSchema::new("ORU_R01_SPECIMEN", vec![seg("SPM"), rep("OBX")]),
        GroupSchema::new(
            "ORM_O01_PATIENT",
            vec![
                seg("PID"),
                opt("PD1"),
                rep("NTE"),
                ChildSpec::group("PATIENT_VISIT", "ORM_O01_PATIENT_VISIT").optional(),
                ChildSpec::group("INSURANCE", "ORM_O01_INSURANCE")
                    .optional()
                    .repeating(),
                opt("GT1"),
                rep("AL1"),
            ],
        ),
        GroupSchema::new("ORM_O01_PATIENT_VISIT", vec![seg("PV1"), opt("PV2")]),
        GroupSchema::new("ORM_O01_INSURANCE", vec![seg("IN1"), opt("IN2"), opt("IN3")]),
        GroupSchema::new(
            "ORM_O01_ORDER",
            vec![
                seg("ORC"),
                ChildSpec::group("ORDER_DETAIL", "ORM_O01_ORDER_DETAIL").optional(),
                rep("FT1"),
                rep("CTI"),
                opt("BLG"),
            ],
        ),
        GroupSchema::new(
            "ORM_O01_ORDER_DETAIL",
            vec![
                seg("OBR").choice(),
                seg("RQD").choice(),
                seg("RQ1").choice(),
                seg("RXO").choice(),
                seg("ODS").choice(),
                seg("ODT").choice(),
                rep("NTE"),
                opt("CTD"),
                rep("DG1"),
                ChildSpec::group("OBSERVATION", "ORM_O01_OBSERVATION")
                    .optional()
                    .repeating(),
            ],
        ),
        GroupSchema::new("ORM_O01_OBSERVATION", vec![seg("OBX"), rep("NTE")]),
    ]
}

fn field(name: &str, data_type: &str) -> FieldSchema {
    FieldSchema::new(name, data_type)
}

fn segments() -> Vec<SegmentSchema> {
    let mut segments = vec![
        SegmentSchema::new(
            "MSH",
            vec![
                field("Field Separator", "ST").required(),
                field("Encoding Characters", "ST").required(),
                field("Sending Application", "HD"),
                field("Sending Facility", "HD"),
                field("Receiving Application", "HD"),
                field("Receiving Facility", "HD"),
                field("Date/Time Of Message", "TS").required(),
                field("Security", "ST"),
                field("Message Type", "MSG").required(),
                field("Message Control ID", "ST").required(),
                field("Processing ID", "PT").required(),
                field("Version ID", "VID").required(),
                field("Sequence Number", "NM"),
                field("Continuation Pointer", "ST"),
                field("Accept Acknowledgment Type", "ID"),
                field("Application Acknowledgment Type", "ID"),
                field("Country Code", "ID"),
                field("Character Set", "ID").repetitions(0),
                field("Principal Language Of Message", "CE"),
                field("Alternate Character Set Handling Scheme", "ID"),
                field("Message Profile Identifier", "EI").repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "MSA",
            vec![
                field("Acknowledgment Code", "ID").required(),
                field("Message Control ID", "ST").required(),
                field("Text Message", "ST"),
                field("Expected Sequence Number", "NM"),
                field("Delayed Acknowledgment Type", "ID"),
                field("Error Condition", "CE"),
            ],
        ),
        SegmentSchema::new(
            "ERR",
            vec![
                field("Error Code and Location", "ELD").repetitions(0),
                field("Error Location", "ERL").repetitions(0),
                field("HL7 Error Code", "CWE"),
                field("Severity", "ID"),
                field("Application Error Code", "CWE"),
                field("Application Error Parameter", "ST").repetitions(10),
                field("Diagnostic Information", "TX"),
                field("User Message", "TX"),
            ],
        ),
        SegmentSchema::new(
            "SFT",
            vec![
                field("Software Vendor Organization", "XON").required(),
                field("Software Certified Version or Release Number", "ST").required(),
                field("Software Product Name", "ST").required(),
                field("Software Binary ID", "ST").required(),
                field("Software Product Information", "TX"),
                field("Software Install Date", "TS"),
            ],
        ),
        SegmentSchema::new(
            "EVN",
            vec![
                field("Event Type Code", "ID"),
                field("Recorded Date/Time", "TS").required(),
                field("Date/Time Planned Event", "TS"),
                field("Event Reason Code", "IS"),
                field("Operator ID", "XCN").repetitions(0),
                field("Event Occurred", "TS"),
                field("Event Facility", "HD"),
            ],
        ),
        SegmentSchema::new(
            "PID",
            vec![
                field("Set ID - PID", "SI"),
                field("Patient ID", "CX"),
                field("Patient Identifier List", "CX")
                    .required()
                    .repetitions(0),
                field("Alternate Patient ID - PID", "CX").repetitions(0),
                field("Patient Name", "XPN").required().repetitions(0),
                field("Mother's Maiden Name", "XPN").repetitions(0),
                field("Date/Time of Birth", "TS"),
                field("Administrative Sex", "IS"),
                field("Patient Alias", "XPN").repetitions(0),
                field("Race", "CE").repetitions(0),
                field("Patient Address", "XAD").repetitions(0),
                field("County Code", "IS"),
                field("Phone Number - Home", "XTN").repetitions(0),
                field("Phone Number - Business", "XTN").repetitions(0),
                field("Primary Language", "CE"),
                field("Marital Status", "CE"),
                field("Religion", "CE"),
                field("Patient Account Number", "CX"),
                field("SSN Number - Patient", "ST"),
            ],
        ),
        SegmentSchema::new(
            "PD1",
            vec![
                field("Living Dependency", "IS").repetitions(0),
                field("Living Arrangement", "IS"),
                field("Patient Primary Facility", "XON").repetitions(0),
                field("Patient Primary Care Provider Name & ID No.", "XCN").repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "NK1",
            vec![
                field("Set ID - NK1", "SI").required(),
                field("Name", "XPN").repetitions(0),
                field("Relationship", "CE"),
                field("Address", "XAD").repetitions(0),
                field("Phone Number", "XTN").repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "PV1",
            vec![
                field("Set ID - PV1", "SI"),
                field("Patient Class", "IS").required(),
                field("Assigned Patient Location", "PL"),
                field("Admission Type", "IS"),
                field("Preadmit Number", "CX"),
                field("Prior Patient Location", "PL"),
                field("Attending Doctor", "XCN").repetitions(0),
                field("Referring Doctor", "XCN").repetitions(0),
                field("Consulting Doctor", "XCN").repetitions(0),
                field("Hospital Service", "IS"),
                field("Temporary Location", "PL"),
                field("Preadmit Test Indicator", "IS"),
                field("Re-admission Indicator", "IS"),
                field("Admit Source", "IS"),
                field("Ambulatory Status", "IS").repetitions(0),
                field("VIP Indicator", "IS"),
                field("Admitting Doctor", "XCN").repetitions(0),
                field("Patient Type", "IS"),
                field("Visit Number", "CX"),
            ],
        ),
        SegmentSchema::new(
            "PV2",
            vec![
                field("Prior Pending Location", "PL"),
                field("Accommodation Code", "CE"),
                field("Admit Reason", "CE"),
                field("Transfer Reason", "CE"),
            ],
        ),
        SegmentSchema::new(
            "ROL",
            vec![
                field("Role Instance ID", "EI"),
                field("Action Code", "ID").required(),
                field("Role-ROL", "CE").required(),
                field("Role Person", "XCN").required().repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "AL1",
            vec![
                field("Set ID - AL1", "SI").required(),
                field("Allergen Type Code", "CE"),
                field("Allergen Code/Mnemonic/Description", "CE").required(),
                field("Allergy Severity Code", "CE"),
                field("Allergy Reaction Code", "ST").repetitions(0),
                field("Identification Date", "DT"),
            ],
        ),
        SegmentSchema::new(
            "DG1",
            vec![
                field("Set ID - DG1", "SI").required(),
                field("Diagnosis Coding Method", "ID"),
                field("Diagnosis Code - DG1", "CE"),
                field("Diagnosis Description", "ST"),
                field("Diagnosis Date/Time", "TS"),
                field("Diagnosis Type", "IS").required(),
            ],
        ),
        SegmentSchema::new(
            "PR1",
            vec![
                field("Set ID - PR1", "SI").required(),
                field("Procedure Coding Method", "IS"),
                field("Procedure Code", "CE").required(),
                field("Procedure Description", "ST"),
                field("Procedure Date/Time", "TS").required(),
            ],
        ),
        SegmentSchema::new(
            "GT1",
            vec![
                field("Set ID - GT1", "SI").required(),
                field("Guarantor Number", "CX").repetitions(0),
                field("Guarantor Name", "XPN").required().repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "IN1",
            vec![
                field("Set ID - IN1", "SI").required(),
                field("Insurance Plan ID", "CE").required(),
                field("Insurance Company ID", "CX").required().repetitions(0),
                field("Insurance Company Name", "XON").repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "ORC",
            vec![
                field("Order Control", "ID").required(),
                field("Placer Order Number", "EI"),
                field("Filler Order Number", "EI"),
                field("Placer Group Number", "EI"),
                field("Order Status", "ID"),
                field("Response Flag", "ID"),
                field("Quantity/Timing", "TQ").repetitions(0),
                field("Parent", "EIP"),
                field("Date/Time of Transaction", "TS"),
            ],
        ),
        SegmentSchema::new(
            "OBR",
            vec![
                field("Set ID - OBR", "SI"),
                field("Placer Order Number", "EI"),
                field("Filler Order Number", "EI"),
                field("Universal Service Identifier", "CE").required(),
                field("Priority - OBR", "ID"),
                field("Requested Date/Time", "TS"),
                field("Observation Date/Time", "TS"),
                field("Observation End Date/Time", "TS"),
                field("Collection Volume", "CQ"),
                field("Collector Identifier", "XCN").repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "OBX",
            vec![
                field("Set ID - OBX", "SI"),
                field("Value Type", "ID"),
                field("Observation Identifier", "CE").required(),
                field("Observation Sub-ID", "ST"),
                field("Observation Value", "varies")
                    .varies_by(2)
                    .repetitions(0),
                field("Units", "CE"),
                field("References Range", "ST"),
                field("Abnormal Flags", "IS").repetitions(0),
                field("Probability", "NM"),
                field("Nature of Abnormal Test", "ID").repetitions(0),
                field("Observation Result Status", "ID").required(),
                field("Effective Date of Reference Range", "TS"),
                field("User Defined Access Checks", "ST"),
                field("Date/Time of the Observation", "TS"),
                field("Producer's ID", "CE"),
                field("Responsible Observer", "XCN").repetitions(0),
                field("Observation Method", "CE").repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "NTE",
            vec![
                field("Set ID - NTE", "SI"),
                field("Source of Comment", "ID"),
                field("Comment", "FT").repetitions(0),
                field("Comment Type", "CE"),
            ],
        ),
        SegmentSchema::new(
            "SPM",
            vec![
                field("Set ID - SPM", "SI"),
                field("Specimen ID", "EIP"),
                field("Specimen Parent IDs", "EIP").repetitions(0),
                field("Specimen Type", "CWE").required(),
            ],
        ),
        SegmentSchema::new(
            "TQ1",
            vec![
                field("Set ID - TQ1", "SI"),
                field("Quantity", "CQ"),
                field("Repeat Pattern", "RPT").repetitions(0),
            ],
        ),
        SegmentSchema::new(
            "FT1",
            vec![
                field("Set ID - FT1", "SI"),
                field("Transaction ID", "ST"),
                field("Transaction Batch ID", "ST"),
                field("Transaction Date", "DR").required(),
            ],
        ),
        SegmentSchema::new("DSC", vec![field("Continuation Pointer", "ST"), field("Continuation Style", "ID")]),
    ];

    // Structures that are recognized but whose fields carry no metadata here
    for name in [
        "DB1", "DRG", "IN2", "IN3", "ACC", "UB1", "UB2", "PDA", "TQ2", "CTD", "CTI", "RQD", "RQ1",
        "RXO", "ODS", "ODT", "BLG",
    ] {
        segments.push(SegmentSchema::new(name, Vec::new()));
    }
    segments
}

fn data_types() -> Vec<DataTypeSchema> {
    let primitives = [
        "ST", "TX", "FT", "NM", "SI", "ID", "IS", "DT", "TM", "DTM", "GTS",
    ];
    let mut types: Vec<DataTypeSchema> = primitives
        .iter()
        .map(|name| DataTypeSchema::new(*name, &[]))
        .collect();

    types.extend([
        DataTypeSchema::new("TS", &["DTM", "ID"]),
        DataTypeSchema::new("HD", &["IS", "ST", "ID"]),
        DataTypeSchema::new("EI", &["ST", "IS", "ST", "ID"]),
        DataTypeSchema::new("EIP", &["EI", "EI"]),
        DataTypeSchema::new("MSG", &["ID", "ID", "ID"]),
        DataTypeSchema::new("PT", &["ID", "ID"]),
        DataTypeSchema::new("VID", &["ID", "CE", "CE"]),
        DataTypeSchema::new("CE", &["ST", "ST", "ID", "ST", "ST", "ID"]),
        DataTypeSchema::new(
            "CWE",
            &["ST", "ST", "ID", "ST", "ST", "ID", "ST", "ST", "ST"],
        ),
        DataTypeSchema::new("CQ", &["NM", "CE"]),
        DataTypeSchema::new(
            "CX",
            &["ST", "ST", "ID", "HD", "ID", "HD", "DT", "DT", "CWE", "CWE"],
        ),
        DataTypeSchema::new(
            "XPN",
            &[
                "FN", "ST", "ST", "ST", "ST", "IS", "ID", "ID", "CE", "DR", "ID", "TS", "TS", "ST",
            ],
        ),
        DataTypeSchema::new("FN", &["ST", "ST", "ST", "ST", "ST"]),
        DataTypeSchema::new(
            "XAD",
            &[
                "SAD", "ST", "ST", "ST", "ST", "ID", "ID", "ST", "IS", "IS", "ID", "DR", "TS", "TS",
            ],
        ),
        DataTypeSchema::new("SAD", &["ST", "ST", "ST"]),
        DataTypeSchema::new(
            "XTN",
            &["ST", "ID", "ID", "ST", "NM", "NM", "NM", "NM", "ST"],
        ),
        DataTypeSchema::new(
            "XCN",
            &[
                "ST", "FN", "ST", "ST", "ST", "ST", "IS", "IS", "HD", "ID", "ST", "ID", "ID", "HD",
            ],
        ),
        DataTypeSchema::new(
            "XON",
            &["ST", "IS", "NM", "NM", "ID", "HD", "ID", "HD", "ID", "ST"],
        ),
        DataTypeSchema::new(
            "PL",
            &["IS", "IS", "IS", "HD", "IS", "IS", "IS", "HD", "ST"],
        ),
        DataTypeSchema::new("DR", &["TS", "TS"]),
        DataTypeSchema::new("SN", &["ST", "NM", "ST", "NM"]),
        DataTypeSchema::new("ED", &["HD", "ID", "ID", "ID", "TX"]),
        DataTypeSchema::new("RP", &["ST", "HD", "ID", "ID"]),
        DataTypeSchema::new("ELD", &["ST", "NM", "NM", "CE"]),
        DataTypeSchema::new("ERL", &["ST", "NM", "NM", "NM", "NM", "NM"]),
        DataTypeSchema::new("TQ", &["CQ", "ST", "ST", "TS", "TS", "ST", "ST", "TX"]),
        DataTypeSchema::new("RPT", &["CWE", "ID", "NM", "NM", "NM", "NM"]),
    ]);
    types
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::{ChildKind, StructureRegistry};
    use std::collections::HashSet;

    #[test]
    fn test_all_versions_supported() {
        let registry = standard();
        for version in SUPPORTED_VERSIONS {
            assert!(registry.supports_version(version), "{version}");
        }
        assert!(!registry.supports_version("2.1"));
    }

    #[test]
    fn test_standard_is_shared() {
        assert!(Arc::ptr_eq(&standard(), &standard()));
    }

    #[test]
    fn test_every_child_resolves() {
        let registry = standard();
        let mut pending: Vec<GroupSchema> = messages();
        let mut seen = HashSet::new();

        while let Some(schema) = pending.pop() {
            for child in &schema.children {
                match &child.kind {
                    ChildKind::Segment => {
                        registry
                            .resolve_segment_type(&child.name, "2.5")
                            .expect("Segment should be registered");
                    }
                    ChildKind::Group { type_name } => {
                        let group = registry
                            .resolve_group_type(type_name, "2.5")
                            .expect("Group should be registered");
                        if seen.insert(type_name.clone()) {
                            pending.push((*group).clone());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_field_type_resolves() {
        let registry = standard();
        for segment in segments() {
            for field in &segment.fields {
                if field.data_type == "varies" {
                    continue;
                }
                assert!(
                    registry.resolve_data_type(&field.data_type, "2.5").is_ok(),
                    "{}: {} missing",
                    segment.name,
                    field.data_type
                );
            }
        }
    }

    #[test]
    fn test_event_aliases() {
        let registry = standard();
        let schema = registry
            .resolve_message_type("ADT_A04", "2.4", false)
            .expect("Test operation should succeed");
        assert_eq!(schema.name, "ADT_A01");
    }

    #[test]
    fn test_obx_value_is_typed_by_value_type() {
        let registry = standard();
        let obx = registry
            .resolve_segment_type("OBX", "2.5")
            .expect("Test operation should succeed");
        assert_eq!(obx.field(5).and_then(|f| f.type_selector), Some(2));
    }
}
