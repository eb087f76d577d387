#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Command handler tests against the codec's fixture messages

use er7_cli::{Commands, ParserArgs, UnexpectedArg, run};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../er7-codec/test_fixtures")
        .join(name)
}

#[test]
fn reencode_reproduces_fixtures() {
    for name in ["adt_a04.hl7", "oru_r01.hl7", "orm_o01.hl7", "custom_delimiters.hl7"] {
        let path = fixture(name);
        let original = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
        let output = run(&Commands::Reencode { input: path }, &ParserArgs::default())
            .unwrap_or_else(|e| panic!("{name}: {e:#}"));
        assert_eq!(output, original, "{name}");
    }
}

#[test]
fn drop_to_root_moves_custom_segment() {
    let args = ParserArgs {
        unexpected_segments: UnexpectedArg::DropToRoot,
        ..ParserArgs::default()
    };
    let output = run(
        &Commands::Decode {
            input: fixture("adt_a04.hl7"),
            json: false,
        },
        &args,
    )
    .expect("Test operation should succeed");
    assert!(output.lines().any(|line| line == "  ZPV|1|custom^data  (non-standard)"));
}

#[test]
fn header_of_event_message() {
    let output = run(
        &Commands::Header {
            input: fixture("adt_a04.hl7"),
        },
        &ParserArgs::default(),
    )
    .expect("Test operation should succeed");
    assert!(output.contains("Structure:       ADT_A04 (from event)\n"));
    assert!(output.contains("Version:         2.5\n"));
}
