//! ER7 command-line library
//!
//! Argument definitions and command handlers for the `er7` binary. Handlers
//! return their output as a string so they can be tested without a process.

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use er7_codec::encoding::SEGMENT_DELIMITER;
use er7_codec::{
    AckCode, EncodingCharacters, Group, HeaderInfo, Message, ParserOptions, PipeParser, Structure,
    UnexpectedSegmentBehavior,
};
use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handling of segments the grammar does not expect
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnexpectedArg {
    /// Keep the segment next to the current position
    #[default]
    AddInline,
    /// Keep the segment at the top level of the message
    DropToRoot,
    /// Stop with an error
    Fail,
}

impl From<UnexpectedArg> for UnexpectedSegmentBehavior {
    fn from(arg: UnexpectedArg) -> Self {
        match arg {
            UnexpectedArg::AddInline => Self::AddInline,
            UnexpectedArg::DropToRoot => Self::DropToRoot,
            UnexpectedArg::Fail => Self::Fail,
        }
    }
}

/// Decoder settings shared by every command
#[derive(Args, Clone, Debug, Default)]
pub struct ParserArgs {
    /// Start a new repetition of an earlier repeating group rather than
    /// filling a later position with the same segment
    #[arg(long, global = true, env = "ER7_NON_GREEDY")]
    pub non_greedy: bool,

    /// What to do with segments the grammar does not expect
    #[arg(
        long,
        global = true,
        value_enum,
        env = "ER7_UNEXPECTED_SEGMENTS",
        default_value = "add-inline"
    )]
    pub unexpected_segments: UnexpectedArg,

    /// Decode unknown message structures with a generic grammar
    #[arg(long, global = true, env = "ER7_ALLOW_UNKNOWN_STRUCTURES")]
    pub allow_unknown_structures: bool,
}

impl ParserArgs {
    /// Codec options for these arguments
    pub fn options(&self) -> ParserOptions {
        ParserOptions::new()
            .with_non_greedy(self.non_greedy)
            .with_unexpected_segments(self.unexpected_segments.into())
            .with_unknown_structures(self.allow_unknown_structures)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a message and print its structure
    Decode {
        /// Message file, `-` for stdin
        input: PathBuf,

        /// Print the decoded tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a message and print it re-encoded in canonical form
    Reencode {
        /// Message file, `-` for stdin
        input: PathBuf,
    },

    /// Print the routing data from a message header
    Header {
        /// Message file, `-` for stdin
        input: PathBuf,
    },

    /// Print an acknowledgment for a message
    Ack {
        /// Message file, `-` for stdin
        input: PathBuf,

        /// Acknowledgment code (AA, AE, AR, CA, CE, CR)
        #[arg(short, long, default_value = "AA")]
        code: AckCode,

        /// Text for MSA-3
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Print a grammar from the built-in catalog
    Grammar {
        /// Message structure or event name (e.g. ORU_R01, ADT_A04)
        structure: String,

        /// HL7 version
        #[arg(long = "hl7-version", default_value = "2.5")]
        version: String,
    },
}

/// Read a message from a file, or stdin for `-`, with segments delimited by
/// carriage returns
pub fn read_message(input: &Path) -> Result<String> {
    let raw = if input == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read message from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };
    Ok(normalize_line_endings(&raw))
}

/// Turn `\r\n` and `\n` line endings into segment delimiters
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\r").replace('\n', "\r")
}

/// One segment per line for terminal output
fn segments_as_lines(text: &str) -> String {
    text.replace(SEGMENT_DELIMITER, "\n")
}

/// Run a command and return what it prints
pub fn run(command: &Commands, args: &ParserArgs) -> Result<String> {
    let parser = PipeParser::new().with_options(args.options());
    debug!(?command, options = ?parser.options(), "Running command");

    match command {
        Commands::Decode { input, json } => {
            let message = decode(&parser, input)?;
            if *json {
                let mut output = serde_json::to_string_pretty(&message)?;
                output.push('\n');
                Ok(output)
            } else {
                outline(&parser, &message)
            }
        }
        Commands::Reencode { input } => {
            let message = decode(&parser, input)?;
            let encoded = parser.encode(&message).context("Failed to encode message")?;
            Ok(segments_as_lines(&encoded))
        }
        Commands::Header { input } => {
            let text = read_message(input)?;
            let header = HeaderInfo::peek(&text).context("Failed to read message header")?;
            Ok(describe_header(&header))
        }
        Commands::Ack { input, code, text } => {
            let message = decode(&parser, input)?;
            let ack = parser
                .generate_ack(&message, *code, text.as_deref())
                .context("Failed to generate acknowledgment")?;
            let encoded = parser.encode(&ack).context("Failed to encode acknowledgment")?;
            Ok(segments_as_lines(&encoded))
        }
        Commands::Grammar { structure, version } => {
            let grammar = parser
                .grammar(structure, version, false)
                .with_context(|| format!("No grammar for {structure} ({version})"))?;
            Ok(grammar.render())
        }
    }
}

fn decode(parser: &PipeParser, input: &Path) -> Result<Message> {
    let text = read_message(input)?;
    parser
        .decode(&text)
        .with_context(|| format!("Failed to decode {}", input.display()))
}

fn describe_header(header: &HeaderInfo) -> String {
    let chars = &header.encoding_characters;
    let mut out = String::new();
    let _ = writeln!(out, "Segment:         {}", header.segment);
    let _ = writeln!(out, "Message code:    {}", header.message_code);
    let _ = writeln!(
        out,
        "Trigger event:   {}",
        header.trigger_event.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "Structure:       {}{}",
        header.structure,
        if header.explicit { "" } else { " (from event)" }
    );
    let _ = writeln!(
        out,
        "Control ID:      {}",
        header.control_id.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "Version:         {}", header.version);
    let _ = writeln!(
        out,
        "Delimiters:      {}{chars}",
        chars.field_separator()
    );
    out
}

/// Indented tree of groups and encoded segments
fn outline(parser: &PipeParser, message: &Message) -> Result<String> {
    let chars = message.encoding_characters()?;
    let mut out = format!("{} ({})\n", message.structure(), message.version());
    outline_group(parser, message.root(), &chars, 1, &mut out)?;
    Ok(out)
}

fn outline_group(
    parser: &PipeParser,
    group: &Group,
    chars: &EncodingCharacters,
    depth: usize,
    out: &mut String,
) -> Result<()> {
    let indent = depth * 2;
    for slot in group.slots() {
        for (repetition, structure) in slot.repetitions().iter().enumerate() {
            match structure {
                Structure::Segment(segment) => {
                    let line = parser.encode_segment(segment, chars)?;
                    let marker = if slot.is_non_standard() {
                        "  (non-standard)"
                    } else {
                        ""
                    };
                    writeln!(out, "{:indent$}{line}{marker}", "")?;
                }
                Structure::Group(inner) => {
                    writeln!(out, "{:indent$}{}[{repetition}]", "", slot.name())?;
                    outline_group(parser, inner, chars, depth + 1, out)?;
                }
            }
        }
    }
    Ok(())
}
