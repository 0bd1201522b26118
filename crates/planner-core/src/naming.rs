//! Task-naming codec.
//!
//! A display name embeds a family prefix, the stage, and a sequence number
//! around the raw task text:
//!
//! ```text
//! UH00 - Identification - Task 1: Talk to the users
//! SF02 - Definition - Task 3: Agree the budget
//! PRI01 - Delivery - Task 2: Hold a stage review
//! Policy: Complete a DPIA - Closure - Task 1
//! ```
//!
//! Policy names put the text *before* the stage marker. Previously stored
//! data uses that layout, so it must not be normalized.
//!
//! Records store raw text; encoding happens at render time. [`decode`]
//! exists to read names that were stored already encoded.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::Stage;

/// Prefix used for framework names that contain no letters.
const FALLBACK_FRAMEWORK_CODE: &str = "FWK";

/// The family a display name belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFamily {
    /// Personal heuristic task, prefix `UH`.
    Heuristic,
    /// Success-factor task, prefix `SF`.
    Factor,
    /// Framework task; holds the upper-case code from [`framework_code`].
    Framework(String),
    /// Organizational policy task.
    Policy,
}

impl TaskFamily {
    /// Framework family for a framework name.
    pub fn framework(name: &str) -> Self {
        Self::Framework(framework_code(name))
    }
}

/// The pieces recovered from an encoded display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName<'a> {
    /// `UH03`, `SF00`, `PRI12`, or `Policy`.
    pub prefix: &'a str,
    pub stage: &'a str,
    /// One-based task number, digits as written.
    pub task_number: &'a str,
    pub text: &'a str,
}

impl DecodedName<'_> {
    pub fn is_policy(&self) -> bool {
        self.prefix == "Policy"
    }

    /// The stage, if the stage marker names one of the four stages.
    pub fn parsed_stage(&self) -> Option<Stage> {
        self.stage.parse().ok()
    }
}

fn standard_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^([A-Za-z]+[0-9]{2,}) - ([A-Za-z]+) - Task ([0-9]+): (.*)$")
            .expect("standard task-name pattern is valid")
    })
}

fn policy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^Policy: (.*) - ([A-Za-z]+) - Task ([0-9]+)$")
            .expect("policy task-name pattern is valid")
    })
}

/// Upper-cased first three letters of a framework name.
///
/// Non-letters are skipped, so `"PRINCE2"` gives `PRI` and
/// `"5S method"` gives `SME`. A name with no letters at all gets `FWK`.
pub fn framework_code(name: &str) -> String {
    let code: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    if code.is_empty() {
        FALLBACK_FRAMEWORK_CODE.to_string()
    } else {
        code
    }
}

/// Build the display name for a task at zero-based position `seq`.
pub fn encode(family: &TaskFamily, stage: Stage, seq: usize, text: &str) -> String {
    let number = seq as u128 + 1;
    match family {
        TaskFamily::Heuristic => format!("UH{seq:02} - {stage} - Task {number}: {text}"),
        TaskFamily::Factor => format!("SF{seq:02} - {stage} - Task {number}: {text}"),
        TaskFamily::Framework(code) => format!("{code}{seq:02} - {stage} - Task {number}: {text}"),
        TaskFamily::Policy => format!("Policy: {text} - {stage} - Task {number}"),
    }
}

/// Split an encoded display name into its parts.
///
/// Tries the standard layout first, then the policy layout.
pub fn parse(display_name: &str) -> Option<DecodedName<'_>> {
    if let Some(caps) = standard_re().captures(display_name) {
        let (_, [prefix, stage, number, text]) = caps.extract();
        return Some(DecodedName {
            prefix,
            stage,
            task_number: number,
            text,
        });
    }

    let caps = policy_re().captures(display_name)?;
    let (_, [text, stage, number]) = caps.extract();
    Some(DecodedName {
        prefix: "Policy",
        stage,
        task_number: number,
        text,
    })
}

/// Recover the raw text from a display name.
///
/// Input that matches neither layout is returned unchanged: it is taken to
/// be raw text already.
pub fn decode(display_name: &str) -> &str {
    parse(display_name).map_or(display_name, |decoded| decoded.text)
}

/// `true` if `display_name` matches one of the two encoded layouts.
pub fn is_encoded(display_name: &str) -> bool {
    parse(display_name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_each_family() {
        assert_eq!(
            encode(&TaskFamily::Heuristic, Stage::Identification, 0, "Talk to users"),
            "UH00 - Identification - Task 1: Talk to users"
        );
        assert_eq!(
            encode(&TaskFamily::Factor, Stage::Definition, 4, "Agree budget"),
            "SF04 - Definition - Task 5: Agree budget"
        );
        assert_eq!(
            encode(&TaskFamily::framework("PRINCE2"), Stage::Delivery, 11, "Stage review"),
            "PRI11 - Delivery - Task 12: Stage review"
        );
        assert_eq!(
            encode(&TaskFamily::Policy, Stage::Closure, 2, "Archive records"),
            "Policy: Archive records - Closure - Task 3"
        );
    }

    #[test]
    fn framework_code_takes_first_three_letters() {
        assert_eq!(framework_code("Scrum"), "SCR");
        assert_eq!(framework_code("PRINCE2"), "PRI");
        assert_eq!(framework_code("5S method"), "SME");
        assert_eq!(framework_code("QA"), "QA");
        assert_eq!(framework_code("2024"), "FWK");
    }

    #[test]
    fn round_trips_every_family_and_stage() {
        let families = [
            TaskFamily::Heuristic,
            TaskFamily::Factor,
            TaskFamily::framework("Managing Successful Programmes"),
            TaskFamily::Policy,
        ];
        let texts = ["Check the sponsor is engaged", "x", "Review: scope (v2)"];
        for family in &families {
            for stage in Stage::ALL {
                for seq in [0, 7, 99, 123] {
                    for text in texts {
                        let name = encode(family, stage, seq, text);
                        assert!(is_encoded(&name), "{name}");
                        assert_eq!(decode(&name), text, "{name}");
                    }
                }
            }
        }
    }

    #[test]
    fn parse_recovers_metadata() {
        let decoded = parse("SF02 - Delivery - Task 3: Track benefits").unwrap();
        assert_eq!(decoded.prefix, "SF02");
        assert_eq!(decoded.parsed_stage(), Some(Stage::Delivery));
        assert_eq!(decoded.task_number, "3");
        assert_eq!(decoded.text, "Track benefits");
        assert!(!decoded.is_policy());

        let decoded = parse("Policy: Run a DPIA - Definition - Task 1").unwrap();
        assert!(decoded.is_policy());
        assert_eq!(decoded.stage, "Definition");
        assert_eq!(decoded.text, "Run a DPIA");
    }

    #[test]
    fn large_sequence_numbers_round_trip() {
        for seq in [u32::MAX as usize, usize::MAX] {
            let name = encode(&TaskFamily::Factor, Stage::Delivery, seq, "Agree budget");
            assert!(is_encoded(&name), "{name}");
            assert_eq!(decode(&name), "Agree budget");
        }

        let name = encode(&TaskFamily::Factor, Stage::Delivery, usize::MAX, "x");
        let expected = (usize::MAX as u128 + 1).to_string();
        assert_eq!(parse(&name).unwrap().task_number, expected);

        let name = "Policy: Renew licence - Closure - Task 99999999999999999999999";
        assert_eq!(decode(name), "Renew licence");
    }

    #[test]
    fn raw_text_is_returned_unchanged() {
        for raw in ["Plan the kickoff", "", "UH - Identification - Task 1: no digits"] {
            assert!(!is_encoded(raw));
            assert_eq!(decode(raw), raw);
        }
    }

    #[test]
    fn separator_inside_text() {
        // Standard names keep everything after "Task n: " as text.
        let name = encode(&TaskFamily::Heuristic, Stage::Definition, 1, "a - b");
        assert_eq!(decode(&name), "a - b");

        // Policy names anchor on the last stage marker.
        let name = encode(&TaskFamily::Policy, Stage::Definition, 1, "Legal - sign off");
        assert_eq!(decode(&name), "Legal - sign off");
    }

    #[test]
    fn decode_strips_only_one_layer() {
        let inner = encode(&TaskFamily::Factor, Stage::Closure, 0, "Lessons learned");
        let outer = encode(&TaskFamily::Heuristic, Stage::Closure, 0, &inner);
        assert_eq!(decode(&outer), inner);
    }

    #[test]
    fn multiline_text_round_trips() {
        let text = "First line\nsecond line";
        let name = encode(&TaskFamily::Factor, Stage::Identification, 0, text);
        assert_eq!(decode(&name), text);
    }
}
