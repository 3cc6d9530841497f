//! Parsers for model output.
//!
//! Kept apart from the network code so the formats can be tested directly.
//!
//! - [`parse_questions`] fails with [`GatewayError::Generation`] when no
//!   numbered line survives.
//! - [`parse_evaluation`] fails with [`GatewayError::Parse`] when a section
//!   header is missing, out of order, or followed by nothing.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use super::GatewayError;
use crate::interview::{EvaluationReport, QuestionSet};

pub const OVERALL_SUMMARY: &str = "Overall Summary";
pub const STRENGTHS: &str = "Strengths";
pub const AREAS_FOR_IMPROVEMENT: &str = "Areas for Improvement";

fn numbered_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "1. Q", "2) Q", "- 3: Q", "**4.** Q", "Question 5 - Q"
    RE.get_or_init(|| {
        Regex::new(r"^(?:[-+>#]+\s*)*(?:[*_]{1,2}\s*)?(?i:q(?:uestion)?\s*)?\d+\s*[.):\-]\s*(.+)$")
            .expect("valid numbered line regex")
    })
}

fn section_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "**1. Overall Summary:**", "## Strengths", "Areas for Improvement:"
    RE.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t>#*_]*(?:\d+[.)][ \t]*)?[*_]*[ \t]*(overall summary|strengths|areas for improvement)[*_ \t]*(?::[*_ \t]*|$)",
        )
        .expect("valid section header regex")
    })
}

fn strip_markup(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| c == '*' || c == '_' || c == '`')
        .trim()
}

/// Extracts the numbered questions from a model reply, preserving order.
pub fn parse_questions(raw: &str) -> Result<QuestionSet, GatewayError> {
    let questions: Vec<String> = raw
        .lines()
        .filter_map(|line| {
            let captures = numbered_line().captures(line.trim())?;
            let text = strip_markup(captures.get(1)?.as_str());
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect();

    debug!("Parsed {} questions from model output", questions.len());

    QuestionSet::new(questions).ok_or_else(|| {
        GatewayError::Generation("model returned no numbered questions".to_string())
    })
}

/// Splits an evaluation into its three sections.
pub fn parse_evaluation(raw: &str) -> Result<EvaluationReport, GatewayError> {
    let text = raw.replace("\r\n", "\n");
    let expected = [OVERALL_SUMMARY, STRENGTHS, AREAS_FOR_IMPROVEMENT];

    // (header index, header start, body start)
    let mut found: Vec<(usize, usize, usize)> = Vec::with_capacity(expected.len());
    let mut search_from = 0;

    for (idx, name) in expected.iter().enumerate() {
        let mut pos = search_from;
        let hit = loop {
            let Some(caps) = section_header().captures_at(&text, pos) else {
                break None;
            };
            let Some(whole) = caps.get(0) else {
                break None;
            };
            if caps[1].eq_ignore_ascii_case(name) {
                break Some((whole.start(), whole.end()));
            }
            pos = whole.end();
        };

        let Some((start, end)) = hit else {
            return Err(GatewayError::Parse(format!("missing \"{name}\" section")));
        };

        found.push((idx, start, end));
        search_from = end;
    }

    let mut bodies = Vec::with_capacity(expected.len());
    for (pos, &(idx, _, body_start)) in found.iter().enumerate() {
        let body_end = found
            .get(pos + 1)
            .map_or(text.len(), |&(_, next_header, _)| next_header);
        let body = text[body_start..body_end].trim();
        if body.is_empty() {
            return Err(GatewayError::Parse(format!(
                "\"{}\" section is empty",
                expected[idx]
            )));
        }
        bodies.push(body.to_string());
    }

    let mut bodies = bodies.into_iter();
    Ok(EvaluationReport {
        overall_summary: bodies.next().unwrap_or_default(),
        strengths: bodies.next().unwrap_or_default(),
        areas_for_improvement: bodies.next().unwrap_or_default(),
    })
}
