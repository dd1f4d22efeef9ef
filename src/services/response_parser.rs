// src/services/response_parser.rs
//! Turns raw vision-model text into a [`NormalizedAnalysis`].
//!
//! JSON is tried first (fenced block, then the first balanced `{...}` span),
//! with a sentence-level keyword heuristic as the last resort. Every free-text
//! value goes through [`clean_text`]. Nothing in here returns an error.

use crate::models::{
    ColorAnalysis, ErgonomicEvaluation, NormalizedAnalysis, StyleAssessment,
};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde_json::Value;

pub const PLACEHOLDER: &str = "Analysis not available";

const MAX_CLEAN_PASSES: usize = 4;
const MAX_HEURISTIC_PRIORITIES: usize = 5;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("fenced block regex");
    static ref CODE_FENCE: Regex = Regex::new(r"```[A-Za-z]*").expect("code fence regex");
    static ref KEY_PREFIX: Regex =
        Regex::new(r#"^\s*"[A-Za-z_][A-Za-z0-9_ \-]*"\s*:\s*"#).expect("key prefix regex");
    static ref LIST_MARKER: Regex =
        Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("list marker regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace regex");
    static ref TRAILING_COMMA: Regex = Regex::new(r",\s*([}\]])").expect("trailing comma regex");
    static ref HEX_COLOR: Regex = Regex::new(r"#[0-9A-Fa-f]{6}\b").expect("hex color regex");
    static ref NEGATED_PROBLEM: Regex = Regex::new(
        r"\b(?:no|without|free of|zero)\s+(?:(?:obvious|major|visible|noticeable|real)\s+)?(?:glare|issues?|problems?|strain|clutter|discomfort|concerns?|complaints?)\b"
    )
    .expect("negated problem regex");
    static ref NEGATIVE_STATUS: Regex = Regex::new(
        r"\b(?:poor|poorly|bad|lacks?|lacking|no|strain|straining|problems?|issues?|uncomfortable|cramped|cluttered|too (?:low|high|dim|dark|bright))\b"
    )
    .expect("negative status regex");
    static ref SUGGESTIVE_STATUS: Regex =
        Regex::new(r"\b(?:could|should|consider|improve|slightly|might)\b")
            .expect("suggestive status regex");
    static ref POSITIVE_STATUS: Regex = Regex::new(
        r"\b(?:good|well|great|excellent|proper|properly|ideal|comfortable|supportive)\b"
    )
    .expect("positive status regex");
}

/// How the analysis was obtained from the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A JSON object was found and mapped.
    Parsed(NormalizedAnalysis),
    /// No usable JSON; fields were picked out of prose by keyword.
    Heuristic(NormalizedAnalysis),
    /// Nothing usable at all; the analysis only carries defaults.
    Empty(NormalizedAnalysis),
}

impl ParseOutcome {
    pub fn analysis(&self) -> &NormalizedAnalysis {
        match self {
            ParseOutcome::Parsed(a) | ParseOutcome::Heuristic(a) | ParseOutcome::Empty(a) => a,
        }
    }

    pub fn into_analysis(self) -> NormalizedAnalysis {
        match self {
            ParseOutcome::Parsed(a) | ParseOutcome::Heuristic(a) | ParseOutcome::Empty(a) => a,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParseOutcome::Parsed(_) => "parsed",
            ParseOutcome::Heuristic(_) => "heuristic",
            ParseOutcome::Empty(_) => "empty",
        }
    }
}

pub fn parse(raw: &str) -> ParseOutcome {
    if raw.trim().is_empty() {
        debug!("Empty model response, using defaults");
        return ParseOutcome::Empty(empty_analysis());
    }

    if let Some(value) = extract_json(raw) {
        if let Some(analysis) = analysis_from_json(&value) {
            return ParseOutcome::Parsed(analysis);
        }
    }

    warn!("Model response contained no usable JSON, falling back to heuristic extraction");
    match heuristic_analysis(raw) {
        Some(analysis) => ParseOutcome::Heuristic(analysis),
        None => ParseOutcome::Empty(empty_analysis()),
    }
}

fn empty_analysis() -> NormalizedAnalysis {
    NormalizedAnalysis {
        workspace_description: PLACEHOLDER.to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Text cleaning
// ---------------------------------------------------------------------------

/// Strips formatting noise from a model-provided string. Values that end up
/// shorter than three characters, or made only of punctuation, become empty.
pub fn clean_text(raw: &str) -> String {
    let mut current = raw.to_string();
    for _ in 0..MAX_CLEAN_PASSES {
        let next = clean_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_pass(input: &str) -> String {
    let text = CODE_FENCE.replace_all(input, " ");
    let text = text
        .replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace("\\n", " ")
        .replace("\\r", " ")
        .replace("\\t", " ")
        .replace("**", "");
    let text = KEY_PREFIX.replace(&text, "");
    let text = LIST_MARKER.replace(&text, "");
    let text = strip_wrapping(&text);
    let text = WHITESPACE.replace_all(text, " ");
    let text = text.trim();

    if text.chars().count() < 3 || !text.chars().any(char::is_alphanumeric) {
        return String::new();
    }

    capitalize_first(text)
}

/// Removes quote, brace, bracket or backtick pairs that enclose the whole
/// value. Unpaired or interior delimiters are left alone.
fn strip_wrapping(text: &str) -> &str {
    let mut text = text.trim().trim_end_matches(',').trim();
    loop {
        let inner = if is_wrapped(text) {
            &text[1..text.len() - 1]
        } else if text.len() >= 2
            && text.starts_with('\'')
            && text.ends_with('\'')
            && !text[1..text.len() - 1].contains('\'')
        {
            &text[1..text.len() - 1]
        } else {
            return text;
        };
        text = inner.trim().trim_end_matches(',').trim();
    }
}

/// True when the opening delimiter at the start is closed by the final char.
/// Quotes and backticks nest inside each other; brackets inside a quoted run
/// are ignored.
fn is_wrapped(text: &str) -> bool {
    if !text.starts_with(['"', '`', '{', '[']) || text.len() < 2 {
        return false;
    }

    let mut stack: Vec<char> = Vec::new();
    for (i, c) in text.char_indices() {
        let quoted = matches!(stack.last(), Some('"' | '`'));
        match c {
            '"' | '`' if stack.last() == Some(&c) => {
                stack.pop();
            }
            '"' | '`' => stack.push(c),
            '{' | '[' if !quoted => stack.push(c),
            '}' | ']' if !quoted => {
                let open = if c == '}' { '{' } else { '[' };
                if stack.pop() != Some(open) {
                    return false;
                }
            }
            _ => {}
        }
        if stack.is_empty() {
            return i + c.len_utf8() == text.len();
        }
    }
    false
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

/// Light normalization for enum-like labels (category/status) where short
/// values such as "ok" are meaningful.
fn clean_label(raw: &str) -> String {
    let text = strip_wrapping(raw);
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

fn extract_json(raw: &str) -> Option<Value> {
    for caps in FENCED_BLOCK.captures_iter(raw) {
        if let Some(body) = caps.get(1) {
            if let Some(value) = parse_object(body.as_str()) {
                debug!("Parsed JSON from fenced code block");
                return Some(value);
            }
        }
    }

    let candidates = [first_object_span(raw), widest_object_span(raw)];
    for span in candidates.into_iter().flatten() {
        if let Some(value) = parse_object(span) {
            debug!("Parsed JSON from inline object span");
            return Some(value);
        }
    }

    None
}

fn parse_object(text: &str) -> Option<Value> {
    let text = text.trim();
    let parsed = serde_json::from_str::<Value>(text).or_else(|_| {
        let repaired = TRAILING_COMMA.replace_all(text, "$1");
        serde_json::from_str::<Value>(&repaired)
    });
    match parsed {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// First balanced top-level `{...}` span, ignoring braces inside strings.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn widest_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

// ---------------------------------------------------------------------------
// JSON → NormalizedAnalysis
// ---------------------------------------------------------------------------

fn field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
        Value::Null => String::new(),
    }
}

fn text_field(obj: &Value, keys: &[&str]) -> String {
    field(obj, keys)
        .map(|v| clean_text(&value_text(v)))
        .unwrap_or_default()
}

fn analysis_from_json(value: &Value) -> Option<NormalizedAnalysis> {
    let root = match field(value, &["analysis", "workspace_analysis", "workspaceAnalysis"]) {
        Some(inner) if inner.is_object() && field(value, DESCRIPTION_KEYS).is_none() => inner,
        _ => value,
    };
    if !root.is_object() {
        return None;
    }

    let mut workspace_description = text_field(root, DESCRIPTION_KEYS);
    if workspace_description.is_empty() {
        debug!("Model JSON lacks a workspace description");
        workspace_description = PLACEHOLDER.to_string();
    }

    Some(NormalizedAnalysis {
        workspace_description,
        style_assessment: field(root, &["style_assessment", "styleAssessment"])
            .and_then(style_from_json),
        ergonomic_evaluation: field(
            root,
            &["ergonomic_evaluation", "ergonomicEvaluation", "ergonomics"],
        )
        .map(ergonomics_from_json)
        .unwrap_or_default(),
        improvement_priorities: field(
            root,
            &["improvement_priorities", "improvementPriorities", "priorities"],
        )
        .map(priorities_from_json)
        .unwrap_or_default(),
        color_analysis: field(root, &["color_analysis", "colorAnalysis"])
            .and_then(colors_from_json),
    })
}

const DESCRIPTION_KEYS: &[&str] = &[
    "workspace_description",
    "workspaceDescription",
    "description",
    "summary",
];

fn style_from_json(value: &Value) -> Option<StyleAssessment> {
    if !value.is_object() {
        return None;
    }
    let score = field(value, &["alignment_score", "alignmentScore", "score"])
        .and_then(score_from_value)
        .unwrap_or(0.5);

    Some(StyleAssessment {
        current_style: text_field(value, &["current_style", "currentStyle", "style"]),
        alignment_score: score,
        alignment_explanation: text_field(
            value,
            &["alignment_explanation", "alignmentExplanation", "explanation"],
        ),
    })
}

/// Accepts 0..1 fractions, 0..100 percentages and numeric strings.
fn score_from_value(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(fraction.clamp(0.0, 1.0))
}

fn ergonomics_from_json(value: &Value) -> Vec<ErgonomicEvaluation> {
    match value {
        Value::Array(items) => items.iter().filter_map(evaluation_from_json).collect(),
        // {"chair": {...}} or {"chair": "observation"}
        Value::Object(map) => map
            .iter()
            .filter_map(|(category, entry)| {
                let mut evaluation = match entry {
                    Value::Object(_) => evaluation_from_json(entry)?,
                    other => ErgonomicEvaluation {
                        observation: clean_text(&value_text(other)),
                        ..Default::default()
                    },
                };
                if evaluation.category.is_empty() {
                    evaluation.category = clean_label(category);
                }
                Some(evaluation)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn evaluation_from_json(value: &Value) -> Option<ErgonomicEvaluation> {
    if !value.is_object() {
        return None;
    }
    let recommendation = text_field(value, &["recommendation", "suggestion", "fix"]);
    Some(ErgonomicEvaluation {
        category: field(value, &["category", "area", "aspect"])
            .map(|v| clean_label(&value_text(v)))
            .unwrap_or_default(),
        status: field(value, &["status", "rating", "assessment"])
            .map(|v| clean_label(&value_text(v)))
            .unwrap_or_default(),
        observation: text_field(value, &["observation", "description", "details"]),
        recommendation: (!recommendation.is_empty()).then_some(recommendation),
    })
}

fn priorities_from_json(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(_) => value_text(
                    field(item, &["priority", "title", "description", "text"])
                        .unwrap_or(&Value::Null),
                ),
                other => value_text(other),
            })
            .collect(),
        Value::String(s) => s.split(['\n', ';']).map(str::to_string).collect(),
        _ => Vec::new(),
    };

    raw.iter()
        .map(|p| clean_text(p))
        .filter(|p| !p.is_empty())
        .collect()
}

fn colors_from_json(value: &Value) -> Option<ColorAnalysis> {
    if !value.is_object() {
        return None;
    }
    let dominant_colors = field(value, &["dominant_colors", "dominantColors", "colors"])
        .map(|v| match v {
            Value::Array(items) => items.iter().filter_map(hex_from_value).collect(),
            Value::String(s) => HEX_COLOR
                .find_iter(s)
                .map(|m| m.as_str().to_ascii_uppercase())
                .collect(),
            _ => Vec::new(),
        })
        .unwrap_or_default();

    Some(ColorAnalysis {
        dominant_colors,
        mood: text_field(value, &["mood", "atmosphere"]),
        color_harmony: text_field(value, &["color_harmony", "colorHarmony", "harmony"]),
    })
}

fn hex_from_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(_) => field(value, &["hex", "color"])?.as_str()?,
        _ => return None,
    };
    normalize_hex(raw)
}

/// `#abc123` / `abc123` → `#ABC123`.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches('#');
    if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", digits.to_ascii_uppercase()))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Heuristic fallback
// ---------------------------------------------------------------------------

const DESCRIPTION_WORDS: &[&str] = &["workspace", "desk", "room", "setup", "office", "space"];

const CATEGORY_WORDS: &[(&str, &[&str])] = &[
    ("desk", &["desk", "table", "work surface"]),
    ("chair", &["chair", "posture", "seat", "sitting"]),
    ("lighting", &["lighting", "light", "lamp", "window", "glare", "bright"]),
    ("screen", &["screen", "monitor", "display", "laptop"]),
    ("organization", &["clutter", "organiz", "organis", "storage", "cable", "tidy", "mess"]),
];

const PRIORITY_WORDS: &[&str] = &[
    "should", "consider", "recommend", "improve", "add ", "replace", "upgrade", "try ",
];

const STYLE_WORDS: &[&str] = &[
    "minimalist", "modern", "industrial", "scandinavian", "bohemian", "rustic", "traditional",
    "cozy", "contemporary", "mid-century",
];

const COLOR_WORDS: &[&str] = &["color", "colour", "palette", "tone", "hue"];

fn split_sentences(text: &str) -> Vec<String> {
    let text = CODE_FENCE.replace_all(text, " ");
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            sentences.push(std::mem::take(&mut current));
            continue;
        }
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    sentences.push(current);

    sentences
        .iter()
        .map(|s| clean_text(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn contains_any(sentence: &str, words: &[&str]) -> bool {
    let lower = sentence.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

fn infer_status(sentence: &str) -> &'static str {
    let lower = sentence.to_lowercase();
    // "no glare", "without issues" read as praise, not as a problem
    let lower = NEGATED_PROBLEM.replace_all(&lower, " good ");

    if NEGATIVE_STATUS.is_match(&lower) {
        "poor"
    } else if SUGGESTIVE_STATUS.is_match(&lower) {
        "needs improvement"
    } else if POSITIVE_STATUS.is_match(&lower) {
        "good"
    } else {
        "needs improvement"
    }
}

fn heuristic_analysis(raw: &str) -> Option<NormalizedAnalysis> {
    let sentences = split_sentences(raw);
    if sentences.is_empty() {
        return None;
    }

    let first_match = |words: &[&str]| sentences.iter().find(|s| contains_any(s, words)).cloned();

    let description = first_match(DESCRIPTION_WORDS);

    let ergonomic_evaluation: Vec<ErgonomicEvaluation> = CATEGORY_WORDS
        .iter()
        .filter_map(|(category, words)| {
            first_match(words).map(|sentence| ErgonomicEvaluation {
                category: category.to_string(),
                status: infer_status(&sentence).to_string(),
                observation: sentence,
                recommendation: None,
            })
        })
        .collect();

    let improvement_priorities: Vec<String> = sentences
        .iter()
        .filter(|s| contains_any(s, PRIORITY_WORDS))
        .take(MAX_HEURISTIC_PRIORITIES)
        .cloned()
        .collect();

    let style_assessment = sentences.iter().find_map(|sentence| {
        let lower = sentence.to_lowercase();
        STYLE_WORDS
            .iter()
            .find(|w| lower.contains(*w))
            .map(|style| StyleAssessment {
                current_style: capitalize_first(style),
                alignment_score: 0.5,
                alignment_explanation: sentence.clone(),
            })
    });

    let hexes: Vec<String> = HEX_COLOR
        .find_iter(raw)
        .map(|m| m.as_str().to_ascii_uppercase())
        .collect();
    let color_sentence = first_match(COLOR_WORDS);
    let color_analysis = (!hexes.is_empty() || color_sentence.is_some()).then(|| ColorAnalysis {
        dominant_colors: hexes,
        mood: color_sentence.unwrap_or_default(),
        color_harmony: String::new(),
    });

    if description.is_none()
        && ergonomic_evaluation.is_empty()
        && improvement_priorities.is_empty()
        && style_assessment.is_none()
        && color_analysis.is_none()
    {
        return None;
    }

    Some(NormalizedAnalysis {
        workspace_description: description.unwrap_or_else(|| PLACEHOLDER.to_string()),
        style_assessment,
        ergonomic_evaluation,
        improvement_priorities,
        color_analysis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str = r#"Here is the analysis:
```json
{
  "workspace_description": "A tidy desk by a window.",
  "ergonomic_evaluation": [
    {"category": "chair", "status": "poor", "observation": "Chair lacks lumbar support.", "recommendation": ""}
  ]
}
```
Let me know if you need anything else."#;

    #[test]
    fn fenced_json_is_parsed() {
        let outcome = parse(SCENARIO_A);
        assert_eq!(outcome.kind(), "parsed");
        let analysis = outcome.into_analysis();
        assert_eq!(analysis.workspace_description, "A tidy desk by a window.");
        assert_eq!(analysis.ergonomic_evaluation.len(), 1);
        let chair = &analysis.ergonomic_evaluation[0];
        assert_eq!(chair.category, "chair");
        assert_eq!(chair.status, "poor");
        assert_eq!(chair.observation, "Chair lacks lumbar support.");
        assert_eq!(chair.recommendation, None);
    }

    #[test]
    fn inline_json_with_surrounding_prose_is_parsed() {
        let raw = r#"Sure! {"workspaceDescription": "a bright corner {with} plants", "improvementPriorities": ["add a lamp", "x"]} Hope this helps."#;
        let outcome = parse(raw);
        assert!(matches!(outcome, ParseOutcome::Parsed(_)));
        let analysis = outcome.analysis();
        assert_eq!(analysis.workspace_description, "A bright corner {with} plants");
        assert_eq!(analysis.improvement_priorities, vec!["Add a lamp".to_string()]);
    }

    #[test]
    fn trailing_commas_are_repaired() {
        let raw = r#"{"workspace_description": "Compact desk.", "improvement_priorities": ["Raise the monitor",],}"#;
        let outcome = parse(raw);
        assert!(matches!(outcome, ParseOutcome::Parsed(_)));
        assert_eq!(outcome.analysis().improvement_priorities, vec!["Raise the monitor"]);
    }

    #[test]
    fn style_scores_are_normalized() {
        let raw = r#"{"workspace_description": "Desk.", "style_assessment": {"current_style": "industrial", "alignment_score": 85, "alignment_explanation": "mostly matches"}}"#;
        let analysis = parse(raw).into_analysis();
        let style = analysis.style_assessment.unwrap();
        assert_eq!(style.current_style, "Industrial");
        assert!((style.alignment_score - 0.85).abs() < 1e-9);
        assert_eq!(style.alignment_explanation, "Mostly matches");
    }

    #[test]
    fn color_analysis_keeps_only_valid_hex() {
        let raw = r##"{"workspace_description": "Desk.", "color_analysis": {"dominant_colors": ["#aabbcc", "red", {"hex": "112233"}], "mood": "calm", "color_harmony": "analogous"}}"##;
        let colors = parse(raw).into_analysis().color_analysis.unwrap();
        assert_eq!(colors.dominant_colors, vec!["#AABBCC", "#112233"]);
        assert_eq!(colors.mood, "Calm");
    }

    #[test]
    fn ergonomics_given_as_map_are_accepted() {
        let raw = r#"{"workspace_description": "Desk.", "ergonomic_evaluation": {"lighting": {"status": "ok", "observation": "window light from the left"}, "screen": "monitor is too low"}}"#;
        let evals = parse(raw).into_analysis().ergonomic_evaluation;
        assert_eq!(evals.len(), 2);
        let lighting = evals.iter().find(|e| e.category == "lighting").unwrap();
        assert_eq!(lighting.status, "ok");
        let screen = evals.iter().find(|e| e.category == "screen").unwrap();
        assert_eq!(screen.observation, "Monitor is too low");
    }

    #[test]
    fn prose_falls_back_to_heuristics() {
        let raw = "The lighting in this room is dim and creates glare. You should add a desk lamp.";
        let outcome = parse(raw);
        assert_eq!(outcome.kind(), "heuristic");
        let analysis = outcome.analysis();
        assert_eq!(
            analysis.workspace_description,
            "The lighting in this room is dim and creates glare."
        );
        assert!(analysis
            .ergonomic_evaluation
            .iter()
            .any(|e| e.category == "lighting"));
        assert_eq!(analysis.improvement_priorities, vec!["You should add a desk lamp."]);
    }

    #[test]
    fn prose_without_workspace_words_uses_placeholder() {
        let raw = "Lighting is a concern here! Consider a brighter bulb.";
        let analysis = parse(raw).into_analysis();
        assert_eq!(analysis.workspace_description, PLACEHOLDER);
        assert!(!analysis.ergonomic_evaluation.is_empty());
    }

    #[test]
    fn parser_never_panics_and_always_has_description() {
        let inputs = [
            "",
            "   \n\t",
            "hello",
            "{",
            "{\"workspace_description\": ",
            "```json\n{broken json}\n```",
            "{}",
            "[1, 2, 3]",
            "{\"workspace_description\": null}",
            SCENARIO_A,
            "}}}{{{",
            "🙂 ünïcödé . ! ?",
        ];
        for input in inputs {
            let analysis = parse(input).into_analysis();
            assert!(
                !analysis.workspace_description.is_empty(),
                "missing description for {:?}",
                input
            );
        }
    }

    #[test]
    fn blank_input_is_empty_outcome() {
        assert!(matches!(parse("  "), ParseOutcome::Empty(_)));
        assert!(matches!(parse("ok"), ParseOutcome::Empty(_)));
    }

    #[test]
    fn cleaner_strips_formatting_noise() {
        assert_eq!(clean_text(r#""description": "a cozy nook","#), "A cozy nook");
        assert_eq!(clean_text("```json\n[\"raise the chair\"]\n```"), "Raise the chair");
        assert_eq!(
            clean_text(r#"line one\nline \"two\" here"#),
            "Line one line \"two\" here"
        );
        assert_eq!(clean_text("  - **Lighting**:   too   dim  "), "Lighting: too dim");
        assert_eq!(clean_text("'quoted'"), "Quoted");
        assert_eq!(clean_text("ok"), "");
        assert_eq!(clean_text("..."), "");
        assert_eq!(clean_text("{ }"), "");
    }

    #[test]
    fn cleaner_is_idempotent_on_clean_text() {
        let samples = [
            "A tidy desk by a window.",
            "Monitor sits 10 cm below eye level",
            "Lighting: too dim",
            "The users' chairs",
            "Ünïcode stays put",
        ];
        for sample in samples {
            let once = clean_text(sample);
            assert_eq!(clean_text(&once), once);
            assert_eq!(once, sample);
        }

        let noisy = clean_text(r#"  "key": "`value with \"quotes\"`", "#);
        assert_eq!(clean_text(&noisy), noisy);
    }

    #[test]
    fn cleaner_keeps_unpaired_delimiters() {
        assert_eq!(
            clean_text("Raise the monitor to eye level [see note]"),
            "Raise the monitor to eye level [see note]"
        );
        assert_eq!(
            clean_text("\"Cozy\" best describes the corner"),
            "\"Cozy\" best describes the corner"
        );
        assert_eq!(clean_text("{braces} around part of it"), "{braces} around part of it");
        assert_eq!(clean_text("[\"wrapped\", \"list\"]"), "\"wrapped\", \"list\"");
    }

    #[test]
    fn status_words_match_whole_words_only() {
        assert_eq!(infer_status("The black chair looks excellent and supportive."), "good");
        assert_eq!(infer_status("Knowledge books are well arranged."), "good");
        assert_eq!(infer_status("The chair lacks lumbar support."), "poor");
        assert_eq!(infer_status("There is no footrest under the desk."), "poor");
    }

    #[test]
    fn negated_problems_read_as_positive() {
        assert_eq!(infer_status("Your lighting is great with no glare at all."), "good");
        assert_eq!(infer_status("The screen setup has no issues."), "good");
        assert_eq!(infer_status("A desk without visible clutter."), "good");
        assert_eq!(infer_status("No glare, but the lamp is too dim."), "poor");
    }

    #[test]
    fn positive_prose_is_not_graded_poor() {
        let analysis = parse(
            "Your lighting is great with no glare at all. The black chair looks excellent and supportive.",
        )
        .into_analysis();
        let statuses: Vec<(&str, &str)> = analysis
            .ergonomic_evaluation
            .iter()
            .map(|e| (e.category.as_str(), e.status.as_str()))
            .collect();
        assert!(statuses.contains(&("lighting", "good")), "{:?}", statuses);
        assert!(statuses.contains(&("chair", "good")), "{:?}", statuses);
    }

    #[test]
    fn first_object_span_ignores_braces_in_strings() {
        let text = r#"x {"a": "}{", "b": {"c": 1}} y {"d": 2}"#;
        assert_eq!(
            first_object_span(text),
            Some(r#"{"a": "}{", "b": {"c": 1}}"#)
        );
    }
}
