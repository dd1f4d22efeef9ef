// src/services/ergonomics.rs
//! Maps free-form ergonomic observations onto the five canonical categories.

use crate::models::{
    ErgonomicCategory, ErgonomicEvaluation, ErgonomicInsight, ErgonomicStatus,
    NormalizedAnalysis, Strictness,
};
use crate::services::response_parser::clean_text;
use log::debug;
use std::collections::HashMap;

use ErgonomicCategory::*;
use ErgonomicStatus::*;

/// Recommendations shorter than this are replaced with a canned one.
const MIN_RECOMMENDATION_LEN: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub strictness: Strictness,
    /// Append a "good" insight for every category the model did not mention.
    pub fill_missing_categories: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::Standard,
            fill_missing_categories: true,
        }
    }
}

pub fn build_insights(analysis: &NormalizedAnalysis, config: &EngineConfig) -> Vec<ErgonomicInsight> {
    let mut by_category: HashMap<ErgonomicCategory, ErgonomicInsight> = HashMap::new();

    for evaluation in &analysis.ergonomic_evaluation {
        let Some(insight) = insight_from_evaluation(evaluation, config.strictness) else {
            debug!("Dropping ergonomic entry with unknown category {:?}", evaluation.category);
            continue;
        };
        let keep_existing = by_category
            .get(&insight.category)
            .is_some_and(|existing| existing.status <= insight.status);
        if !keep_existing {
            by_category.insert(insight.category, insight);
        }
    }

    let mut first_priority = true;
    for priority in &analysis.improvement_priorities {
        let Some(category) = detect_category(priority) else {
            continue;
        };
        if by_category.contains_key(&category) {
            continue;
        }
        let status = if first_priority { Poor } else { NeedsImprovement };
        first_priority = false;
        by_category.insert(category, priority_insight(category, status, priority));
    }

    if config.fill_missing_categories {
        for category in ErgonomicCategory::ALL {
            by_category
                .entry(category)
                .or_insert_with(|| default_insight(category));
        }
    }

    let mut insights: Vec<ErgonomicInsight> = by_category.into_values().collect();
    sort_insights(&mut insights);
    insights
}

/// One "good" insight per category, in sorted order.
pub fn default_insights() -> Vec<ErgonomicInsight> {
    let mut insights: Vec<ErgonomicInsight> =
        ErgonomicCategory::ALL.into_iter().map(default_insight).collect();
    sort_insights(&mut insights);
    insights
}

/// Severity first (`poor` before `good`), then the fixed category priority.
pub fn sort_insights(insights: &mut [ErgonomicInsight]) {
    insights.sort_by_key(|insight| (insight.status, insight.category.priority()));
}

fn insight_from_evaluation(
    evaluation: &ErgonomicEvaluation,
    strictness: Strictness,
) -> Option<ErgonomicInsight> {
    let category = resolve_category(&evaluation.category)?;
    let status = resolve_status(&evaluation.status, strictness);

    let description = match clean_text(&evaluation.observation) {
        text if text.is_empty() => default_description(category, status).to_string(),
        text => text,
    };

    let recommendation = evaluation
        .recommendation
        .as_deref()
        .map(clean_text)
        .filter(|text| text.chars().count() >= MIN_RECOMMENDATION_LEN)
        .unwrap_or_else(|| {
            select_recommendation(category, status, &evaluation.observation).to_string()
        });

    Some(ErgonomicInsight {
        category,
        status,
        title: title_for(category, status).to_string(),
        description,
        recommendation: Some(recommendation),
    })
}

fn priority_insight(category: ErgonomicCategory, status: ErgonomicStatus, priority: &str) -> ErgonomicInsight {
    ErgonomicInsight {
        category,
        status,
        title: title_for(category, status).to_string(),
        description: clean_text(priority),
        recommendation: Some(select_recommendation(category, status, priority).to_string()),
    }
}

fn default_insight(category: ErgonomicCategory) -> ErgonomicInsight {
    ErgonomicInsight {
        category,
        status: Good,
        title: title_for(category, Good).to_string(),
        description: default_description(category, Good).to_string(),
        recommendation: None,
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', ' ', '/'], "-")
        .trim_matches('-')
        .to_string()
}

/// Exact synonym lookup for a model-provided category label.
fn lookup_category(key: &str) -> Option<ErgonomicCategory> {
    let category = match key {
        "desk-height" | "desk" | "desk-setup" | "table" | "table-height" | "work-surface"
        | "desk-ergonomics" | "surface-height" => DeskHeight,
        "chair-posture" | "chair" | "posture" | "seating" | "seat" | "sitting"
        | "chair-and-posture" | "chair-&-posture" | "lumbar-support" | "back-support" => {
            ChairPosture
        }
        "lighting" | "light" | "lights" | "lamp" | "illumination" | "brightness" | "glare"
        | "natural-light" | "task-lighting" => Lighting,
        "screen-position" | "screen" | "monitor" | "monitor-position" | "display"
        | "monitor-height" | "screen-height" | "laptop" | "eye-level" | "viewing-distance" => {
            ScreenPosition
        }
        "organization" | "organisation" | "clutter" | "storage" | "cable-management" | "cables"
        | "tidiness" | "desk-organization" | "workspace-organization" => Organization,
        _ => return None,
    };
    Some(category)
}

/// Keyword fragments for free text (priorities, unusual labels).
const CATEGORY_KEYWORDS: &[(ErgonomicCategory, &[&str])] = &[
    (ChairPosture, &["chair", "posture", "lumbar", "seat", "sitting", "back support"]),
    (ScreenPosition, &["screen", "monitor", "display", "eye level", "eye-level", "laptop"]),
    (Lighting, &["lighting", "light", "lamp", "glare", "illuminat", "bright", "dim"]),
    (Organization, &["clutter", "organiz", "organis", "storage", "cable", "tidy", "mess"]),
    // "desk" shows up in most sentences, so it only wins when nothing else matches.
    (DeskHeight, &["desk height", "desk", "table", "standing", "surface"]),
];

pub fn resolve_category(raw: &str) -> Option<ErgonomicCategory> {
    let key = normalize_key(raw);
    if key.is_empty() {
        return None;
    }
    lookup_category(&key).or_else(|| detect_category(raw))
}

/// First category whose keywords appear in `text`.
pub fn detect_category(text: &str) -> Option<ErgonomicCategory> {
    let lower = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category)
}

/// Buckets of raw status words; strictness decides the canonical status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Positive,
    Acceptable,
    Mixed,
    Negative,
    Unknown,
}

fn classify_status(key: &str) -> StatusClass {
    match key {
        "good" | "excellent" | "great" | "optimal" | "ideal" | "very-good" | "proper"
        | "correct" => StatusClass::Positive,
        "acceptable" | "adequate" | "fair" | "ok" | "okay" | "decent" | "satisfactory"
        | "moderate" | "average" => StatusClass::Acceptable,
        "needs-improvement" | "needs-work" | "could-improve" | "could-be-improved"
        | "suboptimal" | "improvable" | "minor-issues" | "warning" | "needs-adjustment" => {
            StatusClass::Mixed
        }
        "poor" | "bad" | "critical" | "problematic" | "needs-attention" | "concerning"
        | "inadequate" | "unacceptable" | "severe" | "harmful" => StatusClass::Negative,
        _ => StatusClass::Unknown,
    }
}

pub fn resolve_status(raw: &str, strictness: Strictness) -> ErgonomicStatus {
    let class = classify_status(&normalize_key(raw));
    match (class, strictness) {
        (StatusClass::Positive, _) => Good,
        (StatusClass::Acceptable, Strictness::Lenient) => Good,
        (StatusClass::Acceptable, Strictness::Standard) => NeedsImprovement,
        (StatusClass::Acceptable, Strictness::Strict) => Poor,
        (StatusClass::Mixed, Strictness::Strict) => Poor,
        (StatusClass::Mixed, _) => NeedsImprovement,
        (StatusClass::Negative, Strictness::Lenient) => NeedsImprovement,
        (StatusClass::Negative, _) => Poor,
        (StatusClass::Unknown, _) => NeedsImprovement,
    }
}

pub fn title_for(category: ErgonomicCategory, status: ErgonomicStatus) -> &'static str {
    match (category, status) {
        (DeskHeight, Good) => "Desk Height Looks Right",
        (DeskHeight, NeedsImprovement) => "Desk Height Could Be Adjusted",
        (DeskHeight, Poor) => "Desk Height Needs Attention",
        (ChairPosture, Good) => "Good Seating Support",
        (ChairPosture, NeedsImprovement) => "Seating Could Be Improved",
        (ChairPosture, Poor) => "Posture Support Needs Attention",
        (Lighting, Good) => "Well-Lit Workspace",
        (Lighting, NeedsImprovement) => "Lighting Could Be Better",
        (Lighting, Poor) => "Lighting Needs Attention",
        (ScreenPosition, Good) => "Screen Well Positioned",
        (ScreenPosition, NeedsImprovement) => "Screen Position Could Be Adjusted",
        (ScreenPosition, Poor) => "Screen Position Needs Attention",
        (Organization, Good) => "Well-Organized Space",
        (Organization, NeedsImprovement) => "Organization Could Be Improved",
        (Organization, Poor) => "Clutter Needs Attention",
    }
}

fn default_description(category: ErgonomicCategory, status: ErgonomicStatus) -> &'static str {
    match (category, status) {
        (DeskHeight, Good) => "No desk height issues were detected.",
        (ChairPosture, Good) => "No seating or posture issues were detected.",
        (Lighting, Good) => "No lighting issues were detected.",
        (ScreenPosition, Good) => "No screen positioning issues were detected.",
        (Organization, Good) => "No organization issues were detected.",
        (DeskHeight, _) => "The desk height may not suit a neutral typing posture.",
        (ChairPosture, _) => "The chair may not be supporting a healthy sitting posture.",
        (Lighting, _) => "The lighting may cause eye strain during long sessions.",
        (ScreenPosition, _) => "The screen may not be at a comfortable height or distance.",
        (Organization, _) => "Clutter on the work surface may be limiting usable space.",
    }
}

fn recommendation_options(category: ErgonomicCategory, status: ErgonomicStatus) -> &'static [&'static str] {
    match (category, status) {
        (DeskHeight, Good) => &[
            "Keep your elbows at roughly 90 degrees while typing.",
            "Your desk height works well; keep your wrists neutral as you type.",
        ],
        (DeskHeight, NeedsImprovement) => &[
            "Adjust your desk or chair so your forearms rest parallel to the floor.",
            "Consider a keyboard tray to bring the typing surface closer to elbow height.",
        ],
        (DeskHeight, Poor) => &[
            "Consider a height-adjustable desk so your elbows sit at 90 degrees.",
            "Raise or lower the work surface until your shoulders can stay relaxed.",
            "A sit-stand desk converter can fix an unsuitable desk height quickly.",
        ],
        (ChairPosture, Good) => &[
            "Keep taking short standing breaks every 30 to 45 minutes.",
            "Your seating looks supportive; keep both feet flat on the floor.",
        ],
        (ChairPosture, NeedsImprovement) => &[
            "Add a lumbar cushion to support the natural curve of your lower back.",
            "Adjust the seat height so your knees sit level with your hips.",
        ],
        (ChairPosture, Poor) => &[
            "Invest in an ergonomic chair with adjustable lumbar support and armrests.",
            "Replace the current chair with one offering height and back-tilt adjustment.",
            "Use a footrest and lumbar pillow until you can upgrade to an ergonomic chair.",
        ],
        (Lighting, Good) => &[
            "Keep glare low by angling screens away from direct window light.",
            "Your lighting is balanced; add a warm lamp for evening sessions if needed.",
        ],
        (Lighting, NeedsImprovement) => &[
            "Add an adjustable task lamp to light your main work area evenly.",
            "Use sheer curtains to soften direct sunlight and reduce glare.",
        ],
        (Lighting, Poor) => &[
            "Add a dimmable LED desk lamp and position your screen perpendicular to windows.",
            "Layer ambient and task lighting to remove dark spots and reduce eye strain.",
            "Replace harsh overhead bulbs with diffused, daylight-balanced lighting.",
        ],
        (ScreenPosition, Good) => &[
            "Keep the top of the screen at or slightly below eye level.",
            "Your screen placement works; keep it about an arm's length away.",
        ],
        (ScreenPosition, NeedsImprovement) => &[
            "Raise the screen slightly so the top edge sits at eye level.",
            "Move the monitor to about an arm's length from your seated position.",
        ],
        (ScreenPosition, Poor) => &[
            "Use a monitor arm or riser to bring the screen up to eye level.",
            "Put the laptop on a stand and use an external keyboard and mouse.",
            "Center the screen in front of you to avoid twisting your neck.",
        ],
        (Organization, Good) => &[
            "Keep frequently used items within easy reach to stay organized.",
            "Your space is tidy; a weekly reset will keep it that way.",
        ],
        (Organization, NeedsImprovement) => &[
            "Add a desk organizer to give small items a dedicated home.",
            "Route cables along the back of the desk with clips or a tray.",
        ],
        (Organization, Poor) => &[
            "Clear the work surface and add drawer or shelf storage for supplies.",
            "Install a cable management tray and move rarely used items off the desk.",
            "Use vertical storage like wall shelves to free up desk space.",
        ],
    }
}

/// Picks one canned recommendation for the cell. The choice is a stable hash
/// of `seed`, so the same observation always yields the same text.
pub fn select_recommendation(
    category: ErgonomicCategory,
    status: ErgonomicStatus,
    seed: &str,
) -> &'static str {
    let options = recommendation_options(category, status);
    let hash = seed
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    options[(hash % options.len() as u64) as usize]
}
