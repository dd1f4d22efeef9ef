// src/models.rs
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Raw style-quiz answer codes as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizAnswers {
    pub vibe: Option<String>,
    pub color_preference: Option<String>,
    pub budget: Option<String>,
}

/// Human-readable user context derived once per request from [`QuizAnswers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisContext {
    pub vibe_description: String,
    pub color_preference_description: String,
    pub budget_description: String,
}

/// A photo as supplied by the photo provider.
#[derive(Debug, Clone)]
pub struct PhotoHandle {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleAssessment {
    pub current_style: String,
    pub alignment_score: f64,
    pub alignment_explanation: String,
}

/// One ergonomic observation as reported by the model. Category and status
/// are still free-form here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErgonomicEvaluation {
    pub category: String,
    pub status: String,
    pub observation: String,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorAnalysis {
    pub dominant_colors: Vec<String>,
    pub mood: String,
    pub color_harmony: String,
}

/// Model output after parsing and text cleaning, before mapping into the
/// final result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAnalysis {
    pub workspace_description: String,
    pub style_assessment: Option<StyleAssessment>,
    pub ergonomic_evaluation: Vec<ErgonomicEvaluation>,
    pub improvement_priorities: Vec<String>,
    pub color_analysis: Option<ColorAnalysis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErgonomicCategory {
    DeskHeight,
    ChairPosture,
    Lighting,
    ScreenPosition,
    Organization,
}

impl ErgonomicCategory {
    pub const ALL: [ErgonomicCategory; 5] = [
        ErgonomicCategory::DeskHeight,
        ErgonomicCategory::ChairPosture,
        ErgonomicCategory::Lighting,
        ErgonomicCategory::ScreenPosition,
        ErgonomicCategory::Organization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErgonomicCategory::DeskHeight => "desk-height",
            ErgonomicCategory::ChairPosture => "chair-posture",
            ErgonomicCategory::Lighting => "lighting",
            ErgonomicCategory::ScreenPosition => "screen-position",
            ErgonomicCategory::Organization => "organization",
        }
    }

    /// Tie-break order used when sorting insights of equal severity.
    pub fn priority(&self) -> u8 {
        match self {
            ErgonomicCategory::ChairPosture => 0,
            ErgonomicCategory::DeskHeight => 1,
            ErgonomicCategory::ScreenPosition => 2,
            ErgonomicCategory::Lighting => 3,
            ErgonomicCategory::Organization => 4,
        }
    }
}

impl fmt::Display for ErgonomicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical severity. Declaration order is severity order: `Poor` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErgonomicStatus {
    Poor,
    NeedsImprovement,
    Good,
}

impl ErgonomicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErgonomicStatus::Poor => "poor",
            ErgonomicStatus::NeedsImprovement => "needs-improvement",
            ErgonomicStatus::Good => "good",
        }
    }
}

impl fmt::Display for ErgonomicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErgonomicInsight {
    pub category: ErgonomicCategory,
    pub status: ErgonomicStatus,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecommendation {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: PriceRange,
    pub category: String,
    pub image_url: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Focus,
    Creativity,
    Calm,
    Energizing,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Focus => "focus",
            Mood::Creativity => "creativity",
            Mood::Calm => "calm",
            Mood::Energizing => "energizing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub colors: Vec<String>,
    pub mood: Mood,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleMatch {
    pub vibe: String,
    pub confidence: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceAnalysisResult {
    pub id: Uuid,
    pub summary: String,
    pub recommendations: Vec<ProductRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<ColorPalette>,
    pub ergonomic_insights: Vec<ErgonomicInsight>,
    pub style_match: StyleMatch,
    pub created_at: DateTime<Utc>,
    pub processing_time: u64,
}

/// How ambiguous status words are mapped onto the three canonical severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Lenient,
    #[default]
    Standard,
    Strict,
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Strictness::Lenient),
            "standard" => Ok(Strictness::Standard),
            "strict" => Ok(Strictness::Strict),
            other => Err(format!("unknown strictness level: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_is_severity_order() {
        assert!(ErgonomicStatus::Poor < ErgonomicStatus::NeedsImprovement);
        assert!(ErgonomicStatus::NeedsImprovement < ErgonomicStatus::Good);
    }

    #[test]
    fn canonical_enums_serialize_as_kebab_case() {
        let insight = ErgonomicInsight {
            category: ErgonomicCategory::ScreenPosition,
            status: ErgonomicStatus::NeedsImprovement,
            title: "t".into(),
            description: "d".into(),
            recommendation: None,
        };
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["category"], "screen-position");
        assert_eq!(json["status"], "needs-improvement");
        assert!(json.get("recommendation").is_none());
    }

    #[test]
    fn strictness_parses_case_insensitively() {
        assert_eq!("STRICT".parse::<Strictness>(), Ok(Strictness::Strict));
        assert_eq!(" lenient ".parse::<Strictness>(), Ok(Strictness::Lenient));
        assert!("harsh".parse::<Strictness>().is_err());
    }
}
