// src/context.rs
use crate::models::{AnalysisContext, QuizAnswers};

pub const DEFAULT_VIBE: &str = "Balanced, versatile workspace";
pub const DEFAULT_COLOR_PREFERENCE: &str = "Neutral, balanced color palette";
pub const DEFAULT_BUDGET: &str = "$500 - $1,500";

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_lowercase().replace(['_', ' '], "-")
}

fn vibe_description(code: &str) -> Option<&'static str> {
    let description = match normalize_code(code).as_str() {
        "minimal" | "minimalist" | "modern" => "Modern minimalist with clean lines",
        "cozy" | "warm" => "Cozy and warm with soft textures",
        "professional" | "executive" => "Professional and organized executive style",
        "creative" | "artistic" => "Creative and inspiring artistic space",
        "tech" | "gaming" | "tech-gaming" => "Tech-focused gaming and streaming setup",
        "natural" | "biophilic" => "Natural biophilic space with plants and wood",
        _ => return None,
    };
    Some(description)
}

fn color_description(code: &str) -> Option<&'static str> {
    let description = match normalize_code(code).as_str() {
        "neutral" => "Neutral tones like white, gray and beige",
        "warm" => "Warm colors like terracotta, amber and cream",
        "cool" => "Cool colors like blue, teal and sage",
        "bold" | "vibrant" => "Bold, vibrant accent colors",
        "monochrome" | "dark" => "Monochrome black and white with dark accents",
        "pastel" | "soft" => "Soft pastel shades",
        _ => return None,
    };
    Some(description)
}

fn budget_description(code: &str) -> Option<&'static str> {
    let description = match normalize_code(code).as_str() {
        "low" | "under-500" | "budget" => "Under $500",
        "medium" | "mid" | "500-1500" => "$500 - $1,500",
        "high" | "over-1500" | "premium" => "Over $1,500 (premium)",
        _ => return None,
    };
    Some(description)
}

/// Maps raw quiz answer codes onto descriptions. Unknown or missing codes fall
/// back to the neutral defaults; this never fails.
pub fn build_context(answers: &QuizAnswers) -> AnalysisContext {
    let pick = |code: &Option<String>, lookup: fn(&str) -> Option<&'static str>, default| {
        code.as_deref()
            .and_then(lookup)
            .unwrap_or(default)
            .to_string()
    };

    AnalysisContext {
        vibe_description: pick(&answers.vibe, vibe_description, DEFAULT_VIBE),
        color_preference_description: pick(
            &answers.color_preference,
            color_description,
            DEFAULT_COLOR_PREFERENCE,
        ),
        budget_description: pick(&answers.budget, budget_description, DEFAULT_BUDGET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(vibe: &str, color: &str, budget: &str) -> QuizAnswers {
        QuizAnswers {
            vibe: Some(vibe.to_string()),
            color_preference: Some(color.to_string()),
            budget: Some(budget.to_string()),
        }
    }

    #[test]
    fn known_codes_map_to_descriptions() {
        let ctx = build_context(&answers("Tech_Gaming", "cool", "low"));
        assert_eq!(ctx.vibe_description, "Tech-focused gaming and streaming setup");
        assert_eq!(ctx.color_preference_description, "Cool colors like blue, teal and sage");
        assert_eq!(ctx.budget_description, "Under $500");
    }

    #[test]
    fn unknown_and_missing_codes_use_defaults() {
        let ctx = build_context(&answers("spaceship", "plaid", "infinite"));
        assert_eq!(ctx.vibe_description, DEFAULT_VIBE);
        assert_eq!(ctx.color_preference_description, DEFAULT_COLOR_PREFERENCE);
        assert_eq!(ctx.budget_description, DEFAULT_BUDGET);

        let empty = build_context(&QuizAnswers::default());
        assert_eq!(empty, ctx);
    }
}
