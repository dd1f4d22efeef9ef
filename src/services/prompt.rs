// src/services/prompt.rs
use crate::models::AnalysisContext;

pub fn build_analysis_prompt(context: &AnalysisContext) -> String {
    format!(
        r##"
        You are an expert workspace designer and ergonomics consultant. Analyze this
        photo of a home workspace for the following person:

        - Desired vibe: {vibe}
        - Color preference: {colors}
        - Budget: {budget}

        Evaluate these ergonomic areas: desk height, chair and posture, lighting,
        screen position, and organization. For each area give a status of "good",
        "needs-improvement" or "poor", a short observation of what you can see, and
        a concrete recommendation.

        Also assess how well the current style matches the desired vibe (score from
        0 to 1), list the most important improvements in priority order, and
        describe the dominant colors as hex codes.

        Return ONLY JSON matching this structure:
        {{
            "workspace_description": "...",
            "style_assessment": {{
                "current_style": "...",
                "alignment_score": 0.0,
                "alignment_explanation": "..."
            }},
            "ergonomic_evaluation": [
                {{
                    "category": "desk-height | chair-posture | lighting | screen-position | organization",
                    "status": "good | needs-improvement | poor",
                    "observation": "...",
                    "recommendation": "..."
                }}
            ],
            "improvement_priorities": ["..."],
            "color_analysis": {{
                "dominant_colors": ["#RRGGBB"],
                "mood": "...",
                "color_harmony": "..."
            }}
        }}
        "##,
        vibe = context.vibe_description,
        colors = context.color_preference_description,
        budget = context.budget_description,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_user_context() {
        let context = AnalysisContext {
            vibe_description: "Cozy and warm with soft textures".into(),
            color_preference_description: "Soft pastel shades".into(),
            budget_description: "Under $500".into(),
        };
        let prompt = build_analysis_prompt(&context);
        assert!(prompt.contains("Desired vibe: Cozy and warm with soft textures"));
        assert!(prompt.contains("Budget: Under $500"));
        assert!(prompt.contains("\"workspace_description\""));
        assert!(prompt.contains(r##""dominant_colors": ["#RRGGBB"]"##));
        assert!(prompt.trim_end().ends_with('}'));
    }
}
