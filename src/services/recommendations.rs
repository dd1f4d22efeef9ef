// src/services/recommendations.rs
//! Product suggestions scaled to the user's budget and style.

use crate::models::{AnalysisContext, NormalizedAnalysis, PriceRange, ProductRecommendation};
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_RECOMMENDATIONS: usize = 8;
const PRICE_SPREAD: f64 = 0.2;
const CURRENCY: &str = "USD";
const PRODUCT_IMAGE_BASE: &str = "https://cdn.deskscope.app/products";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetTier {
    Low,
    Mid,
    High,
}

impl BudgetTier {
    pub fn from_description(description: &str) -> Self {
        let lower = description.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["under", "low", "budget", "tight", "affordable"]) {
            BudgetTier::Low
        } else if has(&["over", "premium", "high", "luxury", "unlimited"]) {
            BudgetTier::High
        } else {
            BudgetTier::Mid
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            BudgetTier::Low => 0.6,
            BudgetTier::Mid => 1.0,
            BudgetTier::High => 1.8,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            BudgetTier::Low => "low",
            BudgetTier::Mid => "mid",
            BudgetTier::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProductTemplate {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    base_price: f64,
    category: &'static str,
    tags: &'static [&'static str],
}

const BASE_CATALOG: [ProductTemplate; 6] = [
    ProductTemplate {
        key: "standing-desk",
        name: "Adjustable Standing Desk",
        description: "Electric sit-stand desk with memory presets for a healthy working height.",
        base_price: 400.0,
        category: "desk",
        tags: &["ergonomic", "adjustable", "desk"],
    },
    ProductTemplate {
        key: "task-chair",
        name: "Ergonomic Task Chair",
        description: "Breathable mesh chair with adjustable lumbar support and armrests.",
        base_price: 250.0,
        category: "chair",
        tags: &["ergonomic", "lumbar-support", "seating"],
    },
    ProductTemplate {
        key: "led-desk-lamp",
        name: "LED Desk Lamp",
        description: "Dimmable task lamp with adjustable color temperature to reduce eye strain.",
        base_price: 60.0,
        category: "lighting",
        tags: &["lighting", "dimmable", "eye-care"],
    },
    ProductTemplate {
        key: "desk-organizer",
        name: "Desk Organizer Set",
        description: "Modular trays and a cable box that give every item a dedicated place.",
        base_price: 40.0,
        category: "storage",
        tags: &["organization", "storage", "cable-management"],
    },
    ProductTemplate {
        key: "desk-plants",
        name: "Low-Maintenance Plant Set",
        description: "Trio of easy-care plants that soften the space and improve air quality.",
        base_price: 50.0,
        category: "decor",
        tags: &["decor", "biophilic", "plants"],
    },
    ProductTemplate {
        key: "monitor-arm",
        name: "Monitor Arm",
        description: "Gas-spring arm that lifts the screen to eye level and frees desk space.",
        base_price: 150.0,
        category: "tech",
        tags: &["ergonomic", "monitor", "tech"],
    },
];

const STYLE_CATALOG: &[(&[&str], ProductTemplate)] = &[
    (
        &["modern", "minimalist", "minimal"],
        ProductTemplate {
            key: "minimalist-wall-art",
            name: "Minimalist Wall Art",
            description: "Framed line-art prints in muted tones for a clean, uncluttered wall.",
            base_price: 80.0,
            category: "decor",
            tags: &["minimalist", "wall-art", "decor"],
        },
    ),
    (
        &["cozy", "warm"],
        ProductTemplate {
            key: "warm-ambient-light",
            name: "Warm Ambient Floor Lamp",
            description: "Soft, warm-white floor lamp with a linen shade for relaxed evening light.",
            base_price: 90.0,
            category: "lighting",
            tags: &["cozy", "ambient", "lighting"],
        },
    ),
    (
        &["professional", "executive", "organized"],
        ProductTemplate {
            key: "filing-cabinet",
            name: "Mobile Filing Cabinet",
            description: "Lockable three-drawer cabinet that tucks under the desk.",
            base_price: 180.0,
            category: "storage",
            tags: &["professional", "storage", "filing"],
        },
    ),
    (
        &["creative", "artistic", "inspir"],
        ProductTemplate {
            key: "inspiration-board",
            name: "Cork & Fabric Inspiration Board",
            description: "Large pin board for sketches, swatches and project notes.",
            base_price: 45.0,
            category: "decor",
            tags: &["creative", "mood-board", "decor"],
        },
    ),
    (
        &["tech", "gaming", "streaming"],
        ProductTemplate {
            key: "rgb-light-strip",
            name: "RGB Lighting Strip",
            description: "App-controlled bias lighting strip that reduces eye strain behind screens.",
            base_price: 35.0,
            category: "lighting",
            tags: &["tech", "rgb", "lighting"],
        },
    ),
    (
        &["natural", "biophilic", "plant", "wood"],
        ProductTemplate {
            key: "wooden-monitor-stand",
            name: "Solid Wood Monitor Stand",
            description: "Oak riser with a storage shelf that brings natural texture to the desk.",
            base_price: 70.0,
            category: "tech",
            tags: &["natural", "wood", "monitor"],
        },
    ),
];

const LIGHTING_WORDS: &[&str] = &["light", "lamp", "dark", "dim", "glare", "bright"];
const CLUTTER_WORDS: &[&str] = &["clutter", "mess", "organiz", "organis", "storage", "tidy", "cable"];

/// Never fails: any internal problem yields the fixed fallback list.
pub fn generate(analysis: &NormalizedAnalysis, context: &AnalysisContext) -> Vec<ProductRecommendation> {
    match try_generate(context) {
        Ok(mut recommendations) => {
            prioritize(&mut recommendations, &analysis.improvement_priorities);
            recommendations
        }
        Err(err) => {
            warn!("Recommendation generation failed, using fallback list: {}", err);
            fallback_recommendations()
        }
    }
}

fn try_generate(context: &AnalysisContext) -> Result<Vec<ProductRecommendation>, String> {
    let tier = BudgetTier::from_description(&context.budget_description);
    let vibe = context.vibe_description.to_lowercase();

    let style_templates = STYLE_CATALOG
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| vibe.contains(k)))
        .map(|(_, template)| *template);

    let templates: Vec<ProductTemplate> = BASE_CATALOG
        .into_iter()
        .chain(style_templates)
        .take(MAX_RECOMMENDATIONS)
        .collect();

    if templates.is_empty() {
        return Err("product catalog is empty".to_string());
    }

    templates
        .iter()
        .map(|template| build_recommendation(template, tier))
        .collect()
}

/// `round(base * multiplier)` with a symmetric spread of 20%.
pub fn price_range(base_price: f64, multiplier: f64) -> Result<PriceRange, String> {
    let adjusted = (base_price * multiplier).round();
    let spread = (PRICE_SPREAD * adjusted).round();
    let (min, max) = (adjusted - spread, adjusted + spread);
    if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
        return Err(format!(
            "invalid price range for base {} x {}",
            base_price, multiplier
        ));
    }
    Ok(PriceRange {
        min,
        max,
        currency: CURRENCY.to_string(),
    })
}

fn seed_for(key: &str) -> u64 {
    key.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn rating_for(key: &str) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed_for(key));
    let rating: f64 = rng.gen_range(4.2..=4.8);
    (rating * 10.0).round() / 10.0
}

fn build_recommendation(template: &ProductTemplate, tier: BudgetTier) -> Result<ProductRecommendation, String> {
    Ok(ProductRecommendation {
        id: format!("rec-{}-{}", template.key, tier.as_str()),
        name: template.name.to_string(),
        description: template.description.to_string(),
        price: price_range(template.base_price, tier.multiplier())?,
        category: template.category.to_string(),
        image_url: format!("{}/{}.jpg", PRODUCT_IMAGE_BASE, template.key),
        tags: template.tags.iter().map(|t| t.to_string()).collect(),
        rating: Some(rating_for(template.key)),
    })
}

/// Moves storage items, then lighting items, to the front when the
/// priorities call for them. Relative order is otherwise preserved.
fn prioritize(recommendations: &mut Vec<ProductRecommendation>, priorities: &[String]) {
    let text = priorities.join(" ").to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| text.contains(w));

    let mut promote = |category: &str| {
        let (mut front, rest): (Vec<_>, Vec<_>) = recommendations
            .drain(..)
            .partition(|r| r.category == category);
        front.extend(rest);
        *recommendations = front;
    };

    if mentions(CLUTTER_WORDS) {
        promote("storage");
    }
    if mentions(LIGHTING_WORDS) {
        promote("lighting");
    }
}

pub fn fallback_recommendations() -> Vec<ProductRecommendation> {
    let item = |key: &str, name: &str, description: &str, category: &str, min: f64, max: f64| {
        ProductRecommendation {
            id: format!("fallback-{}", key),
            name: name.to_string(),
            description: description.to_string(),
            price: PriceRange {
                min,
                max,
                currency: CURRENCY.to_string(),
            },
            category: category.to_string(),
            image_url: format!("{}/{}.jpg", PRODUCT_IMAGE_BASE, key),
            tags: vec![category.to_string()],
            rating: None,
        }
    };

    vec![
        item(
            "chair",
            "Ergonomic Office Chair",
            "Adjustable chair with lumbar support for long working sessions.",
            "chair",
            150.0,
            300.0,
        ),
        item(
            "lamp",
            "Adjustable Desk Lamp",
            "Task lamp with adjustable brightness to reduce eye strain.",
            "lighting",
            30.0,
            80.0,
        ),
        item(
            "organizer",
            "Desk Organizer",
            "Simple tray set that keeps supplies off the work surface.",
            "storage",
            20.0,
            50.0,
        ),
    ]
}
