//! Maneuver classification and place-name extraction.
//!
//! Two classifiers share the [`ManeuverClassifier`] seam:
//! [`TextClassifier`] reads the free-text instruction, and
//! [`StructuredClassifier`] reads only the maneuver type/modifier.

use serde::{Deserialize, Serialize};

use crate::route::{ManeuverType, Modifier, RouteStep};

/// Direction categories handed from classification to narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectionCategory {
    Right,
    Left,
    SlightRight,
    SlightLeft,
    SharpRight,
    SharpLeft,
    Straight,
    #[serde(rename = "uturn")]
    UTurn,
    HighwayEnter,
    HighwayExit,
    Merge,
    Junction,
    Ic,
    Sapa,
    None,
}

impl DirectionCategory {
    pub const ALL: [DirectionCategory; 15] = [
        Self::Right,
        Self::Left,
        Self::SlightRight,
        Self::SlightLeft,
        Self::SharpRight,
        Self::SharpLeft,
        Self::Straight,
        Self::UTurn,
        Self::HighwayEnter,
        Self::HighwayExit,
        Self::Merge,
        Self::Junction,
        Self::Ic,
        Self::Sapa,
        Self::None,
    ];
}

/// Maps a route step to a direction category. Must be total.
pub trait ManeuverClassifier: Send {
    fn classify(&self, step: &RouteStep) -> DirectionCategory;
}

/// Classifies on the lower-cased instruction text. Ignores type/modifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextClassifier;

impl ManeuverClassifier for TextClassifier {
    fn classify(&self, step: &RouteStep) -> DirectionCategory {
        classify_text(&step.instruction)
    }
}

/// Ordered substring tests on an instruction. First match wins.
pub fn classify_text(instruction: &str) -> DirectionCategory {
    let t = instruction.to_lowercase();

    if t.contains("u-turn") {
        return DirectionCategory::UTurn;
    }

    if t.contains("sharp right") {
        return DirectionCategory::SharpRight;
    }
    if t.contains("sharp left") {
        return DirectionCategory::SharpLeft;
    }

    if t.contains("bear right") {
        return DirectionCategory::SlightRight;
    }
    if t.contains("bear left") {
        return DirectionCategory::SlightLeft;
    }

    if t.contains("turn right") {
        return DirectionCategory::Right;
    }
    if t.contains("turn left") {
        return DirectionCategory::Left;
    }

    if t.contains("straight") {
        return DirectionCategory::Straight;
    }

    if t.contains("motorway") {
        if t.contains("enter") || t.contains("ramp") {
            return DirectionCategory::HighwayEnter;
        }
        if t.contains("exit") {
            return DirectionCategory::HighwayExit;
        }
    }

    if t.contains("merge") {
        return DirectionCategory::Merge;
    }
    if t.contains("junction") {
        return DirectionCategory::Junction;
    }
    if t.contains("interchange") {
        return DirectionCategory::Ic;
    }
    if t.contains("service area") || t.contains("parking area") {
        return DirectionCategory::Sapa;
    }

    DirectionCategory::None
}

/// Classifies on maneuver type and modifier only.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredClassifier;

impl ManeuverClassifier for StructuredClassifier {
    fn classify(&self, step: &RouteStep) -> DirectionCategory {
        match step.maneuver_type {
            ManeuverType::UTurn => DirectionCategory::UTurn,
            ManeuverType::Merge => DirectionCategory::Merge,
            ManeuverType::Ramp => DirectionCategory::HighwayEnter,
            ManeuverType::Exit => DirectionCategory::HighwayExit,
            ManeuverType::Fork | ManeuverType::MotorwayJunction => DirectionCategory::Junction,
            ManeuverType::Turn => modifier_category(step.modifier),
            ManeuverType::Roundabout | ManeuverType::Other => DirectionCategory::None,
        }
    }
}

fn modifier_category(modifier: Modifier) -> DirectionCategory {
    match modifier {
        Modifier::Right => DirectionCategory::Right,
        Modifier::Left => DirectionCategory::Left,
        Modifier::SlightRight => DirectionCategory::SlightRight,
        Modifier::SlightLeft => DirectionCategory::SlightLeft,
        Modifier::SharpRight => DirectionCategory::SharpRight,
        Modifier::SharpLeft => DirectionCategory::SharpLeft,
        Modifier::UTurn => DirectionCategory::UTurn,
        // A turn without a modifier is read as going straight on
        Modifier::Straight | Modifier::None => DirectionCategory::Straight,
    }
}

/// Which classifier an engine should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Text,
    Structured,
}

impl ClassifierKind {
    pub fn build(self) -> Box<dyn ManeuverClassifier> {
        match self {
            Self::Text => Box::new(TextClassifier),
            Self::Structured => Box::new(StructuredClassifier),
        }
    }
}

/// Extract the place name following "onto " or "toward ".
///
/// When both markers are present the "toward " result wins.
pub fn extract_place_name(text: &str) -> String {
    let mut name = "";

    if let Some(pos) = text.find("onto ") {
        name = &text[pos + "onto ".len()..];
    }
    if let Some(pos) = text.find("toward ") {
        name = &text[pos + "toward ".len()..];
    }

    name.chars()
        .filter(|c| !matches!(c, ',' | '.' | ';'))
        .collect::<String>()
        .trim()
        .to_string()
}
