//! Guidance text generation.
//!
//! Turns a direction category, a formatted distance and a place name into
//! display and voice phrasing. Japanese is the primary locale; English
//! phrasing follows the same table structure.

use serde::{Deserialize, Serialize};

use crate::classify::{extract_place_name, DirectionCategory, ManeuverClassifier};
use crate::route::{ManeuverType, Modifier, RouteStep};

/// Narration language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

/// Fixed announcements that are not tied to a maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Announcement {
    Arrived,
    Rerouting,
    NoRoute,
    GuidanceEnded,
    SimulationEnded,
}

/// A distance after rounding, before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rounded {
    Meters(u64),
    /// Kilometers in tenths, 12 = 1.2 km.
    KilometerTenths(u64),
}

/// Round below 1000 m to the nearest 10 m, otherwise to 0.1 km.
///
/// Values that round up to 1000 m are moved to the kilometer regime so
/// the output never reads "1000 m".
fn round_distance(meters: f64) -> Rounded {
    // NaN and non-positive read as zero; +inf saturates in the km regime
    let m = if meters > 0.0 { meters } else { 0.0 };

    if m < 1000.0 {
        let rounded = (m / 10.0).round() as u64 * 10;
        if rounded < 1000 {
            return Rounded::Meters(rounded);
        }
    }

    Rounded::KilometerTenths((m / 100.0).round() as u64)
}

impl Locale {
    /// Pick a locale from a BCP 47 language tag. Unknown tags fall back
    /// to Japanese.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        if primary.eq_ignore_ascii_case("en") {
            Self::En
        } else {
            Self::Ja
        }
    }

    /// Language tag handed to the speech surface.
    pub fn speech_tag(self) -> &'static str {
        match self {
            Self::Ja => "ja-JP",
            Self::En => "en-US",
        }
    }

    pub fn format_distance(self, meters: f64) -> String {
        match (self, round_distance(meters)) {
            (Self::Ja, Rounded::Meters(m)) => format!("{m}メートル"),
            (Self::Ja, Rounded::KilometerTenths(t)) => format!("{}.{}キロ", t / 10, t % 10),
            (Self::En, Rounded::Meters(m)) => format!("{m} m"),
            (Self::En, Rounded::KilometerTenths(t)) => format!("{}.{} km", t / 10, t % 10),
        }
    }

    fn place_clause(self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        match self {
            Self::Ja => format!("{name}を"),
            Self::En => format!("via {name}, "),
        }
    }

    /// Text for the guidance panel. Never leads with a distance.
    pub fn display_narration(self, category: DirectionCategory, place_name: &str) -> String {
        let place = self.place_clause(place_name);
        match self {
            Self::Ja => {
                let phrase = match category {
                    DirectionCategory::Right => "右方向です。",
                    DirectionCategory::Left => "左方向です。",
                    DirectionCategory::SlightRight => "斜め右方向です。",
                    DirectionCategory::SlightLeft => "斜め左方向です。",
                    DirectionCategory::SharpRight => "大きく右に曲がります。",
                    DirectionCategory::SharpLeft => "大きく左に曲がります。",
                    DirectionCategory::Straight => "直進です。",
                    DirectionCategory::UTurn => "Uターンです。",
                    DirectionCategory::HighwayEnter => "高速道路に入ります。",
                    DirectionCategory::HighwayExit => "高速道路から降ります。",
                    DirectionCategory::Merge => "本線に合流します。",
                    DirectionCategory::Junction => "分岐があります。",
                    DirectionCategory::Sapa => "サービスエリア付近です。",
                    DirectionCategory::Ic => "インターチェンジ方向です。",
                    DirectionCategory::None if place.is_empty() => "案内があります。",
                    DirectionCategory::None => "道なりに進みます。",
                };
                format!("{place}{phrase}")
            }
            Self::En => {
                let phrase = match category {
                    DirectionCategory::Right => "turn right.",
                    DirectionCategory::Left => "turn left.",
                    DirectionCategory::SlightRight => "bear right.",
                    DirectionCategory::SlightLeft => "bear left.",
                    DirectionCategory::SharpRight => "make a sharp right.",
                    DirectionCategory::SharpLeft => "make a sharp left.",
                    DirectionCategory::Straight => "continue straight.",
                    DirectionCategory::UTurn => "make a U-turn.",
                    DirectionCategory::HighwayEnter => "enter the motorway.",
                    DirectionCategory::HighwayExit => "exit the motorway.",
                    DirectionCategory::Merge => "merge onto the main road.",
                    DirectionCategory::Junction => "junction ahead.",
                    DirectionCategory::Sapa => "service area ahead.",
                    DirectionCategory::Ic => "head for the interchange.",
                    DirectionCategory::None => "guidance available.",
                };
                capitalize_first(&format!("{place}{phrase}"))
            }
        }
    }

    /// Text for speech. Always leads with the remaining distance.
    pub fn voice_narration(
        self,
        category: DirectionCategory,
        distance_text: &str,
        place_name: &str,
    ) -> String {
        let place = self.place_clause(place_name);
        let d = distance_text;
        match self {
            Self::Ja => match category {
                DirectionCategory::Right => format!("あと{d}で、{place}右に曲がります。"),
                DirectionCategory::Left => format!("あと{d}で、{place}左に曲がります。"),
                DirectionCategory::SlightRight => format!("あと{d}で、{place}斜め右方向です。"),
                DirectionCategory::SlightLeft => format!("あと{d}で、{place}斜め左方向です。"),
                DirectionCategory::SharpRight => format!("あと{d}で、{place}大きく右に曲がります。"),
                DirectionCategory::SharpLeft => format!("あと{d}で、{place}大きく左に曲がります。"),
                DirectionCategory::Straight => format!("あと{d}で、{place}直進です。"),
                DirectionCategory::UTurn => format!("あと{d}で、{place}Uターンです。"),
                DirectionCategory::HighwayEnter => format!("あと{d}で{place}高速道路に入ります。"),
                DirectionCategory::HighwayExit => format!("あと{d}で{place}高速道路を降ります。"),
                DirectionCategory::Merge => format!("あと{d}で{place}本線に合流します。"),
                DirectionCategory::Junction => format!("あと{d}で{place}分岐があります。"),
                DirectionCategory::Sapa => format!("あと{d}で{place}サービスエリア付近です。"),
                DirectionCategory::Ic => format!("あと{d}で{place}インターチェンジ方向です。"),
                DirectionCategory::None if place.is_empty() => format!("あと{d}です。"),
                DirectionCategory::None => format!("あと{d}で、{place}道なりに進みます。"),
            },
            Self::En => {
                let phrase = match category {
                    DirectionCategory::Right => "turn right.",
                    DirectionCategory::Left => "turn left.",
                    DirectionCategory::SlightRight => "bear right.",
                    DirectionCategory::SlightLeft => "bear left.",
                    DirectionCategory::SharpRight => "make a sharp right.",
                    DirectionCategory::SharpLeft => "make a sharp left.",
                    DirectionCategory::Straight => "continue straight.",
                    DirectionCategory::UTurn => "make a U-turn.",
                    DirectionCategory::HighwayEnter => "enter the motorway.",
                    DirectionCategory::HighwayExit => "exit the motorway.",
                    DirectionCategory::Merge => "merge onto the main road.",
                    DirectionCategory::Junction => "there is a junction.",
                    DirectionCategory::Sapa => "there is a service area.",
                    DirectionCategory::Ic => "head for the interchange.",
                    DirectionCategory::None => "continue.",
                };
                format!("In {d}, {place}{phrase}")
            }
        }
    }

    /// Instruction text built from maneuver type and modifier alone.
    pub fn build_instruction(self, step: &RouteStep) -> String {
        let road = if step.name.is_empty() {
            String::new()
        } else {
            match self {
                Self::Ja => format!("{}を", step.name),
                Self::En => format!("via {}, ", step.name),
            }
        };

        let modifier = step.modifier;
        let text = match self {
            Self::Ja => {
                let stem = direction_phrase_ja(modifier).trim_end_matches("です");
                match step.maneuver_type {
                    ManeuverType::Turn => direction_phrase_ja(modifier).to_string(),
                    ManeuverType::UTurn => "Uターンしてください".to_string(),
                    ManeuverType::Merge => "本線に合流します".to_string(),
                    ManeuverType::Fork => format!("{stem}方向の分岐です"),
                    ManeuverType::Ramp if is_plain_side(modifier) => {
                        format!("{stem}方向のランプに入ります")
                    }
                    ManeuverType::Ramp => "ランプに入ります".to_string(),
                    ManeuverType::Exit => format!("{stem}方向の出口です"),
                    ManeuverType::MotorwayJunction => format!("{stem}方向の分岐（IC / JCT）です"),
                    ManeuverType::Roundabout => match step.roundabout_exit {
                        Some(exit) => format!("ラウンドアバウト {exit} 番目で出ます"),
                        None => "ラウンドアバウトを出ます".to_string(),
                    },
                    ManeuverType::Other => "そのまま進みます".to_string(),
                }
            }
            Self::En => {
                let keep = match side_word_en(modifier) {
                    Some(side) => format!("keep {side}"),
                    None => "continue".to_string(),
                };
                let side = side_word_en(modifier).filter(|_| is_plain_side(modifier));
                match step.maneuver_type {
                    ManeuverType::Turn => direction_phrase_en(modifier).to_string(),
                    ManeuverType::UTurn => "make a U-turn".to_string(),
                    ManeuverType::Merge => "merge onto the main road".to_string(),
                    ManeuverType::Fork => format!("{keep} at the junction"),
                    ManeuverType::Ramp => match side {
                        Some(side) => format!("take the motorway ramp on the {side}"),
                        None => "take the motorway ramp".to_string(),
                    },
                    ManeuverType::Exit => match side {
                        Some(side) => format!("take the motorway exit on the {side}"),
                        None => "take the motorway exit".to_string(),
                    },
                    ManeuverType::MotorwayJunction => format!("{keep} at the junction (IC / JCT)"),
                    ManeuverType::Roundabout => match step.roundabout_exit {
                        Some(exit) => format!("at the roundabout, take exit number {exit}"),
                        None => "at the roundabout, take the exit".to_string(),
                    },
                    ManeuverType::Other => "continue ahead".to_string(),
                }
            }
        };

        match self {
            Self::Ja => format!("{road}{text}"),
            Self::En => capitalize_first(&format!("{road}{text}")),
        }
    }

    pub fn announcement(self, announcement: Announcement) -> &'static str {
        match (self, announcement) {
            (Self::Ja, Announcement::Arrived) => "目的地に到着しました。案内を終了します。",
            (Self::Ja, Announcement::Rerouting) => "ルートから外れました。経路を再検索します。",
            (Self::Ja, Announcement::NoRoute) => "ルートが取得できません。",
            (Self::Ja, Announcement::GuidanceEnded) => "案内を終了します。",
            (Self::Ja, Announcement::SimulationEnded) => "デモ走行が終了しました。",
            (Self::En, Announcement::Arrived) => {
                "You have arrived at your destination. Guidance ended."
            }
            (Self::En, Announcement::Rerouting) => "You are off route. Recalculating.",
            (Self::En, Announcement::NoRoute) => "Could not find a route.",
            (Self::En, Announcement::GuidanceEnded) => "Guidance ended.",
            (Self::En, Announcement::SimulationEnded) => "Simulation ended.",
        }
    }
}

fn is_plain_side(modifier: Modifier) -> bool {
    matches!(modifier, Modifier::Right | Modifier::Left)
}

fn direction_phrase_ja(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Right => "右方向です",
        Modifier::Left => "左方向です",
        Modifier::SlightRight => "斜め右方向です",
        Modifier::SlightLeft => "斜め左方向です",
        Modifier::SharpRight => "大きく右方向です",
        Modifier::SharpLeft => "大きく左方向です",
        Modifier::UTurn => "Uターンです",
        Modifier::Straight | Modifier::None => "直進です",
    }
}

fn direction_phrase_en(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Right => "turn right",
        Modifier::Left => "turn left",
        Modifier::SlightRight => "bear right",
        Modifier::SlightLeft => "bear left",
        Modifier::SharpRight => "make a sharp right",
        Modifier::SharpLeft => "make a sharp left",
        Modifier::UTurn => "make a U-turn",
        Modifier::Straight | Modifier::None => "continue straight ahead",
    }
}

/// Side for "keep ..." phrasing. Turn-like modifiers have none, so the
/// text never reads as a turn.
fn side_word_en(modifier: Modifier) -> Option<&'static str> {
    match modifier {
        Modifier::Right => Some("right"),
        Modifier::Left => Some("left"),
        Modifier::SlightRight => Some("slightly right"),
        Modifier::SlightLeft => Some("slightly left"),
        _ => None,
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Guidance for one navigation moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guidance {
    pub step_index: usize,
    pub category: DirectionCategory,
    pub display_text: String,
    pub voice_text: String,
    pub distance_text: String,
    pub distance_m: f64,
    /// Instruction built from the structured maneuver fields.
    pub instruction: String,
}

/// Classifier plus locale: everything needed to narrate a step.
pub struct Narrator {
    classifier: Box<dyn ManeuverClassifier>,
    locale: Locale,
}

impl Narrator {
    pub fn new(classifier: Box<dyn ManeuverClassifier>, locale: Locale) -> Self {
        Self { classifier, locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn guidance(&self, step: &RouteStep, distance_m: f64) -> Guidance {
        let category = self.classifier.classify(step);
        let place = extract_place_name(&step.instruction);
        let distance_text = self.locale.format_distance(distance_m);

        Guidance {
            step_index: step.index,
            category,
            display_text: self.locale.display_narration(category, &place),
            voice_text: self.locale.voice_narration(category, &distance_text, &place),
            distance_text,
            distance_m,
            instruction: self.locale.build_instruction(step),
        }
    }

    pub fn announce(&self, announcement: Announcement) -> String {
        self.locale.announcement(announcement).to_string()
    }
}

impl std::fmt::Debug for Narrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Narrator").field("locale", &self.locale).finish_non_exhaustive()
    }
}
