//! Rule-based plant health scoring.
//!
//! Each sensor dimension is checked against a fixed low/high band. A reading
//! outside the band costs points and produces a categorized insight; a
//! reading inside it adds a line to the recommendations. Bounds are
//! exclusive, so a reading sitting exactly on a bound counts as normal.
//!
//! Output order is fixed: summary, range findings in table order, fertility,
//! watering reminder, recommendations.

use serde::Serialize;

use crate::sensors::{Fertility, SensorField, SensorSnapshot};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Summary,
    Alert,
    Action,
    Info,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<String>>,
}

impl Insight {
    fn text(kind: InsightKind, title: &'static str, text: impl Into<String>) -> Self {
        Self {
            kind,
            title,
            text: Some(text.into()),
            list: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Critical,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
    Good,
    Excellent,
}

impl HealthStatus {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=49 => Self::Critical,
            50..=69 => Self::NeedsAttention,
            70..=89 => Self::Good,
            _ => Self::Excellent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::NeedsAttention => "Needs Attention",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub score: u8,
    pub status: HealthStatus,
    pub insights: Vec<Insight>,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Everything the engine looks at. Unknown values skip their rule.
#[derive(Debug, Clone)]
pub struct HealthInput {
    pub readings: SensorSnapshot,
    pub fertility: Option<Fertility>,
    pub last_watered_days: Option<u32>,
}

impl HealthInput {
    pub fn from_snapshot(snapshot: &SensorSnapshot, last_watered: &str) -> Self {
        Self {
            readings: snapshot.clone(),
            fertility: snapshot.fertility(),
            last_watered_days: parse_last_watered_days(last_watered),
        }
    }
}

/// `"3 Days Ago"` → 3. Anything else (including "1 Day Ago") is unknown.
pub fn parse_last_watered_days(descriptor: &str) -> Option<u32> {
    if !descriptor.contains("Days Ago") {
        return None;
    }
    descriptor.split_whitespace().next()?.parse().ok()
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

struct Finding {
    kind: InsightKind,
    title: &'static str,
    text: &'static str,
    penalty: i32,
    follow_up: Option<&'static str>,
}

struct RangeRule {
    field: SensorField,
    low: f64,
    high: f64,
    below: Finding,
    above: Finding,
    normal: &'static str,
}

const RANGE_RULES: [RangeRule; 6] = [
    RangeRule {
        field: SensorField::Temperature,
        low: 20.0,
        high: 27.0,
        below: Finding {
            kind: InsightKind::Alert,
            title: "Temperature Alert:",
            text: "Temperature is low. Consider warmer environment if plant is tropical.",
            penalty: 5,
            follow_up: None,
        },
        above: Finding {
            kind: InsightKind::Alert,
            title: "Temperature Alert:",
            text: "Temperature is high. Ensure good ventilation.",
            penalty: 5,
            follow_up: None,
        },
        normal: "Maintain optimal temperature range.",
    },
    RangeRule {
        field: SensorField::Humidity,
        low: 55.0,
        high: 70.0,
        below: Finding {
            kind: InsightKind::Alert,
            title: "Humidity Alert:",
            text: "Humidity is low. Consider misting or a humidifier.",
            penalty: 5,
            follow_up: None,
        },
        above: Finding {
            kind: InsightKind::Alert,
            title: "Humidity Alert:",
            text: "Humidity is high. Ensure good airflow to prevent mold.",
            penalty: 3,
            follow_up: None,
        },
        normal: "Maintain optimal humidity levels.",
    },
    RangeRule {
        field: SensorField::SoilMoisture,
        low: 45.0,
        high: 85.0,
        below: Finding {
            kind: InsightKind::Action,
            title: "Watering Recommended:",
            text: "Soil moisture is low. It's time to water your plant!",
            penalty: 10,
            follow_up: Some("Water your plant soon!"),
        },
        above: Finding {
            kind: InsightKind::Alert,
            title: "Overwatering Alert:",
            text: "Soil moisture is very high. Reduce watering to prevent root rot.",
            penalty: 8,
            follow_up: None,
        },
        normal: "Soil moisture is good. Continue monitoring.",
    },
    RangeRule {
        field: SensorField::LightIntensity,
        low: 3500.0,
        high: 5500.0,
        below: Finding {
            kind: InsightKind::Info,
            title: "Light Level:",
            text: "Light intensity is low. \
                   Consider moving to a brighter spot or using a grow light.",
            penalty: 5,
            follow_up: None,
        },
        above: Finding {
            kind: InsightKind::Info,
            title: "Light Level:",
            text: "Light intensity is high. Ensure plant is not getting scorched.",
            penalty: 3,
            follow_up: None,
        },
        normal: "Light conditions are good.",
    },
    RangeRule {
        field: SensorField::SoilPh,
        low: 6.0,
        high: 7.0,
        below: Finding {
            kind: InsightKind::Alert,
            title: "Soil pH Alert:",
            text: "Soil pH is low. Consider adjusting to a more neutral range.",
            penalty: 7,
            follow_up: Some("Adjust soil pH towards neutral (6.0-7.0)."),
        },
        above: Finding {
            kind: InsightKind::Alert,
            title: "Soil pH Alert:",
            text: "Soil pH is high. Consider adjusting to a more neutral range.",
            penalty: 7,
            follow_up: Some("Adjust soil pH towards neutral (6.0-7.0)."),
        },
        normal: "Soil pH is within optimal range.",
    },
    RangeRule {
        field: SensorField::NutrientLevel,
        low: 500.0,
        high: 900.0,
        below: Finding {
            kind: InsightKind::Action,
            title: "Nutrient Deficiency:",
            text: "Nutrient level is low. Consider fertilizing your plant.",
            penalty: 8,
            follow_up: Some("Provide a balanced liquid fertilizer."),
        },
        above: Finding {
            kind: InsightKind::Alert,
            title: "Nutrient Excess:",
            text: "Nutrient level is high. Consider flushing soil to prevent nutrient burn.",
            penalty: 5,
            follow_up: None,
        },
        normal: "Nutrient levels are adequate.",
    },
];

const FERTILITY_LOW: Finding = Finding {
    kind: InsightKind::Action,
    title: "Soil Fertility Alert:",
    text: "Soil fertility is low. Consider adding fertilizer.",
    penalty: 7,
    follow_up: Some("Consider fertilizing your plant."),
};

const FERTILITY_FAIR: Finding = Finding {
    kind: InsightKind::Info,
    title: "Soil Fertility:",
    text: "Soil fertility is fair. Monitor or lightly fertilize.",
    penalty: 3,
    follow_up: None,
};

const FERTILITY_OK: &str = "Soil fertility is optimal.";
const WATERING_SCHEDULE: &str = "Establish a consistent watering schedule.";
const REMINDER_MIN_DAYS: u32 = 3;
const REMINDER_MAX_MOISTURE: f64 = 60.0;
const NOTHING_TO_RECOMMEND: &str =
    "No specific recommendations at this time. Your plant is doing great!";

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

struct Tally {
    score: i32,
    insights: Vec<Insight>,
    recommendations: Vec<String>,
}

impl Tally {
    fn record(&mut self, finding: &Finding) {
        self.score -= finding.penalty;
        self.insights
            .push(Insight::text(finding.kind, finding.title, finding.text));
        if let Some(r) = finding.follow_up {
            self.recommendations.push(r.to_string());
        }
    }
}

/// Score a snapshot and explain the score.
pub fn evaluate(input: &HealthInput) -> HealthReport {
    let mut tally = Tally {
        score: 100,
        insights: Vec::new(),
        recommendations: Vec::new(),
    };

    for rule in &RANGE_RULES {
        let Some(value) = input.readings.get(rule.field) else {
            continue;
        };
        if value < rule.low {
            tally.record(&rule.below);
        } else if value > rule.high {
            tally.record(&rule.above);
        } else {
            tally.recommendations.push(rule.normal.to_string());
        }
    }

    match input.fertility {
        Some(Fertility::Low) => tally.record(&FERTILITY_LOW),
        Some(Fertility::Fair) => tally.record(&FERTILITY_FAIR),
        Some(_) => tally.recommendations.push(FERTILITY_OK.to_string()),
        None => {}
    }

    if let Some(days) = input.last_watered_days {
        let moisture = input.readings.get(SensorField::SoilMoisture);
        if days >= REMINDER_MIN_DAYS && moisture.is_some_and(|m| m < REMINDER_MAX_MOISTURE) {
            tally.insights.push(Insight::text(
                InsightKind::Info,
                "Watering Reminder:",
                format!("It's been {days} days since last watered. Check soil moisture again."),
            ));
        }
        tally.recommendations.push(WATERING_SCHEDULE.to_string());
    }

    let score = clamp_score(tally.score);
    let status = HealthStatus::from_score(score);

    let mut insights = Vec::with_capacity(tally.insights.len() + 2);
    insights.push(Insight::text(
        InsightKind::Summary,
        "Overall Plant Health:",
        format!(
            "Current status: {} (Health Score: {score}%)",
            status.label()
        ),
    ));
    insights.append(&mut tally.insights);
    insights.push(if tally.recommendations.is_empty() {
        Insight::text(
            InsightKind::Recommendation,
            "General Recommendations:",
            NOTHING_TO_RECOMMEND,
        )
    } else {
        Insight {
            kind: InsightKind::Recommendation,
            title: "General Recommendations:",
            text: None,
            list: Some(tally.recommendations),
        }
    });

    HealthReport {
        score,
        status,
        insights,
    }
}

fn clamp_score(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

// ===========================================================================
// Tests
// ===========================================================================
