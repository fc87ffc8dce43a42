//! The dashboard's startup catalog.
//!
//! Everything the console is configured with at startup lives here as plain
//! data: the chart and scatter presets, the editable config field catalog,
//! the publisher sub-record catalog, and the enactable policy catalog. The
//! engines consume these declaratively; adding a chart is a data change.

use crate::charts::{ChartSpec, DatasetSpec, ScatterSpec};
use crate::config::{FieldKind, FieldSpec};
use crate::policy::{ArgKind, ArgSpec, PolicySpec};
use serde_json::{json, Value};

/// How many per-entity samples each step record carries.
pub const AGENT_SAMPLE: usize = 15;
pub const PLATFORM_SAMPLE: usize = 10;
pub const PUBLISHER_SAMPLE: usize = 10;

const MOTIVES: &[&str] = &["Profit", "Influence", "Civic"];

/// A max/min/mean aggregate chart over one stat prefix.
fn stat_chart(title: &str, prefix: &str) -> ChartSpec {
    ChartSpec {
        title: title.to_string(),
        datasets: ["max", "min", "mean"]
            .iter()
            .map(|stat| DatasetSpec {
                label: stat.to_string(),
                key: format!("{prefix}.{stat}"),
            })
            .collect(),
    }
}

/// A per-entity chart: one dataset per sampled entity index.
fn sample_chart(title: &str, prefix: &str, field: &str, n: usize) -> ChartSpec {
    ChartSpec {
        title: title.to_string(),
        datasets: (0..n)
            .map(|i| DatasetSpec {
                label: i.to_string(),
                key: format!("{prefix}.{i}.{field}"),
            })
            .collect(),
    }
}

/// The time-series chart presets.
pub fn charts() -> Vec<ChartSpec> {
    let mut charts = vec![
        stat_chart("Shares per Content", "shares"),
        stat_chart("Followers", "followers"),
        stat_chart("Value Shifts (sample)", "value_shifts"),
        ChartSpec {
            title: "p Producing".to_string(),
            datasets: vec![DatasetSpec {
                label: "p".to_string(),
                key: "p_produced".to_string(),
            }],
        },
        stat_chart("Subscribers (Publishers)", "publishers.stats.subscribers"),
        stat_chart("Reach (Publishers)", "publishers.stats.reach"),
        stat_chart("Budget (Publishers)", "publishers.stats.budget"),
        stat_chart("Published (Publishers)", "publishers.stats.published"),
        stat_chart("Publishability (sample)", "publishability"),
        stat_chart("Resources (sample)", "resources"),
    ];
    for (title, field) in [
        ("Publisher Reach", "reach"),
        ("Publisher Budget", "budget"),
        ("Publisher Ads", "ads"),
        ("Publisher Quality", "quality"),
    ] {
        charts.push(sample_chart(title, "publishers.sample", field, PUBLISHER_SAMPLE));
    }
    for (title, field) in [("Platform Users", "users"), ("Platform Data", "data")] {
        charts.push(sample_chart(title, "platforms.sample", field, PLATFORM_SAMPLE));
    }
    charts
}

/// The scatter-trajectory presets.
pub fn scatters() -> Vec<ScatterSpec> {
    vec![
        ScatterSpec {
            title: "Agent Values".to_string(),
            key: "agents".to_string(),
            item_key: "values".to_string(),
            panel: true,
            labels: (0..AGENT_SAMPLE).map(|i| format!("Agent {i}")).collect(),
        },
        ScatterSpec {
            title: "Most Popular Content Values".to_string(),
            key: "top_content".to_string(),
            item_key: "values".to_string(),
            panel: false,
            labels: (0..10).map(|i| format!("Content {i}")).collect(),
        },
        ScatterSpec {
            title: "Publisher Audience Understanding".to_string(),
            key: "publishers.audience".to_string(),
            item_key: "values".to_string(),
            panel: true,
            labels: (0..PUBLISHER_SAMPLE).map(|i| format!("Publisher {i}")).collect(),
        },
    ]
}

/// The editable configuration fields the console exposes.
pub const CONFIG_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "POPULATION",
        group: Some("SIMULATION"),
        kind: FieldKind::Int,
        desc: "The number of agents to create. Higher numbers will run slower but can provide better results.",
    },
    FieldSpec {
        name: "GRID_SIZE",
        group: Some("SIMULATION"),
        kind: FieldKind::Int,
        desc: "The size of the world. An n-by-n hex grid represents the world, where n is this value.",
    },
    FieldSpec {
        name: "N_PUBLISHERS",
        group: Some("SIMULATION"),
        kind: FieldKind::Int,
        desc: "The number of publishers to create. Higher numbers will run slower but can provide better results.",
    },
    FieldSpec {
        name: "N_PLATFORMS",
        group: Some("SIMULATION"),
        kind: FieldKind::Int,
        desc: "The number of platforms to create. Higher numbers will run slower but can provide better results.",
    },
    FieldSpec {
        name: "CONTACT_RATE",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "The base offline contact rate, i.e. probability that two agents share content in a step (without platforms).",
    },
    FieldSpec {
        name: "ATTENTION_BUDGET",
        group: Some("SIMULATION.AGENT"),
        kind: FieldKind::Float,
        desc: "Attention budget for each agent. Limits how much content an agent can consume.",
    },
    FieldSpec {
        name: "MAX_INFLUENCE",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "Maximum amount a piece of content can influence a person's values.",
    },
    FieldSpec {
        name: "GRAVITY_STRETCH",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "Horizontal stretching of gravity function. Higher values mean weaker influence at greater distances.",
    },
    FieldSpec {
        name: "DEFAULT_TRUST",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "How much agents initially trust each other.",
    },
    FieldSpec {
        name: "FOLLOW_TRUST",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "If agent A's trust of agent B goes above this value, A follows B.",
    },
    FieldSpec {
        name: "UNFOLLOW_TRUST",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "If agent A's trust of agent B falls below this value, A unfollows B.",
    },
    FieldSpec {
        name: "SUBSCRIBE_TRUST",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "If agent A's trust of publisher B goes above this value, A subscribes to B.",
    },
    FieldSpec {
        name: "UNSUBSCRIBE_TRUST",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "If agent A's trust of publisher B falls below this value, A unsubscribes from B.",
    },
    FieldSpec {
        name: "UNSUBSCRIBE_LAG",
        group: Some("SIMULATION"),
        kind: FieldKind::Int,
        desc: "Agents unsubscribe from publishers if they don't see content from them for this many steps.",
    },
    FieldSpec {
        name: "CONTENT_SAMPLE_SIZE",
        group: Some("SIMULATION"),
        kind: FieldKind::Int,
        desc: "How much content a publisher looks at to understand its audience.",
    },
    FieldSpec {
        name: "BASE_SIGNUP_RATE",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "Base probability of signing up to a platform.",
    },
    FieldSpec {
        name: "DATA_PER_CONSUME",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "How much data is generated for a platform when a piece of content is consumed there.",
    },
    FieldSpec {
        name: "MAX_PLATFORMS",
        group: Some("SIMULATION"),
        kind: FieldKind::Int,
        desc: "Max platforms an agent signs up for.",
    },
    FieldSpec {
        name: "REVENUE_PER_AD",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "Revenue per ad view.",
    },
    FieldSpec {
        name: "BASE_BUDGET",
        group: Some("SIMULATION.PUBLISHER"),
        kind: FieldKind::Float,
        desc: "Base budget for publishers. Determines how much content they can produce per step.",
    },
    FieldSpec {
        name: "REVENUE_PER_SUBSCRIBER",
        group: Some("SIMULATION.PUBLISHER"),
        kind: FieldKind::Float,
        desc: "How much each subscriber adds to the publisher's budget.",
    },
    FieldSpec {
        name: "BASE_CONVERSION_RATE",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "Base conversion rate for ads.",
    },
    FieldSpec {
        name: "MAX_CONVERSION_RATE",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "Maximum conversion rate for ads.",
    },
    FieldSpec {
        name: "COST_PER_QUALITY",
        group: Some("SIMULATION"),
        kind: FieldKind::Float,
        desc: "Cost to improve content quality by 1 point.",
    },
    FieldSpec {
        name: "SEED",
        group: None,
        kind: FieldKind::Int,
        desc: "Use a consistent seed value to control for randomness across runs. You probably don't need to change this.",
    },
];

/// The editable fields of one publisher record.
pub const PUBLISHER_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "BASE_BUDGET",
        group: None,
        kind: FieldKind::Float,
        desc: "Base budget for the publisher.",
    },
    FieldSpec {
        name: "MOTIVE",
        group: None,
        kind: FieldKind::Enum(MOTIVES),
        desc: "Publisher's motivation, which influences their decisions. One of \"Profit\", \"Influence\", or \"Civic\".",
    },
];

/// A new publisher record, built from the catalog defaults.
pub fn default_publisher() -> Value {
    json!({
        "BASE_BUDGET": 2000.0,
        "MOTIVE": "Civic",
    })
}

/// The enactable policy catalog.
pub fn policies() -> Vec<PolicySpec> {
    vec![
        PolicySpec {
            name: "PopulationChange",
            desc: "Change the population by the specified amount.",
            args: vec![ArgSpec {
                name: "amount",
                kind: ArgKind::Int,
                min: Some(0.0),
                default: 100.0,
            }],
        },
        PolicySpec {
            name: "SubsidizeProduction",
            desc: "Increase the resources of publishers by the specified amount.",
            args: vec![ArgSpec {
                name: "amount",
                kind: ArgKind::Float,
                min: Some(0.0),
                default: 100.0,
            }],
        },
        PolicySpec {
            name: "TaxAdvertising",
            desc: "Implement a tax of the specified amount on all advertising.",
            args: vec![ArgSpec {
                name: "tax",
                kind: ArgKind::Float,
                min: Some(0.0),
                default: 0.1,
            }],
        },
        PolicySpec {
            name: "FoundPlatforms",
            desc: "Create new social media platforms.",
            args: vec![ArgSpec {
                name: "amount",
                kind: ArgKind::Int,
                min: Some(0.0),
                default: 5.0,
            }],
        },
        PolicySpec {
            name: "MediaLiteracy",
            desc: "Improve media literacy.",
            args: vec![ArgSpec {
                name: "amount",
                kind: ArgKind::Float,
                min: Some(0.0),
                default: 0.1,
            }],
        },
        PolicySpec {
            name: "Recession",
            desc: "Trigger economic recession.",
            args: vec![ArgSpec {
                name: "amount",
                kind: ArgKind::Float,
                min: Some(0.0),
                default: 0.8,
            }],
        },
    ]
}
