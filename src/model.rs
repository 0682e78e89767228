//! Translated shapes of the NextBus public XML feed.
//!
//! Field names serialize in the feed's own camelCase so JSON output lines up
//! with the attribute names callers see in the upstream documentation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Route titles keyed by route tag.
pub type RouteTable = BTreeMap<String, String>;

/// One transit agency as listed by the `agencyList` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyInfo {
    pub title: String,
    pub region_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,
}

/// A stop on a route. Coordinates are kept exactly as the feed sent them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub lat: String,
    pub lon: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,
}

/// One direction of travel. `stops` holds stop tags in travel order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Direction {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub stops: Vec<String>,
}

/// Full configuration of a single route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteConfig {
    pub stops: BTreeMap<String, Stop>,
    pub directions: BTreeMap<String, Direction>,
    /// Never populated: terse mode strips path geometry.
    pub paths: BTreeMap<String, Vec<String>>,
}

impl RouteConfig {
    /// Stop tags referenced by a direction but absent from `stops`.
    /// Not checked while parsing.
    pub fn dangling_stop_tags(&self) -> Vec<(&str, &str)> {
        let stops = &self.stops;
        self.directions
            .iter()
            .flat_map(move |(dir_tag, dir)| {
                dir.stops
                    .iter()
                    .filter(move |tag| !stops.contains_key(*tag))
                    .map(move |tag| (dir_tag.as_str(), tag.as_str()))
            })
            .collect()
    }
}

/// A single forecast vehicle arrival or departure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub epoch_time: String,
    pub seconds: String,
    pub minutes: String,
    pub is_departure: bool,
    pub dir_tag: String,
    pub trip_tag: String,
    pub affected_by_layover: bool,
    pub is_schedule_based: bool,
    pub is_delayed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
}

impl Prediction {
    /// Predicted time as a timestamp. The feed sends milliseconds since the
    /// Unix epoch.
    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.epoch_time.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn minutes_away(&self) -> Option<u32> {
        self.minutes.parse().ok()
    }
}

/// Free-text notice attached to a route's predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub priority: String,
    pub text: String,
}

/// Predictions for one route at one stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePredictions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_title: Option<String>,
    /// Keyed by direction title.
    pub directions: BTreeMap<String, Vec<Prediction>>,
    pub messages: Vec<Message>,
}

impl RoutePredictions {
    /// All predictions across directions, soonest first.
    pub fn soonest(&self) -> Vec<&Prediction> {
        let mut all: Vec<&Prediction> = self.directions.values().flatten().collect();
        all.sort_by_key(|p| p.seconds.parse::<i64>().unwrap_or(i64::MAX));
        all
    }
}
