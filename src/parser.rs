//! XML parser for NextBus public feed responses.
//!
//! Each function takes a raw response body and returns the translated model.
//! Nothing here touches the network.

use roxmltree::{Document, Node};
use std::collections::BTreeMap;

use crate::error::{FeedError, Result};
use crate::model::{
    AgencyInfo, Direction, Message, Prediction, RouteConfig, RoutePredictions, RouteTable, Stop,
};

/// Maps the feed's lowercase `"true"`/`"false"` to a `bool`.
pub fn parse_bool(attribute: &'static str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(FeedError::InvalidBoolean {
            attribute,
            value: other.to_string(),
        }),
    }
}

/// Translates an `agencyList` response into agency records keyed by tag.
///
/// # Errors
///
/// Fails on malformed XML, an upstream `<Error>` body, or an `<agency>`
/// missing `tag`, `title` or `regionTitle`.
pub fn parse_agency_list(xml: &str) -> Result<BTreeMap<String, AgencyInfo>> {
    let doc = Document::parse(xml)?;
    let body = checked_body(&doc)?;

    let mut agencies = BTreeMap::new();
    for agency in child_elements(body, "agency") {
        let info = AgencyInfo {
            title: required(agency, "title")?.to_string(),
            region_title: required(agency, "regionTitle")?.to_string(),
            short_title: optional(agency, "shortTitle"),
        };
        agencies.insert(required(agency, "tag")?.to_string(), info);
    }

    Ok(agencies)
}

/// Translates a `routeList` response into a route tag to title table.
pub fn parse_route_list(xml: &str) -> Result<RouteTable> {
    let doc = Document::parse(xml)?;
    let body = checked_body(&doc)?;

    child_elements(body, "route")
        .map(|route| {
            Ok((
                required(route, "tag")?.to_string(),
                required(route, "title")?.to_string(),
            ))
        })
        .collect()
}

/// Translates a terse `routeConfig` response for `route`.
///
/// A `<route>` element with no children is reported as
/// [`FeedError::EmptyRouteConfig`] rather than an empty configuration.
pub fn parse_route_config(route: &str, xml: &str) -> Result<RouteConfig> {
    let doc = Document::parse(xml)?;
    let body = checked_body(&doc)?;

    let route_node = child_elements(body, "route").next().ok_or_else(|| {
        FeedError::MalformedResponse("routeConfig response has no <route> element".to_string())
    })?;

    if !route_node
        .children()
        .any(|n| n.has_tag_name("stop") || n.has_tag_name("direction"))
    {
        return Err(FeedError::EmptyRouteConfig {
            route: route.to_string(),
        });
    }

    let mut config = RouteConfig::default();
    for child in route_node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "stop" => {
                let stop = Stop {
                    lat: required(child, "lat")?.to_string(),
                    lon: required(child, "lon")?.to_string(),
                    title: required(child, "title")?.to_string(),
                    stop_id: optional(child, "stopId"),
                    short_title: optional(child, "shortTitle"),
                };
                config
                    .stops
                    .insert(required(child, "tag")?.to_string(), stop);
            }
            "direction" => {
                let stops = child_elements(child, "stop")
                    .map(|s| required(s, "tag").map(str::to_string))
                    .collect::<Result<Vec<_>>>()?;
                let direction = Direction {
                    title: required(child, "title")?.to_string(),
                    name: optional(child, "name"),
                    stops,
                };
                config
                    .directions
                    .insert(required(child, "tag")?.to_string(), direction);
            }
            _ => {}
        }
    }

    Ok(config)
}

/// Translates a `predictions` response into per-route blocks keyed by
/// `routeTag`.
pub fn parse_predictions(xml: &str) -> Result<BTreeMap<String, RoutePredictions>> {
    let doc = Document::parse(xml)?;
    let body = checked_body(&doc)?;

    let mut by_route = BTreeMap::new();
    for block in child_elements(body, "predictions") {
        let mut route_preds = RoutePredictions {
            route_title: optional(block, "routeTitle"),
            stop_title: optional(block, "stopTitle"),
            ..Default::default()
        };

        for info in block.children().filter(|n| n.is_element()) {
            match info.tag_name().name() {
                "direction" => {
                    let title = required(info, "title")?.to_string();
                    let preds = child_elements(info, "prediction")
                        .map(parse_prediction)
                        .collect::<Result<Vec<_>>>()?;
                    route_preds
                        .directions
                        .entry(title)
                        .or_default()
                        .extend(preds);
                }
                "message" => route_preds.messages.push(Message {
                    priority: required(info, "priority")?.to_string(),
                    text: required(info, "text")?.to_string(),
                }),
                _ => {}
            }
        }

        by_route.insert(required(block, "routeTag")?.to_string(), route_preds);
    }

    Ok(by_route)
}

fn parse_prediction(node: Node) -> Result<Prediction> {
    Ok(Prediction {
        epoch_time: required(node, "epochTime")?.to_string(),
        seconds: required(node, "seconds")?.to_string(),
        minutes: required(node, "minutes")?.to_string(),
        is_departure: parse_bool("isDeparture", required(node, "isDeparture")?)?,
        dir_tag: required(node, "dirTag")?.to_string(),
        trip_tag: required(node, "tripTag")?.to_string(),
        affected_by_layover: optional_bool(node, "affectedByLayover")?,
        is_schedule_based: optional_bool(node, "isScheduleBased")?,
        is_delayed: optional_bool(node, "isDelayed")?,
        block: optional(node, "block"),
        vehicle: optional(node, "vehicle"),
    })
}

/// Returns the document's root element, or the upstream error it carries.
fn checked_body<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>> {
    let body = doc.root_element();
    if let Some(err) = child_elements(body, "Error").next() {
        return Err(FeedError::Upstream {
            message: err.text().unwrap_or_default().trim().to_string(),
            should_retry: err.attribute("shouldRetry") == Some("true"),
        });
    }
    Ok(body)
}

fn child_elements<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name(name))
}

fn required<'a>(node: Node<'a, '_>, attribute: &'static str) -> Result<&'a str> {
    node.attribute(attribute)
        .ok_or_else(|| FeedError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute,
        })
}

fn optional(node: Node, attribute: &str) -> Option<String> {
    node.attribute(attribute).map(str::to_string)
}

fn optional_bool(node: Node, attribute: &'static str) -> Result<bool> {
    node.attribute(attribute)
        .map_or(Ok(false), |v| parse_bool(attribute, v))
}
