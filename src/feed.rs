//! Client for the NextBus public XML feed.
//!
//! [`FeedClient`] owns the endpoint and transport. Agency-scoped calls go
//! through an [`Agency`], which fetches its route table once on construction
//! and checks route ids against it before touching the network.

use reqwest::Url;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::fetch::{BasicClient, HttpClient, fetch_xml};
use crate::model::{AgencyInfo, RouteConfig, RoutePredictions, RouteTable};
use crate::parser;

pub struct FeedClient<C = BasicClient> {
    http: C,
    base_url: Url,
}

impl FeedClient<BasicClient> {
    /// Builds a client backed by `reqwest` using `config`'s endpoint and
    /// timeouts.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let http = BasicClient::new(config)?;
        Self::with_client(http, &config.base_url)
    }
}

impl<C: HttpClient> FeedClient<C> {
    pub fn with_client(http: C, base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|_| FeedError::InvalidUrl(base_url.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying transport.
    pub fn http(&self) -> &C {
        &self.http
    }

    /// Lists every agency the feed knows about, keyed by agency tag.
    #[tracing::instrument(skip(self))]
    pub async fn list_agencies(&self) -> Result<BTreeMap<String, AgencyInfo>> {
        let xml = self.get("agencyList", &[], &[]).await?;
        let agencies = parser::parse_agency_list(&xml)?;
        debug!(count = agencies.len(), "Agencies parsed");
        Ok(agencies)
    }

    /// Fetches the route table for `agency`. Prefer [`FeedClient::agency`],
    /// which keeps the table for later route checks.
    #[tracing::instrument(skip(self))]
    pub async fn list_routes(&self, agency: &str) -> Result<RouteTable> {
        if agency.is_empty() {
            return Err(FeedError::EmptyAgencyId);
        }
        let xml = self.get("routeList", &[("a", agency)], &[]).await?;
        let routes = parser::parse_route_list(&xml)?;
        debug!(count = routes.len(), "Routes parsed");
        Ok(routes)
    }

    /// Builds an [`Agency`], fetching its route table immediately.
    pub async fn agency(&self, id: &str) -> Result<Agency<'_, C>> {
        let routes = self.list_routes(id).await?;
        Ok(Agency {
            client: self,
            id: id.to_string(),
            routes,
        })
    }

    async fn get(&self, command: &str, params: &[(&str, &str)], flags: &[&str]) -> Result<String> {
        let url = self.command_url(command, params, flags);
        fetch_xml(&self.http, url).await
    }

    fn command_url(&self, command: &str, params: &[(&str, &str)], flags: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("command", command);
            for (key, value) in params {
                query.append_pair(key, value);
            }
            for flag in flags {
                query.append_key_only(flag);
            }
        }
        url
    }
}

/// A transit agency with its route table cached for the object's lifetime.
///
/// There is no refresh; build a new `Agency` to pick up route changes.
pub struct Agency<'c, C = BasicClient> {
    client: &'c FeedClient<C>,
    id: String,
    routes: RouteTable,
}

impl<'c, C: HttpClient> Agency<'c, C> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Fetches the terse configuration of `route`.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidRoute`] without any request if `route` is not in
    /// the route table; [`FeedError::EmptyRouteConfig`] if the feed returns a
    /// route with no stops or directions.
    #[tracing::instrument(skip(self), fields(agency = %self.id))]
    pub async fn route_config(&self, route: &str) -> Result<RouteConfig> {
        self.check_route(route)?;
        let xml = self
            .client
            .get("routeConfig", &[("a", self.id.as_str()), ("r", route)], &["terse"])
            .await?;
        let config = parser::parse_route_config(route, &xml)?;
        debug!(
            stops = config.stops.len(),
            directions = config.directions.len(),
            "Route config parsed"
        );
        Ok(config)
    }

    /// Live predictions at `stop` for every route serving it, keyed by route
    /// tag.
    #[tracing::instrument(skip(self), fields(agency = %self.id))]
    pub async fn predictions(&self, stop: &str) -> Result<BTreeMap<String, RoutePredictions>> {
        let xml = self
            .client
            .get("predictions", &[("a", self.id.as_str()), ("stopId", stop)], &[])
            .await?;
        parser::parse_predictions(&xml)
    }

    /// Live predictions at `stop` for `route` only.
    #[tracing::instrument(skip(self), fields(agency = %self.id))]
    pub async fn predictions_for_route(&self, stop: &str, route: &str) -> Result<RoutePredictions> {
        self.check_route(route)?;
        let xml = self
            .client
            .get(
                "predictions",
                &[("a", self.id.as_str()), ("stopId", stop), ("routeTag", route)],
                &[],
            )
            .await?;
        parser::parse_predictions(&xml)?
            .remove(route)
            .ok_or_else(|| FeedError::UnknownRouteInResponse {
                route: route.to_string(),
            })
    }

    fn check_route(&self, route: &str) -> Result<()> {
        if self.routes.contains_key(route) {
            Ok(())
        } else {
            Err(FeedError::InvalidRoute {
                agency: self.id.clone(),
                route: route.to_string(),
            })
        }
    }
}
