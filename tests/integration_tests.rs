use async_trait::async_trait;
use nextbus_feed::fetch::HttpClient;
use nextbus_feed::{FeedClient, FeedError};
use std::collections::HashMap;
use std::sync::Mutex;

const BASE_URL: &str = "http://feed.test/service/publicXMLFeed";

/// Serves canned bodies keyed by the `command` query parameter and records
/// every URL it was asked for.
#[derive(Default)]
struct MockFeed {
    bodies: HashMap<&'static str, &'static str>,
    status: Option<u16>,
    fail: bool,
    requests: Mutex<Vec<reqwest::Url>>,
}

impl MockFeed {
    fn with(mut self, command: &'static str, body: &'static str) -> Self {
        self.bodies.insert(command, body);
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_query(&self) -> HashMap<String, String> {
        let requests = self.requests.lock().unwrap();
        requests
            .last()
            .expect("at least one request")
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

#[async_trait]
impl HttpClient for MockFeed {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let url = req.url().clone();
        let command = url
            .query_pairs()
            .find(|(k, _)| k == "command")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(url);

        if self.fail {
            // reqwest errors have no public constructor; a bad URL yields one.
            return Err(reqwest::Client::new().get("not a url").build().unwrap_err());
        }

        let (status, body) = match (self.status, self.bodies.get(command.as_str())) {
            (Some(status), _) => (status, "Service Unavailable"),
            (None, Some(body)) => (200, *body),
            (None, None) => (404, "unknown command"),
        };
        let resp = http::Response::builder()
            .status(status)
            .body(body.to_string())
            .unwrap();
        Ok(resp.into())
    }
}

fn feed(mock: MockFeed) -> FeedClient<MockFeed> {
    FeedClient::with_client(mock, BASE_URL).expect("valid base url")
}

fn muni() -> MockFeed {
    MockFeed::default().with("routeList", include_str!("fixtures/route_list.xml"))
}

#[tokio::test]
async fn test_list_agencies() {
    let client = feed(MockFeed::default().with(
        "agencyList",
        include_str!("fixtures/agency_list.xml"),
    ));

    let agencies = client.list_agencies().await.unwrap();

    assert_eq!(agencies.len(), 3);
    assert_eq!(agencies["sf-muni"].title, "San Francisco Muni");
    assert_eq!(agencies["sf-muni"].region_title, "California-Northern");
    assert_eq!(agencies["sf-muni"].short_title.as_deref(), Some("SF Muni"));
    assert_eq!(agencies["ttc"].region_title, "Ontario");
    assert!(!agencies.contains_key("shortTitle"));
}

#[tokio::test]
async fn test_agency_fetches_route_table_eagerly() {
    let client = feed(muni());

    let agency = client.agency("sf-muni").await.unwrap();

    let tags: Vec<_> = agency.routes().keys().map(String::as_str).collect();
    assert_eq!(tags, vec!["7", "F", "N"]);
    assert_eq!(agency.routes()["F"], "F-Market & Wharves");
    assert_eq!(agency.id(), "sf-muni");

    let query = client_query(&client);
    assert_eq!(query["command"], "routeList");
    assert_eq!(query["a"], "sf-muni");
}

#[tokio::test]
async fn test_route_config_unknown_route_makes_no_request() {
    let client = feed(muni());
    let agency = client.agency("sf-muni").await.unwrap();
    let before = client_requests(&client);

    let result = agency.route_config("does-not-exist").await;

    assert!(matches!(result, Err(FeedError::InvalidRoute { .. })));
    assert_eq!(client_requests(&client), before);
}

#[tokio::test]
async fn test_route_config() {
    let client = feed(muni().with("routeConfig", include_str!("fixtures/route_config.xml")));
    let agency = client.agency("sf-muni").await.unwrap();

    let config = agency.route_config("N").await.unwrap();

    let query = client_query(&client);
    assert_eq!(query["command"], "routeConfig");
    assert_eq!(query["r"], "N");
    assert!(query.contains_key("terse"));

    assert_eq!(config.stops.len(), 3);
    assert_eq!(config.stops["5205"].title, "Judah St & 9th Ave");
    assert_eq!(config.stops["5205"].stop_id.as_deref(), Some("15205"));
    assert_eq!(config.stops["4447"].stop_id, None);
    assert_eq!(config.stops["4447"].short_title.as_deref(), Some("Ocean Bch"));

    let outbound = &config.directions["N____O_F00"];
    assert_eq!(outbound.title, "Outbound to Ocean Beach");
    assert_eq!(outbound.name.as_deref(), Some("Outbound"));
    assert_eq!(outbound.stops, vec!["5205", "5240", "4447"]);
    assert_eq!(
        config.directions["N____I_F00"].stops,
        vec!["4447", "5240", "5205"]
    );
    assert!(config.paths.is_empty());
}

#[tokio::test]
async fn test_route_config_empty_route_is_an_error() {
    let client = feed(muni().with(
        "routeConfig",
        include_str!("fixtures/route_config_empty.xml"),
    ));
    let agency = client.agency("sf-muni").await.unwrap();

    let result = agency.route_config("N").await;

    assert!(matches!(result, Err(FeedError::EmptyRouteConfig { route }) if route == "N"));
}

#[tokio::test]
async fn test_predictions_for_all_routes() {
    let client = feed(muni().with("predictions", include_str!("fixtures/predictions.xml")));
    let agency = client.agency("sf-muni").await.unwrap();

    let by_route = agency.predictions("15205").await.unwrap();

    let query = client_query(&client);
    assert_eq!(query["stopId"], "15205");
    assert!(!query.contains_key("routeTag"));

    assert_eq!(by_route.len(), 2);
    let n = &by_route["N"];
    assert_eq!(n.route_title.as_deref(), Some("N-Judah"));
    let outbound = &n.directions["Outbound to Ocean Beach"];
    assert_eq!(outbound.len(), 2);
    assert!(!outbound[0].is_departure);
    assert!(!outbound[0].affected_by_layover);
    assert!(outbound[1].affected_by_layover);
    assert_eq!(n.messages.len(), 1);
    assert_eq!(n.messages[0].text, "Elevator outage at Church Station");

    let seven = &by_route["7"].directions["Inbound to Downtown"][0];
    assert!(seven.is_departure);
    assert!(seven.is_schedule_based);
    assert!(!seven.is_delayed);
    assert!(by_route["7"].messages.is_empty());
}

#[tokio::test]
async fn test_predictions_for_route_returns_single_block() {
    let client = feed(muni().with("predictions", include_str!("fixtures/predictions.xml")));
    let agency = client.agency("sf-muni").await.unwrap();

    let n = agency.predictions_for_route("15205", "N").await.unwrap();

    assert_eq!(client_query(&client)["routeTag"], "N");
    assert_eq!(n.directions["Outbound to Ocean Beach"][0].trip_tag, "11599428");
    assert_eq!(n.soonest()[0].seconds, "120");
}

#[tokio::test]
async fn test_predictions_for_route_missing_from_response() {
    let client = feed(muni().with("predictions", include_str!("fixtures/predictions.xml")));
    let agency = client.agency("sf-muni").await.unwrap();

    let result = agency.predictions_for_route("15205", "F").await;

    assert!(matches!(
        result,
        Err(FeedError::UnknownRouteInResponse { route }) if route == "F"
    ));
}

#[tokio::test]
async fn test_upstream_error_body() {
    let client = feed(MockFeed::default().with("routeList", include_str!("fixtures/error.xml")));

    match client.agency("nope").await {
        Err(FeedError::Upstream {
            message,
            should_retry,
        }) => {
            assert!(message.contains("a=nope"));
            assert!(!should_retry);
        }
        Err(other) => panic!("expected upstream error, got {other:?}"),
        Ok(_) => panic!("expected upstream error"),
    }
}

#[tokio::test]
async fn test_http_status_error() {
    let client = feed(MockFeed {
        status: Some(503),
        ..Default::default()
    });

    let result = client.list_agencies().await;

    assert!(matches!(
        result,
        Err(FeedError::HttpStatus { status, .. }) if status.as_u16() == 503
    ));
}

#[tokio::test]
async fn test_transport_error() {
    let client = feed(MockFeed {
        fail: true,
        ..Default::default()
    });

    let result = client.list_agencies().await;

    assert!(matches!(result, Err(FeedError::Transport(_))));
    assert_eq!(client_requests(&client), 1);
}

#[tokio::test]
async fn test_agency_shared_across_tasks() {
    let client = feed(muni().with("predictions", include_str!("fixtures/predictions.xml")));
    let agency = client.agency("sf-muni").await.unwrap();

    let (a, b) = tokio::join!(
        agency.predictions_for_route("15205", "N"),
        agency.predictions_for_route("15205", "7"),
    );

    assert_eq!(a.unwrap().route_title.as_deref(), Some("N-Judah"));
    assert_eq!(b.unwrap().route_title.as_deref(), Some("7-Haight-Noriega"));
}

fn client_query(client: &FeedClient<MockFeed>) -> HashMap<String, String> {
    client.http().last_query()
}

fn client_requests(client: &FeedClient<MockFeed>) -> usize {
    client.http().request_count()
}
