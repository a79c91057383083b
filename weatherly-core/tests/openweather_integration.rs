//! Integration tests for the OpenWeather provider and the query pipeline
//! against a mock HTTP server.

use std::time::Duration;

use weatherly_core::{
    FavoriteCity, LocationReference, OpenWeatherProvider, QueryContext, SuggestionTracker,
    WeatherError, WeatherProvider, fetch_favorite, fetch_weather,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "TEST_KEY";

fn provider(server: &MockServer) -> OpenWeatherProvider {
    provider_with_timeout(server, Duration::from_secs(5))
}

fn provider_with_timeout(server: &MockServer, timeout: Duration) -> OpenWeatherProvider {
    OpenWeatherProvider::with_endpoints(
        API_KEY.to_string(),
        &format!("{}/data/2.5", server.uri()),
        &format!("{}/geo/1.0", server.uri()),
        timeout,
    )
    .unwrap()
}

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": -0.1278, "lat": 51.5074 },
        "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }],
        "base": "stations",
        "main": {
            "temp": 11.6, "feels_like": 10.9, "temp_min": 10.2, "temp_max": 12.8,
            "pressure": 1008, "humidity": 81
        },
        "visibility": 9000,
        "wind": { "speed": 5.14, "deg": 230, "gust": 9.26 },
        "clouds": { "all": 75 },
        "dt": 1_704_110_400,
        "sys": { "country": "GB", "sunrise": 1_704_096_360, "sunset": 1_704_124_920 },
        "timezone": 0,
        "id": 2643743,
        "name": "London",
        "cod": 200
    })
}

fn forecast_entry(dt: i64, icon: &str) -> serde_json::Value {
    serde_json::json!({
        "dt": dt,
        "main": {
            "temp": 9.0, "feels_like": 7.5, "temp_min": 8.0, "temp_max": 10.0,
            "pressure": 1011, "humidity": 77
        },
        "weather": [{ "id": 803, "main": "Clouds", "description": "broken clouds", "icon": icon }],
        "wind": { "speed": 3.2, "deg": 210 },
        "dt_txt": "ignored"
    })
}

fn forecast_body() -> serde_json::Value {
    // 2024-01-01T00:00:00Z onwards, every 3 hours for 5 days.
    let start = 1_704_067_200_i64;
    let list: Vec<_> = (0..40)
        .map(|i| forecast_entry(start + i * 3 * 3600, "04d"))
        .collect();
    serde_json::json!({
        "cod": "200",
        "cnt": 40,
        "list": list,
        "city": { "id": 2643743, "name": "London", "country": "GB", "timezone": 0 }
    })
}

#[tokio::test]
async fn query_by_name_returns_combined_report() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", "London"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let report = fetch_weather(&provider, QueryContext::from_input("London").unwrap())
        .await
        .unwrap();

    assert_eq!(report.label(), "London, GB");
    assert_eq!(report.current.city_id, Some(2643743));
    assert_eq!(report.current.icon, "10d");
    assert_eq!(report.current.description, "light rain");
    assert_eq!(report.current.humidity_pct, 81);
    assert_eq!(report.current.pressure_hpa, 1008);
    assert_eq!(report.current.visibility_m, Some(9000));
    assert_eq!(report.current.wind.deg, 230);
    assert_eq!(report.current.wind.gust, Some(9.26));
    assert_eq!(report.current.clouds_pct, 75);
    assert_eq!(report.current.sunrise.timestamp(), 1_704_096_360);

    assert_eq!(report.forecast.entries.len(), 40);
    assert_eq!(report.forecast.daily().len(), 5);
}

#[tokio::test]
async fn missing_location_is_not_found_and_skips_forecast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = fetch_weather(&provider, QueryContext::from_input("London").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::LocationNotFound(ref loc) if loc == "London"));
    assert_eq!(err.to_string(), "City not found: London");
}

#[tokio::test]
async fn forecast_server_error_discards_current_conditions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5074"))
        .and(query_param("lon", "-0.1278"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("lat", "51.5074"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let context = QueryContext::new(LocationReference::coordinates(51.5074, -0.1278).unwrap());
    let err = fetch_weather(&provider, context).await.unwrap_err();

    match err {
        WeatherError::ForecastUnavailable(msg) => assert!(msg.contains("500")),
        other => panic!("expected ForecastUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn coordinate_query_backfills_identifier() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let context = QueryContext::new(LocationReference::coordinates(51.5074, -0.1278).unwrap());
    let report = fetch_weather(&provider, context).await.unwrap();

    assert_eq!(
        report.context.location,
        LocationReference::coordinates(51.5074, -0.1278)
            .unwrap()
            .with_identifier(Some(2643743))
    );
}

#[tokio::test]
async fn other_current_failures_are_network_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = provider
        .fetch_current(&LocationReference::Name("London".into()))
        .await
        .unwrap_err();

    match err {
        WeatherError::NetworkFailure(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("invalid api key"));
        }
        other => panic!("expected NetworkFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_current_body_is_a_network_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"unexpected\":true}"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .fetch_current(&LocationReference::Name("London".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::NetworkFailure(_)));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let provider = provider_with_timeout(&server, Duration::from_millis(200));
    let err = provider
        .fetch_current(&LocationReference::Name("London".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Timeout(_)));
}

#[tokio::test]
async fn favorite_falls_back_to_name_when_identifier_lookup_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("id", "999"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", "London"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&server)
        .await;

    let favorite = FavoriteCity::named("London").with_id(Some(999));
    let report = fetch_favorite(&provider(&server), &favorite).await.unwrap();

    assert_eq!(report.current.name, "London");
}

#[tokio::test]
async fn suggestions_come_from_geocoding_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Portl"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "Portland", "lat": 45.5152, "lon": -122.6784, "country": "US", "state": "Oregon" },
            { "name": "Portland", "lat": 43.6615, "lon": -70.2553, "country": "US", "state": "Maine" },
            { "name": "Portlaoise", "lat": 53.0344, "lon": -7.2998, "country": "IE" }
        ])))
        .mount(&server)
        .await;

    let tracker = SuggestionTracker::new();
    let suggestions = tracker
        .suggest(&provider(&server), "Portl", 10)
        .await
        .expect("request is current");

    let labels: Vec<String> = suggestions.iter().map(|s| s.label()).collect();
    assert_eq!(
        labels,
        vec!["Portland, Oregon, US", "Portland, Maine, US", "Portlaoise, IE"]
    );
}

#[tokio::test]
async fn geocoding_failure_degrades_to_no_suggestions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tracker = SuggestionTracker::new();
    let suggestions = tracker.suggest(&provider(&server), "Lon", 10).await;
    assert_eq!(suggestions, Some(Vec::new()));
}
