use super::*;
use crate::models::CategoryId;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn create_test_backend(server: &Server) -> XtreamBackend {
    let api = XtreamApi::with_retry_policy(
        Credentials::new(server.url(), "user", "secret"),
        Duration::from_secs(5),
        RetryPolicy::new(2, 1, 5),
    )
    .unwrap();
    XtreamBackend::with_api(api)
}

fn account_query(action: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("username".into(), "user".into()),
        Matcher::UrlEncoded("password".into(), "secret".into()),
        Matcher::UrlEncoded("action".into(), action.into()),
    ])
}

fn account_response() -> serde_json::Value {
    json!({
        "user_info": {
            "username": "user",
            "auth": 1,
            "status": "Active",
            "exp_date": "1893456000",
            "max_connections": "1",
            "active_cons": 0,
            "allowed_output_formats": ["m3u8", "ts"]
        },
        "server_info": {
            "url": "tv.example.com",
            "port": "80",
            "https_port": "443",
            "server_protocol": "http",
            "rtmp_port": "25462",
            "timezone": "UTC",
            "timestamp_now": 1700000000,
            "time_now": "2023-11-14 22:13:20"
        }
    })
}

#[tokio::test]
async fn test_category_listing() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let _m = server
        .mock("GET", "/player_api.php")
        .match_query(account_query("get_vod_categories"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"category_id": "1", "category_name": "Action", "parent_id": 0},
                {"category_id": 2, "category_name": "Drama", "parent_id": 0}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let categories = backend.get_categories(ContentKind::Movie).await.unwrap();

    assert_eq!(categories.len(), 2);
    assert_eq!(categories[1].id.as_str(), "2");
    assert_eq!(categories[1].name, "Drama");
    assert!(categories.iter().all(|c| c.kind == ContentKind::Movie));
}

#[tokio::test]
async fn test_items_by_category_are_paged_client_side() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let streams: Vec<serde_json::Value> = (1..=5)
        .map(|i| json!({"stream_id": i, "name": format!("Channel {}", i)}))
        .collect();

    let _m = server
        .mock("GET", "/player_api.php")
        .match_query(Matcher::AllOf(vec![
            account_query("get_live_streams"),
            Matcher::UrlEncoded("category_id".into(), "9".into()),
        ]))
        .with_status(200)
        .with_body(serde_json::Value::Array(streams).to_string())
        .create_async()
        .await;

    let query = ItemQuery::in_category(CategoryId::new("9")).with_page(2, 2);
    let items = backend.get_items(ContentKind::Channel, &query).await.unwrap();

    let ids: Vec<&str> = items.iter().map(|i| i.id().as_str()).collect();
    assert_eq!(ids, vec!["3", "4"]);
    assert!(items.iter().all(|i| i.category_id().as_str() == "9"));
}

#[tokio::test]
async fn test_series_info_details() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let _m = server
        .mock("GET", "/player_api.php")
        .match_query(Matcher::AllOf(vec![
            account_query("get_series_info"),
            Matcher::UrlEncoded("series_id".into(), "42".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "info": {"name": "Show", "cover": "cover.jpg", "plot": "Plot"},
                "episodes": {
                    "1": [
                        {"id": "1001", "episode_num": 2, "title": "Second", "container_extension": "mkv"},
                        {"id": "1000", "episode_num": 1, "title": "First", "container_extension": "mkv"}
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let details = backend
        .get_item_details(ContentKind::Show, &ContentId::new("42"))
        .await
        .unwrap();

    let ItemDetails::Show(details) = details else {
        panic!("expected show details");
    };
    assert_eq!(details.show.name, "Show");
    assert_eq!(details.plot.as_deref(), Some("Plot"));
    assert_eq!(details.seasons[&1][0].title, "First");
}

#[tokio::test]
async fn test_channel_details_are_unsupported() {
    let server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let err = backend
        .get_item_details(ContentKind::Channel, &ContentId::new("1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CatalogError>(),
        Some(CatalogError::Unsupported(_))
    ));
}

#[tokio::test]
async fn test_account_info() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let _m = server
        .mock("GET", "/player_api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "user".into()),
            Matcher::UrlEncoded("password".into(), "secret".into()),
        ]))
        .with_status(200)
        .with_body(account_response().to_string())
        .expect(3)
        .create_async()
        .await;

    let user = backend.get_user_profile().await.unwrap();
    assert_eq!(user.username, "user");
    assert!(user.is_active);

    let server_info = backend.get_server_info().await.unwrap();
    assert_eq!(server_info.timezone, "UTC");

    assert!(backend.test_connection().await.unwrap());
}

#[tokio::test]
async fn test_connection_false_on_rejected_account() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let _m = server
        .mock("GET", "/player_api.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"user_info": {"auth": 0}}).to_string())
        .create_async()
        .await;

    assert!(!backend.test_connection().await.unwrap());
    let err = backend.get_user_profile().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CatalogError>(),
        Some(CatalogError::InvalidCredentials(_))
    ));
}

#[tokio::test]
async fn test_connection_false_on_unreachable_server() {
    let api = XtreamApi::with_retry_policy(
        Credentials::new("http://127.0.0.1:1", "user", "secret"),
        Duration::from_secs(2),
        RetryPolicy::new(0, 1, 1),
    )
    .unwrap();
    let backend = XtreamBackend::with_api(api);

    assert!(!backend.test_connection().await.unwrap());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let m = server
        .mock("GET", "/player_api.php")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .expect(3)
        .create_async()
        .await;

    let result = backend.get_categories(ContentKind::Channel).await;

    assert!(result.is_err());
    m.assert_async().await;
}

#[tokio::test]
async fn test_auth_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let m = server
        .mock("GET", "/player_api.php")
        .match_query(Matcher::Any)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    assert!(backend.get_categories(ContentKind::Channel).await.is_err());
    m.assert_async().await;
}

#[tokio::test]
async fn test_non_json_body_fails() {
    let mut server = Server::new_async().await;
    let backend = create_test_backend(&server);

    let _m = server
        .mock("GET", "/player_api.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>Not here</html>")
        .create_async()
        .await;

    let err = backend
        .get_items(ContentKind::Movie, &ItemQuery::all())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse response"));
}
