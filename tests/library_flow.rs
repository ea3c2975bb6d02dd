use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use shelf_app::bootstrap::build_registry;
use shelf_db::{BookSummary, InMemoryLibraryRepository};
use shelf_kernel::settings::Settings;

const SECRET: &str = "integration-secret";

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = Some(SECRET.to_string());
    settings
}

fn app(repository: Arc<InMemoryLibraryRepository>) -> Router {
    let settings = settings();
    let registry = build_registry(&settings, repository);
    shelf_http::build_router(&registry, &settings)
}

fn token_for(user_id: Uuid) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        + 3600;
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({"sub": user_id.to_string(), "aud": "authenticated", "exp": exp}),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    call_raw(app, method, uri, user, body.map(|body| body.to_string())).await
}

async fn call_raw(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body)),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn add_progress_finish_then_list() {
    let repository = Arc::new(InMemoryLibraryRepository::new());
    let book = Uuid::new_v4();
    repository
        .insert_book(BookSummary {
            id: book,
            title: "The Left Hand of Darkness".to_string(),
            author: Some("Ursula K. Le Guin".to_string()),
            cover_image_url: None,
        })
        .await;
    let app = app(repository);
    let user = Uuid::new_v4();
    let entry_uri = format!("/api/my-books/{book}");

    let (status, created) = call(
        &app,
        Method::POST,
        "/api/my-books",
        Some(user),
        Some(json!({"book_id": book})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "to_read");
    assert_eq!(created["user_id"], json!(user));

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &entry_uri,
        Some(user),
        Some(json!({"progress": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["progress_percentage"], 40);
    assert_eq!(updated["status"], "to_read");

    let (status, finished) = call(
        &app,
        Method::PATCH,
        &entry_uri,
        Some(user),
        Some(json!({"status": "finished"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["progress_percentage"], 100);
    assert!(finished["finished_reading_at"].is_string());

    let (status, library) = call(&app, Method::GET, "/api/my-books", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(library["finished"].as_array().unwrap().len(), 1);
    assert_eq!(library["finished"][0]["id"], json!(book));
    assert_eq!(library["finished"][0]["title"], "The Left Hand of Darkness");
    for shelf in ["to_read", "reading", "abandoned"] {
        assert_eq!(library[shelf], json!([]), "shelf {shelf}");
    }
}

#[tokio::test]
async fn adding_a_book_missing_from_the_catalog_is_not_found() {
    let repository = Arc::new(InMemoryLibraryRepository::new());
    repository
        .insert_book(BookSummary {
            id: Uuid::new_v4(),
            title: "Kindred".to_string(),
            author: Some("Octavia E. Butler".to_string()),
            cover_image_url: None,
        })
        .await;
    let app = app(repository);
    let user = Uuid::new_v4();

    let (status, error) = call(
        &app,
        Method::POST,
        "/api/my-books",
        Some(user),
        Some(json!({"book_id": Uuid::new_v4()})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["code"], "book_not_found");

    let (_, library) = call(&app, Method::GET, "/api/my-books", Some(user), None).await;
    assert_eq!(library["to_read"], json!([]));
}

#[tokio::test]
async fn second_add_is_conflict() {
    let app = app(Arc::new(InMemoryLibraryRepository::new()));
    let user = Uuid::new_v4();
    let body = json!({"book_id": Uuid::new_v4()});

    let (status, _) = call(&app, Method::POST, "/api/my-books", Some(user), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = call(&app, Method::POST, "/api/my-books", Some(user), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "already_exists");
}

#[tokio::test]
async fn unauthenticated_update_never_reaches_repository() {
    let repository = Arc::new(InMemoryLibraryRepository::new());
    let app = app(repository.clone());

    let (status, error) = call(
        &app,
        Method::PATCH,
        &format!("/api/my-books/{}", Uuid::new_v4()),
        None,
        Some(json!({"progress": 10})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"]["code"], "unauthorized");
    assert_eq!(repository.operation_count(), 0);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_storage() {
    let repository = Arc::new(InMemoryLibraryRepository::new());
    let app = app(repository.clone());
    let user = Uuid::new_v4();
    let entry_uri = format!("/api/my-books/{}", Uuid::new_v4());

    let cases = [
        (Method::POST, "/api/my-books".to_string(), json!({"book_id": "book-1"})),
        (Method::PATCH, entry_uri.clone(), json!({})),
        (Method::PATCH, entry_uri.clone(), json!({"status": "paused"})),
        (Method::PATCH, entry_uri.clone(), json!({"progress": 101})),
        (Method::PATCH, entry_uri, json!({"status": "reading", "progress": -3})),
        (
            Method::PATCH,
            "/api/my-books/not-a-uuid".to_string(),
            json!({"progress": 5}),
        ),
    ];

    for (method, uri, body) in cases {
        let (status, error) = call(&app, method, &uri, Some(user), Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body {body}");
        assert_eq!(error["error"]["code"], "validation_error");
    }
    assert_eq!(repository.operation_count(), 0);
}

#[tokio::test]
async fn mistyped_progress_and_status_are_validation_errors() {
    let repository = Arc::new(InMemoryLibraryRepository::new());
    let app = app(repository.clone());
    let user = Uuid::new_v4();
    let entry_uri = format!("/api/my-books/{}", Uuid::new_v4());

    let cases = [
        (r#"{"progress":100000000000000000000}"#, "progress"),
        (r#"{"progress":40.5}"#, "progress"),
        (r#"{"progress":"40"}"#, "progress"),
        (r#"{"status":5}"#, "status"),
        (r#"{"status":"finished","progress":-0.5}"#, "progress"),
    ];

    for (body, field) in cases {
        let (status, error) =
            call_raw(&app, Method::PATCH, &entry_uri, Some(user), Some(body.to_string())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body {body}");
        assert_eq!(error["error"]["code"], "validation_error");
        assert_eq!(error["error"]["details"][0]["field"], field, "body {body}");
    }

    let (status, error) = call_raw(
        &app,
        Method::PATCH,
        &entry_uri,
        Some(user),
        Some("{not json".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "invalid_body");
    assert_eq!(repository.operation_count(), 0);
}

#[tokio::test]
async fn updating_a_book_outside_the_library_is_not_found() {
    let repository = Arc::new(InMemoryLibraryRepository::new());
    let app = app(repository);
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let book = Uuid::new_v4();

    call(&app, Method::POST, "/api/my-books", Some(owner), Some(json!({"book_id": book}))).await;

    let (status, error) = call(
        &app,
        Method::PATCH,
        &format!("/api/my-books/{book}"),
        Some(stranger),
        Some(json!({"status": "reading"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["code"], "not_found");
}

#[tokio::test]
async fn me_reports_caller_identity() {
    let app = app(Arc::new(InMemoryLibraryRepository::new()));
    let user = Uuid::new_v4();

    let (status, me) = call(&app, Method::GET, "/api/users/me", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user_id"], json!(user));

    let (status, _) = call(&app, Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authorization_header_is_bad_request() {
    let app = app(Arc::new(InMemoryLibraryRepository::new()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/my-books")
                .header(header::AUTHORIZATION, "Token abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
