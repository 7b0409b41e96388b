use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use users_shared::{
    response::{api_response, error_response},
    store::UserStore,
    types::ErrorBody,
    users, AppState,
};

/// Main Lambda handler - routes requests to the user operations
pub(crate) async fn function_handler<S: UserStore>(
    event: Request,
    state: Arc<AppState<S>>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("Users Lambda invoked - Method: {} Path: {}", method, path);

    let store = &state.store;
    let table_name = state.table_name.as_str();

    match method {
        &Method::GET => match lookup_email(&event) {
            Some(email) => match users::get(store, table_name, &email).await {
                Ok(user) => api_response(StatusCode::OK, &user),
                Err(e) => error_response(&e),
            },
            None => match users::list(store, table_name).await {
                Ok(all) => api_response(StatusCode::OK, &all),
                Err(e) => error_response(&e),
            },
        },
        &Method::POST => match users::create(store, table_name, body).await {
            Ok(user) => api_response(StatusCode::OK, &user),
            Err(e) => error_response(&e),
        },
        &Method::PUT => match users::update(store, table_name, body).await {
            Ok(user) => api_response(StatusCode::OK, &user),
            Err(e) => error_response(&e),
        },
        &Method::DELETE => {
            // A missing parameter goes through as the empty key
            let email = query_email(&event).unwrap_or_default();
            match users::delete(store, table_name, &email).await {
                Ok(()) => api_response(StatusCode::OK, &()),
                Err(e) => error_response(&e),
            }
        }
        _ => api_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorBody {
                error: "method not allowed".to_string(),
            },
        ),
    }
}

/// Email from the `?email=` query parameter.
fn query_email(event: &Request) -> Option<String> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first("email"))
        .filter(|email| !email.is_empty())
        .map(|email| email.to_string())
}

/// Email for a single-user lookup: the query parameter, then the `{email}`
/// path parameter, then a percent-decoded `/users/{email}` segment.
fn lookup_email(event: &Request) -> Option<String> {
    query_email(event)
        .or_else(|| {
            event
                .path_parameters_ref()
                .and_then(|params| params.first("email"))
                .filter(|email| !email.is_empty())
                .map(|email| email.to_string())
        })
        .or_else(|| {
            let parts: Vec<&str> = event
                .uri()
                .path()
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            match parts.as_slice() {
                [.., "users", email] => percent_decode_str(email)
                    .decode_utf8()
                    .ok()
                    .map(|email| email.into_owned()),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use users_shared::config::Config;
    use users_shared::store::{Item, StoreError};

    /// In-memory table keyed by email.
    #[derive(Default)]
    struct MemoryStore {
        items: Mutex<HashMap<String, Item>>,
        fail: bool,
    }

    impl MemoryStore {
        fn check(&self, operation: &'static str) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Backend {
                    operation,
                    message: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn put(&self, _table_name: &str, item: Item) -> Result<(), StoreError> {
            self.check("PutItem")?;
            let email = item
                .get("email")
                .and_then(|v| v.as_s().ok())
                .cloned()
                .unwrap_or_default();
            self.items.lock().unwrap().insert(email, item);
            Ok(())
        }

        async fn get(&self, _table_name: &str, email: &str) -> Result<Option<Item>, StoreError> {
            self.check("GetItem")?;
            Ok(self.items.lock().unwrap().get(email).cloned())
        }

        async fn scan(&self, _table_name: &str) -> Result<Vec<Item>, StoreError> {
            self.check("Scan")?;
            Ok(self.items.lock().unwrap().values().cloned().collect())
        }

        async fn delete(&self, _table_name: &str, email: &str) -> Result<(), StoreError> {
            self.check("DeleteItem")?;
            self.items.lock().unwrap().remove(email);
            Ok(())
        }
    }

    fn state(store: MemoryStore) -> Arc<AppState<MemoryStore>> {
        let config = Config {
            table_name: "users-test".to_string(),
        };
        AppState::new(store, &config)
    }

    fn request(method: Method, path: &str, body: &str) -> Request {
        let mut request = Request::new(Body::from(body));
        *request.method_mut() = method;
        *request.uri_mut() = path.parse().unwrap();
        request
    }

    fn with_email(request: Request, email: &str) -> Request {
        let mut query_string_parameters: HashMap<String, String> = HashMap::new();
        query_string_parameters.insert("email".into(), email.into());
        request.with_query_string_parameters(query_string_parameters)
    }

    fn json_body(response: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(&response.body().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let state = state(MemoryStore::default());

        let create = request(
            Method::POST,
            "/users",
            r#"{"email":"a@b.com","firstName":"A","lastName":"B"}"#,
        );
        let response = function_handler(create, Arc::clone(&state)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["Content-Type"], "application/json");
        assert_eq!(json_body(&response)["firstName"], "A");

        let get = with_email(request(Method::GET, "/users", ""), "a@b.com");
        let response = function_handler(get, Arc::clone(&state)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            json_body(&response),
            serde_json::json!({"email": "a@b.com", "firstName": "A", "lastName": "B"})
        );

        let by_path = request(Method::GET, "/users/a@b.com", "");
        let response = function_handler(by_path, state).await.unwrap();
        assert_eq!(json_body(&response)["lastName"], "B");
    }

    #[tokio::test]
    async fn test_get_by_encoded_path_segment() {
        let state = state(MemoryStore::default());
        let create = request(Method::POST, "/users", r#"{"email":"a@b.com","firstName":"A"}"#);
        function_handler(create, Arc::clone(&state)).await.unwrap();

        let encoded = request(Method::GET, "/users/a%40b.com", "");
        let response = function_handler(encoded, Arc::clone(&state)).await.unwrap();
        assert_eq!(json_body(&response)["email"], "a@b.com");

        let mut path_parameters: HashMap<String, String> = HashMap::new();
        path_parameters.insert("email".into(), "a@b.com".into());
        let routed = request(Method::GET, "/users", "").with_path_parameters(path_parameters);
        let response = function_handler(routed, state).await.unwrap();
        assert_eq!(json_body(&response)["firstName"], "A");
    }

    #[tokio::test]
    async fn test_delete_ignores_path_segment() {
        let state = state(MemoryStore::default());
        let create = request(Method::POST, "/users", r#"{"email":"a@b.com"}"#);
        function_handler(create, Arc::clone(&state)).await.unwrap();

        let delete = request(Method::DELETE, "/users/a@b.com", "");
        function_handler(delete, Arc::clone(&state)).await.unwrap();

        let list = function_handler(request(Method::GET, "/users", ""), state)
            .await
            .unwrap();
        assert_eq!(json_body(&list).as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_invalid_email_is_400() {
        let state = state(MemoryStore::default());

        let create = request(Method::POST, "/users", r#"{"email":"not-an-email"}"#);
        let response = function_handler(create, state).await.unwrap();

        assert_eq!(response.status(), 400);
        assert!(json_body(&response)["error"]
            .as_str()
            .unwrap()
            .starts_with("bad request"));
    }

    #[tokio::test]
    async fn test_get_missing_user_returns_empty_record() {
        let state = state(MemoryStore::default());

        let get = with_email(request(Method::GET, "/users", ""), "ghost@b.com");
        let response = function_handler(get, state).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(
            json_body(&response),
            serde_json::json!({"email": "", "firstName": "", "lastName": ""})
        );
    }

    #[tokio::test]
    async fn test_list_empty_table() {
        let state = state(MemoryStore::default());

        let response = function_handler(request(Method::GET, "/users", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(json_body(&response), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_update_only_accepts_new_users() {
        let state = state(MemoryStore::default());
        let body = r#"{"email":"new@b.com","firstName":"N"}"#;

        let first = function_handler(request(Method::PUT, "/users", body), Arc::clone(&state))
            .await
            .unwrap();
        assert_eq!(first.status(), 200);

        let second = function_handler(request(Method::PUT, "/users", body), Arc::clone(&state))
            .await
            .unwrap();
        assert_eq!(second.status(), 400);

        let list = function_handler(request(Method::GET, "/users", ""), state)
            .await
            .unwrap();
        assert_eq!(json_body(&list).as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_twice_succeeds() {
        let state = state(MemoryStore::default());
        let create = request(Method::POST, "/users", r#"{"email":"a@b.com"}"#);
        function_handler(create, Arc::clone(&state)).await.unwrap();

        for _ in 0..2 {
            let delete = with_email(request(Method::DELETE, "/users", ""), "a@b.com");
            let response = function_handler(delete, Arc::clone(&state)).await.unwrap();
            assert_eq!(response.status(), 200);
            assert_eq!(response.body().to_vec(), b"null".to_vec());
        }

        let list = function_handler(request(Method::GET, "/users", ""), state)
            .await
            .unwrap();
        assert_eq!(json_body(&list), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let state = state(MemoryStore {
            fail: true,
            ..Default::default()
        });

        let response = function_handler(request(Method::GET, "/users", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(
            json_body(&response),
            serde_json::json!({"error": "internal db error"})
        );
    }

    #[tokio::test]
    async fn test_unhandled_method() {
        let state = state(MemoryStore::default());

        let response = function_handler(request(Method::PATCH, "/users", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), 405);
        assert_eq!(
            json_body(&response),
            serde_json::json!({"error": "method not allowed"})
        );
    }
}
