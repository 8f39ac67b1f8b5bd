//! N8nClient 集成测试：本地 axum 服务模拟 n8n API

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use n8n_bee::adapters::{N8nClient, WorkflowRegistry};
    use n8n_bee::core::BotError;

    type Hits = Arc<Mutex<Vec<String>>>;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str, key: Option<&str>) -> N8nClient {
        N8nClient::new(base, key.map(str::to_string), 5, 5)
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_list_sends_bearer_and_accepts_wrapped_payload() {
        let router = Router::new().route(
            "/workflows",
            get(|headers: HeaderMap| async move {
                if bearer(&headers).as_deref() != Some("Bearer secret") {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"message": "unauthorized"})));
                }
                (
                    StatusCode::OK,
                    Json(json!({"data": [{"id": "1", "name": "A"}, {"id": 2}], "nextCursor": null})),
                )
            }),
        );
        let base = serve(router).await;

        let workflows = client(&base, Some("secret")).list().await.unwrap();
        let ids: Vec<String> = workflows.iter().filter_map(|w| w.id()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(workflows[1].display_name(), "workflow_2");

        let err = client(&base, None).list().await.unwrap_err();
        assert!(matches!(err, BotError::ExternalCallFailed(_)));
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let router = Router::new().route("/workflows", get(|| async { Json(json!([])) }));
        let base = serve(router).await;

        assert!(client(&base, None).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_is_an_error() {
        let router = Router::new().route(
            "/workflows",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(router).await;

        let err = client(&base, None).list().await.unwrap_err();
        assert!(matches!(err, BotError::ExternalCallFailed(_)));
    }

    #[tokio::test]
    async fn test_run_probes_endpoints_in_order() {
        let hits: Hits = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/workflows/:id/execute",
                post(|State(hits): State<Hits>, Path(id): Path<String>| async move {
                    hits.lock().unwrap().push(format!("execute:{id}"));
                    StatusCode::NOT_FOUND
                }),
            )
            .route(
                "/workflows/:id/run",
                post(|State(hits): State<Hits>, Path(id): Path<String>| async move {
                    hits.lock().unwrap().push(format!("run:{id}"));
                    (StatusCode::ACCEPTED, Json(json!({"executionId": "e-1"})))
                }),
            )
            .route(
                "/workflows/:id/executions",
                post(|State(hits): State<Hits>, Path(id): Path<String>| async move {
                    hits.lock().unwrap().push(format!("executions:{id}"));
                    StatusCode::OK
                }),
            )
            .with_state(hits.clone());
        let base = serve(router).await;

        let response = client(&base, None).run("42").await.unwrap();
        assert_eq!(response, json!({"executionId": "e-1"}));
        assert_eq!(
            hits.lock().unwrap().clone(),
            vec!["execute:42".to_string(), "run:42".to_string()]
        );
    }

    #[tokio::test]
    async fn test_run_fails_after_each_endpoint_tried_once() {
        let hits: Hits = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/workflows/:id/:endpoint",
                post(
                    |State(hits): State<Hits>, Path((_, endpoint)): Path<(String, String)>| async move {
                        hits.lock().unwrap().push(endpoint);
                        StatusCode::METHOD_NOT_ALLOWED
                    },
                ),
            )
            .with_state(hits.clone());
        let base = serve(router).await;

        let err = client(&base, None).run("42").await.unwrap_err();
        assert!(matches!(err, BotError::ExternalCallFailed(_)));
        assert_eq!(
            hits.lock().unwrap().clone(),
            vec!["execute".to_string(), "run".to_string(), "executions".to_string()]
        );
    }

    #[tokio::test]
    async fn test_get_unwraps_data_and_maps_404() {
        let router = Router::new().route(
            "/workflows/:id",
            get(|Path(id): Path<String>| async move {
                if id == "7" {
                    (StatusCode::OK, Json(json!({"data": {"id": "7", "name": "Sync"}})))
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({"message": "not found"})))
                }
            }),
        );
        let base = serve(router).await;
        let n8n = client(&base, None);

        let workflow = n8n.get("7").await.unwrap();
        assert_eq!(workflow.raw(), &json!({"id": "7", "name": "Sync"}));
        assert!(n8n.get("8").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_activate_delete_and_import() {
        let hits: Hits = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/workflows/:id/activate",
                post(|State(hits): State<Hits>, Path(id): Path<String>| async move {
                    hits.lock().unwrap().push(format!("activate:{id}"));
                    Json(json!({"id": id, "active": true}))
                }),
            )
            .route(
                "/workflows/:id",
                axum::routing::delete(|State(hits): State<Hits>, Path(id): Path<String>| async move {
                    hits.lock().unwrap().push(format!("delete:{id}"));
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/workflows/import",
                post(|State(hits): State<Hits>, Json(body): Json<Value>| async move {
                    hits.lock().unwrap().push(format!("import:{}", body["name"]));
                    StatusCode::CREATED
                }),
            )
            .with_state(hits.clone());
        let base = serve(router).await;
        let n8n = client(&base, Some("k"));

        n8n.activate("3").await.unwrap();
        n8n.delete("3").await.unwrap();
        n8n.import(br#"{"name":"Imported"}"#.to_vec()).await.unwrap();
        assert!(n8n.deactivate("3").await.is_err());

        assert_eq!(
            hits.lock().unwrap().clone(),
            vec![
                "activate:3".to_string(),
                "delete:3".to_string(),
                "import:\"Imported\"".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_unsafe_ids_never_reach_the_server() {
        let hits: Hits = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .fallback(|State(hits): State<Hits>| async move {
                hits.lock().unwrap().push("request".to_string());
                StatusCode::OK
            })
            .with_state(hits.clone());
        let base = serve(router).await;
        let n8n = client(&base, None);

        assert!(matches!(
            n8n.delete("../credentials").await,
            Err(BotError::UnsupportedInput(_))
        ));
        assert!(n8n.run("1?x=y").await.is_err());
        assert!(hits.lock().unwrap().is_empty());
    }
}
