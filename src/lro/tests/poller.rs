// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! These tests drive pollers against a local HTTP server, using the default
//! `reqwest` transport. Each scenario verifies the exact number of requests
//! the poller sends.

extern crate lro_poller as lro;

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use httptest::cycle;
    use httptest::{Expectation, Server, matchers::*, responders::*};
    use lro::{FinalStateVia, OperationStatus, PollStrategyKind, Poller, PollerBuilder};
    use gax::client_config::ClientConfig;
    use gax::exponential_backoff::ExponentialBackoffBuilder;
    use gax::http_client::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
    use gax::retry_policy::{RetryPolicyExt, TransientErrors};
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const FREQUENCY: Duration = Duration::from_millis(5);

    #[derive(Debug, Deserialize, PartialEq)]
    struct Resource {
        name: String,
        size: u64,
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn location_header() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/resources/r1:export"))
                .respond_with(respond(202, &[("location", "/operations/1")], None)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/1"))
                .times(2)
                .respond_with(cycle![
                    respond(202, &[("location", "/operations/1")], None),
                    respond(200, &[], Some(json!({"name": "r1", "size": 42}))),
                ]),
        );

        let request = HttpRequest::new(Method::POST, server.url_str("/resources/r1:export"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<Resource> = PollerBuilder::new(transport)
            .with_operation("resources.export")
            .begin(&request, response)?;
        assert_eq!(poller.state().strategy(), PollStrategyKind::LocationHeader);

        let response = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.into_body(),
            Resource {
                name: "r1".into(),
                size: 42
            }
        );
        assert_eq!(poller.status(), OperationStatus::Succeeded);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_operation_failed() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("PUT", "/resources/r1"))
                .respond_with(respond(201, &[("azure-asyncoperation", "/operations/2")], None)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/2"))
                .times(2)
                .respond_with(cycle![
                    respond(200, &[], Some(json!({"status": "InProgress"}))),
                    respond(
                        200,
                        &[],
                        Some(json!({
                            "status": "Failed",
                            "error": {"code": "QuotaExceeded", "message": "uh-oh"}
                        }))
                    ),
                ]),
        );

        let request = HttpRequest::new(Method::PUT, server.url_str("/resources/r1"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<Resource> = PollerBuilder::new(transport)
            .with_operation("resources.create")
            .begin(&request, response)?;

        let error = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await
            .expect_err("the operation failed");
        assert!(error.is_server_failure(), "{error:?}");
        assert_eq!(error.operation_status(), Some("Failed"));
        assert_eq!(error.http_status_code(), Some(200));
        let payload = error.http_payload().expect("the status document is attached");
        let payload = serde_json::from_slice::<Value>(payload)?;
        assert_eq!(payload["error"]["code"], "QuotaExceeded");
        assert_eq!(poller.status(), OperationStatus::Failed);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn provisioning_state_done_at_start() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("PUT", "/resources/r1")).respond_with(
                respond(200, &[], Some(resource("r1", 7, "Succeeded"))),
            ),
        );

        let request = HttpRequest::new(Method::PUT, server.url_str("/resources/r1"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<Resource> = PollerBuilder::new(transport)
            .with_operation("resources.create")
            .begin(&request, response)?;
        assert_eq!(poller.state().strategy(), PollStrategyKind::ProvisioningState);
        assert!(poller.done());

        let resource = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?
            .into_body();
        assert_eq!(resource.size, 7);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn provisioning_state_polls_resource() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("PATCH", "/resources/r1")).respond_with(
                respond(200, &[], Some(resource("r1", 7, "Updating"))),
            ),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/resources/r1"))
                .times(2)
                .respond_with(cycle![
                    respond(200, &[], Some(resource("r1", 7, "Updating"))),
                    respond(200, &[], Some(resource("r1", 8, "Succeeded"))),
                ]),
        );

        let request = HttpRequest::new(Method::PATCH, server.url_str("/resources/r1"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<Resource> = PollerBuilder::new(transport)
            .with_operation("resources.update")
            .begin(&request, response)?;
        let resource = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?
            .into_body();
        assert_eq!(resource.size, 8);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_operation_final_get() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("PUT", "/resources/r3"))
                .respond_with(respond(201, &[("azure-asyncoperation", "/operations/3")], None)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/3"))
                .times(2)
                .respond_with(cycle![
                    respond(200, &[], Some(json!({"status": "InProgress"}))),
                    respond(200, &[], Some(json!({"status": "Succeeded"}))),
                ]),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/resources/r3"))
                .times(1)
                .respond_with(respond(200, &[], Some(json!({"name": "r3", "size": 3})))),
        );

        let request = HttpRequest::new(Method::PUT, server.url_str("/resources/r3"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<Resource> = PollerBuilder::new(transport)
            .with_operation("resources.create")
            .begin(&request, response)?;
        assert_eq!(
            poller.state().final_state_via(),
            Some(FinalStateVia::OriginalUri)
        );
        let resource = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?
            .into_body();
        assert_eq!(resource.name, "r3");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn resume() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/resources/r4:restart"))
                .respond_with(
                    status_code(202)
                        .insert_header("operation-location", "/operations/4")
                        .insert_header("location", "/results/4"),
                ),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/4"))
                .times(3)
                .respond_with(cycle![
                    respond(200, &[], Some(json!({"status": "Running"}))),
                    respond(200, &[], Some(json!({"status": "Running"}))),
                    respond(200, &[], Some(json!({"status": "Succeeded"}))),
                ]),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/results/4"))
                .times(1)
                .respond_with(respond(200, &[], Some(json!({"name": "r4", "size": 4})))),
        );

        let request = HttpRequest::new(Method::POST, server.url_str("/resources/r4:restart"));
        let (transport, request, response) = start(request).await?;
        let mut original: Poller<Resource> = PollerBuilder::new(transport.clone())
            .with_operation("resources.restart")
            .begin(&request, response)?;
        assert_eq!(original.poll_once().await?, OperationStatus::InProgress);
        let saved = original.resume_token()?.to_string();
        drop(original);

        let token = saved.parse::<lro::ResumeToken>()?;
        let error = PollerBuilder::new(transport.clone())
            .with_operation("resources.delete")
            .resume::<Resource>(&token)
            .expect_err("the token belongs to a different operation");
        assert!(error.is_token_mismatch(), "{error:?}");

        let mut resumed: Poller<Resource> = PollerBuilder::new(transport)
            .with_operation("resources.restart")
            .resume(&token)?;
        assert_eq!(resumed.status(), OperationStatus::NotStarted);
        let resource = resumed
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?
            .into_body();
        assert_eq!(resource.name, "r4");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn delete_location() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("DELETE", "/resources/r5"))
                .respond_with(respond(202, &[("location", "/operations/5")], None)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/5"))
                .times(2)
                .respond_with(cycle![respond(202, &[], None), respond(204, &[], None)]),
        );

        let request = HttpRequest::new(Method::DELETE, server.url_str("/resources/r5"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<()> = PollerBuilder::new(transport)
            .with_operation("resources.delete")
            .begin(&request, response)?;
        let response = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn final_state_via_async_operation() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        post_with_both_headers(&server, "/resources/r6:check", "/operations/6", "/results/6");
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/6"))
                .times(1)
                .respond_with(respond(
                    200,
                    &[],
                    Some(json!({"status": "Succeeded", "properties": {"available": true}})),
                )),
        );

        let request = HttpRequest::new(Method::POST, server.url_str("/resources/r6:check"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<Value> = PollerBuilder::new(transport)
            .with_operation("resources.check")
            .with_final_state_via(FinalStateVia::AzureAsyncOperation)
            .begin(&request, response)?;
        let body = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?
            .into_body();
        assert_eq!(body["properties"]["available"], true);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn final_state_via_location() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        post_with_both_headers(&server, "/resources/r7:check", "/operations/7", "/results/7");
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/7"))
                .times(1)
                .respond_with(respond(200, &[], Some(json!({"status": "Succeeded"})))),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/results/7"))
                .times(1)
                .respond_with(respond(200, &[], Some(json!({"available": false})))),
        );

        let request = HttpRequest::new(Method::POST, server.url_str("/resources/r7:check"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<Value> = PollerBuilder::new(transport)
            .with_operation("resources.check")
            .begin(&request, response)?;
        let body = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?
            .into_body();
        assert_eq!(body, json!({"available": false}));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn transient_poll_errors_are_retried() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("DELETE", "/resources/r8"))
                .respond_with(respond(202, &[("azure-asyncoperation", "/operations/8")], None)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/8"))
                .times(3)
                .respond_with(cycle![
                    respond(503, &[], None),
                    respond(429, &[], None),
                    respond(200, &[], Some(json!({"status": "Succeeded"}))),
                ]),
        );

        let request = HttpRequest::new(Method::DELETE, server.url_str("/resources/r8"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<()> = PollerBuilder::new(transport)
            .with_operation("resources.delete")
            .begin(&request, response)?;
        poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await?;
        assert_eq!(poller.status(), OperationStatus::Succeeded);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn poll_not_found() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("DELETE", "/resources/r9"))
                .respond_with(respond(202, &[("location", "/operations/9")], None)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/operations/9"))
                .times(1)
                .respond_with(status_code(404)),
        );

        let request = HttpRequest::new(Method::DELETE, server.url_str("/resources/r9"));
        let (transport, request, response) = start(request).await?;
        let mut poller: Poller<()> = PollerBuilder::new(transport)
            .with_operation("resources.delete")
            .begin(&request, response)?;
        let error = poller
            .until_done(FREQUENCY, &CancellationToken::new())
            .await
            .expect_err("the tracking endpoint is gone");
        assert!(error.is_transport(), "{error:?}");
        assert_eq!(error.http_status_code(), Some(404));
        assert_eq!(poller.status(), OperationStatus::Failed);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unrecognized_shape() -> anyhow::Result<()> {
        enable_tracing();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/resources/r10:run"))
                .respond_with(status_code(202)),
        );

        let request = HttpRequest::new(Method::POST, server.url_str("/resources/r10:run"));
        let (transport, request, response) = start(request).await?;
        let error = PollerBuilder::new(transport)
            .begin::<Value>(&request, response)
            .expect_err("no polling convention applies");
        assert!(error.is_unrecognized_shape(), "{error:?}");
        Ok(())
    }

    fn post_with_both_headers(
        server: &Server,
        path: &'static str,
        operation: &'static str,
        location: &'static str,
    ) {
        server.expect(
            Expectation::matching(request::method_path("POST", path)).respond_with(
                status_code(202)
                    .insert_header("azure-asyncoperation", operation)
                    .insert_header("location", location),
            ),
        );
    }

    fn resource(name: &str, size: u64, provisioning_state: &str) -> Value {
        json!({"name": name, "size": size, "properties": {"provisioningState": provisioning_state}})
    }

    fn respond(
        status: u16,
        headers: &'static [(&'static str, &'static str)],
        body: Option<Value>,
    ) -> impl Responder {
        let mut responder = status_code(status);
        for (name, value) in headers {
            responder = responder.insert_header(*name, *value);
        }
        match body {
            None => responder.body(String::new()),
            Some(body) => responder
                .insert_header("content-type", "application/json")
                .body(body.to_string()),
        }
    }

    async fn start(
        request: HttpRequest,
    ) -> anyhow::Result<(Arc<dyn Transport>, HttpRequest, HttpResponse)> {
        let config = ClientConfig::new()
            .set_retry_policy(TransientErrors.with_attempt_limit(3))
            .set_backoff_policy(
                ExponentialBackoffBuilder::new()
                    .with_initial_delay(Duration::from_millis(1))
                    .with_maximum_delay(Duration::from_millis(1))
                    .clamp(),
            );
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config)?);
        let response = transport.send(request.clone()).await?;
        Ok((transport, request, response))
    }

    fn enable_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }
}
