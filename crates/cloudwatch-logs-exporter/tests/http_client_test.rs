// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use cloudwatch_logs_exporter::api::LogsApi;
use cloudwatch_logs_exporter::client::HttpLogsClient;
use cloudwatch_logs_exporter::error::{ApiError, ExportError};
use cloudwatch_logs_exporter::http::get_client;
use cloudwatch_logs_exporter::sigv4::Credentials;
use cloudwatch_logs_exporter::{Level, LogExporter, LogRecord, LogTarget};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const AUTHORIZATION: &str = r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/eu-west-1/logs/aws4_request, SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature=[0-9a-f]{64}$";

fn client(server: &ServerGuard) -> HttpLogsClient {
    let http = get_client(Duration::from_secs(5), None).expect("failed to build client");
    HttpLogsClient::new(
        http,
        &server.url(),
        "eu-west-1",
        Credentials::new("AKIDEXAMPLE", "secret"),
    )
    .expect("failed to create client")
}

fn target(operation: &str) -> String {
    format!("Logs_20140328.{operation}")
}

#[tokio::test]
async fn test_export_provisions_and_appends_over_http() {
    let mut server = Server::new_async().await;

    let describe_groups = server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogGroups").as_str())
        .match_header("content-type", "application/x-amz-json-1.1")
        .match_header("authorization", Matcher::Regex(AUTHORIZATION.to_string()))
        .match_body(Matcher::PartialJson(json!({ "logGroupNamePrefix": "app" })))
        .with_status(200)
        .with_body(r#"{"logGroups":[{"logGroupName":"application"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let create_group = server
        .mock("POST", "/")
        .match_header("x-amz-target", target("CreateLogGroup").as_str())
        .match_body(Matcher::Json(json!({ "logGroupName": "app" })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let describe_streams = server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogStreams").as_str())
        .with_status(200)
        .with_body(r#"{"logStreams":[]}"#)
        .expect(1)
        .create_async()
        .await;
    let create_stream = server
        .mock("POST", "/")
        .match_header("x-amz-target", target("CreateLogStream").as_str())
        .match_body(Matcher::Json(
            json!({ "logGroupName": "app", "logStreamName": "web-1" }),
        ))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("POST", "/")
        .match_header("x-amz-target", target("PutLogEvents").as_str())
        .match_header("authorization", Matcher::Regex(AUTHORIZATION.to_string()))
        .match_body(Matcher::Json(json!({
            "logEvents": [
                { "timestamp": 50_000, "message": "[info][application] a" },
                { "timestamp": 100_000, "message": "[info][application] b" }
            ],
            "logGroupName": "app",
            "logStreamName": "web-1"
        })))
        .with_status(200)
        .with_body(r#"{"nextSequenceToken":"49590302"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut exporter = LogExporter::new(
        Arc::new(client(&server)),
        "app".to_string(),
        "web-1".to_string(),
        None,
    );
    let outcome = exporter
        .export(&[
            LogRecord::new("b", Level::Info, "application", 100.0),
            LogRecord::new("a", Level::Info, "application", 50.0),
        ])
        .await
        .expect("export failed");

    assert_eq!(outcome.delivered, 2);
    assert_eq!(exporter.last_sequence_token(), Some("49590302"));
    describe_groups.assert_async().await;
    create_group.assert_async().await;
    describe_streams.assert_async().await;
    create_stream.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn test_existing_stream_token_is_sent() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogGroups").as_str())
        .with_status(200)
        .with_body(r#"{"logGroups":[{"logGroupName":"app"}]}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogStreams").as_str())
        .with_status(200)
        .with_body(
            r#"{"logStreams":[{"logStreamName":"web-1","uploadSequenceToken":"T1"},{"logStreamName":"web-10","uploadSequenceToken":"X"}]}"#,
        )
        .create_async()
        .await;
    let put = server
        .mock("POST", "/")
        .match_header("x-amz-target", target("PutLogEvents").as_str())
        .match_body(Matcher::PartialJson(json!({ "sequenceToken": "T1" })))
        .with_status(200)
        .with_body(r#"{"nextSequenceToken":"T2"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut exporter = LogExporter::new(
        Arc::new(client(&server)),
        "app".to_string(),
        "web-1".to_string(),
        None,
    );
    exporter
        .export(&[LogRecord::new("hello", Level::Info, "application", 1.0)])
        .await
        .expect("export failed");

    put.assert_async().await;
}

#[tokio::test]
async fn test_describe_streams_follows_pagination() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogStreams").as_str())
        .match_body(Matcher::Json(
            json!({ "logGroupName": "app", "logStreamNamePrefix": "web" }),
        ))
        .with_status(200)
        .with_body(r#"{"logStreams":[{"logStreamName":"web-1"}],"nextToken":"page-2"}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogStreams").as_str())
        .match_body(Matcher::PartialJson(json!({ "nextToken": "page-2" })))
        .with_status(200)
        .with_body(r#"{"logStreams":[{"logStreamName":"web-2","uploadSequenceToken":"T9"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let streams = client(&server)
        .describe_log_streams("app", "web")
        .await
        .expect("describe failed");

    let names: Vec<&str> = streams.iter().map(|s| s.log_stream_name.as_str()).collect();
    assert_eq!(names, vec!["web-1", "web-2"]);
    assert_eq!(streams[1].upload_sequence_token.as_deref(), Some("T9"));
}

#[tokio::test]
async fn test_error_responses_are_mapped() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("CreateLogGroup").as_str())
        .with_status(400)
        .with_body(
            r#"{"__type":"com.amazonaws.logs#ResourceAlreadyExistsException","message":"The specified log group already exists"}"#,
        )
        .create_async()
        .await;
    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("CreateLogStream").as_str())
        .with_status(503)
        .create_async()
        .await;

    let client = client(&server);

    assert!(matches!(
        client.create_log_group("app").await,
        Err(ApiError::ResourceAlreadyExists(_))
    ));
    assert!(matches!(
        client.create_log_stream("app", "web-1").await,
        Err(ApiError::Transport(_))
    ));
}

#[tokio::test]
async fn test_denied_append_is_rejected() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogGroups").as_str())
        .with_status(200)
        .with_body(r#"{"logGroups":[{"logGroupName":"app"}]}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/")
        .match_header("x-amz-target", target("DescribeLogStreams").as_str())
        .with_status(200)
        .with_body(r#"{"logStreams":[{"logStreamName":"web-1"}]}"#)
        .create_async()
        .await;
    let put = server
        .mock("POST", "/")
        .match_header("x-amz-target", target("PutLogEvents").as_str())
        .with_status(400)
        .with_body(r#"{"__type":"AccessDeniedException","Message":"not authorized"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut exporter = LogExporter::new(
        Arc::new(client(&server)),
        "app".to_string(),
        "web-1".to_string(),
        None,
    );
    let result = exporter
        .export(&[LogRecord::new("hello", Level::Info, "application", 1.0)])
        .await;

    assert!(matches!(result, Err(ExportError::Rejected(_))));
    put.assert_async().await;
}
