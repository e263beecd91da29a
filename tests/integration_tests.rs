//! Integration tests for the seekchat library.
//!
//! Most tests run the DeepSeek client against a throwaway HTTP server on localhost.  The live
//! test requires an API key in the environment to run.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use seekchat::chat::{
        ChatConfig, ERROR_MESSAGE_PREFIX, SessionState, StreamOutcome, StreamingSessionController,
    };
    use seekchat::{
        ChatCompletionChunk, ChatCompletionRequest, ClientLogger, DeepSeek, Error, Message,
        MessageRole, Usage,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one HTTP response and returns the raw request it received.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: String,
    ) -> (String, JoinHandle<String>) {
        serve_with_headers(status, content_type, &[], body).await
    }

    async fn serve_with_headers(
        status: &'static str,
        content_type: &'static str,
        extra_headers: &'static [(&'static str, &'static str)],
        body: String,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let extra: String = extra_headers
                .iter()
                .map(|(name, value)| format!("{name}: {value}\r\n"))
                .collect();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\n{extra}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (base_url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8(data).unwrap()
    }

    fn sse(events: &[&str]) -> String {
        events
            .iter()
            .map(|event| format!("data: {event}\n\n"))
            .collect()
    }

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<String>>,
    }

    impl ClientLogger for RecordingLogger {
        fn log_request(&self, request: &ChatCompletionRequest) {
            let line = format!("request:{}", request.messages.len());
            self.lines.lock().unwrap().push(line);
        }

        fn log_chunk(&self, chunk: &ChatCompletionChunk) {
            let line = format!("chunk:{}", chunk.delta_text().unwrap_or(""));
            self.lines.lock().unwrap().push(line);
        }

        fn log_error(&self, error: &Error) {
            self.lines.lock().unwrap().push(format!("error:{error}"));
        }
    }

    #[tokio::test]
    async fn session_streams_reply_from_http_endpoint() {
        let body = sse(&[
            r#"{"id":"c1","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
            r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
            r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
            r#"{"id":"c1","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#,
            "[DONE]",
        ]);
        let (base_url, server) = serve_once("200 OK", "text/event-stream", body).await;

        let logger = Arc::new(RecordingLogger::default());
        let client = DeepSeek::with_options(Some("test-key".to_string()), Some(base_url), None)
            .unwrap()
            .with_logger(logger.clone());
        let mut session = StreamingSessionController::new(client, ChatConfig::new());

        let outcome = session.send_user_message("Hi").await;
        assert!(matches!(outcome, StreamOutcome::Committed));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            session.conversation().last(),
            Some(&Message::assistant("Hello"))
        );
        assert_eq!(session.usage(), Some(Usage::new(5, 2)));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat/completions HTTP/1.1"));
        let lowered = request.to_lowercase();
        assert!(lowered.contains("authorization: bearer test-key"));
        assert!(request.contains(r#""stream":true"#));
        assert!(request.contains(r#""include_usage":true"#));
        assert!(request.contains(r#""model":"deepseek-chat""#));
        assert!(request.contains(r#""content":"Hi""#));

        let lines = logger.lines.lock().unwrap().clone();
        assert_eq!(lines[0], "request:2");
        assert_eq!(
            lines[1..],
            ["chunk:", "chunk:Hel", "chunk:lo", "chunk:"].map(String::from)
        );
    }

    #[tokio::test]
    async fn unauthorized_response_becomes_error_message() {
        let body = r#"{"error":{"message":"Authentication Fails","type":"authentication_error"}}"#;
        let (base_url, server) =
            serve_once("401 Unauthorized", "application/json", body.to_string()).await;

        let client =
            DeepSeek::with_options(Some("wrong".to_string()), Some(base_url), None).unwrap();
        let mut session = StreamingSessionController::new(client, ChatConfig::new());

        let outcome = session.send_user_message("Hi").await;
        let StreamOutcome::Failed(err) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(err.is_authentication());

        let last = session.conversation().last().unwrap();
        assert_eq!(last.role(), MessageRole::Assistant);
        assert!(last.content().starts_with(ERROR_MESSAGE_PREFIX));
        assert!(last.content().contains("Authentication Fails"));
        assert_eq!(session.conversation().len(), 3);
        server.await.unwrap();
    }

    type Header = (&'static str, &'static str);
    type StatusCase = (
        &'static str,
        &'static [Header],
        &'static str,
        &'static str,
        fn(&Error) -> bool,
    );

    #[tokio::test]
    async fn error_statuses_map_to_error_variants() {
        let cases: [StatusCase; 6] = [
            (
                "400 Bad Request",
                &[],
                r#"{"error":{"message":"bad value","param":"temperature"}}"#,
                "Bad request: bad value (parameter: temperature)",
                |e| matches!(e, Error::BadRequest { .. }),
            ),
            (
                "402 Payment Required",
                &[],
                r#"{"error":{"message":"Insufficient Balance","type":"unknown_error"}}"#,
                "Insufficient balance: Insufficient Balance",
                |e| matches!(e, Error::InsufficientBalance { .. }),
            ),
            (
                "429 Too Many Requests",
                &[("Retry-After", "7")],
                r#"{"error":{"message":"slow down","type":"rate_limit_error"}}"#,
                "Rate limit exceeded: slow down (retry after 7s)",
                |e| matches!(e, Error::RateLimit { .. }) && e.is_rate_limit(),
            ),
            (
                "503 Service Unavailable",
                &[],
                r#"{"error":{"message":"Server overloaded","type":"server_error"}}"#,
                "Service unavailable: Server overloaded",
                |e| matches!(e, Error::ServiceUnavailable { .. }) && e.is_server_error(),
            ),
            (
                "418 I'm a teapot",
                &[],
                r#"{"error":{"message":"short and stout","type":"teapot"}}"#,
                "teapot: short and stout",
                |e| matches!(e, Error::Api { .. }) && e.status_code() == Some(418),
            ),
            (
                "500 Internal Server Error",
                &[],
                "upstream exploded",
                "Internal server error: upstream exploded",
                |e| matches!(e, Error::InternalServer { .. }),
            ),
        ];

        for (status, headers, body, display, expected) in cases {
            let content_type = if body.starts_with('{') {
                "application/json"
            } else {
                "text/plain"
            };
            let (base_url, server) =
                serve_with_headers(status, content_type, headers, body.to_string()).await;
            let client =
                DeepSeek::with_options(Some("key".to_string()), Some(base_url), None).unwrap();
            let mut session = StreamingSessionController::new(client, ChatConfig::new());

            let outcome = session.send_user_message("Hi").await;
            let StreamOutcome::Failed(err) = outcome else {
                panic!("{status}: expected failure, got {outcome:?}");
            };
            assert!(expected(&err), "{status}: unexpected error {err:?}");
            assert_eq!(err.to_string(), display);
            assert_eq!(
                session.conversation().last().unwrap().content(),
                format!("{ERROR_MESSAGE_PREFIX}{display}")
            );
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn error_event_mid_stream_discards_partial_reply() {
        let body = sse(&[
            r#"{"choices":[{"index":0,"delta":{"content":"partial"}}]}"#,
            r#"{"error":{"message":"overloaded","type":"server_error"}}"#,
        ]);
        let (base_url, server) = serve_once("200 OK", "text/event-stream", body).await;

        let client = DeepSeek::with_options(Some("key".to_string()), Some(base_url), None).unwrap();
        let mut session = StreamingSessionController::new(client, ChatConfig::new());

        let outcome = session.send_user_message("Hi").await;
        assert!(matches!(outcome, StreamOutcome::Failed(_)));
        let last = session.conversation().last().unwrap();
        assert!(last.content().contains("overloaded"));
        assert!(!last.content().contains("partial"));
        assert!(!session.is_active());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_error_message() {
        // Bind then drop so the port is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let client = DeepSeek::with_options(Some("key".to_string()), Some(base_url), None).unwrap();
        let mut session = StreamingSessionController::new(client, ChatConfig::new());

        let outcome = session.send_user_message("Hi").await;
        assert!(matches!(outcome, StreamOutcome::Failed(_)));
        assert!(
            session
                .conversation()
                .last()
                .unwrap()
                .content()
                .starts_with(ERROR_MESSAGE_PREFIX)
        );
    }

    #[tokio::test]
    async fn test_streaming_response() {
        // This test requires DEEPSEEK_API_KEY to be set
        let api_key = std::env::var("DEEPSEEK_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: DEEPSEEK_API_KEY not set");
            return;
        }

        let client = DeepSeek::new(api_key).expect("Failed to create client");
        let config = ChatConfig::new().with_max_tokens(10);
        let mut session = StreamingSessionController::new(client, config);

        let outcome = session.send_user_message("Say 'test passed'").await;
        assert!(
            matches!(outcome, StreamOutcome::Committed),
            "Stream should commit a reply with a valid API key: {outcome:?}"
        );
        assert!(session.usage().is_some());
    }
}
