//! End-to-end tests against an in-process WebSocket server.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use gremlin_client::{Client, ClientError, ClusterConfig, ConnectionConfig, Endpoint};
use gremlin_protocol::{Decoder, Operation, Processor, Request, StatusCode};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

type ServerWs = WebSocketStream<TcpStream>;

/// Accepts one connection and runs `script` against it.
async fn serve<F, Fut>(script: F) -> SocketAddr
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        script(ws).await;
    });
    addr
}

async fn recv_request(ws: &mut ServerWs) -> Request {
    loop {
        match ws.next().await {
            Some(Ok(Message::Binary(data))) => return Decoder::decode_request(&data).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("server expected a request, got {:?}", other),
        }
    }
}

async fn reply(ws: &mut ServerWs, frame: Value) {
    ws.send(Message::Text(frame.to_string())).await.unwrap();
}

fn frame(id: Uuid, code: u16, data: Value) -> Value {
    json!({
        "requestId": id.to_string(),
        "status": {"code": code, "message": "", "attributes": {}},
        "result": {"data": data, "meta": {}}
    })
}

fn status_only(id: Uuid, code: u16, message: &str) -> Value {
    json!({
        "requestId": id.to_string(),
        "status": {"code": code, "message": message, "attributes": {}}
    })
}

fn config(addr: SocketAddr) -> ConnectionConfig {
    let endpoint = Endpoint::parse(&format!("ws://{}/gremlin", addr)).unwrap();
    ConnectionConfig::new(endpoint).with_request_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_batched_result_is_reassembled() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        assert_eq!(req.op, Operation::Eval);
        assert_eq!(req.args.gremlin.as_deref(), Some("g.V().count()"));
        assert_eq!(req.args.language.as_deref(), Some("gremlin-groovy"));

        reply(&mut ws, frame(req.request_id, 206, json!([1, 2]))).await;
        reply(&mut ws, frame(req.request_id, 206, json!([3]))).await;
        reply(&mut ws, frame(req.request_id, 200, json!([4]))).await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let payload = client.submit("g.V().count()").await.unwrap();
    assert_eq!(&payload[..], b"[1,2,3,4]");
}

#[tokio::test]
async fn test_single_success_returned_verbatim() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(&mut ws, frame(req.request_id, 200, json!([{"id": 1, "label": "person"}]))).await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let payload = client.submit("g.V().limit(1)").await.unwrap();
    let value: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(value, json!([{"id": 1, "label": "person"}]));
}

#[tokio::test]
async fn test_submit_as_decodes() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(&mut ws, frame(req.request_id, 200, json!([5, 6]))).await;
        let req = recv_request(&mut ws).await;
        reply(&mut ws, status_only(req.request_id, 204, "")).await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let numbers: Vec<i64> = client.submit_as("g.V().values('age')").await.unwrap();
    assert_eq!(numbers, vec![5, 6]);

    let nothing: Option<Vec<i64>> = client.submit_as("g.V().drop()").await.unwrap();
    assert!(nothing.is_none());
}

#[tokio::test]
async fn test_no_content_is_empty_payload() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(&mut ws, status_only(req.request_id, 204, "")).await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let payload = client.submit("g.V().drop()").await.unwrap();
    assert!(payload.is_empty());
}

#[tokio::test]
async fn test_request_options_reach_server() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        assert_eq!(req.processor, Processor::Session);
        assert_eq!(req.args.session.as_deref(), Some("s-1"));
        assert_eq!(req.args.batch_size, Some(2));
        assert_eq!(
            req.args.bindings.as_ref().and_then(|b| b.get("x")),
            Some(&json!(1))
        );
        reply(&mut ws, frame(req.request_id, 200, json!([1]))).await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let request = Request::query("g.V(x)")
        .with_processor(Processor::Session)
        .with_session("s-1")
        .with_batch_size(2)
        .with_binding("x", 1);
    let payload = client.submit_request(request).await.unwrap();
    assert_eq!(&payload[..], b"[1]");
}

#[tokio::test]
async fn test_authentication_handshake() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(&mut ws, status_only(req.request_id, 407, "")).await;

        let auth = recv_request(&mut ws).await;
        assert_eq!(auth.request_id, req.request_id);
        assert_eq!(auth.op, Operation::Authentication);
        assert_eq!(auth.processor, Processor::Traversal);
        let sasl = STANDARD.decode(auth.args.sasl.unwrap()).unwrap();
        assert_eq!(sasl, b"\0stephen\0password");

        reply(&mut ws, frame(req.request_id, 200, json!(["marko"]))).await;
    })
    .await;

    let client = Client::open(config(addr).with_credentials("stephen", "password"))
        .await
        .unwrap();
    let payload = client.submit("g.V().values('name')").await.unwrap();
    assert_eq!(&payload[..], br#"["marko"]"#);
}

#[tokio::test]
async fn test_challenge_without_credentials() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(&mut ws, status_only(req.request_id, 407, "")).await;
        let _ = ws.next().await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let err = client.submit("g.V()").await.unwrap_err();
    assert!(matches!(err, ClientError::Config(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_second_challenge_fails() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(&mut ws, status_only(req.request_id, 407, "")).await;
        let _auth = recv_request(&mut ws).await;
        reply(&mut ws, status_only(req.request_id, 407, "")).await;
        let _ = ws.next().await;
    })
    .await;

    let client = Client::open(config(addr).with_credentials("u", "wrong"))
        .await
        .unwrap();
    let err = client.submit("g.V()").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::UnexpectedStatus {
            code: StatusCode::Authenticate,
            ..
        }
    ));
}

#[tokio::test]
async fn test_server_errors() {
    let addr = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(
            &mut ws,
            status_only(req.request_id, 597, "No such property: foo"),
        )
        .await;
        let req = recv_request(&mut ws).await;
        reply(&mut ws, status_only(req.request_id, 999, "")).await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();

    let err = client.submit("g.V().foo").await.unwrap_err();
    match err {
        ClientError::ServerError { code, detail, .. } => {
            assert_eq!(code, StatusCode::ScriptEvaluationError);
            assert_eq!(detail, "No such property: foo");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = client.submit("g.V()").await.unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::Unknown(999)));
    assert!(err.to_string().contains("an unknown error occurred"));
}

#[tokio::test]
async fn test_concurrent_requests_routed_by_id() {
    let addr = serve(|mut ws| async move {
        let first = recv_request(&mut ws).await;
        let second = recv_request(&mut ws).await;
        let answer = |req: &Request| json!([req.args.gremlin.clone().unwrap()]);
        reply(&mut ws, frame(second.request_id, 200, answer(&second))).await;
        reply(&mut ws, frame(first.request_id, 200, answer(&first))).await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let (a, b) = tokio::join!(client.submit("'a'"), client.submit("'b'"));
    assert_eq!(&a.unwrap()[..], br#"["'a'"]"#);
    assert_eq!(&b.unwrap()[..], br#"["'b'"]"#);
    assert_eq!(client.connection().pending_count(), 0);
}

#[tokio::test]
async fn test_malformed_frame_fails_request() {
    let addr = serve(|mut ws| async move {
        let _req = recv_request(&mut ws).await;
        ws.send(Message::Text("{not json".to_string())).await.unwrap();
        let _ = ws.next().await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let err = client.submit("g.V()").await.unwrap_err();
    assert!(matches!(err, ClientError::MalformedResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_server_close_fails_request() {
    let addr = serve(|mut ws| async move {
        let _req = recv_request(&mut ws).await;
        ws.close(None).await.unwrap();
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let err = client.submit("g.V()").await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed), "got {:?}", err);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_request_timeout() {
    let addr = serve(|mut ws| async move {
        let _req = recv_request(&mut ws).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    })
    .await;

    let client = Client::open(config(addr).with_request_timeout(Duration::from_millis(100)))
        .await
        .unwrap();
    let err = client.submit("g.V()").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout));
}

#[tokio::test]
async fn test_cancelled_submit_can_be_resubmitted() {
    let addr = serve(|mut ws| async move {
        let first = recv_request(&mut ws).await;
        let retry = recv_request(&mut ws).await;
        assert_eq!(retry.request_id, first.request_id);
        reply(&mut ws, frame(retry.request_id, 200, json!([1]))).await;
        let _ = ws.next().await;
    })
    .await;

    let client = Client::open(config(addr)).await.unwrap();
    let request = Request::query("g.V().count()");

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), client.submit_request(request.clone()))
            .await;
    assert!(cancelled.is_err());
    assert_eq!(client.connection().pending_count(), 0);

    let payload = client.submit_request(request).await.unwrap();
    assert_eq!(&payload[..], b"[1]");
    assert_eq!(client.connection().pending_count(), 0);
}

async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

#[tokio::test]
async fn test_cluster_fails_over_to_live_server() {
    let dead = closed_port().await;
    let live = serve(|mut ws| async move {
        let req = recv_request(&mut ws).await;
        reply(&mut ws, frame(req.request_id, 200, json!(["up"]))).await;
    })
    .await;

    let cluster = ClusterConfig::configure(&[
        format!("ws://{}/gremlin", dead),
        format!("ws://{}/gremlin", live),
    ])
    .unwrap();

    let client = Client::open_cluster(&cluster, ConnectionConfig::new).await.unwrap();
    assert_eq!(client.endpoint().port(), live.port());
    let payload = client.submit("'up'").await.unwrap();
    assert_eq!(&payload[..], br#"["up"]"#);
}

#[tokio::test]
async fn test_cluster_with_no_live_server() {
    let first = closed_port().await;
    let second = closed_port().await;
    let cluster = ClusterConfig::configure(&[
        format!("ws://{}", first),
        format!("ws://{}", second),
    ])
    .unwrap();

    let err = Client::open_cluster(&cluster, ConnectionConfig::new)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClientError::NoServerAvailable { attempted: 2 }));
}
