//! End-to-end behaviour of the trace middleware over the public API.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqlog::{
    Logger, LoggerConfig, MemorySink, Record, RequestCounter, RequestMeta, Response, Severity,
    StatusCode, Trace, Value,
};

fn traced(config: LoggerConfig) -> (Trace, MemorySink) {
    let sink = MemorySink::new();
    let logger = Logger::with_sink(config, sink.clone()).expect("memory sink never fails");
    (Trace::new(Arc::new(logger)), sink)
}

fn completions(sink: &MemorySink) -> Vec<Record> {
    sink.records()
        .into_iter()
        .filter(|r| r.message.ends_with("Request served"))
        .collect()
}

async fn serve(trace: &Trace, path: &str, status: StatusCode) -> Response {
    trace
        .around(RequestMeta::new("GET", path, "127.0.0.1"), |_| async move {
            Response::status(status)
        })
        .await
}

#[tokio::test]
async fn first_health_check_is_one_info_line() {
    let (trace, sink) = traced(LoggerConfig { structured_output: false, verbose: false });

    serve(&trace, "/health", StatusCode::OK).await;

    let records = sink.records();
    assert_eq!(records.len(), 1, "no DEBUG start line without verbose");
    let record = &records[0];
    assert_eq!(record.severity, Severity::Info);
    assert_eq!(record.message, "[1] Request served");
    assert_eq!(record.field("path"), Some(&Value::from("/health")));
    assert_eq!(record.field("statusCode"), Some(&Value::U64(200)));
    assert_eq!(record.field("comment"), Some(&Value::from("")));
    assert_eq!(record.field("reqID"), Some(&Value::U64(1)));
}

#[tokio::test]
async fn fifth_request_answered_404_is_a_warning() {
    let (trace, sink) = traced(LoggerConfig::default());
    for _ in 0..4 {
        serve(&trace, "/ok", StatusCode::OK).await;
    }
    sink.clear();

    serve(&trace, "/missing", StatusCode::NOT_FOUND).await;

    let records = completions(&sink);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].severity, Severity::Warn);
    assert_eq!(records[0].message, "[5] Request served");
    assert_eq!(records[0].field("statusCode"), Some(&Value::U64(404)));
}

#[tokio::test]
async fn severity_follows_status() {
    let cases = [
        (StatusCode::OK, Severity::Info),
        (StatusCode::CREATED, Severity::Info),
        (StatusCode::MOVED_PERMANENTLY, Severity::Info),
        (StatusCode::NOT_FOUND, Severity::Warn),
        (StatusCode::FORBIDDEN, Severity::Error),
        (StatusCode::INTERNAL_SERVER_ERROR, Severity::Error),
        (StatusCode::NO_CONTENT, Severity::Error),
        (StatusCode::FOUND, Severity::Error),
    ];
    let (trace, sink) = traced(LoggerConfig::default());

    for (status, _) in cases {
        serve(&trace, "/", status).await;
    }

    let got: Vec<_> = completions(&sink).iter().map(|r| r.severity).collect();
    let want: Vec<_> = cases.iter().map(|(_, s)| *s).collect();
    assert_eq!(got, want);
}

#[tokio::test]
async fn concurrent_requests_keep_their_own_ids() {
    let (trace, sink) = traced(LoggerConfig { structured_output: false, verbose: true });

    let slow = trace.around(RequestMeta::new("GET", "/slow", "10.0.0.1"), |_| async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Response::text("slow")
    });
    let fast = trace.around(RequestMeta::new("GET", "/fast", "10.0.0.2"), |_| async {
        Response::text("fast")
    });
    tokio::join!(slow, fast);

    let records = sink.records();
    assert_eq!(records.len(), 4);

    let mut ids = HashSet::new();
    for path in ["/slow", "/fast"] {
        let start = records
            .iter()
            .find(|r| r.severity == Severity::Debug && r.message.ends_with(path))
            .expect("start line");
        let Some(Value::U64(id)) = start.field("reqID") else {
            panic!("start line without reqID: {start:?}");
        };
        assert_eq!(start.message, format!("[{id}] Incoming request: {path}"));

        let done = records
            .iter()
            .find(|r| r.severity == Severity::Info && r.field("path") == Some(&Value::from(path)))
            .expect("completion line");
        assert_eq!(done.field("reqID"), Some(&Value::U64(*id)));
        assert_eq!(done.message, format!("[{id}] Request served"));

        ids.insert(*id);
    }
    assert_eq!(ids, HashSet::from([1, 2]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ids_are_unique_across_worker_threads() {
    let (trace, sink) = traced(LoggerConfig::default());

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..200 {
        let trace = trace.clone();
        tasks.spawn(async move { serve(&trace, &format!("/r/{i}"), StatusCode::OK).await; });
    }
    while tasks.join_next().await.is_some() {}

    let ids: HashSet<_> = sink
        .records()
        .iter()
        .filter_map(|r| match r.field("reqID") {
            Some(Value::U64(id)) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(ids.len(), 200);
    assert_eq!(ids, (1..=200).collect::<HashSet<u64>>());
}

#[tokio::test]
async fn shared_counter_spans_middlewares() {
    let counter = Arc::new(RequestCounter::new());
    let sink = MemorySink::new();
    let logger = Arc::new(Logger::with_sink(LoggerConfig::default(), sink.clone()).unwrap());
    let public = Trace::with_counter(Arc::clone(&logger), Arc::clone(&counter));
    let admin = Trace::with_counter(logger, Arc::clone(&counter));

    serve(&public, "/a", StatusCode::OK).await;
    serve(&admin, "/b", StatusCode::OK).await;
    serve(&public, "/c", StatusCode::OK).await;

    let ids: Vec<_> = sink.records().iter().map(|r| r.field("reqID").cloned()).collect();
    assert_eq!(ids, [Some(Value::U64(1)), Some(Value::U64(2)), Some(Value::U64(3))]);
    assert_eq!(counter.current(), 3);
}
