use crate::support::user_agent;
use shelf_harvest::crawler::{
    build_http_client, FetchCache, Fetcher, RequestPacing, RetryPolicy, RunContext,
};
use shelf_harvest::FetchError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn fetcher(context: &RunContext, max_attempts: u32, timeout: Duration) -> Fetcher {
    let client = build_http_client(&user_agent(), timeout, false).unwrap();
    Fetcher::new(
        client,
        context.clone(),
        FetchCache::new(),
        RetryPolicy::new(max_attempts, Duration::from_millis(5), Duration::from_millis(20)),
        RequestPacing::none(),
    )
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/show/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let context = RunContext::new(2);
    let fetcher = fetcher(&context, 3, Duration::from_secs(5));
    let body = fetcher
        .fetch(&format!("{}/book/show/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "<html>ok</html>");
    assert_eq!(context.error_count(), 0);
}

#[tokio::test]
async fn test_retry_budget_is_exact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let context = RunContext::new(2);
    let fetcher = fetcher(&context, 3, Duration::from_secs(5));
    let result = fetcher.fetch(&format!("{}/flaky", server.uri())).await;

    match result {
        Err(FetchError::Exhausted {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last_error, "HTTP 500");
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
    assert_eq!(context.error_count(), 3);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let context = RunContext::new(2);
    let fetcher = fetcher(&context, 5, Duration::from_secs(5));
    let result = fetcher.fetch(&format!("{}/missing", server.uri())).await;

    assert!(result.unwrap_err().is_not_found());
    assert_eq!(context.error_count(), 0);
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&server)
        .await;

    let context = RunContext::new(2);
    let fetcher = fetcher(&context, 3, Duration::from_secs(5));
    let body = fetcher.fetch(&format!("{}/busy", server.uri())).await.unwrap();

    assert_eq!(body, "finally");
    // Two failures, then one success pays one back
    assert_eq!(context.error_count(), 1);
}

#[tokio::test]
async fn test_cached_url_is_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/show/cached"))
        .respond_with(ResponseTemplate::new(200).set_body_string("same body"))
        .expect(1)
        .mount(&server)
        .await;

    let context = RunContext::new(2);
    let fetcher = fetcher(&context, 3, Duration::from_secs(5));
    let url = format!("{}/book/show/cached", server.uri());

    let first = fetcher.fetch(&url).await.unwrap();
    let second = fetcher.fetch(&url).await.unwrap();

    assert_eq!(first, second);
    assert!(fetcher.cache().contains(&url).await);
    assert_eq!(fetcher.cache().len().await, 1);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .expect(2)
        .mount(&server)
        .await;

    let context = RunContext::new(2);
    let fetcher = fetcher(&context, 3, Duration::from_secs(5));
    let url = format!("{}/gone", server.uri());

    assert!(fetcher.fetch(&url).await.unwrap_err().is_not_found());
    assert!(fetcher.fetch(&url).await.unwrap_err().is_not_found());
    assert!(fetcher.cache().is_empty().await);
}

#[tokio::test]
async fn test_timeout_is_retried_then_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(2)
        .mount(&server)
        .await;

    let context = RunContext::new(2);
    let fetcher = fetcher(&context, 2, Duration::from_millis(200));
    let result = fetcher.fetch(&format!("{}/slow", server.uri())).await;

    match result {
        Err(FetchError::Exhausted { attempts, last_error, .. }) => {
            assert_eq!(attempts, 2);
            assert_eq!(last_error, "Request timeout");
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_permits_restored_after_concurrent_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("ok")
                .set_delay(Duration::from_millis(50)),
        )
        .expect(8)
        .mount(&server)
        .await;

    let context = RunContext::new(3);
    let fetcher = Arc::new(fetcher(&context, 1, Duration::from_secs(5)));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let fetcher = Arc::clone(&fetcher);
        let url = format!("{}/book/show/{}", server.uri(), i);
        tasks.spawn(async move { fetcher.fetch(&url).await });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(joined.unwrap().is_ok());
    }

    assert_eq!(context.available_permits(), 3);
    assert_eq!(context.max_in_flight(), 3);
}

/// Records when each request reached the server; every response is held for `delay`
struct ArrivalLog {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    delay: Duration,
}

impl Respond for ArrivalLog {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200)
            .set_body_string("ok")
            .set_delay(self.delay)
    }
}

/// Most requests the server held at once, given each is held for `delay`
fn peak_in_flight(arrivals: &[Instant], delay: Duration) -> usize {
    arrivals
        .iter()
        .map(|start| {
            arrivals
                .iter()
                .filter(|other| **other >= *start && other.duration_since(*start) < delay)
                .count()
        })
        .max()
        .unwrap_or(0)
}

#[tokio::test]
async fn test_in_flight_requests_never_exceed_limit() {
    let delay = Duration::from_millis(200);
    let arrivals = Arc::new(Mutex::new(Vec::new()));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ArrivalLog {
            arrivals: Arc::clone(&arrivals),
            delay,
        })
        .expect(9)
        .mount(&server)
        .await;

    let context = RunContext::new(3);
    let fetcher = Arc::new(fetcher(&context, 1, Duration::from_secs(5)));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..9 {
        let fetcher = Arc::clone(&fetcher);
        let url = format!("{}/book/show/{}", server.uri(), i);
        tasks.spawn(async move { fetcher.fetch(&url).await });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(joined.unwrap().is_ok());
    }

    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 9);
    let peak = peak_in_flight(&arrivals, delay);
    assert!(peak <= context.max_in_flight(), "peak of {} requests in flight", peak);
    assert!(peak > 1, "requests never overlapped");
}
