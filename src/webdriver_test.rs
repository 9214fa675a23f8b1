use super::*;
use pretty_assertions::assert_eq;
use std::cell::Cell;

#[tokio::test]
async fn test_poll_until_ready_after_a_few_checks() {
    let calls = Cell::new(0);
    let outcome = poll_until(Duration::from_secs(5), || {
        calls.set(calls.get() + 1);
        let done = calls.get() >= 3;
        async move { done }
    })
    .await
    .unwrap();

    assert_eq!(outcome, WaitOutcome::Ready);
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn test_poll_until_times_out() {
    let started = std::time::Instant::now();
    let outcome = poll_until(Duration::from_millis(300), || async { false })
        .await
        .unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_poll_until_checks_at_least_once_with_zero_timeout() {
    let outcome = poll_until(Duration::ZERO, || async { true }).await.unwrap();
    assert!(outcome.is_ready());
}

#[test]
fn test_chrome_capabilities() {
    let viewport = ViewportSize {
        width: 1280,
        height: 720,
    };
    let dir = std::path::Path::new("/tmp/profile");
    let caps = BrowserType::Chrome.capabilities(true, Some(&viewport), Some(dir));

    let args: Vec<&str> = caps["goog:chromeOptions"]["args"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a.as_str().unwrap())
        .collect();
    assert!(args.contains(&"--headless=new"));
    assert!(args.contains(&"--window-size=1280,720"));
    assert!(args.contains(&"--user-data-dir=/tmp/profile"));
    assert!(!args.contains(&"--start-maximized"));
}

#[test]
fn test_firefox_capabilities_headed() {
    let caps = BrowserType::Firefox.capabilities(false, None, None);
    assert_eq!(caps["moz:firefoxOptions"]["args"], json!([]));
}

#[test]
fn test_driver_metadata() {
    assert_eq!(BrowserType::Firefox.driver_binary(), "geckodriver");
    assert_eq!(BrowserType::Chrome.standard_port(), 9515);
}

#[test]
fn test_truthy() {
    assert!(truthy(&json!(true)));
    assert!(truthy(&json!("x")));
    assert!(truthy(&json!({ "a": 1 })));
    assert!(!truthy(&json!(null)));
    assert!(!truthy(&json!(0)));
    assert!(!truthy(&json!("")));
}
