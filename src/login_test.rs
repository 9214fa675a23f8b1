use super::*;

#[test]
fn test_login_url_detection() {
    assert!(is_login_url("https://pipedream.com/auth/login"));
    assert!(is_login_url("https://pipedream.com/auth/signin?next=/projects"));
    assert!(!is_login_url("https://pipedream.com/@acme/projects"));
}

#[test]
fn test_email_selectors_fall_back_to_any_visible_input() {
    assert_eq!(EMAIL_SELECTORS.first(), Some(&"input[type=\"email\"]"));
    assert!(EMAIL_SELECTORS.last().unwrap().starts_with("input:not("));
}
