// Unit tests for types module

use super::*;

#[test]
fn test_viewport_size_parse() {
    let size = ViewportSize::parse("1920x1080").unwrap();
    assert_eq!(size.width, 1920);
    assert_eq!(size.height, 1080);

    assert!(ViewportSize::parse("1920").is_err());
    assert!(ViewportSize::parse("1920x").is_err());
    assert!(ViewportSize::parse("x1080").is_err());
    assert!(ViewportSize::parse("1920X1080").is_err()); // uppercase X
}

#[test]
fn test_rect_geometry() {
    let rect = Rect {
        x: 100.0,
        y: 40.0,
        width: 60.0,
        height: 20.0,
    };
    assert_eq!(rect.center_x(), 130.0);
    assert_eq!(rect.center_y(), 50.0);
    assert_eq!(rect.bottom(), 60.0);
}

#[test]
fn test_output_format_default_is_json() {
    assert!(matches!(OutputFormat::default(), OutputFormat::Json));
}

#[test]
fn test_wait_outcome() {
    assert!(WaitOutcome::Ready.is_ready());
    assert!(!WaitOutcome::TimedOut.is_ready());
}
