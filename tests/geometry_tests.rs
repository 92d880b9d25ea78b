// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the aspect-fit math

use camera_preview::{Point, Rect, Size};

#[test]
fn test_scale_fit_preserves_aspect_ratio() {
    let sources = [
        Size::new(1920.0, 1080.0),
        Size::new(1280.0, 720.0),
        Size::new(640.0, 480.0),
        Size::new(1080.0, 1920.0),
        Size::new(333.0, 777.0),
    ];
    let destinations = [
        Size::new(100.0, 200.0),
        Size::new(800.0, 600.0),
        Size::new(256.0, 256.0),
        Size::new(64.0, 1000.0),
    ];

    for source in sources {
        for dest in destinations {
            let fitted = Rect::from_size(source).scale_fit(Rect::from_size(dest));

            // contained
            assert!(
                fitted.size.width <= dest.width && fitted.size.height <= dest.height,
                "{source:?} into {dest:?} escaped: {fitted:?}"
            );

            // aspect preserved within one unit of flooring error
            let ratio = (dest.width / source.width).min(dest.height / source.height);
            let unfloored = Size::new(source.width * ratio, source.height * ratio);
            assert!(
                (fitted.size.width - unfloored.width).abs() < 1.0,
                "{source:?} into {dest:?}: width {} vs {}",
                fitted.size.width,
                unfloored.width
            );
            assert!((fitted.size.height - unfloored.height).abs() < 1.0);

            // the fitted dimension touches the destination edge
            let touches = (fitted.size.width - dest.width).abs() < 1.0
                || (fitted.size.height - dest.height).abs() < 1.0;
            assert!(touches, "{source:?} into {dest:?} touches no edge: {fitted:?}");
        }
    }
}

#[test]
fn test_scale_fit_same_aspect_fills_destination() {
    let fitted =
        Rect::from_size(Size::new(1920.0, 1080.0)).scale_fit(Rect::from_size(Size::new(960.0, 540.0)));
    assert_eq!(fitted, Rect::from_size(Size::new(960.0, 540.0)));
}

#[test]
fn test_scale_fit_known_portrait_destination() {
    // 1080p frame into a 100x200 zero-origin destination
    let fitted =
        Rect::from_size(Size::new(1920.0, 1080.0)).scale_fit(Rect::from_size(Size::new(100.0, 200.0)));
    assert_eq!(fitted.size, Size::new(100.0, 56.0));
    assert_eq!(fitted.origin, Point::new(0.0, 72.0));
}

#[test]
fn test_scale_fit_nonzero_origin_bias() {
    // Centering is computed against the destination's max edges, so a
    // destination not anchored at zero shifts the result toward zero by
    // half its origin instead of centering within it visually. This is
    // long-standing behavior callers rely on being stable; they
    // normalize the destination to a zero origin when they want true
    // centering.
    let dest = Rect::new(Point::new(50.0, 40.0), Size::new(100.0, 200.0));
    let fitted = Rect::from_size(Size::new(1920.0, 1080.0)).scale_fit(dest);

    assert_eq!(fitted.size, Size::new(100.0, 56.0));
    // max edges are (150, 240): origin = ((150-100)/2, (240-56)/2)
    assert_eq!(fitted.origin, Point::new(25.0, 92.0));
    // NOT the visually centered (50, 112)
    let visually_centered = Point::new(
        dest.origin.x + (dest.size.width - fitted.size.width) * 0.5,
        dest.origin.y + (dest.size.height - fitted.size.height) * 0.5,
    );
    assert_ne!(fitted.origin, visually_centered);
}

#[test]
fn test_scale_fit_upscales_small_sources() {
    let fitted =
        Rect::from_size(Size::new(32.0, 24.0)).scale_fit(Rect::from_size(Size::new(640.0, 640.0)));
    assert_eq!(fitted.size, Size::new(640.0, 480.0));
    assert_eq!(fitted.origin, Point::new(0.0, 80.0));
}
