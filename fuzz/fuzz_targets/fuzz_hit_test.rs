#![no_main]

use dz_core::{Point, Rect};
use dz_overlay::hit::{drag_rect, hit_test};
use dz_overlay::HitArea;
use libfuzzer_sys::fuzz_target;

const AREAS: [HitArea; 9] = [
    HitArea::TopLeft,
    HitArea::TopRight,
    HitArea::BottomLeft,
    HitArea::BottomRight,
    HitArea::Top,
    HitArea::Bottom,
    HitArea::Left,
    HitArea::Right,
    HitArea::Center,
];

fuzz_target!(|input: ([f32; 6], u8)| {
    let ([x, y, width, height, px, py], area) = input;
    let values = [x, y, width, height, px, py];
    if values.iter().any(|value| !value.is_finite()) {
        return;
    }
    let rect = Rect::new(
        f64::from(x),
        f64::from(y),
        f64::from(width.abs()),
        f64::from(height.abs()),
    );
    let pointer = Point::new(f64::from(px), f64::from(py));
    let _ = hit_test(rect, pointer, 0.004);
    let dragged = drag_rect(rect, AREAS[usize::from(area) % AREAS.len()], pointer);
    assert!(dragged.width >= 0.0 && dragged.height >= 0.0);
});
