//! Mapping detector boxes from camera pixel space into screen space.

use glance_core::Rect;

// Asymmetric padding factors for the detector's tight face boxes,
// derived from the reference model's crop aspect ratio.
const INSET_X: f32 = -0.1;
const INSET_Y: f32 = 0.15;

/// Scale a detector bounding box to the output surface, accounting for
/// the sensor rotation. Portrait rotations (90/270) swap the camera
/// axes and the padding factors.
pub fn scale_to_screen(
    rect: Rect,
    camera_size: (u32, u32),
    screen_size: (u32, u32),
    rotation_degrees: i32,
) -> Rect {
    let portrait = matches!(rotation_degrees.rem_euclid(360), 90 | 270);

    let (cam_w, cam_h) = (camera_size.0 as f32, camera_size.1 as f32);
    let (scr_w, scr_h) = (screen_size.0 as f32, screen_size.1 as f32);

    let width_ratio = if portrait { scr_w / cam_h } else { scr_w / cam_w };
    let height_ratio = if portrait { scr_h / cam_w } else { scr_h / cam_h };

    let left = rect.x as f32 * width_ratio;
    let top = rect.y as f32 * height_ratio;
    let right = rect.right() as f32 * width_ratio;
    let bottom = rect.bottom() as f32 * height_ratio;

    let width = right - left;
    let height = bottom - top;

    let (inset_x, inset_y) = if portrait {
        (INSET_Y, INSET_X)
    } else {
        (INSET_X, INSET_Y)
    };

    let left = left - width * inset_x;
    let right = right + width * inset_x;
    let top = top - height * inset_y;
    let bottom = bottom + height * inset_y;

    Rect::new(
        left as i32,
        top as i32,
        (right - left) as i32,
        (bottom - top) as i32,
    )
}
