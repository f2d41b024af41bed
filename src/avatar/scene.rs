//! Avatar geometry and ripple animation, independent of any painter.
//!
//! Coordinates are window pixels with the origin top-left. The avatar is an
//! elongated diamond: a rectangle capped by a triangle on each end.

use std::time::{Duration, Instant};

use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};

pub const AVATAR_WIDTH: f32 = 50.0;
pub const AVATAR_HEIGHT: f32 = 150.0;

/// New ripples are emitted this often while speaking.
pub const RIPPLE_INTERVAL: Duration = Duration::from_millis(500);

const RIPPLE_START_RADIUS: f32 = 10.0;
const RIPPLE_START_ALPHA: i32 = 200;
const RIPPLE_GROWTH: f32 = 3.0;
const RIPPLE_FADE: i32 = 15;
const RIPPLE_ANGLE_STEP_DEG: usize = 45;

/// Margin between the response box and the window edges.
const SIDE_MARGIN: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarShape {
    pub body: Rect,
    pub top: [Pos2; 3],
    pub bottom: [Pos2; 3],
}

impl AvatarShape {
    pub fn centered_at(center: Pos2) -> Self {
        let half_w = AVATAR_WIDTH / 2.0;
        let half_h = AVATAR_HEIGHT / 2.0;
        let body_top = center.y - half_h + half_w;
        let body_bottom = center.y + half_h - half_w;

        Self {
            body: Rect::from_min_max(
                pos2(center.x - half_w, body_top),
                pos2(center.x + half_w, body_bottom),
            ),
            top: [
                pos2(center.x, center.y - half_h),
                pos2(center.x - half_w, body_top),
                pos2(center.x + half_w, body_top),
            ],
            bottom: [
                pos2(center.x, center.y + half_h),
                pos2(center.x - half_w, body_bottom),
                pos2(center.x + half_w, body_bottom),
            ],
        }
    }
}

/// Anchor points for the text elements, derived from the window size.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub center: Pos2,
    pub title: Pos2,
    pub team: Pos2,
    pub project_part: Pos2,
    /// Center of the heard-text line.
    pub heard: Pos2,
    /// Top-left of the response text.
    pub response: Pos2,
    pub response_wrap_width: f32,
}

impl Layout {
    pub fn for_size(size: Vec2) -> Self {
        let center = pos2(size.x / 2.0, size.y / 2.0);
        let half_h = AVATAR_HEIGHT / 2.0;
        Self {
            center,
            title: pos2(center.x, center.y - half_h - 90.0),
            team: pos2(center.x, center.y - half_h - 55.0),
            project_part: pos2(center.x, center.y + half_h + 60.0),
            heard: pos2(center.x, center.y + half_h + 100.0),
            response: pos2(SIDE_MARGIN, center.y + half_h + 140.0),
            response_wrap_width: (size.x - 2.0 * SIDE_MARGIN).max(1.0),
        }
    }
}

/// Padding added around the heard-text and response boxes.
pub fn box_padding() -> Vec2 {
    vec2(10.0, 5.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ripple {
    pub center: Pos2,
    pub radius: f32,
    pub alpha: i32,
}

impl Ripple {
    pub fn alpha_u8(&self) -> u8 {
        self.alpha.clamp(0, 255) as u8
    }
}

#[derive(Debug, Default)]
pub struct RippleField {
    ripples: Vec<Ripple>,
    last_emit: Option<Instant>,
}

impl RippleField {
    pub fn ripples(&self) -> &[Ripple] {
        &self.ripples
    }

    /// Advance one frame. Ripples are cleared as soon as speaking stops.
    pub fn step(&mut self, center: Pos2, speaking: bool, now: Instant) {
        if !speaking {
            self.ripples.clear();
            self.last_emit = None;
            return;
        }

        let last_emit = *self.last_emit.get_or_insert(now);
        self.advance();

        if now.duration_since(last_emit) >= RIPPLE_INTERVAL {
            self.emit(center);
            self.last_emit = Some(now);
        }
    }

    fn advance(&mut self) {
        for ripple in &mut self.ripples {
            ripple.radius += RIPPLE_GROWTH;
            ripple.alpha -= RIPPLE_FADE;
        }
        self.ripples.retain(|r| r.alpha > 0);
    }

    /// One ripple every 45 degrees around the avatar's outline.
    fn emit(&mut self, center: Pos2) {
        for deg in (0..360).step_by(RIPPLE_ANGLE_STEP_DEG) {
            let angle = (deg as f32).to_radians();
            self.ripples.push(Ripple {
                center: pos2(
                    center.x + AVATAR_WIDTH / 2.0 * angle.cos(),
                    center.y + AVATAR_HEIGHT / 2.0 * angle.sin(),
                ),
                radius: RIPPLE_START_RADIUS,
                alpha: RIPPLE_START_ALPHA,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Pos2 = pos2(350.0, 300.0);

    #[test]
    fn diamond_spans_full_height() {
        let shape = AvatarShape::centered_at(CENTER);
        assert_eq!(shape.top[0], pos2(350.0, 225.0));
        assert_eq!(shape.bottom[0], pos2(350.0, 375.0));
        assert_eq!(shape.body.width(), AVATAR_WIDTH);
        assert_eq!(shape.body.height(), AVATAR_HEIGHT - AVATAR_WIDTH);
        assert_eq!(shape.top[1].y, shape.body.top());
        assert_eq!(shape.bottom[2].y, shape.body.bottom());
    }

    #[test]
    fn layout_for_default_window() {
        let layout = Layout::for_size(vec2(700.0, 600.0));
        assert_eq!(layout.center, CENTER);
        assert_eq!(layout.title, pos2(350.0, 135.0));
        assert_eq!(layout.team, pos2(350.0, 170.0));
        assert_eq!(layout.project_part, pos2(350.0, 435.0));
        assert_eq!(layout.heard, pos2(350.0, 475.0));
        assert_eq!(layout.response, pos2(20.0, 515.0));
        assert_eq!(layout.response_wrap_width, 660.0);
    }

    #[test]
    fn no_ripples_until_first_interval() {
        let t0 = Instant::now();
        let mut field = RippleField::default();
        field.step(CENTER, true, t0);
        field.step(CENTER, true, t0 + Duration::from_millis(100));
        assert!(field.ripples().is_empty());

        field.step(CENTER, true, t0 + RIPPLE_INTERVAL);
        assert_eq!(field.ripples().len(), 8);
        let right = field.ripples()[0];
        assert_eq!(right.center, pos2(375.0, 300.0));
        assert_eq!(right.radius, 10.0);
        assert_eq!(right.alpha, 200);
    }

    #[test]
    fn ripples_grow_fade_and_expire() {
        let t0 = Instant::now();
        let mut field = RippleField::default();
        field.step(CENTER, true, t0);
        field.step(CENTER, true, t0 + RIPPLE_INTERVAL);

        let t1 = t0 + RIPPLE_INTERVAL + Duration::from_millis(10);
        field.step(CENTER, true, t1);
        assert_eq!(field.ripples()[0].radius, 13.0);
        assert_eq!(field.ripples()[0].alpha, 185);

        // 200 / 15 frames after emission the alpha reaches zero.
        for _ in 0..12 {
            field.step(CENTER, true, t1);
        }
        assert_eq!(field.ripples()[0].alpha, 5);
        field.step(CENTER, true, t1);
        assert!(field.ripples().is_empty());
    }

    #[test]
    fn stopping_clears_ripples() {
        let t0 = Instant::now();
        let mut field = RippleField::default();
        field.step(CENTER, true, t0);
        field.step(CENTER, true, t0 + RIPPLE_INTERVAL);
        assert!(!field.ripples().is_empty());

        field.step(CENTER, false, t0 + RIPPLE_INTERVAL);
        assert!(field.ripples().is_empty());

        // Restarting waits a full interval again.
        let t2 = t0 + Duration::from_secs(5);
        field.step(CENTER, true, t2);
        assert!(field.ripples().is_empty());
    }

    #[test]
    fn alpha_is_clamped_for_painting() {
        let r = Ripple {
            center: CENTER,
            radius: 1.0,
            alpha: 300,
        };
        assert_eq!(r.alpha_u8(), 255);
    }
}
