// Geometry module
// Pan origin clamping, centering and slot index arithmetic

/// A point in image or window coordinates (origin at the top-left corner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Clamp a single axis. With no slack the axis cannot pan and stays at 0.
fn clamp_axis(value: i32, image: u32, viewport: u32) -> i32 {
    let slack = image as i64 - viewport as i64;
    if slack <= 0 {
        return 0;
    }
    (value as i64).clamp(0, slack) as i32
}

/// Clamp a pan origin so the visible region never leaves the image.
///
/// On each axis the origin lies in `[0, image - viewport]`. When the viewport
/// is at least as large as the image on an axis, that coordinate is forced to 0.
pub fn clamp_origin(origin: Point, image: Size, viewport: Size) -> Point {
    Point {
        x: clamp_axis(origin.x, image.width, viewport.width),
        y: clamp_axis(origin.y, image.height, viewport.height),
    }
}

/// Offset at which an image is painted so that it is centered in the viewport.
/// Axes where the image fills the viewport get 0.
pub fn center_offset(image: Size, viewport: Size) -> Point {
    let margin = |image: u32, viewport: u32| -> i32 {
        if image < viewport {
            ((viewport - image) / 2) as i32
        } else {
            0
        }
    };
    Point {
        x: margin(image.width, viewport.width),
        y: margin(image.height, viewport.height),
    }
}

/// Size of the part of an image that fits in the viewport
pub fn visible_size(image: Size, viewport: Size) -> Size {
    Size {
        width: image.width.min(viewport.width),
        height: image.height.min(viewport.height),
    }
}

/// Wrap any signed index into `[0, len)`.
///
/// `len` must be non-zero.
pub fn wrap_index(index: i64, len: usize) -> usize {
    index.rem_euclid(len as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZES: [u32; 6] = [0, 1, 50, 100, 150, 200];
    const COORDS: [i32; 7] = [i32::MIN, -500, -1, 0, 37, 100, i32::MAX];

    #[test]
    fn clamp_is_idempotent() {
        for &iw in &SIZES {
            for &ih in &SIZES {
                for &vw in &SIZES {
                    for &vh in &SIZES {
                        for &x in &COORDS {
                            for &y in &COORDS {
                                let image = Size::new(iw, ih);
                                let viewport = Size::new(vw, vh);
                                let once = clamp_origin(Point::new(x, y), image, viewport);
                                assert_eq!(clamp_origin(once, image, viewport), once);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn clamp_stays_in_range() {
        for &iw in &SIZES {
            for &ih in &SIZES {
                for &vw in &SIZES {
                    for &vh in &SIZES {
                        for &x in &COORDS {
                            for &y in &COORDS {
                                let p = clamp_origin(
                                    Point::new(x, y),
                                    Size::new(iw, ih),
                                    Size::new(vw, vh),
                                );
                                let max_x = iw.saturating_sub(vw) as i32;
                                let max_y = ih.saturating_sub(vh) as i32;
                                assert!((0..=max_x).contains(&p.x), "x={} max={}", p.x, max_x);
                                assert!((0..=max_y).contains(&p.y), "y={} max={}", p.y, max_y);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn clamp_disables_panning_on_small_axis() {
        let p = clamp_origin(Point::new(40, 40), Size::new(80, 300), Size::new(100, 100));
        assert_eq!(p, Point::new(0, 40));
    }

    #[test]
    fn clamp_with_zero_viewport_uses_full_range() {
        let p = clamp_origin(Point::new(500, -5), Size::new(200, 150), Size::new(0, 0));
        assert_eq!(p, Point::new(200, 0));
    }

    #[test]
    fn center_offset_only_for_smaller_axes() {
        assert_eq!(
            center_offset(Size::new(50, 300), Size::new(101, 100)),
            Point::new(25, 0)
        );
        assert_eq!(
            center_offset(Size::new(100, 100), Size::new(100, 100)),
            Point::ORIGIN
        );
    }

    #[test]
    fn visible_size_is_per_axis_minimum() {
        assert_eq!(
            visible_size(Size::new(200, 50), Size::new(100, 100)),
            Size::new(100, 50)
        );
    }

    #[test]
    fn wrap_index_handles_negative_and_large() {
        for n in 1..6usize {
            for k in -20i64..20 {
                let expected = (((k % n as i64) + n as i64) % n as i64) as usize;
                assert_eq!(wrap_index(k, n), expected);
            }
        }
        assert_eq!(wrap_index(-1, 3), 2);
        assert_eq!(wrap_index(3, 3), 0);
    }

    #[test]
    fn offset_saturates() {
        assert_eq!(Point::new(i32::MAX, 0).offset(10, -10), Point::new(i32::MAX, -10));
    }
}
