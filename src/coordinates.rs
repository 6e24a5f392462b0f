//! # Image ↔ physical coordinate transform
//!
//! The annotated bey frames are a 3× binned view of the UVIS detector. Clicks are
//! recorded in **image** pixels of that frame, while candidate star files carry
//! **physical** detector pixels. Both spaces are linked by a fixed affine map:
//!
//! ```text
//! px = 1 + (ix - 500) * 3        ix = (px - 1) / 3 + 500
//! py = 1 + (iy - 478) * 3        iy = (py - 1) / 3 + 478
//! ```
//!
//! The free functions [`image_to_physical`] and [`physical_to_image`] work on raw
//! pairs; [`ImagePoint`] and [`PhysicalPoint`] wrap a `nalgebra::Point2` so the two
//! spaces cannot be mixed by accident.
use nalgebra::Point2;

use crate::constants::{Pixel, IMAGE_ORIGIN_X, IMAGE_ORIGIN_Y, PHYSICAL_SCALE};

/// Convert bey image coordinates to physical detector coordinates.
///
/// Arguments
/// ---------------
/// * `ix`: image x coordinate
/// * `iy`: image y coordinate
///
/// Return
/// ----------
/// * `(px, py)`: physical x and y coordinates
#[inline]
pub fn image_to_physical(ix: Pixel, iy: Pixel) -> (Pixel, Pixel) {
    let px = 1.0 + (ix - IMAGE_ORIGIN_X) * PHYSICAL_SCALE;
    let py = 1.0 + (iy - IMAGE_ORIGIN_Y) * PHYSICAL_SCALE;
    (px, py)
}

/// Convert physical detector coordinates to bey image coordinates.
///
/// Exact inverse of [`image_to_physical`].
#[inline]
pub fn physical_to_image(px: Pixel, py: Pixel) -> (Pixel, Pixel) {
    let ix = (px - 1.0) / PHYSICAL_SCALE + IMAGE_ORIGIN_X;
    let iy = (py - 1.0) / PHYSICAL_SCALE + IMAGE_ORIGIN_Y;
    (ix, iy)
}

/// A position in bey image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePoint(pub Point2<Pixel>);

/// A position in physical detector pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalPoint(pub Point2<Pixel>);

impl ImagePoint {
    pub fn new(x: Pixel, y: Pixel) -> Self {
        ImagePoint(Point2::new(x, y))
    }

    pub fn x(&self) -> Pixel {
        self.0.x
    }

    pub fn y(&self) -> Pixel {
        self.0.y
    }

    pub fn to_physical(self) -> PhysicalPoint {
        let (px, py) = image_to_physical(self.0.x, self.0.y);
        PhysicalPoint::new(px, py)
    }
}

impl PhysicalPoint {
    pub fn new(x: Pixel, y: Pixel) -> Self {
        PhysicalPoint(Point2::new(x, y))
    }

    pub fn x(&self) -> Pixel {
        self.0.x
    }

    pub fn y(&self) -> Pixel {
        self.0.y
    }

    pub fn to_image(self) -> ImagePoint {
        let (ix, iy) = physical_to_image(self.0.x, self.0.y);
        ImagePoint::new(ix, iy)
    }

    /// Squared euclidean distance to another physical position.
    #[inline]
    pub fn distance_squared(&self, other: &PhysicalPoint) -> f64 {
        (self.0 - other.0).norm_squared()
    }
}

impl From<ImagePoint> for PhysicalPoint {
    fn from(point: ImagePoint) -> Self {
        point.to_physical()
    }
}

impl From<PhysicalPoint> for ImagePoint {
    fn from(point: PhysicalPoint) -> Self {
        point.to_image()
    }
}
