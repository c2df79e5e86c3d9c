//! Point types and the generic point cloud container.
//!
//! Clouds are immutable once decoded. The engine hands them out behind `Arc`
//! (see [`Payload`](super::payload::Payload)) so a cached cloud can be re-published
//! without copying and without giving the receiver a way to mutate it.

/// Length of a SIFT descriptor carried by [`PointXyzSift`].
pub const SIFT_DESCRIPTOR_LEN: usize = 128;

/// Identity viewpoint: translation (0,0,0), quaternion (w=1,0,0,0).
pub const DEFAULT_VIEWPOINT: [f32; 7] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointXyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointXyzRgb {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PointXyzRgb {
    /// Unpack a PCL-style packed colour (0x00RRGGBB, alpha in the top byte ignored)
    pub fn set_packed_rgb(&mut self, packed: u32) {
        self.r = ((packed >> 16) & 0xff) as u8;
        self.g = ((packed >> 8) & 0xff) as u8;
        self.b = (packed & 0xff) as u8;
    }

    pub fn packed_rgb(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// 3D point with an attached SIFT feature descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct PointXyzSift {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// How many views the feature was observed in
    pub multiplicity: i32,
    pub point_id: i32,
    pub descriptor: [f32; SIFT_DESCRIPTOR_LEN],
}

impl Default for PointXyzSift {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            multiplicity: 1,
            point_id: 0,
            descriptor: [0.0; SIFT_DESCRIPTOR_LEN],
        }
    }
}

/// Decoded cloud of points of one type
///
/// `height == 1` means unorganized; otherwise `points` is row-major `width * height`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud<P> {
    pub width: u32,
    pub height: u32,
    /// tx ty tz qw qx qy qz
    pub viewpoint: [f32; 7],
    pub points: Vec<P>,
}

impl<P> PointCloud<P> {
    /// Unorganized cloud from a point list
    pub fn from_points(points: Vec<P>) -> Self {
        Self {
            width: points.len() as u32,
            height: 1,
            viewpoint: DEFAULT_VIEWPOINT,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_organized(&self) -> bool {
        self.height > 1
    }
}

impl<P> Default for PointCloud<P> {
    fn default() -> Self {
        Self::from_points(Vec::new())
    }
}
