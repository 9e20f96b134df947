use crate::error::{Error, Result};

/// Largest value an 8-bit sample can hold.
pub const SAMPLE_MAX: f64 = 255.0;

/// One of the three color planes of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Clamp a reconstructed value into the 8-bit sample range.
///
/// Applied uniformly to every channel on every write. NaN maps to 0.
#[inline]
pub fn clamp_sample(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, SAMPLE_MAX)
    }
}

/// Per-channel sample grids for one image.
///
/// Samples are held as `f64` so the block transform can work on them in
/// place; they always sit in `[0, 255]`. Planes are stored row-major
/// (`y * width + x`) and all three share the frame's dimensions. A frame is
/// never resized after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    planes: [Vec<f64>; 3],
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Frame {
    /// A black `width` × `height` frame.
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            planes: [vec![0.0; len], vec![0.0; len], vec![0.0; len]],
        }
    }

    /// Build a frame from interleaved 8-bit RGB samples, the shape the
    /// import collaborator hands over.
    pub fn from_rgb8(width: usize, height: usize, rgb: &[u8]) -> Result<Self> {
        let expected = width * height * 3;
        if rgb.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: rgb.len(),
            });
        }
        let mut frame = Self::new(width, height);
        for (i, px) in rgb.chunks_exact(3).enumerate() {
            for (plane, &sample) in frame.planes.iter_mut().zip(px) {
                plane[i] = sample as f64;
            }
        }
        Ok(frame)
    }

    /// Build a frame from three row-major planes. Every sample is clamped.
    pub fn from_planes(width: usize, height: usize, planes: [Vec<f64>; 3]) -> Result<Self> {
        let expected = width * height;
        if let Some(bad) = planes.iter().find(|p| p.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }
        let mut planes = planes;
        for plane in planes.iter_mut() {
            plane.iter_mut().for_each(|s| *s = clamp_sample(*s));
        }
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    fn offset(&self, channel: Channel, x: usize, y: usize) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                channel,
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y * self.width + x)
    }

    pub fn sample(&self, channel: Channel, x: usize, y: usize) -> Result<f64> {
        let i = self.offset(channel, x, y)?;
        Ok(self.planes[channel.index()][i])
    }

    /// Store `value` after clamping it into `[0, 255]`.
    pub fn set_sample(&mut self, channel: Channel, x: usize, y: usize, value: f64) -> Result<()> {
        let i = self.offset(channel, x, y)?;
        self.planes[channel.index()][i] = clamp_sample(value);
        Ok(())
    }

    /// The 8-bit RGB triple at `(x, y)`, rounded half-to-even.
    pub fn pixel_rgb8(&self, x: usize, y: usize) -> Result<[u8; 3]> {
        let i = self.offset(Channel::Red, x, y)?;
        Ok([
            sample_to_u8(self.planes[0][i]),
            sample_to_u8(self.planes[1][i]),
            sample_to_u8(self.planes[2][i]),
        ])
    }

    /// Read-only view of one plane.
    pub fn plane(&self, channel: Channel) -> &[f64] {
        &self.planes[channel.index()]
    }

    /// Split the frame into horizontal bands of `rows` full rows each.
    ///
    /// Each band holds exclusive mutable access to its own rows of all three
    /// planes, so bands can be handed to different workers. Trailing rows
    /// that do not fill a whole band are not returned.
    pub fn bands_mut(&mut self, rows: usize) -> Vec<PlaneBand<'_>> {
        let stride = match self.width.checked_mul(rows) {
            Some(stride) if stride > 0 && stride <= self.planes[0].len() => stride,
            _ => return Vec::new(),
        };
        let width = self.width;
        let [r, g, b] = &mut self.planes;
        r.chunks_exact_mut(stride)
            .zip(g.chunks_exact_mut(stride))
            .zip(b.chunks_exact_mut(stride))
            .enumerate()
            .map(|(index, ((r, g), b))| PlaneBand {
                index,
                width,
                planes: [r, g, b],
            })
            .collect()
    }
}

/// Convert a stored sample to its 8-bit value, rounding half-to-even.
#[inline]
pub fn sample_to_u8(sample: f64) -> u8 {
    clamp_sample(sample).round_ties_even() as u8
}

/// Exclusive view of `rows` consecutive full-width rows of a frame.
pub struct PlaneBand<'a> {
    /// Position of the band counted from the top of the frame.
    pub index: usize,
    pub width: usize,
    pub planes: [&'a mut [f64]; 3],
}

impl PlaneBand<'_> {
    #[inline]
    pub fn get(&self, channel: Channel, x: usize, row: usize) -> f64 {
        self.planes[channel.index()][row * self.width + x]
    }

    /// Clamped write, the same policy as [`Frame::set_sample`].
    #[inline]
    pub fn set(&mut self, channel: Channel, x: usize, row: usize, value: f64) {
        self.planes[channel.index()][row * self.width + x] = clamp_sample(value);
    }
}
