use bytemuck::{Pod, Zeroable};

/// RGBA color packed into one 32-bit word.
///
/// The in-memory byte order is `R, G, B, A`, which is what the pipeline reads
/// as a normalized `Unorm8x4` attribute.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const WHITE: Self = Self(u32::MAX);
    pub const TRANSPARENT: Self = Self(0);

    #[inline]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(u32::from_ne_bytes([r, g, b, a]))
    }

    #[inline]
    pub const fn rgba8(self) -> [u8; 4] {
        self.0.to_ne_bytes()
    }

    /// Packs straight-alpha float components, clamped to `[0, 1]`.
    #[inline]
    pub fn from_f32(r: f32, g: f32, b: f32, a: f32) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::from_rgba8(q(r), q(g), q(b), q(a))
    }
}

impl From<u32> for PackedColor {
    #[inline]
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<[u8; 4]> for PackedColor {
    #[inline]
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::from_rgba8(r, g, b, a)
    }
}

/// One particle vertex as emitted by the producer.
///
/// `tex_coords` holds the coordinates of every texture channel concatenated
/// in channel order: with channels of dimensions `[2, 3]` a vertex carries 5
/// floats, the first two for channel 0.
///
/// The slice carries no per-channel boundaries. Staging checks only its total
/// length against the sum of channel dimensions, then splits it by the
/// dimensions declared at initialization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vertex<'a> {
    pub position: [f32; 3],
    pub color: PackedColor,
    pub tex_coords: &'a [f32],
}

impl<'a> Vertex<'a> {
    /// Vertex without texture coordinates.
    #[inline]
    pub fn new(position: [f32; 3], color: PackedColor) -> Self {
        Self {
            position,
            color,
            tex_coords: &[],
        }
    }

    #[inline]
    pub fn with_tex_coords(self, tex_coords: &'a [f32]) -> Vertex<'a> {
        Vertex { tex_coords, ..self }
    }
}

/// Texture channel declared at initialization.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TexChannelSpec {
    /// Floats per vertex, `1..=4`.
    pub dimensions: u8,
}

impl TexChannelSpec {
    pub const MAX_DIMENSIONS: u8 = 4;

    #[inline]
    pub const fn new(dimensions: u8) -> Self {
        Self { dimensions }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        (1..=Self::MAX_DIMENSIONS).contains(&self.dimensions)
    }
}
