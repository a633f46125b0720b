/// Attribute slot locations supplied by the material/pipeline-state layer.
///
/// Queried on every [`bind`](super::RenderBuffers::bind), so a provider may
/// change them between frames. A stream rebound at a new location no longer
/// feeds its old one.
pub trait AttributeLocations {
    fn position_location(&self) -> u32;
    fn color_location(&self) -> u32;
    /// Location of texture channel 0.
    fn tex0_location(&self) -> u32;
}

/// Fixed slot assignment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FixedLocations {
    pub position: u32,
    pub color: u32,
    pub tex0: u32,
}

impl Default for FixedLocations {
    /// `@location(0)` position, `(1)` color, `(2)` texture channel 0.
    fn default() -> Self {
        Self {
            position: 0,
            color: 1,
            tex0: 2,
        }
    }
}

impl AttributeLocations for FixedLocations {
    fn position_location(&self) -> u32 {
        self.position
    }

    fn color_location(&self) -> u32 {
        self.color
    }

    fn tex0_location(&self) -> u32 {
        self.tex0
    }
}
