//! Ping-pong accumulation buffers.

use crate::core::{BakeResult, RenderBackend, RenderTargetDescriptor, RenderTargetId, TextureFormat};

/// Two equally sized float render targets with alternating roles.
///
/// The pair is an arena of two target ids indexed by a parity flag: the
/// *front* holds the most recent estimate, the *back* is the next write
/// target. A target cannot be sampled while it is being rendered to, hence
/// the pair.
#[derive(Debug)]
pub struct AccumulationBuffers {
    targets: [RenderTargetId; 2],
    active_is_a: bool,
    resolution: u32,
    format: TextureFormat,
}

impl AccumulationBuffers {
    /// Allocate both buffers at `resolution` x `resolution`.
    pub fn allocate<B: RenderBackend + ?Sized>(
        renderer: &mut B,
        resolution: u32,
        format: TextureFormat,
    ) -> BakeResult<Self> {
        let a = renderer.create_render_target(&RenderTargetDescriptor::square("accumulation_a", resolution, format))?;
        let b = match renderer.create_render_target(&RenderTargetDescriptor::square("accumulation_b", resolution, format)) {
            Ok(b) => b,
            Err(err) => {
                renderer.dispose_render_target(a);
                return Err(err);
            }
        };
        log::debug!("Allocated accumulation buffers {a} and {b} ({resolution}x{resolution}, {format:?})");
        Ok(Self {
            targets: [a, b],
            active_is_a: true,
            resolution,
            format,
        })
    }

    #[inline]
    fn front_index(&self) -> usize {
        if self.active_is_a {
            0
        } else {
            1
        }
    }

    /// Most recently written buffer.
    #[inline]
    pub fn front(&self) -> RenderTargetId {
        self.targets[self.front_index()]
    }

    /// Next write target.
    #[inline]
    pub fn back(&self) -> RenderTargetId {
        self.targets[1 - self.front_index()]
    }

    /// Swap front and back.
    #[inline]
    pub fn swap(&mut self) {
        self.active_is_a = !self.active_is_a;
    }

    /// Whether buffer A is the front.
    #[inline]
    pub fn active_is_a(&self) -> bool {
        self.active_is_a
    }

    /// Both target ids, A first.
    #[inline]
    pub fn targets(&self) -> [RenderTargetId; 2] {
        self.targets
    }

    /// Edge size in texels.
    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Texel format.
    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Zero both buffers. The previously bound target is rebound afterwards.
    pub fn clear<B: RenderBackend + ?Sized>(&self, renderer: &mut B) -> BakeResult<()> {
        let previous = renderer.render_target();
        let mut result = Ok(());
        for target in self.targets {
            renderer.set_render_target(Some(target));
            result = renderer.clear();
            if result.is_err() {
                break;
            }
        }
        renderer.set_render_target(previous);
        result
    }

    /// Release both targets.
    pub fn dispose<B: RenderBackend + ?Sized>(self, renderer: &mut B) {
        for target in self.targets {
            renderer.dispose_render_target(target);
        }
    }
}
