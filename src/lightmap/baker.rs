//! The bake scheduler: one pass per displayed frame up to a budget.

use super::{AccumulationBuffers, BakeConfig, BakeMaterials, BakePass, PassParams, TrackedSurfaces};
use crate::camera::{Camera, OrthographicCamera};
use crate::core::{BakeError, BakeResult, RenderBackend, RenderTargetId};
use crate::geometry::Attribute;
use crate::light::{DirectionalLight, LightSampler};
use crate::material::MaterialRef;
use crate::math::{remap_clamped, Vec3};
use crate::scene::{Mesh, MeshRef, Scene};
use image::{ImageBuffer, ImageFormat, Rgba};
use std::io::Cursor;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeState {
    /// Disabled, not initialized, no receiver, or no bake requested.
    Idle,
    /// Passes remain in the budget.
    Accumulating,
    /// The budget is spent; `tick` does nothing until the next `update`.
    Complete,
}

struct Receiver {
    mesh: Weak<RwLock<Mesh>>,
    original_material: MaterialRef,
}

/// Progressive light-map baker.
///
/// The host calls [`update`](Self::update) when the scene changes and
/// [`tick`](Self::tick) once per displayed frame. Each tick renders the
/// tracked surfaces from a freshly randomized light pool into the back
/// accumulation buffer, blending with the previous estimate, and points the
/// receiver's shadow catcher at the result.
pub struct LightMapBaker {
    config: BakeConfig,
    buffers: Option<AccumulationBuffers>,
    materials: BakeMaterials,
    bake_scene: Scene,
    camera: Camera,
    sampler: LightSampler,
    tracked: TrackedSurfaces,
    receiver: Option<Receiver>,
    frame_index: u32,
    progress: f32,
    requested: bool,
    warned_uninitialized: bool,
}

impl LightMapBaker {
    /// Build a baker. Nothing is allocated until [`initialize`](Self::initialize).
    pub fn new(config: BakeConfig) -> Self {
        let config = config.sanitized();
        let sampler = match config.seed {
            Some(seed) => LightSampler::seeded(seed),
            None => LightSampler::from_entropy(),
        };
        let mut bake_scene = Scene::new();
        bake_scene.set_name("light_map_bake");
        bake_scene.set_lights(LightSampler::create_pool(
            config.light_pool_size,
            config.light_target,
            config.shadow,
        ));

        Self {
            config,
            buffers: None,
            materials: BakeMaterials::new(),
            bake_scene,
            // Accumulation draws in UV space; the camera only satisfies the renderer contract.
            camera: Camera::from(OrthographicCamera::symmetric(1.0, 0.1, 10.0)),
            sampler,
            tracked: TrackedSurfaces::default(),
            receiver: None,
            frame_index: 0,
            progress: 0.0,
            requested: false,
            warned_uninitialized: false,
        }
    }

    /// Allocate the accumulation buffers. Re-initializing releases the old pair.
    pub fn initialize<B: RenderBackend + ?Sized>(&mut self, renderer: &mut B) -> BakeResult<()> {
        if let Some(old) = self.buffers.take() {
            old.dispose(renderer);
        }
        let buffers = AccumulationBuffers::allocate(renderer, self.config.resolution, self.config.format())?;
        buffers.clear(renderer)?;
        let front = buffers.front();
        self.materials.with_shadow_catcher(|catcher| {
            catcher.map = Some(front);
            catcher.alpha_test = 0.0;
        });
        self.buffers = Some(buffers);
        self.frame_index = 0;
        self.progress = 0.0;
        log::info!(
            "Light-map baker initialized: {}x{} {:?}, {} lights",
            self.config.resolution,
            self.config.resolution,
            self.config.format(),
            self.config.light_pool_size
        );
        Ok(())
    }

    /// Whether buffers are allocated.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    /// Make `mesh` the shadow-catching surface.
    ///
    /// The mesh needs positions and UVs; otherwise it is rejected with a
    /// warning. A previous receiver gets its original material back.
    pub fn set_receiver(&mut self, mesh: &MeshRef) -> bool {
        {
            let guard = mesh.read().unwrap_or_else(PoisonError::into_inner);
            let geometry = guard.geometry();
            if !geometry.has_attribute(Attribute::Position) || geometry.lightmap_uvs().is_none() {
                log::warn!("Receiver '{}' needs position and uv attributes; ignored", guard.name());
                return false;
            }
        }
        self.release_receiver();
        let original_material = mesh
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_material(self.materials.shadow_catcher.clone());
        self.receiver = Some(Receiver {
            mesh: Arc::downgrade(mesh),
            original_material,
        });
        true
    }

    fn release_receiver(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            if let Some(mesh) = receiver.mesh.upgrade() {
                mesh.write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_material(receiver.original_material);
            }
        }
    }

    fn receiver(&self) -> Option<MeshRef> {
        self.receiver.as_ref().and_then(|r| r.mesh.upgrade())
    }

    /// Track occluding surfaces. Returns how many were accepted.
    ///
    /// Ignored, with a one-time warning, before [`initialize`](Self::initialize).
    pub fn register_surfaces(&mut self, meshes: &[MeshRef]) -> usize {
        if !self.is_initialized() {
            if !self.warned_uninitialized {
                log::warn!("register_surfaces called before initialize; surfaces ignored");
                self.warned_uninitialized = true;
            }
            return 0;
        }
        meshes.iter().filter(|mesh| self.tracked.register(mesh)).count()
    }

    /// Number of tracked surfaces.
    #[inline]
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Zero both buffers and restart the fade-in. `enabled` is left alone.
    pub fn clear<B: RenderBackend + ?Sized>(&mut self, renderer: &mut B) -> BakeResult<()> {
        if let Some(buffers) = &self.buffers {
            buffers.clear(renderer)?;
        }
        self.materials.with_shadow_catcher(|catcher| catcher.alpha_test = 0.0);
        self.frame_index = 0;
        self.progress = 0.0;
        Ok(())
    }

    /// Clear and request a new bake.
    pub fn update<B: RenderBackend + ?Sized>(&mut self, renderer: &mut B) -> BakeResult<()> {
        self.clear(renderer)?;
        self.requested = true;
        log::debug!("Light-map bake requested ({} passes)", self.config.frame_budget);
        Ok(())
    }

    /// Current state.
    pub fn state(&self) -> BakeState {
        if !self.requested || self.buffers.is_none() || self.receiver().is_none() {
            BakeState::Idle
        } else if self.frame_index >= self.config.frame_budget {
            BakeState::Complete
        } else if self.config.enabled {
            BakeState::Accumulating
        } else {
            BakeState::Idle
        }
    }

    /// Run one bake pass if accumulating.
    pub fn tick<B: RenderBackend + ?Sized>(&mut self, renderer: &mut B) -> BakeResult<()> {
        if self.state() != BakeState::Accumulating {
            return Ok(());
        }
        let Some(receiver) = self.receiver() else {
            return Ok(());
        };
        let budget = self.config.frame_budget;
        let alpha_test = self.fade_in_alpha_test_at(self.frame_index);

        let buffers = self.buffers.as_mut().ok_or(BakeError::NotInitialized)?;

        let surfaces = self.tracked.collect();
        let pass = BakePass {
            receiver: &receiver,
            surfaces: &surfaces,
            materials: &self.materials,
            params: PassParams {
                light_origin: self.config.light_origin,
                light_jitter_radius: self.config.light_jitter_radius,
                ambient_weight: self.config.ambient_weight,
                blend_window: self.config.blend_window,
            },
        };
        pass.run(renderer, &mut self.bake_scene, &self.camera, buffers, &mut self.sampler)?;
        self.materials.with_shadow_catcher(|catcher| catcher.alpha_test = alpha_test);

        self.progress = if budget <= 1 {
            100.0
        } else {
            (100.0 * self.frame_index as f32 / (budget - 1) as f32).min(100.0)
        };
        self.frame_index += 1;
        log::debug!("Bake pass {}/{} ({:.1}%)", self.frame_index, budget, self.progress);
        if self.frame_index >= budget {
            log::info!("Light-map bake complete after {budget} passes");
        }
        Ok(())
    }

    /// Shadow-catcher alpha test for a given pass index.
    ///
    /// Zero for the first two passes, then linear up to the configured target
    /// at the last pass of the budget.
    pub fn fade_in_alpha_test_at(&self, frame_index: u32) -> f32 {
        let last = self.config.frame_budget.saturating_sub(1) as f32;
        remap_clamped(frame_index as f32, 2.0, last, 0.0, self.config.fade_in_alpha_test).clamp(0.0, 1.0)
    }

    /// Release GPU resources and give the receiver its material back.
    pub fn dispose<B: RenderBackend + ?Sized>(&mut self, renderer: &mut B) {
        if let Some(buffers) = self.buffers.take() {
            buffers.dispose(renderer);
        }
        self.release_receiver();
        self.tracked.clear();
        self.materials.with_shadow_catcher(|catcher| catcher.map = None);
        self.requested = false;
        self.frame_index = 0;
        self.progress = 0.0;
    }

    /// Progress of the current bake in percent, updated on each pass.
    #[inline]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Whether the requested bake has used its whole budget.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state() == BakeState::Complete
    }

    /// Passes run since the last clear.
    #[inline]
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Current configuration.
    #[inline]
    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    /// Pass budget.
    #[inline]
    pub fn frame_budget(&self) -> u32 {
        self.config.frame_budget
    }

    /// Set the pass budget (at least one). Takes effect without a reset.
    pub fn set_frame_budget(&mut self, frames: u32) {
        self.config.frame_budget = frames.max(1);
    }

    /// Running-average window.
    #[inline]
    pub fn blend_window(&self) -> f32 {
        self.config.blend_window
    }

    /// Set the running-average window (at least one).
    pub fn set_blend_window(&mut self, window: f32) {
        self.config.blend_window = window.max(1.0);
    }

    /// Jitter origin.
    #[inline]
    pub fn light_origin(&self) -> Vec3 {
        self.config.light_origin
    }

    /// Set the jitter origin.
    pub fn set_light_origin(&mut self, origin: Vec3) {
        self.config.light_origin = origin;
    }

    /// Jitter cube edge.
    #[inline]
    pub fn light_jitter_radius(&self) -> f32 {
        self.config.light_jitter_radius
    }

    /// Set the jitter cube edge.
    pub fn set_light_jitter_radius(&mut self, radius: f32) {
        self.config.light_jitter_radius = radius.max(0.0);
    }

    /// Sky-sample probability.
    #[inline]
    pub fn ambient_weight(&self) -> f32 {
        self.config.ambient_weight
    }

    /// Set the sky-sample probability (0-1).
    pub fn set_ambient_weight(&mut self, weight: f32) {
        self.config.ambient_weight = weight.clamp(0.0, 1.0);
    }

    /// Fade-in target.
    #[inline]
    pub fn fade_in_alpha_test(&self) -> f32 {
        self.config.fade_in_alpha_test
    }

    /// Set the fade-in target (0-1).
    pub fn set_fade_in_alpha_test(&mut self, alpha_test: f32) {
        self.config.fade_in_alpha_test = alpha_test.clamp(0.0, 1.0);
    }

    /// Whether ticks bake.
    #[inline]
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Enable or pause baking.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Material the receiver displays.
    #[inline]
    pub fn shadow_catcher_material(&self) -> &MaterialRef {
        &self.materials.shadow_catcher
    }

    /// All bake materials.
    #[inline]
    pub fn materials(&self) -> &BakeMaterials {
        &self.materials
    }

    /// The light pool, as placed by the last pass.
    #[inline]
    pub fn lights(&self) -> &[DirectionalLight] {
        self.bake_scene.lights()
    }

    /// The accumulation buffers, once initialized.
    #[inline]
    pub fn accumulation_buffers(&self) -> Option<&AccumulationBuffers> {
        self.buffers.as_ref()
    }

    /// The most recently written buffer.
    #[inline]
    pub fn front_buffer(&self) -> Option<RenderTargetId> {
        self.buffers.as_ref().map(AccumulationBuffers::front)
    }

    /// Raw texels of the front buffer, row-major.
    pub fn read_accumulation_texels<B: RenderBackend + ?Sized>(&self, renderer: &mut B) -> BakeResult<Vec<[f32; 4]>> {
        let buffers = self.buffers.as_ref().ok_or(BakeError::NotInitialized)?;
        let size = buffers.resolution();
        renderer.read_render_target_pixels(buffers.front(), 0, 0, size, size)
    }

    /// Encode the front buffer as an 8-bit PNG.
    ///
    /// Returns `None` while the buffer is still all zero.
    pub fn export_accumulation_texture<B: RenderBackend + ?Sized>(
        &self,
        renderer: &mut B,
    ) -> BakeResult<Option<Vec<u8>>> {
        let texels = self.read_accumulation_texels(renderer)?;
        if texels.iter().all(|t| t.iter().all(|c| *c == 0.0)) {
            return Ok(None);
        }
        let size = self.config.resolution;
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let image = ImageBuffer::from_fn(size, size, |x, y| {
            let t = texels[(y * size + x) as usize];
            Rgba([to_byte(t[0]), to_byte(t[1]), to_byte(t[2]), to_byte(t[3])])
        });
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RenderTargetDescriptor, TextureFormat};
    use crate::geometry::{BoxGeometry, BufferGeometry, PlaneGeometry};
    use crate::light::ShadowSettings;
    use crate::material::{Material, StandardMaterial};
    use crate::software::SoftwareRenderer;

    const RESOLUTION: u32 = 32;

    fn config(budget: u32) -> BakeConfig {
        BakeConfig::new()
            .resolution(RESOLUTION)
            .frame_budget(budget)
            .blend_window(budget as f32)
            .seed(42)
            .shadow(ShadowSettings::new().map_size(128).camera_extent(8.0).clip_planes(0.1, 40.0))
    }

    fn floor() -> MeshRef {
        let mut mesh = Mesh::new(
            PlaneGeometry::new(10.0, 10.0).build(),
            Material::from(StandardMaterial::new()).into_ref(),
        )
        .with_name("floor");
        mesh.cast_shadow = false;
        mesh.into_ref()
    }

    fn cube() -> MeshRef {
        let mut mesh = Mesh::new(
            BoxGeometry::new(2.0, 2.0, 2.0).build(),
            Material::from(StandardMaterial::new()).into_ref(),
        )
        .with_name("cube");
        mesh.set_position(0.0, 1.0, 0.0);
        mesh.into_ref()
    }

    struct Fixture {
        renderer: SoftwareRenderer,
        baker: LightMapBaker,
        floor: MeshRef,
        cube: MeshRef,
    }

    fn fixture(budget: u32) -> Fixture {
        let mut renderer = SoftwareRenderer::new(16, 16);
        let mut baker = LightMapBaker::new(config(budget));
        baker.initialize(&mut renderer).unwrap();
        let floor = floor();
        let cube = cube();
        assert!(baker.set_receiver(&floor));
        assert_eq!(baker.register_surfaces(&[cube.clone(), floor.clone()]), 2);
        Fixture {
            renderer,
            baker,
            floor,
            cube,
        }
    }

    fn texel(texels: &[[f32; 4]], u: f32, v: f32) -> [f32; 4] {
        let x = ((u * RESOLUTION as f32) as u32).min(RESOLUTION - 1);
        let y = ((v * RESOLUTION as f32) as u32).min(RESOLUTION - 1);
        texels[(y * RESOLUTION + x) as usize]
    }

    /// Records which buffer each pass reads and which it writes.
    struct RecordingRenderer {
        inner: SoftwareRenderer,
        passes: Vec<(Option<RenderTargetId>, Option<RenderTargetId>)>,
        fail_renders: bool,
    }

    impl RecordingRenderer {
        fn new(width: u32, height: u32) -> Self {
            Self {
                inner: SoftwareRenderer::new(width, height),
                passes: Vec::new(),
                fail_renders: false,
            }
        }
    }

    impl RenderBackend for RecordingRenderer {
        fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> BakeResult<RenderTargetId> {
            self.inner.create_render_target(desc)
        }
        fn dispose_render_target(&mut self, target: RenderTargetId) {
            self.inner.dispose_render_target(target)
        }
        fn set_render_target(&mut self, target: Option<RenderTargetId>) {
            self.inner.set_render_target(target)
        }
        fn render_target(&self) -> Option<RenderTargetId> {
            self.inner.render_target()
        }
        fn clear(&mut self) -> BakeResult<()> {
            self.inner.clear()
        }
        fn render(&mut self, scene: &Scene, camera: &Camera) -> BakeResult<()> {
            if self.fail_renders {
                return Err(BakeError::UnsupportedFormat(TextureFormat::Rgba32Float));
            }
            let previous = scene.meshes().iter().find_map(|mesh| {
                match &*mesh.read().unwrap().material().read().unwrap() {
                    Material::Accumulation(m) => m.previous_shadow_map,
                    _ => None,
                }
            });
            self.passes.push((previous, self.inner.render_target()));
            self.inner.render(scene, camera)
        }
        fn read_render_target_pixels(
            &mut self,
            target: RenderTargetId,
            x: u32,
            y: u32,
            width: u32,
            height: u32,
        ) -> BakeResult<Vec<[f32; 4]>> {
            self.inner.read_render_target_pixels(target, x, y, width, height)
        }
        fn render_target_size(&self, target: RenderTargetId) -> Option<(u32, u32)> {
            self.inner.render_target_size(target)
        }
    }

    #[test]
    fn test_idle_until_update() {
        let mut f = fixture(4);
        assert_eq!(f.baker.state(), BakeState::Idle);
        f.baker.tick(&mut f.renderer).unwrap();
        assert_eq!(f.baker.frame_index(), 0);
        f.baker.update(&mut f.renderer).unwrap();
        assert_eq!(f.baker.state(), BakeState::Accumulating);
    }

    #[test]
    fn test_register_before_initialize_is_ignored() {
        let mut baker = LightMapBaker::new(config(4));
        assert_eq!(baker.register_surfaces(&[cube()]), 0);
        assert_eq!(baker.register_surfaces(&[cube()]), 0);
        assert_eq!(baker.tracked_count(), 0);
        assert_eq!(baker.state(), BakeState::Idle);
    }

    #[test]
    fn test_receiver_needs_uvs() {
        let mut baker = LightMapBaker::new(config(4));
        let bare = Mesh::new(
            BufferGeometry::new().with_positions(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]),
            Material::from(StandardMaterial::new()).into_ref(),
        )
        .into_ref();
        assert!(!baker.set_receiver(&bare));
    }

    #[test]
    fn test_receiver_material_swapped_and_released() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let mut baker = LightMapBaker::new(config(4));
        baker.initialize(&mut renderer).unwrap();
        let floor = floor();
        let original = floor.read().unwrap().material().clone();
        baker.set_receiver(&floor);
        assert!(Arc::ptr_eq(floor.read().unwrap().material(), baker.shadow_catcher_material()));
        baker.dispose(&mut renderer);
        assert!(Arc::ptr_eq(floor.read().unwrap().material(), &original));
        assert!(!baker.is_initialized());
    }

    #[test]
    fn test_clear_zeroes_both_buffers() {
        let mut f = fixture(10);
        f.baker.update(&mut f.renderer).unwrap();
        for _ in 0..5 {
            f.baker.tick(&mut f.renderer).unwrap();
        }
        assert!(f.baker.read_accumulation_texels(&mut f.renderer).unwrap().iter().any(|t| t[0] > 0.0));

        f.baker.clear(&mut f.renderer).unwrap();
        assert_eq!(f.baker.frame_index(), 0);
        assert_eq!(f.baker.materials().with_shadow_catcher(|c| c.alpha_test), Some(0.0));
        for target in f.baker.accumulation_buffers().unwrap().targets() {
            let texels = f
                .renderer
                .read_render_target_pixels(target, 0, 0, RESOLUTION, RESOLUTION)
                .unwrap();
            assert!(texels.iter().all(|t| *t == [0.0; 4]));
        }
        assert!(f.baker.enabled());
    }

    #[test]
    fn test_fade_in_is_monotonic() {
        let mut f = fixture(12);
        f.baker.set_fade_in_alpha_test(0.8);
        f.baker.update(&mut f.renderer).unwrap();
        let mut alphas = Vec::new();
        while !f.baker.is_complete() {
            f.baker.tick(&mut f.renderer).unwrap();
            alphas.push(f.baker.materials().with_shadow_catcher(|c| c.alpha_test).unwrap());
        }
        assert_eq!(alphas.len(), 12);
        assert_eq!(alphas[0], 0.0);
        assert_eq!(alphas[1], 0.0);
        assert!(alphas.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(alphas[11], 0.8);
    }

    #[test]
    fn test_short_budgets() {
        let baker = LightMapBaker::new(config(3).fade_in_alpha_test(0.5));
        assert_eq!(baker.fade_in_alpha_test_at(1), 0.0);
        assert_eq!(baker.fade_in_alpha_test_at(2), 0.5);

        let mut f = fixture(1);
        f.baker.update(&mut f.renderer).unwrap();
        f.baker.tick(&mut f.renderer).unwrap();
        assert!(f.baker.is_complete());
        assert_eq!(f.baker.progress(), 100.0);
    }

    #[test]
    fn test_buffers_alternate_between_passes() {
        let mut renderer = RecordingRenderer::new(4, 4);
        let mut baker = LightMapBaker::new(config(6));
        baker.initialize(&mut renderer).unwrap();
        let floor = floor();
        let cube = cube();
        baker.set_receiver(&floor);
        baker.register_surfaces(&[cube.clone()]);
        baker.update(&mut renderer).unwrap();
        for _ in 0..6 {
            baker.tick(&mut renderer).unwrap();
        }

        assert_eq!(renderer.passes.len(), 6);
        for pair in renderer.passes.windows(2) {
            let (_, written) = pair[0];
            let (read, _) = pair[1];
            assert!(written.is_some());
            assert_eq!(read, written);
        }
        for (read, written) in &renderer.passes {
            assert_ne!(read, written);
        }
    }

    #[test]
    fn test_failed_pass_keeps_fade_in() {
        let mut renderer = RecordingRenderer::new(4, 4);
        let mut baker = LightMapBaker::new(config(6).fade_in_alpha_test(0.9));
        baker.initialize(&mut renderer).unwrap();
        let floor = floor();
        baker.set_receiver(&floor);
        baker.register_surfaces(&[cube()]);
        baker.update(&mut renderer).unwrap();
        for _ in 0..3 {
            baker.tick(&mut renderer).unwrap();
        }
        let alpha_test = |baker: &LightMapBaker| baker.materials().with_shadow_catcher(|c| c.alpha_test).unwrap();
        let before = alpha_test(&baker);
        assert_eq!(before, baker.fade_in_alpha_test_at(2));

        renderer.fail_renders = true;
        assert!(baker.tick(&mut renderer).is_err());
        assert_eq!(baker.frame_index(), 3);
        assert_eq!(alpha_test(&baker), before);

        renderer.fail_renders = false;
        baker.tick(&mut renderer).unwrap();
        assert_eq!(baker.frame_index(), 4);
        assert_eq!(alpha_test(&baker), baker.fade_in_alpha_test_at(3));
        assert!(alpha_test(&baker) > before);
    }

    #[test]
    fn test_no_receiver_is_idle() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let mut baker = LightMapBaker::new(config(3));
        baker.initialize(&mut renderer).unwrap();
        baker.update(&mut renderer).unwrap();
        assert_eq!(baker.state(), BakeState::Idle);
        assert!(!baker.is_complete());

        let floor = floor();
        assert!(baker.set_receiver(&floor));
        assert_eq!(baker.state(), BakeState::Accumulating);
        drop(floor);
        assert_eq!(baker.state(), BakeState::Idle);
        baker.tick(&mut renderer).unwrap();
        assert_eq!(baker.frame_index(), 0);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut f = fixture(5);
        f.baker.update(&mut f.renderer).unwrap();
        for _ in 0..5 {
            f.baker.tick(&mut f.renderer).unwrap();
        }
        assert!(f.baker.is_complete());

        let [a, b] = f.baker.accumulation_buffers().unwrap().targets();
        let snapshot = |r: &mut SoftwareRenderer| {
            (
                r.read_render_target_pixels(a, 0, 0, RESOLUTION, RESOLUTION).unwrap(),
                r.read_render_target_pixels(b, 0, 0, RESOLUTION, RESOLUTION).unwrap(),
            )
        };
        let before = snapshot(&mut f.renderer);
        let progress = f.baker.progress();
        for _ in 0..3 {
            f.baker.tick(&mut f.renderer).unwrap();
        }
        assert_eq!(snapshot(&mut f.renderer), before);
        assert_eq!(f.baker.frame_index(), 5);
        assert_eq!(f.baker.progress(), progress);
    }

    #[test]
    fn test_passes_leave_scene_untouched() {
        let mut f = fixture(3);
        let material = f.cube.read().unwrap().material().clone();
        f.baker.update(&mut f.renderer).unwrap();
        for _ in 0..3 {
            f.baker.tick(&mut f.renderer).unwrap();
            let cube = f.cube.read().unwrap();
            assert!(Arc::ptr_eq(cube.material(), &material));
            assert!(cube.frustum_culled);
            let floor = f.floor.read().unwrap();
            assert!(Arc::ptr_eq(floor.material(), f.baker.shadow_catcher_material()));
        }
    }

    #[test]
    fn test_disabled_baker_pauses() {
        let mut f = fixture(5);
        f.baker.update(&mut f.renderer).unwrap();
        f.baker.tick(&mut f.renderer).unwrap();
        f.baker.set_enabled(false);
        f.baker.tick(&mut f.renderer).unwrap();
        assert_eq!(f.baker.frame_index(), 1);
        assert_eq!(f.baker.state(), BakeState::Idle);
        f.baker.set_enabled(true);
        f.baker.tick(&mut f.renderer).unwrap();
        assert_eq!(f.baker.frame_index(), 2);
    }

    #[test]
    fn test_export_empty_then_png() {
        let mut f = fixture(2);
        assert!(f.baker.export_accumulation_texture(&mut f.renderer).unwrap().is_none());
        f.baker.update(&mut f.renderer).unwrap();
        f.baker.tick(&mut f.renderer).unwrap();
        let png = f.baker.export_accumulation_texture(&mut f.renderer).unwrap().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_export_requires_initialize() {
        let baker = LightMapBaker::new(config(2));
        let mut renderer = SoftwareRenderer::new(4, 4);
        assert!(matches!(
            baker.export_accumulation_texture(&mut renderer),
            Err(BakeError::NotInitialized)
        ));
    }

    #[test]
    fn test_plane_and_cube_bake() {
        let mut f = fixture(40);
        f.baker.update(&mut f.renderer).unwrap();
        for _ in 0..40 {
            f.baker.tick(&mut f.renderer).unwrap();
        }
        assert_eq!(f.baker.progress(), 100.0);
        assert!(f.baker.is_complete());

        let texels = f.baker.read_accumulation_texels(&mut f.renderer).unwrap();
        // Plane uv = ((x + 5) / 10, (z + 5) / 10).
        let under_cube = texel(&texels, 0.5, 0.5)[0];
        let open_ground = texel(&texels, 0.85, 0.85)[0];
        assert!(open_ground > 0.1, "open ground {open_ground}");
        assert!(under_cube < open_ground * 0.5, "{under_cube} vs {open_ground}");
    }

    #[test]
    fn test_pool_lights_stay_aimed_at_target() {
        let mut f = fixture(3);
        f.baker.update(&mut f.renderer).unwrap();
        f.baker.tick(&mut f.renderer).unwrap();
        assert_eq!(f.baker.lights().len(), 8);
        assert!(f.baker.lights().iter().all(|l| l.target == Vec3::ZERO && l.position.y >= -0.5));
    }
}
