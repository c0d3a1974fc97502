//! One bake pass and the scoped scene mutation around it.

use super::AccumulationBuffers;
use crate::camera::Camera;
use crate::core::{BakeResult, RenderBackend};
use crate::geometry::Attribute;
use crate::light::LightSampler;
use crate::material::{AccumulationMaterial, DiscardMaterial, Material, MaterialRef, ShadowCatcherMaterial};
use crate::scene::{Mesh, MeshRef, Scene};
use glam::Vec3;
use rand::Rng;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

fn read_lock(mesh: &MeshRef) -> RwLockReadGuard<'_, Mesh> {
    mesh.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock(mesh: &MeshRef) -> RwLockWriteGuard<'_, Mesh> {
    mesh.write().unwrap_or_else(PoisonError::into_inner)
}

/// The three materials the baker swaps onto surfaces.
#[derive(Debug, Clone)]
pub struct BakeMaterials {
    /// Worn by occluders during a pass.
    pub discard: MaterialRef,
    /// Worn by the receiver during a pass.
    pub accumulation: MaterialRef,
    /// Worn by the receiver between passes.
    pub shadow_catcher: MaterialRef,
}

impl Default for BakeMaterials {
    fn default() -> Self {
        Self {
            discard: Material::from(DiscardMaterial::new()).into_ref(),
            accumulation: Material::from(AccumulationMaterial::default()).into_ref(),
            shadow_catcher: Material::from(ShadowCatcherMaterial::default()).into_ref(),
        }
    }
}

impl BakeMaterials {
    /// Create fresh materials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the shadow catcher.
    pub fn with_shadow_catcher<T>(&self, f: impl FnOnce(&mut ShadowCatcherMaterial) -> T) -> Option<T> {
        match &mut *self.shadow_catcher.write().unwrap_or_else(PoisonError::into_inner) {
            Material::ShadowCatcher(catcher) => Some(f(catcher)),
            _ => None,
        }
    }

    /// Run `f` on the accumulation material.
    pub fn with_accumulation<T>(&self, f: impl FnOnce(&mut AccumulationMaterial) -> T) -> Option<T> {
        match &mut *self.accumulation.write().unwrap_or_else(PoisonError::into_inner) {
            Material::Accumulation(accumulation) => Some(f(accumulation)),
            _ => None,
        }
    }
}

/// Weakly held surfaces taking part in bake passes.
#[derive(Debug, Default)]
pub struct TrackedSurfaces {
    surfaces: Vec<Weak<RwLock<Mesh>>>,
}

fn has_positions(mesh: &Mesh) -> bool {
    mesh.geometry().has_attribute(Attribute::Position)
}

impl TrackedSurfaces {
    /// Track a mesh. Meshes without positions are skipped with a warning.
    pub fn register(&mut self, mesh: &MeshRef) -> bool {
        {
            let guard = read_lock(mesh);
            if !has_positions(&guard) {
                log::warn!("Surface '{}' has no position attribute and will not be baked", guard.name());
                return false;
            }
        }
        let weak = Arc::downgrade(mesh);
        if !self.surfaces.iter().any(|w| w.ptr_eq(&weak)) {
            self.surfaces.push(weak);
        }
        true
    }

    /// Live surfaces for the next pass.
    ///
    /// Dropped meshes are pruned. Meshes whose geometry lost its positions
    /// are warned about and untracked.
    pub fn collect(&mut self) -> Vec<MeshRef> {
        let mut live = Vec::with_capacity(self.surfaces.len());
        self.surfaces.retain(|weak| {
            let Some(mesh) = weak.upgrade() else {
                return false;
            };
            {
                let guard = read_lock(&mesh);
                if !has_positions(&guard) {
                    log::warn!("Surface '{}' lost its position attribute; untracking it", guard.name());
                    return false;
                }
            }
            live.push(mesh);
            true
        });
        live
    }

    /// Number of tracked entries, including ones not yet pruned.
    #[inline]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Whether nothing is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Forget every surface.
    pub fn clear(&mut self) {
        self.surfaces.clear();
    }
}

struct SavedSurface {
    mesh: MeshRef,
    material: MaterialRef,
    frustum_culled: bool,
}

/// Scene mutation for the duration of one render call.
///
/// Entering swaps the discard material onto every occluder, turns their
/// frustum culling off, puts the accumulation material on the receiver and
/// attaches everything to the bake scene. Dropping the scope undoes all of
/// it and leaves the shadow catcher on the receiver, whether or not the
/// render succeeded.
pub struct BakeScope<'a> {
    scene: &'a mut Scene,
    saved: Vec<SavedSurface>,
    receiver: MeshRef,
    receiver_material: MaterialRef,
}

impl<'a> BakeScope<'a> {
    /// Apply the bake-time materials.
    pub fn enter(scene: &'a mut Scene, receiver: &MeshRef, surfaces: &[MeshRef], materials: &BakeMaterials) -> Self {
        let mut saved = Vec::with_capacity(surfaces.len());
        for mesh in surfaces.iter().filter(|m| !Arc::ptr_eq(m, receiver)) {
            {
                let mut guard = write_lock(mesh);
                let material = guard.set_material(materials.discard.clone());
                saved.push(SavedSurface {
                    mesh: mesh.clone(),
                    material,
                    frustum_culled: guard.frustum_culled,
                });
                guard.frustum_culled = false;
            }
            scene.add(mesh.clone());
        }
        write_lock(receiver).set_material(materials.accumulation.clone());
        scene.add(receiver.clone());

        Self {
            scene,
            saved,
            receiver: receiver.clone(),
            receiver_material: materials.shadow_catcher.clone(),
        }
    }

    /// The bake scene with everything attached.
    #[inline]
    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Mutable bake scene.
    #[inline]
    pub fn scene_mut(&mut self) -> &mut Scene {
        self.scene
    }

    /// Number of occluders swapped to the discard material.
    #[inline]
    pub fn occluder_count(&self) -> usize {
        self.saved.len()
    }
}

impl Drop for BakeScope<'_> {
    fn drop(&mut self) {
        // LIFO so a mesh listed twice ends up with its first-saved state.
        while let Some(saved) = self.saved.pop() {
            {
                let mut guard = write_lock(&saved.mesh);
                guard.set_material(saved.material);
                guard.frustum_culled = saved.frustum_culled;
            }
            self.scene.remove_ref(&saved.mesh);
        }
        write_lock(&self.receiver).set_material(self.receiver_material.clone());
        self.scene.remove_ref(&self.receiver);
    }
}

/// Light placement and blending parameters for one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassParams {
    /// Center of the local jitter.
    pub light_origin: Vec3,
    /// Edge of the jitter cube.
    pub light_jitter_radius: f32,
    /// Probability of a sky sample.
    pub ambient_weight: f32,
    /// Running-average window.
    pub blend_window: f32,
}

/// Inputs of one bake pass.
pub struct BakePass<'a> {
    /// Surface wearing the shadow catcher.
    pub receiver: &'a MeshRef,
    /// Occluders (the receiver may be listed too; it is skipped).
    pub surfaces: &'a [MeshRef],
    /// Materials to swap in.
    pub materials: &'a BakeMaterials,
    /// Light and blend parameters.
    pub params: PassParams,
}

impl BakePass<'_> {
    /// Render one pass into the back buffer and swap buffer roles.
    ///
    /// `scene` is the baker's isolated bake scene holding the light pool.
    /// On a render error the scene is restored, the buffers keep their roles
    /// and the error is returned.
    pub fn run<B, R>(
        &self,
        renderer: &mut B,
        scene: &mut Scene,
        camera: &Camera,
        buffers: &mut AccumulationBuffers,
        sampler: &mut LightSampler<R>,
    ) -> BakeResult<()>
    where
        B: RenderBackend + ?Sized,
        R: Rng,
    {
        let front = buffers.front();
        let back = buffers.back();
        self.materials.with_accumulation(|accumulation| {
            accumulation.previous_shadow_map = Some(front);
            accumulation.averaging_window = self.params.blend_window;
        });

        let result = {
            let mut scope = BakeScope::enter(scene, self.receiver, self.surfaces, self.materials);
            sampler.resample(
                scope.scene_mut().lights_mut(),
                self.params.light_origin,
                self.params.light_jitter_radius,
                self.params.ambient_weight,
            );
            let previous = renderer.render_target();
            renderer.set_render_target(Some(back));
            let result = renderer.clear().and_then(|()| renderer.render(scope.scene(), camera));
            renderer.set_render_target(previous);
            log::trace!("Bake pass {front} -> {back} with {} occluders", scope.occluder_count());
            result
        };
        result?;

        self.materials.with_shadow_catcher(|catcher| catcher.map = Some(back));
        buffers.swap();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrthographicCamera;
    use crate::core::{BakeError, RenderTargetDescriptor, RenderTargetId, TextureFormat};
    use crate::geometry::{BoxGeometry, BufferGeometry, PlaneGeometry};
    use crate::light::ShadowSettings;
    use crate::material::StandardMaterial;
    use crate::software::SoftwareRenderer;

    fn mesh(geometry: BufferGeometry, name: &str) -> MeshRef {
        Mesh::new(geometry, Material::from(StandardMaterial::new()).into_ref())
            .with_name(name)
            .into_ref()
    }

    fn params() -> PassParams {
        PassParams {
            light_origin: Vec3::new(3.0, 8.0, 5.0),
            light_jitter_radius: 1.0,
            ambient_weight: 0.5,
            blend_window: 4.0,
        }
    }

    /// Fails every render after checking the scope was applied.
    struct FailingRenderer {
        inner: SoftwareRenderer,
        observed: Vec<(bool, bool)>,
    }

    impl RenderBackend for FailingRenderer {
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
        fn render(&mut self, scene: &Scene, _camera: &Camera) -> BakeResult<()> {
            for mesh in scene.meshes() {
                let guard = mesh.read().unwrap();
                let discarding = matches!(&*guard.material().read().unwrap(), Material::Discard(_));
                self.observed.push((discarding, guard.frustum_culled));
            }
            Err(BakeError::UnsupportedFormat(TextureFormat::Rgba16Float))
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
    fn test_tracking_skips_surfaces_without_positions() {
        let mut tracked = TrackedSurfaces::default();
        let empty = mesh(BufferGeometry::new(), "empty");
        let cube = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "cube");
        assert!(!tracked.register(&empty));
        assert!(tracked.register(&cube));
        assert!(tracked.register(&cube));
        assert_eq!(tracked.len(), 1);
    }

    #[test]
    fn test_collect_prunes_dropped_and_invalid() {
        let mut tracked = TrackedSurfaces::default();
        let keep = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "keep");
        let gone = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "gone");
        let stripped = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "stripped");
        tracked.register(&keep);
        tracked.register(&gone);
        tracked.register(&stripped);
        drop(gone);
        stripped.write().unwrap().set_geometry(BufferGeometry::new());

        let live = tracked.collect();
        assert_eq!(live.len(), 1);
        assert!(Arc::ptr_eq(&live[0], &keep));
        assert_eq!(tracked.len(), 1);
    }

    #[test]
    fn test_scope_restores_on_drop() {
        let materials = BakeMaterials::new();
        let receiver = mesh(PlaneGeometry::new(4.0, 4.0).build(), "floor");
        let cube = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "cube");
        let loose = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "loose");
        loose.write().unwrap().frustum_culled = false;
        let cube_material = cube.read().unwrap().material().clone();
        let loose_material = loose.read().unwrap().material().clone();

        let mut scene = Scene::new();
        {
            let scope = BakeScope::enter(
                &mut scene,
                &receiver,
                &[cube.clone(), receiver.clone(), loose.clone()],
                &materials,
            );
            assert_eq!(scope.occluder_count(), 2);
            assert_eq!(scope.scene().mesh_count(), 3);
            assert!(Arc::ptr_eq(cube.read().unwrap().material(), &materials.discard));
            assert!(!cube.read().unwrap().frustum_culled);
            assert!(Arc::ptr_eq(receiver.read().unwrap().material(), &materials.accumulation));
        }

        assert_eq!(scene.mesh_count(), 0);
        assert!(Arc::ptr_eq(cube.read().unwrap().material(), &cube_material));
        assert!(cube.read().unwrap().frustum_culled);
        assert!(Arc::ptr_eq(loose.read().unwrap().material(), &loose_material));
        assert!(!loose.read().unwrap().frustum_culled);
        assert!(Arc::ptr_eq(receiver.read().unwrap().material(), &materials.shadow_catcher));
    }

    #[test]
    fn test_duplicate_surface_restored_to_original() {
        let materials = BakeMaterials::new();
        let receiver = mesh(PlaneGeometry::new(4.0, 4.0).build(), "floor");
        let cube = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "cube");
        let original = cube.read().unwrap().material().clone();
        let mut scene = Scene::new();
        drop(BakeScope::enter(&mut scene, &receiver, &[cube.clone(), cube.clone()], &materials));
        assert!(Arc::ptr_eq(cube.read().unwrap().material(), &original));
        assert!(cube.read().unwrap().frustum_culled);
    }

    #[test]
    fn test_failed_render_restores_and_keeps_roles() {
        let materials = BakeMaterials::new();
        let receiver = mesh(PlaneGeometry::new(4.0, 4.0).build(), "floor");
        let cube = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), "cube");
        let original = cube.read().unwrap().material().clone();

        let mut renderer = FailingRenderer {
            inner: SoftwareRenderer::new(4, 4),
            observed: Vec::new(),
        };
        let mut buffers = AccumulationBuffers::allocate(&mut renderer, 8, TextureFormat::Rgba32Float).unwrap();
        let mut scene = Scene::new();
        scene.set_lights(LightSampler::create_pool(2, Vec3::ZERO, ShadowSettings::default()));
        let mut sampler = LightSampler::seeded(1);
        let camera = Camera::from(OrthographicCamera::symmetric(1.0, 0.1, 10.0));

        let pass = BakePass {
            receiver: &receiver,
            surfaces: &[cube.clone()],
            materials: &materials,
            params: params(),
        };
        let front = buffers.front();
        assert!(pass.run(&mut renderer, &mut scene, &camera, &mut buffers, &mut sampler).is_err());

        assert_eq!(buffers.front(), front);
        assert_eq!(renderer.render_target(), None);
        assert!(renderer.observed.contains(&(true, false)));
        assert!(Arc::ptr_eq(cube.read().unwrap().material(), &original));
        assert!(cube.read().unwrap().frustum_culled);
        assert_eq!(scene.mesh_count(), 0);
    }

    #[test]
    fn test_pass_wires_buffers() {
        let materials = BakeMaterials::new();
        let receiver = mesh(PlaneGeometry::new(4.0, 4.0).build(), "floor");
        let mut renderer = SoftwareRenderer::new(4, 4);
        let mut buffers = AccumulationBuffers::allocate(&mut renderer, 8, TextureFormat::Rgba32Float).unwrap();
        let mut scene = Scene::new();
        scene.set_lights(LightSampler::create_pool(2, Vec3::ZERO, ShadowSettings::default()));
        let mut sampler = LightSampler::seeded(5);
        let camera = Camera::from(OrthographicCamera::symmetric(1.0, 0.1, 10.0));
        let [a, b] = buffers.targets();

        let pass = BakePass {
            receiver: &receiver,
            surfaces: &[],
            materials: &materials,
            params: params(),
        };
        pass.run(&mut renderer, &mut scene, &camera, &mut buffers, &mut sampler).unwrap();

        assert_eq!(buffers.front(), b);
        assert_eq!(materials.with_accumulation(|m| m.previous_shadow_map), Some(Some(a)));
        assert_eq!(materials.with_accumulation(|m| m.averaging_window), Some(4.0));
        assert_eq!(materials.with_shadow_catcher(|m| m.map), Some(Some(b)));
        let lit = renderer.read_render_target_pixels(b, 4, 4, 1, 1).unwrap();
        assert!(lit[0][0] > 0.0);
    }
}
