//! Cascaded shadow maps for the first directional light.
//!
//! The camera depth range (capped at the max shadow distance) is split into
//! `CASCADE_COUNT` slices with the practical split scheme. Each slice is
//! wrapped in a bounding sphere and rendered with an orthographic light
//! projection sized to that sphere, so the projection only depends on the
//! slice's extent and not on the camera orientation. Sphere radii are
//! quantized and centres snapped to the shadow-map texel grid to keep
//! shadow edges from shimmering while the camera moves.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::asset::{Assets, Handle};
use crate::error::{RenderError, Result};
use crate::renderer::device::{
    ClearValues, DepthState, FrameBuffer, FrameBufferDescriptor, GraphicsDevice, RasterState,
    RenderTarget, Shader, Viewport,
};
use crate::renderer::draw::{self, SavedState};
use crate::renderer::frustum::Frustum;
use crate::renderer::scene_data::{CameraData, SceneRenderData};
use crate::renderer::uniforms;
use crate::renderer::Texture;
use crate::scene::Sphere;

pub const CASCADE_COUNT: usize = 4;

pub const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Radii are rounded up to this step so small camera rotations do not
/// change the projection size.
const RADIUS_QUANTUM: f32 = 1.0 / 16.0;

/// Split positions as fractions of `[z_near, z_far]`, `0` first and `1` last.
///
/// `lambda` blends the uniform split (`lambda = 1`) with the logarithmic
/// split (`lambda = 0`). Degenerate ranges fall back to uniform splits.
pub fn compute_split_fractions(z_near: f32, z_far: f32, lambda: f32) -> [f32; CASCADE_COUNT + 1] {
    let mut fractions = [0.0; CASCADE_COUNT + 1];
    fractions[CASCADE_COUNT] = 1.0;

    let lambda = if lambda.is_finite() {
        f64::from(lambda.clamp(0.0, 1.0))
    } else {
        1.0
    };
    let near = f64::from(z_near);
    let far = f64::from(z_far);
    let valid = near > 0.0 && far > near && far.is_finite();
    if !valid {
        log::warn!(
            "Invalid cascade depth range [{}, {}]; using uniform splits",
            z_near,
            z_far
        );
    }

    for (i, fraction) in fractions
        .iter_mut()
        .enumerate()
        .take(CASCADE_COUNT)
        .skip(1)
    {
        let p = i as f64 / CASCADE_COUNT as f64;
        if !valid {
            *fraction = p as f32;
            continue;
        }
        let logarithmic = near * (far / near).powf(p);
        let uniform = near + (far - near) * p;
        let depth = lambda * uniform + (1.0 - lambda) * logarithmic;
        *fraction = ((depth - near) / (far - near)) as f32;
    }

    fractions
}

/// Orthographic light view and projection enclosing `sphere`, with the sphere
/// centre snapped to the texel grid of a `shadow_map_size` map.
pub fn light_view_projection(sphere: &Sphere, direction: Vec3, shadow_map_size: u32) -> (Mat4, Mat4) {
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let up = if direction.y.abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let radius = sphere.radius.max(RADIUS_QUANTUM);
    let texel = 2.0 * radius / shadow_map_size.max(1) as f32;

    let light_rotation = Mat4::look_to_rh(Vec3::ZERO, direction, up);
    let center_ls = light_rotation.transform_point3(sphere.center);
    let snapped_ls = Vec3::new(
        (center_ls.x / texel).floor() * texel,
        (center_ls.y / texel).floor() * texel,
        center_ls.z,
    );
    let center = light_rotation.inverse().transform_point3(snapped_ls);

    let eye = center - direction * radius;
    let view = Mat4::look_to_rh(eye, direction, up);
    let half = radius + texel;
    let projection = Mat4::orthographic_rh(-half, half, -half, half, 0.0, 2.0 * radius);
    (view, projection)
}

/// Working state of one cascade, rebuilt in place every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsmSplit {
    /// Depth fractions of the camera's `[near, far]` range.
    pub near: f32,
    pub far: f32,
    pub frustum: Frustum,
    pub sphere: Sphere,
    pub light_view: Mat4,
    pub light_projection: Mat4,
    pub light_view_proj: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCascade {
    /// Far edge as a fraction of the camera depth range, in `(0, 1]`.
    pub far_depth: f32,
    /// Far edge as a view-space distance from the camera.
    pub far_distance: f32,
    pub view_proj: Mat4,
    pub depth_texture: Handle<Texture>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadedShadowMap {
    pub cascades: [ShadowCascade; CASCADE_COUNT],
    pub z_near: f32,
    pub z_far: f32,
    pub light_direction: Vec3,
}

/// `ShadowCascades` uniform block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CascadesUniform {
    pub view_proj: [[[f32; 4]; 4]; CASCADE_COUNT],
    pub far_depths: [f32; CASCADE_COUNT],
    pub far_distances: [f32; CASCADE_COUNT],
    /// Light direction in xyz, cascade count in w.
    pub light_direction: [f32; 4],
}

impl CascadesUniform {
    pub fn from_shadow_map(map: &CascadedShadowMap) -> Self {
        let mut uniform = Self::zeroed();
        for (i, cascade) in map.cascades.iter().enumerate() {
            uniform.view_proj[i] = cascade.view_proj.to_cols_array_2d();
            uniform.far_depths[i] = cascade.far_depth;
            uniform.far_distances[i] = cascade.far_distance;
        }
        uniform.light_direction = map.light_direction.extend(CASCADE_COUNT as f32).to_array();
        uniform
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsmConfig {
    pub shadow_map_size: u32,
    pub split_lambda: f32,
    /// View depth past which nothing is shadowed; `None` uses the camera far plane.
    pub max_shadow_distance: Option<f32>,
    pub depth_bias: wgpu::DepthBiasState,
}

impl Default for CsmConfig {
    fn default() -> Self {
        Self {
            shadow_map_size: 2048,
            split_lambda: 0.5,
            max_shadow_distance: None,
            depth_bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }
    }
}

pub struct CsmGenerator {
    config: CsmConfig,
    shader: Handle<Shader>,
    frame_buffers: [Handle<FrameBuffer>; CASCADE_COUNT],
    camera_frustum: Frustum,
    splits: [CsmSplit; CASCADE_COUNT],
    shadow_map: CascadedShadowMap,
    draw_count: usize,
}

impl CsmGenerator {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        shader: Handle<Shader>,
        config: CsmConfig,
    ) -> Result<Self> {
        let size = config.shadow_map_size.max(1);
        let mut frame_buffers = [Handle::new(0); CASCADE_COUNT];
        let mut cascades = [ShadowCascade {
            far_depth: 1.0,
            far_distance: 0.0,
            view_proj: Mat4::IDENTITY,
            depth_texture: Handle::new(0),
        }; CASCADE_COUNT];

        for (i, (frame_buffer, cascade)) in frame_buffers.iter_mut().zip(&mut cascades).enumerate() {
            *frame_buffer = device.create_frame_buffer(&FrameBufferDescriptor {
                label: format!("ShadowCascade{i}"),
                width: size,
                height: size,
                color_formats: Vec::new(),
                depth_format: Some(SHADOW_DEPTH_FORMAT),
            });
            cascade.depth_texture = device.depth_texture(*frame_buffer)?;
        }

        log::info!(
            "Created {} shadow cascades at {}x{} (lambda {}, max distance {:?})",
            CASCADE_COUNT,
            size,
            size,
            config.split_lambda,
            config.max_shadow_distance
        );

        Ok(Self {
            config,
            shader,
            frame_buffers,
            camera_frustum: Frustum::default(),
            splits: [CsmSplit::default(); CASCADE_COUNT],
            shadow_map: CascadedShadowMap {
                cascades,
                z_near: 0.0,
                z_far: 0.0,
                light_direction: Vec3::NEG_Y,
            },
            draw_count: 0,
        })
    }

    pub fn config(&self) -> &CsmConfig {
        &self.config
    }

    pub fn splits(&self) -> &[CsmSplit; CASCADE_COUNT] {
        &self.splits
    }

    /// Result of the most recent `compute_cascades`.
    pub fn shadow_map(&self) -> &CascadedShadowMap {
        &self.shadow_map
    }

    /// Shadow draws issued by the last `generate_shadow_maps`.
    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Fits every cascade to the camera and light without touching the device.
    pub fn compute_cascades(&mut self, camera: &CameraData, light_direction: Vec3) {
        let z_near = camera.near();
        let z_far = camera.far();
        let shadow_far = self
            .config
            .max_shadow_distance
            .map_or(z_far, |distance| z_far.min(distance))
            .max(z_near);
        let range = (z_far - z_near).max(f32::EPSILON);
        let max_fraction = ((shadow_far - z_near) / range).clamp(f32::EPSILON, 1.0);
        let fractions =
            compute_split_fractions(z_near, shadow_far, self.config.split_lambda);

        self.camera_frustum.set_from_matrix(&camera.view_proj);
        let direction = light_direction.try_normalize().unwrap_or(Vec3::NEG_Y);

        for (i, split) in self.splits.iter_mut().enumerate() {
            split.near = fractions[i] * max_fraction;
            split.far = fractions[i + 1] * max_fraction;
            self.camera_frustum
                .clip_z(split.near, split.far, &mut split.frustum);

            let bounds = split.frustum.bounding_sphere();
            let radius = (bounds.radius / RADIUS_QUANTUM).ceil() * RADIUS_QUANTUM;
            split.sphere = Sphere::new(bounds.center, radius);

            let (view, projection) =
                light_view_projection(&split.sphere, direction, self.config.shadow_map_size);
            split.light_view = view;
            split.light_projection = projection;
            split.light_view_proj = projection * view;

            let cascade = &mut self.shadow_map.cascades[i];
            cascade.far_depth = split.far;
            cascade.far_distance = z_near + (z_far - z_near) * split.far;
            cascade.view_proj = split.light_view_proj;
        }

        self.shadow_map.z_near = z_near;
        self.shadow_map.z_far = shadow_far;
        self.shadow_map.light_direction = direction;
    }

    /// Renders depth for every cascade. `Ok(None)` when there is no
    /// directional light. Device state touched here is restored on return,
    /// including on error.
    pub fn generate_shadow_maps(
        &mut self,
        device: &mut dyn GraphicsDevice,
        data: &SceneRenderData,
        assets: &Assets,
    ) -> Result<Option<&CascadedShadowMap>> {
        self.draw_count = 0;
        let Some(light) = data.lights().shadow_caster() else {
            return Ok(None);
        };
        let camera = data.camera().ok_or(RenderError::MissingCamera)?;
        self.compute_cascades(camera, light.direction);

        let saved = SavedState::capture(device);
        let result = self.render_cascades(device, data, assets);
        saved.restore(device);

        self.draw_count = result?;
        Ok(Some(&self.shadow_map))
    }

    fn render_cascades(
        &self,
        device: &mut dyn GraphicsDevice,
        data: &SceneRenderData,
        assets: &Assets,
    ) -> Result<usize> {
        let size = self.config.shadow_map_size.max(1);
        device.set_viewport(Viewport::new(size, size));
        device.set_raster_state(RasterState {
            cull_mode: Some(wgpu::Face::Front),
            depth_bias: self.config.depth_bias,
            depth_clamp: true,
        });
        device.set_depth_state(DepthState::default());
        device.set_blend_state(None);
        device.bind_shader(self.shader)?;

        let mut draws = 0;
        for (split, frame_buffer) in self.splits.iter().zip(self.frame_buffers) {
            device.bind_frame_buffer(RenderTarget::FrameBuffer(frame_buffer))?;
            device.clear(&ClearValues::depth_only())?;
            device.set_uniform(uniforms::LIGHT_VIEW_PROJ, split.light_view_proj.into())?;

            for mesh_draw in data.mesh_draws(assets) {
                draw::set_transform_uniforms(device, mesh_draw.world, &split.light_view_proj)?;
                draw::draw_with_sidedness(device, &mesh_draw)?;
                draws += 1;
            }
        }
        device.unbind_frame_buffer();

        log::trace!("Shadow pass issued {} draws", draws);
        Ok(draws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Camera;

    fn camera_data() -> CameraData {
        let world = Mat4::look_at_rh(Vec3::new(3.0, 4.0, 10.0), Vec3::ZERO, Vec3::Y).inverse();
        CameraData::new(Camera::new(60f32.to_radians(), 0.5, 80.0), world, 16.0 / 9.0)
    }

    fn generator(config: CsmConfig) -> CsmGenerator {
        let mut device = crate::renderer::HeadlessDevice::new(64, 64);
        let shader = device.create_shader(&crate::renderer::device::ShaderDescriptor::new(
            "Shadow",
            crate::renderer::device::ShaderProgram::ShadowDepth,
        ));
        CsmGenerator::new(&mut device, shader, config).unwrap()
    }

    #[test]
    fn uniform_lambda_gives_even_splits() {
        let fractions = compute_split_fractions(0.1, 100.0, 1.0);
        for (i, fraction) in fractions.iter().enumerate() {
            assert!((fraction - i as f32 / CASCADE_COUNT as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_lambda_gives_logarithmic_splits() {
        let fractions = compute_split_fractions(1.0, 16.0, 0.0);
        // log split depths: 2, 4, 8
        assert!((fractions[1] - 1.0 / 15.0).abs() < 1e-6);
        assert!((fractions[2] - 3.0 / 15.0).abs() < 1e-6);
        assert!((fractions[3] - 7.0 / 15.0).abs() < 1e-6);
        assert_eq!(fractions[4], 1.0);
    }

    #[test]
    fn degenerate_range_falls_back_to_uniform() {
        assert_eq!(
            compute_split_fractions(5.0, 5.0, 0.3),
            [0.0, 0.25, 0.5, 0.75, 1.0]
        );
    }

    #[test]
    fn light_projection_encloses_sphere() {
        let sphere = Sphere::new(Vec3::new(3.3, -1.2, 7.9), 4.0);
        let direction = Vec3::new(-0.3, -1.0, 0.2).normalize();
        let (view, projection) = light_view_projection(&sphere, direction, 1024);
        let view_proj = projection * view;

        let extremes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for axis in extremes {
            let clip = view_proj.project_point3(sphere.center + axis * sphere.radius * 0.999);
            assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0, "{clip:?}");
            assert!((-1e-4..=1.0 + 1e-4).contains(&clip.z), "{clip:?}");
        }
    }

    #[test]
    fn vertical_light_uses_stable_up_axis() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0);
        let (view, _) = light_view_projection(&sphere, Vec3::NEG_Y, 512);
        assert!(view.is_finite());
    }

    #[test]
    fn snapping_is_stable_under_sub_texel_motion() {
        let direction = Vec3::new(0.4, -1.0, 0.1).normalize();
        let size = 256;
        let radius = 8.0;
        let texel = 2.0 * radius / size as f32;

        let light_rotation = Mat4::look_to_rh(Vec3::ZERO, direction, Vec3::Y);
        let base = light_rotation
            .inverse()
            .transform_point3(Vec3::new(10.25 * texel, 4.25 * texel, -3.0));
        let nudged = base + light_rotation.inverse().transform_vector3(Vec3::new(0.5 * texel, 0.5 * texel, 0.0));

        let (a, _) = light_view_projection(&Sphere::new(base, radius), direction, size);
        let (b, _) = light_view_projection(&Sphere::new(nudged, radius), direction, size);
        assert!(a.abs_diff_eq(b, 1e-3));
    }

    #[test]
    fn cascades_increase_and_end_at_one() {
        let mut generator = generator(CsmConfig::default());
        generator.compute_cascades(&camera_data(), Vec3::new(-0.5, -1.0, -0.3));

        let map = generator.shadow_map();
        let mut previous = 0.0;
        for cascade in &map.cascades {
            assert!(cascade.far_depth > previous);
            previous = cascade.far_depth;
        }
        assert!((previous - 1.0).abs() < 1e-6);
        assert!((map.cascades[CASCADE_COUNT - 1].far_distance - 80.0).abs() < 1e-3);
    }

    #[test]
    fn max_shadow_distance_caps_last_cascade() {
        let mut generator = generator(CsmConfig {
            max_shadow_distance: Some(40.5),
            ..CsmConfig::default()
        });
        generator.compute_cascades(&camera_data(), Vec3::NEG_Y);

        let last = generator.shadow_map().cascades[CASCADE_COUNT - 1];
        assert!((last.far_distance - 40.5).abs() < 1e-3);
        assert!(last.far_depth < 1.0);
        assert_eq!(generator.shadow_map().z_far, 40.5);
    }

    #[test]
    fn default_config_covers_the_whole_view_depth() {
        let mut generator = generator(CsmConfig::default());
        let world = Mat4::look_at_rh(Vec3::new(3.0, 4.0, 10.0), Vec3::ZERO, Vec3::Y).inverse();
        let aspect = 16.0 / 9.0;
        let camera = CameraData::new(Camera::new(60f32.to_radians(), 0.5, 500.0), world, aspect);
        generator.compute_cascades(&camera, Vec3::new(0.2, -1.0, 0.1));

        let last = generator.shadow_map().cascades[CASCADE_COUNT - 1];
        assert_eq!(last.far_depth, 1.0);
        assert!((last.far_distance - 500.0).abs() < 1e-2);

        let depth = 400.0;
        let half_height = 30f32.to_radians().tan() * depth;
        let half_width = half_height * aspect;
        for (x, y) in [(0.0, 0.0), (half_width, half_height), (-half_width, half_height)] {
            let point = world.transform_point3(Vec3::new(x, y, -depth));
            assert!(
                generator
                    .splits()
                    .iter()
                    .any(|split| split.sphere.contains_point(point, 1e-2)),
                "{point} at depth {depth} is not shadowed"
            );
        }
    }

    #[test]
    fn split_spheres_contain_their_slices() {
        let mut generator = generator(CsmConfig::default());
        generator.compute_cascades(&camera_data(), Vec3::new(0.2, -1.0, 0.0));
        for split in generator.splits() {
            for corner in split.frustum.corners {
                assert!(split.sphere.contains_point(corner, 1e-3));
            }
        }
    }

    #[test]
    fn cascades_uniform_packs_far_depths() {
        let mut generator = generator(CsmConfig::default());
        generator.compute_cascades(&camera_data(), Vec3::NEG_Y);
        let block = CascadesUniform::from_shadow_map(generator.shadow_map());
        let bytes = bytemuck::bytes_of(&block);
        let decoded: CascadesUniform = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(decoded.far_depths[CASCADE_COUNT - 1], 1.0);
        assert_eq!(decoded.light_direction[3], CASCADE_COUNT as f32);
    }
}
