//! Bake a soft contact shadow under a cube and write the light map as PNG.
//!
//! ```text
//! cargo run --example headless_bake -- [output.png] [--gpu]
//! ```

use penumbra::prelude::*;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let use_gpu = args.iter().any(|a| a == "--gpu");
    let output = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "lightmap.png".to_string());

    let mut renderer: Box<dyn RenderBackend> = if use_gpu {
        Box::new(GpuRenderer::headless(512, 512)?)
    } else {
        Box::new(SoftwareRenderer::new(512, 512))
    };

    let ground = {
        let mut mesh = Mesh::new(
            PlaneGeometry::new(10.0, 10.0).build(),
            Material::from(StandardMaterial::new()).into_ref(),
        )
        .with_name("ground");
        mesh.cast_shadow = false;
        mesh.into_ref()
    };
    let cube = {
        let mut mesh = Mesh::new(
            BoxGeometry::new(2.0, 2.0, 2.0).build(),
            Material::from(StandardMaterial::with_color(Color::from_hex(0xd08040))).into_ref(),
        )
        .with_name("cube");
        mesh.set_position(0.0, 1.0, 0.0);
        mesh.into_ref()
    };

    let mut scene = Scene::new();
    scene.add(ground.clone());
    scene.add(cube.clone());
    scene.add_light(DirectionalLight::new(Color::WHITE, 1.0).with_position(Vec3::new(3.0, 8.0, 5.0)));

    let config = BakeConfig::new()
        .resolution(256)
        .frame_budget(60)
        .blend_window(60.0)
        .shadow(ShadowSettings::new().map_size(512).camera_extent(8.0));
    let mut baker = LightMapBaker::new(config);
    baker.initialize(renderer.as_mut())?;
    if !baker.set_receiver(&ground) {
        return Err("ground plane cannot receive a light map".into());
    }
    baker.register_surfaces(&[cube, ground]);
    baker.update(renderer.as_mut())?;

    let camera: Camera = PerspectiveCamera::new(50.0, 1.0, 0.1, 100.0)
        .with_position(Vec3::new(6.0, 6.0, 8.0))
        .looking_at(Vec3::ZERO)
        .into();

    while !baker.is_complete() {
        baker.tick(renderer.as_mut())?;
        renderer.set_render_target(None);
        renderer.clear()?;
        renderer.render(&scene, &camera)?;
    }
    log::info!("Baked {} passes ({}%)", baker.frame_index(), baker.progress());

    match baker.export_accumulation_texture(renderer.as_mut())? {
        Some(png) => {
            std::fs::write(&output, png)?;
            log::info!("Wrote {output}");
        }
        None => log::warn!("Light map is empty; nothing written"),
    }

    baker.dispose(renderer.as_mut());
    Ok(())
}
