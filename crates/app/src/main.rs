//! Headless driver for mini3d: import a mesh document, upload it and run the forward
//! passes of one material for a configurable set of lights.

use std::f32::consts::TAU;

use anyhow::{Context, Result};
use asset::{BufferFactory, ImportOutput, ObjImporter, TextureData, UvIndexing};
use corelib::{CameraState, Light, Mat4, Vec3};
use renderer::{
    BasicLightMaterial, ForwardRenderer, FrameState, Material, ProgramCache,
    RecordingBackend, TextureFactory, VertexLightMaterial, WgpuUploader, vertex_layout,
};

/// Used when no `--obj=` is given.
const DEFAULT_DOCUMENT: &str = "\
o quad
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1/1/1 2/2/2 3/3/3 4/4/4
";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MaterialChoice {
    Basic,
    Vertex,
}

#[derive(Debug)]
struct Options {
    obj: Option<String>,
    texture: Option<String>,
    scale: f32,
    lights: usize,
    material: MaterialChoice,
    uv: UvIndexing,
    /// `None` runs without a GPU.
    backend: Option<wgpu::Backends>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            obj: None,
            texture: None,
            scale: 1.0,
            lights: 2,
            material: MaterialChoice::Vertex,
            uv: UvIndexing::SharedWithPosition,
            backend: None,
        }
    }
}

fn parse_backend(val: &str) -> Option<wgpu::Backends> {
    // Accept: none|auto|vulkan|dx12|metal|gl
    match val.to_ascii_lowercase().as_str() {
        "none" | "headless" => None,
        "auto" => Some(wgpu::Backends::all()),
        "vulkan" | "vk" => Some(wgpu::Backends::VULKAN),
        "dx12" | "d3d12" => Some(wgpu::Backends::DX12),
        "metal" | "mtl" => Some(wgpu::Backends::METAL),
        "gl" | "opengl" | "gles" => Some(wgpu::Backends::GL),
        other => {
            log::warn!("Unknown backend '{}', running headless.", other);
            None
        }
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Options {
    let mut opts = Options::default();
    for arg in args {
        if let Some(v) = arg.strip_prefix("--obj=") {
            opts.obj = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--texture=") {
            opts.texture = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--scale=") {
            match v.parse::<f32>() {
                Ok(s) => opts.scale = s,
                Err(_) => log::warn!("Bad --scale '{}', keeping {}", v, opts.scale),
            }
        } else if let Some(v) = arg.strip_prefix("--lights=") {
            match v.parse::<usize>() {
                Ok(n) => opts.lights = n,
                Err(_) => log::warn!("Bad --lights '{}', keeping {}", v, opts.lights),
            }
        } else if let Some(v) = arg.strip_prefix("--material=") {
            opts.material = match v.to_ascii_lowercase().as_str() {
                "basic" => MaterialChoice::Basic,
                "vertex" => MaterialChoice::Vertex,
                other => {
                    log::warn!("Unknown material '{}', using vertex.", other);
                    MaterialChoice::Vertex
                }
            };
        } else if let Some(v) = arg.strip_prefix("--uv=") {
            opts.uv = match v.to_ascii_lowercase().as_str() {
                "independent" => UvIndexing::Independent,
                "shared" => UvIndexing::SharedWithPosition,
                other => {
                    log::warn!("Unknown uv mode '{}', using shared.", other);
                    UvIndexing::SharedWithPosition
                }
            };
        } else if let Some(v) = arg.strip_prefix("--gpu-backend=") {
            opts.backend = parse_backend(v);
        }
    }
    opts
}

/// First light is a white key light; the rest are colored point lights on a ring.
fn scene_lights(count: usize) -> Vec<Light> {
    const PALETTE: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];
    (0..count)
        .map(|i| {
            if i == 0 {
                return Light::directional(Vec3::new(0.3, 1.0, 0.5), Vec3::ONE);
            }
            let angle = TAU * i as f32 / count as f32;
            let position = Vec3::new(angle.cos() * 3.0, 1.0, angle.sin() * 3.0);
            Light::point(position, PALETTE[(i - 1) % PALETTE.len()])
        })
        .collect()
}

fn load_texture(opts: &Options) -> Result<TextureData> {
    let Some(path) = &opts.texture else {
        return Ok(TextureData::checkerboard(64, 8));
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading texture '{}'", path))?;
    TextureData::decode_png(&bytes).with_context(|| format!("decoding texture '{}'", path))
}

fn run<F>(factory: &F, opts: &Options, import: ImportOutput) -> Result<()>
where
    F: BufferFactory + TextureFactory,
{
    let mesh = import.mesh.upload(factory).context("uploading mesh")?;
    log::info!(
        "uploaded mesh: {} vertices, {} triangles, stride {}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.format().stride()
    );

    let cache = ProgramCache::new();
    let material: Box<dyn Material> = match opts.material {
        MaterialChoice::Basic => Box::new(BasicLightMaterial::new(&cache)?),
        MaterialChoice::Vertex => {
            let texture = factory
                .create_texture("main texture", &load_texture(opts)?)
                .context("uploading texture")?;
            let mut m = VertexLightMaterial::new(&cache)?;
            m.main_texture = Some(texture.handle());
            Box::new(m)
        }
    };

    for pass in material.render_passes() {
        let layout = vertex_layout(mesh.format(), pass.program());
        log::info!(
            "pass '{}' ({:?}): {} vertex attributes",
            pass.program().label(),
            pass.light_mode(),
            layout.attributes.len()
        );
    }

    let camera = CameraState::look_at(
        Vec3::new(0.0, 1.5, 5.0),
        Vec3::ZERO,
        Vec3::Y,
        60f32.to_radians(),
        16.0 / 9.0,
        0.1,
        100.0,
    );
    let mut frame = FrameState::new(camera, Vec3::splat(0.1));
    frame.lights = scene_lights(opts.lights);

    let mut sink = RecordingBackend::new();
    let mut renderer = ForwardRenderer::new();
    renderer.draw(&mut sink, &mesh, material.as_ref(), Mat4::IDENTITY, &frame);

    for call in sink.draw_calls() {
        log::info!(
            "draw '{}' light {:?} blend {:?}: {} system + {} total uniforms, {} indices",
            call.program,
            call.invocation.light_index,
            call.invocation.blend,
            call.system_uniforms.len(),
            call.uniforms.len(),
            call.index_count
        );
    }
    log::info!("{} pass invocations for {} lights", renderer.draws(), opts.lights);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_args(std::env::args().skip(1));
    log::info!("Starting mini3d: {:?}", opts);

    let document = match &opts.obj {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading mesh document '{}'", path))?,
        None => DEFAULT_DOCUMENT.to_string(),
    };
    let import = ObjImporter::new()
        .with_uv_indexing(opts.uv)
        .import_detailed(&document, opts.scale);
    if !import.warnings.is_empty() {
        log::warn!("import finished with {} warnings", import.warnings.len());
    }

    let device = opts.backend.and_then(|backends| {
        match pollster::block_on(renderer::backend::request_device(backends)) {
            Ok(device) => Some(device),
            Err(e) => {
                log::warn!("{e}; running headless");
                None
            }
        }
    });
    match &device {
        Some((device, queue)) => run(&WgpuUploader::new(device, queue), &opts, import)?,
        None => run(&RecordingBackend::new(), &opts, import)?,
    }

    log::info!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_flags() {
        let opts = parse_args(args(&[
            "--scale=2.5",
            "--lights=4",
            "--material=basic",
            "--uv=independent",
            "--gpu-backend=vulkan",
        ]));
        assert_eq!(opts.scale, 2.5);
        assert_eq!(opts.lights, 4);
        assert_eq!(opts.material, MaterialChoice::Basic);
        assert_eq!(opts.uv, UvIndexing::Independent);
        assert_eq!(opts.backend, Some(wgpu::Backends::VULKAN));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let opts = parse_args(args(&["--scale=big", "--lights=-1", "--gpu-backend=none"]));
        assert_eq!(opts.scale, 1.0);
        assert_eq!(opts.lights, 2);
        assert_eq!(opts.backend, None);
    }

    #[test]
    fn headless_run_succeeds() {
        let opts = Options {
            lights: 3,
            ..Options::default()
        };
        let import = ObjImporter::new().import_detailed(DEFAULT_DOCUMENT, 1.0);
        assert!(import.warnings.is_empty());
        run(&RecordingBackend::new(), &opts, import).expect("headless run");
    }

    #[test]
    fn first_light_is_directional() {
        let lights = scene_lights(3);
        assert_eq!(lights.len(), 3);
        assert_eq!(lights[0].world_light_pos().w, 0.0);
        assert_eq!(lights[2].world_light_pos().w, 1.0);
    }
}
