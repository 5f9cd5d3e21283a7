//! Tessera headless snapshot tool.
//!
//! Renders the demo scene into an off-screen window through the full
//! renderer stack, reads the frame back and writes it as a PNG. Driver
//! selection follows the usual rules: `--driver`, then `TESSERA_RENDERER`,
//! then the config file, then automatic fallback.
//!
//! Usage:
//!   cargo run -p tessera-app -- --size 640x480 --out frame.png
//!   TESSERA_RENDERER=software cargo run -p tessera-app
//!   cargo run -p tessera-app -- --list-drivers

mod args;
mod scene;

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;

use args::{Args, USAGE};
use tessera_render::{
    DriverSelection, HeadlessWindow, PixelFormat, RenderConfig, RenderSystem, RendererFlags,
    RendererInfo, Window,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut system = RenderSystem::with_config(load_config(&args)?);
    if args.list_drivers {
        println!("{}", driver_table(&system)?);
        return Ok(());
    }

    let (w, h) = (args.width, args.height);
    let window = Rc::new(HeadlessWindow::with_format(w, h, PixelFormat::Argb8888));
    let renderer = system.create_renderer(
        Rc::clone(&window) as Rc<dyn Window>,
        DriverSelection::Auto,
        RendererFlags::empty(),
    )?;
    log::info!(
        "Rendering {w}x{h} snapshot with the {} driver",
        system.renderer_info(renderer)?.name
    );

    scene::draw(&mut system, renderer)?;
    system.present(renderer)?;

    // ABGR8888 is R, G, B, A in memory, which is what PNG expects.
    let pitch = w as usize * 4;
    let mut pixels = vec![0u8; pitch * h as usize];
    system.read_pixels(
        renderer,
        None,
        Some(PixelFormat::Abgr8888),
        &mut pixels,
        pitch,
    )?;
    save_png(&args.out, w, h, &pixels)?;
    system.destroy_renderer(renderer)?;

    log::info!("Saved {}", args.out.display());
    Ok(())
}

/// Config file (or defaults), with `--driver` taking precedence over the
/// environment.
fn load_config(args: &Args) -> Result<RenderConfig> {
    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    Ok(match &args.driver {
        Some(name) => RenderConfig {
            honor_env: false,
            ..config.resolved().with_driver(name)
        },
        None => config,
    })
}

fn driver_table(system: &RenderSystem) -> Result<String> {
    let infos = (0..system.num_render_drivers())
        .map(|i| system.render_driver_info(i))
        .collect::<tessera_render::Result<Vec<&RendererInfo>>>()?;
    Ok(serde_json::to_string_pretty(&infos)?)
}

/// Save RGBA pixel data as a PNG file.
fn save_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
    let file = fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_flag_beats_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.toml");
        fs::write(&path, "[render]\ndriver = \"framebuffer\"\nvsync = true\n").unwrap();
        let args = Args {
            config: Some(path),
            driver: Some("software".into()),
            ..Args::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.driver.as_deref(), Some("software"));
        assert!(config.vsync);
        assert!(!config.honor_env);
    }

    #[test]
    fn driver_table_is_json_array() {
        let system = RenderSystem::with_config(RenderConfig::fixed());
        let json = driver_table(&system).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let names: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["opengles", "framebuffer", "software"]);
    }

    #[test]
    fn snapshot_png_round_trips_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_png(&path, 2, 1, &[255, 0, 0, 255, 0, 255, 0, 255]).unwrap();
        let decoder = png::Decoder::new(fs::File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        assert_eq!((reader.info().width, reader.info().height), (2, 1));
    }
}
