use super::*;
use crate::driver::DriverOps;
use crate::drivers::{framebuffer, software};
use crate::headless::HeadlessWindow;
use crate::registry::{DriverRequest, RenderDriverEntry};
use crate::testing::{RecordingDriver, recording_info};

const RED: Color = Color::rgb(255, 0, 0);
const BLUE: Color = Color::rgb(0, 0, 255);

fn system(config: RenderConfig) -> RenderSystem {
    RenderSystem::with_config(config)
}

fn window(w: u32, h: u32) -> Rc<HeadlessWindow> {
    Rc::new(HeadlessWindow::new(w, h))
}

fn create(sys: &mut RenderSystem, window: &Rc<HeadlessWindow>) -> Result<RendererId> {
    sys.create_renderer(
        Rc::clone(window) as Rc<dyn Window>,
        DriverSelection::Auto,
        RendererFlags::empty(),
    )
}

fn read_pixel(sys: &mut RenderSystem, id: RendererId, x: i32, y: i32) -> Color {
    let mut buf = [0u8; 4];
    sys.read_pixels(
        id,
        Some(Rect::new(x, y, 1, 1)),
        Some(PixelFormat::Rgba8888),
        &mut buf,
        4,
    )
    .unwrap();
    PixelFormat::Rgba8888.get_rgba(PixelFormat::Rgba8888.read_raw(&buf))
}

fn solid(format: PixelFormat, color: Color, w: usize, h: usize) -> Vec<u8> {
    let bytes = format.map_rgba(color).to_le_bytes();
    let bpp = format.bytes_per_pixel();
    bytes[..bpp].iter().copied().cycle().take(w * h * bpp).collect()
}

// ---- End to end ----

#[test]
fn software_renderer_end_to_end() {
    let mut sys = system(RenderConfig::fixed().with_driver(software::NAME));
    let win = window(100, 100);
    let r = create(&mut sys, &win).unwrap();
    assert_eq!(sys.renderer_info(r).unwrap().name, software::NAME);

    sys.set_draw_color(r, BLUE).unwrap();
    sys.render_clear(r).unwrap();

    let tex = sys
        .create_texture(r, PixelFormat::Rgba8888, TextureAccess::Static, 10, 10)
        .unwrap();
    sys.update_texture(tex, None, &solid(PixelFormat::Rgba8888, RED, 10, 10), 40)
        .unwrap();
    sys.render_copy(r, tex, None, Some(Rect::new(0, 0, 10, 10)))
        .unwrap();
    sys.present(r).unwrap();

    assert_eq!(win.frame_pixel(5, 5), Some(RED));
    assert_eq!(win.frame_pixel(50, 50), Some(BLUE));
    assert_eq!(read_pixel(&mut sys, r, 5, 5), RED);

    // Without a destination the texture is stretched over the window.
    sys.render_copy(r, tex, None, None).unwrap();
    sys.present(r).unwrap();
    assert_eq!(win.frame_pixel(50, 50), Some(RED));
    assert_eq!(win.frame_pixel(99, 99), Some(RED));
}

#[test]
fn texture_from_keyed_surface_is_blended() {
    let mut sys = system(RenderConfig::fixed().with_driver(framebuffer::NAME));
    let win = window(4, 4);
    let r = create(&mut sys, &win).unwrap();
    sys.set_draw_color(r, BLUE).unwrap();
    sys.render_clear(r).unwrap();

    let mut surface = Surface::new(2, 1, PixelFormat::Rgb565).unwrap();
    {
        let mut px = surface.view_mut();
        px.put_raw(0, 0, PixelFormat::Rgb565.map_rgba(RED));
        px.put_raw(1, 0, PixelFormat::Rgb565.map_rgba(Color::BLACK));
    }
    surface.set_color_key(Some(Color::BLACK));

    let tex = sys.create_texture_from_surface(r, None, &surface).unwrap();
    let query = sys.query_texture(tex).unwrap();
    assert_eq!(query.format, PixelFormat::Argb8888);
    assert_eq!(sys.texture_blend_mode(tex).unwrap(), BlendMode::Blend);

    sys.render_copy(r, tex, None, Some(Rect::new(0, 0, 2, 1)))
        .unwrap();
    assert_eq!(read_pixel(&mut sys, r, 0, 0), RED);
    // The keyed pixel became transparent.
    assert_eq!(read_pixel(&mut sys, r, 1, 0), BLUE);
}

#[test]
fn lock_round_trip_reads_back() {
    let mut sys = system(RenderConfig::fixed().with_driver(framebuffer::NAME));
    let win = window(8, 8);
    let r = create(&mut sys, &win).unwrap();
    let tex = sys
        .create_texture(r, PixelFormat::Argb8888, TextureAccess::Streaming, 4, 4)
        .unwrap();
    sys.with_lock(tex, None, |px| {
        for y in 0..4 {
            for x in 0..4 {
                let c = Color::rgb((x * 60) as u8, (y * 60) as u8, 7);
                px.put_raw(x, y, PixelFormat::Argb8888.map_rgba(c));
            }
        }
    })
    .unwrap();
    sys.render_copy(r, tex, None, Some(Rect::new(0, 0, 4, 4)))
        .unwrap();
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(
                read_pixel(&mut sys, r, x, y),
                Color::rgb((x * 60) as u8, (y * 60) as u8, 7)
            );
        }
    }
}

#[test]
fn nested_lock_is_invalid_state() {
    let mut sys = system(RenderConfig::fixed().with_driver(framebuffer::NAME));
    let win = window(8, 8);
    let r = create(&mut sys, &win).unwrap();
    let tex = sys
        .create_texture(r, PixelFormat::Argb8888, TextureAccess::Streaming, 4, 4)
        .unwrap();
    sys.lock_texture(tex, None).unwrap();
    let err = sys.lock_texture(tex, None).unwrap_err();
    assert!(matches!(err, RenderError::InvalidState(_)));
    sys.unlock_texture(tex).unwrap();
    assert!(matches!(
        sys.unlock_texture(tex),
        Err(RenderError::InvalidState(_))
    ));
}

// ---- Driver selection ----

#[test]
fn auto_falls_through_to_framebuffer_without_gl() {
    let mut sys = system(RenderConfig::fixed());
    let win = window(16, 16);
    let r = create(&mut sys, &win).unwrap();
    assert_eq!(sys.renderer_info(r).unwrap().name, framebuffer::NAME);
}

#[test]
fn accelerated_request_fails_without_gl() {
    let mut sys = system(RenderConfig::fixed());
    let err = sys
        .create_renderer(
            window(16, 16) as Rc<dyn Window>,
            DriverSelection::Auto,
            RendererFlags::ACCELERATED,
        )
        .unwrap_err();
    assert!(matches!(err, RenderError::NoMatchingDriver));
    assert_eq!(
        sys.last_error().as_deref(),
        Some("couldn't find matching render driver")
    );
}

#[test]
fn override_name_is_case_insensitive() {
    let mut sys = system(RenderConfig::fixed().with_driver("SoftWare"));
    let win = window(16, 16);
    let r = create(&mut sys, &win).unwrap();
    assert_eq!(sys.renderer_info(r).unwrap().name, software::NAME);
}

#[test]
fn unknown_override_name() {
    let mut sys = system(RenderConfig::fixed().with_driver("direct3d"));
    let err = create(&mut sys, &window(16, 16)).unwrap_err();
    assert!(matches!(err, RenderError::NoMatchingDriver));
}

#[test]
fn env_overrides_apply_when_enabled() {
    let config = RenderConfig::default().with_overrides(|key| {
        (key == tessera_types::config::ENV_RENDERER).then(|| software::NAME.to_string())
    });
    let mut sys = system(RenderConfig {
        honor_env: false,
        ..config
    });
    let r = create(&mut sys, &window(8, 8)).unwrap();
    assert_eq!(sys.renderer_info(r).unwrap().name, software::NAME);
}

#[test]
fn driver_table_queries() {
    let sys = system(RenderConfig::fixed());
    assert_eq!(sys.num_render_drivers(), 3);
    assert_eq!(sys.render_driver_info(1).unwrap().name, framebuffer::NAME);
    assert!(matches!(
        sys.render_driver_info(3),
        Err(RenderError::InvalidIndex { index: 3, count: 3 })
    ));
    assert_eq!(
        sys.last_error().as_deref(),
        Some("index 3 out of range (have 3)")
    );
    sys.clear_error();
    assert_eq!(sys.last_error(), None);
}

// ---- Handles ----

#[test]
fn destroyed_renderer_handle_is_rejected() {
    let mut sys = system(RenderConfig::fixed());
    let win = window(8, 8);
    let r = create(&mut sys, &win).unwrap();
    sys.destroy_renderer(r).unwrap();
    assert!(matches!(
        sys.render_clear(r),
        Err(RenderError::InvalidHandle("renderer"))
    ));
    assert!(matches!(
        sys.destroy_renderer(r),
        Err(RenderError::InvalidHandle(_))
    ));
    assert_eq!(
        sys.last_error().as_deref(),
        Some("invalid renderer handle")
    );

    // A new renderer in the same slot does not revive the old handle.
    let again = create(&mut sys, &win).unwrap();
    assert_ne!(again, r);
    assert!(sys.draw_color(r).is_err());
    assert_eq!(sys.renderer_ids(), vec![again]);
}

#[test]
fn destroyed_texture_handle_is_rejected() {
    let mut sys = system(RenderConfig::fixed());
    let win = window(8, 8);
    let r = create(&mut sys, &win).unwrap();
    let tex = sys
        .create_texture(r, PixelFormat::Argb8888, TextureAccess::Static, 2, 2)
        .unwrap();
    sys.destroy_texture(tex).unwrap();
    assert!(matches!(
        sys.query_texture(tex),
        Err(RenderError::InvalidHandle("texture"))
    ));
    assert!(matches!(
        sys.render_copy(r, tex, None, None),
        Err(RenderError::InvalidHandle("texture"))
    ));
}

#[test]
fn texture_of_destroyed_renderer_is_invalid_handle() {
    let mut sys = system(RenderConfig::fixed());
    let win_a = window(8, 8);
    let win_b = window(8, 8);
    let a = create(&mut sys, &win_a).unwrap();
    let b = create(&mut sys, &win_b).unwrap();
    let tex = sys
        .create_texture(a, PixelFormat::Argb8888, TextureAccess::Static, 2, 2)
        .unwrap();
    sys.destroy_renderer(a).unwrap();
    assert!(matches!(
        sys.render_copy(b, tex, None, None),
        Err(RenderError::InvalidHandle("texture"))
    ));
    assert_eq!(sys.last_error().as_deref(), Some("invalid texture handle"));

    // A destroyed texture of a live foreign renderer is a bad handle too.
    let c = create(&mut sys, &win_a).unwrap();
    let other = sys
        .create_texture(c, PixelFormat::Argb8888, TextureAccess::Static, 2, 2)
        .unwrap();
    sys.destroy_texture(other).unwrap();
    assert!(matches!(
        sys.render_copy(b, other, None, None),
        Err(RenderError::InvalidHandle("texture"))
    ));
}

#[test]
fn foreign_texture_copy_is_rejected() {
    let mut sys = system(RenderConfig::fixed());
    let win_a = window(8, 8);
    let win_b = window(8, 8);
    let a = create(&mut sys, &win_a).unwrap();
    let b = create(&mut sys, &win_b).unwrap();
    let tex = sys
        .create_texture(a, PixelFormat::Argb8888, TextureAccess::Static, 2, 2)
        .unwrap();
    assert!(matches!(
        sys.render_copy(b, tex, None, None),
        Err(RenderError::InvalidArgument(_))
    ));
}

#[test]
fn texture_attributes_round_trip() {
    let mut sys = system(RenderConfig::fixed());
    let win = window(8, 8);
    let r = create(&mut sys, &win).unwrap();
    let tex = sys
        .create_texture(r, PixelFormat::Abgr8888, TextureAccess::Static, 3, 2)
        .unwrap();
    sys.set_texture_color_mod(tex, 1, 2, 3).unwrap();
    sys.set_texture_alpha_mod(tex, 4).unwrap();
    sys.set_texture_blend_mode(tex, BlendMode::Add).unwrap();
    assert_eq!(sys.texture_color_mod(tex).unwrap(), (1, 2, 3));
    assert_eq!(sys.texture_alpha_mod(tex).unwrap(), 4);
    assert_eq!(sys.texture_blend_mode(tex).unwrap(), BlendMode::Add);
    let q = sys.query_texture(tex).unwrap();
    assert_eq!((q.width, q.height, q.access), (3, 2, TextureAccess::Static));
    assert_eq!(tex.renderer(), r);
}

// ---- Events ----

fn recording_factory(request: &DriverRequest<'_>) -> Result<Renderer> {
    Ok(Renderer::new(
        Rc::clone(&request.window),
        recording_info(),
        Box::new(RecordingDriver::new(DriverOps::all())),
    ))
}

#[test]
fn events_reach_renderers_of_that_window_only() {
    let mut sys = system(RenderConfig::fixed().with_driver(framebuffer::NAME));
    let win_a = window(4, 4);
    let win_b = window(4, 4);
    let a = create(&mut sys, &win_a).unwrap();
    let b = create(&mut sys, &win_b).unwrap();

    let event = win_a.resize(6, 2);
    sys.dispatch_event(&event);
    for id in [a, b] {
        sys.set_draw_color(id, RED).unwrap();
        sys.render_clear(id).unwrap();
        sys.present(id).unwrap();
    }
    let frame_a = win_a.last_frame().unwrap();
    let frame_b = win_b.last_frame().unwrap();
    assert_eq!((frame_a.width(), frame_a.height()), (6, 2));
    assert_eq!((frame_b.width(), frame_b.height()), (4, 4));
}

#[test]
fn destroyed_renderer_stops_receiving_events() {
    let registry = DriverRegistry::new(vec![RenderDriverEntry {
        info: recording_info(),
        create: recording_factory,
    }]);
    let mut sys = RenderSystem::new(registry, RenderConfig::fixed());
    let win = window(4, 4);
    let r = create(&mut sys, &win).unwrap();
    assert_eq!(sys.bridge.len(), 1);
    sys.destroy_renderer(r).unwrap();
    assert!(sys.bridge.is_empty());
    // Nothing left to deliver to.
    sys.dispatch_event(&win.resize(5, 5));
}

#[test]
fn dropping_system_destroys_renderers() {
    let mut sys = system(RenderConfig::fixed());
    let win = window(4, 4);
    create(&mut sys, &win).unwrap();
    create(&mut sys, &win).unwrap();
    drop(sys);
    assert_eq!(Rc::strong_count(&win), 1);
}
