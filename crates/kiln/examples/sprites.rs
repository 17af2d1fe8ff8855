//! Spinning, tinted, flipped sprites over a baked tile background.
//!
//! Run with `RUST_LOG=kiln=debug cargo run -p kiln --example sprites`.
//! Frame statistics are logged as JSON every two seconds.

use std::sync::Arc;
use std::time::Instant;

use kiln::prelude::*;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

const SPRITES: usize = 2_000;
const TILE: u32 = 32;

const BATCH_CONFIG: &str = r#"{
    "max_buckets": 4,
    "max_sprites_per_bucket": 2000,
    "buffering": "Triple"
}"#;

fn checker(size: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / 8) + (y / 8)) % 2 == 0;
            pixels.extend_from_slice(if on { &a } else { &b });
        }
    }
    pixels
}

fn disc(size: u32) -> Vec<u8> {
    let r = size as f32 / 2.0;
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - r;
            let dy = y as f32 + 0.5 - r;
            let alpha = (r - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
            pixels.extend_from_slice(&[255, 255, 255, (alpha * 255.0) as u8]);
        }
    }
    pixels
}

fn hue(t: f32) -> Color {
    let channel = |offset: f32| 0.5 + 0.5 * (t + offset).cos();
    Color::rgb(channel(0.0), channel(2.09), channel(4.19))
}

struct Scene {
    renderer: Renderer<WgpuBackend>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    batch: SpriteBatch<WgpuBackend>,
    background: StaticBatch<WgpuBackend>,
    ball: Texture,
    badge: Texture,
    start: Instant,
    frames: u32,
}

impl Scene {
    fn new(window: Arc<Window>) -> RenderResult<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::GraphicsBackend(e.to_string()))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::GraphicsBackend(e.to_string()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("sprites demo device"),
            ..Default::default()
        }))
        .map_err(|e| RenderError::GraphicsBackend(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut renderer = Renderer::new(WgpuBackend::new(device, queue, format));
        let backend = renderer.backend_mut();
        let tile = backend.create_texture_from_rgba(
            "tile",
            TILE,
            TILE,
            &checker(TILE, [70, 80, 110, 255], [50, 58, 84, 255]),
        )?;
        let ball = backend.create_texture_from_rgba("ball", 16, 16, &disc(16))?;
        backend.set_sampling(ball.handle, Sampling::new(Filter::Linear, Wrap::Clamp))?;

        // Compose a badge offscreen once: a large disc with a tinted one on top.
        let badge = backend.create_render_target(64, 64)?;
        backend.set_target(Some(badge.view.clone()));
        backend.clear(Color::TRANSPARENT);
        renderer.set_viewport(64, 64)?;
        renderer.draw_immediate(&ball, &DrawParams::at(Vec2::ZERO).scale(Vec2::splat(4.0)))?;
        renderer.draw_immediate(
            &ball,
            &DrawParams::at(Vec2::new(32.0, 32.0))
                .origin(Vec2::splat(8.0))
                .scale(Vec2::splat(2.0))
                .color(Color::rgba(1.0, 0.3, 0.2, 0.9)),
        )?;
        renderer.set_viewport(config.width, config.height)?;

        let mut background = renderer.create_static(&tile, 4096)?;
        for y in 0..config.height.div_ceil(TILE) + 1 {
            for x in 0..config.width.div_ceil(TILE) + 2 {
                let position = Vec2::new((x * TILE) as f32 - TILE as f32, (y * TILE) as f32);
                renderer.draw_static(&mut background, &DrawParams::at(position))?;
            }
        }

        let batch = renderer.create_batch(BatchConfig::from_json(BATCH_CONFIG)?)?;

        Ok(Self {
            renderer,
            surface,
            config,
            batch,
            background,
            ball,
            badge: badge.texture,
            start: Instant::now(),
            frames: 0,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface
            .configure(self.renderer.backend().device(), &self.config);
        if let Err(e) = self.renderer.set_viewport(width, height) {
            log::warn!("resize: {e}");
        }
    }

    fn frame(&mut self) -> RenderResult<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface
                    .configure(self.renderer.backend().device(), &self.config);
                return Ok(());
            }
            Err(e) => return Err(RenderError::GraphicsBackend(e.to_string())),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let backend = self.renderer.backend_mut();
        backend.set_target(Some(view));
        backend.clear(Color::rgb(0.05, 0.05, 0.08));

        let t = self.start.elapsed().as_secs_f32();
        let pan = Mat4::from_translation(glam::Vec3::new((t * 0.5).sin() * TILE as f32, 0.0, 0.0));
        self.renderer
            .present_static(&mut self.background, Some(&pan))?;

        let (w, h) = (self.config.width as f32, self.config.height as f32);
        for i in 0..SPRITES {
            let k = i as f32;
            let phase = t * 0.3 + k * 0.618;
            let position = Vec2::new(
                w * 0.5 + (phase * 1.3).cos() * w * 0.45 * ((k * 0.37).sin() * 0.5 + 0.5),
                h * 0.5 + (phase * 1.7).sin() * h * 0.45 * ((k * 0.73).cos() * 0.5 + 0.5),
            );
            let (texture, origin) = if i % 5 == 0 {
                (&self.badge, Vec2::splat(32.0))
            } else {
                (&self.ball, Vec2::splat(8.0))
            };
            let flip = match i % 4 {
                0 => Flip::None,
                1 => Flip::Horizontal,
                2 => Flip::Vertical,
                _ => Flip::Both,
            };
            let params = DrawParams::at(position)
                .origin(origin)
                .rotation(t + k)
                .scale(Vec2::splat(0.5 + (k * 0.11).sin().abs()))
                .color(hue(t + k * 0.01))
                .flip(flip);
            self.renderer.draw(&mut self.batch, texture, &params)?;
        }
        self.renderer.present(&mut self.batch)?;

        let cursor_glow = DrawParams::at(Vec2::new(w * 0.5, h * 0.5))
            .origin(Vec2::splat(8.0))
            .scale(Vec2::splat(12.0 + 4.0 * (t * 2.0).sin()))
            .color(Color::rgba(0.3, 0.2, 0.1, 1.0));
        self.renderer.set_blend_mode(BlendMode::Additive);
        self.renderer.draw_immediate(&self.ball, &cursor_glow)?;
        self.renderer.set_blend_mode(BlendMode::Normal);

        let backend = self.renderer.backend_mut();
        backend.submit()?;
        backend.set_target(None);
        frame.present();

        self.frames += 1;
        if self.frames % 120 == 0 {
            let stats = self.renderer.take_stats();
            log::info!("last 120 frames: {}", stats.to_json());
        }
        Ok(())
    }
}

#[derive(Default)]
struct Demo {
    window: Option<Arc<Window>>,
    scene: Option<Scene>,
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("kiln sprites")
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("Failed to create window"),
        );
        match Scene::new(window.clone()) {
            Ok(scene) => self.scene = Some(scene),
            Err(e) => {
                log::error!("could not set up renderer: {e}");
                event_loop.exit();
            }
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(scene) = &mut self.scene {
                    scene.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(scene) = &mut self.scene {
                    if let Err(e) = scene.frame() {
                        log::error!("frame failed: {e}");
                        event_loop.exit();
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut demo = Demo::default();
    event_loop.run_app(&mut demo).expect("Event loop failed");
}
