//! Platform layer: window, event loop and the per-frame camera/render loop.
//!
//! - The cursor is grabbed and hidden; raw mouse motion drives the camera.
//! - Meshes are loaded once, when the window is first resumed.
//! - Redraws are requested continuously from `about_to_wait`.

use std::{
    fs,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use asset::MeshLoader;
use corelib::{CameraController, FrameMeshStore, InputState, Movement};
use renderer::{DEFAULT_SHADER, GpuMesh, GpuState};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

pub use corelib::{CameraConfig, FovPolicy};

const TITLE: &str = "freelook";

/// Pixels of touchpad scrolling treated as one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

/// Everything the viewer needs from the command line.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    pub meshes_dir: PathBuf,
    pub textures_dir: PathBuf,
    /// WGSL file replacing the built-in shader.
    pub shader: Option<PathBuf>,
    pub camera: CameraConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            show_fps: false,
            width: 800,
            height: 600,
            meshes_dir: PathBuf::from("Meshes"),
            textures_dir: PathBuf::from("Textures"),
            shader: None,
            camera: CameraConfig::default(),
        }
    }
}

/// Open the viewer window and run until it is closed.
pub fn run(config: ViewerConfig) -> Result<()> {
    let shader_src = match &config.shader {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read shader {}", path.display()))?,
        None => DEFAULT_SHADER.to_owned(),
    };

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config, shader_src);
    event_loop.run_app(&mut app).context("Event loop error")?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// WASD mapping; `None` for keys that do not move the camera.
pub fn movement_for_key(code: KeyCode) -> Option<Movement> {
    match code {
        KeyCode::KeyW => Some(Movement::Forward),
        KeyCode::KeyS => Some(Movement::Backward),
        KeyCode::KeyA => Some(Movement::Left),
        KeyCode::KeyD => Some(Movement::Right),
        _ => None,
    }
}

/// Vertical wheel movement in lines; positive scrolls up.
pub fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
    }
}

/// Counts frames and reports the rate once per second.
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    elapsed: Duration,
}

impl FpsCounter {
    pub fn tick(&mut self, dt: Duration) -> Option<u32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = (self.frames as f64 / self.elapsed.as_secs_f64()).round() as u32;
        self.frames = 0;
        self.elapsed = Duration::ZERO;
        Some(fps)
    }
}

struct Viewer {
    window: Arc<Window>,
    gpu: GpuState,
    store: FrameMeshStore<GpuMesh>,
}

struct ViewerApp {
    config: ViewerConfig,
    shader_src: String,
    viewer: Option<Viewer>,
    input: InputState,
    camera: CameraController,
    last_frame: Option<Instant>,
    fps: FpsCounter,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(config: ViewerConfig, shader_src: String) -> Self {
        let camera = CameraController::new(config.camera);
        Self {
            config,
            shader_src,
            viewer: None,
            input: InputState::new(),
            camera,
            last_frame: None,
            fps: FpsCounter::default(),
            error: None,
        }
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> Result<Viewer> {
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        if window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
            .is_err()
        {
            log::warn!("Cursor grab unsupported on this platform");
        }
        window.set_cursor_visible(false);

        let mut gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.config.backends,
            &self.shader_src,
        ))?;

        let loader = MeshLoader::new(&self.config.textures_dir);
        #[allow(unused_mut)]
        let mut meshes = {
            let mut textures = gpu.texture_loader();
            loader
                .load_dir(&self.config.meshes_dir, &mut textures)
                .with_context(|| {
                    format!("Failed to read meshes from {}", self.config.meshes_dir.display())
                })?
        };

        #[cfg(feature = "tangents")]
        for mesh in meshes.iter_mut() {
            let updated = asset::tangents::accumulate_tangents(mesh);
            log::debug!("{}: tangents for {} vertices", mesh.name, updated);
        }

        let mut store = FrameMeshStore::new(Vec::with_capacity(meshes.len()));
        for (index, mesh) in meshes.iter().enumerate() {
            if !mesh.is_valid() {
                log::warn!("Skipping invalid mesh {}", mesh.name);
                continue;
            }
            store.push_at(index, gpu.upload_mesh(mesh));
        }
        log::info!("{} mesh(es) ready", store.len());

        Ok(Viewer { window, gpu, store })
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = self.last_frame.map_or(Duration::ZERO, |t| now - t);
        self.last_frame = Some(now);

        let input = self.input.drain();
        let matrices = self.camera.tick(dt.as_secs_f32(), &input);

        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        match viewer.gpu.render(&viewer.store, &matrices) {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => viewer.gpu.recreate_surface(),
            Err(SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory. Exiting.");
                event_loop.exit();
            }
            Err(e) => log::warn!("Surface error: {e:?}"),
        }

        if self.config.show_fps {
            if let Some(fps) = self.fps.tick(dt) {
                viewer.window.set_title(&format!("{TITLE} | {fps} fps"));
            }
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(err) => {
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let pressed = event.state == ElementState::Pressed;
                if code == KeyCode::Escape && pressed {
                    log::info!("Escape pressed. Exiting event loop.");
                    event_loop.exit();
                } else if let Some(movement) = movement_for_key(code) {
                    if pressed {
                        self.input.key_down(movement);
                    } else {
                        self.input.key_up(movement);
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => self.input.scroll(scroll_lines(delta)),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.mouse_motion(dx as f32, dy as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &self.viewer {
            viewer.window.request_redraw();
        }
    }
}
