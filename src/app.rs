//! Application runtime: two-phase startup and the fixed-interval tick loop.
//!
//! Startup is phase one: create the window and GPU context, run the
//! caller's setup (load meshes, build the scene, pick key bindings), and
//! compile the pipeline's programs. Any failure short-circuits with a
//! descriptive [`RenderError`] and the tick loop never starts.
//!
//! Phase two is the steady state: a ~15 ms tick that updates every scene
//! object, applies the key bindings, and executes the multi-pass pipeline.
//! A pass failure is logged and halts the tick loop — the renderer stops
//! rather than limping along with possibly corrupt GPU state. Recovery
//! means restarting the app.

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::RenderError;
use crate::gpu::Gpu;
use crate::input::{InputState, KeyBindings};
use crate::pipeline::RenderPipeline;
use crate::program::ProgramCache;
use crate::scene::Scene;

/// Window and tick configuration.
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Tick interval of the update/draw loop.
    pub tick: Duration,
    /// Background color of the composite pass.
    pub clear_color: wgpu::Color,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Sundial".to_string(),
            width: 1024,
            height: 768,
            tick: Duration::from_millis(15),
            clear_color: wgpu::Color {
                r: 0.02,
                g: 0.02,
                b: 0.03,
                a: 1.0,
            },
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

/// Setup callback: build the scene (meshes, objects, cameras) and choose
/// key bindings. Runs once, after the GPU context exists and the pipeline's
/// programs have compiled, and before the first tick. The program cache is
/// available so declarative scene definitions can be typed against a
/// program's uniform layout.
pub type SetupFn =
    Box<dyn FnOnce(&Gpu, &ProgramCache) -> Result<(Scene, KeyBindings), RenderError>>;

/// Run the renderer until the window closes.
///
/// Returns the startup error when the load phase fails; per-frame errors
/// after a successful startup halt the loop and are reported the same way
/// once the window closes.
pub fn run<S>(config: AppConfig, setup: S) -> Result<(), RenderError>
where
    S: FnOnce(&Gpu, &ProgramCache) -> Result<(Scene, KeyBindings), RenderError> + 'static,
{
    let event_loop = EventLoop::new()
        .map_err(|e| RenderError::Init(format!("failed to create event loop: {e}")))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        config,
        setup: Some(Box::new(setup)),
        running: None,
        halted: false,
        error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| RenderError::Init(format!("event loop error: {e}")))?;

    match app.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

struct Running {
    window: Arc<Window>,
    gpu: Gpu,
    cache: ProgramCache,
    pipeline: RenderPipeline,
    scene: Scene,
    bindings: KeyBindings,
    input: InputState,
    last_tick: Instant,
}

struct App {
    config: AppConfig,
    setup: Option<SetupFn>,
    running: Option<Running>,
    halted: bool,
    error: Option<RenderError>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RenderError> {
        let attrs = WindowAttributes::default()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| RenderError::Init(format!("failed to create window: {e}")))?,
        );

        let gpu = Gpu::new(window.clone())?;
        let mut cache = ProgramCache::new(&gpu);
        let mut pipeline = RenderPipeline::new(&gpu, &mut cache)?;
        pipeline.set_clear_color(self.config.clear_color);

        let setup = self.setup.take().expect("setup runs once");
        let (scene, bindings) = setup(&gpu, &cache)?;
        log::info!(
            "scene ready: {} draw calls per pass, ticking every {:?}",
            scene.draw_count(),
            self.config.tick
        );

        self.running = Some(Running {
            window,
            gpu,
            cache,
            pipeline,
            scene,
            bindings,
            input: InputState::new(),
            last_tick: Instant::now(),
        });
        Ok(())
    }

    fn tick(&mut self) {
        let Some(running) = &mut self.running else {
            return;
        };
        if self.halted {
            return;
        }

        let now = Instant::now();
        let dt = now.duration_since(running.last_tick).as_secs_f32();
        running.last_tick = now;

        running.scene.update(dt);
        running
            .bindings
            .apply(&running.input, &mut running.scene, dt);
        running.input.end_tick();

        match running
            .pipeline
            .execute(&running.gpu, &mut running.cache, &mut running.scene)
        {
            Ok(()) => {}
            // A lost or outdated surface is the one recoverable frame
            // error: reconfigure and draw again next tick.
            Err(RenderError::Surface(
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
            )) => {
                let (w, h) = (running.gpu.width(), running.gpu.height());
                running.gpu.resize(w, h);
            }
            Err(error) => {
                log::error!("render pass failed, halting: {error}");
                self.halted = true;
                self.error = Some(error);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.error.is_some() {
            return;
        }
        if let Err(error) = self.start(event_loop) {
            log::error!("startup failed: {error}");
            self.error = Some(error);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                running.scene.release();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
                running.pipeline.resize(&running.gpu);
            }
            WindowEvent::RedrawRequested => {
                self.tick();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = &self.running else {
            return;
        };
        if self.halted {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }
        let next = running.last_tick + self.config.tick;
        if Instant::now() >= next {
            running.window.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(next));
    }
}
