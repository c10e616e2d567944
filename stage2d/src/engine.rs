use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use pixels::{Pixels, PixelsBuilder, SurfaceTexture};
use serde::{Deserialize, Serialize};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    assets::Resources,
    error::HostError,
    input::InputTranslator,
    render::{Compositor, DebugOverlays, RasterCanvas},
    scheduler::Scheduler,
    viewport::Viewport,
};

/// Configuration values for the engine window and runtime behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub overlays: DebugOverlays,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Stage2D Game".into(),
            width: 1280,
            height: 720,
            vsync: true,
            overlays: DebugOverlays::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid engine config")
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

/// Main entrypoint for running a Stage2D game.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create a new engine instance with default configuration.
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Override the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Override the initial window size in logical pixels.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable or disable vertical sync.
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.config.vsync = vsync;
        self
    }

    /// Choose which debug overlays the compositor draws.
    #[must_use]
    pub fn with_overlays(mut self, overlays: DebugOverlays) -> Self {
        self.config.overlays = overlays;
        self
    }

    /// Run the provided game until the window is closed or the game requests exit.
    pub fn run<G: Game + 'static>(self, mut game: G) -> Result<()> {
        let config = self.config;

        let event_loop = EventLoop::new().map_err(HostError::CreateEventLoop)?;
        let mut window_attributes = Window::default_attributes();
        window_attributes.title = config.title.clone();
        window_attributes.inner_size = Some(LogicalSize::new(config.width, config.height).into());
        let window = event_loop
            .create_window(window_attributes)
            .map_err(HostError::CreateWindow)?;

        // The presentation surface borrows the window for the rest of the program.
        let window: &'static Window = Box::leak(Box::new(window));

        let mut ctx = EngineContext::new(window, &config)?;
        game.init(&mut ctx)?;
        log::info!("engine running: {}x{}", config.width, config.height);

        let mut input = InputTranslator::new();
        event_loop
            .run(move |event, elwt| match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::KeyboardInput { ref event, .. } if is_escape_pressed(event) => {
                        elwt.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(err) = ctx.resize(new_size) {
                            log::error!("{err}");
                            elwt.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if let Err(err) = ctx.run_frame(&mut game) {
                            log::error!("encountered error during frame: {err:?}");
                            elwt.exit();
                            return;
                        }
                        if ctx.exit_requested {
                            elwt.exit();
                        }
                    }
                    other => {
                        for input_event in input.translate(&other) {
                            ctx.scheduler.dispatch(&input_event);
                        }
                    }
                },
                Event::AboutToWait => ctx.window.request_redraw(),
                _ => {}
            })
            .map_err(HostError::EventLoopRun)?;

        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn is_escape_pressed(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed
        && matches!(event.physical_key, PhysicalKey::Code(KeyCode::Escape))
}

/// Shared context provided to game code.
pub struct EngineContext {
    window: &'static Window,
    scheduler: Scheduler,
    resources: Resources,
    canvas: RasterCanvas,
    pixels: Pixels<'static>,
    exit_requested: bool,
}

impl EngineContext {
    fn new(window: &'static Window, config: &EngineConfig) -> Result<Self, HostError> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, window);
        let pixels = PixelsBuilder::new(size.width, size.height, surface)
            .enable_vsync(config.vsync)
            .build()
            .map_err(HostError::CreateSurface)?;

        let compositor = Compositor::new(Viewport::new(size.width, size.height))
            .with_overlays(config.overlays);

        Ok(Self {
            window,
            scheduler: Scheduler::new(compositor),
            resources: Resources::new(),
            canvas: RasterCanvas::new(size.width, size.height),
            pixels,
            exit_requested: false,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<(), HostError> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.pixels
            .resize_surface(size.width, size.height)
            .map_err(HostError::ResizeSurface)?;
        self.pixels
            .resize_buffer(size.width, size.height)
            .map_err(HostError::ResizeSurface)?;
        self.canvas.resize(size.width, size.height);
        self.scheduler.compositor_mut().resize(size.width, size.height);
        log::debug!("resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn run_frame<G: Game>(&mut self, game: &mut G) -> Result<()> {
        self.resources.poll();
        game.update(self)?;

        // Until the game starts the clock, frames draw without moving anything.
        if self.scheduler.is_started() {
            self.scheduler.frame(Instant::now(), &mut self.canvas);
        } else {
            self.scheduler.step(0.0, &mut self.canvas);
        }

        self.canvas.copy_to(self.pixels.frame_mut());
        self.pixels.render().map_err(HostError::Present)?;
        Ok(())
    }

    /// Access the underlying winit window.
    pub fn window(&self) -> &Window {
        self.window
    }

    /// Access the scheduler, which owns the world and the compositor.
    pub fn scheduler(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Access the image loader.
    pub fn resources(&mut self) -> &mut Resources {
        &mut self.resources
    }

    /// Request that the engine exit after the current frame.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }
}

/// Trait implemented by user code to hook into the engine lifecycle.
pub trait Game {
    /// Called once after the window is created but before the first frame.
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()>;

    /// Called before every frame.
    fn update(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }
}
