//! The windowed runner: a winit event loop driving a [`FramePipeline`].

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::Config;
use crate::error::MandalaError;
use crate::gpu::GpuRenderer;
use crate::input::{Command, Input};
use crate::pipeline::FramePipeline;
use crate::time::FpsEstimator;

/// Open a window and run until Escape, close, or the time budget runs out.
pub fn run_windowed(config: &Config) -> Result<(), MandalaError> {
    let pipeline = FramePipeline::new(config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(pipeline);
    event_loop.run_app(&mut app)?;
    app.finish()
}

struct App {
    pipeline: FramePipeline,
    window: Option<Arc<Window>>,
    renderer: Option<GpuRenderer>,
    input: Input,
    fps: FpsEstimator,
    started: Instant,
    error: Option<MandalaError>,
}

impl App {
    fn new(pipeline: FramePipeline) -> Self {
        Self {
            pipeline,
            window: None,
            renderer: None,
            input: Input::new(),
            fps: FpsEstimator::default(),
            started: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), MandalaError> {
        let (width, height) = self.pipeline.simulation().size();
        let attrs = Window::default_attributes()
            .with_title(self.pipeline.hud(0.0, (width, height)))
            .with_inner_size(PhysicalSize::new(width, height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let mut renderer = pollster::block_on(GpuRenderer::new(
            window.clone(),
            (width, height),
            self.pipeline.simulation().len(),
            self.pipeline.config().vsync,
        ))?;
        self.pipeline.prepare(&mut renderer)?;

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);

        // Setup time is not a frame.
        self.fps = FpsEstimator::default();
        self.started = Instant::now();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<(), MandalaError> {
        let (Some(window), Some(renderer)) = (&self.window, &mut self.renderer) else {
            return Ok(());
        };

        let sample = self.fps.tick();
        self.pipeline.advance(sample, renderer)?;
        window.set_title(&self.pipeline.hud(sample.smoothed_fps, renderer.surface_size()));

        if self
            .pipeline
            .budget_exhausted(self.started.elapsed().as_secs_f64())
        {
            log::info!(
                "time budget reached after {} frames ({:.1} fps)",
                self.pipeline.frames(),
                sample.smoothed_fps
            );
            event_loop.exit();
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<(), MandalaError> {
        let Some(renderer) = &mut self.renderer else {
            return Ok(());
        };
        if let Err(e) = renderer.resize_surface(size.width, size.height) {
            log::warn!("{}", e);
            self.pipeline.prepare(renderer)?;
        }
        Ok(())
    }

    fn command(&mut self, command: Command, event_loop: &ActiveEventLoop) {
        match command {
            Command::Quit => event_loop.exit(),
            Command::ToggleMirror => self.pipeline.toggle_mirror(),
            Command::ToggleAttractors => self.pipeline.toggle_attractors(),
            Command::ToggleTrail => self.pipeline.toggle_trail(),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: MandalaError) {
        log::error!("{}", error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn finish(self) -> Result<(), MandalaError> {
        log::info!("shutting down after {} frames", self.pipeline.frames());
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(command) = self.input.handle_key_event(&event) {
                    self.command(command, event_loop);
                }
            }
            WindowEvent::Focused(false) => {
                self.input.clear();
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = self.resize(size) {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw(event_loop) {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
