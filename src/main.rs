//! Meadow - interactive grass field viewer

use std::process::ExitCode;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::KeyCode,
    window::{Window, WindowId},
};

use meadow::config::AppConfig;
use meadow::core::{
    camera::OrbitCamera,
    camera_controller::OrbitCameraController,
    input::InputState,
    logging,
    time::FrameTimer,
};
use meadow::grass::{Blade, GrassSystem};
use meadow::render::{FrameOutcome, GrassRenderer, window};

/// Seconds between title bar refreshes
const TITLE_INTERVAL: f32 = 1.0;

struct App {
    config: AppConfig,
    population: Vec<Blade>,
    window: Option<Arc<Window>>,
    renderer: Option<GrassRenderer>,
    input: InputState,
    camera: OrbitCamera,
    controller: OrbitCameraController,
    timer: FrameTimer,
    title_timer: f32,
    failed: bool,
}

impl App {
    fn new(config: AppConfig, population: Vec<Blade>) -> Self {
        Self {
            config,
            population,
            window: None,
            renderer: None,
            input: InputState::new(),
            camera: OrbitCamera::default(),
            controller: OrbitCameraController::default(),
            timer: FrameTimer::new(),
            title_timer: 0.0,
            failed: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: impl std::fmt::Display) {
        log::error!("{}", message);
        self.failed = true;
        self.shutdown();
        event_loop.exit();
    }

    fn shutdown(&mut self) {
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.drain() {
                log::warn!("Drain on shutdown failed: {}", e);
            }
        }
    }

    fn handle_toggles(&mut self, event_loop: &ActiveEventLoop) {
        if self.input.is_key_just_pressed(KeyCode::Escape) {
            self.shutdown();
            event_loop.exit();
            return;
        }

        let Some(renderer) = &mut self.renderer else {
            return;
        };
        let settings = renderer.grass_mut().cull_settings_mut();
        if self.input.is_key_just_pressed(KeyCode::F1) {
            settings.animate = !settings.animate;
            log::info!("Animation: {}", settings.animate);
        }
        if self.input.is_key_just_pressed(KeyCode::F2) {
            settings.orientation = !settings.orientation;
            log::info!("Orientation culling: {}", settings.orientation);
        }
        if self.input.is_key_just_pressed(KeyCode::F3) {
            settings.frustum = !settings.frustum;
            log::info!("Frustum culling: {}", settings.frustum);
        }
        if self.input.is_key_just_pressed(KeyCode::F4) {
            settings.distance = !settings.distance;
            log::info!("Distance culling: {}", settings.distance);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let time = self.timer.tick();
        self.controller.update(&mut self.camera, &self.input);
        self.handle_toggles(event_loop);

        let Some(renderer) = &mut self.renderer else {
            return;
        };
        match renderer.draw_frame(&self.camera, time) {
            Ok(FrameOutcome::Presented) => {}
            Ok(FrameOutcome::Skipped) => log::debug!("Frame skipped"),
            Ok(FrameOutcome::Exit) => {
                self.fail(event_loop, "Surface lost, exiting");
                return;
            }
            Err(e) => {
                self.fail(event_loop, format!("Frame failed: {e}"));
                return;
            }
        }

        self.input.end_frame();

        self.title_timer += time.delta;
        if self.title_timer >= TITLE_INTERVAL {
            self.title_timer = 0.0;
            if let Some(window) = &self.window {
                window.set_title(&format!(
                    "{} - {:.1} FPS | {} blades | drag=orbit, scroll=zoom, F1-F4=toggle culling",
                    self.config.window.title,
                    self.timer.fps(),
                    self.population.len()
                ));
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match window::create(event_loop, &self.config.window) {
            Ok(window) => window,
            Err(e) => return self.fail(event_loop, e),
        };
        let size = window.inner_size();
        self.camera.set_aspect(size.width as f32, size.height as f32);

        let renderer = match pollster::block_on(GrassRenderer::new(window.clone(), &self.config, &self.population)) {
            Ok(renderer) => renderer,
            Err(e) => return self.fail(event_loop, e),
        };

        let visible = renderer.grass().estimate_visible(&self.population, &self.camera);
        log::info!(
            "Field: {} blades, ~{} visible from the initial view",
            self.population.len(),
            visible
        );

        self.window = Some(window);
        self.renderer = Some(renderer);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        self.input.process_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
                self.camera.set_aspect(size.width as f32, size.height as f32);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    log::info!("Meadow starting...");

    let args: Vec<String> = std::env::args().collect();
    let config = match AppConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let grass = GrassSystem::new(config.grass.clone(), config.cull.clone());
    let population = grass.generate();
    log::info!(
        "Generated {} blades ({:?} placement, bounds {})",
        population.len(),
        config.grass.placement,
        config.grass.bounds
    );

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new(config, population);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        return ExitCode::FAILURE;
    }

    if app.failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
