/// Terminal front end for the decal configurator
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use decalr_core::{Configurator, ConfiguratorConfig, ErrorPresenter, PlacementOutcome, ResizeMode, SceneNode};
use std::cell::RefCell;
use std::io::{self, stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub mod loader;
pub mod renderer;

pub use loader::FileTextureSource;
pub use renderer::AsciiRenderer;

/// Radians of orbit per dragged cell
const ORBIT_SPEED: f32 = 0.05;
/// Size change per `+`/`-` press
const RESIZE_STEP: f32 = 1.1;
const OPACITY_STEP: f32 = 0.1;
/// Colours cycled through with `c`
const PART_COLORS: [[u8; 3]; 4] = [[220, 60, 60], [60, 160, 220], [240, 200, 40], [230, 230, 230]];

/// Left-button gesture in progress
#[derive(Debug, Clone, Copy)]
struct DragState {
    press: (u16, u16),
    last: (u16, u16),
    /// Set once the pointer leaves the click threshold
    orbiting: bool,
}

/// Shows the latest message in the status bar
#[derive(Debug, Clone, Default)]
pub struct StatusLine(Rc<RefCell<Option<String>>>);

impl StatusLine {
    pub fn set(&self, message: impl Into<String>) {
        *self.0.borrow_mut() = Some(message.into());
    }

    pub fn message(&self) -> Option<String> {
        self.0.borrow().clone()
    }
}

impl ErrorPresenter for StatusLine {
    fn present(&mut self, title: &str, description: &str) {
        log::error!("{title}: {description}");
        self.set(format!("{title}: {description}"));
    }
}

/// Main application struct for the terminal configurator
pub struct TerminalApp {
    configurator: Configurator,
    renderer: AsciiRenderer,
    status: StatusLine,
    drag: Option<DragState>,
    next_color: usize,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(model: SceneNode, config: ConfiguratorConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(model, config, width as usize, height as usize))
    }

    /// Build without querying the terminal
    pub fn with_size(model: SceneNode, config: ConfiguratorConfig, width: usize, height: usize) -> Self {
        let renderer = AsciiRenderer::new(width, height);
        let status = StatusLine::default();
        let mut configurator = Configurator::new(
            config,
            renderer.viewport(),
            Box::new(FileTextureSource),
            Box::new(status.clone()),
        );
        configurator.load_model(model);

        Self {
            configurator,
            renderer,
            status,
            drag: None,
            next_color: 0,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn configurator(&self) -> &Configurator {
        &self.configurator
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        execute!(stdout(), DisableMouseCapture, terminal::LeaveAlternateScreen, cursor::Show)?;
        terminal::disable_raw_mode()?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            self.update();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, .. }) => self.handle_key(code),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.configurator.set_viewport(self.renderer.viewport());
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.scale_last(RESIZE_STEP),
            KeyCode::Char('-') => self.scale_last(1.0 / RESIZE_STEP),
            KeyCode::Char(']') => self.fade_last(OPACITY_STEP),
            KeyCode::Char('[') => self.fade_last(-OPACITY_STEP),
            KeyCode::Char('c') => self.cycle_model_color(),
            KeyCode::Char('x') => {
                if let Some(id) = self.configurator.last_decal() {
                    self.configurator.remove_decal(id);
                    self.status.set(format!("removed decal {id:?}"));
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let position = AsciiRenderer::cell_to_screen(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let cell = (mouse.column, mouse.row);
                self.drag = Some(DragState {
                    press: cell,
                    last: cell,
                    orbiting: false,
                });
                self.configurator.pointer_down(position);
            }
            MouseEventKind::Drag(MouseButton::Left) => self.drag_to(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag = None;
                if self.configurator.pointer_up(position).is_some() && self.configurator.pending_count() > 0 {
                    self.status.set("loading texture...");
                }
            }
            _ => {}
        }
    }

    /// Orbit by the dragged distance, but only once the gesture can no longer be a click
    fn drag_to(&mut self, column: u16, row: u16) {
        let threshold = self.configurator.config().click_threshold_px;
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        if !drag.orbiting {
            let moved = AsciiRenderer::cell_to_screen(column, row)
                - AsciiRenderer::cell_to_screen(drag.press.0, drag.press.1);
            if moved.norm_squared() < threshold * threshold {
                return;
            }
            drag.orbiting = true;
        }

        let (last_column, last_row) = std::mem::replace(&mut drag.last, (column, row));
        let yaw = (last_column as f32 - column as f32) * ORBIT_SPEED;
        let pitch = (row as f32 - last_row as f32) * ORBIT_SPEED;
        self.configurator.camera_mut().orbit(yaw, pitch);
    }

    fn scale_last(&mut self, factor: f32) {
        let Some(id) = self.configurator.last_decal() else {
            return;
        };
        let Some(decal) = self.configurator.decal(id) else {
            return;
        };
        // Relative resizes are measured against the size the decal was built with
        let base = match self.configurator.config().decal.resize_mode {
            ResizeMode::Relative => decal.footprint().size,
            ResizeMode::Absolute => decal.size(),
        };
        if let Err(err) = self
            .configurator
            .resize_decal(id, base.width * factor, base.height * factor)
        {
            self.status.set(err.to_string());
        }
    }

    /// Recolour the loaded model mesh with the next palette entry
    fn cycle_model_color(&mut self) {
        let Some(name) = self
            .configurator
            .model()
            .and_then(|model| model.children.first())
            .map(|part| part.name.clone())
        else {
            return;
        };
        let color = PART_COLORS[self.next_color % PART_COLORS.len()];
        self.next_color += 1;
        if self.configurator.set_part_color(&name, color).is_ok() {
            self.status.set(format!("'{name}' colour {color:?}"));
        }
    }

    fn fade_last(&mut self, delta: f32) {
        let Some(id) = self.configurator.last_decal() else {
            return;
        };
        let Some(opacity) = self.configurator.decal(id).map(|d| d.material.opacity) else {
            return;
        };
        match self.configurator.set_decal_opacity(id, opacity + delta) {
            Ok(()) => self.status.set(format!("opacity {:.1}", opacity + delta)),
            Err(err) => self.status.set(err.to_string()),
        }
    }

    /// Build decals whose textures have finished loading
    pub fn update(&mut self) {
        for outcome in self.configurator.poll() {
            if let PlacementOutcome::Placed(id) = outcome {
                self.status.set(format!("placed decal {id:?}"));
            }
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();

        let camera = self.configurator.camera();
        self.renderer.render_scene(&self.configurator.scene().nodes, camera);
        for (_, decal) in self.configurator.decals() {
            self.renderer.render_decal(decal, camera);
        }

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        let status = self.status.message().unwrap_or_default();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "decalr | FPS: {:.1} | decals: {} | click=place drag=orbit +/-=size [/]=opacity x=remove c=colour q=quit",
                self.fps,
                self.configurator.decals().count()
            )),
            cursor::MoveTo(0, 1),
            terminal::Clear(ClearType::UntilNewLine),
            Print(status),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use decalr_core::Mesh;

    fn app() -> TerminalApp {
        let mut config = ConfiguratorConfig::default();
        config.camera.position = [0.0, 0.0, 5.0];
        config.camera.look_at = [0.0, 0.0, 0.0];
        config.model.offset = [0.0, 0.0, 0.0];
        TerminalApp::with_size(SceneNode::mesh(Mesh::plane(4.0, 4.0)), config, 80, 24)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_drag_orbits_without_placing() {
        let mut app = app();
        let before = app.configurator().camera().position;
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 40, 12));
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 50, 12));
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 50, 12));

        assert_ne!(app.configurator().camera().position, before);
        assert_eq!(app.configurator().pending_count(), 0);
    }

    #[test]
    fn test_small_drag_still_clicks_from_same_camera() {
        let mut app = app();
        let before = app.configurator().camera().position;
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 40, 12));
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 41, 12));
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 41, 12));

        assert_eq!(app.configurator().camera().position, before);
        assert_eq!(app.configurator().pending_count(), 1);
    }

    #[test]
    fn test_click_requests_texture() {
        let mut app = app();
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 40, 12));
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 40, 12));
        assert_eq!(app.configurator().pending_count(), 1);
        assert_eq!(app.status.message().as_deref(), Some("loading texture..."));
    }

    #[test]
    fn test_status_line_presents_errors() {
        let mut status = StatusLine::default();
        status.present("Failed To Load Asset", "missing");
        assert_eq!(status.message().as_deref(), Some("Failed To Load Asset: missing"));
    }

    #[test]
    fn test_colour_key_tints_model() {
        let mut app = app();
        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        let part = &app.configurator().model().unwrap().children[0];
        let decalr_core::NodeKind::Mesh(mesh) = &part.kind else {
            panic!("model part is a mesh");
        };
        assert_eq!(mesh.color, Some(PART_COLORS[0]));
        assert_eq!(app.status.message().as_deref(), Some("'plane' colour [220, 60, 60]"));
    }

    #[test]
    fn test_quit_key() {
        let mut app = app();
        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(!app.running);
    }
}
