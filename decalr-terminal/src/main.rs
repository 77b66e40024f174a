/// Decalr Terminal - Decal configurator in the terminal
///
/// Usage: decalr-terminal [model.stl] [config.json]
///
/// Without a model a cube is shown.
/// Controls:
///   - Click: Place a decal where the pointer hits the model
///   - Drag: Orbit the camera
///   - +/-: Resize the last decal
///   - [/]: Change its opacity
///   - X: Remove it
///   - C: Cycle the model colour
///   - Q/ESC: Quit
use decalr_core::{stl, ConfiguratorConfig, Mesh, SceneNode};
use decalr_terminal::TerminalApp;
use std::env;
use std::io;

fn main() -> io::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mesh = match args.get(1) {
        Some(path) => stl::load_stl(path).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?,
        None => {
            log::info!("no STL file provided, using default cube");
            Mesh::cube(2.0)
        }
    };

    let config = match args.get(2) {
        Some(path) => ConfiguratorConfig::load(path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?,
        None => ConfiguratorConfig::default(),
    };

    println!("Loaded {} triangles", mesh.triangles.len());
    println!("Starting decal configurator (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(SceneNode::mesh(mesh), config)?;
    app.run()?;

    println!("Thank you for using Decalr!");
    Ok(())
}
