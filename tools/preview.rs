/// Preview — interactive shell for stepping through a dialogue scene.
///
/// Usage: preview --scene <scene.ron> --content <dir> [--speed <secs>] [--delay <secs>]
///
/// Commands:
///   start             — open the scene's dialogue
///   next              — the player's "next" button
///   tick <ms>         — let time pass
///   run               — tick until the current line is fully shown
///   pause / resume    — suspend or continue the reveal
///   skip              — end the dialogue now
///   choose <key>      — pick a branch option
///   speed <secs>      — per-character delay for following lines
///   status            — show session state
///   help              — list commands
///   quit              — exit
///
/// Log verbosity follows `RUST_LOG` (default `warn`).

use dialogue_engine::core::config::SceneConfig;
use dialogue_engine::core::controller::{DialogueFlow, SceneController};
use dialogue_engine::core::presenter::{AudioPlayer, ChoiceSurface, ChoiceView, Presenter};
use dialogue_engine::core::scene::Scene;
use dialogue_engine::core::session::RevealState;
use dialogue_engine::core::store::ContentLibrary;
use dialogue_engine::schema::content::ClipHandle;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const RUN_STEP: Duration = Duration::from_millis(50);
const RUN_LIMIT: usize = 10_000;

/// Prints the line as it grows, on a single terminal row.
#[derive(Default)]
struct ConsolePresenter {
    width: usize,
}

impl ConsolePresenter {
    fn redraw(&mut self, text: &str) {
        let len = text.chars().count();
        let pad = self.width.saturating_sub(len);
        print!("\r  {}{}", text, " ".repeat(pad));
        io::stdout().flush().ok();
        self.width = len;
    }
}

impl Presenter for ConsolePresenter {
    fn show(&mut self) {
        println!("[dialogue shown]");
        self.width = 0;
    }

    fn hide(&mut self) {
        println!("\n[dialogue hidden]");
    }

    fn render_partial(&mut self, text: &str) {
        self.redraw(text);
    }

    fn render_final(&mut self, text: &str) {
        self.redraw(text);
        println!();
        self.width = 0;
    }
}

struct ConsoleChoices;

impl ChoiceSurface for ConsoleChoices {
    fn show_choices(&mut self, choices: &[ChoiceView]) {
        println!("Options:");
        for choice in choices {
            println!("  [{}] {}", choice.key, choice.text);
        }
    }

    fn hide_choices(&mut self) {}
}

#[derive(Default)]
struct ConsoleAudio {
    playing: Option<ClipHandle>,
}

impl AudioPlayer for ConsoleAudio {
    fn play_clip(&mut self, clip: &ClipHandle) {
        println!("  ♪ {}", clip);
        self.playing = Some(clip.clone());
    }

    fn stop_current(&mut self) {
        self.playing = None;
    }

    fn is_playing(&self) -> bool {
        self.playing.is_some()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut scene_path = None;
    let mut content_path = None;
    let mut speed = None;
    let mut delay = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scene" if i + 1 < args.len() => {
                i += 1;
                scene_path = Some(args[i].clone());
            }
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_path = Some(args[i].clone());
            }
            "--speed" if i + 1 < args.len() => {
                i += 1;
                speed = args[i].parse::<f32>().ok();
            }
            "--delay" if i + 1 < args.len() => {
                i += 1;
                delay = args[i].parse::<f32>().ok();
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (Some(scene_path), Some(content_path)) = (scene_path, content_path) else {
        print_usage();
        std::process::exit(1);
    };

    let mut config = match SceneConfig::load_from_ron(Path::new(&scene_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR loading scene {}: {}", scene_path, e);
            std::process::exit(1);
        }
    };
    if let Some(speed) = speed {
        config.session.typing_speed = speed;
    }
    if let Some(delay) = delay {
        config.session.next_line_delay = delay;
    }

    let library = load_library(&content_path);
    println!("Loaded {} dialogue contents", library.len());

    let name = Path::new(&scene_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scene")
        .to_string();
    let mut scene = match Scene::build(
        &name,
        &config,
        &library,
        ConsolePresenter::default(),
        ConsoleChoices,
        ConsoleAudio::default(),
    ) {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Scene '{}' ({}) starting at '{}'",
        name,
        config.mode.name(),
        config.start
    );
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        let result = match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
                Ok(())
            }
            "start" => scene.start().map_err(|e| e.to_string()),
            "next" | "n" => scene.session.request_advance().map_err(|e| e.to_string()),
            "tick" => {
                let ms = parts.get(1).and_then(|s| s.parse::<u64>().ok());
                match ms {
                    Some(ms) => scene
                        .session
                        .tick(Duration::from_millis(ms))
                        .map_err(|e| e.to_string()),
                    None => {
                        println!("Usage: tick <ms>");
                        Ok(())
                    }
                }
            }
            "run" => run_line(&scene),
            "pause" => scene.session.pause().map(|_| ()).map_err(|e| e.to_string()),
            "resume" => scene.session.resume().map_err(|e| e.to_string()),
            "skip" => scene.skip().map_err(|e| e.to_string()),
            "choose" => match parts.get(1) {
                Some(key) => scene.choose(key).map_err(|e| e.to_string()),
                None => {
                    print_options(&mut scene);
                    Ok(())
                }
            },
            "speed" => match parts.get(1).and_then(|s| s.parse::<f32>().ok()) {
                Some(secs) => scene
                    .session
                    .set_typing_speed(secs)
                    .map_err(|e| e.to_string()),
                None => {
                    println!("Usage: speed <secs>");
                    Ok(())
                }
            },
            "status" => {
                print_status(&scene);
                Ok(())
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("ERROR: {}", e);
        }
    }
}

/// Tick in small steps until the current line stops revealing.
fn run_line(scene: &Scene) -> Result<(), String> {
    for _ in 0..RUN_LIMIT {
        if scene.session.reveal_state() != RevealState::Revealing {
            return Ok(());
        }
        scene.session.tick(RUN_STEP).map_err(|e| e.to_string())?;
    }
    Err("line did not finish revealing".to_string())
}

fn print_options(scene: &mut Scene) {
    match scene.controller.as_branching() {
        Some(branching) => {
            println!("Usage: choose <key>");
            for option in branching.options() {
                let target = option
                    .target
                    .as_ref()
                    .map(|t| t.id.to_string())
                    .unwrap_or_else(|| "<missing>".to_string());
                println!("  [{}] {} -> {}", option.key, option.text, target);
            }
        }
        None => println!("This scene has no options."),
    }
}

fn print_status(scene: &Scene) {
    let session = &scene.session;
    println!("\n--- Session ---");
    println!(
        "Controller: {} ({})",
        scene.controller.name(),
        scene.controller.kind()
    );
    println!(
        "Content:    {}",
        session
            .content_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!(
        "Line:       {} of {}",
        session.current_index(),
        session.line_count()
    );
    println!("Active:     {}", session.is_active());
    println!("Ended:      {}", session.is_ended());
    println!("Reveal:     {:?}", session.reveal_state());
    println!("Visible:    {:?}", session.visible_text());
    let config = session.config();
    println!(
        "Timing:     {:.3}s/char, {:.3}s auto-advance",
        config.typing_speed, config.next_line_delay
    );
    if let SceneController::Voice(voice) = &scene.controller {
        println!("Listening:  {}", voice.is_listening());
    }
    println!("--- End ---\n");
}

fn load_library(path: &str) -> ContentLibrary {
    let mut library = ContentLibrary::new();
    let p = Path::new(path);
    let result = if p.is_file() {
        library.load_from_ron(p)
    } else if p.is_dir() {
        library.load_dir(p)
    } else {
        eprintln!("Content path not found: {}", path);
        std::process::exit(1);
    };
    if let Err(e) = result {
        eprintln!("ERROR loading content {}: {}", path, e);
        std::process::exit(1);
    }
    library
}

fn print_usage() {
    println!("Usage: preview --scene <scene.ron> --content <dir> [--speed <secs>] [--delay <secs>]");
}

fn print_help() {
    println!("Commands:");
    println!("  start             open the scene's dialogue");
    println!("  next | n          the player's \"next\" button");
    println!("  tick <ms>         let time pass");
    println!("  run               tick until the current line is fully shown");
    println!("  pause | resume    suspend or continue the reveal");
    println!("  skip              end the dialogue now");
    println!("  choose [key]      pick a branch option (no key lists them)");
    println!("  speed <secs>      per-character delay for following lines");
    println!("  status            show session state");
    println!("  quit              exit");
}
