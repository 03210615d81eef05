/// Tavern demo — a branching conversation driven by a simulated game loop.
///
/// The innkeeper greets the player; when her lines run out the options are
/// offered and the demo picks one, then plays the chosen branch. Afterwards
/// the bard sings a voiced song that advances on its own.
///
/// Run with: cargo run --example tavern

use dialogue_engine::core::config::SceneConfig;
use dialogue_engine::core::presenter::{AudioPlayer, ChoiceSurface, ChoiceView, Presenter};
use dialogue_engine::core::scene::Scene;
use dialogue_engine::core::session::RevealState;
use dialogue_engine::core::store::ContentLibrary;
use dialogue_engine::schema::content::ClipHandle;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

struct Subtitles {
    speaker: &'static str,
}

impl Presenter for Subtitles {
    fn show(&mut self) {}

    fn hide(&mut self) {
        println!("   (the conversation ends)");
    }

    fn render_partial(&mut self, _text: &str) {}

    fn render_final(&mut self, text: &str) {
        println!("{:>6}: {}", self.speaker, text);
    }
}

#[derive(Default)]
struct Menu {
    offered: Vec<ChoiceView>,
}

impl ChoiceSurface for Menu {
    fn show_choices(&mut self, choices: &[ChoiceView]) {
        println!();
        for (i, choice) in choices.iter().enumerate() {
            println!("   {}. {}", i + 1, choice.text);
        }
        self.offered = choices.to_vec();
    }

    fn hide_choices(&mut self) {
        self.offered.clear();
    }
}

#[derive(Default)]
struct Lute {
    playing: bool,
}

impl AudioPlayer for Lute {
    fn play_clip(&mut self, clip: &ClipHandle) {
        println!("        ♪ {}", clip);
        self.playing = true;
    }

    fn stop_current(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

fn main() {
    let mut library = ContentLibrary::new();
    library
        .load_dir(Path::new("dialogue_data/content"))
        .expect("Failed to load dialogue content");

    // --- The innkeeper: branching ---
    let config = SceneConfig::load_from_ron(Path::new("dialogue_data/scenes/tavern_scene.ron"))
        .expect("Failed to load tavern scene");
    let menu = Rc::new(RefCell::new(Menu::default()));
    let mut tavern = Scene::build(
        "innkeeper",
        &config,
        &library,
        Subtitles { speaker: "Marta" },
        Rc::clone(&menu),
        Lute::default(),
    )
    .expect("Failed to build tavern scene");

    tavern.start().expect("Failed to start tavern dialogue");
    let mut frames = 0;
    let mut chosen = false;
    while frames < 5_000 {
        frames += 1;
        tavern.session.tick(FRAME).expect("tick failed");

        // The player presses "next" as soon as a line is fully shown.
        if tavern.session.reveal_state() == RevealState::Complete {
            tavern.session.request_advance().expect("advance failed");
        }

        let pick = menu.borrow().offered.first().map(|c| c.key.clone());
        if let Some(key) = pick {
            if chosen {
                break;
            }
            println!("   > {}\n", key);
            tavern.choose(&key).expect("choice failed");
            chosen = true;
        }
    }
    tavern.skip().expect("skip failed");
    println!("\n({} frames)\n", frames);

    // --- The bard: voiced, auto-advancing ---
    let config = SceneConfig::load_from_ron(Path::new("dialogue_data/scenes/bard_scene.ron"))
        .expect("Failed to load bard scene");
    let mut bard = Scene::build(
        "bard",
        &config,
        &library,
        Subtitles { speaker: "Edric" },
        Menu::default(),
        Lute::default(),
    )
    .expect("Failed to build bard scene");

    bard.start().expect("Failed to start song");
    let mut frames = 0;
    while !bard.session.is_ended() || bard.session.reveal_state() == RevealState::Revealing {
        frames += 1;
        bard.session.tick(FRAME).expect("tick failed");
        if frames > 5_000 {
            break;
        }
    }
    bard.skip().expect("skip failed");
    println!("\n({} frames)", frames);
}
