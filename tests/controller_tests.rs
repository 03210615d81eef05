/// Controller and scene integration tests against the RON fixtures.

use dialogue_engine::core::config::{SceneConfig, SessionConfig};
use dialogue_engine::core::controller::{
    Branching, BranchingController, ControllerError, DialogueFlow, OptionEntry, SceneController,
    VoiceController, Voiced,
};
use dialogue_engine::core::events::DialogueEvent;
use dialogue_engine::core::presenter::{AudioPlayer, ChoiceSurface, ChoiceView, TextPresenter};
use dialogue_engine::core::registry::SessionRegistry;
use dialogue_engine::core::scene::Scene;
use dialogue_engine::core::session::DialogueSession;
use dialogue_engine::core::store::ContentLibrary;
use dialogue_engine::schema::content::{ClipHandle, ContentId, DialogueContent, Line};
use dialogue_engine::schema::mode::VoiceClipSpec;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

#[derive(Default)]
struct Choices {
    keys: Vec<String>,
    visible: bool,
}

impl ChoiceSurface for Choices {
    fn show_choices(&mut self, choices: &[ChoiceView]) {
        self.keys = choices.iter().map(|c| c.key.clone()).collect();
        self.visible = true;
    }

    fn hide_choices(&mut self) {
        self.visible = false;
    }
}

#[derive(Default)]
struct Speaker {
    played: Vec<ClipHandle>,
    playing: bool,
}

impl AudioPlayer for Speaker {
    fn play_clip(&mut self, clip: &ClipHandle) {
        self.played.push(clip.clone());
        self.playing = true;
    }

    fn stop_current(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

fn library() -> ContentLibrary {
    let mut library = ContentLibrary::new();
    library
        .load_from_ron(Path::new("tests/fixtures/test_content.ron"))
        .unwrap();
    library
}

#[test]
fn unknown_option_leaves_session_untouched() {
    let library = library();
    let session = DialogueSession::builder()
        .config(SessionConfig::instant())
        .content(library.require(&ContentId::new("intro")).unwrap())
        .presenter(TextPresenter::default())
        .build();
    let mut controller = BranchingController::new(
        "innkeeper",
        Some(session.clone()),
        vec![OptionEntry::new(
            "Stay",
            "stay",
            library.get(&ContentId::new("inn")),
        )],
        Choices::default(),
    );
    controller.start_dialogue().unwrap();
    session.request_advance().unwrap();
    let index = session.current_index();

    assert_eq!(
        controller.choose_option("missing-key"),
        Err(ControllerError::UnknownOption("missing-key".to_string()))
    );
    assert_eq!(session.current_index(), index);
    assert_eq!(session.content_id(), Some(ContentId::new("intro")));
}

#[test]
fn branching_scene_from_fixture() {
    let config = SceneConfig::load_from_ron(Path::new("tests/fixtures/test_scene.ron")).unwrap();
    let choices = Rc::new(RefCell::new(Choices::default()));
    let presenter = Rc::new(RefCell::new(TextPresenter::default()));
    let mut scene = Scene::build(
        "innkeeper",
        &config,
        &library(),
        Rc::clone(&presenter),
        Rc::clone(&choices),
        Speaker::default(),
    )
    .unwrap();

    // "lore" is not in the library, so only two options can be offered.
    let offered = match &scene.controller {
        SceneController::Branching(c) => c.options().iter().filter(|o| o.target.is_some()).count(),
        other => panic!("expected branching, got {:?}", other),
    };
    assert_eq!(offered, 2);

    scene.start().unwrap();
    for _ in 0..16 {
        if choices.borrow().visible {
            break;
        }
        scene.session.request_advance().unwrap();
    }
    assert!(scene.session.is_ended());
    assert!(choices.borrow().visible);
    assert_eq!(choices.borrow().keys, vec!["stay", "leave"]);

    assert!(scene.choose("wolves").is_err());
    scene.choose("leave").unwrap();
    assert!(!choices.borrow().visible);
    assert_eq!(scene.session.content_id(), Some(ContentId::new("road")));
    assert_eq!(presenter.borrow().text, "S");
}

#[test]
fn voice_scenario_clip_per_line_then_unsubscribed() {
    let session = DialogueSession::builder()
        .config(SessionConfig::instant())
        .content(Rc::new(DialogueContent::from_texts("duet", ["First", "Second"])))
        .presenter(TextPresenter::default())
        .build();
    let speaker = Rc::new(RefCell::new(Speaker::default()));
    let clips = vec![
        VoiceClipSpec {
            line_index: 0,
            clip: ClipHandle::new("clipA"),
        },
        VoiceClipSpec {
            line_index: 1,
            clip: ClipHandle::new("clipB"),
        },
    ];
    let mut controller =
        VoiceController::new("bard", Some(session.clone()), &clips, Rc::clone(&speaker));

    controller.start_dialogue().unwrap();
    assert_eq!(speaker.borrow().played, vec![ClipHandle::new("clipA")]);

    session.request_advance().unwrap();
    session.request_advance().unwrap();
    assert_eq!(
        speaker.borrow().played,
        vec![ClipHandle::new("clipA"), ClipHandle::new("clipB")]
    );
    assert!(!controller.is_listening());
    assert_eq!(session.events().listener_count(), 0);

    session.events().emit(&DialogueEvent::LineChanged {
        line: Line::new(0, "First"),
        index: 0,
    });
    assert_eq!(speaker.borrow().played.len(), 2);

    // Direct playback still works after the listener is gone.
    controller.play_voice(1).unwrap();
    assert_eq!(speaker.borrow().played.len(), 3);
}

#[test]
fn voice_scene_from_fixture() {
    let config =
        SceneConfig::load_from_ron(Path::new("tests/fixtures/test_voice_scene.ron")).unwrap();
    let speaker = Rc::new(RefCell::new(Speaker::default()));
    let mut scene = Scene::build(
        "road",
        &config,
        &library(),
        TextPresenter::default(),
        Choices::default(),
        Rc::clone(&speaker),
    )
    .unwrap();
    scene.start().unwrap();
    scene.session.request_advance().unwrap();
    assert_eq!(
        speaker.borrow().played,
        vec![ClipHandle::new("road_00.ogg"), ClipHandle::new("road_01.ogg")]
    );
    scene.skip().unwrap();
    assert!(!speaker.borrow().playing);
    assert!(!scene.session.is_active());
}

#[test]
fn controllers_share_registered_session() {
    let library = library();
    let session = DialogueSession::builder()
        .content(library.require(&ContentId::new("road")).unwrap())
        .presenter(TextPresenter::default())
        .build();
    let mut registry = SessionRegistry::new();
    registry.register("tavern", session.clone());

    let mut branching = BranchingController::from_specs(
        "innkeeper",
        None,
        &registry,
        &[],
        &library,
        Choices::default(),
    );
    let voice = VoiceController::from_registry("bard", None, &registry, &[], Speaker::default());

    branching.start_dialogue().unwrap();
    assert!(voice.session().map(DialogueSession::is_active).unwrap_or(false));
    assert_eq!(branching.show_options(), 0);
}
