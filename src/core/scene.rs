/// Scene assembly: content and scene config into a session plus controller.
use std::path::Path;
use thiserror::Error;

use crate::core::config::{ConfigError, SceneConfig};
use crate::core::controller::{
    Branching, BranchingController, ControllerError, DialogueFlow, LinearController,
    SceneController, VoiceController,
};
use crate::core::presenter::{AudioPlayer, ChoiceSurface, Presenter};
use crate::core::registry::SessionRegistry;
use crate::core::session::DialogueSession;
use crate::core::store::{ContentError, ContentLibrary};
use crate::schema::mode::ModeConfig;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("controller error: {0}")]
    Controller(#[from] ControllerError),
}

/// A session plus the controller that drives it.
#[derive(Debug)]
pub struct Scene {
    pub session: DialogueSession,
    pub controller: SceneController,
}

impl Scene {
    /// Wire a scene. The start content must exist in `library`; option
    /// targets that don't are logged and left unchoosable.
    pub fn build(
        name: &str,
        config: &SceneConfig,
        library: &ContentLibrary,
        presenter: impl Presenter + 'static,
        surface: impl ChoiceSurface + 'static,
        player: impl AudioPlayer + 'static,
    ) -> Result<Scene, SceneError> {
        let start = library.require(&config.start)?;
        let session = DialogueSession::builder()
            .config(config.session)
            .content(start)
            .presenter(presenter)
            .build();
        let mut registry = SessionRegistry::new();
        registry.register(name, session.clone());

        let controller = match &config.mode {
            ModeConfig::Linear => {
                SceneController::Linear(LinearController::from_registry(name, None, &registry))
            }
            ModeConfig::Branching {
                options,
                after_dialogue,
            } => {
                let mut controller = BranchingController::from_specs(
                    name, None, &registry, options, library, surface,
                );
                if *after_dialogue {
                    controller.show_options_after_dialogue()?;
                }
                SceneController::Branching(controller)
            }
            ModeConfig::Voice { clips } => SceneController::Voice(VoiceController::from_registry(
                name, None, &registry, clips, player,
            )),
        };
        tracing::info!(
            scene = name,
            mode = config.mode.name(),
            start = %config.start,
            "scene ready"
        );
        Ok(Scene {
            session,
            controller,
        })
    }

    /// Load a scene file and a content directory, then wire them.
    pub fn load(
        scene_path: &Path,
        content_dir: &Path,
        presenter: impl Presenter + 'static,
        surface: impl ChoiceSurface + 'static,
        player: impl AudioPlayer + 'static,
    ) -> Result<Scene, SceneError> {
        let config = SceneConfig::load_from_ron(scene_path)?;
        let mut library = ContentLibrary::new();
        library.load_dir(content_dir)?;
        let name = scene_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scene");
        Self::build(name, &config, &library, presenter, surface, player)
    }

    pub fn start(&mut self) -> Result<(), ControllerError> {
        self.controller.start_dialogue()
    }

    pub fn skip(&mut self) -> Result<(), ControllerError> {
        self.controller.skip_dialogue()
    }

    /// Choose a branch option. Scenes without branching reject every key.
    pub fn choose(&mut self, key: &str) -> Result<(), ControllerError> {
        match self.controller.as_branching() {
            Some(branching) => branching.choose_option(key),
            None => {
                tracing::error!(key, "scene has no options to choose from");
                Err(ControllerError::UnknownOption(key.to_string()))
            }
        }
    }
}
