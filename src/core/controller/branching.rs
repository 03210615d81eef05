/// Offers a set of choices and switches the session to the chosen content.
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{require_session, Branching, ControllerError, DialogueFlow};
use crate::core::events::{DialogueEvent, Subscription};
use crate::core::presenter::{ChoiceSurface, ChoiceView};
use crate::core::registry::SessionRegistry;
use crate::core::session::DialogueSession;
use crate::core::store::ContentLibrary;
use crate::schema::content::DialogueContent;
use crate::schema::mode::OptionSpec;

/// A branch choice with its target resolved.
#[derive(Debug, Clone)]
pub struct OptionEntry {
    pub text: String,
    pub key: String,
    pub target: Option<Rc<DialogueContent>>,
}

impl OptionEntry {
    pub fn new(
        text: impl Into<String>,
        key: impl Into<String>,
        target: Option<Rc<DialogueContent>>,
    ) -> Self {
        Self {
            text: text.into(),
            key: key.into(),
            target,
        }
    }

    /// Resolve an authored option against `library`. A target id that is
    /// not in the library leaves the option without a target.
    pub fn from_spec(spec: &OptionSpec, library: &ContentLibrary) -> Self {
        let target = spec.target.as_ref().and_then(|id| {
            let found = library.get(id);
            if found.is_none() {
                tracing::warn!(key = %spec.key, target = %id, "option target not found");
            }
            found
        });
        Self::new(spec.text.clone(), spec.key.clone(), target)
    }
}

struct OptionsPanel {
    options: Vec<OptionEntry>,
    surface: Box<dyn ChoiceSurface>,
    showing: bool,
}

impl OptionsPanel {
    fn show(&mut self) -> usize {
        let mut choices = Vec::with_capacity(self.options.len());
        for option in &self.options {
            if option.target.is_none() {
                tracing::warn!(key = %option.key, "skipping option without target content");
                continue;
            }
            choices.push(ChoiceView {
                key: option.key.clone(),
                text: option.text.clone(),
            });
        }
        self.surface.show_choices(&choices);
        self.showing = true;
        choices.len()
    }

    fn hide(&mut self) {
        self.surface.hide_choices();
        self.showing = false;
    }
}

/// Branching controller.
///
/// Option keys are looked up in a table built once at construction.
/// Entries with an empty key or no target are left out of the table, and
/// when two entries share a key the later one wins (a warning is logged).
pub struct BranchingController {
    name: String,
    session: Option<DialogueSession>,
    lookup: FxHashMap<String, usize>,
    panel: Rc<RefCell<OptionsPanel>>,
    after_dialogue: Option<Subscription>,
}

impl fmt::Debug for BranchingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchingController")
            .field("name", &self.name)
            .field("session", &self.session)
            .field("keys", &self.lookup.len())
            .field("after_dialogue", &self.after_dialogue.is_some())
            .finish()
    }
}

impl BranchingController {
    pub fn new(
        name: impl Into<String>,
        session: Option<DialogueSession>,
        options: Vec<OptionEntry>,
        surface: impl ChoiceSurface + 'static,
    ) -> Self {
        let name = name.into();
        let mut lookup = FxHashMap::default();
        for (i, option) in options.iter().enumerate() {
            if option.key.is_empty() || option.target.is_none() {
                continue;
            }
            if lookup.insert(option.key.clone(), i).is_some() {
                tracing::warn!(
                    controller = %name,
                    key = %option.key,
                    "duplicate option key; the later option wins"
                );
            }
        }
        let mut panel = OptionsPanel {
            options,
            surface: Box::new(surface),
            showing: false,
        };
        panel.hide();
        Self {
            name,
            session,
            lookup,
            panel: Rc::new(RefCell::new(panel)),
            after_dialogue: None,
        }
    }

    /// Build from authored options, resolving the session through
    /// `registry` when none is given.
    pub fn from_specs(
        name: impl Into<String>,
        explicit: Option<DialogueSession>,
        registry: &SessionRegistry,
        specs: &[OptionSpec],
        library: &ContentLibrary,
        surface: impl ChoiceSurface + 'static,
    ) -> Self {
        let name = name.into();
        let session = registry.resolve(&name, explicit);
        let options = specs
            .iter()
            .map(|spec| OptionEntry::from_spec(spec, library))
            .collect();
        Self::new(name, session, options, surface)
    }

    pub fn options(&self) -> Vec<OptionEntry> {
        self.panel.borrow().options.clone()
    }

    pub fn is_showing_options(&self) -> bool {
        self.panel.borrow().showing
    }

    pub fn is_armed_after_dialogue(&self) -> bool {
        self.after_dialogue.is_some()
    }

    /// Stop offering options when the session ends.
    pub fn disarm_after_dialogue(&mut self) {
        self.after_dialogue = None;
    }
}

impl DialogueFlow for BranchingController {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "branching"
    }

    fn session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    fn attach_session(&mut self, session: DialogueSession) {
        // An armed listener belongs to the old session.
        self.after_dialogue = None;
        self.session = Some(session);
    }

    fn skip_dialogue(&mut self) -> Result<(), ControllerError> {
        let session = require_session(&self.name, self.session.as_ref())?;
        session.skip()?;
        self.hide_options();
        tracing::info!(controller = %self.name, "branching dialogue skipped");
        Ok(())
    }
}

impl Branching for BranchingController {
    fn show_options(&mut self) -> usize {
        self.panel.borrow_mut().show()
    }

    fn hide_options(&mut self) {
        self.panel.borrow_mut().hide();
    }

    fn choose_option(&mut self, key: &str) -> Result<(), ControllerError> {
        let target = self
            .lookup
            .get(key)
            .and_then(|&i| self.panel.borrow().options[i].target.clone());
        let Some(target) = target else {
            tracing::error!(controller = %self.name, key, "invalid option key");
            return Err(ControllerError::UnknownOption(key.to_string()));
        };
        let session = require_session(&self.name, self.session.as_ref())?;
        session.switch_content(target, 0)?;
        self.hide_options();
        tracing::info!(controller = %self.name, key, "option chosen");
        Ok(())
    }

    fn show_options_after_dialogue(&mut self) -> Result<(), ControllerError> {
        if self.after_dialogue.is_some() {
            tracing::debug!(controller = %self.name, "options already armed for dialogue end");
            return Ok(());
        }
        let session = require_session(&self.name, self.session.as_ref())?;
        let panel = Rc::downgrade(&self.panel);
        let subscription = session.subscribe(move |event| {
            if !matches!(event, DialogueEvent::Ended) {
                return;
            }
            let Some(panel) = panel.upgrade() else {
                return;
            };
            let Ok(mut panel) = panel.try_borrow_mut() else {
                tracing::warn!("options panel busy; not shown");
                return;
            };
            panel.show();
        });
        self.after_dialogue = Some(subscription);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SessionConfig;
    use crate::core::presenter::TextPresenter;
    use crate::schema::content::ContentId;

    #[derive(Default)]
    struct RecordingSurface {
        shown: Vec<Vec<ChoiceView>>,
        hides: usize,
        visible: bool,
    }

    impl ChoiceSurface for RecordingSurface {
        fn show_choices(&mut self, choices: &[ChoiceView]) {
            self.shown.push(choices.to_vec());
            self.visible = true;
        }

        fn hide_choices(&mut self) {
            self.hides += 1;
            self.visible = false;
        }
    }

    struct Fixture {
        session: DialogueSession,
        surface: Rc<RefCell<RecordingSurface>>,
        controller: BranchingController,
    }

    fn fixture(options: Vec<OptionEntry>) -> Fixture {
        let session = DialogueSession::builder()
            .config(SessionConfig::instant())
            .content(Rc::new(DialogueContent::from_texts("intro", ["Where to?"])))
            .presenter(TextPresenter::default())
            .build();
        let surface = Rc::new(RefCell::new(RecordingSurface::default()));
        let controller =
            BranchingController::new("guide", Some(session.clone()), options, Rc::clone(&surface));
        Fixture {
            session,
            surface,
            controller,
        }
    }

    fn road() -> Rc<DialogueContent> {
        Rc::new(DialogueContent::from_texts("road", ["The road is long."]))
    }

    fn inn() -> Rc<DialogueContent> {
        Rc::new(DialogueContent::from_texts("inn", ["The inn is warm."]))
    }

    #[test]
    fn starts_with_options_hidden() {
        let f = fixture(vec![OptionEntry::new("Road", "road", Some(road()))]);
        assert_eq!(f.surface.borrow().hides, 1);
        assert!(!f.controller.is_showing_options());
    }

    #[test]
    fn show_options_skips_missing_targets() {
        let mut f = fixture(vec![
            OptionEntry::new("Road", "road", Some(road())),
            OptionEntry::new("Broken", "broken", None),
            OptionEntry::new("Inn", "inn", Some(inn())),
        ]);
        assert_eq!(f.controller.show_options(), 2);
        let surface = f.surface.borrow();
        let keys: Vec<&str> = surface.shown[0].iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["road", "inn"]);
        assert!(surface.visible);
    }

    #[test]
    fn choose_option_switches_content_and_hides() {
        let mut f = fixture(vec![OptionEntry::new("Road", "road", Some(road()))]);
        f.controller.start_dialogue().unwrap();
        f.controller.show_options();
        f.controller.choose_option("road").unwrap();
        assert_eq!(f.session.content_id(), Some(ContentId::new("road")));
        assert_eq!(f.session.visible_text(), "The road is long.");
        assert!(!f.surface.borrow().visible);
    }

    #[test]
    fn unknown_key_changes_nothing() {
        let mut f = fixture(vec![OptionEntry::new("Road", "road", Some(road()))]);
        f.controller.start_dialogue().unwrap();
        let index = f.session.current_index();
        assert_eq!(
            f.controller.choose_option("missing-key"),
            Err(ControllerError::UnknownOption("missing-key".to_string()))
        );
        assert_eq!(f.session.content_id(), Some(ContentId::new("intro")));
        assert_eq!(f.session.current_index(), index);
    }

    #[test]
    fn option_without_target_is_not_choosable() {
        let mut f = fixture(vec![OptionEntry::new("Broken", "broken", None)]);
        assert!(matches!(
            f.controller.choose_option("broken"),
            Err(ControllerError::UnknownOption(_))
        ));
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let mut f = fixture(vec![
            OptionEntry::new("Road", "go", Some(road())),
            OptionEntry::new("Inn", "go", Some(inn())),
        ]);
        f.controller.choose_option("go").unwrap();
        assert_eq!(f.session.content_id(), Some(ContentId::new("inn")));
    }

    #[test]
    fn options_shown_once_per_end_even_if_armed_twice() {
        let mut f = fixture(vec![OptionEntry::new("Road", "road", Some(road()))]);
        f.controller.show_options_after_dialogue().unwrap();
        f.controller.show_options_after_dialogue().unwrap();
        assert_eq!(f.session.events().listener_count(), 1);

        f.controller.start_dialogue().unwrap();
        f.session.request_advance().unwrap();
        assert_eq!(f.surface.borrow().shown.len(), 1);
        assert!(f.controller.is_showing_options());
    }

    #[test]
    fn skip_hides_options_after_showing_them() {
        let mut f = fixture(vec![OptionEntry::new("Road", "road", Some(road()))]);
        f.controller.show_options_after_dialogue().unwrap();
        f.controller.start_dialogue().unwrap();
        f.controller.skip_dialogue().unwrap();
        let surface = f.surface.borrow();
        assert_eq!(surface.shown.len(), 1);
        assert!(!surface.visible);
        assert!(!f.session.is_active());
    }

    #[test]
    fn disarm_drops_listener() {
        let mut f = fixture(vec![OptionEntry::new("Road", "road", Some(road()))]);
        f.controller.show_options_after_dialogue().unwrap();
        f.controller.disarm_after_dialogue();
        assert_eq!(f.session.events().listener_count(), 0);
        assert!(!f.controller.is_armed_after_dialogue());
    }

    #[test]
    fn from_specs_resolves_targets() {
        let mut library = ContentLibrary::new();
        library.register(DialogueContent::from_texts("road", ["The road is long."]));
        let specs = vec![
            OptionSpec {
                text: "Road".to_string(),
                key: "road".to_string(),
                target: Some(ContentId::new("road")),
            },
            OptionSpec {
                text: "Sea".to_string(),
                key: "sea".to_string(),
                target: Some(ContentId::new("sea")),
            },
        ];
        let controller = BranchingController::from_specs(
            "guide",
            None,
            &SessionRegistry::new(),
            &specs,
            &library,
            RecordingSurface::default(),
        );
        let options = controller.options();
        assert!(options[0].target.is_some());
        assert!(options[1].target.is_none());
        assert!(controller.session().is_none());
    }
}
