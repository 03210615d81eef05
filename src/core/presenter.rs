/// Seams to the host: the dialogue surface, the choice surface and audio.
///
/// The engine never renders or plays anything itself. Hosts implement
/// these traits over whatever UI and audio stack they use.
use crate::schema::content::ClipHandle;

/// The dialogue surface.
///
/// Implementations must not call back into the session from these methods.
/// Player input is forwarded with `DialogueSession::request_advance` from
/// the host's own input handling.
pub trait Presenter {
    fn show(&mut self);
    fn hide(&mut self);
    /// A partially revealed line.
    fn render_partial(&mut self, text: &str);
    /// The full line.
    fn render_final(&mut self, text: &str);
}

/// One entry offered on a choice surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub key: String,
    pub text: String,
}

/// Where branching options are offered to the player.
pub trait ChoiceSurface {
    /// Replace whatever is on the surface with `choices` and show it.
    fn show_choices(&mut self, choices: &[ChoiceView]);
    fn hide_choices(&mut self);
}

/// Audio playback used by the voice controller.
pub trait AudioPlayer {
    fn play_clip(&mut self, clip: &ClipHandle);
    fn stop_current(&mut self);
    fn is_playing(&self) -> bool;
}

/// Presenter that draws nothing. Used when a session has no surface yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn show(&mut self) {}
    fn hide(&mut self) {}
    fn render_partial(&mut self, _text: &str) {}
    fn render_final(&mut self, _text: &str) {}
}

/// Text-only presenter that keeps what a real surface would display.
///
/// Handy for headless hosts, tools and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextPresenter {
    pub visible: bool,
    pub text: String,
}

impl Presenter for TextPresenter {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn render_partial(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    fn render_final(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }
}

impl<P: Presenter + ?Sized> Presenter for std::rc::Rc<std::cell::RefCell<P>> {
    fn show(&mut self) {
        self.borrow_mut().show();
    }

    fn hide(&mut self) {
        self.borrow_mut().hide();
    }

    fn render_partial(&mut self, text: &str) {
        self.borrow_mut().render_partial(text);
    }

    fn render_final(&mut self, text: &str) {
        self.borrow_mut().render_final(text);
    }
}

impl<S: ChoiceSurface + ?Sized> ChoiceSurface for std::rc::Rc<std::cell::RefCell<S>> {
    fn show_choices(&mut self, choices: &[ChoiceView]) {
        self.borrow_mut().show_choices(choices);
    }

    fn hide_choices(&mut self) {
        self.borrow_mut().hide_choices();
    }
}

impl<A: AudioPlayer + ?Sized> AudioPlayer for std::rc::Rc<std::cell::RefCell<A>> {
    fn play_clip(&mut self, clip: &ClipHandle) {
        self.borrow_mut().play_clip(clip);
    }

    fn stop_current(&mut self) {
        self.borrow_mut().stop_current();
    }

    fn is_playing(&self) -> bool {
        self.borrow().is_playing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn text_presenter_tracks_surface() {
        let mut p = TextPresenter::default();
        p.show();
        p.render_partial("He");
        assert_eq!(p.text, "He");
        p.render_final("Hello");
        assert_eq!(p.text, "Hello");
        assert!(p.visible);
        p.hide();
        assert!(!p.visible);
    }

    #[test]
    fn shared_presenter_forwards() {
        let shared = Rc::new(RefCell::new(TextPresenter::default()));
        let mut handle = Rc::clone(&shared);
        handle.show();
        handle.render_final("Hi");
        assert!(shared.borrow().visible);
        assert_eq!(shared.borrow().text, "Hi");
    }
}
