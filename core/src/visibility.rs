//! Progress-driven visibility for the confirmation surface.
//!
//! Maps the progress stream to a show/hide decision so the surface's
//! presenter never needs to know the transport. Phases that require
//! immediate user activation show the surface; everything else hides it.
//! Explicit `force_show`/`force_hide` calls override the heuristic until
//! the next explicit call or request completion.

use sigil_types::ProgressPhase;

/// Show/hide state machine fed by progress events. Default hidden.
#[derive(Debug, Default)]
pub struct VisibilityController {
    visible: bool,
    explicit_override: Option<bool>,
}

impl VisibilityController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Apply one progress phase for the active request.
    ///
    /// `sticky` marks flows whose surface must survive completion.
    pub fn observe(&mut self, phase: ProgressPhase, sticky: bool) {
        if phase.is_final() {
            // Completion clears overrides and hides, unless sticky.
            self.explicit_override = None;
            self.visible = sticky;
            return;
        }
        self.visible = match self.explicit_override {
            Some(forced) => forced,
            None => phase.requires_user_activation(),
        };
    }

    /// Force the surface visible regardless of phase classification.
    ///
    /// Used to guarantee visibility ahead of the decision race at flow
    /// start, where losing the race to a fast phase change would flicker
    /// the surface away.
    pub fn force_show(&mut self) {
        self.explicit_override = Some(true);
        self.visible = true;
    }

    /// Force the surface hidden regardless of phase classification.
    pub fn force_hide(&mut self) {
        self.explicit_override = Some(false);
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hidden() {
        assert!(!VisibilityController::new().visible());
    }

    #[test]
    fn test_activation_phases_show() {
        let mut vis = VisibilityController::new();
        vis.observe(ProgressPhase::AwaitingCredential, false);
        assert!(vis.visible());
        vis.observe(ProgressPhase::AwaitingDecision, false);
        assert!(vis.visible());
    }

    #[test]
    fn test_non_interactive_phases_hide() {
        let mut vis = VisibilityController::new();
        vis.observe(ProgressPhase::AwaitingDecision, false);
        vis.observe(ProgressPhase::Authorizing, false);
        assert!(!vis.visible());
    }

    #[test]
    fn test_completion_hides() {
        let mut vis = VisibilityController::new();
        vis.observe(ProgressPhase::AwaitingDecision, false);
        vis.observe(ProgressPhase::Complete, false);
        assert!(!vis.visible());
    }

    #[test]
    fn test_error_hides() {
        let mut vis = VisibilityController::new();
        vis.observe(ProgressPhase::AwaitingDecision, false);
        vis.observe(ProgressPhase::Error, false);
        assert!(!vis.visible());
    }

    #[test]
    fn test_sticky_flow_survives_completion() {
        let mut vis = VisibilityController::new();
        vis.observe(ProgressPhase::AwaitingDecision, true);
        vis.observe(ProgressPhase::Complete, true);
        assert!(vis.visible());
    }

    #[test]
    fn test_force_show_overrides_heuristic() {
        let mut vis = VisibilityController::new();
        vis.force_show();
        vis.observe(ProgressPhase::Authorizing, false);
        assert!(vis.visible(), "override must outlast heuristic phases");
    }

    #[test]
    fn test_force_hide_overrides_activation_phase() {
        let mut vis = VisibilityController::new();
        vis.force_hide();
        vis.observe(ProgressPhase::AwaitingDecision, false);
        assert!(!vis.visible());
    }

    #[test]
    fn test_next_explicit_call_replaces_override() {
        let mut vis = VisibilityController::new();
        vis.force_hide();
        vis.force_show();
        vis.observe(ProgressPhase::ReservingNonces, false);
        assert!(vis.visible());
    }

    #[test]
    fn test_completion_clears_override() {
        let mut vis = VisibilityController::new();
        vis.force_show();
        vis.observe(ProgressPhase::Complete, false);
        assert!(!vis.visible());
        // A later non-interactive phase stays hidden: override is gone.
        vis.observe(ProgressPhase::ReadingConfig, false);
        assert!(!vis.visible());
    }
}
