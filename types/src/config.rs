//! Confirmation UI configuration.
//!
//! Supplied by an external preferences collaborator and read once per
//! request — the orchestrator never watches for mid-flight changes.

use serde::{Deserialize, Serialize};

/// How long the auto-proceed countdown runs by default, in milliseconds.
pub const DEFAULT_AUTO_PROCEED_DELAY_MS: u64 = 2000;

/// Presentation mode for the confirmation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UiMode {
    /// Centered modal over the embedding page.
    Modal,
    /// Edge-anchored drawer.
    Drawer,
    /// No confirmation UI at all; proceed straight to the credential prompt.
    Skip,
}

/// How the confirmation surface resolves into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmBehavior {
    /// Wait for an explicit confirm click (or cancel, or the optional
    /// auto-proceed countdown elapsing).
    RequireClick,
    /// Show the surface but proceed without waiting for input.
    AutoProceed,
}

/// Color theme forwarded to the surface. The core never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    Dark,
    Light,
}

/// Unified confirmation configuration, read once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationConfig {
    /// Type of UI to display for confirmation.
    pub ui_mode: UiMode,
    /// How the confirmation UI behaves.
    pub behavior: ConfirmBehavior,
    /// Delay in milliseconds before auto-proceeding while `RequireClick`
    /// is showing. `None` disables the countdown entirely.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub auto_proceed_delay: Option<u64>,
    pub theme: Theme,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            ui_mode: UiMode::Modal,
            behavior: ConfirmBehavior::RequireClick,
            auto_proceed_delay: Some(DEFAULT_AUTO_PROCEED_DELAY_MS),
            theme: Theme::Dark,
        }
    }
}

impl ConfirmationConfig {
    /// Normalize the degenerate `RequireClick` + zero-delay combination
    /// into an explicit `AutoProceed`.
    ///
    /// A zero countdown would always win the decision race, so treating it
    /// as a named behavior removes the accidental race at flow start.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.behavior == ConfirmBehavior::RequireClick && self.auto_proceed_delay == Some(0) {
            self.behavior = ConfirmBehavior::AutoProceed;
            self.auto_proceed_delay = None;
        }
        self
    }

    /// Whether this configuration waits for an explicit user decision.
    #[must_use]
    pub fn requires_decision(&self) -> bool {
        self.ui_mode != UiMode::Skip && self.behavior == ConfirmBehavior::RequireClick
    }
}
