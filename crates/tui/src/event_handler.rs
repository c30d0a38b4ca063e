//! Input and backend event helpers for the TUI.
//!
//! - Keyboard events are mapped to [`KeyAction`]s
//! - Execution refreshes are reduced to the stage being watched

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use sl_protocol::Execution;
use sl_protocol::ExecutionStatus;
use sl_protocol::Stage;
use sl_protocol::Step;

/// What a key press asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    SelectPrevious,
    SelectNext,
    ToggleStep,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    None,
}

/// Map a keyboard event to an action. Releases and repeats are ignored.
pub fn key_action(key_event: KeyEvent) -> KeyAction {
    if key_event.kind != KeyEventKind::Press {
        return KeyAction::None;
    }

    match key_event.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Up => KeyAction::SelectPrevious,
        KeyCode::Down => KeyAction::SelectNext,
        KeyCode::Enter | KeyCode::Char(' ') => KeyAction::ToggleStep,
        KeyCode::Char('k') => KeyAction::ScrollUp,
        KeyCode::Char('j') => KeyAction::ScrollDown,
        KeyCode::PageUp => KeyAction::PageUp,
        KeyCode::PageDown => KeyAction::PageDown,
        KeyCode::Char('g') | KeyCode::Home => KeyAction::ScrollToTop,
        KeyCode::Char('G') | KeyCode::End => KeyAction::ScrollToBottom,
        _ => KeyAction::None,
    }
}

/// The stage to show: the requested one, otherwise the first running
/// stage, otherwise the last stage that has started.
pub fn pick_stage(execution: &Execution, wanted: Option<i64>) -> Option<&Stage> {
    if let Some(number) = wanted {
        return execution.stage(number);
    }

    execution
        .stages
        .iter()
        .find(|stage| stage.status.is_running())
        .or_else(|| {
            execution
                .stages
                .iter()
                .rev()
                .find(|stage| stage.status != ExecutionStatus::Pending)
        })
        .or_else(|| execution.stages.first())
}

/// Step to select when a stage is first shown: the running one, else the
/// first that failed, else the first.
pub fn initial_selection(steps: &[Step]) -> usize {
    steps
        .iter()
        .position(|step| step.status.is_running())
        .or_else(|| {
            steps.iter().position(|step| {
                matches!(step.status, ExecutionStatus::Failure | ExecutionStatus::Error)
            })
        })
        .unwrap_or(0)
}
