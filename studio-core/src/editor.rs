//! The host-facing entry point: one session state plus the active tool.

use tiny_skia::Pixmap;
use tracing::debug;

use crate::event::PointerEvent;
use crate::project::Project;
use crate::state::StudioState;
use crate::tools::{Tool, ToolContext, ToolKind};
use crate::StudioResult;

/// A design session driven by pointer events.
///
/// Switching tools drops the previous tool's in-progress gesture but keeps
/// the selection and history.
pub struct Editor {
    state: StudioState,
    tool: Box<dyn Tool>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("tool", &self.tool.kind())
            .finish()
    }
}

impl Editor {
    /// Open a session on `project` with the move tool active.
    #[must_use]
    pub fn new(project: Project) -> Self {
        Self {
            state: StudioState::new(project),
            tool: ToolKind::default().create(),
        }
    }

    /// Session state.
    #[must_use]
    pub fn state(&self) -> &StudioState {
        &self.state
    }

    /// Mutable session state.
    pub fn state_mut(&mut self) -> &mut StudioState {
        &mut self.state
    }

    /// The active tool.
    #[must_use]
    pub fn active_tool(&self) -> ToolKind {
        self.tool.kind()
    }

    /// Activate a tool. Re-selecting the active tool resets its gesture.
    pub fn set_tool(&mut self, kind: ToolKind) {
        debug!(from = %self.tool.kind(), to = %kind, "Tool changed");
        self.tool = kind.create();
    }

    /// Activate a tool by its host identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StudioError::UnknownTool`] if the name is not a tool.
    pub fn select_tool_by_name(&mut self, name: &str) -> StudioResult<()> {
        let kind = name.parse::<ToolKind>()?;
        self.set_tool(kind);
        Ok(())
    }

    /// Pointer pressed. `surface` is the last composited canvas, used by
    /// tools that sample what the user sees.
    pub fn pointer_down(&mut self, event: &PointerEvent, surface: Option<&Pixmap>) {
        let mut ctx = ToolContext {
            state: &mut self.state,
            surface,
        };
        self.tool.on_pointer_down(event, &mut ctx);
    }

    /// Pointer moved.
    pub fn pointer_move(&mut self, event: &PointerEvent, surface: Option<&Pixmap>) {
        let mut ctx = ToolContext {
            state: &mut self.state,
            surface,
        };
        self.tool.on_pointer_move(event, &mut ctx);
    }

    /// Pointer released.
    pub fn pointer_up(&mut self, event: &PointerEvent, surface: Option<&Pixmap>) {
        let mut ctx = ToolContext {
            state: &mut self.state,
            surface,
        };
        self.tool.on_pointer_up(event, &mut ctx);
    }

    /// Apply finished background work. Returns `true` if anything changed.
    pub fn poll_background(&mut self) -> bool {
        self.state.poll_background()
    }

    /// Undo one step.
    pub fn undo(&mut self) -> bool {
        self.state.undo()
    }

    /// Redo one step.
    pub fn redo(&mut self) -> bool {
        self.state.redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{Point, Polygon, Selection};
    use crate::StudioError;

    fn editor() -> Editor {
        Editor::new(Project::new(100, 100, 300.0).expect("project"))
    }

    #[test]
    fn test_starts_with_move_tool() {
        assert_eq!(editor().active_tool(), ToolKind::Move);
    }

    #[test]
    fn test_select_tool_by_name() {
        let mut ed = editor();
        ed.select_tool_by_name("quickSelect").expect("known tool");
        assert_eq!(ed.active_tool(), ToolKind::QuickSelect);

        let err = ed.select_tool_by_name("airbrush").expect_err("unknown tool");
        assert!(matches!(err, StudioError::UnknownTool(name) if name == "airbrush"));
        assert_eq!(ed.active_tool(), ToolKind::QuickSelect);
    }

    #[test]
    fn test_switching_tools_keeps_selection_and_history() {
        let mut ed = editor();
        ed.set_tool(ToolKind::Marquee);
        ed.pointer_down(&PointerEvent::at(10.0, 10.0), None);
        ed.pointer_move(&PointerEvent::at(40.0, 40.0), None);
        ed.pointer_up(&PointerEvent::at(40.0, 40.0), None);
        let selection: Selection = ed.state().selection().clone();
        assert!(selection.contains(Point::new(20.0, 20.0)));

        ed.set_tool(ToolKind::Brush);
        ed.set_tool(ToolKind::Lasso);
        assert_eq!(ed.state().selection(), &selection);
        assert!(ed.state().can_undo());
        assert!(ed.undo());
        assert!(ed.state().selection().is_empty());
        assert!(ed.redo());
        assert_eq!(ed.state().selection(), &selection);
    }

    #[test]
    fn test_switch_mid_gesture_drops_it() {
        let mut ed = editor();
        ed.state_mut()
            .set_selection(Selection::new().add(Polygon::rect(0.0, 0.0, 5.0, 5.0)));
        ed.set_tool(ToolKind::Marquee);
        ed.pointer_down(&PointerEvent::at(10.0, 10.0), None);
        ed.set_tool(ToolKind::Marquee);
        ed.pointer_up(&PointerEvent::at(60.0, 60.0), None);
        assert!(!ed.state().selection().contains(Point::new(30.0, 30.0)));
        assert!(!ed.state().can_undo());
    }
}
