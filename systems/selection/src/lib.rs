#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure selection system that turns pointer gestures into selection and goal
//! commands.
//!
//! A press with nothing selected starts a selection rectangle that follows the
//! pointer and is submitted on release. A release while agents are selected
//! designates the release point as the goal of every selected agent.

use log::debug;
use skirmish_core::{Command, IVec2, InputEvent, Key};
use skirmish_world::{query, World};

/// Rectangle dragged out by the pointer while a selection gesture is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRectangle {
    /// Point where the gesture started.
    pub first: IVec2,
    /// Most recent pointer position.
    pub second: IVec2,
}

/// Gesture state machine for rectangle selection and goal designation.
#[derive(Debug, Default)]
pub struct Selection {
    rectangle: Option<SelectionRectangle>,
}

impl Selection {
    /// Creates a selection system with no gesture in progress.
    #[must_use]
    pub const fn new() -> Self {
        Self { rectangle: None }
    }

    /// Rectangle of the gesture in progress, if any.
    #[must_use]
    pub const fn pending_rectangle(&self) -> Option<SelectionRectangle> {
        self.rectangle
    }

    /// Consumes one input event and emits the commands it implies.
    pub fn handle_input(&mut self, input: InputEvent, world: &World, out: &mut Vec<Command>) {
        match input {
            InputEvent::PointerMoved { position } => {
                if let Some(rectangle) = self.rectangle.as_mut() {
                    rectangle.second = position;
                }
            }
            InputEvent::ButtonDown { position } => {
                if query::selection(world).is_empty() {
                    self.rectangle = Some(SelectionRectangle {
                        first: position,
                        second: position,
                    });
                }
            }
            InputEvent::ButtonUp { position } => {
                if let Some(rectangle) = self.rectangle.take() {
                    out.push(Command::SelectGroup {
                        first: rectangle.first,
                        second: position,
                    });
                    return;
                }
                let selection = query::selection(world);
                if !selection.is_empty() {
                    debug!("designating {position} for {} agents", selection.len());
                }
                out.extend(selection.iter().map(|agent| Command::SetGoal {
                    agent: *agent,
                    goal: position,
                }));
            }
            InputEvent::KeyDown {
                key: Key::ClearSelection,
            } => {
                self.rectangle = None;
                out.push(Command::ClearSelection);
            }
        }
    }
}
