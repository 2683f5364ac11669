//! Input translation for mouse/touch events.
//!
//! Pointer and touch events arrive in client (page) coordinates. The
//! translator turns both into the same [`DrawCommand`] stream, in
//! surface-local coordinates, and queues them for the drawing session.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Mouse-style pointer events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up,
    /// Pointer left the surface.
    Leave,
}

/// Touch events. Only the first touch point is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TouchEvent {
    Start { touches: Vec<Point> },
    Move { touches: Vec<Point> },
    End,
    Cancel,
}

/// A drawing command in surface-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Start(Point),
    Move(Point),
    End,
}

/// What the platform layer should do with the native event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputResponse {
    /// Suppress the browser's default handling (touch scrolling/zooming).
    pub prevent_default: bool,
}

/// Converts native input into queued draw commands.
#[derive(Debug, Clone, Default)]
pub struct InputTranslator {
    /// Client-space position of the surface's top-left corner.
    origin: Point,
    /// Whether a stroke is in progress.
    active: bool,
    queue: VecDeque<DrawCommand>,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update where the surface sits on screen (its bounding rect's corner).
    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Whether a stroke is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Process a pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> InputResponse {
        match event {
            PointerEvent::Down { position } => self.start(position),
            PointerEvent::Move { position } => self.move_to(position),
            PointerEvent::Up | PointerEvent::Leave => self.end(),
        }
        InputResponse::default()
    }

    /// Process a touch event, mapping the first touch to pointer semantics.
    pub fn handle_touch_event(&mut self, event: TouchEvent) -> InputResponse {
        match event {
            TouchEvent::Start { touches } => {
                // Extra fingers landing mid-gesture do not split the stroke.
                if !self.active {
                    if let Some(&first) = touches.first() {
                        self.start(first);
                    }
                }
            }
            TouchEvent::Move { touches } => {
                if let Some(&first) = touches.first() {
                    self.move_to(first);
                }
            }
            TouchEvent::End | TouchEvent::Cancel => {
                let was_active = self.active;
                self.end();
                return InputResponse {
                    prevent_default: was_active,
                };
            }
        }
        InputResponse {
            prevent_default: self.active,
        }
    }

    /// Number of commands waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Take the next queued command.
    pub fn next_command(&mut self) -> Option<DrawCommand> {
        self.queue.pop_front()
    }

    /// Take all queued commands in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = DrawCommand> + '_ {
        self.queue.drain(..)
    }

    fn to_local(&self, client: Point) -> Point {
        client - Vec2::new(self.origin.x, self.origin.y)
    }

    fn start(&mut self, client: Point) {
        // A second down without an up (e.g. a lost pointerup) closes the old stroke.
        if self.active {
            self.queue.push_back(DrawCommand::End);
        }
        self.active = true;
        let local = self.to_local(client);
        self.queue.push_back(DrawCommand::Start(local));
    }

    fn move_to(&mut self, client: Point) {
        if !self.active {
            return;
        }
        let local = self.to_local(client);
        self.queue.push_back(DrawCommand::Move(local));
    }

    fn end(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.queue.push_back(DrawCommand::End);
    }
}
