use egui::{Context, Key, PointerButton, Pos2, Rect};

/// Pointer and keyboard input that the drawing tools care about
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Primary button was pressed over the map
    PointerDown { position: Pos2 },
    /// Primary button was released over the map
    PointerUp { position: Pos2 },
    /// Pointer moved over the map
    PointerMove { position: Pos2, primary_down: bool },
    /// Primary button was double-clicked over the map
    DoubleClick { position: Pos2 },
    /// Enter finishes the current drawing
    Finish,
    /// Escape abandons the current drawing
    Cancel,
}

/// Converts raw egui input into [`InputEvent`]s for the map area
#[derive(Debug, Default)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
    map_rect: Option<Rect>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the map rectangle; pointer events outside it are ignored
    pub fn set_map_rect(&mut self, rect: Rect) {
        self.map_rect = Some(rect);
    }

    fn in_map(&self, pos: Pos2) -> bool {
        self.map_rect.is_some_and(|rect| rect.contains(pos))
    }

    /// Process raw egui input and generate our InputEvents.
    ///
    /// `pointer_free` is false while the pointer is over a window or panel
    /// drawn on top of the map.
    pub fn process_input(&mut self, ctx: &Context, pointer_free: bool) -> Vec<InputEvent> {
        let mut events = Vec::new();

        ctx.input(|input| {
            if input.key_pressed(Key::Enter) {
                events.push(InputEvent::Finish);
            }
            if input.key_pressed(Key::Escape) {
                events.push(InputEvent::Cancel);
            }

            let Some(pos) = input.pointer.hover_pos() else {
                self.last_pointer_pos = None;
                return;
            };
            if !pointer_free || !self.in_map(pos) {
                self.last_pointer_pos = Some(pos);
                return;
            }

            if Some(pos) != self.last_pointer_pos {
                events.push(InputEvent::PointerMove {
                    position: pos,
                    primary_down: input.pointer.button_down(PointerButton::Primary),
                });
            }
            self.last_pointer_pos = Some(pos);

            if input.pointer.button_pressed(PointerButton::Primary) {
                events.push(InputEvent::PointerDown { position: pos });
            }
            if input.pointer.button_double_clicked(PointerButton::Primary) {
                events.push(InputEvent::DoubleClick { position: pos });
            }
            if input.pointer.button_released(PointerButton::Primary) {
                events.push(InputEvent::PointerUp { position: pos });
            }
        });

        events
    }
}
