//! The 2D drawing surface glyphs paint onto.
use crate::visuals::{FillVisuals, LineVisuals};

/// Immediate-mode 2D drawing calls, in screen pixels.
///
/// Path calls accumulate into the current path until the next `begin_path`.
pub trait Context2d {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    /// Clockwise rotation in radians, screen y pointing down.
    fn rotate(&mut self, angle: f32);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn arc(&mut self, x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32);
    fn close_path(&mut self);

    /// Restrict drawing to the current path until the matching `restore`.
    fn clip(&mut self);
    fn fill(&mut self, visuals: &FillVisuals);
    fn stroke(&mut self, visuals: &LineVisuals);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    Translate {
        x: f32,
        y: f32,
    },
    Rotate(f32),
    BeginPath,
    MoveTo {
        x: f32,
        y: f32,
    },
    LineTo {
        x: f32,
        y: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Arc {
        x: f32,
        y: f32,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
    },
    ClosePath,
    Clip,
    Fill(FillVisuals),
    Stroke(LineVisuals),
}

/// A recorded sequence of drawing calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of fill and stroke calls.
    pub fn paint_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill(_) | DrawCommand::Stroke(_)))
            .count()
    }

    /// Issue the recorded calls on another context.
    pub fn replay(&self, ctx: &mut dyn Context2d) {
        for command in &self.commands {
            match *command {
                DrawCommand::Save => ctx.save(),
                DrawCommand::Restore => ctx.restore(),
                DrawCommand::Translate { x, y } => ctx.translate(x, y),
                DrawCommand::Rotate(angle) => ctx.rotate(angle),
                DrawCommand::BeginPath => ctx.begin_path(),
                DrawCommand::MoveTo { x, y } => ctx.move_to(x, y),
                DrawCommand::LineTo { x, y } => ctx.line_to(x, y),
                DrawCommand::Rect {
                    x,
                    y,
                    width,
                    height,
                } => ctx.rect(x, y, width, height),
                DrawCommand::Arc {
                    x,
                    y,
                    radius,
                    start_angle,
                    end_angle,
                } => ctx.arc(x, y, radius, start_angle, end_angle),
                DrawCommand::ClosePath => ctx.close_path(),
                DrawCommand::Clip => ctx.clip(),
                DrawCommand::Fill(ref visuals) => ctx.fill(visuals),
                DrawCommand::Stroke(ref visuals) => ctx.stroke(visuals),
            }
        }
    }
}

impl Context2d for DisplayList {
    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::Translate { x, y });
    }

    fn rotate(&mut self, angle: f32) {
        self.commands.push(DrawCommand::Rotate(angle));
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::LineTo { x, y });
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
        });
    }

    fn arc(&mut self, x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32) {
        self.commands.push(DrawCommand::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
        });
    }

    fn close_path(&mut self) {
        self.commands.push(DrawCommand::ClosePath);
    }

    fn clip(&mut self) {
        self.commands.push(DrawCommand::Clip);
    }

    fn fill(&mut self, visuals: &FillVisuals) {
        self.commands.push(DrawCommand::Fill(*visuals));
    }

    fn stroke(&mut self, visuals: &LineVisuals) {
        self.commands.push(DrawCommand::Stroke(*visuals));
    }
}

#[cfg(feature = "canvas")]
mod canvas_replay {
    use iced::{
        Point, Radians, Rectangle, Size, Vector,
        widget::canvas::{self, Path, Stroke, path},
    };

    use super::{DisplayList, DrawCommand};
    use crate::visuals::LineVisuals;

    impl DisplayList {
        /// Replay onto an iced canvas frame.
        pub fn draw(&self, frame: &mut canvas::Frame) {
            draw_commands(frame, &self.commands);
        }
    }

    fn draw_commands(frame: &mut canvas::Frame, commands: &[DrawCommand]) {
        let mut current: Vec<&DrawCommand> = Vec::new();
        let mut i = 0;
        while i < commands.len() {
            match &commands[i] {
                DrawCommand::Save => frame.push_transform(),
                DrawCommand::Restore => frame.pop_transform(),
                DrawCommand::Translate { x, y } => frame.translate(Vector::new(*x, *y)),
                DrawCommand::Rotate(angle) => frame.rotate(*angle),
                DrawCommand::BeginPath => current.clear(),
                DrawCommand::Clip => {
                    if let Some(region) = clip_region(&current) {
                        let end = matching_restore(commands, i + 1);
                        let inner = &commands[i + 1..end];
                        frame.with_clip(region, |clipped| draw_commands(clipped, inner));
                        i = end;
                        continue;
                    }
                    log::debug!("ignoring clip to a non-rectangular path");
                }
                DrawCommand::Fill(visuals) => {
                    frame.fill(&build_path(&current), visuals.effective_color());
                }
                DrawCommand::Stroke(visuals) => stroke(frame, &build_path(&current), visuals),
                command => current.push(command),
            }
            i += 1;
        }
    }

    fn stroke(frame: &mut canvas::Frame, path: &Path, visuals: &LineVisuals) {
        let segments = visuals.dash.segments();
        let mut stroke = Stroke::default()
            .with_color(visuals.effective_color())
            .with_width(visuals.width);
        if let Some(segments) = &segments {
            stroke.line_dash = canvas::LineDash {
                segments,
                offset: 0,
            };
        }
        frame.stroke(path, stroke);
    }

    fn build_path(commands: &[&DrawCommand]) -> Path {
        Path::new(|builder| {
            for command in commands {
                match **command {
                    DrawCommand::MoveTo { x, y } => builder.move_to(Point::new(x, y)),
                    DrawCommand::LineTo { x, y } => builder.line_to(Point::new(x, y)),
                    DrawCommand::Rect {
                        x,
                        y,
                        width,
                        height,
                    } => builder.rectangle(Point::new(x, y), Size::new(width, height)),
                    DrawCommand::Arc {
                        x,
                        y,
                        radius,
                        start_angle,
                        end_angle,
                    } => builder.arc(path::Arc {
                        center: Point::new(x, y),
                        radius,
                        start_angle: Radians(start_angle),
                        end_angle: Radians(end_angle),
                    }),
                    DrawCommand::ClosePath => builder.close(),
                    _ => {}
                }
            }
        })
    }

    /// The clip region, when the current path is a single rectangle.
    fn clip_region(path: &[&DrawCommand]) -> Option<Rectangle> {
        match path {
            [DrawCommand::Rect {
                x,
                y,
                width,
                height,
            }] => Some(Rectangle::new(Point::new(*x, *y), Size::new(*width, *height))),
            _ => None,
        }
    }

    /// Position of the `restore` closing the state level open at `start`.
    fn matching_restore(commands: &[DrawCommand], start: usize) -> usize {
        let mut depth = 0usize;
        for (offset, command) in commands[start..].iter().enumerate() {
            match command {
                DrawCommand::Save => depth += 1,
                DrawCommand::Restore if depth == 0 => return start + offset,
                DrawCommand::Restore => depth -= 1,
                _ => {}
            }
        }
        commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visuals::Visuals;

    #[test]
    fn replay_reproduces_recording() {
        let visuals = Visuals::default();
        let mut list = DisplayList::new();
        list.save();
        list.translate(10.0, 20.0);
        list.rotate(0.5);
        list.begin_path();
        list.rect(-1.0, -1.0, 2.0, 2.0);
        list.fill(&visuals.fill.expect("fill"));
        list.stroke(&visuals.line.expect("line"));
        list.restore();

        let mut copy = DisplayList::new();
        list.replay(&mut copy);
        assert_eq!(copy, list);
        assert_eq!(copy.paint_calls(), 2);
    }
}
