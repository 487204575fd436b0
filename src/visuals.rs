use crate::Color;

/// Dash pattern of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LineDash {
    /// Solid continuous line.
    #[default]
    Solid,
    /// Dotted line with configurable spacing.
    Dotted { spacing: f32 },
    /// Dashed line with configurable dash length.
    Dashed { length: f32 },
}

impl LineDash {
    /// On/off segment lengths in pixels. `None` for a solid line.
    pub fn segments(self) -> Option<[f32; 2]> {
        match self {
            Self::Solid => None,
            Self::Dotted { spacing } => Some([1.0, spacing]),
            Self::Dashed { length } => Some([length, length]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineVisuals {
    pub color: Color,
    pub alpha: f32,
    /// Stroke width in pixels.
    pub width: f32,
    pub dash: LineDash,
}

impl Default for LineVisuals {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            alpha: 1.0,
            width: 1.0,
            dash: LineDash::Solid,
        }
    }
}

impl LineVisuals {
    /// Color with `alpha` applied.
    pub fn effective_color(&self) -> Color {
        Color {
            a: self.color.a * self.alpha,
            ..self.color
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillVisuals {
    pub color: Color,
    pub alpha: f32,
}

impl Default for FillVisuals {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            alpha: 1.0,
        }
    }
}

impl FillVisuals {
    pub fn effective_color(&self) -> Color {
        Color {
            a: self.color.a * self.alpha,
            ..self.color
        }
    }
}

const DEFAULT_COLOR: Color = Color::from_rgb(0.3, 0.3, 0.9);

/// Grey used for decimated painting.
pub const DECIMATED_COLOR: Color = Color::from_rgb8(128, 128, 128);

/// Styling of one paint pass. A missing half is not drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visuals {
    pub line: Option<LineVisuals>,
    pub fill: Option<FillVisuals>,
}

impl Default for Visuals {
    fn default() -> Self {
        Self {
            line: Some(LineVisuals::default()),
            fill: Some(FillVisuals::default()),
        }
    }
}

impl Visuals {
    /// Filled and outlined in the same color.
    pub fn filled(color: impl Into<Color>) -> Self {
        let color = color.into();
        Self {
            line: Some(LineVisuals {
                color,
                ..LineVisuals::default()
            }),
            fill: Some(FillVisuals { color, alpha: 1.0 }),
        }
    }

    /// Outline only.
    pub fn stroked(color: impl Into<Color>, width: f32) -> Self {
        Self {
            line: Some(LineVisuals {
                color: color.into(),
                width,
                ..LineVisuals::default()
            }),
            fill: None,
        }
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        if let Some(line) = &mut self.line {
            line.width = width;
        }
        self
    }

    pub fn with_dash(mut self, dash: LineDash) -> Self {
        if let Some(line) = &mut self.line {
            line.dash = dash;
        }
        self
    }

    /// Set the alpha of both halves.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        if let Some(line) = &mut self.line {
            line.alpha = alpha;
        }
        if let Some(fill) = &mut self.fill {
            fill.alpha = alpha;
        }
        self
    }

    pub fn with_color(mut self, color: impl Into<Color>) -> Self {
        let color = color.into();
        if let Some(line) = &mut self.line {
            line.color = color;
        }
        if let Some(fill) = &mut self.fill {
            fill.color = color;
        }
        self
    }

    /// Derived styling for rows outside the selection.
    pub fn nonselection(self) -> Self {
        self.with_alpha(0.2)
    }

    /// Derived styling for a muted renderer.
    pub fn muted(self) -> Self {
        self.with_alpha(0.2)
    }

    /// Derived styling for level-of-detail painting.
    pub fn decimated(self) -> Self {
        self.with_alpha(0.3).with_color(DECIMATED_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_variants_keep_geometry_styling() {
        let base = Visuals::filled(Color::from_rgb(1.0, 0.0, 0.0))
            .with_line_width(3.0)
            .with_dash(LineDash::Dashed { length: 4.0 });

        let dim = base.nonselection();
        assert_eq!(dim.fill.map(|f| f.alpha), Some(0.2));
        assert_eq!(dim.line.map(|l| (l.alpha, l.width)), Some((0.2, 3.0)));

        let decimated = base.decimated();
        assert_eq!(decimated.fill.map(|f| f.color), Some(DECIMATED_COLOR));
        assert_eq!(decimated.line.map(|l| l.dash), Some(LineDash::Dashed { length: 4.0 }));
        let grey = decimated.fill.map(|f| f.effective_color()).expect("fill");
        assert!((grey.a - 0.3).abs() < 1e-6);

        let outline = Visuals::stroked(Color::BLACK, 2.0).muted();
        assert!(outline.fill.is_none());
    }
}
