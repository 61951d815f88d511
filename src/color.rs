//! Numeric-to-color mapping for the color column.
//!
//! A [`ColorDomain`] is built from the column's values (auto min/max, widened by ±1 when
//! degenerate) plus optional user bounds. [`ColorEncoder`] picks a branch from the domain:
//! diverging blue/gray/red when it spans zero, a single-hue ramp when it is entirely
//! negative or positive, and an HSL hue rotation otherwise. Values outside the user
//! bounds get a darker "beyond range" shade.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ExploreError;

/// Share of the larger domain magnitude below which a value counts as near zero.
pub const DEFAULT_NEAR_ZERO_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Linear blend toward `other`; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    pub fn darken(self, amount: f64) -> Rgb {
        self.lerp(Rgb(0, 0, 0), amount)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// HSL (hue in degrees, saturation and lightness in [0, 1]) to RGB.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb(channel(r), channel(g), channel(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub negative: Rgb,
    pub negative_light: Rgb,
    pub negative_beyond: Rgb,
    pub neutral: Rgb,
    pub positive: Rgb,
    pub positive_light: Rgb,
    pub positive_beyond: Rgb,
    /// Used when there is no color column or the row has no numeric value.
    pub fallback: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            negative: Rgb(0x21, 0x66, 0xac),
            negative_light: Rgb(0x92, 0xc5, 0xde),
            negative_beyond: Rgb(0x05, 0x30, 0x61),
            neutral: Rgb(0xbd, 0xbd, 0xbd),
            positive: Rgb(0xb2, 0x18, 0x2b),
            positive_light: Rgb(0xf4, 0xa5, 0x82),
            positive_beyond: Rgb(0x67, 0x00, 0x1f),
            fallback: Rgb(0x46, 0x82, 0xb4),
        }
    }
}

/// Which scale family a domain is drawn with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    /// Diverging or sequential, chosen from the domain.
    #[default]
    Auto,
    /// Always the hue rotation ramp.
    Continuous,
}

impl ColorScheme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "continuous" | "rainbow" => Some(Self::Continuous),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Diverging,
    Negative,
    Positive,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorDomain {
    pub min: f64,
    pub max: f64,
    pub explicit_min: Option<f64>,
    pub explicit_max: Option<f64>,
}

impl ColorDomain {
    /// Auto min/max over the non-NaN values, widened by ±1 when they coincide.
    /// Explicit bounds given in the wrong order are swapped.
    pub fn build(
        values: &[f64],
        explicit_min: Option<f64>,
        explicit_max: Option<f64>,
    ) -> Result<Self, ExploreError> {
        let mut finite = values.iter().copied().filter(|v| !v.is_nan());
        let first = finite
            .next()
            .ok_or_else(|| ExploreError::NoColorData(String::new()))?;
        let (mut min, mut max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if min == max {
            min -= 1.0;
            max += 1.0;
        }

        let explicit_min = explicit_min.filter(|v| !v.is_nan());
        let explicit_max = explicit_max.filter(|v| !v.is_nan());
        let (explicit_min, explicit_max) = match (explicit_min, explicit_max) {
            (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
            bounds => bounds,
        };

        Ok(Self {
            min,
            max,
            explicit_min,
            explicit_max,
        })
    }

    pub fn spans_zero(&self) -> bool {
        self.min < 0.0 && self.max > 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn kind(&self, scheme: ColorScheme) -> ScaleKind {
        if scheme == ColorScheme::Continuous || !self.is_finite() {
            ScaleKind::Continuous
        } else if self.spans_zero() {
            ScaleKind::Diverging
        } else if self.max <= 0.0 {
            ScaleKind::Negative
        } else {
            ScaleKind::Positive
        }
    }

    pub fn near_zero_threshold(&self, ratio: f64) -> f64 {
        ratio * self.min.abs().max(self.max.abs())
    }

    pub fn is_beyond_range(&self, value: f64) -> bool {
        self.explicit_min.is_some_and(|lo| value < lo) || self.explicit_max.is_some_and(|hi| value > hi)
    }

    /// Linear position of `value` in [min, max], clamped to [0, 1].
    fn unit(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if !span.is_finite() || span <= 0.0 {
            return if value <= self.min {
                0.0
            } else if value >= self.max {
                1.0
            } else {
                0.5
            };
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Branch of the scale a color came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBranch {
    Negative,
    Neutral,
    Positive,
    Continuous,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorAssignment {
    pub color: Rgb,
    pub branch: ColorBranch,
    pub beyond_range: bool,
    pub near_zero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Min,
    NearZeroLow,
    Zero,
    NearZeroHigh,
    Max,
    ExplicitMin,
    ExplicitMax,
}

/// A legend tick: value and its fractional position along the gradient (0 = min, 1 = max).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegendAnchor {
    pub kind: AnchorKind,
    pub value: f64,
    pub position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientStop {
    pub position: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorEncoder {
    pub palette: Palette,
    pub scheme: ColorScheme,
    pub near_zero_ratio: f64,
}

impl Default for ColorEncoder {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            scheme: ColorScheme::Auto,
            near_zero_ratio: DEFAULT_NEAR_ZERO_RATIO,
        }
    }
}

impl ColorEncoder {
    pub fn new(palette: Palette, scheme: ColorScheme, near_zero_ratio: f64) -> Self {
        Self {
            palette,
            scheme,
            near_zero_ratio,
        }
    }

    pub fn fallback(&self) -> ColorAssignment {
        ColorAssignment {
            color: self.palette.fallback,
            branch: ColorBranch::Fallback,
            beyond_range: false,
            near_zero: false,
        }
    }

    pub fn kind(&self, domain: &ColorDomain) -> ScaleKind {
        domain.kind(self.scheme)
    }

    pub fn color_for(&self, value: f64, domain: &ColorDomain) -> ColorAssignment {
        if value.is_nan() {
            return self.fallback();
        }
        let p = &self.palette;
        let beyond_range = domain.is_beyond_range(value);
        let near_zero = value.abs() < domain.near_zero_threshold(self.near_zero_ratio);

        let (color, branch) = match self.kind(domain) {
            ScaleKind::Diverging => {
                if near_zero {
                    let tint = if value < 0.0 {
                        p.neutral.lerp(p.negative_light, 0.35)
                    } else if value > 0.0 {
                        p.neutral.lerp(p.positive_light, 0.35)
                    } else {
                        p.neutral
                    };
                    let color = if beyond_range { tint.darken(0.3) } else { tint };
                    (color, ColorBranch::Neutral)
                } else if value < 0.0 {
                    let color = if beyond_range {
                        p.negative_beyond
                    } else {
                        // value / min lies in (0, 1]; values below min clamp to the end.
                        p.negative_light.lerp(p.negative, value / domain.min)
                    };
                    (color, ColorBranch::Negative)
                } else {
                    let color = if beyond_range {
                        p.positive_beyond
                    } else {
                        p.positive_light.lerp(p.positive, value / domain.max)
                    };
                    (color, ColorBranch::Positive)
                }
            }
            ScaleKind::Positive => {
                let color = if beyond_range {
                    p.positive_beyond
                } else {
                    p.positive_light.lerp(p.positive, domain.unit(value))
                };
                (color, ColorBranch::Positive)
            }
            ScaleKind::Negative => {
                let color = if beyond_range {
                    p.negative_beyond
                } else {
                    // Darker as values move away from zero (toward min).
                    p.negative_light.lerp(p.negative, 1.0 - domain.unit(value))
                };
                (color, ColorBranch::Negative)
            }
            ScaleKind::Continuous => {
                let hue = 240.0 * (1.0 - domain.unit(value));
                let color = if beyond_range {
                    hsl_to_rgb(hue, 1.0, 0.3)
                } else {
                    hsl_to_rgb(hue, 0.8, 0.5)
                };
                (color, ColorBranch::Continuous)
            }
        };

        ColorAssignment {
            color,
            branch,
            beyond_range,
            near_zero,
        }
    }

    /// Gradient position of `value`: piecewise linear around zero on a diverging scale
    /// (negatives on [0, 0.5], positives on [0.5, 1]), uniform linear otherwise.
    pub fn position(&self, value: f64, domain: &ColorDomain) -> f64 {
        if self.kind(domain) == ScaleKind::Diverging {
            if value < 0.0 {
                (0.5 * (value - domain.min) / -domain.min).clamp(0.0, 0.5)
            } else {
                (0.5 + 0.5 * value / domain.max).clamp(0.5, 1.0)
            }
        } else {
            domain.unit(value)
        }
    }

    fn value_at(&self, position: f64, domain: &ColorDomain) -> f64 {
        let position = position.clamp(0.0, 1.0);
        if self.kind(domain) == ScaleKind::Diverging {
            if position <= 0.5 {
                domain.min * (1.0 - position / 0.5)
            } else {
                domain.max * ((position - 0.5) / 0.5)
            }
        } else {
            domain.min + (domain.max - domain.min) * position
        }
    }

    /// Legend ticks sorted by position. Explicit bounds outside the auto domain are left
    /// out rather than extrapolated past the drawn gradient.
    pub fn legend(&self, domain: &ColorDomain) -> Vec<LegendAnchor> {
        let mut anchors = vec![
            (AnchorKind::Min, domain.min),
            (AnchorKind::Max, domain.max),
        ];
        if domain.spans_zero() {
            anchors.push((AnchorKind::Zero, 0.0));
            let threshold = domain.near_zero_threshold(self.near_zero_ratio);
            if threshold > 0.0 {
                if -threshold > domain.min {
                    anchors.push((AnchorKind::NearZeroLow, -threshold));
                }
                if threshold < domain.max {
                    anchors.push((AnchorKind::NearZeroHigh, threshold));
                }
            }
        }
        if let Some(lo) = domain.explicit_min.filter(|v| domain.contains(*v)) {
            anchors.push((AnchorKind::ExplicitMin, lo));
        }
        if let Some(hi) = domain.explicit_max.filter(|v| domain.contains(*v)) {
            anchors.push((AnchorKind::ExplicitMax, hi));
        }

        let mut legend: Vec<LegendAnchor> = anchors
            .into_iter()
            .map(|(kind, value)| LegendAnchor {
                kind,
                value,
                position: self.position(value, domain),
            })
            .collect();
        legend.sort_by(|a, b| a.position.total_cmp(&b.position));
        legend
    }

    /// Sample the base scale (no beyond-range shading) into evenly spaced stops.
    pub fn legend_gradient(&self, domain: &ColorDomain, stops: usize) -> Vec<GradientStop> {
        let stops = stops.max(2);
        let base = ColorDomain {
            explicit_min: None,
            explicit_max: None,
            ..*domain
        };
        (0..stops)
            .map(|i| {
                let position = i as f64 / (stops - 1) as f64;
                let value = self.value_at(position, &base);
                GradientStop {
                    position,
                    color: self.color_for(value, &base).color,
                }
            })
            .collect()
    }
}
