//! GUI control hydration, driven by a static schema table.
//!
//! Each control type has a fixed positional layout for the fields that
//! follow its type keyword. A [`ControlSchema`] lists which of those slots
//! become node arguments and which become layout fields, so supporting a
//! new widget is one more table entry.

use std::ops::RangeInclusive;

use super::args::{parse_bool, parse_number, parse_string};
use super::error::StatementError;
use crate::document::{Arg, ControlType, NodeLayout};

/// Where a value comes from in a control's field list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Number(usize),
    /// A `0`/`1` flag, stored as a number.
    Bool(usize),
    /// Send/receive/label symbol; `empty` and `-` mean unset.
    Symbol(usize),
    /// Kept as its literal text even when it looks numeric.
    Text(usize),
    /// Slider position decoded back to a value, see [`slider_value`].
    SliderValue {
        min: usize,
        max: usize,
        log: usize,
        extent: usize,
        stored: usize,
    },
}

/// Layout attributes a control slot can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutField {
    Size,
    Width,
    Height,
    WidthInChars,
    Hold,
    Interrupt,
    Log,
    LogHeight,
    SteadyOnClick,
    Label,
    LabelPos,
    LabelX,
    LabelY,
    LabelFont,
    LabelFontSize,
    BgColor,
    FgColor,
    LabelColor,
}

impl LayoutField {
    pub fn apply(self, layout: &mut NodeLayout, value: Arg) {
        let number = value.as_number();
        let text = match value {
            Arg::Text(s) => s,
            Arg::Number(n) => n.to_string(),
        };
        match self {
            LayoutField::Size => layout.size = number,
            LayoutField::Width => layout.width = number,
            LayoutField::Height => layout.height = number,
            LayoutField::WidthInChars => layout.width_in_chars = number,
            LayoutField::Hold => layout.hold = number,
            LayoutField::Interrupt => layout.interrupt = number,
            LayoutField::Log => layout.log = number,
            LayoutField::LabelPos => layout.label_pos = number,
            LayoutField::LabelX => layout.label_x = number,
            LayoutField::LabelY => layout.label_y = number,
            LayoutField::LabelFontSize => layout.label_font_size = number,
            LayoutField::LogHeight => layout.log_height = Some(text),
            LayoutField::SteadyOnClick => layout.steady_on_click = Some(text),
            LayoutField::Label => layout.label = Some(text),
            LayoutField::LabelFont => layout.label_font = Some(text),
            LayoutField::BgColor => layout.bg_color = Some(text),
            LayoutField::FgColor => layout.fg_color = Some(text),
            LayoutField::LabelColor => layout.label_color = Some(text),
        }
    }
}

/// Positional schema of one control type.
#[derive(Debug)]
pub struct ControlSchema {
    pub control: ControlType,
    /// Accepted number of fields after the type keyword.
    pub arity: RangeInclusive<usize>,
    pub args: &'static [Slot],
    pub layout: &'static [(LayoutField, Slot)],
    /// Start of the label block shared by IEM GUIs: label, label x, label
    /// y, font, font size.
    pub label: Option<usize>,
}

use LayoutField as L;

static BNG: ControlSchema = ControlSchema {
    control: ControlType::Bng,
    arity: 14..=14,
    args: &[Slot::Bool(3), Slot::Symbol(5), Slot::Symbol(4)],
    layout: &[
        (L::Size, Slot::Number(0)),
        (L::Hold, Slot::Number(1)),
        (L::Interrupt, Slot::Number(2)),
        (L::BgColor, Slot::Text(11)),
        (L::FgColor, Slot::Text(12)),
        (L::LabelColor, Slot::Text(13)),
    ],
    label: Some(6),
};

static TGL: ControlSchema = ControlSchema {
    control: ControlType::Tgl,
    arity: 14..=14,
    args: &[
        Slot::Number(13),
        Slot::Bool(1),
        Slot::Number(12),
        Slot::Symbol(3),
        Slot::Symbol(2),
    ],
    layout: &[
        (L::Size, Slot::Number(0)),
        (L::BgColor, Slot::Text(9)),
        (L::FgColor, Slot::Text(10)),
        (L::LabelColor, Slot::Text(11)),
    ],
    label: Some(4),
};

static NBX: ControlSchema = ControlSchema {
    control: ControlType::Nbx,
    arity: 18..=18,
    args: &[
        Slot::Number(2),
        Slot::Number(3),
        Slot::Bool(5),
        Slot::Number(16),
        Slot::Symbol(7),
        Slot::Symbol(6),
    ],
    layout: &[
        (L::WidthInChars, Slot::Number(0)),
        (L::Height, Slot::Number(1)),
        (L::Log, Slot::Number(4)),
        (L::BgColor, Slot::Text(13)),
        (L::FgColor, Slot::Text(14)),
        (L::LabelColor, Slot::Text(15)),
        (L::LogHeight, Slot::Text(17)),
    ],
    label: Some(8),
};

macro_rules! slider {
    ($control:expr, $extent:expr) => {
        ControlSchema {
            control: $control,
            arity: 18..=18,
            args: &[
                Slot::Number(2),
                Slot::Number(3),
                Slot::Bool(5),
                Slot::SliderValue {
                    min: 2,
                    max: 3,
                    log: 4,
                    extent: $extent,
                    stored: 16,
                },
                Slot::Symbol(7),
                Slot::Symbol(6),
            ],
            layout: &[
                (L::Width, Slot::Number(0)),
                (L::Height, Slot::Number(1)),
                (L::Log, Slot::Number(4)),
                (L::BgColor, Slot::Text(13)),
                (L::FgColor, Slot::Text(14)),
                (L::LabelColor, Slot::Text(15)),
                (L::SteadyOnClick, Slot::Text(17)),
            ],
            label: Some(8),
        }
    };
}

static HSL: ControlSchema = slider!(ControlType::Hsl, 0);
static VSL: ControlSchema = slider!(ControlType::Vsl, 1);

macro_rules! radio {
    ($control:expr) => {
        ControlSchema {
            control: $control,
            arity: 15..=15,
            args: &[
                Slot::Number(3),
                Slot::Bool(2),
                Slot::Number(14),
                Slot::Symbol(5),
                Slot::Symbol(4),
                Slot::Number(1),
            ],
            layout: &[
                (L::Size, Slot::Number(0)),
                (L::BgColor, Slot::Text(11)),
                (L::FgColor, Slot::Text(12)),
                (L::LabelColor, Slot::Text(13)),
            ],
            label: Some(6),
        }
    };
}

static HRADIO: ControlSchema = radio!(ControlType::Hradio);
static VRADIO: ControlSchema = radio!(ControlType::Vradio);

static VU: ControlSchema = ControlSchema {
    control: ControlType::Vu,
    arity: 12..=12,
    args: &[Slot::Symbol(2), Slot::Text(11)],
    layout: &[
        (L::Width, Slot::Number(0)),
        (L::Height, Slot::Number(1)),
        (L::BgColor, Slot::Text(8)),
        (L::LabelColor, Slot::Text(9)),
        (L::Log, Slot::Number(10)),
    ],
    label: Some(3),
};

static CNV: ControlSchema = ControlSchema {
    control: ControlType::Cnv,
    arity: 13..=13,
    args: &[Slot::Symbol(4), Slot::Symbol(3), Slot::Text(12)],
    layout: &[
        (L::Size, Slot::Number(0)),
        (L::Width, Slot::Number(1)),
        (L::Height, Slot::Number(2)),
        (L::BgColor, Slot::Text(10)),
        (L::LabelColor, Slot::Text(11)),
    ],
    label: Some(5),
};

macro_rules! atom {
    ($control:expr) => {
        ControlSchema {
            control: $control,
            // Pd 0.52 appended a font size field.
            arity: 7..=8,
            args: &[
                Slot::Number(1),
                Slot::Number(2),
                Slot::Symbol(5),
                Slot::Symbol(6),
            ],
            layout: &[
                (L::WidthInChars, Slot::Number(0)),
                (L::LabelPos, Slot::Number(3)),
                (L::Label, Slot::Symbol(4)),
            ],
            label: None,
        }
    };
}

static FLOATATOM: ControlSchema = atom!(ControlType::Floatatom);
static SYMBOLATOM: ControlSchema = atom!(ControlType::Symbolatom);
static LISTBOX: ControlSchema = atom!(ControlType::Listbox);

/// Schema for an `#X obj` whose class is a GUI control.
pub fn object_schema(class: &str) -> Option<&'static ControlSchema> {
    match class {
        "bng" => Some(&BNG),
        "tgl" => Some(&TGL),
        "nbx" => Some(&NBX),
        "hsl" => Some(&HSL),
        "vsl" => Some(&VSL),
        "hradio" | "hdl" => Some(&HRADIO),
        "vradio" | "vdl" => Some(&VRADIO),
        "vu" => Some(&VU),
        "cnv" => Some(&CNV),
        _ => None,
    }
}

/// Schema for an atom box element (`#X floatatom ...`).
pub fn atom_schema(keyword: &str) -> Option<&'static ControlSchema> {
    match keyword {
        "floatatom" => Some(&FLOATATOM),
        "symbolatom" => Some(&SYMBOLATOM),
        "listbox" => Some(&LISTBOX),
        _ => None,
    }
}

impl ControlSchema {
    /// Decode `fields` into node args, filling `layout` in place.
    pub fn hydrate(
        &self,
        fields: &[String],
        layout: &mut NodeLayout,
    ) -> Result<Vec<Arg>, StatementError> {
        if !self.arity.contains(&fields.len()) {
            let (lo, hi) = (self.arity.start(), self.arity.end());
            return Err(StatementError::Arity {
                element: self.control.name().to_string(),
                expected: if lo == hi {
                    lo.to_string()
                } else {
                    format!("{lo} to {hi}")
                },
                found: fields.len(),
            });
        }

        for (field, slot) in self.layout.iter().chain(&self.label_block()) {
            field.apply(layout, slot.decode(fields)?);
        }
        self.args.iter().map(|slot| slot.decode(fields)).collect()
    }
}

impl ControlSchema {
    fn label_block(&self) -> Vec<(LayoutField, Slot)> {
        let Some(at) = self.label else {
            return Vec::new();
        };
        vec![
            (L::Label, Slot::Symbol(at)),
            (L::LabelX, Slot::Number(at + 1)),
            (L::LabelY, Slot::Number(at + 2)),
            (L::LabelFont, Slot::Text(at + 3)),
            (L::LabelFontSize, Slot::Number(at + 4)),
        ]
    }
}

impl Slot {
    fn decode(self, fields: &[String]) -> Result<Arg, StatementError> {
        let number = |i| -> Result<f64, StatementError> { Ok(parse_number(field(fields, i)?)?) };
        match self {
            Slot::Number(i) => Ok(Arg::Number(number(i)?)),
            Slot::Bool(i) => Ok(Arg::from(parse_bool(field(fields, i)?)?)),
            Slot::Symbol(i) => {
                let symbol = parse_string(field(fields, i)?)?;
                Ok(Arg::Text(match symbol.as_str() {
                    "empty" | "-" => String::new(),
                    _ => symbol,
                }))
            }
            Slot::Text(i) => Ok(Arg::Text(parse_string(field(fields, i)?)?)),
            Slot::SliderValue {
                min,
                max,
                log,
                extent,
                stored,
            } => Ok(Arg::Number(slider_value(
                number(min)?,
                number(max)?,
                parse_bool(field(fields, log)?)?,
                number(extent)?,
                number(stored)?,
            ))),
        }
    }
}

fn field(fields: &[String], index: usize) -> Result<&str, StatementError> {
    fields
        .get(index)
        .map(String::as_str)
        .ok_or(StatementError::MissingField {
            element: "control",
            field: "argument",
        })
}

/// Convert a slider's stored position back to its value.
///
/// Sliders save their position scaled to 100 steps per pixel of their long
/// side (`extent`). Log sliders with a range crossing or touching zero are
/// clamped first, the same way Pd does it.
pub fn slider_value(min: f64, max: f64, log: bool, extent: f64, stored: f64) -> f64 {
    let steps = (extent - 1.0) * 100.0;
    let f = if steps > 0.0 { stored / steps } else { 0.0 };

    if !log {
        return min + f * (max - min);
    }

    let (mut min, mut max) = (min, max);
    if min == 0.0 && max == 0.0 {
        max = 1.0;
    }
    if max > 0.0 && min <= 0.0 {
        min = 0.01 * max;
    } else if max <= 0.0 && min > 0.0 {
        max = 0.01 * min;
    }
    min * (max / min).powf(f)
}
