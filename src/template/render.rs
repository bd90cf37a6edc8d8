//! # Template Rendering
//!
//! Converts a [`LabelTemplate`] plus a value map into an [`Envelope`].
//!
//! Rendering tracks the printer's style state (font, size, alignment,
//! direction) and only emits a style command when the resolved value differs
//! from what was last emitted. The state lives for one render call.

use super::{BarcodeSpec, FieldSpec, Item, LabelTemplate, parse_f64};
use crate::envelope::{Command, ENVELOPE_VERSION, Envelope, Origin, YDirection};
use crate::values::ValueMap;

/// Style state as last emitted during one render.
#[derive(Debug, Default)]
struct RenderState {
    font: Option<String>,
    size: Option<f64>,
    align: Option<String>,
    direction: Option<String>,
}

impl RenderState {
    fn update_font(&mut self, envelope: &mut Envelope, font: &str, size: f64) {
        if self.font.as_deref() != Some(font) || self.size != Some(size) {
            envelope.push(Command::SetFont {
                name: font.to_string(),
                size,
            });
            self.font = Some(font.to_string());
            self.size = Some(size);
        }
    }

    fn update_align(&mut self, envelope: &mut Envelope, align: Option<&str>) {
        if let Some(align) = align {
            if self.align.as_deref() != Some(align) {
                envelope.push(Command::SetAlignment {
                    align: align.to_string(),
                });
                self.align = Some(align.to_string());
            }
        }
    }

    fn update_direction(&mut self, envelope: &mut Envelope, direction: Option<&str>) {
        if let Some(direction) = direction {
            if self.direction.as_deref() != Some(direction) {
                envelope.push(Command::SetDirection {
                    direction: direction.to_string(),
                });
                self.direction = Some(direction.to_string());
            }
        }
    }
}

impl LabelTemplate {
    /// Render the template with the given values.
    ///
    /// The command list always starts with `Setup` and ends with `PrintFeed`.
    /// Rendering never fails: unresolvable placeholders are left as written.
    pub fn render(&self, values: &ValueMap) -> Envelope {
        self.render_with_version(values, ENVELOPE_VERSION)
    }

    /// Render with an explicit envelope version tag.
    pub fn render_with_version(&self, values: &ValueMap, version: &str) -> Envelope {
        let mut envelope = Envelope::with_version(Some(&self.source), version);
        envelope.set_layout(
            self.width,
            self.height,
            self.units,
            Origin::BottomLeft,
            YDirection::Up,
            self.dpi,
        );
        if !self.description.is_empty() {
            envelope.document.description = Some(self.description.clone());
        }

        envelope.push(Command::Setup {
            name: self.label_name.clone(),
        });

        let mut state = RenderState::default();

        for group in &self.groups {
            for item in &group.items {
                match item {
                    Item::Comment(text) => {
                        if !text.is_empty() {
                            envelope.push(Command::Comment { text: text.clone() });
                        }
                    }
                    Item::Field(field) => self.render_field(
                        &mut envelope,
                        &mut state,
                        field,
                        values,
                        group.offset_x,
                        group.offset_y,
                    ),
                    Item::Barcode(barcode) => render_barcode(
                        &mut envelope,
                        &mut state,
                        barcode,
                        values,
                        group.offset_x,
                        group.offset_y,
                    ),
                }
            }
        }

        envelope.push(Command::PrintFeed);
        envelope
    }

    fn render_field(
        &self,
        envelope: &mut Envelope,
        state: &mut RenderState,
        field: &FieldSpec,
        values: &ValueMap,
        offset_x: f64,
        offset_y: f64,
    ) {
        let font = field
            .font
            .clone()
            .or_else(|| state.font.clone())
            .unwrap_or_else(|| self.base_font.clone());

        let current_size = state.size.unwrap_or(0.0);
        let size = match field.size.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_f64(Some(raw), current_size),
            _ => current_size,
        };

        state.update_font(envelope, &font, size);
        state.update_align(envelope, field.align.as_deref());
        state.update_direction(envelope, field.direction.as_deref());

        envelope.push(Command::MoveTo {
            x: offset_x + field.x,
            y: offset_y + field.y,
        });
        envelope.push(Command::DrawText {
            text: resolve_text(field, values),
        });
    }
}

fn render_barcode(
    envelope: &mut Envelope,
    state: &mut RenderState,
    barcode: &BarcodeSpec,
    values: &ValueMap,
    offset_x: f64,
    offset_y: f64,
) {
    // Barcodes carry no font; they only move alignment/direction.
    state.update_align(envelope, barcode.align.as_deref());
    state.update_direction(envelope, barcode.direction.as_deref());

    let value = barcode
        .name
        .as_deref()
        .and_then(|name| values.get(name))
        .cloned()
        .unwrap_or_else(|| barcode.value.clone());

    envelope.push(Command::MoveTo {
        x: offset_x + barcode.x,
        y: offset_y + barcode.y,
    });
    envelope.push(Command::DrawBarcode {
        value,
        kind: barcode.kind.clone(),
        width: barcode.width,
        ratio: barcode.ratio,
        height: barcode.height,
        size: barcode.size,
    });
}

fn resolve_text(field: &FieldSpec, values: &ValueMap) -> String {
    if let Some(text) = field.text.as_deref().filter(|t| !t.is_empty()) {
        return format_placeholders(text, values);
    }

    let value = field
        .name
        .as_deref()
        .and_then(|name| values.get(name))
        .map(String::as_str)
        .unwrap_or("");
    let composed = format!("{}{}{}", field.prefix, value, field.suffix);
    format_placeholders(&composed, values)
}

/// Substitute `{NAME}` placeholders from the value map.
///
/// `{{` and `}}` are literal braces. A format spec after `:` or a conversion
/// after `!` is accepted and ignored. If any placeholder is missing or a
/// brace is unbalanced, the text is returned unchanged.
pub fn format_placeholders(template: &str, values: &ValueMap) -> String {
    if !(template.contains('{') && template.contains('}')) {
        return template.to_string();
    }
    try_format(template, values).unwrap_or_else(|| template.to_string())
}

fn try_format(template: &str, values: &ValueMap) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        '{' => return None,
                        ch => key.push(ch),
                    }
                }
                let field = key.split([':', '!']).next().unwrap_or("");
                if field.is_empty() {
                    return None;
                }
                out.push_str(values.get(field)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return None,
            _ => out.push(c),
        }
    }

    Some(out)
}
