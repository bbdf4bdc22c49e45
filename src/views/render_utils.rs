use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2, vec2};

pub(super) const LABEL_COLOR: Color32 = Color32::from_gray(214);

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

pub(super) fn label_color(tinted: bool, opacity: f32) -> Color32 {
    let base = if tinted {
        blend_color(LABEL_COLOR, super::HIGHLIGHT_TINT, 0.85)
    } else {
        LABEL_COLOR
    };
    with_opacity(base, opacity)
}

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));
    painter.rect_stroke(
        rect,
        0.0,
        Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 120)),
        eframe::egui::StrokeKind::Inside,
    );
}

/// egui ships a single weight per family, so bold is drawn as a doubled
/// glyph run offset by half a pixel.
pub(super) fn draw_label(
    painter: &Painter,
    position: Pos2,
    anchor: Align2,
    text: &str,
    font: FontId,
    color: Color32,
    bold: bool,
) {
    painter.text(position, anchor, text, font.clone(), color);
    if bold {
        painter.text(position + vec2(0.5, 0.0), anchor, text, font, color);
    }
}

pub(super) fn local_pointer(rect: Rect, pointer: Option<Pos2>) -> Option<Vec2> {
    pointer
        .filter(|pointer| rect.contains(*pointer))
        .map(|pointer| pointer - rect.min)
}
