//! PDF backend: writes a composed `Document` with printpdf's base-14 fonts.

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
    Rgb as PdfRgb,
};

use super::document::{DrawOp, Document, Rgb, Rule, TextRun, Weight};
use super::RenderError;
use crate::layout::FontFamily;

fn builtin(font: FontFamily, weight: Weight) -> BuiltinFont {
    match (font, weight) {
        (FontFamily::Helvetica, Weight::Regular) => BuiltinFont::Helvetica,
        (FontFamily::Helvetica, Weight::Bold) => BuiltinFont::HelveticaBold,
        (FontFamily::Times, Weight::Regular) => BuiltinFont::TimesRoman,
        (FontFamily::Times, Weight::Bold) => BuiltinFont::TimesBold,
        (FontFamily::Courier, Weight::Regular) => BuiltinFont::Courier,
        (FontFamily::Courier, Weight::Bold) => BuiltinFont::CourierBold,
    }
}

fn color(c: Rgb) -> Color {
    Color::Rgb(PdfRgb::new(c.r, c.g, c.b, None))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, weight: Weight) -> &IndirectFontRef {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

fn draw_text(layer: &PdfLayerReference, fonts: &Fonts, run: &TextRun) {
    layer.set_fill_color(color(run.color));
    layer.use_text(
        run.text.clone(),
        run.size_pt,
        Mm(run.x_mm),
        Mm(run.y_mm),
        fonts.get(run.weight),
    );
}

fn draw_rule(layer: &PdfLayerReference, rule: &Rule) {
    layer.set_outline_color(color(rule.color));
    layer.set_outline_thickness(rule.thickness_pt);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(rule.x1_mm), Mm(rule.y_mm)), false),
            (Point::new(Mm(rule.x2_mm), Mm(rule.y_mm)), false),
        ],
        is_closed: false,
    });
}

/// Serializes the document to PDF bytes. CPU-bound; call from a blocking task.
pub fn write_pdf(document: &Document) -> Result<Vec<u8>, RenderError> {
    let width = Mm(document.page_width_mm);
    let height = Mm(document.page_height_mm);
    let (pdf, first_page, first_layer) =
        PdfDocument::new(document.title.clone(), width, height, "Page 1");

    let fonts = Fonts {
        regular: pdf
            .add_builtin_font(builtin(document.font, Weight::Regular))
            .map_err(|e| RenderError::Pdf(e.to_string()))?,
        bold: pdf
            .add_builtin_font(builtin(document.font, Weight::Bold))
            .map_err(|e| RenderError::Pdf(e.to_string()))?,
    };

    for (i, page) in document.pages.iter().enumerate() {
        let (page_idx, layer_idx) = if i == 0 {
            (first_page, first_layer)
        } else {
            pdf.add_page(width, height, format!("Page {}", i + 1))
        };
        let layer = pdf.get_page(page_idx).get_layer(layer_idx);

        for op in &page.ops {
            match op {
                DrawOp::Text(run) => draw_text(&layer, &fonts, run),
                DrawOp::Rule(rule) => draw_rule(&layer, rule),
            }
        }
    }

    pdf.save_to_bytes()
        .map_err(|e| RenderError::Pdf(e.to_string()))
}
