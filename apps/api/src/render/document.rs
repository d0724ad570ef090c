//! Document composition: turns proposal data into positioned draw operations.
//!
//! Pure and synchronous. Coordinates are millimetres from the bottom-left
//! corner, matching the PDF coordinate system the backend writes.

use chrono::NaiveDate;
use serde::Serialize;

use crate::layout::{get_metrics, wrap_text, FontFamily, Layout, PageConfig, SectionId};
use crate::models::profile::Branding;
use crate::models::proposal::{Pricing, Proposal};

const PT_PER_MM: f32 = 72.0 / 25.4;
const DEFAULT_BRAND: Rgb = Rgb { r: 0.12, g: 0.25, b: 0.69 };
const DEFAULT_ACCENT: Rgb = Rgb { r: 0.39, g: 0.45, b: 0.55 };
const BODY_COLOR: Rgb = Rgb { r: 0.13, g: 0.13, b: 0.15 };
const MUTED_COLOR: Rgb = Rgb { r: 0.45, g: 0.45, b: 0.50 };
const FOOTER_SIZE_PT: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Parses `#rrggbb` or `rrggbb`. Anything else is `None`.
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb {
        r: channel(0)? as f32 / 255.0,
        g: channel(2)? as f32 / 255.0,
        b: channel(4)? as f32 / 255.0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Weight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub x_mm: f32,
    pub y_mm: f32,
    pub size_pt: f32,
    pub weight: Weight,
    pub color: Rgb,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub x1_mm: f32,
    pub x2_mm: f32,
    pub y_mm: f32,
    pub thickness_pt: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawOp {
    Text(TextRun),
    Rule(Rule),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(run) => Some(run),
            DrawOp::Rule(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub title: String,
    pub font: FontFamily,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub pages: Vec<Page>,
}

/// Everything the composer needs, borrowed from the handler's loaded rows.
pub struct RenderInput<'a> {
    pub proposal: &'a Proposal,
    pub client_name: Option<&'a str>,
    pub branding: &'a Branding,
    pub layout: &'a Layout,
    pub issued_on: NaiveDate,
}

// ────────────────────────────────────────────────────────────────────────────
// Composer
// ────────────────────────────────────────────────────────────────────────────

struct Composer<'a> {
    config: &'a PageConfig,
    font: FontFamily,
    brand: Rgb,
    accent: Rgb,
    pages: Vec<Page>,
    cursor_mm: f32,
}

impl<'a> Composer<'a> {
    fn new(config: &'a PageConfig, branding: &Branding) -> Self {
        let brand = branding
            .brand_color
            .as_deref()
            .and_then(parse_hex_color)
            .unwrap_or(DEFAULT_BRAND);
        let accent = branding
            .accent_color
            .as_deref()
            .and_then(parse_hex_color)
            .unwrap_or(DEFAULT_ACCENT);
        Self {
            config,
            font: branding.font,
            brand,
            accent,
            pages: vec![Page::default()],
            cursor_mm: config.page_height_mm - config.margin_mm,
        }
    }

    fn top(&self) -> f32 {
        self.config.page_height_mm - self.config.margin_mm
    }

    /// Lowest baseline body text may use; the footer sits below it.
    fn bottom(&self) -> f32 {
        self.config.margin_mm + 6.0
    }

    fn page(&mut self) -> &mut Page {
        // `pages` is never empty: constructed with one page and only grows.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor_mm = self.top();
    }

    fn at_page_top(&self) -> bool {
        (self.cursor_mm - self.top()).abs() < f32::EPSILON
    }

    fn ensure_space(&mut self, height_mm: f32) {
        if self.cursor_mm - height_mm < self.bottom() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn width_mm(&self, text: &str, size_pt: f32) -> f32 {
        get_metrics(self.font).measure_str(text) * size_pt / PT_PER_MM
    }

    fn push_text(&mut self, x_mm: f32, size_pt: f32, weight: Weight, color: Rgb, text: String) {
        let y_mm = self.cursor_mm;
        self.page().ops.push(DrawOp::Text(TextRun {
            x_mm,
            y_mm,
            size_pt,
            weight,
            color,
            text,
        }));
    }

    fn spacer(&mut self, mm: f32) {
        self.cursor_mm -= mm;
    }

    fn rule(&mut self, color: Rgb, thickness_pt: f32) {
        let (x1_mm, x2_mm, y_mm) = (
            self.config.margin_mm,
            self.config.page_width_mm - self.config.margin_mm,
            self.cursor_mm,
        );
        self.page().ops.push(DrawOp::Rule(Rule {
            x1_mm,
            x2_mm,
            y_mm,
            thickness_pt,
            color,
        }));
    }

    /// Wrapped text block at the left margin, breaking pages as needed.
    fn paragraph(&mut self, text: &str, size_pt: f32, weight: Weight, color: Rgb) {
        let advance = self.config.line_advance_mm(size_pt);
        let max_em = self.config.text_width_em(size_pt);
        for line in wrap_text(&to_winansi(text), get_metrics(self.font), max_em) {
            self.ensure_space(advance);
            self.spacer(advance);
            if !line.is_empty() {
                self.push_text(self.config.margin_mm, size_pt, weight, color, line);
            }
        }
    }

    fn heading(&mut self, text: &str) {
        let size = self.config.heading_size_pt;
        // Keep the heading with at least two body lines.
        let needed = self.config.line_advance_mm(size)
            + 2.0 * self.config.line_advance_mm(self.config.body_size_pt)
            + 6.0;
        self.ensure_space(needed);
        self.spacer(6.0);
        let brand = self.brand;
        self.paragraph(text, size, Weight::Bold, brand);
        self.spacer(1.5);
        self.rule(brand, 0.6);
        self.spacer(2.0);
    }

    /// One line with `left` at the margin and `right` flush to the right margin.
    fn split_line(&mut self, left: &str, right: &str, weight: Weight) {
        let size = self.config.body_size_pt;
        let advance = self.config.line_advance_mm(size);
        let right = to_winansi(right);
        let right_width = self.width_mm(&right, size);
        let right_x = self.config.page_width_mm - self.config.margin_mm - right_width;

        // Leave a gutter so long descriptions never run into the amount column.
        let left_max_em = (right_x - self.config.margin_mm - 6.0).max(10.0) * PT_PER_MM / size;
        let mut left_lines = wrap_text(&to_winansi(left), get_metrics(self.font), left_max_em);
        if left_lines.is_empty() {
            left_lines.push(String::new());
        }

        // The amount sits on the first line; continuation lines may spill onto later pages.
        let mut amount = Some(right);
        for line in left_lines {
            self.ensure_space(advance);
            self.spacer(advance);
            if let Some(amount) = amount.take() {
                self.push_text(right_x, size, weight, BODY_COLOR, amount);
            }
            if !line.is_empty() {
                self.push_text(self.config.margin_mm, size, weight, BODY_COLOR, line);
            }
        }
    }

    fn finish(mut self, footer_left: &str) -> Vec<Page> {
        let total = self.pages.len();
        let margin = self.config.margin_mm;
        let right_edge = self.config.page_width_mm - margin;
        let footer_left = to_winansi(footer_left);
        let font = self.font;
        for (i, page) in self.pages.iter_mut().enumerate() {
            let label = format!("Page {} of {}", i + 1, total);
            let label_width = get_metrics(font).measure_str(&label) * FOOTER_SIZE_PT / PT_PER_MM;
            if !footer_left.is_empty() {
                page.ops.push(DrawOp::Text(TextRun {
                    x_mm: margin,
                    y_mm: margin,
                    size_pt: FOOTER_SIZE_PT,
                    weight: Weight::Regular,
                    color: MUTED_COLOR,
                    text: footer_left.clone(),
                }));
            }
            page.ops.push(DrawOp::Text(TextRun {
                x_mm: right_edge - label_width,
                y_mm: margin,
                size_pt: FOOTER_SIZE_PT,
                weight: Weight::Regular,
                color: MUTED_COLOR,
                text: label,
            }));
        }
        self.pages
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section rendering
// ────────────────────────────────────────────────────────────────────────────

/// Lays out the proposal into pages following the resolved section order.
/// Sections with no content are skipped.
pub fn compose(input: &RenderInput<'_>, config: &PageConfig) -> Document {
    let mut composer = Composer::new(config, input.branding);
    let content = &input.proposal.content;

    for (position, id) in input.layout.sections.iter().copied().enumerate() {
        match id {
            SectionId::Cover => {
                compose_cover(&mut composer, input);
                if position + 1 < input.layout.sections.len() {
                    composer.new_page();
                }
            }
            SectionId::Summary => {
                let stored = content.section(SectionId::Summary);
                let body = if content.summary.trim().is_empty() {
                    stored.map(|s| s.body.as_str()).unwrap_or_default()
                } else {
                    content.summary.as_str()
                };
                if body.trim().is_empty() {
                    continue;
                }
                composer.heading(heading_for(input, id));
                composer.paragraph(body, config.body_size_pt, Weight::Regular, BODY_COLOR);
            }
            SectionId::Pricing => {
                if content.pricing.items.is_empty() && content.pricing.notes.is_none() {
                    continue;
                }
                composer.heading(heading_for(input, id));
                compose_pricing(&mut composer, &content.pricing);
            }
            other => {
                let Some(section) = content.section(other) else {
                    continue;
                };
                if section.body.trim().is_empty() {
                    continue;
                }
                composer.heading(heading_for(input, other));
                composer.paragraph(&section.body, config.body_size_pt, Weight::Regular, BODY_COLOR);
            }
        }
    }

    let footer = input.branding.company_name.clone().unwrap_or_default();
    Document {
        title: input.proposal.title.clone(),
        font: input.branding.font,
        page_width_mm: config.page_width_mm,
        page_height_mm: config.page_height_mm,
        pages: composer.finish(&footer),
    }
}

fn heading_for<'a>(input: &'a RenderInput<'_>, id: SectionId) -> &'a str {
    input
        .proposal
        .content
        .section(id)
        .map(|s| s.heading.as_str())
        .filter(|h| !h.trim().is_empty())
        .unwrap_or(id.default_heading())
}

fn compose_cover(composer: &mut Composer<'_>, input: &RenderInput<'_>) {
    let config = composer.config;
    let (brand, accent) = (composer.brand, composer.accent);

    composer.spacer(30.0);
    if let Some(company) = input.branding.company_name.as_deref() {
        composer.paragraph(company, config.heading_size_pt, Weight::Bold, accent);
        composer.spacer(8.0);
    }
    composer.paragraph(&input.proposal.title, config.title_size_pt, Weight::Bold, brand);
    composer.spacer(4.0);
    composer.rule(brand, 1.5);
    composer.spacer(6.0);

    if let Some(client) = input.client_name {
        composer.paragraph(
            &format!("Prepared for {client}"),
            config.body_size_pt + 2.0,
            Weight::Regular,
            BODY_COLOR,
        );
    }
    composer.paragraph(
        &format!("Issued {}", input.issued_on.format("%B %-d, %Y")),
        config.body_size_pt,
        Weight::Regular,
        MUTED_COLOR,
    );
    if let Some(until) = input.proposal.valid_until {
        composer.paragraph(
            &format!("Valid until {}", until.format("%B %-d, %Y")),
            config.body_size_pt,
            Weight::Regular,
            MUTED_COLOR,
        );
    }
}

fn compose_pricing(composer: &mut Composer<'_>, pricing: &Pricing) {
    let body_size = composer.config.body_size_pt;

    for item in &pricing.items {
        let left = if (item.quantity - 1.0).abs() > f64::EPSILON {
            format!(
                "{} ({} x {})",
                item.description,
                format_quantity(item.quantity),
                format_money(item.unit_price_cents, &pricing.currency)
            )
        } else {
            item.description.clone()
        };
        composer.split_line(&left, &format_money(item.total_cents(), &pricing.currency), Weight::Regular);
    }

    if !pricing.items.is_empty() {
        composer.spacer(2.0);
        composer.rule(MUTED_COLOR, 0.4);
        composer.split_line(
            "Total",
            &format_money(pricing.total_cents(), &pricing.currency),
            Weight::Bold,
        );
    }

    if let Some(notes) = pricing.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        composer.spacer(3.0);
        composer.paragraph(notes, body_size, Weight::Regular, MUTED_COLOR);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Formatting helpers
// ────────────────────────────────────────────────────────────────────────────

/// `12345` cents → `$123.45`; unknown currencies are prefixed with their code.
pub fn format_money(cents: i64, currency: &str) -> String {
    let negative = cents < 0;
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let symbol = match currency.to_ascii_uppercase().as_str() {
        "USD" | "CAD" | "AUD" => "$".to_string(),
        "GBP" => "£".to_string(),
        "EUR" => "€".to_string(),
        other => format!("{other} "),
    };
    format!(
        "{}{symbol}{grouped}.{:02}",
        if negative { "-" } else { "" },
        cents % 100
    )
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract().abs() < f64::EPSILON {
        format!("{}", quantity as i64)
    } else {
        format!("{quantity:.2}")
    }
}

/// Replaces characters the base-14 fonts cannot encode with close equivalents.
pub fn to_winansi(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '*',
            '\u{00A0}' => ' ',
            '\t' => ' ',
            c if (c as u32) < 0x20 && c != '\n' => ' ',
            c if (c as u32) > 0xFF && c != '€' => '?',
            c => c,
        })
        .collect()
}
