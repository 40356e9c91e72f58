use std::{collections::HashMap, io::Cursor};

use chrono::{DateTime, Utc};
use log::{error, warn};
use printpdf::{IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use serde::Serialize;

use crate::{
    constants::{SHOPPING_LIST_FILENAME_FORMAT, SHOPPING_LIST_HEADER},
    database::schema::{RecipeIngredient, Uuid},
    Error, HtmlError,
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 8.0;
const FONT_SIZE: f32 = 12.0;

/// DejaVu Sans, compiled in so the Cyrillic header always renders.
pub const BUNDLED_FONT: &[u8] = include_bytes!("../static/fonts/DejaVuSans.ttf");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per ingredient. Items keep the order in which their
/// ingredient first appears in `lines`.
pub fn aggregate(lines: &[RecipeIngredient]) -> Vec<ShoppingItem> {
    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    let mut items: Vec<ShoppingItem> = Vec::new();

    for line in lines {
        match positions.get(&line.ingredient_id) {
            Some(index) => items[*index].amount += i64::from(line.amount),
            None => {
                positions.insert(line.ingredient_id, items.len());
                items.push(ShoppingItem {
                    name: line.name.to_owned(),
                    measurement_unit: line.measurement_unit.to_owned(),
                    amount: i64::from(line.amount),
                });
            }
        }
    }

    items
}

/// Header followed by one `- name: amount unit` line per item, sorted by
/// name. The last line ends with `.`, every other with `;`.
pub fn format_lines(items: &[ShoppingItem]) -> Vec<String> {
    let mut sorted: Vec<&ShoppingItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
    });

    let last = sorted.len().saturating_sub(1);
    let mut lines = vec![SHOPPING_LIST_HEADER.to_string()];

    lines.extend(sorted.into_iter().enumerate().map(|(i, item)| {
        let end = if i == last { '.' } else { ';' };
        format!(
            "- {}: {} {}{}",
            item.name, item.amount, item.measurement_unit, end
        )
    }));

    lines
}

fn pdf_error(e: printpdf::Error) -> Error {
    error!("Failed to render shopping list: {}", e);
    HtmlError::InternalServerError.new("Failed to render shopping list")
}

fn load_font(doc: &PdfDocumentReference, font: Option<&[u8]>) -> Result<IndirectFontRef, Error> {
    if let Some(bytes) = font {
        match doc.add_external_font(Cursor::new(bytes)) {
            Ok(font) => return Ok(font),
            Err(e) => warn!("Unusable PDF font, falling back to DejaVu Sans: {}", e),
        }
    }

    doc.add_external_font(Cursor::new(BUNDLED_FONT))
        .map_err(pdf_error)
}

/// Renders `lines` onto A4 pages, one text line each. `font` overrides the
/// bundled TrueType font.
pub fn render_pdf(lines: &[String], font: Option<&[u8]>) -> Result<Vec<u8>, Error> {
    let (doc, page, layer) =
        PdfDocument::new("Shopping list", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = load_font(&doc, font)?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        if y < MARGIN {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            current = doc.get_page(page).get_layer(layer);
            y = PAGE_HEIGHT - MARGIN;
        }

        current.use_text(line.as_str(), FONT_SIZE, Mm(MARGIN), Mm(y), &font);
        y -= LINE_HEIGHT;
    }

    doc.save_to_bytes().map_err(pdf_error)
}

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("cart-{}.pdf", now.format(SHOPPING_LIST_FILENAME_FORMAT))
}
