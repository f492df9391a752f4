use crate::config;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::AuctionRecord;
use reqwest::Url as LinkUrl;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatUnderline, Url, Workbook};
use std::path::Path;

/// Canonical columns that at least one record carries, in canonical order.
pub fn column_layout(records: &[AuctionRecord]) -> Vec<&'static str> {
    config::COLUMN_ORDER
        .iter()
        .copied()
        .filter(|column| records.iter().any(|r| r.contains(column)))
        .collect()
}

/// Detail-page URL for `record`, when all six linking fields are non-empty.
pub fn detail_link(record: &AuctionRecord) -> Option<String> {
    let params: Vec<(&str, &str)> = config::LINK_FIELDS
        .iter()
        .map(|(param, field)| (*param, record.value(field)))
        .collect();

    if params.iter().any(|(_, value)| value.is_empty()) {
        return None;
    }

    LinkUrl::parse_with_params(config::DETAIL_PAGE_URL, &params)
        .ok()
        .map(String::from)
}

/// Longest rendered value per column (header included), plus two, capped.
pub fn column_widths(columns: &[&str], records: &[AuctionRecord]) -> Vec<f64> {
    columns
        .iter()
        .map(|column| {
            let longest = records
                .iter()
                .map(|r| r.value(column).chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0);
            (longest + 2).min(config::MAX_COLUMN_WIDTH) as f64
        })
        .collect()
}

/// `value` cut to the per-cell character limit of a worksheet.
fn clip_to_cell_limit(value: &str) -> &str {
    match value.char_indices().nth(config::MAX_CELL_CHARS) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

pub fn write_records(records: &[AuctionRecord], path: &Path) -> AppResult<()> {
    write_sheet(records, path, config::MAX_URLS_PER_SHEET)
}

fn write_sheet(records: &[AuctionRecord], path: &Path, link_cap: usize) -> AppResult<()> {
    if records.is_empty() {
        log(LogLevel::Warning, "No records to save.");
        return Err(AppError::Write("no records to save".to_string()));
    }

    let columns = column_layout(records);
    let link_col = columns.iter().position(|c| *c == config::LINK_TARGET_FIELD);

    let cell_format = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let link_format = cell_format
        .clone()
        .set_font_color(Color::RGB(0x0000FF))
        .set_underline(FormatUnderline::Single);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(config::SHEET_NAME)?;

    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &cell_format)?;
    }

    let mut links_written = 0usize;
    let mut link_cap_hit = false;

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let full = record.value(name);
            let value = clip_to_cell_limit(full);
            if value.len() < full.len() {
                log(
                    LogLevel::Warning,
                    &format!(
                        "Row {} column '{}': value of {} chars clipped to {}.",
                        row + 1,
                        name,
                        full.chars().count(),
                        config::MAX_CELL_CHARS
                    ),
                );
            }

            // A link needs display text; an empty cell stays a plain blank.
            if Some(col) == link_col && !value.is_empty() {
                if let Some(url) = detail_link(record) {
                    if links_written < link_cap {
                        worksheet.write_url_with_format(
                            row,
                            col as u16,
                            Url::new(url).set_text(value),
                            &link_format,
                        )?;
                        links_written += 1;
                        continue;
                    }
                    link_cap_hit = true;
                }
            }

            if value.is_empty() {
                worksheet.write_blank(row, col as u16, &cell_format)?;
            } else {
                worksheet.write_string_with_format(row, col as u16, value, &cell_format)?;
            }
        }
    }

    for (col, width) in column_widths(&columns, records).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width)?;
    }

    if link_cap_hit {
        log(
            LogLevel::Warning,
            &format!(
                "Hyperlink limit of {} per sheet reached; remaining rows in {} are plain text.",
                link_cap,
                path.display()
            ),
        );
    }

    workbook.save(path)?;
    Ok(())
}
