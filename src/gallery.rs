use crate::color::{color_for, GenreColorMap, Rgb, ANSI_RESET};
use crate::models::BookRow;

const UNTITLED: &str = "Untitled";
const COVER_WIDTH: u32 = 110;

/// One text card per row: title and link, author, genre badge, date, cover.
pub fn render_gallery(rows: &[&BookRow], ansi: bool) -> String {
    let mut out = String::new();
    for row in rows {
        let title = row.title.as_deref().unwrap_or(UNTITLED);
        match row.book_url.as_deref() {
            Some(url) => out.push_str(&format!("{} <{}>\n", title, url)),
            None => out.push_str(&format!("{}\n", title)),
        }
        if let Some(author) = row.author.as_deref() {
            out.push_str(&format!("  by {}\n", author));
        }
        out.push_str(&format!("  {}\n", badge(&row.genre, ansi)));
        if let Some(date) = row.published_date.as_deref() {
            out.push_str(&format!("  Published: {}\n", date));
        }
        if let Some(cover) = row.cover_image.as_deref() {
            out.push_str(&format!("  Cover: {}\n", cover));
        }
        out.push('\n');
    }
    out
}

/// Each distinct genre of the view with its color.
pub fn render_legend(rows: &[&BookRow], ansi: bool) -> String {
    let colors = GenreColorMap::from_rows(rows.iter().copied());
    let mut out = String::from("Genre colors\n");
    for (genre, color) in colors.iter() {
        let swatch = if ansi {
            format!("{}    {}", color.ansi_background(), ANSI_RESET)
        } else {
            "■".to_string()
        };
        out.push_str(&format!("  {} {} {}\n", swatch, color.hex(), genre));
    }
    out
}

fn badge(genre: &str, ansi: bool) -> String {
    let color = color_for(Some(genre));
    if ansi {
        format!(
            "{}{} {} {}",
            color.ansi_background(),
            Rgb::WHITE.ansi_foreground(),
            genre,
            ANSI_RESET
        )
    } else {
        format!("[{}] {}", genre, color.hex())
    }
}

/// A standalone HTML gallery page with the legend at the top.
pub fn gallery_html(rows: &[&BookRow]) -> String {
    let colors = GenreColorMap::from_rows(rows.iter().copied());
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Fable Book Explorer</title>\n</head>\n<body>\n");
    html.push_str("<h1>Book Gallery</h1>\n<ul class=\"legend\">\n");
    for (genre, color) in colors.iter() {
        html.push_str(&format!(
            "<li><span style=\"background-color:{}; color:white; padding:3px 8px; border-radius:6px;\">{}</span></li>\n",
            color.hex(),
            escape_html(genre)
        ));
    }
    html.push_str("</ul>\n");

    for row in rows {
        html.push_str("<div class=\"book\" style=\"display:flex; gap:16px; margin-bottom:16px;\">\n");
        html.push_str("<div class=\"cover\">");
        if let Some(cover) = row.cover_image.as_deref() {
            html.push_str(&format!(
                "<img src=\"{}\" width=\"{}\" alt=\"\">",
                escape_html(cover),
                COVER_WIDTH
            ));
        }
        html.push_str("</div>\n<div class=\"details\">\n");

        let title = escape_html(row.title.as_deref().unwrap_or(UNTITLED));
        let url = escape_html(row.book_url.as_deref().unwrap_or(""));
        html.push_str(&format!("<p><strong><a href=\"{}\">{}</a></strong></p>\n", url, title));
        if let Some(author) = row.author.as_deref() {
            html.push_str(&format!("<p><em>by {}</em></p>\n", escape_html(author)));
        }
        let color = colors.get(&row.genre).unwrap_or(Rgb::NEUTRAL_GRAY);
        html.push_str(&format!(
            "<span style=\"background-color:{}; color:white; padding:3px 8px; border-radius:6px; font-size:0.85em;\">{}</span>\n",
            color.hex(),
            escape_html(&row.genre)
        ));
        if let Some(date) = row.published_date.as_deref() {
            html.push_str(&format!("<p><small>Published: {}</small></p>\n", escape_html(date)));
        }
        html.push_str("</div>\n</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
