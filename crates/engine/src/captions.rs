use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::timeline::{Resolution, TimeRange};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionStyle {
    pub font: String,
    pub font_size: u32,
    pub font_color: String,
    pub box_color: String,
    /// Horizontal space left free across both sides of the frame.
    pub side_margin: i32,
    /// Distance from the bottom of the frame to the top of the text block.
    pub bottom_offset: i32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        CaptionStyle {
            font: "Arial".to_string(),
            font_size: 60,
            font_color: "white".to_string(),
            box_color: "black".to_string(),
            side_margin: 100,
            bottom_offset: 300,
        }
    }
}

impl CaptionStyle {
    /// Characters per line for the fixed-width wrap, assuming an average
    /// glyph width of half the font size.
    pub fn wrap_width(&self, frame: Resolution) -> usize {
        let usable = (frame.width - self.side_margin).max(1) as f64;
        let glyph = (self.font_size as f64 * 0.5).max(1.0);
        ((usable / glyph).floor() as usize).max(1)
    }

    pub fn top_y(&self, frame: Resolution) -> i32 {
        frame.height - self.bottom_offset
    }
}

/// A caption ready to be drawn: wrapped text written to `text_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionOverlay {
    pub time_range: TimeRange,
    pub text_file: PathBuf,
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// Escapes a value for use inside a filtergraph option: first the option
/// level (`\ : '`), then the graph level (`\ ' , ; [ ]`).
pub fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ':' | '\'') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | ',' | ';' | '[' | ']') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// drawtext filter showing one caption during `[start, end)`.
pub fn drawtext_filter(overlay: &CaptionOverlay, style: &CaptionStyle, frame: Resolution) -> String {
    format!(
        "drawtext=textfile={}:expansion=none:font={}:fontsize={}:fontcolor={}:box=1:boxcolor={}:boxborderw=10:line_spacing=8:x=(w-text_w)/2:y={}:enable='gte(t,{:.6})*lt(t,{:.6})'",
        escape_filter_value(&overlay.text_file.to_string_lossy()),
        escape_filter_value(&style.font),
        style.font_size,
        style.font_color,
        style.box_color,
        style.top_y(frame),
        overlay.time_range.start,
        overlay.time_range.end,
    )
}
