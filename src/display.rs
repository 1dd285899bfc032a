use chrono::{DateTime, Utc};
use ratatui::style::{Color, Style};
use regex::Regex;
use scraper::{Html, Node};
use std::sync::LazyLock;

use crate::models::{Job, JobType};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole elapsed days, floored, without regard to calendar boundaries.
pub fn time_since(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - date).num_milliseconds().div_euclid(MILLIS_PER_DAY);
    match days {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        n => format!("{} days ago", n),
    }
}

/// Unrecognised types show their raw value.
pub fn format_job_type(job_type: &JobType) -> &str {
    match job_type {
        JobType::FullTime => "Full Time",
        JobType::PartTime => "Part Time",
        JobType::Contract => "Contract",
        JobType::Freelance => "Freelance",
        JobType::Internship => "Internship",
        JobType::Unknown(raw) => raw,
    }
}

pub fn badge_style(job_type: &JobType) -> Style {
    let color = match job_type {
        JobType::FullTime => Color::Blue,
        JobType::PartTime => Color::Magenta,
        JobType::Contract => Color::Yellow,
        JobType::Freelance => Color::Green,
        JobType::Internship => Color::Cyan,
        JobType::Unknown(_) => Color::Gray,
    };
    Style::default().fg(color)
}

pub fn applicants_label(job: &Job) -> String {
    format!("{} applicants", job.applicants.unwrap_or(0))
}

/// Only http(s) logos are real images; anything else is a placeholder.
pub fn logo_url(job: &Job) -> Option<&str> {
    job.logo.as_deref().filter(|logo| logo.starts_with("http"))
}

pub fn apply_path(job: &Job) -> String {
    format!("/jobs/{}", job.slug)
}

static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\x{a0}]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n(\s*\n)+").expect("valid regex"));

/// Flatten rich-text HTML from the API into plain paragraphs.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => match el.name() {
                "p" | "div" | "br" | "ul" | "ol" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    out.push('\n')
                }
                "li" => out.push_str("\n• "),
                _ => {}
            },
            _ => {}
        }
    }

    let out = INLINE_SPACE.replace_all(&out, " ");
    let out = BLANK_LINES.replace_all(&out, "\n\n");
    out.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
