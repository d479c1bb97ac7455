use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

/// One ranked query hit: position, id, score, then the text dimmed
pub fn result_row(rank: usize, id: &str, score: f32, text: &str) {
    println!(
        "{:>3}. {} {}",
        rank,
        id.style(theme().header.clone()),
        format!("(score: {:.4})", score).style(theme().muted.clone())
    );
    let preview: String = text.chars().take(120).collect();
    println!("     {}", dim(&preview));
}
