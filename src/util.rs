use std::path::Path;
use std::time::Duration;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

/// Seconds with one decimal, e.g. `12.3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Print a heading framed by rules of `ch`.
pub fn print_banner(ch: char, width: usize, title: &str) {
    let rule = ch.to_string().repeat(width);
    println!("\n{rule}");
    println!("{title}");
    println!("{rule}");
}
