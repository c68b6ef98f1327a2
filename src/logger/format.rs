//! Log formatting and output with ANSI colors and text wrapping.
//!
//! Handles colorized console output with tag/level alignment, word-boundary
//! wrapping at a fixed terminal width, and mirroring every line to the file
//! logger stripped of color codes.

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const LOG_SHOW_TIME: bool = true;

const TAG_WIDTH: usize = 11;
const LOG_TYPE_WIDTH: usize = 8;
const BRACKET_SPACE_WIDTH: usize = 3;
const TOTAL_PREFIX_WIDTH: usize = TAG_WIDTH + LOG_TYPE_WIDTH + BRACKET_SPACE_WIDTH * 2;

const MAX_LINE_LENGTH: usize = 145;

pub fn format_and_log(tag: LogTag, log_type: &str, message: &str) {
    let now = Local::now();

    let prefix = if LOG_SHOW_TIME {
        now.format("%H:%M:%S ").to_string().dimmed().to_string()
    } else {
        String::new()
    };

    let tag_str = format_tag(&tag);
    let log_type_str = format_log_type(log_type);

    let base_line = format!("{}[{}] [{}] ", prefix, tag_str, log_type_str);

    let base_length = strip_ansi_codes(&base_line).len().max(TOTAL_PREFIX_WIDTH + prefix.len());
    let available_space = if MAX_LINE_LENGTH > base_length { MAX_LINE_LENGTH - base_length } else { 50 };

    let message_chunks = wrap_text(message, available_space);

    let console_line = format!("{}{}", base_line, message_chunks[0]);
    print_stdout_safe(&console_line);

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let tag_clean = tag.to_plain_string();
    let file_line = format!("{} [{}] [{}] {}", timestamp, tag_clean, log_type, message_chunks[0]);
    write_to_file(&file_line);

    if message_chunks.len() > 1 {
        let continuation_prefix =
            format!("{}{}", " ".repeat(strip_ansi_codes(&prefix).len()), " ".repeat(TOTAL_PREFIX_WIDTH));
        for chunk in &message_chunks[1..] {
            let console_continuation = format!("{}{}", continuation_prefix, chunk);
            print_stdout_safe(&console_continuation);

            let file_continuation = format!("{} [{}] [{}] {}", timestamp, tag_clean, log_type, chunk);
            write_to_file(&file_continuation);
        }
    }
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = tag.to_plain_string();
    let padded = format!("{:<width$}", label, width = TAG_WIDTH);
    match tag {
        LogTag::Supervisor => padded.bright_yellow().bold(),
        LogTag::Scheduler => padded.bright_blue().bold(),
        LogTag::Chain => padded.bright_cyan().bold(),
        LogTag::Wallet => padded.bright_magenta().bold(),
        LogTag::Trading => padded.bright_green().bold(),
        LogTag::Strategy => padded.bright_white().bold(),
        LogTag::Risk => padded.bright_red().bold(),
        LogTag::Discovery => padded.bright_white().bold(),
        LogTag::Pricing => padded.bright_green().bold(),
        LogTag::Store => padded.bright_cyan().bold(),
        LogTag::Webserver => padded.bright_green().bold(),
        LogTag::System => padded.bright_yellow().bold(),
        LogTag::Test => padded.bright_blue().bold(),
        LogTag::Other(_) => padded.white().bold(),
    }
}

fn format_log_type(log_type: &str) -> ColoredString {
    match log_type.to_uppercase().as_str() {
        "ERROR" => format!("{:<width$}", log_type, width = LOG_TYPE_WIDTH).bright_red().bold(),
        "WARNING" => format!("{:<width$}", log_type, width = LOG_TYPE_WIDTH).yellow().bold(),
        _ => format!("{:<width$}", log_type, width = LOG_TYPE_WIDTH).white().bold(),
    }
}

fn print_stdout_safe(message: &str) {
    if let Err(e) = writeln!(stdout(), "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "logger stdout error: {}", e);
    }
    if let Err(e) = stdout().flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;
    for ch in text.chars() {
        if ch == '\x1b' {
            in_escape = true;
        } else if in_escape && ch == 'm' {
            in_escape = false;
        } else if !in_escape {
            result.push(ch);
        }
    }
    result
}

fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for line in text.split('\n') {
        let line_display_length = strip_ansi_codes(line).len();

        if line_display_length <= max_width {
            result.push(line.to_string());
        } else {
            let mut current_line = String::new();

            for word in line.split_whitespace() {
                let word_display_length = strip_ansi_codes(word).len();
                let current_display_length = strip_ansi_codes(&current_line).len();

                if word_display_length > max_width {
                    if !current_line.is_empty() {
                        result.push(current_line);
                        current_line = String::new();
                    }
                    for chunk in break_long_word(word, max_width) {
                        result.push(chunk);
                    }
                } else if current_line.is_empty() {
                    current_line = word.to_string();
                } else if current_display_length + word_display_length + 1 <= max_width {
                    current_line.push(' ');
                    current_line.push_str(word);
                } else {
                    result.push(current_line);
                    current_line = word.to_string();
                }
            }

            if !current_line.is_empty() {
                result.push(current_line);
            }
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }

    result
}

fn break_long_word(word: &str, max_width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = word;

    while !remaining.is_empty() {
        if remaining.chars().count() <= max_width {
            chunks.push(remaining.to_string());
            break;
        }

        let mut char_boundary = 0;
        let mut char_count = 0;
        for (byte_idx, _) in remaining.char_indices() {
            if char_count >= max_width {
                break;
            }
            char_boundary = byte_idx;
            char_count += 1;
        }

        if char_count == 0 {
            if let Some((next_boundary, _)) = remaining.char_indices().nth(1) {
                char_boundary = next_boundary;
            } else {
                chunks.push(remaining.to_string());
                break;
            }
        }

        let chunk = &remaining[..char_boundary.max(1)];
        chunks.push(chunk.to_string());
        remaining = &remaining[chunk.len()..];
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_long_lines_at_word_boundaries() {
        let chunks = wrap_text("a b c d e f g h i j k l m n o p", 5);
        assert!(chunks.iter().all(|c| strip_ansi_codes(c).len() <= 5 || !c.contains(' ')));
    }

    #[test]
    fn short_lines_pass_through_untouched() {
        assert_eq!(wrap_text("short", 100), vec!["short".to_string()]);
    }
}
