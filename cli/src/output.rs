use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use assistant_core::config::AssistantConfig;
use colored::*;
use log::debug;
use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};

/// Delay between characters of the typing effect
pub const TYPING_DELAY: Duration = Duration::from_millis(15);

/// Draws `text` centered in a rounded box.
fn panel(text: &str) -> String {
    let width = text.chars().count() + 4;
    format!(
        "╭{bar}╮\n│  {text}  │\n╰{bar}╯",
        bar = "─".repeat(width),
        text = text
    )
}

pub fn print_banner() {
    println!("{}", panel("Office AI Assistant").blue().bold());
    println!("Type 'exit' to quit.\n");
}

pub fn print_farewell() {
    println!("\n{}", panel("Goodbye! Have a nice day.").green());
}

/// Splits rendered text into typing steps: each visible character with any
/// ANSI escape sequences in front of it. Trailing escapes join the last step.
fn typing_steps(text: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut pending = String::new();
    let mut in_escape = false;

    for c in text.chars() {
        pending.push(c);
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            steps.push(std::mem::take(&mut pending));
        }
    }

    if !pending.is_empty() {
        match steps.last_mut() {
            Some(last) => last.push_str(&pending),
            None => steps.push(pending),
        }
    }
    steps
}

async fn type_out(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    for step in typing_steps(text) {
        stdout.write_all(step.as_bytes())?;
        stdout.flush()?;
        tokio::time::sleep(TYPING_DELAY).await;
    }
    writeln!(stdout)
}

/// Prints an assistant reply. Model replies are rendered as markdown; with
/// `typing` on, characters appear one at a time when stdout is a terminal.
pub async fn print_reply(text: &str, from_model: bool, typing: bool) {
    let rendered = if from_model {
        render_markdown(text).trim().to_string()
    } else {
        text.to_string()
    };

    print!("{} ", "Assistant:".blue().bold());
    if typing && io::stdout().is_terminal() {
        if let Err(e) = type_out(&rendered).await {
            debug!("Typing effect interrupted: {}", e);
            println!();
        }
    } else {
        println!("{}", rendered);
    }
    println!();
}

/// Summary printed by `--show-config`. The API key is masked.
pub fn print_config(config: &AssistantConfig, data_dir: &std::path::Path, config_file: &std::path::Path) {
    println!("{}", "Configuration:".yellow().bold());
    println!("  {:<18} {}", "config file", config_file.display());
    println!("  {:<18} {}", "data directory", data_dir.display());
    println!("  {:<18} {}", "model", config.model_name.as_deref().unwrap_or("-"));
    println!("  {:<18} {}", "api base url", config.api_base_url.as_deref().unwrap_or("-"));
    println!("  {:<18} {}", "api key", config.masked_api_key());
    println!(
        "  {:<18} {}",
        "temperature",
        config.temperature.map_or("-".to_string(), |t| t.to_string())
    );
    println!("  {:<18} {}", "history turns", config.max_history_turns());
    println!();
    println!("{}", "Try:".cyan());
    println!("  {}", "add meeting Project Discussion at 8am".green());
    println!("  {}", "show meetings".green());
    println!("  {}", "delete meeting Project Discussion".green());
}

/// Renders markdown for the terminal.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = MdParser::new_ext(markdown, options);

    let mut in_code_block = false;
    let mut code_block_lang = String::new();
    let mut list_depth = 0usize;
    let mut ordered: Vec<Option<u64>> = Vec::new();
    let mut output = String::new();

    for event in parser {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                if !output.is_empty() && !output.ends_with("\n\n") {
                    output.push('\n');
                }
                let marker = match level {
                    HeadingLevel::H1 => "#",
                    HeadingLevel::H2 => "##",
                    _ => "###",
                };
                output.push_str(&format!("{} ", marker.bright_cyan().bold()));
            }
            MdEvent::End(Tag::Heading(..)) => {
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {
                if list_depth == 0 && !output.is_empty() && !output.ends_with("\n\n") {
                    output.push_str(if output.ends_with('\n') { "\n" } else { "\n\n" });
                }
            }
            MdEvent::End(Tag::Paragraph) => {
                if list_depth == 0 {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::CodeBlock(info)) => {
                in_code_block = true;
                code_block_lang = match info {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    _ => String::new(),
                };
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                if !code_block_lang.is_empty() {
                    output.push_str(&format!("{}:\n", code_block_lang.cyan()));
                }
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
                in_code_block = false;
            }
            MdEvent::Start(Tag::List(start)) => {
                if list_depth == 0 && !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                list_depth += 1;
                ordered.push(start);
            }
            MdEvent::End(Tag::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                ordered.pop();
            }
            MdEvent::Start(Tag::Item) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                match ordered.last_mut() {
                    Some(Some(n)) => {
                        output.push_str(&format!("{}. ", n.to_string().yellow()));
                        *n += 1;
                    }
                    _ => output.push_str(&format!("{}  ", "•".yellow())),
                }
            }
            MdEvent::End(Tag::Item) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::Code(code) => {
                output.push_str(&format!("{}", code.on_bright_black().white()));
            }
            MdEvent::Text(text) => {
                if in_code_block {
                    output.push_str(&text.green().to_string());
                } else {
                    output.push_str(&text);
                }
            }
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            MdEvent::Rule => {
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            _ => {}
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(markdown: &str) -> String {
        colored::control::set_override(false);
        render_markdown(markdown)
    }

    #[test]
    fn test_render_paragraphs() {
        assert_eq!(plain("Hello there.").trim(), "Hello there.");
        assert_eq!(plain("One\ntwo\n\nThree").trim(), "One two\n\nThree");
    }

    #[test]
    fn test_render_lists() {
        let out = plain("Agenda:\n\n- budget\n- hiring");
        assert!(out.contains("•  budget\n"));
        assert!(out.contains("•  hiring\n"));

        let out = plain("1. first\n2. second");
        assert!(out.contains("1. first\n"));
        assert!(out.contains("2. second\n"));
    }

    #[test]
    fn test_render_heading_and_code() {
        let out = plain("# Title\n\n```rust\nfn main() {}\n```\n");
        assert!(out.starts_with("# Title\n"));
        assert!(out.contains("rust:\n"));
        assert!(out.contains("fn main() {}\n"));
    }

    #[test]
    fn test_typing_steps_keep_escapes_with_characters() {
        let steps = typing_steps("\x1b[1mHi\x1b[0m");
        assert_eq!(steps, vec!["\x1b[1mH".to_string(), "i\x1b[0m".to_string()]);

        let steps = typing_steps("ok");
        assert_eq!(steps, vec!["o".to_string(), "k".to_string()]);

        assert!(typing_steps("").is_empty());
        assert_eq!(typing_steps("\x1b[0m"), vec!["\x1b[0m".to_string()]);
    }

    #[test]
    fn test_panel_shape() {
        let lines: Vec<String> = panel("Hi").lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "│  Hi  │");
        assert_eq!(lines[0].chars().count(), lines[1].chars().count());
    }
}
