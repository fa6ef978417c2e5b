use std::fmt::Display;
use std::io::{self, Write};

use colored::*;

use crate::args::ArgumentList;

const BOX_WIDTH: usize = 79;

/// Terminal formatting for the interactive session.
///
/// Holds no state; coloring is switched off process-wide through
/// `colored::control` before the console is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

impl Console {
    pub fn banner(&self) {
        let border = "═".repeat(BOX_WIDTH);
        println!("\n{}", format!("╔{}╗", border).truecolor(0, 212, 255));
        for (text, bold) in [
            ("ARC-Tech", true),
            ("Advanced Recon Clone Tools", false),
        ] {
            let padding = BOX_WIDTH.saturating_sub(text.chars().count());
            let left = padding / 2;
            let line = if bold { text.truecolor(0, 212, 255).bold() } else { text.truecolor(255, 255, 255) };
            println!(
                "{}{}{}{}{}",
                "║".truecolor(0, 212, 255),
                " ".repeat(left),
                line,
                " ".repeat(padding - left),
                "║".truecolor(0, 212, 255)
            );
        }
        println!("{}", format!("╚{}╝", border).truecolor(0, 212, 255));

        println!("\n{}", "Commander,".cyan().bold());
        println!("ARC-Tech maps the target's infrastructure: open ports, service versions");
        println!("and operating system fingerprints, then hands the raw intelligence over");
        println!("for analysis.");
        println!(
            "\n{}\n",
            "May the Force guide your efforts, Commander. The Republic depends on you.".magenta().bold()
        );
    }

    /// Print a prompt without a trailing newline.
    pub fn prompt(&self, text: &str) -> io::Result<()> {
        print!("{} ", text.truecolor(191, 64, 191).bold());
        io::stdout().flush()
    }

    pub fn mode_menu(&self) {
        println!("First task is to run an nmap scan with Commander Cody. Would you like to:");
        println!("{} Use default options", "(1)".cyan().bold());
        println!("{} Type your own nmap command line flags", "(2)".cyan().bold());
        println!("{} Have Commander Cody assist in building a command", "(3)".cyan().bold());
    }

    pub fn info(&self, message: &str) {
        println!("{}", message);
    }

    pub fn success(&self, message: &str) {
        println!("{}", message.green().bold());
    }

    pub fn executing(&self, binary: &str, args: &ArgumentList) {
        println!(
            "{} {} {} {}",
            "Executing".bright_green().bold(),
            binary.bright_cyan(),
            "with:".bright_white(),
            format!("{} ...", args).truecolor(255, 255, 255).bold()
        );
        println!(
            "{} {}",
            "Scan started at".bright_white(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string().bright_yellow()
        );
    }

    pub fn analysis_output(&self, output: &str) {
        println!("{}", "Analysis output:".truecolor(191, 64, 191).bold());
        if output.trim().is_empty() {
            println!("{}", "(no output)".truecolor(128, 128, 128));
        } else {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
    }

    pub fn failure(&self, error: &dyn Display) {
        eprintln!("{} {}", "Error:".truecolor(255, 0, 81).bold(), error);
    }
}
