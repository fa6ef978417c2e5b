use clap::Parser;
use std::path::PathBuf;

/// Optional overrides; the scan itself is driven by interactive prompts.
#[derive(Parser, Debug)]
#[command(name = "arctech")]
#[command(version)]
#[command(about = "Interactive nmap front end that pipes scan output into an analysis script", long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Settings file (defaults to <config dir>/arctech/config.json)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_required() {
        let cli = Cli::try_parse_from(["arctech"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
        assert!(!cli.no_color);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from(["arctech", "-c", "/tmp/arc.json", "--verbose", "--no-color"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/arc.json")));
        assert!(cli.verbose);
        assert!(cli.no_color);
    }
}
