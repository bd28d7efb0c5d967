use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser, Debug)]
#[clap(
    name = "tagnotes",
    version,
    about = "Capture short tagged notes and browse them as a timeline"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the stored notes and tags
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the tagnotes application
    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::{BuiltinTag, TagCommands};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_builtin_tag() {
        let cli = Cli::try_parse_from(["tagnotes", "add", "buy milk", "-t", "todo"]).unwrap();
        match cli.command {
            Commands::Add { content, tag, .. } => {
                assert_eq!(content.as_deref(), Some("buy milk"));
                assert_eq!(tag, Some(BuiltinTag::Todo));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn list_rejects_two_tag_selections() {
        assert!(Cli::try_parse_from(["tagnotes", "list", "-t", "idea", "-c", "Work"]).is_err());
        assert!(Cli::try_parse_from(["tagnotes", "list", "-c", "Work", "-s", "milk"]).is_ok());
    }

    #[test]
    fn parses_tag_subcommands() {
        let cli = Cli::try_parse_from(["tagnotes", "tag", "add", "Work", "--color", "#112233"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tag(TagCommands::Add { ref name, .. }) if name == "Work"
        ));
    }

    #[test]
    fn list_limit_of_zero_is_a_parse_error() {
        assert!(Cli::try_parse_from(["tagnotes", "list", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["tagnotes", "list", "-n", "3"]).is_ok());
    }

    #[test]
    fn parses_tag_list_search() {
        let cli = Cli::try_parse_from(["tagnotes", "tag", "list", "-s", "work"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tag(TagCommands::List { search: Some(ref s), json: false }) if s == "work"
        ));
    }

    #[test]
    fn unknown_builtin_tag_is_a_parse_error() {
        assert!(Cli::try_parse_from(["tagnotes", "add", "x", "-t", "work"]).is_err());
    }
}
