//! CLI argument parsing

use crate::config::CliOverrides;
use crate::docstrings::DocstringStyle;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Introspect Python objects into documentation trees
#[derive(Parser, Debug)]
#[command(name = "docatlas")]
#[command(about = "Introspect Python objects into documentation trees")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load one or more dotted paths and print their trees as JSON
    Load {
        /// Dotted paths of the root objects
        #[arg(required = true)]
        paths: Vec<String>,

        /// Member name rule, regex with optional `!` prefix (can be repeated)
        #[arg(long = "filter", allow_hyphen_values = true)]
        filters: Vec<String>,

        /// Only document these root members (comma separated)
        #[arg(long, value_delimiter = ',')]
        members: Option<Vec<String>>,

        /// Docstring style (google, restructured-text, plain)
        #[arg(long, value_parser = parse_style)]
        style: Option<DocstringStyle>,

        /// Rewrite `Note:` style blocks into admonitions
        #[arg(long)]
        replace_admonitions: bool,

        /// Capture source code for every node
        #[arg(long)]
        show_source: bool,

        /// Include members inherited from base classes
        #[arg(long)]
        inherited: bool,

        /// Stop descending below this depth
        #[arg(long)]
        max_depth: Option<usize>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Read JSON requests from stdin and print one result list per request
    Batch {
        /// Treat every stdin line as a separate request
        #[arg(long)]
        line_by_line: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show version information
    Version,
}

/// Options shared by every loading command
#[derive(ClapArgs, Debug, Default)]
pub struct CommonArgs {
    /// Directory searched for modules (can be repeated)
    #[arg(short = 'I', long = "search-path")]
    pub search_paths: Vec<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Command {
    /// Settings the command line imposes on the config file
    pub fn overrides(&self) -> CliOverrides {
        match self {
            Command::Load {
                filters,
                members,
                style,
                replace_admonitions,
                show_source,
                inherited,
                max_depth,
                common,
                ..
            } => CliOverrides {
                search_paths: common.search_paths.clone(),
                filters: filters.clone(),
                members: members.clone(),
                docstring_style: *style,
                replace_admonitions: *replace_admonitions,
                show_source: *show_source,
                inherited_members: *inherited,
                max_depth: *max_depth,
            },
            Command::Batch { common, .. } => CliOverrides {
                search_paths: common.search_paths.clone(),
                ..CliOverrides::default()
            },
            Command::Version => CliOverrides::default(),
        }
    }
}

fn parse_style(name: &str) -> Result<DocstringStyle, String> {
    DocstringStyle::from_name(name).ok_or_else(|| format!("unknown docstring style '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults() {
        let args = Args::try_parse_from(["docatlas", "load", "pkg.mod"]).unwrap();
        match args.command {
            Command::Load {
                paths,
                filters,
                members,
                style,
                max_depth,
                common,
                ..
            } => {
                assert_eq!(paths, vec!["pkg.mod".to_string()]);
                assert!(filters.is_empty());
                assert!(members.is_none());
                assert!(style.is_none());
                assert!(max_depth.is_none());
                assert!(common.search_paths.is_empty());
                assert!(!common.pretty);
            }
            _ => panic!("Expected Load command"),
        }
    }

    #[test]
    fn test_load_with_options() {
        let args = Args::try_parse_from([
            "docatlas", "load", "pkg.a", "pkg.b",
            "-I", "src",
            "--search-path", "vendor",
            "--filter", "!^_",
            "--filter", "^__init__$",
            "--members", "A,b",
            "--style", "rst",
            "--replace-admonitions",
            "--show-source",
            "--inherited",
            "--max-depth", "4",
            "--config", "custom.toml",
            "--pretty",
            "--verbose",
        ])
        .unwrap();

        let overrides = args.command.overrides();
        assert_eq!(overrides.search_paths, vec![PathBuf::from("src"), PathBuf::from("vendor")]);
        assert_eq!(overrides.filters, vec!["!^_".to_string(), "^__init__$".to_string()]);
        assert_eq!(overrides.members, Some(vec!["A".to_string(), "b".to_string()]));
        assert_eq!(overrides.docstring_style, Some(DocstringStyle::RestructuredText));
        assert!(overrides.replace_admonitions);
        assert!(overrides.show_source);
        assert!(overrides.inherited_members);
        assert_eq!(overrides.max_depth, Some(4));

        match args.command {
            Command::Load { paths, common, .. } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(common.config, Some(PathBuf::from("custom.toml")));
                assert!(common.pretty);
                assert!(common.verbose);
            }
            _ => panic!("Expected Load command"),
        }
    }

    #[test]
    fn test_load_requires_path() {
        assert!(Args::try_parse_from(["docatlas", "load"]).is_err());
    }

    #[test]
    fn test_unknown_style_rejected() {
        assert!(Args::try_parse_from(["docatlas", "load", "pkg", "--style", "numpy"]).is_err());
    }

    #[test]
    fn test_batch_line_by_line() {
        let args = Args::try_parse_from(["docatlas", "batch", "--line-by-line", "-I", "src"]).unwrap();
        match args.command {
            Command::Batch { line_by_line, ref common } => {
                assert!(line_by_line);
                assert_eq!(common.search_paths, vec![PathBuf::from("src")]);
            }
            _ => panic!("Expected Batch command"),
        }
        assert!(args.command.overrides().filters.is_empty());
    }

    #[test]
    fn test_version_command() {
        let args = Args::try_parse_from(["docatlas", "version"]).unwrap();
        assert!(matches!(args.command, Command::Version));
    }
}
