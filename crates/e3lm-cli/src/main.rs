mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use e3lm_lexer::config::DEFAULT_EXTENSION;
use e3lm_lexer::{Lexer, LexerConfig, Source, Token};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "e3lm")]
#[command(about = "3lm description language lexer")]
#[command(version)]
struct Cli {
    /// More log output (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the token stream of a .3lm file
    Lex {
        /// Input file; `.3lm` is assumed when no extension is given
        path: String,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        #[command(flatten)]
        options: LexOptions,
    },

    /// Check a .3lm file for errors without printing tokens
    Check {
        /// Input file; `.3lm` is assumed when no extension is given
        path: String,

        #[command(flatten)]
        options: LexOptions,
    },
}

#[derive(clap::Args)]
struct LexOptions {
    /// Leave `import` lines in place instead of inlining them
    #[arg(long)]
    no_imports: bool,

    /// Columns a tab counts for in indentation
    #[arg(long, default_value_t = 4)]
    tab_width: usize,
}

impl LexOptions {
    fn config(&self) -> LexerConfig {
        let config = LexerConfig::default().with_tab_width(self.tab_width);
        if self.no_imports {
            config.without_imports()
        } else {
            config
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Lex {
            path,
            format,
            options,
        } => cmd_lex(&path, format, &options.config()),
        Command::Check { path, options } => cmd_check(&path, &options.config()),
    }
}

fn resolve_path(path: &str) -> PathBuf {
    let mut resolved = PathBuf::from(path);
    if resolved.extension().is_none() {
        resolved.set_extension(DEFAULT_EXTENSION);
    }
    resolved
}

fn lex(path: &str, config: &LexerConfig) -> Vec<Token> {
    let path = resolve_path(path);
    if !path.exists() {
        eprintln!("Error: file not found: {}", path.display());
        std::process::exit(1);
    }

    let source = match Source::open(&path, config) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match Lexer::new(&source).collect::<Result<Vec<_>, _>>() {
        Ok(tokens) => {
            info!(target: "e3lm::cli", path = %path.display(), tokens = tokens.len(), "lexed");
            tokens
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn cmd_lex(path: &str, format: Format, config: &LexerConfig) {
    let tokens = lex(path, config);

    match format {
        Format::Text => {
            for token in &tokens {
                println!("{}", render(token));
            }
        }
        Format::Json => match serde_json::to_string_pretty(&tokens) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error encoding tokens: {e}");
                std::process::exit(1);
            }
        },
    }
}

fn cmd_check(path: &str, config: &LexerConfig) {
    lex(path, config);
    eprintln!("OK: {path}");
}

/// One token per line: `line:column KIND value`.
fn render(token: &Token) -> String {
    let position = format!("{}:{}", token.line(), token.column());
    let value = token.value.to_string();
    if value.is_empty() {
        format!("{position:<8} {}", token.kind)
    } else {
        format!("{position:<8} {:<10} {value}", token.kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e3lm_lexer::{tokenize, STRING_ORIGIN};

    #[test]
    fn test_resolve_path_defaults_extension() {
        assert_eq!(resolve_path("design"), PathBuf::from("design.3lm"));
        assert_eq!(resolve_path("dir/design.txt"), PathBuf::from("dir/design.txt"));
    }

    #[test]
    fn test_render_token_lines() {
        let tokens = tokenize("Foo\n  x = 1\nend\n", STRING_ORIGIN).unwrap();
        let lines: Vec<_> = tokens.iter().map(render).collect();
        assert_eq!(lines[0], "1:1      CLASS      \"Foo\"");
        assert_eq!(lines[2], "2:7      NUM_INT    1");
        assert_eq!(lines[3], "3:1      END");
    }

    #[test]
    fn test_lex_options_config() {
        let options = LexOptions {
            no_imports: true,
            tab_width: 8,
        };
        let config = options.config();
        assert!(!config.follow_imports);
        assert_eq!(config.tab_width, 8);
    }
}
