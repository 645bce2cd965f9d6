use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use locale_catalog_editor::{Action, Config, Editor, logging, parse_locale_values};

#[derive(Parser, Debug)]
#[command(
    name = "locale-catalog-editor",
    version,
    about = "Inspect, edit and machine-translate per-locale JSON catalogs"
)]
struct Cli {
    /// Locales folder (defaults to the last opened folder)
    #[arg(long = "root", global = true)]
    root: Option<String>,

    /// Model name or provider:model (e.g. openai:gpt-4o)
    #[arg(short = 'm', long = "model", global = true)]
    model: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key", global = true)]
    key: Option<String>,

    /// Read an extra settings TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Log progress to stderr
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Keep one session open and read commands from stdin
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a locales folder and remember it
    Open { dir: String },
    /// Completion and missing locales for every file
    Overview,
    /// Key statistics for one file
    Stats { file: String },
    /// Key by locale table for one file
    Show { file: String },
    /// Create an empty file in every locale
    AddFile { name: String },
    /// Add a key with empty values in every locale
    AddKey { file: String, key: String },
    /// Rename a key and/or set its values
    Edit {
        file: String,
        key: String,
        /// New key name
        #[arg(long = "rename")]
        rename: Option<String>,
        /// locale=value, repeatable
        #[arg(long = "set")]
        set: Vec<String>,
    },
    /// Generate translations of a key from one locale
    Generate {
        file: String,
        key: String,
        /// Locale whose value is translated
        #[arg(short = 's', long = "source")]
        source: String,
        /// Extra context for the model
        #[arg(short = 'c', long = "context")]
        context: Option<String>,
        /// Target locale, repeatable (defaults to the configured locales)
        #[arg(short = 't', long = "target")]
        targets: Vec<String>,
        /// Replace values that are already filled
        #[arg(long = "overwrite")]
        overwrite: bool,
    },
    /// Write pending changes to disk
    Save,
}

impl Command {
    fn into_action(self) -> Result<Action> {
        let action = match self {
            Command::Open { dir } => Action::Open { root: dir },
            Command::Overview => Action::Overview,
            Command::Stats { file } => Action::Stats { file },
            Command::Show { file } => Action::Show { file },
            Command::AddFile { name } => Action::AddFile { name },
            Command::AddKey { file, key } => Action::AddKey { file, key },
            Command::Edit {
                file,
                key,
                rename,
                set,
            } => Action::Edit {
                file,
                key,
                rename,
                values: parse_locale_values(&set)?,
            },
            Command::Generate {
                file,
                key,
                source,
                context,
                targets,
                overwrite,
            } => Action::Generate {
                file,
                key,
                source_locale: source,
                context,
                targets: if targets.is_empty() {
                    None
                } else {
                    Some(targets.into_iter().collect::<BTreeSet<_>>())
                },
                overwrite,
            },
            Command::Save => Action::Save,
        };
        Ok(action)
    }
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            root: self.root.clone(),
            model: self.model.clone(),
            key: self.key.clone(),
            settings_path: self.read_settings.clone(),
            verbose: self.verbose,
        }
    }
}

/// One interactive line, parsed with the same subcommands as the CLI.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct InteractiveLine {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    logging::init(config.verbose)?;

    if cli.interactive {
        return run_interactive(config).await;
    }

    let command = cli.command.unwrap_or(Command::Overview);
    let output = locale_catalog_editor::run(config, command.into_action()?).await?;
    println!("{}", output);
    Ok(())
}

struct InteractiveState {
    editor: Editor,
    quit_warned: bool,
}

async fn run_interactive(config: Config) -> Result<()> {
    let mut state = InteractiveState {
        editor: Editor::new(config)?,
        quit_warned: false,
    };
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    if let Err(err) = state.editor.ensure_open() {
        println!("{:#}", err);
    }

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if !input.starts_with('/') {
            println!("Commands start with '/'. Type /help to see them.");
            continue;
        }
        match handle_interactive_command(input, &mut state).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => println!("error: {:#}", err),
        }
    }
    Ok(())
}

async fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        if state.editor.session().is_dirty() && !state.quit_warned {
            state.quit_warned = true;
            println!("There are unsaved changes. Use /save, or /quit again to discard them.");
            return Ok(false);
        }
        return Ok(true);
    }
    state.quit_warned = false;

    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/status" {
        let output = state.editor.dispatch(Action::Status).await?;
        println!("{}", output);
        return Ok(false);
    }

    let words = split_words(&trimmed[1..])?;
    let line = InteractiveLine::try_parse_from(words).map_err(|err| anyhow!(err.to_string()))?;
    let output = state.editor.dispatch(line.command.into_action()?).await?;
    println!("{}", output);
    Ok(false)
}

/// Splits on whitespace; double quotes group words and `\"` escapes a quote.
fn split_words(input: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            ch => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(anyhow!("unterminated quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /open <dir>                      open a locales folder");
    println!("  /overview                        completion of every file");
    println!("  /stats <file>                    key statistics for one file");
    println!("  /show <file>                     key by locale table");
    println!("  /add-file <name>                 create a file in every locale");
    println!("  /add-key <file> <key>            add an empty key");
    println!("  /edit <file> <key> [--rename <new>] [--set loc=value]...");
    println!("  /generate <file> <key> --source <loc> [--target <loc>]...");
    println!("            [--context <text>] [--overwrite]");
    println!("  /save                            write pending changes");
    println!("  /status                          folder, locales and unsaved changes");
    println!("  /help                            show this help");
    println!("  /quit | /exit                    leave (asks again when unsaved)");
    println!("Quote values with spaces: /edit common.json hello --set \"fr=Bonjour à tous\"");
}
