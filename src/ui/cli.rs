//! Console control surface
//!
//! Interactive command loop over stdin. Every command calls straight into
//! the controller and prints the state it reads back afterwards.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::business::{EngineLifecycleController, EngineSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Enable,
    Disable,
    Toggle,
    List,
    Use(String),
    Clear,
    Add(PathBuf),
    Delete(String),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };

        match (verb.to_lowercase().as_str(), arg) {
            ("", _) => Command::Empty,
            ("e" | "enable" | "on", _) => Command::Enable,
            ("d" | "disable" | "off", _) => Command::Disable,
            ("t" | "toggle", _) => Command::Toggle,
            ("l" | "ls" | "list", _) => Command::List,
            ("u" | "use" | "set", name) if !name.is_empty() => Command::Use(name.to_string()),
            ("c" | "clear", _) => Command::Clear,
            ("a" | "add", path) if !path.is_empty() => Command::Add(PathBuf::from(path)),
            ("rm" | "delete" | "del", name) if !name.is_empty() => {
                Command::Delete(name.to_string())
            }
            ("s" | "status", _) => Command::Status,
            ("h" | "help" | "?", _) => Command::Help,
            ("q" | "quit" | "exit", _) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

fn print_help() {
    println!("════════════════════════════════════════════════════════════");
    println!("  Commands:");
    println!("  enable | disable | toggle    turn key sounds on/off");
    println!("  list                         show stored sound files");
    println!("  use <name>                   set the default sound file");
    println!("  clear                        unset the default sound file");
    println!("  add <path>                   copy a sound file into storage");
    println!("  delete <name>                remove a stored sound file");
    println!("  status                       show current state");
    println!("  quit                         exit");
    println!("════════════════════════════════════════════════════════════");
}

fn print_status(snapshot: &EngineSnapshot) {
    println!(
        "   Enabled: {}  |  Hook: {}  |  Sound: {}",
        if snapshot.enabled { "yes" } else { "no" },
        if snapshot.hook_installed { "installed" } else { "not installed" },
        snapshot.active_file.as_deref().unwrap_or("<none configured>")
    );
}

/// Run the console front end until `quit` or end of input.
pub fn run_console(controller: Arc<EngineLifecycleController>) -> Result<()> {
    println!("Keyboard Sound v{} (console)", env!("CARGO_PKG_VERSION"));
    println!(
        "Sound storage: {}",
        controller.repository().storage_dir().display()
    );
    print_status(&controller.snapshot());
    print_help();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!(">>> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let command = Command::parse(&line?);

        match command {
            Command::Enable | Command::Disable | Command::Toggle => {
                let result = match command {
                    Command::Enable => controller.set_enabled(true),
                    Command::Disable => controller.set_enabled(false),
                    _ => controller.toggle_enabled().map(|_| ()),
                };
                if let Err(e) = result {
                    println!("❌ Failed to change state: {}", e);
                }
                print_status(&controller.snapshot());
            }
            Command::List => {
                controller.revalidate_active_file();
                let active = controller.snapshot().active_file;
                let files = controller.list_sounds();
                if files.is_empty() {
                    println!("   (no sound files stored, use `add <path>`)");
                }
                for name in files {
                    let marker = if active.as_deref() == Some(name.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("  {} {}", marker, name);
                }
            }
            Command::Use(name) => match controller.set_active_file(&name) {
                Ok(()) => println!("✅ Default file set to: {}", name),
                Err(e) => println!("❌ Failed to set default file: {}", e),
            },
            Command::Clear => {
                controller.clear_active_file();
                print_status(&controller.snapshot());
            }
            Command::Add(path) => match controller.add_sound(&path) {
                Ok(stored) => println!("✅ Stored as: {}", stored),
                Err(e) => println!("❌ Failed to add file: {}", e),
            },
            Command::Delete(name) => match controller.delete_sound(&name) {
                Ok(true) => println!("✅ File deleted: {}", name),
                Ok(false) => println!("⚠️  No such file: {}", name),
                Err(e) => println!("❌ Failed to delete file: {}", e),
            },
            Command::Status => {
                controller.revalidate_active_file();
                print_status(&controller.snapshot());
            }
            Command::Help => print_help(),
            Command::Quit => {
                tracing::info!("User requested exit");
                break;
            }
            Command::Empty => {}
            Command::Unknown(cmd) => {
                println!("❓ Unknown command: {} (type `help`)", cmd);
            }
        }
    }

    Ok(())
}
