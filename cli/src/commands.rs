//! Slash command parsing and handling

use crate::AppState;
use docsmith_core::ConversationContext;
use llm::ModelProvider;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    Document,
    Sections,
    History,
    Load(PathBuf),
    Save(PathBuf),
    SetModel(String),
}

pub enum CommandResult {
    Continue,
    Exit,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, String> {
        let Some(rest) = input.strip_prefix('/') else {
            return Err("Not a command".to_string());
        };

        let parts: Vec<&str> = rest.split_whitespace().collect();
        let Some((name, args)) = parts.split_first() else {
            return Err("Empty command".to_string());
        };

        match *name {
            "quit" | "exit" => Ok(Command::Quit),
            "help" => Ok(Command::Help),
            "document" | "doc" => Ok(Command::Document),
            "sections" => Ok(Command::Sections),
            "history" => Ok(Command::History),
            "load" => path_arg(args, "/load <file>").map(Command::Load),
            "save" => path_arg(args, "/save <file>").map(Command::Save),
            "model" => match args {
                [model] => Ok(Command::SetModel(model.to_string())),
                _ => Err("Usage: /model <name>".to_string()),
            },
            _ => Err(format!(
                "Unknown command: /{}. Type /help for available commands.",
                name
            )),
        }
    }

    pub fn execute(self, state: &mut AppState) -> CommandResult {
        match self {
            Command::Quit => {
                println!("Goodbye!");
                return CommandResult::Exit;
            }
            Command::Help => print_help(),
            Command::Document => {
                println!("{}", state.session.document());
            }
            Command::Sections => {
                if state.session.registry().is_empty() {
                    println!("No sections registered yet.");
                }
                for (name, id) in state.session.registry().iter() {
                    println!("  {:<8} {}", id, name);
                }
            }
            Command::History => {
                for message in state.session.transcript().iter() {
                    println!("[{}] {}", message.role, message.get_text());
                    println!();
                }
                println!("({} messages)", state.session.transcript().len());
            }
            Command::Load(path) => match fs::read_to_string(&path) {
                Ok(text) => {
                    let mut tx = state.session.begin();
                    tx.replace_document(text);
                    state.session.commit(tx);
                    println!("Document loaded from {}", path.display());
                }
                Err(e) => eprintln!("Failed to read {}: {}", path.display(), e),
            },
            Command::Save(path) => match fs::write(&path, state.session.document()) {
                Ok(()) => println!("Document saved to {}", path.display()),
                Err(e) => eprintln!("Failed to write {}: {}", path.display(), e),
            },
            Command::SetModel(name) => match state.provider.create_chat_model(&name) {
                Some(model) => {
                    state.orchestrator.set_model(model);
                    println!("Switched to {}", name);
                    println!("(Conversation history preserved)");
                }
                None => eprintln!("Failed to create model {}", name),
            },
        }
        println!();
        CommandResult::Continue
    }
}

fn path_arg(args: &[&str], usage: &str) -> Result<PathBuf, String> {
    if args.is_empty() {
        return Err(format!("Usage: {}", usage));
    }
    Ok(PathBuf::from(args.join(" ")))
}

fn print_help() {
    println!("Available commands:");
    println!("  /document              - Show the current document");
    println!("  /sections              - List registered sections and their ids");
    println!("  /history               - Show the conversation transcript");
    println!("  /load <file>           - Replace the document with a file's contents");
    println!("  /save <file>           - Write the document to a file");
    println!("  /model <name>          - Switch model, keeping the session");
    println!("  /quit, /exit           - Exit");
    println!("  /help                  - Show this help message");
    println!("  Ctrl+D                 - Exit");
    println!();
    println!("Name a section to edit it, e.g. change section 'Overview' to be shorter.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/quit"), Ok(Command::Quit));
        assert_eq!(Command::parse("/exit"), Ok(Command::Quit));
        assert_eq!(Command::parse("/doc"), Ok(Command::Document));
        assert_eq!(Command::parse("/sections"), Ok(Command::Sections));
        assert_eq!(Command::parse("/history"), Ok(Command::History));
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            Command::parse("/save my plan.md"),
            Ok(Command::Save(PathBuf::from("my plan.md")))
        );
        assert_eq!(
            Command::parse("/model gpt-4o-mini"),
            Ok(Command::SetModel("gpt-4o-mini".to_string()))
        );
        assert!(Command::parse("/load").is_err());
        assert!(Command::parse("/model a b").is_err());
    }

    #[test]
    fn test_parse_rejects_non_commands() {
        assert!(Command::parse("hello").is_err());
        assert!(Command::parse("/").is_err());
        assert!(Command::parse("/frobnicate").unwrap_err().contains("/frobnicate"));
    }
}
