//! Meta commands understood by the prompt, distinct from query lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Schema,
    Count,
    Exit,
}

pub fn parse_meta_command(line: &str) -> Option<MetaCommand> {
    match line.trim() {
        ".help" | ".h" => Some(MetaCommand::Help),
        ".schema" => Some(MetaCommand::Schema),
        ".count" => Some(MetaCommand::Count),
        ".exit" | ".quit" | ".q" => Some(MetaCommand::Exit),
        _ => None,
    }
}
