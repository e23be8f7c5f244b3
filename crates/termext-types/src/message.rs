//! Terminal protocol messages

use std::fmt;

/// Command tag carried under the `command` key of every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Input,
    Resize,
    Close,
    Output,
    Disconnect,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Input => "input",
            Command::Resize => "resize",
            Command::Close => "close",
            Command::Output => "output",
            Command::Disconnect => "disconnect",
            Command::Error => "error",
        }
    }

    /// Parse a wire tag; unknown tags yield `None`
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "input" => Some(Command::Input),
            "resize" => Some(Command::Resize),
            "close" => Some(Command::Close),
            "output" => Some(Command::Output),
            "disconnect" => Some(Command::Disconnect),
            "error" => Some(Command::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded protocol message.
///
/// `Input`, `Resize` and `Close` travel from host to backend; `Output`,
/// `Disconnect` and `Error` travel from backend to host. `Error` is also what
/// decoding produces for any malformed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Input(String),
    Resize { rows: u32, columns: u32 },
    Close,
    Output(String),
    Disconnect,
    Error(String),
}

impl Message {
    pub fn command(&self) -> Command {
        match self {
            Message::Input(_) => Command::Input,
            Message::Resize { .. } => Command::Resize,
            Message::Close => Command::Close,
            Message::Output(_) => Command::Output,
            Message::Disconnect => Command::Disconnect,
            Message::Error(_) => Command::Error,
        }
    }
}
