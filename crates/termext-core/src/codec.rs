//! Message codec
//!
//! Maps [`Message`] to and from the key-value [`Payload`] a channel carries.
//! Decoding never fails: anything malformed becomes [`Message::Error`].

use termext_types::{Command, Message, Payload};

pub const COMMAND_KEY: &str = "command";
pub const VALUE_KEY: &str = "value";
pub const ROWS_KEY: &str = "rows";
pub const COLUMNS_KEY: &str = "columns";

pub const NO_COMMAND: &str = "no command value available";
pub const NO_OUTPUT_VALUE: &str = "no value key for output command";
pub const NO_INPUT_VALUE: &str = "no value key for input command";
pub const INVALID_RESIZE: &str = "invalid size for resize command";

/// Encode a message into a transport payload
pub fn encode(message: &Message) -> Payload {
    let payload = Payload::new().with(COMMAND_KEY, message.command().as_str());

    match message {
        Message::Input(text) | Message::Output(text) | Message::Error(text) => {
            payload.with(VALUE_KEY, text.as_str())
        }
        Message::Resize { rows, columns } => payload
            .with(ROWS_KEY, *rows)
            .with(COLUMNS_KEY, *columns),
        Message::Close | Message::Disconnect => payload,
    }
}

/// Decode a transport payload into a message
pub fn decode(payload: &Payload) -> Message {
    let Some(tag) = payload.get_str(COMMAND_KEY) else {
        return Message::Error(NO_COMMAND.to_string());
    };

    let Some(command) = Command::parse(tag) else {
        return Message::Error(String::new());
    };

    match command {
        Command::Output => match payload.get_str(VALUE_KEY) {
            Some(text) => Message::Output(text.to_string()),
            None => Message::Error(NO_OUTPUT_VALUE.to_string()),
        },
        Command::Input => match payload.get_str(VALUE_KEY) {
            Some(text) => Message::Input(text.to_string()),
            None => Message::Error(NO_INPUT_VALUE.to_string()),
        },
        Command::Resize => {
            match (payload.get_u32(ROWS_KEY), payload.get_u32(COLUMNS_KEY)) {
                (Some(rows), Some(columns)) => Message::Resize { rows, columns },
                _ => Message::Error(INVALID_RESIZE.to_string()),
            }
        }
        Command::Close => Message::Close,
        Command::Disconnect => Message::Disconnect,
        Command::Error => Message::Error(payload.get_str(VALUE_KEY).unwrap_or_default().to_string()),
    }
}
