use std::fmt::{self, Display, Formatter, Write};

use super::types::Message;

/// Commands whose final parameter is free text and is always written in
/// trailing form.
const FREE_TEXT_COMMANDS: &[&str] = &[
    "AWAY", "ERROR", "KICK", "NOTICE", "PING", "PONG", "PRIVMSG", "QUIT", "TOPIC", "USER",
];

/// The last argument needs the `:` marker if it would not survive as a
/// middle parameter.
fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

impl Display for Message {
    /// Serialize to the wire format without the line terminator.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        f.write_str(&self.command)?;

        let free_text = FREE_TEXT_COMMANDS.contains(&self.command.as_str());
        let last = self.params.len().saturating_sub(1);

        for (i, param) in self.params.iter().enumerate() {
            f.write_char(' ')?;
            if i == last && (free_text || needs_colon_prefix(param)) {
                f.write_char(':')?;
            }
            f.write_str(param)?;
        }

        Ok(())
    }
}
