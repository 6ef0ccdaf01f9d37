//! RFC 1459 case folding.
//!
//! Nicknames and channel names compare case-insensitively, and under
//! `rfc1459` the characters `[]\~` are the upper-case forms of `{}|^`.
//! Any map keyed by a name should key by [`irc_to_lower`].

/// Fold a single character.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        'A'..='Z' => c.to_ascii_lowercase(),
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c,
    }
}

/// Fold a whole name into its canonical key form.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Compare two names without allocating.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_ascii_and_brackets() {
        assert_eq!(irc_lower_char('Q'), 'q');
        assert_eq!(irc_lower_char('['), '{');
        assert_eq!(irc_lower_char('~'), '^');
        assert_eq!(irc_lower_char('#'), '#');
        assert_eq!(irc_to_lower("#Rust[Dev]"), "#rust{dev}");
    }

    #[test]
    fn equality_is_fold_aware() {
        assert!(irc_eq("#Test", "#test"));
        assert!(irc_eq("Nick\\Away", "nick|away"));
        assert!(!irc_eq("#test", "#tests"));
        assert!(!irc_eq("alice", "bob"));
    }
}
