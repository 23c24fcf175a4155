//! The text-field command surface.

/// Printed for any input that is not a known command.
pub const FALLBACK_TEXT: &str = "HAHAHAH!";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Destroy,
    Init,
    Explode,
    Clear,
    Queue,
    Galaxy,
    Ring,
    /// The scripted MissingNo countdown.
    MissingNo,
    Print(String),
}

impl Command {
    /// Match trimmed, case-insensitive input. Unknown input prints
    /// [`FALLBACK_TEXT`].
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "#destroy" => Command::Destroy,
            "#init" => Command::Init,
            "#explode" => Command::Explode,
            "#clear" => Command::Clear,
            "#queue" => Command::Queue,
            "#galaxy" => Command::Galaxy,
            "#ring" => Command::Ring,
            "missingno" => Command::MissingNo,
            _ => Command::Print(FALLBACK_TEXT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_trimmed_and_case_insensitive() {
        assert_eq!(Command::parse("  #GALAXY "), Command::Galaxy);
        assert_eq!(Command::parse("MissingNo"), Command::MissingNo);
        assert_eq!(Command::parse("#destroy"), Command::Destroy);
    }

    #[test]
    fn anything_else_prints_the_fallback() {
        assert_eq!(Command::parse("hello"), Command::Print(FALLBACK_TEXT.into()));
        assert_eq!(Command::parse(""), Command::Print(FALLBACK_TEXT.into()));
        assert_eq!(Command::parse("#galaxy!"), Command::Print(FALLBACK_TEXT.into()));
    }
}
