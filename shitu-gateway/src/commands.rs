//! Recognition command table and text matching.

use shitu_core::ModelSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Recognize an image in (or after) the message
    Image,
    /// Recognize a user's avatar
    Avatar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub model: ModelSelector,
    /// The keyword that matched, as written in the table
    pub keyword: &'static str,
}

const fn image(keyword: &'static str, model: ModelSelector) -> Command {
    Command {
        kind: CommandKind::Image,
        model,
        keyword,
    }
}

const fn avatar(keyword: &'static str, model: ModelSelector) -> Command {
    Command {
        kind: CommandKind::Avatar,
        model,
        keyword,
    }
}

pub const COMMANDS: &[Command] = &[
    image("动漫识别", ModelSelector::Anime),
    image("动漫图片识别", ModelSelector::Anime),
    image("gal识别", ModelSelector::GalGame),
    image("GalGame图片识别", ModelSelector::GalGame),
    image("通用识别", ModelSelector::General),
    image("动漫/Gal/二游图片识别", ModelSelector::General),
    avatar("头像动漫识别", ModelSelector::Anime),
    avatar("头像gal识别", ModelSelector::GalGame),
    avatar("头像识别", ModelSelector::General),
];

/// Avatar keywords, most specific first.
pub const AVATAR_KEYWORDS: &[&str] = &["头像动漫识别", "头像gal识别", "头像识别"];

/// Matches message text against [`COMMANDS`].
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    prefixes: Vec<String>,
    commands: Vec<Command>,
}

impl CommandMatcher {
    pub fn new(prefixes: &[String]) -> Self {
        let mut prefixes = prefixes.to_vec();
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));

        let mut commands = COMMANDS.to_vec();
        commands.sort_by_key(|c| std::cmp::Reverse(c.keyword.len()));

        Self { prefixes, commands }
    }

    /// Parse a structured command: wake prefix, then a keyword.
    ///
    /// The keyword must end the text or be followed by whitespace. Avatar
    /// keywords may also be followed directly by digits or an inline code.
    pub fn parse(&self, text: &str) -> Option<Command> {
        let text = text.trim_start();
        let rest = self
            .prefixes
            .iter()
            .find_map(|prefix| text.strip_prefix(prefix.as_str()))?
            .trim_start();

        self.commands.iter().copied().find(|command| {
            let Some(after) = rest.strip_prefix(command.keyword) else {
                return false;
            };
            match after.chars().next() {
                None => true,
                Some(c) if c.is_whitespace() => true,
                Some(c) => {
                    command.kind == CommandKind::Avatar && (c.is_ascii_digit() || c == '[')
                }
            }
        })
    }

    /// Find an avatar keyword anywhere in unprefixed text.
    pub fn match_bare_avatar(&self, text: &str) -> Option<Command> {
        AVATAR_KEYWORDS
            .iter()
            .find(|keyword| text.contains(*keyword))
            .and_then(|keyword| {
                COMMANDS
                    .iter()
                    .copied()
                    .find(|command| command.keyword == *keyword)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> CommandMatcher {
        CommandMatcher::new(&["/".to_string()])
    }

    #[test]
    fn parses_image_commands_and_aliases() {
        let m = matcher();
        assert_eq!(m.parse("/动漫识别").unwrap().model, ModelSelector::Anime);
        assert_eq!(m.parse("/动漫图片识别").unwrap().model, ModelSelector::Anime);
        assert_eq!(m.parse("/gal识别 ").unwrap().model, ModelSelector::GalGame);
        assert_eq!(
            m.parse("  /GalGame图片识别").unwrap().model,
            ModelSelector::GalGame
        );
        assert_eq!(m.parse("/通用识别").unwrap().kind, CommandKind::Image);
    }

    #[test]
    fn mixed_alias_selects_general_model() {
        let command = matcher().parse("/动漫/Gal/二游图片识别").unwrap();
        assert_eq!(command.kind, CommandKind::Image);
        assert_eq!(command.model, ModelSelector::General);
        assert_eq!(command.keyword, "动漫/Gal/二游图片识别");
    }

    #[test]
    fn avatar_keywords_win_over_shorter_overlaps() {
        let command = matcher().parse("/头像动漫识别 123456").unwrap();
        assert_eq!(command.kind, CommandKind::Avatar);
        assert_eq!(command.model, ModelSelector::Anime);

        let command = matcher().parse("/头像识别123456").unwrap();
        assert_eq!(command.keyword, "头像识别");
        assert_eq!(command.model, ModelSelector::General);
    }

    #[test]
    fn requires_prefix_and_boundary() {
        let m = matcher();
        assert!(m.parse("动漫识别").is_none());
        assert!(m.parse("/动漫识别器").is_none());
        assert!(m.parse("/hello").is_none());
        assert!(m.parse("").is_none());
    }

    #[test]
    fn multiple_prefixes() {
        let m = CommandMatcher::new(&["/".to_string(), "!!".to_string()]);
        assert!(m.parse("!!通用识别").is_some());
        assert!(m.parse("/通用识别").is_some());
    }

    #[test]
    fn bare_avatar_anywhere_in_text() {
        let m = matcher();
        let command = m.match_bare_avatar("帮我 头像gal识别 一下").unwrap();
        assert_eq!(command.model, ModelSelector::GalGame);
        assert_eq!(m.match_bare_avatar("头像识别").unwrap().model, ModelSelector::General);
        assert!(m.match_bare_avatar("动漫识别").is_none());
    }
}
