use serde::{Deserialize, Serialize};

/// Recognition model family offered by the AnimeTrace service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSelector {
    /// `pre_stable`: anime characters
    Anime,
    /// `full_game_model_kira`: gal-game characters
    GalGame,
    /// `animetrace_high_beta`: general purpose
    General,
}

impl ModelSelector {
    /// Identifier sent to the recognition service as `model`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelector::Anime => "pre_stable",
            ModelSelector::GalGame => "full_game_model_kira",
            ModelSelector::General => "animetrace_high_beta",
        }
    }

    /// Human name of the model family, used in result headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelSelector::Anime => "动漫识别",
            ModelSelector::GalGame => "GalGame识别",
            ModelSelector::General => "通用识别",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ModelSelector::Anime => "🎌",
            ModelSelector::GalGame => "🎮",
            ModelSelector::General => "🔍",
        }
    }
}

impl std::fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pre_stable" | "anime" => Ok(ModelSelector::Anime),
            "full_game_model_kira" | "galgame" | "gal" => Ok(ModelSelector::GalGame),
            "animetrace_high_beta" | "general" => Ok(ModelSelector::General),
            _ => Err(format!("Unknown model: {}", s)),
        }
    }
}

/// Layout used when rendering recognition results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStyle {
    /// Emoji header, bold names, bracketed titles and a source footer
    #[default]
    Decorated,
    /// Bare text lines only
    Plain,
}

/// One typed element of an inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageElement {
    /// Image attachment. `url` is the direct locator when the transport has
    /// one; `file` is the raw transport payload, which may embed a URL.
    Image {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        file: Option<String>,
    },
    /// Explicit mention of another user.
    Mention { target: String },
    /// Plain text, possibly carrying transport-specific inline codes.
    Plain { text: String },
    /// The message this one replies to, as its own element chain.
    Reply { elements: Vec<MessageElement> },
}

impl MessageElement {
    pub fn image_url(url: impl Into<String>) -> Self {
        MessageElement::Image {
            url: Some(url.into()),
            file: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        MessageElement::Plain { text: text.into() }
    }

    pub fn mention(target: impl Into<String>) -> Self {
        MessageElement::Mention {
            target: target.into(),
        }
    }
}

/// Transport-neutral view of an incoming chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender_id: String,
    pub elements: Vec<MessageElement>,
}

impl InboundMessage {
    pub fn new(sender_id: impl Into<String>, elements: Vec<MessageElement>) -> Self {
        Self {
            sender_id: sender_id.into(),
            elements,
        }
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn elements(&self) -> &[MessageElement] {
        &self.elements
    }

    /// Concatenated text of the top-level plain elements.
    ///
    /// Replied-to content is excluded so a quoted command never re-triggers.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|element| match element {
                MessageElement::Plain { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}
