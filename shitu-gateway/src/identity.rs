//! Resolve whose avatar an avatar command targets.

use std::sync::LazyLock;

use regex::Regex;
use shitu_core::{InboundMessage, MessageElement};

/// Legacy inline mention code: `[CQ:at,qq=123456]`.
static CQ_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[CQ:at,qq=(\d+)\]").expect("valid cq at regex"));

/// How a target identity was written in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// Digits typed right after the command keyword
    Typed,
    /// Structured mention element
    Mention,
    /// Inline `[CQ:at,...]` code in plain text
    InlineCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub source: TargetSource,
}

/// Matches a 5-12 digit identity written directly after one of the keywords.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    typed_id: Regex,
}

impl IdentityResolver {
    pub fn new(keywords: &[&str]) -> Self {
        let alternatives = keywords
            .iter()
            .map(|keyword| regex::escape(keyword))
            .collect::<Vec<_>>()
            .join("|");
        let typed_id = Regex::new(&format!(r"(?:{alternatives})\s*([0-9]{{5,12}})(?:\D|$)"))
            .expect("escaped keywords form a valid regex");
        Self { typed_id }
    }

    /// Resolve the target identity of an avatar command.
    ///
    /// A typed identity wins over any mention in the same message. `None`
    /// means the caller should fall back to the sender.
    pub fn resolve(&self, message: &InboundMessage) -> Option<Target> {
        let text = message.plain_text();
        if let Some(caps) = self.typed_id.captures(&text) {
            return Some(Target {
                id: caps[1].to_string(),
                source: TargetSource::Typed,
            });
        }

        let mentioned = message.elements().iter().find_map(|element| match element {
            MessageElement::Mention { target } if !target.trim().is_empty() => {
                Some(target.trim().to_string())
            }
            _ => None,
        });
        if let Some(id) = mentioned {
            return Some(Target {
                id,
                source: TargetSource::Mention,
            });
        }

        CQ_AT.captures(&text).map(|caps| Target {
            id: caps[1].to_string(),
            source: TargetSource::InlineCode,
        })
    }
}
