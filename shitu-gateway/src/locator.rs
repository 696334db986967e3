//! Find a fetchable image locator in an inbound message.

use std::sync::LazyLock;

use regex::Regex;
use shitu_core::MessageElement;

/// Permissive http(s) scan used on raw transport payloads.
static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s`'"<>]+"#).expect("valid url regex"));

/// OneBot-style inline image code: `[CQ:image,file=...,url=...]`.
static CQ_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[CQ:image,([^\]]*)\]").expect("valid cq regex"));

/// Characters that wrap URLs in transport markup.
const WRAPPING: &[char] = &['`', '\'', '"', '(', ')', '[', ']', '<', '>'];

/// Where in the message an image reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Image element with a direct locator
    Attachment,
    /// URL dug out of a raw payload or inline code
    Embedded,
    /// Image inside the replied-to message
    ReplyChain,
    /// Synthesized avatar locator for a user identity
    Avatar,
}

/// A resolved, fetchable image locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    url: String,
    origin: ImageOrigin,
}

impl ImageReference {
    pub fn new(url: impl Into<String>, origin: ImageOrigin) -> Self {
        Self {
            url: url.into(),
            origin,
        }
    }

    /// Avatar reference for `id` from a template containing `{id}`.
    pub fn avatar(template: &str, id: &str) -> Self {
        Self::new(template.replace("{id}", id), ImageOrigin::Avatar)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn origin(&self) -> ImageOrigin {
        self.origin
    }
}

/// Locate the image a message carries, if any.
///
/// Tries, first match wins: a direct image attachment, a URL embedded in a
/// raw payload, then the same two rules over the replied-to message.
pub fn locate(elements: &[MessageElement]) -> Option<ImageReference> {
    if let Some(url) = direct_attachment(elements) {
        return Some(ImageReference::new(url, ImageOrigin::Attachment));
    }
    if let Some(url) = embedded_link(elements) {
        return Some(ImageReference::new(url, ImageOrigin::Embedded));
    }

    elements.iter().find_map(|element| match element {
        MessageElement::Reply { elements } => direct_attachment(elements)
            .or_else(|| embedded_link(elements))
            .map(|url| ImageReference::new(url, ImageOrigin::ReplyChain)),
        _ => None,
    })
}

fn direct_attachment(elements: &[MessageElement]) -> Option<String> {
    elements.iter().find_map(|element| match element {
        MessageElement::Image { url: Some(url), .. } => {
            let url = url.trim();
            (!url.is_empty()).then(|| url.to_string())
        }
        _ => None,
    })
}

fn embedded_link(elements: &[MessageElement]) -> Option<String> {
    elements.iter().find_map(|element| match element {
        MessageElement::Image {
            file: Some(file), ..
        } => scan_url(file),
        MessageElement::Plain { text } => cq_image_url(text),
        _ => None,
    })
}

/// First http(s) URL in `payload`, stripped of wrapping punctuation.
pub fn scan_url(payload: &str) -> Option<String> {
    EMBEDDED_URL.find_iter(payload).find_map(|m| {
        let url = m.as_str().trim_matches(WRAPPING);
        (url.len() > "https://".len()).then(|| url.to_string())
    })
}

fn cq_image_url(text: &str) -> Option<String> {
    let caps = CQ_IMAGE.captures(text)?;
    let params = caps.get(1)?.as_str();

    let mut file_url = None;
    for param in params.split(',') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = unescape_cq(value);
        match key {
            "url" => {
                if let Some(url) = scan_url(&value) {
                    return Some(url);
                }
            }
            "file" if file_url.is_none() => file_url = scan_url(&value),
            _ => {}
        }
    }
    file_url
}

fn unescape_cq(value: &str) -> String {
    value
        .replace("&#44;", ",")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}
