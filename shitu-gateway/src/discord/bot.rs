use std::sync::Arc;

use serenity::async_trait;
use serenity::model::channel::{Attachment, Message};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use shitu_core::{InboundMessage, MessageElement};
use tracing::{debug, info};

use crate::handler::{Dispatch, ShituHandler};
use crate::transport::ReplyChannel;

use super::send::ChannelReply;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Discord event handler
///
/// Converts each message into an [`InboundMessage`] and hands it to the
/// shared [`ShituHandler`] together with a reply handle for its channel.
pub struct Bot {
    handler: Arc<ShituHandler>,
}

impl Bot {
    pub fn new(handler: Arc<ShituHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore messages from bots (including ourselves)
        if msg.author.bot {
            return;
        }

        let inbound = to_inbound(&msg);
        let reply: Arc<dyn ReplyChannel> =
            Arc::new(ChannelReply::new(ctx.http.clone(), msg.channel_id));

        match self.handler.on_message(&inbound, reply).await {
            Dispatch::Ignored => {}
            dispatch => debug!("[user:{}] Dispatched: {:?}", inbound.sender_id(), dispatch),
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
    }
}

/// Map a Discord message onto the transport-neutral element chain.
fn to_inbound(msg: &Message) -> InboundMessage {
    let mut elements = message_elements(msg);
    if let Some(referenced) = msg.referenced_message.as_deref() {
        elements.push(MessageElement::Reply {
            elements: message_elements(referenced),
        });
    }
    InboundMessage::new(msg.author.id.to_string(), elements)
}

fn message_elements(msg: &Message) -> Vec<MessageElement> {
    let mut elements = Vec::new();

    if !msg.content.trim().is_empty() {
        elements.push(MessageElement::plain(msg.content.clone()));
    }
    elements.extend(
        msg.mentions
            .iter()
            .filter(|user| !user.bot)
            .map(|user| MessageElement::mention(user.id.to_string())),
    );
    elements.extend(
        msg.attachments
            .iter()
            .filter(|attachment| is_image_attachment(attachment))
            .map(|attachment| MessageElement::image_url(attachment.url.clone())),
    );

    elements
}

fn is_image_attachment(attachment: &Attachment) -> bool {
    if let Some(mime) = attachment.content_type.as_deref() {
        return mime.starts_with("image/");
    }
    is_image_filename(&attachment.filename)
}

fn is_image_filename(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
