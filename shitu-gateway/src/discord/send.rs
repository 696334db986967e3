use std::sync::Arc;

use serenity::http::Http;
use serenity::model::id::ChannelId;

use crate::transport::{ReplyChannel, SendError};

pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Replies into the Discord channel a message arrived on.
#[derive(Clone)]
pub struct ChannelReply {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelReply {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait::async_trait]
impl ReplyChannel for ChannelReply {
    async fn reply(&self, text: &str) -> Result<(), SendError> {
        for chunk in split_discord_message(text) {
            self.channel_id
                .say(self.http.as_ref(), chunk)
                .await
                .map_err(classify)?;
        }
        Ok(())
    }
}

fn classify(err: serenity::Error) -> SendError {
    match err {
        serenity::Error::Http(e) => SendError::Rejected(e.to_string()),
        other => SendError::Unavailable(other.to_string()),
    }
}

/// Split on line boundaries to fit the message limit, hard-splitting lines
/// that are too long on their own.
fn split_discord_message(content: &str) -> Vec<String> {
    if content.chars().count() <= DISCORD_MESSAGE_LIMIT {
        return vec![content.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in content.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > DISCORD_MESSAGE_LIMIT && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= DISCORD_MESSAGE_LIMIT {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        for ch in line.chars() {
            if current_len == DISCORD_MESSAGE_LIMIT {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += 1;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
