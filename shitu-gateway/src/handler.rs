//! Per-event orchestration.
//!
//! Every inbound message goes through [`ShituHandler::on_message`], which
//! runs at most one of: structured command, bare-text avatar command,
//! waiting-session consumption.

use std::sync::Arc;
use std::time::Duration;

use shitu_core::{DisplayStyle, InboundMessage, ModelSelector, Settings};
use tracing::info;

use crate::commands::{AVATAR_KEYWORDS, Command, CommandKind, CommandMatcher};
use crate::identity::{IdentityResolver, TargetSource};
use crate::locator::{self, ImageReference};
use crate::messages;
use crate::recognition::Recognizer;
use crate::render::render;
use crate::transport::{ReplyChannel, reply_logged};
use crate::waiting::WaitingRegistry;

/// What [`ShituHandler::on_message`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A prefixed command was handled
    Command(Command),
    /// An avatar keyword in plain text was handled
    BareAvatar(Command),
    /// The message fulfilled the sender's waiting session
    SessionConsumed(ModelSelector),
    /// Nothing to do; ordinary chat traffic
    Ignored,
}

pub struct ShituHandler {
    recognizer: Recognizer,
    registry: WaitingRegistry,
    commands: CommandMatcher,
    identities: IdentityResolver,
    session_timeout: Duration,
    avatar_template: String,
    style: DisplayStyle,
}

impl ShituHandler {
    pub fn new(recognizer: Recognizer, registry: WaitingRegistry, settings: &Settings) -> Self {
        Self {
            recognizer,
            registry,
            commands: CommandMatcher::new(&settings.commands.prefixes),
            identities: IdentityResolver::new(AVATAR_KEYWORDS),
            session_timeout: settings.session.timeout(),
            avatar_template: settings.avatar.url_template.clone(),
            style: settings.render.style,
        }
    }

    pub fn registry(&self) -> &WaitingRegistry {
        &self.registry
    }

    pub async fn on_message(
        &self,
        message: &InboundMessage,
        reply: Arc<dyn ReplyChannel>,
    ) -> Dispatch {
        let text = message.plain_text();

        if let Some(command) = self.commands.parse(&text) {
            info!(
                "[user:{}] Command {} ({})",
                message.sender_id(),
                command.keyword,
                command.model
            );
            self.run_command(command, message, reply).await;
            return Dispatch::Command(command);
        }

        if let Some(command) = self.commands.match_bare_avatar(&text) {
            info!(
                "[user:{}] Avatar command in plain text: {}",
                message.sender_id(),
                command.keyword
            );
            self.handle_avatar_command(message, command.model, &reply).await;
            return Dispatch::BareAvatar(command);
        }

        let Some(image) = locator::locate(message.elements()) else {
            return Dispatch::Ignored;
        };
        match self.registry.try_consume(message.sender_id(), Some(&image)) {
            Some(session) => {
                self.process(&session.user_id, &image, session.model, &session.reply)
                    .await;
                Dispatch::SessionConsumed(session.model)
            }
            None => Dispatch::Ignored,
        }
    }

    async fn run_command(
        &self,
        command: Command,
        message: &InboundMessage,
        reply: Arc<dyn ReplyChannel>,
    ) {
        match command.kind {
            CommandKind::Image => self.handle_image_command(message, command.model, reply).await,
            CommandKind::Avatar => {
                self.handle_avatar_command(message, command.model, &reply)
                    .await
            }
        }
    }

    /// Recognize the image carried by the message, or wait for one.
    pub async fn handle_image_command(
        &self,
        message: &InboundMessage,
        model: ModelSelector,
        reply: Arc<dyn ReplyChannel>,
    ) {
        match locator::locate(message.elements()) {
            Some(image) => {
                // The command's own image wins over any open session.
                self.registry.cancel(message.sender_id());
                self.process(message.sender_id(), &image, model, &reply)
                    .await
            }
            None => {
                self.registry
                    .open(message.sender_id(), model, reply, self.session_timeout)
                    .await
            }
        }
    }

    /// Recognize the avatar of the targeted user, or of the sender.
    pub async fn handle_avatar_command(
        &self,
        message: &InboundMessage,
        model: ModelSelector,
        reply: &Arc<dyn ReplyChannel>,
    ) {
        let id = match self.identities.resolve(message) {
            Some(target) => {
                info!(
                    "[user:{}] Avatar target {} ({:?})",
                    message.sender_id(),
                    target.id,
                    target.source
                );
                if target.source == TargetSource::Typed {
                    reply_logged(reply, &messages::avatar::typed_identity(&target.id)).await;
                }
                target.id
            }
            None => {
                info!(
                    "[user:{}] No avatar target, using sender",
                    message.sender_id()
                );
                reply_logged(reply, messages::avatar::OWN_AVATAR).await;
                message.sender_id().to_string()
            }
        };

        let image = ImageReference::avatar(&self.avatar_template, &id);
        self.process(message.sender_id(), &image, model, reply)
            .await;
    }

    async fn process(
        &self,
        user_id: &str,
        image: &ImageReference,
        model: ModelSelector,
        reply: &Arc<dyn ReplyChannel>,
    ) {
        info!(
            "[user:{}] Recognizing {:?} image with {}",
            user_id,
            image.origin(),
            model.display_name()
        );
        let outcome = self.recognizer.recognize(image, model).await;
        reply_logged(reply, &render(&outcome, model, self.style)).await;
    }
}
