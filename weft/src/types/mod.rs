//! Telegram wire types: the `Update` envelope and the typed payloads the
//! core routes on.
//!
//! Deserialized with serde from the transport JSON. An `Update` carries
//! exactly one payload field; [`Update::kind`] reports which one. The
//! payload structs stay close to the upstream schema but carry only the
//! fields the runtime and the rules library read.

use serde::{Deserialize, Serialize};

/// Kind of an inbound update, matching the wire field names of `Update`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    CallbackQuery,
    InlineQuery,
    ChatJoinRequest,
    ChatMember,
    MyChatMember,
    PreCheckoutQuery,
}

impl UpdateType {
    /// Wire name, as used in `allowed_updates` and the `Update` JSON fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::ChannelPost => "channel_post",
            Self::EditedChannelPost => "edited_channel_post",
            Self::CallbackQuery => "callback_query",
            Self::InlineQuery => "inline_query",
            Self::ChatJoinRequest => "chat_join_request",
            Self::ChatMember => "chat_member",
            Self::MyChatMember => "my_chat_member",
            Self::PreCheckoutQuery => "pre_checkout_query",
        }
    }

    /// All kinds, in the fixed order views are tried by the dispatcher.
    pub fn all() -> &'static [UpdateType] {
        &[
            Self::Message,
            Self::EditedMessage,
            Self::ChannelPost,
            Self::EditedChannelPost,
            Self::CallbackQuery,
            Self::InlineQuery,
            Self::ChatJoinRequest,
            Self::ChatMember,
            Self::MyChatMember,
            Self::PreCheckoutQuery,
        ]
    }
}

impl std::str::FromStr for UpdateType {
    type Err = UnknownUpdateType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpdateType::all()
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownUpdateType(s.to_string()))
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an `allowed_updates` entry that names no known update kind.
#[derive(Debug, thiserror::Error)]
#[error("unknown update type {0:?}")]
pub struct UnknownUpdateType(pub String);

/// One inbound event envelope from the upstream service.
///
/// Exactly one of the payload fields is present; `update_id` increases
/// monotonically across a poll session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_channel_post: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<InlineQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_join_request: Option<ChatJoinRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_member: Option<ChatMemberUpdated>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_chat_member: Option<ChatMemberUpdated>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_checkout_query: Option<PreCheckoutQuery>,
}

impl Update {
    /// Which payload field is set; `None` for an update kind this build does
    /// not know (forward compatibility with new upstream kinds).
    pub fn kind(&self) -> Option<UpdateType> {
        if self.message.is_some() {
            Some(UpdateType::Message)
        } else if self.edited_message.is_some() {
            Some(UpdateType::EditedMessage)
        } else if self.channel_post.is_some() {
            Some(UpdateType::ChannelPost)
        } else if self.edited_channel_post.is_some() {
            Some(UpdateType::EditedChannelPost)
        } else if self.callback_query.is_some() {
            Some(UpdateType::CallbackQuery)
        } else if self.inline_query.is_some() {
            Some(UpdateType::InlineQuery)
        } else if self.chat_join_request.is_some() {
            Some(UpdateType::ChatJoinRequest)
        } else if self.chat_member.is_some() {
            Some(UpdateType::ChatMember)
        } else if self.my_chat_member.is_some() {
            Some(UpdateType::MyChatMember)
        } else if self.pre_checkout_query.is_some() {
            Some(UpdateType::PreCheckoutQuery)
        } else {
            None
        }
    }

    /// The message payload for any of the four message-like kinds.
    pub fn message_payload(&self) -> Option<&Message> {
        self.message
            .as_ref()
            .or(self.edited_message.as_ref())
            .or(self.channel_post.as_ref())
            .or(self.edited_channel_post.as_ref())
    }
}

/// A chat: private dialog, group, supergroup or channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub date: i64,
    pub chat: Chat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photo: Vec<PhotoSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: i64,
    pub height: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    pub query: String,
    pub offset: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatJoinRequest {
    pub chat: Chat,
    pub from: User,
    pub date: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub from: User,
    pub date: i64,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMember {
    pub status: ChatMemberStatus,
    pub user: User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub from: User,
    pub currency: String,
    pub total_amount: i64,
    pub invoice_payload: String,
}
