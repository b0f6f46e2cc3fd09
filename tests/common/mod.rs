//! Shared test utilities
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herald_gateway::ai::{AiFallback, CompletionProvider, ProviderRegistry};
use herald_gateway::channels::{Button, Delivery, PhotoSource, Transport};
use herald_gateway::config::DispatchConfig;
use herald_gateway::db::{self, ChatMessage, Repositories};
use herald_gateway::dispatch::update::Update;
use herald_gateway::{DbPool, Dispatcher, Error, Result};

/// File id handed back for every uploaded photo
pub const UPLOADED_FILE_ID: &str = "AgACAgIAAx-uploaded";

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Repositories over a fresh in-memory database
#[must_use]
pub fn setup_repos() -> Repositories {
    Repositories::new(&setup_test_db())
}

/// One outbound call seen by the recording transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        buttons: Vec<Button>,
        reply_to: Option<i64>,
    },
    Photo {
        chat_id: i64,
        photo: PhotoSource,
        caption: Option<String>,
        reply_to: Option<i64>,
    },
}

impl Sent {
    pub const fn chat_id(&self) -> i64 {
        match self {
            Self::Text { chat_id, .. } | Self::Photo { chat_id, .. } => *chat_id,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Photo { caption, .. } => caption.as_deref(),
        }
    }
}

/// Transport fake that records every call
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    callbacks: Mutex<Vec<(String, Option<String>)>>,
    uploads: AtomicUsize,
    fail_uploads: bool,
    failing_chats: HashSet<i64>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Transport whose photo uploads are all rejected
    pub fn rejecting_uploads() -> Arc<Self> {
        Arc::new(Self {
            fail_uploads: true,
            ..Self::default()
        })
    }

    /// Transport that fails every send to `chats`
    pub fn failing_for(chats: &[i64]) -> Arc<Self> {
        Arc::new(Self {
            failing_chats: chats.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn callbacks(&self) -> Vec<(String, Option<String>)> {
        self.callbacks.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn check_chat(&self, chat_id: i64) -> Result<()> {
        if self.failing_chats.contains(&chat_id) {
            return Err(Error::Channel(format!("Forbidden: bot was blocked by {chat_id}")));
        }
        Ok(())
    }

    fn next_message_id(&self) -> i64 {
        i64::try_from(self.sent.lock().unwrap().len()).unwrap() + 1
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        self.check_chat(chat_id)?;
        let message_id = self.next_message_id();
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
            buttons: buttons.to_vec(),
            reply_to,
        });
        Ok(Delivery {
            message_id: Some(message_id),
            photo_file_id: None,
        })
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &PhotoSource,
        caption: Option<&str>,
        _buttons: &[Button],
        reply_to: Option<i64>,
    ) -> Result<Delivery> {
        self.check_chat(chat_id)?;
        let file_id = match photo {
            PhotoSource::Upload { .. } => {
                if self.fail_uploads {
                    return Err(Error::Channel("Bad Request: IMAGE_PROCESS_FAILED".to_string()));
                }
                self.uploads.fetch_add(1, Ordering::SeqCst);
                UPLOADED_FILE_ID.to_string()
            }
            PhotoSource::Reference(reference) => reference.clone(),
        };

        let message_id = self.next_message_id();
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            photo: photo.clone(),
            caption: caption.map(str::to_string),
            reply_to,
        });
        Ok(Delivery {
            message_id: Some(message_id),
            photo_file_id: Some(file_id),
        })
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.callbacks
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

/// Completion provider fake that replays scripted answers
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<(String, usize)>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Prompts received with the number of history turns sent alongside
    pub fn prompts(&self) -> Vec<(String, usize)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), history.len()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Ai("no scripted reply left".to_string())))
    }
}

/// Dispatcher over `repos` with an optional AI provider
pub fn dispatcher(
    repos: &Repositories,
    transport: Arc<RecordingTransport>,
    provider: Option<Arc<ScriptedProvider>>,
) -> Dispatcher {
    let ai = provider.map(|p| {
        let providers: Vec<Arc<dyn CompletionProvider>> = vec![p];
        AiFallback::new(ProviderRegistry::with_preference(providers, None))
    });
    Dispatcher::new(repos.clone(), transport, ai, DispatchConfig::default())
}

/// Parse an update from JSON
pub fn update(json: &str) -> Update {
    serde_json::from_str(json).expect("invalid test update")
}

/// Private text message from `user_id`
pub fn private_text(update_id: i64, user_id: i64, text: &str) -> Update {
    update(&format!(
        r#"{{"update_id":{update_id},"message":{{"message_id":{update_id},"date":0,
            "from":{{"id":{user_id},"is_bot":false,"first_name":"Ana","username":"ana"}},
            "chat":{{"id":{user_id},"type":"private","first_name":"Ana"}},
            "text":{}}}}}"#,
        serde_json::to_string(text).unwrap()
    ))
}

/// Group text message from `user_id` in `chat_id`
pub fn group_text(update_id: i64, chat_id: i64, user_id: i64, text: &str) -> Update {
    update(&format!(
        r#"{{"update_id":{update_id},"message":{{"message_id":{update_id},"date":0,
            "from":{{"id":{user_id},"is_bot":false,"first_name":"Bo"}},
            "chat":{{"id":{chat_id},"type":"supergroup","title":"Deals"}},
            "text":{}}}}}"#,
        serde_json::to_string(text).unwrap()
    ))
}

/// Inline button press by `user_id` on a message in `chat_id`
pub fn callback(update_id: i64, chat_id: i64, chat_type: &str, user_id: i64, data: &str) -> Update {
    update(&format!(
        r#"{{"update_id":{update_id},"callback_query":{{"id":"cb-{update_id}",
            "from":{{"id":{user_id},"is_bot":false,"first_name":"Ana"}},
            "message":{{"message_id":1,"date":0,"chat":{{"id":{chat_id},"type":"{chat_type}","title":"Deals"}}}},
            "chat_instance":"x","data":{}}}}}"#,
        serde_json::to_string(data).unwrap()
    ))
}
