//! Subcommand implementations and the context they share.

pub mod ask;
pub mod clear;
pub mod completion;
pub mod health;
pub mod history;
pub mod suggestions;

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context as _, Result};
use shared::config::ClientConfig;
use web::{ChatClient, ChatSession, ConversationStore};

use crate::id_store::FileIdStore;

/// Used when neither `--server` nor the configuration names an absolute URL.
pub const DEFAULT_SERVER: &str = "http://localhost:8000";

pub struct Context {
    pub config: ClientConfig,
    pub client: Rc<ChatClient>,
    pub ids: Rc<FileIdStore>,
}

impl Context {
    pub fn load(
        config_path: Option<&Path>,
        server: Option<&str>,
        id_file: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config =
            ClientConfig::load(config_path).context("failed to load client configuration")?;
        if let Some(server) = server {
            config = config.with_api_base_url(server);
        } else if !config.api_base_url.contains("://") {
            config = config.with_api_base_url(DEFAULT_SERVER);
        }
        config.validate().context("invalid client configuration")?;

        let ids = id_file.map_or_else(FileIdStore::default_location, FileIdStore::new);
        Ok(Self {
            client: Rc::new(ChatClient::from_config(&config)),
            ids: Rc::new(ids),
            config,
        })
    }

    pub fn session(&self) -> ChatSession<ChatClient, FileIdStore> {
        ChatSession::new(
            ConversationStore::detached(),
            self.client.clone(),
            self.ids.clone(),
            &self.config,
        )
    }
}
