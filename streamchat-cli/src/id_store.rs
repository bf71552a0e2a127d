//! Conversation identity persisted in a small file under the user's data
//! directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use tracing::{debug, warn};
use web::ConversationIdStore;

const FILE_NAME: &str = "conversation_id";

#[derive(Debug, Clone)]
pub struct FileIdStore {
    path: PathBuf,
}

impl FileIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/streamchat/conversation_id`, or the working directory when
    /// no home directory is known.
    pub fn default_location() -> Self {
        let path = BaseDirs::new()
            .map(|dirs| dirs.data_dir().join("streamchat").join(FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(".streamchat").join(FILE_NAME));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, conversation_id: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, conversation_id)
    }
}

impl ConversationIdStore for FileIdStore {
    fn get(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Some(raw.trim().to_string()).filter(|id| !id.is_empty()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read conversation identity");
                None
            }
        }
    }

    fn set(&self, conversation_id: &str) {
        match self.write(conversation_id) {
            Ok(()) => debug!(path = %self.path.display(), "stored conversation identity"),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to store conversation identity");
            }
        }
    }

    fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %err, "failed to remove conversation identity");
        }
    }
}
