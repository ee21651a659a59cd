//! Room directory: loads the room metadata once and caches it

use campus_core::{RoomDatabase, RoomRecord, RoomSummary};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::loader::LoadError;
use crate::source::AssetSource;

type RoomIndex = Arc<HashMap<String, RoomRecord>>;

pub struct RoomDirectory {
    source: Arc<dyn AssetSource>,
    path: String,
    cache: OnceCell<RoomIndex>,
}

impl RoomDirectory {
    pub fn new(source: Arc<dyn AssetSource>, path: impl Into<String>) -> Self {
        Self {
            source,
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    /// The room index; fetched on first use, retried after a failure
    pub async fn rooms(&self) -> Result<RoomIndex, LoadError> {
        self.cache
            .get_or_try_init(|| async {
                let location = self.source.locate(&self.path);
                let bytes = self
                    .source
                    .fetch(&self.path)
                    .await
                    .map_err(|e| LoadError::Fetch {
                        location: location.clone(),
                        source: e,
                    })?;
                let index = RoomDatabase::from_slice(&bytes)
                    .map_err(|e| LoadError::Parse {
                        location: location.clone(),
                        message: e.to_string(),
                    })?
                    .into_index();
                info!(location = %location, rooms = index.len(), "Loaded room directory");
                Ok(Arc::new(index))
            })
            .await
            .cloned()
    }

    pub async fn lookup(&self, id: &str) -> Result<Option<RoomRecord>, LoadError> {
        Ok(self.rooms().await?.get(id).cloned())
    }

    /// Popup content for a pin; a failed load yields the no-record summary
    pub async fn summary(&self, pin_id: &str, label: &str) -> RoomSummary {
        match self.lookup(pin_id).await {
            Ok(record) => RoomSummary::new(pin_id, label, record.as_ref()),
            Err(e) => {
                error!(pin = %pin_id, error = %e, "Room directory unavailable");
                RoomSummary::new(pin_id, label, None)
            }
        }
    }
}
