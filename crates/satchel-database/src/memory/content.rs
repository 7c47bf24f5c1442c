use std::collections::HashSet;

use async_trait::async_trait;

use satchel_core::result::AppResult;
use satchel_core::types::{ChannelId, ContentNodeId};
use satchel_entity::content::{ContentNode, LocalFile, NodeMetadata};

use super::MemoryDatabase;
use crate::store::ContentStore;

#[async_trait]
impl ContentStore for MemoryDatabase {
    async fn get_node(&self, id: ContentNodeId) -> AppResult<Option<ContentNode>> {
        Ok(self.state.read().await.nodes.get(&id).cloned())
    }

    async fn get_nodes(&self, ids: &[ContentNodeId]) -> AppResult<Vec<ContentNode>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.nodes.get(id).cloned())
            .collect())
    }

    async fn files_for_import(&self, id: ContentNodeId) -> AppResult<Vec<LocalFile>> {
        let state = self.state.read().await;
        Ok(state.import_files(id).into_iter().cloned().collect())
    }

    async fn mark_files_available(&self, checksums: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        for checksum in checksums {
            if let Some(file) = state.local_files.get_mut(checksum) {
                file.available = true;
            }
        }
        Ok(())
    }

    async fn mark_node_available(&self, id: ContentNodeId) -> AppResult<()> {
        if let Some(node) = self.state.write().await.nodes.get_mut(&id) {
            node.available = true;
        }
        Ok(())
    }

    async fn delete_content(
        &self,
        channel_id: ChannelId,
        node_ids: &[ContentNodeId],
    ) -> AppResult<Vec<LocalFile>> {
        let mut state = self.state.write().await;

        let mut touched = HashSet::new();
        for id in node_ids {
            if let Some(node) = state.nodes.get_mut(id) {
                if node.channel_id == channel_id {
                    node.available = false;
                    touched.insert(*id);
                }
            }
        }

        let candidates: HashSet<String> = state
            .files
            .iter()
            .filter(|f| touched.contains(&f.contentnode_id))
            .map(|f| f.local_file_id.clone())
            .collect();

        let still_used: HashSet<String> = state
            .files
            .iter()
            .filter(|f| candidates.contains(&f.local_file_id))
            .filter(|f| {
                state
                    .nodes
                    .get(&f.contentnode_id)
                    .is_some_and(|n| n.available)
            })
            .map(|f| f.local_file_id.clone())
            .collect();

        let mut orphaned = Vec::new();
        for checksum in candidates.difference(&still_used) {
            if let Some(file) = state.local_files.get_mut(checksum) {
                if file.available {
                    file.available = false;
                    orphaned.push(file.clone());
                }
            }
        }
        orphaned.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orphaned)
    }

    async fn import_metadata(&self, doc: &NodeMetadata) -> AppResult<usize> {
        let mut state = self.state.write().await;

        for channel in &doc.channels {
            state.channels.insert(channel.id, channel.clone());
        }

        let mut inserted = 0;
        for node in &doc.nodes {
            if !state.nodes.contains_key(&node.id) {
                let mut node = node.clone();
                node.available = false;
                node.admin_imported = false;
                state.nodes.insert(node.id, node);
                inserted += 1;
            }
        }

        for file in &doc.local_files {
            state
                .local_files
                .entry(file.id.clone())
                .and_modify(|existing| {
                    if existing.file_size.is_none() {
                        existing.file_size = file.file_size;
                    }
                })
                .or_insert_with(|| LocalFile {
                    available: false,
                    ..file.clone()
                });
        }

        for link in &doc.files {
            if !state.files.iter().any(|f| f.id == link.id) {
                state.files.push(link.clone());
            }
        }

        Ok(inserted)
    }
}
