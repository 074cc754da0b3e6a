// cardsession/src/plugin/registry.rs

use crate::config::PluginConfig;
use crate::reader::{ContactReader, ContactlessReader, Reader, SharedTransport};
use crate::types::SamSlot;
use crate::{Error, Result};

/// Readers of one plugin, looked up by name.
#[derive(Debug, Default, Clone)]
pub struct ReaderRegistry {
    readers: Vec<Reader>,
}

impl ReaderRegistry {
    /// Contactless reader first, then one contact reader per SAM slot, all
    /// on `transport`.
    pub fn build(config: &PluginConfig, transport: SharedTransport) -> Self {
        let mut readers: Vec<Reader> = vec![
            ContactlessReader::new(config.contactless_reader_name.clone(), transport.clone()).into(),
        ];
        for &slot in &config.sam_slots {
            readers.push(
                ContactReader::new(config.contact_reader_name(slot), slot, transport.clone()).into(),
            );
        }
        Self { readers }
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reader> {
        self.readers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.readers.iter().map(Reader::name).collect()
    }

    pub fn get(&self, name: &str) -> Result<&Reader> {
        self.readers
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| Error::ReaderNotFound(name.to_string()))
    }

    pub fn contactless(&self) -> Result<&Reader> {
        self.readers
            .iter()
            .find(|r| r.is_contactless())
            .ok_or_else(|| Error::ReaderNotFound("contactless".into()))
    }

    pub fn contact(&self, slot: SamSlot) -> Result<&Reader> {
        self.readers
            .iter()
            .find(|r| matches!(r, Reader::Contact(c) if c.slot() == slot))
            .ok_or_else(|| Error::ReaderNotFound(format!("contact slot {}", slot)))
    }
}
