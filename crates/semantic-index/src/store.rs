use core_types::DocumentRecord;

/// Records kept in the same order as the vectors they describe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore {
    records: Vec<DocumentRecord>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) const fn from_records(records: Vec<DocumentRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Owned copy of the record at `position`.
    pub fn get(&self, position: usize) -> Option<DocumentRecord> {
        self.records.get(position).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub(crate) fn append(&mut self, records: Vec<DocumentRecord>) {
        self.records.extend(records);
    }

    pub(crate) fn clear(&mut self) {
        self.records = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_hands_out_independent_copies() {
        let mut store = DocumentStore::new();
        store.append(vec![DocumentRecord::new("a", "f1", "text")]);

        let mut copy = store.get(0).unwrap();
        copy.content.push_str(" changed");
        copy.extra.insert("score".into(), serde_json::json!(0.5));

        let stored = store.get(0).unwrap();
        assert_eq!(stored.content, "a");
        assert!(stored.extra.is_empty());
        assert!(store.get(1).is_none());
    }
}
