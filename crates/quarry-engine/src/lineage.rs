//! Arena for the tree of results a pipeline produces.
//!
//! Results reference their parent by index, the document they live in,
//! and the element within it. Extracted data lives in its own arena so
//! siblings can share one attachment and the aggregator can dedup by
//! identity instead of by value.

use ego_tree::NodeId;
use scraper::{ElementRef, Html};
use serde_json::Value;

pub type ResultId = usize;
pub type DocId = usize;
pub type DataId = usize;

/// One node in the result tree.
#[derive(Debug)]
pub struct ResultNode {
    pub parent: Option<ResultId>,
    pub doc: DocId,
    pub node: NodeId,
    pub data: Option<DataId>,
    /// Url the owning document was loaded from, kept for resolving
    /// relative links found under this result.
    pub url: String,
}

#[derive(Default)]
pub struct Lineage {
    results: Vec<ResultNode>,
    docs: Vec<Html>,
    data: Vec<Value>,
}

impl Lineage {
    pub fn new() -> Lineage {
        Lineage::default()
    }

    pub fn add_document(&mut self, document: Html) -> DocId {
        self.docs.push(document);
        self.docs.len() - 1
    }

    /// Add a result rooted at a document's `<html>` element. A `parent`
    /// links a followed page back into the tree.
    pub fn add_root(&mut self, doc: DocId, url: &str, parent: Option<ResultId>) -> ResultId {
        let node = self.docs[doc].root_element().id();
        self.push(ResultNode {
            parent,
            doc,
            node,
            data: None,
            url: url.to_string(),
        })
    }

    /// Add a result for an element found under `parent`, in the same
    /// document.
    pub fn add_child(&mut self, parent: ResultId, node: NodeId) -> ResultId {
        let doc = self.results[parent].doc;
        let url = self.results[parent].url.clone();
        self.push(ResultNode {
            parent: Some(parent),
            doc,
            node,
            data: None,
            url,
        })
    }

    fn push(&mut self, node: ResultNode) -> ResultId {
        self.results.push(node);
        self.results.len() - 1
    }

    pub fn result(&self, id: ResultId) -> &ResultNode {
        &self.results[id]
    }

    /// The element this result points at, if it still is one.
    pub fn element(&self, id: ResultId) -> Option<ElementRef<'_>> {
        let node = &self.results[id];
        self.docs[node.doc]
            .tree
            .get(node.node)
            .and_then(ElementRef::wrap)
    }

    /// Serialized markup of the whole document a result belongs to,
    /// doctype included.
    pub fn document_markup(&self, id: ResultId) -> String {
        self.docs[self.results[id].doc].html()
    }

    /// Nearest data attachment, walking parent links upward.
    pub fn current_data_id(&self, id: ResultId) -> Option<DataId> {
        let mut cursor = id;
        loop {
            let node = &self.results[cursor];
            if let Some(data) = node.data {
                return Some(data);
            }
            cursor = node.parent?;
        }
    }

    /// Store a fresh value and point the result at it.
    pub fn attach(&mut self, id: ResultId, value: Value) -> DataId {
        self.data.push(value);
        let data_id = self.data.len() - 1;
        self.results[id].data = Some(data_id);
        data_id
    }

    /// Point the result at an already stored value.
    pub fn set_data(&mut self, id: ResultId, data: DataId) {
        self.results[id].data = Some(data);
    }

    pub fn data(&self, id: DataId) -> &Value {
        &self.data[id]
    }

    pub fn data_mut(&mut self, id: DataId) -> &mut Value {
        &mut self.data[id]
    }
}
