//! End-to-end traversal scenarios from spec §8's boundary-scenario list,
//! driven against synthetic in-memory packages rather than fixture files.

use crate::engine::Engine;
use crate::engine::ListCounters;
use crate::engine::test_support::{Record, build_store, record};
use crate::engine::text;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::protos::{tsp, tswp};
use crate::visitor::{DocumentType, InlineElement, PageSettings, Visitor};

/// Records every event call as a short tag so a test can assert on the
/// exact sequence without implementing a full visitor per scenario.
#[derive(Default)]
struct RecordingVisitor(Vec<String>);

impl Visitor for RecordingVisitor {
    async fn document_begin(&mut self, document_type: DocumentType, _page_settings: PageSettings) -> Result<()> {
        self.0.push(format!("document-begin:{document_type:?}"));
        Ok(())
    }
    async fn document_end(&mut self) -> Result<()> {
        self.0.push("document-end".into());
        Ok(())
    }
    async fn list_begin(&mut self) -> Result<()> {
        self.0.push("list-begin".into());
        Ok(())
    }
    async fn list_end(&mut self) -> Result<()> {
        self.0.push("list-end".into());
        Ok(())
    }
    async fn list_item_begin(&mut self, number: u32) -> Result<()> {
        self.0.push(format!("list-item-begin:{number}"));
        Ok(())
    }
    async fn list_item_end(&mut self) -> Result<()> {
        self.0.push("list-item-end".into());
        Ok(())
    }
    async fn paragraph_begin(&mut self, _style: &crate::style::ParagraphStyle) -> Result<()> {
        self.0.push("paragraph-begin".into());
        Ok(())
    }
    async fn paragraph_end(&mut self) -> Result<()> {
        self.0.push("paragraph-end".into());
        Ok(())
    }
    async fn inline_element(&mut self, element: InlineElement) -> Result<()> {
        match element {
            InlineElement::Text(run) => self.0.push(format!("text:{}:{:?}", run.text, run.hyperlink)),
            InlineElement::FootnoteMarker => self.0.push("footnote-marker".into()),
            _ => self.0.push("inline-other".into()),
        }
        Ok(())
    }
}

fn storage_record(id: u64, archive: tswp::StorageArchive) -> Record {
    record(id, crate::registry::type_code::STORAGE_ARCHIVE, &archive)
}

#[tokio::test]
async fn empty_paragraph_emits_no_inline_events() {
    // Spec §8 scenario 1: a storage with one empty paragraph-style entry
    // and zero text characters emits exactly one paragraph-begin/end pair
    // and no inline events.
    let storage = tswp::StorageArchive {
        text: Some(String::new()),
        paragraph_styles: vec![tswp::AttrTableEntry { start_index: 0, length: None, object: None }],
        ..Default::default()
    };
    let store = build_store(vec![storage_record(1, storage)]);
    let metadata = Metadata::default();
    let dir = tempfile::tempdir().unwrap();
    let storage_impl = crate::package::DirectoryPackage::open(dir.path()).unwrap();
    let engine = Engine::new(&store, &metadata, &storage_impl);

    let mut visitor = RecordingVisitor::default();
    text::traverse_storage(&engine, &mut visitor, 1, &mut ListCounters::new()).await.unwrap();

    assert_eq!(visitor.0, vec!["paragraph-begin", "paragraph-end"]);
}

#[tokio::test]
async fn hyperlink_overlaps_the_run_it_falls_within() {
    // Spec §8 scenario 2: text = "click here", one character-style entry
    // at index 0, one smart-field hyperlink at character 5 -> a single
    // text event carries the hyperlink.
    let storage = tswp::StorageArchive {
        text: Some("click here".to_string()),
        paragraph_styles: vec![tswp::AttrTableEntry { start_index: 0, length: None, object: None }],
        character_styles: vec![tswp::AttrTableEntry { start_index: 0, length: None, object: None }],
        smart_fields: vec![tswp::SmartFieldEntry { character_index: 5, kind: Some(0), url: Some("https://x/".to_string()) }],
        ..Default::default()
    };
    let store = build_store(vec![storage_record(1, storage)]);
    let metadata = Metadata::default();
    let dir = tempfile::tempdir().unwrap();
    let storage_impl = crate::package::DirectoryPackage::open(dir.path()).unwrap();
    let engine = Engine::new(&store, &metadata, &storage_impl);

    let mut visitor = RecordingVisitor::default();
    text::traverse_storage(&engine, &mut visitor, 1, &mut ListCounters::new()).await.unwrap();

    assert_eq!(
        visitor.0,
        vec!["paragraph-begin", "text:click here:Some(\"https://x/\")", "paragraph-end"]
    );
}

#[tokio::test]
async fn list_counters_reset_across_a_non_list_paragraph() {
    // Spec §8 scenario 6: two numbered-list paragraphs at level 0,
    // followed by one non-list paragraph, followed by two more numbered-
    // list paragraphs at level 0 -> item numbers 1, 2, (non-list), 1, 2.
    let list_style = tswp::ListStyleArchive {
        levels: vec![tswp::ListLevelFormat { level: 0, label_kind: Some(2), ..Default::default() }],
        ..Default::default()
    };
    let list_paragraph = tswp::ParagraphStyleArchive {
        list_style: Some(tsp::Reference { identifier: 100, type_hint: None }),
        list_level: Some(0),
        ..Default::default()
    };
    let plain_paragraph = tswp::ParagraphStyleArchive::default();

    let storage = tswp::StorageArchive {
        text: Some("aaaaa".to_string()),
        paragraph_styles: vec![
            tswp::AttrTableEntry { start_index: 0, length: None, object: Some(tsp::Reference { identifier: 101, type_hint: None }) },
            tswp::AttrTableEntry { start_index: 1, length: None, object: Some(tsp::Reference { identifier: 101, type_hint: None }) },
            tswp::AttrTableEntry { start_index: 2, length: None, object: Some(tsp::Reference { identifier: 102, type_hint: None }) },
            tswp::AttrTableEntry { start_index: 3, length: None, object: Some(tsp::Reference { identifier: 101, type_hint: None }) },
            tswp::AttrTableEntry { start_index: 4, length: None, object: Some(tsp::Reference { identifier: 101, type_hint: None }) },
        ],
        ..Default::default()
    };

    let store = build_store(vec![
        record(100, crate::registry::type_code::LIST_STYLE, &list_style),
        record(101, crate::registry::type_code::PARAGRAPH_STYLE, &list_paragraph),
        record(102, crate::registry::type_code::PARAGRAPH_STYLE, &plain_paragraph),
        storage_record(1, storage),
    ]);
    let metadata = Metadata::default();
    let dir = tempfile::tempdir().unwrap();
    let storage_impl = crate::package::DirectoryPackage::open(dir.path()).unwrap();
    let engine = Engine::new(&store, &metadata, &storage_impl);

    let mut visitor = RecordingVisitor::default();
    text::traverse_storage(&engine, &mut visitor, 1, &mut ListCounters::new()).await.unwrap();

    let item_numbers: Vec<&str> = visitor.0.iter().filter(|e| e.starts_with("list-item-begin")).map(|s| s.as_str()).collect();
    assert_eq!(item_numbers, vec!["list-item-begin:1", "list-item-begin:2", "list-item-begin:1", "list-item-begin:2"]);

    // The non-list paragraph (index 2) falls between the two list runs,
    // outside both list-begin/end pairs.
    let list_begins = visitor.0.iter().filter(|e| *e == "list-begin").count();
    assert_eq!(list_begins, 2, "list membership toggles on and off around the plain paragraph");
}

#[tokio::test]
async fn list_level_comes_from_paragraph_data_not_the_style_default() {
    // The paragraph style's own `list_level` says 0, but the paragraph-data
    // table overrides it to 1 for this paragraph; the list style only
    // declares a label at level 1, so the item must still be recognized as
    // a list item and its counter keyed on level 1, not 0.
    let list_style = tswp::ListStyleArchive {
        levels: vec![tswp::ListLevelFormat { level: 1, label_kind: Some(2), ..Default::default() }],
        ..Default::default()
    };
    let list_paragraph = tswp::ParagraphStyleArchive {
        list_style: Some(tsp::Reference { identifier: 100, type_hint: None }),
        list_level: Some(0),
        ..Default::default()
    };
    let paragraph_data = tswp::ParagraphDataArchive { list_level: Some(1) };

    let storage = tswp::StorageArchive {
        text: Some("hi".to_string()),
        paragraph_styles: vec![tswp::AttrTableEntry {
            start_index: 0,
            length: None,
            object: Some(tsp::Reference { identifier: 101, type_hint: None }),
        }],
        paragraph_data: vec![tswp::AttrTableEntry {
            start_index: 0,
            length: None,
            object: Some(tsp::Reference { identifier: 102, type_hint: None }),
        }],
        ..Default::default()
    };

    let store = build_store(vec![
        record(100, crate::registry::type_code::LIST_STYLE, &list_style),
        record(101, crate::registry::type_code::PARAGRAPH_STYLE, &list_paragraph),
        record(102, crate::registry::type_code::PARAGRAPH_DATA, &paragraph_data),
        storage_record(1, storage),
    ]);
    let metadata = Metadata::default();
    let dir = tempfile::tempdir().unwrap();
    let storage_impl = crate::package::DirectoryPackage::open(dir.path()).unwrap();
    let engine = Engine::new(&store, &metadata, &storage_impl);

    let mut visitor = RecordingVisitor::default();
    text::traverse_storage(&engine, &mut visitor, 1, &mut ListCounters::new()).await.unwrap();

    assert!(visitor.0.contains(&"list-begin".to_string()), "level-1 label must still mark the paragraph as a list item");
    assert!(visitor.0.contains(&"list-item-begin:1".to_string()));
}

#[tokio::test]
async fn document_events_are_properly_nested_for_a_pages_package() {
    let storage = tswp::StorageArchive { text: Some("hi".to_string()), ..Default::default() };
    let doc = crate::protos::tp::DocumentArchive {
        sections: vec![crate::protos::tp::SectionArchive {
            storage: Some(tsp::Reference { identifier: 1, type_hint: None }),
            ..Default::default()
        }],
        body_storage: None,
    };
    let store = build_store(vec![
        storage_record(1, storage),
        record(2, crate::registry::type_code::PAGES_DOCUMENT, &doc),
    ]);
    let metadata = Metadata::default();
    let dir = tempfile::tempdir().unwrap();
    let storage_impl = crate::package::DirectoryPackage::open(dir.path()).unwrap();
    let engine = Engine::new(&store, &metadata, &storage_impl);

    let mut visitor = RecordingVisitor::default();
    engine.traverse(&mut visitor).await.unwrap();

    assert_eq!(visitor.0.first().unwrap(), "document-begin:Pages");
    assert_eq!(visitor.0.last().unwrap(), "document-end");
}
