//! Integration tests for per-viewer omission and redaction.

use quarry::engine::{FetchContext, FetchEngine};
use quarry::entity::Backend;
use quarry::memory::fixtures::{self, CONTACTS_REPORT, ORGANISATIONS_REPORT};
use quarry::memory::MemoryStore;
use quarry::model::{Column, ReportDefinition, ReportId, ReportStore};

fn fetch(backend: &MemoryStore, store: &ReportStore, id: ReportId, viewer: &str) -> Vec<Vec<String>> {
    let report = store.get(id).unwrap();
    FetchEngine::new(Backend::uniform(backend), store).fetch(report, &FetchContext::for_user(viewer))
}

#[test]
fn test_unviewable_base_entities_yield_no_rows() {
    let backend = fixtures::demo_store().unwrap();
    let store = backend.reports();

    // The maester sees contacts and languages, not organisations.
    assert!(fetch(&backend, &store, ORGANISATIONS_REPORT, "maester").is_empty());
    assert!(fetch(&backend, &store, ORGANISATIONS_REPORT, "stranger").is_empty());
}

#[test]
fn test_unviewable_expanded_entities_are_dropped() {
    let backend = fixtures::demo_store().unwrap();
    let store = backend.reports();

    assert_eq!(
        fetch(&backend, &store, ORGANISATIONS_REPORT, "ned"),
        vec![vec!["Stark", "500", "Ned"], vec!["Lannister", "500", ""]]
    );
}

#[test]
fn test_unviewable_linked_entity_is_redacted() {
    let backend = fixtures::demo_store().unwrap();
    let store = backend.reports();

    assert_eq!(
        fetch(&backend, &store, CONTACTS_REPORT, "maester"),
        vec![
            vec!["Stark", "??", "Common", "", "Ned Stark"],
            vec!["Stark", "??", "", "The Young Wolf", "Robb Stark"],
            vec!["Lannister", "??", "Common, High Valyrian", "The Imp", "Tyrion Lannister"],
        ]
    );
}

#[test]
fn test_owner_sees_own_entity() {
    let backend = fixtures::demo_store().unwrap();
    let store = backend.reports();

    // Ned owns his contact and sees organisations but no languages.
    assert_eq!(
        fetch(&backend, &store, CONTACTS_REPORT, "ned"),
        vec![vec!["Stark", "Stark", "", "", "Ned Stark"]]
    );
}

#[test]
fn test_collapsed_sets_drop_hidden_entities() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let id = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(Column::regular("name", "Name"))
            .with_column(Column::relation("employs", "Employees")),
    );

    assert_eq!(
        fetch(&backend, &store, id, "ned"),
        vec![vec!["Stark", "Ned Stark"], vec!["Lannister", ""]]
    );
}

#[test]
fn test_collapsed_single_link_is_redacted() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let houses = store.insert(
        ReportDefinition::new("Houses", "Organisation")
            .with_column(Column::regular("name", "House")),
    );
    let mut employer = Column::regular("employer", "Employer");
    employer.sub_report = Some(houses);
    let id = store.insert(
        ReportDefinition::new("Contacts", "Contact")
            .with_column(Column::regular("first_name", "First name"))
            .with_column(employer),
    );

    assert_eq!(
        fetch(&backend, &store, id, "maester"),
        vec![
            vec!["Ned", "??"],
            vec!["Robb", "??"],
            vec!["Tyrion", "??"],
        ]
    );
    assert_eq!(
        fetch(&backend, &store, id, "admin")[0],
        vec!["Ned", "House: Stark"]
    );
}

#[test]
fn test_unrestricted_fetch_skips_visibility() {
    let backend = fixtures::demo_store().unwrap();
    let store = backend.reports();
    let report = store.get(ORGANISATIONS_REPORT).unwrap();
    let engine = FetchEngine::new(Backend::uniform(&backend), &store);

    assert_eq!(engine.fetch(report, &FetchContext::unrestricted()).len(), 3);
    assert_eq!(
        engine.fetch(report, &FetchContext::unrestricted()),
        engine.fetch(report, &FetchContext::for_user("admin"))
    );
}
