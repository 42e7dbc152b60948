//! Integration tests for per-kind column resolution.

use quarry::config::FetchSettings;
use quarry::engine::{AggregateValues, ColumnResolver, Formatter, ResolvedValue};
use quarry::entity::{Backend, CustomFieldId, Entity, EntityId, EntitySource};
use quarry::memory::fixtures::{self, LANNISTER, NED, NICKNAME, ROBB, STARK, TYRION};
use quarry::memory::MemoryStore;
use quarry::model::{Column, ReportId};

struct Fixture {
    backend: MemoryStore,
    formatter: Formatter,
    settings: FetchSettings,
}

impl Fixture {
    fn new() -> Self {
        Self {
            backend: fixtures::demo_store().unwrap(),
            formatter: Formatter::default(),
            settings: FetchSettings::default(),
        }
    }

    fn entity(&self, id: EntityId) -> Entity {
        self.backend.get(id).unwrap()
    }

    fn resolve(&self, column: &Column, id: EntityId) -> ResolvedValue {
        let resolver = ColumnResolver::new(
            Backend::uniform(&self.backend),
            &self.formatter,
            &self.settings,
        );
        resolver.resolve(column, &self.entity(id), &AggregateValues::default())
    }

    fn text(&self, column: &Column, id: EntityId) -> String {
        match self.resolve(column, id) {
            ResolvedValue::Text(text) => text,
            other => panic!("expected text, got {:?}", other),
        }
    }

    fn related_ids(&self, column: &Column, id: EntityId) -> Vec<EntityId> {
        match self.resolve(column, id) {
            ResolvedValue::Related(set) => set.entities.iter().map(|e| e.id).collect(),
            other => panic!("expected related entities, got {:?}", other),
        }
    }
}

#[test]
fn test_regular_scalar_fields() {
    let f = Fixture::new();

    assert_eq!(f.text(&Column::regular("last_name", "Last name"), NED), "Stark");
    assert_eq!(f.text(&Column::regular("is_lord", "Lord"), NED), "Yes");
    assert_eq!(f.text(&Column::regular("is_lord", "Lord"), ROBB), "No");
    assert_eq!(f.text(&Column::regular("birthday", "Birthday"), NED), "1960-05-01");
    assert_eq!(f.text(&Column::regular("birthday", "Birthday"), ROBB), "");
    assert_eq!(f.text(&Column::regular("capital", "Capital"), STARK), "1000");
}

#[test]
fn test_regular_foreign_key_without_sub_report() {
    let f = Fixture::new();

    match f.resolve(&Column::regular("employer", "Employer"), NED) {
        ResolvedValue::Linked { entity, text } => {
            assert_eq!(entity.id, STARK);
            assert_eq!(text, "Stark");
        }
        other => panic!("expected linked value, got {:?}", other),
    }

    match f.resolve(&Column::regular("employer__sector", "Region"), TYRION) {
        ResolvedValue::Linked { entity, text } => {
            assert_eq!(entity.id, LANNISTER);
            assert_eq!(text, "West");
        }
        other => panic!("expected linked value, got {:?}", other),
    }
}

#[test]
fn test_regular_foreign_key_with_sub_report() {
    let f = Fixture::new();
    let mut column = Column::regular("employer", "Employer");
    column.sub_report = Some(ReportId(1));

    match f.resolve(&column, NED) {
        ResolvedValue::Related(set) => {
            assert!(set.single);
            assert_eq!(set.sub_report, Some(ReportId(1)));
            assert_eq!(set.entities.len(), 1);
        }
        other => panic!("expected related entities, got {:?}", other),
    }
}

#[test]
fn test_regular_many_to_many() {
    let f = Fixture::new();
    let column = Column::regular("languages__name", "Languages");

    match f.resolve(&column, TYRION) {
        ResolvedValue::Related(set) => {
            assert!(!set.single);
            assert_eq!(set.path, vec!["name".to_string()]);
            assert_eq!(
                set.entities.iter().map(|e| e.id).collect::<Vec<_>>(),
                vec![EntityId(6), EntityId(7)]
            );
        }
        other => panic!("expected related entities, got {:?}", other),
    }
    assert!(f.related_ids(&column, ROBB).is_empty());
}

#[test]
fn test_unknown_foreign_attribute_is_empty() {
    let f = Fixture::new();
    assert_eq!(f.text(&Column::regular("last_name__name", "Odd"), NED), "");
    assert_eq!(f.text(&Column::regular("missing", "Missing"), NED), "");
}

#[test]
fn test_custom_fields() {
    let f = Fixture::new();

    assert_eq!(f.text(&Column::custom(NICKNAME, "Nickname"), ROBB), "The Young Wolf");
    assert_eq!(f.text(&Column::custom(NICKNAME, "Nickname"), NED), "");
    assert_eq!(f.text(&Column::custom(CustomFieldId(99), "Deleted"), ROBB), "");
}

#[test]
fn test_relation_is_deduplicated() {
    let f = Fixture::new();
    let column = Column::relation("employs", "Employees");

    assert_eq!(f.related_ids(&column, STARK), vec![NED, ROBB]);
    assert!(f.related_ids(&column, LANNISTER).is_empty());
    assert_eq!(f.text(&Column::relation("fostered", "Wards"), STARK), "");
}

#[test]
fn test_function_fields() {
    let f = Fixture::new();

    assert_eq!(f.text(&Column::function("full_name", "Full name"), NED), "Ned Stark");
    assert_eq!(f.text(&Column::function("label", "Label"), STARK), "Stark");
    assert_eq!(
        f.text(&Column::function("full_name", "Full name"), STARK),
        "Problem with function field"
    );
}

#[test]
fn test_related_field() {
    let f = Fixture::new();
    let column = Column::related("contacts", "Contacts");

    assert_eq!(f.related_ids(&column, STARK), vec![NED, ROBB]);
    assert_eq!(f.related_ids(&column, LANNISTER), vec![TYRION]);
    assert_eq!(f.text(&Column::related("documents", "Documents"), STARK), "");
}
