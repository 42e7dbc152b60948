//! Integration tests for fetching rows: expansion, collapse, scoping.

use chrono::NaiveDate;
use quarry::config::Settings;
use quarry::engine::{DateRange, FetchContext, FetchEngine};
use quarry::entity::{
    Backend, CustomFieldId, Entity, EntityId, EntityKind, FieldDef, FieldType, RelationType,
    ScalarType,
};
use quarry::memory::fixtures::{self, NICKNAME};
use quarry::memory::{Dataset, KindSchema, MemoryStore, Relation};
use quarry::model::{Column, ReportDefinition, ReportId, ReportStore};

fn rows(backend: &MemoryStore, store: &ReportStore, id: ReportId) -> Vec<Vec<String>> {
    let report = store.get(id).unwrap();
    FetchEngine::new(Backend::uniform(backend), store).fetch(report, &FetchContext::unrestricted())
}

fn linked(mut column: Column, sub_report: ReportId, selected: bool) -> Column {
    column.sub_report = Some(sub_report);
    column.selected = selected;
    column
}

/// Organisations with their employees expanded through an `Employees` sub-report.
fn employees_store(selected: bool) -> (ReportStore, ReportId) {
    let mut store = ReportStore::new();
    let employees = store.insert(
        ReportDefinition::new("Employees", "Contact")
            .with_column(Column::regular("first_name", "First name")),
    );
    let organisations = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(Column::regular("name", "Name"))
            .with_column(linked(
                Column::relation("employs", "Employees"),
                employees,
                selected,
            )),
    );
    (store, organisations)
}

#[test]
fn test_expanded_relation_rows() {
    let backend = fixtures::demo_store().unwrap();
    let (store, organisations) = employees_store(true);

    assert_eq!(
        rows(&backend, &store, organisations),
        vec![
            vec!["Stark", "Ned"],
            vec!["Stark", "Robb"],
            vec!["Lannister", ""],
        ]
    );
}

#[test]
fn test_headers_flatten_selected_sub_reports() {
    let backend = fixtures::demo_store().unwrap();
    let engine = |store: &ReportStore, id: ReportId| {
        FetchEngine::new(Backend::uniform(&backend), store).headers(store.get(id).unwrap())
    };

    let (expanded, id) = employees_store(true);
    assert_eq!(engine(&expanded, id), vec!["Name", "First name"]);

    let (collapsed, id) = employees_store(false);
    assert_eq!(engine(&collapsed, id), vec!["Name", "Employees"]);
}

#[test]
fn test_demo_table() {
    let backend = fixtures::demo_store().unwrap();
    let store = backend.reports();
    let report = store.find("Organisations").unwrap();

    let table = FetchEngine::new(Backend::uniform(&backend), &store)
        .table(report, &FetchContext::unrestricted());

    insta::assert_snapshot!(table.to_text(), @r"
    Name      | Minimum capital | First name
    ----------+-----------------+-----------
    Stark     | 500             | Ned
    Stark     | 500             | Robb
    Lannister | 500             |
    ");
}

#[test]
fn test_one_row_per_entity_without_expansion() {
    let backend = fixtures::demo_store().unwrap();
    let store = backend.reports();

    assert_eq!(
        rows(&backend, &store, fixtures::CONTACTS_REPORT),
        vec![
            vec!["Stark", "Stark", "Common", "", "Ned Stark"],
            vec!["Stark", "Stark", "", "The Young Wolf", "Robb Stark"],
            vec!["Lannister", "Lannister", "Common, High Valyrian", "The Imp", "Tyrion Lannister"],
        ]
    );
}

#[test]
fn test_collapsed_sub_report_cell() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let employees = store.insert(
        ReportDefinition::new("Employees", "Contact")
            .with_column(Column::regular("first_name", "First name"))
            .with_column(Column::custom(NICKNAME, "Nickname")),
    );
    let organisations = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(Column::regular("name", "Name"))
            .with_column(linked(Column::related("contacts", "Contacts"), employees, false)),
    );

    assert_eq!(
        rows(&backend, &store, organisations),
        vec![
            vec![
                "Stark",
                "First name: Ned - Nickname: , First name: Robb - Nickname: The Young Wolf"
            ],
            vec!["Lannister", "First name: Tyrion - Nickname: The Imp"],
        ]
    );
}

#[test]
fn test_collapsed_pairs_format() {
    let mut dataset = Dataset::default();
    dataset.schema.insert(
        EntityKind::new("Item"),
        KindSchema {
            fields: vec![
                FieldDef {
                    name: "t1".to_string(),
                    verbose_name: "T1".to_string(),
                    field_type: FieldType::Scalar {
                        value_type: ScalarType::Text,
                    },
                },
                FieldDef {
                    name: "t2".to_string(),
                    verbose_name: "T2".to_string(),
                    field_type: FieldType::Scalar {
                        value_type: ScalarType::Text,
                    },
                },
            ],
            related: Vec::new(),
        },
    );
    dataset.entities = vec![
        Entity::new(1, "Holder", "h"),
        Entity::new(2, "Item", "a").with("t1", "a1").with("t2", "a2"),
        Entity::new(3, "Item", "b").with("t1", "b1").with("t2", "b2"),
    ];
    dataset.relation_types = vec![RelationType {
        id: "holds".to_string(),
        label: "holds".to_string(),
        object_kinds: Vec::new(),
    }];
    dataset.relations = [2, 3]
        .into_iter()
        .map(|object| Relation {
            subject: EntityId(1),
            relation_type: "holds".to_string(),
            object: EntityId(object),
        })
        .collect();
    let backend = MemoryStore::new(dataset).unwrap();

    let mut store = ReportStore::new();
    let items = store.insert(
        ReportDefinition::new("Items", "Item")
            .with_column(Column::regular("t1", "T1"))
            .with_column(Column::regular("t2", "T2")),
    );
    let holders = store.insert(
        ReportDefinition::new("Holders", "Holder")
            .with_column(linked(Column::relation("holds", "Items"), items, false)),
    );

    assert_eq!(
        rows(&backend, &store, holders),
        vec![vec!["T1: a1 - T2: a2, T1: b1 - T2: b2"]]
    );
}

#[test]
fn test_unlinked_collections_use_labels() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let id = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(Column::relation("employs", "Employees"))
            .with_column(Column::related("contacts", "Contacts")),
    );

    assert_eq!(
        rows(&backend, &store, id),
        vec![
            vec!["Ned Stark, Robb Stark", "Ned Stark, Robb Stark"],
            vec!["", "Tyrion Lannister"],
        ]
    );
}

#[test]
fn test_two_expanding_columns_cross_product() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let employees = store.insert(
        ReportDefinition::new("Employees", "Contact")
            .with_column(Column::regular("first_name", "First name")),
    );
    let id = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(linked(Column::relation("employs", "Employees"), employees, true))
            .with_column(Column::regular("name", "Name"))
            .with_column(linked(Column::related("contacts", "Contacts"), employees, true)),
    );

    assert_eq!(
        rows(&backend, &store, id),
        vec![
            vec!["Ned", "Stark", "Ned"],
            vec!["Ned", "Stark", "Robb"],
            vec!["Robb", "Stark", "Ned"],
            vec!["Robb", "Stark", "Robb"],
            vec!["", "Lannister", "Tyrion"],
        ]
    );
}

#[test]
fn test_expanded_foreign_key() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let houses = store.insert(
        ReportDefinition::new("Houses", "Organisation")
            .with_column(Column::regular("name", "House"))
            .with_column(Column::regular("sector", "Sector")),
    );
    let id = store.insert(
        ReportDefinition::new("Contacts", "Contact")
            .with_column(Column::regular("first_name", "First name"))
            .with_column(linked(Column::regular("employer", "Employer"), houses, true)),
    );

    let report = store.get(id).unwrap();
    let engine = FetchEngine::new(Backend::uniform(&backend), &store);
    assert_eq!(engine.headers(report), vec!["First name", "House", "Sector"]);
    assert_eq!(
        engine.fetch(report, &FetchContext::unrestricted()),
        vec![
            vec!["Ned", "Stark", "North"],
            vec!["Robb", "Stark", "North"],
            vec!["Tyrion", "Lannister", "West"],
        ]
    );
}

#[test]
fn test_sub_report_filter_restricts_targets() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let starks = store.insert(
        ReportDefinition::new("Starks", "Contact")
            .with_filter("starks")
            .with_column(Column::regular("first_name", "First name")),
    );
    let id = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(Column::regular("name", "Name"))
            .with_column(linked(Column::related("contacts", "Contacts"), starks, true)),
    );

    assert_eq!(
        rows(&backend, &store, id),
        vec![
            vec!["Stark", "Ned"],
            vec!["Stark", "Robb"],
            vec!["Lannister", ""],
        ]
    );
}

#[test]
fn test_report_filter() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let wealthy = store.insert(
        ReportDefinition::new("Wealthy", "Organisation")
            .with_filter("wealthy")
            .with_column(Column::regular("name", "Name")),
    );
    let unknown = store.insert(
        ReportDefinition::new("Unknown", "Organisation")
            .with_filter("no-such-filter")
            .with_column(Column::regular("name", "Name")),
    );

    assert_eq!(rows(&backend, &store, wealthy), vec![vec!["Stark"]]);
    assert!(rows(&backend, &store, unknown).is_empty());
}

#[test]
fn test_date_range_bounds_are_whole_days() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let id = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(Column::regular("name", "Name")),
    );
    let report = store.get(id).unwrap();
    let engine = FetchEngine::new(Backend::uniform(&backend), &store);
    let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d);
    let names = |start, end| -> Vec<String> {
        let context = FetchContext::unrestricted()
            .with_date_range(DateRange::new("created", start, end));
        engine
            .fetch(report, &context)
            .into_iter()
            .map(|mut row| row.remove(0))
            .collect()
    };

    // Stark was created 2024-01-15 09:30, Lannister 2024-03-31 23:59.
    assert_eq!(names(day(1, 15), day(3, 31)), vec!["Stark", "Lannister"]);
    assert_eq!(names(day(1, 16), None), vec!["Lannister"]);
    assert_eq!(names(None, day(3, 30)), vec!["Stark"]);
    assert!(names(day(4, 1), None).is_empty());
}

#[test]
fn test_fetch_time_anomalies_degrade_to_cells() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let id = store.insert(
        ReportDefinition::new("Organisations", "Organisation")
            .with_column(Column::regular("name", "Name"))
            .with_column(Column::function("full_name", "Full name"))
            .with_column(Column::function("motto", "Motto"))
            .with_column(Column::custom(CustomFieldId(99), "Deleted"))
            .with_column(Column::relation("deleted_relation", "Gone")),
    );

    assert_eq!(
        rows(&backend, &store, id),
        vec![
            vec!["Stark", "Problem with function field", "Winter is coming", "", ""],
            vec!["Lannister", "Problem with function field", "Hear me roar", "", ""],
        ]
    );
}

#[test]
fn test_unrenderable_date_format_gives_empty_cells() {
    let backend = fixtures::demo_store().unwrap();
    let mut store = ReportStore::new();
    let id = store.insert(
        ReportDefinition::new("Birthdays", "Contact")
            .with_column(Column::regular("first_name", "First name"))
            .with_column(Column::regular("birthday", "Birthday")),
    );

    let mut settings = Settings::default();
    settings.format.date = "%Q".to_string();
    let engine = FetchEngine::with_settings(Backend::uniform(&backend), &store, &settings);

    assert_eq!(
        engine.fetch(store.get(id).unwrap(), &FetchContext::unrestricted()),
        vec![vec!["Ned", ""], vec!["Robb", ""], vec!["Tyrion", ""]]
    );
}

#[test]
fn test_recursion_is_bounded() {
    let backend = fixtures::demo_store().unwrap();

    // A cycle that bypassed the linker: Organisations -> Employees -> Organisations.
    let mut organisations = ReportDefinition::new("Organisations", "Organisation")
        .with_column(Column::regular("name", "Name"))
        .with_column(linked(Column::relation("employs", "Employees"), ReportId(2), false));
    organisations.id = ReportId(1);
    let mut employees = ReportDefinition::new("Employees", "Contact")
        .with_column(Column::regular("first_name", "First name"))
        .with_column(linked(Column::regular("employer", "Employer"), ReportId(1), false));
    employees.id = ReportId(2);
    let store = ReportStore::from(vec![organisations, employees]);

    let mut settings = Settings::default();
    settings.fetch.max_depth = 1;
    let engine = FetchEngine::with_settings(Backend::uniform(&backend), &store, &settings);
    let report = store.get(ReportId(1)).unwrap();

    assert_eq!(
        engine.fetch(report, &FetchContext::unrestricted()),
        vec![
            vec![
                "Stark",
                "First name: Ned - Employer: Stark, First name: Robb - Employer: Stark"
            ],
            vec!["Lannister", ""],
        ]
    );

    // The default depth terminates too.
    let engine = FetchEngine::new(Backend::uniform(&backend), &store);
    assert_eq!(engine.fetch(report, &FetchContext::unrestricted()).len(), 2);
}
