//! A small CRM dataset: two houses, their people and the languages they speak.
//!
//! Used by the integration tests and by `quarry --demo`.
//!
//! | id | kind         | label          | notes                                   |
//! |----|--------------|----------------|-----------------------------------------|
//! | 1  | Organisation | Stark          | capital 1000, employs Ned and Robb      |
//! | 2  | Organisation | Lannister      | capital 500, employs nobody             |
//! | 3  | Contact      | Ned Stark      | owned by `ned`, speaks Common           |
//! | 4  | Contact      | Robb Stark     | owned by `robb`                          |
//! | 5  | Contact      | Tyrion Lannister | owned by `tyrion`, speaks both        |
//! | 6  | Language     | Common         |                                         |
//! | 7  | Language     | High Valyrian  |                                         |

use chrono::NaiveDate;

use super::dataset::{
    Condition, ConditionOp, CustomValue, Dataset, DatasetError, EntityFilter, KindSchema,
    Relation, User,
};
use super::store::MemoryStore;
use crate::entity::{
    CustomFieldDef, CustomFieldId, Entity, EntityId, EntityKind, FieldDef, FieldType,
    RelatedFieldDef, RelationType, ScalarType, UserId, Value,
};
use crate::model::{AggregateOp, AggregateSpec, Column, ReportDefinition, ReportId};

pub const STARK: EntityId = EntityId(1);
pub const LANNISTER: EntityId = EntityId(2);
pub const NED: EntityId = EntityId(3);
pub const ROBB: EntityId = EntityId(4);
pub const TYRION: EntityId = EntityId(5);

pub const HEADCOUNT: CustomFieldId = CustomFieldId(1);
pub const NICKNAME: CustomFieldId = CustomFieldId(2);

/// Stored report ids.
pub const ORGANISATIONS_REPORT: ReportId = ReportId(1);
pub const EMPLOYEES_REPORT: ReportId = ReportId(2);
pub const CONTACTS_REPORT: ReportId = ReportId(3);

fn scalar(name: &str, verbose: &str, value_type: ScalarType) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        verbose_name: verbose.to_string(),
        field_type: FieldType::Scalar { value_type },
    }
}

fn link(name: &str, verbose: &str, field_type: FieldType) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        verbose_name: verbose.to_string(),
        field_type,
    }
}

fn date(y: i32, m: u32, d: u32) -> Value {
    NaiveDate::from_ymd_opt(y, m, d).map_or(Value::Null, Value::Date)
}

fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> Value {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|day| day.and_hms_opt(h, min, 0))
        .map_or(Value::Null, Value::DateTime)
}

/// The demo dataset, report definitions included.
pub fn demo() -> Dataset {
    let organisation = EntityKind::new("Organisation");
    let contact = EntityKind::new("Contact");
    let language = EntityKind::new("Language");

    let mut dataset = Dataset::default();

    dataset.schema.insert(
        organisation.clone(),
        KindSchema {
            fields: vec![
                scalar("name", "Name", ScalarType::Text),
                scalar("capital", "Capital", ScalarType::Int),
                scalar("sector", "Sector", ScalarType::Text),
                scalar("created", "Creation date", ScalarType::DateTime),
            ],
            related: vec![RelatedFieldDef {
                name: "contacts".to_string(),
                verbose_name: "Contacts".to_string(),
                target: contact.clone(),
                reverse_field: "employer".to_string(),
            }],
        },
    );
    dataset.schema.insert(
        contact.clone(),
        KindSchema {
            fields: vec![
                scalar("first_name", "First name", ScalarType::Text),
                scalar("last_name", "Last name", ScalarType::Text),
                scalar("birthday", "Birthday", ScalarType::Date),
                scalar("age", "Age", ScalarType::Int),
                scalar("is_lord", "Lord", ScalarType::Bool),
                link(
                    "employer",
                    "Employer",
                    FieldType::ForeignKey {
                        target: organisation.clone(),
                    },
                ),
                link(
                    "languages",
                    "Languages",
                    FieldType::ManyToMany {
                        target: language.clone(),
                    },
                ),
            ],
            related: Vec::new(),
        },
    );
    dataset.schema.insert(
        language.clone(),
        KindSchema {
            fields: vec![scalar("name", "Name", ScalarType::Text)],
            related: Vec::new(),
        },
    );

    dataset.entities = vec![
        Entity::new(1, "Organisation", "Stark")
            .with("name", "Stark")
            .with("capital", 1000)
            .with("sector", "North")
            .with("created", datetime(2024, 1, 15, 9, 30))
            .owned_by("admin"),
        Entity::new(2, "Organisation", "Lannister")
            .with("name", "Lannister")
            .with("capital", 500)
            .with("sector", "West")
            .with("created", datetime(2024, 3, 31, 23, 59))
            .owned_by("admin"),
        Entity::new(3, "Contact", "Ned Stark")
            .with("first_name", "Ned")
            .with("last_name", "Stark")
            .with("birthday", date(1960, 5, 1))
            .with("age", 40)
            .with("is_lord", true)
            .with("employer", STARK)
            .with("languages", Value::List(vec![Value::Ref(EntityId(6))]))
            .owned_by("ned"),
        Entity::new(4, "Contact", "Robb Stark")
            .with("first_name", "Robb")
            .with("last_name", "Stark")
            .with("is_lord", false)
            .with("age", 17)
            .with("employer", STARK)
            .owned_by("robb"),
        Entity::new(5, "Contact", "Tyrion Lannister")
            .with("first_name", "Tyrion")
            .with("last_name", "Lannister")
            .with("age", 32)
            .with("employer", LANNISTER)
            .with(
                "languages",
                Value::List(vec![Value::Ref(EntityId(6)), Value::Ref(EntityId(7))]),
            )
            .owned_by("tyrion"),
        Entity::new(6, "Language", "Common").with("name", "Common"),
        Entity::new(7, "Language", "High Valyrian").with("name", "High Valyrian"),
    ];

    dataset.relation_types = vec![RelationType {
        id: "employs".to_string(),
        label: "employs".to_string(),
        object_kinds: vec![contact.clone()],
    }];
    dataset.relations = vec![
        Relation {
            subject: STARK,
            relation_type: "employs".to_string(),
            object: NED,
        },
        Relation {
            subject: STARK,
            relation_type: "employs".to_string(),
            object: ROBB,
        },
        // Recorded twice on purpose: the engine lists Ned once.
        Relation {
            subject: STARK,
            relation_type: "employs".to_string(),
            object: NED,
        },
    ];

    dataset.custom_fields = vec![
        CustomFieldDef {
            id: HEADCOUNT,
            kind: organisation.clone(),
            name: "Headcount".to_string(),
            value_type: ScalarType::Int,
        },
        CustomFieldDef {
            id: NICKNAME,
            kind: contact.clone(),
            name: "Nickname".to_string(),
            value_type: ScalarType::Text,
        },
    ];
    dataset.custom_values = vec![
        CustomValue {
            entity: STARK,
            field: HEADCOUNT,
            value: Value::Int(300),
        },
        CustomValue {
            entity: LANNISTER,
            field: HEADCOUNT,
            value: Value::Int(1200),
        },
        CustomValue {
            entity: ROBB,
            field: NICKNAME,
            value: Value::from("The Young Wolf"),
        },
        CustomValue {
            entity: TYRION,
            field: NICKNAME,
            value: Value::from("The Imp"),
        },
    ];

    dataset.users = vec![
        User {
            id: UserId::new("admin"),
            superuser: true,
            viewable_kinds: Vec::new(),
        },
        User {
            id: UserId::new("ned"),
            superuser: false,
            viewable_kinds: vec![organisation.clone()],
        },
        User {
            id: UserId::new("maester"),
            superuser: false,
            viewable_kinds: vec![contact.clone(), language.clone()],
        },
    ];

    dataset.filters = vec![
        EntityFilter {
            id: "wealthy".to_string(),
            kind: Some(organisation.clone()),
            conditions: vec![Condition::new("capital", ConditionOp::Gt, 600)],
        },
        EntityFilter {
            id: "starks".to_string(),
            kind: Some(contact.clone()),
            conditions: vec![Condition::new("last_name", ConditionOp::Eq, "Stark")],
        },
    ];

    dataset.reports = demo_reports();
    dataset
}

fn demo_reports() -> Vec<ReportDefinition> {
    let mut organisations = ReportDefinition::new("Organisations", "Organisation")
        .with_column(Column::regular("name", "Name"))
        .with_column(Column::aggregate(
            &AggregateSpec::field("capital", AggregateOp::Min),
            "Minimum capital",
        ));
    organisations.id = ORGANISATIONS_REPORT;
    let mut employees_column = Column::relation("employs", "Employees");
    employees_column.sub_report = Some(EMPLOYEES_REPORT);
    employees_column.selected = true;
    organisations.add_column(employees_column);

    let mut employees = ReportDefinition::new("Employees", "Contact")
        .with_column(Column::regular("first_name", "First name"));
    employees.id = EMPLOYEES_REPORT;

    let mut contacts = ReportDefinition::new("Contacts", "Contact")
        .with_column(Column::regular("last_name", "Last name"))
        .with_column(Column::regular("employer", "Employer"))
        .with_column(Column::regular("languages__name", "Languages"))
        .with_column(Column::custom(NICKNAME, "Nickname"))
        .with_column(Column::function("full_name", "Full name"));
    contacts.id = CONTACTS_REPORT;

    vec![organisations, employees, contacts]
}

/// The demo dataset served by a [`MemoryStore`] with its function fields
/// registered.
pub fn demo_store() -> Result<MemoryStore, DatasetError> {
    let mut store = MemoryStore::new(demo())?;
    store.register_function("Contact", "full_name", |e| {
        match (e.field("first_name"), e.field("last_name")) {
            (Value::Text(first), Value::Text(last)) => Ok(format!("{first} {last}")),
            _ => Err("missing name".to_string()),
        }
    });
    store.register_function("Organisation", "motto", |e| match e.label.as_str() {
        "Stark" => Ok("Winter is coming".to_string()),
        "Lannister" => Ok("Hear me roar".to_string()),
        other => Err(format!("no motto for {other}")),
    });
    Ok(store)
}
