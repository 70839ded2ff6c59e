mod common;

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

use common::{column, mysql_id, FakeDatabase};
use schema_modeller::db::ColumnDescriptor;
use schema_modeller::{ColumnKind, Error, Modeller, WireType};

fn labels(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn mysql_users() -> FakeDatabase {
    FakeDatabase::new()
        .with_table(
            "shop",
            "users",
            vec![
                mysql_id(),
                ColumnDescriptor {
                    nullable: true,
                    default: Some("'nobody'".to_string()),
                    ..column("email", WireType::Varchar, 255, "VARCHAR")
                },
                ColumnDescriptor {
                    default: Some("active".to_string()),
                    ..column("status", WireType::Char, 6, "ENUM")
                },
                ColumnDescriptor {
                    default: Some("1".to_string()),
                    ..column("verified", WireType::Boolean, 1, "BOOLEAN")
                },
                ColumnDescriptor {
                    decimal_digits: 2,
                    ..column("balance", WireType::Decimal, 10, "DECIMAL")
                },
                column("created", WireType::Timestamp, 19, "DATETIME"),
                column("touched", WireType::Timestamp, 19, "TIMESTAMP"),
            ],
        )
        .with_primary_key("shop", "users", "id", "PRIMARY")
        .with_index("shop", "users", "PRIMARY", "id", true)
        .with_index("shop", "users", "ix_users_email", "email", true)
        .answer("SUBSTRING(COLUMN_TYPE,5)", "('active','banned')")
}

#[tokio::test]
async fn reads_mysql_table() {
    let fake = mysql_users();
    let modeller = Modeller::mysql(fake.supplier(), false);

    let users = modeller.read_table("shop", "users").await.unwrap();

    let names: Vec<&str> = users.columns().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec!["id", "email", "status", "verified", "balance", "created", "touched"]
    );

    let id = users.column("id").unwrap();
    assert!(id.is_key());
    assert!(id.is_auto_increment());
    assert_eq!(id.kind(), &ColumnKind::Integer);

    let email = users.column("email").unwrap();
    assert!(email.is_nullable());
    assert!(!email.is_key());
    assert_eq!(email.length(), Some(255));
    assert_eq!(email.default(), Some("nobody"));

    let status = users.column("status").unwrap();
    assert_eq!(status.values(), Some(&labels(&["active", "banned"])));
    assert_eq!(status.default(), Some("active"));

    assert_eq!(users.column("verified").unwrap().kind(), &ColumnKind::Boolean);
    assert_eq!(
        users.column("balance").unwrap().kind(),
        &ColumnKind::Decimal { precision: 10, scale: 2 }
    );
    assert_eq!(users.column("created").unwrap().kind(), &ColumnKind::DateTime);
    assert_eq!(users.column("touched").unwrap().kind(), &ColumnKind::TimeStamp);
}

#[tokio::test]
async fn primary_key_is_not_an_index() {
    let fake = mysql_users();
    let modeller = Modeller::mysql(fake.supplier(), false);

    let users = modeller.read_table("shop", "users").await.unwrap();

    let indexes: Vec<&str> = users.indexes().map(|i| i.name()).collect();
    assert_eq!(indexes, vec!["ix_users_email"]);
    assert!(users.index("ix_users_email").unwrap().is_unique());
}

#[tokio::test]
async fn reads_every_table_of_a_database() {
    let fake = mysql_users().with_table(
        "shop",
        "orders",
        vec![mysql_id(), column("total", WireType::Double, 22, "DOUBLE")],
    );
    let modeller = Modeller::mysql(fake.supplier(), false);

    let database = modeller.read_database("shop").await.unwrap();

    let tables: Vec<&str> = database.tables().map(|t| t.name()).collect();
    assert_eq!(tables, vec!["users", "orders"]);
    assert_eq!(
        database.table("orders").unwrap().column("total").unwrap().kind(),
        &ColumnKind::Double
    );
}

#[tokio::test]
async fn reads_mysql_set_column() {
    let fake = FakeDatabase::new()
        .with_table("shop", "posts", vec![column("tags", WireType::Char, 9, "SET")])
        .answer("SUBSTRING(COLUMN_TYPE,4)", "('news','tech')");
    let modeller = Modeller::mysql(fake.supplier(), false);

    let posts = modeller.read_table("shop", "posts").await.unwrap();

    assert_eq!(
        posts.column("tags").unwrap().kind(),
        &ColumnKind::Set { values: labels(&["news", "tech"]) }
    );
}

#[tokio::test]
async fn reads_postgres_enum_and_serial() {
    let fake = FakeDatabase::new()
        .with_table(
            "shop",
            "orders",
            vec![
                ColumnDescriptor {
                    auto_increment: true,
                    ..column("id", WireType::Integer, 10, "int4")
                },
                ColumnDescriptor {
                    default: Some("'pending'::orders_status".to_string()),
                    ..column("status", WireType::Varchar, 2_147_483_647, "orders_status")
                },
                column("placed", WireType::Timestamp, 29, "timestamp"),
                column("shipped", WireType::TimestampWithTimezone, 35, "timestamptz"),
            ],
        )
        .with_primary_key("shop", "orders", "id", "orders_pkey")
        .with_index("shop", "orders", "orders_pkey", "id", true)
        .answer("t.typtype = 'e'", "orders_status")
        .answer("json_agg", r#"["pending","shipped"]"#);
    let modeller = Modeller::postgres(fake.supplier(), "public");

    let orders = modeller.read_table("shop", "orders").await.unwrap();

    let id = orders.column("id").unwrap();
    assert!(id.is_key() && id.is_auto_increment());

    let status = orders.column("status").unwrap();
    assert_eq!(status.values(), Some(&labels(&["pending", "shipped"])));
    assert_eq!(status.default(), Some("pending"));

    assert_eq!(orders.column("placed").unwrap().kind(), &ColumnKind::DateTime);
    let shipped = orders.column("shipped").unwrap();
    assert_eq!(shipped.kind(), &ColumnKind::TimeStamp);
    assert_eq!(shipped.wire_type(), WireType::TimestampWithTimezone);
    assert_eq!(orders.indexes().count(), 0);
}

#[tokio::test]
async fn postgres_builtin_strings_skip_enum_lookup() {
    let fake = FakeDatabase::new().with_table(
        "shop",
        "notes",
        vec![column("body", WireType::Varchar, 2_147_483_647, "text")],
    );
    let modeller = Modeller::postgres(fake.supplier(), "public");

    let notes = modeller.read_table("shop", "notes").await.unwrap();

    assert_eq!(notes.column("body").unwrap().length(), Some(2_147_483_647));
    assert!(fake.queries().is_empty());
}

#[tokio::test]
async fn unmapped_wire_type_is_unsupported() {
    let fake = FakeDatabase::new().with_table(
        "shop",
        "places",
        vec![column("location", WireType::Other, 0, "GEOMETRY")],
    );
    let modeller = Modeller::mysql(fake.supplier(), false);

    let result = modeller.read_table("shop", "places").await;

    assert!(matches!(result, Err(Error::UnsupportedType(_))));
}

#[tokio::test]
async fn unknown_wire_code_is_unsupported() {
    let fake = FakeDatabase::new().with_table(
        "shop",
        "places",
        vec![ColumnDescriptor {
            wire_code: 2003,
            ..column("points", WireType::Other, 0, "ARRAY")
        }],
    );
    let modeller = Modeller::mysql(fake.supplier(), false);

    let result = modeller.read_table("shop", "places").await;

    assert!(matches!(result, Err(Error::UnsupportedType(_))));
}

#[tokio::test]
async fn primary_key_on_unknown_column_fails() {
    let fake = FakeDatabase::new()
        .with_table("shop", "t", vec![mysql_id()])
        .with_primary_key("shop", "t", "ghost", "PRIMARY");
    let modeller = Modeller::mysql(fake.supplier(), false);

    let err = modeller.read_table("shop", "t").await.unwrap_err();

    assert!(matches!(err, Error::IntrospectionError(_)));
    assert_eq!(
        err.to_string(),
        "Introspection error: Error scanning table 't' (Cannot find column 'ghost' in table 't' yet it is a primary key)"
    );
}

#[tokio::test]
async fn missing_table_fails_to_read() {
    let fake = FakeDatabase::new();
    let modeller = Modeller::mysql(fake.supplier(), false);

    let err = modeller.read_table("shop", "nowhere").await.unwrap_err();

    assert!(matches!(err, Error::IntrospectionError(_)));
}

#[tokio::test]
async fn table_existence() {
    let fake = mysql_users();
    let modeller = Modeller::mysql(fake.supplier(), false);

    let users = schema_modeller::Table::new("shop", "users");
    let other = schema_modeller::Table::new("shop", "accounts");

    assert!(modeller.table_exists(&users).await.unwrap());
    assert!(!modeller.table_exists(&other).await.unwrap());
}
