use bakeorm::prelude::*;
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, PartialEq, Deserialize)]
struct User {
    id: i64,
    name: String,
    role: Option<String>,
}

#[derive(Serialize)]
struct ByRole<'a> {
    role: &'a str,
}

async fn repository() -> DataRepository {
    let mut repo = BakeManager::new(BakeConfig::default(), "users", "id")
        .repository()
        .unwrap();
    let crud = repo.entity_manager().crud_mut();
    crud.raw_query(
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, role TEXT)",
        &Fields::new(),
    )
    .await
    .unwrap();
    for (name, role) in [("alice", "admin"), ("bob", "staff"), ("carol", "admin")] {
        let row = json!({"name": name, "role": role});
        crud.create(row.as_object().unwrap()).await.unwrap();
    }
    repo
}

#[tokio::test]
async fn test_find_round_trip() {
    let mut repo = repository().await;
    let id = repo.entity_manager().crud().last_id();
    assert_eq!(id, 3);

    let row = repo.find(id).await.unwrap().unwrap();
    assert_eq!(
        serde_json::Value::Object(row),
        json!({"id": 3, "name": "carol", "role": "admin"})
    );
    assert!(repo.find(42).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_rejects_zero_id() {
    let mut repo = repository().await;
    let err = repo.find(0).await.unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("The id cannot be empty."));
}

#[tokio::test]
async fn test_find_all_and_find_by() {
    let mut repo = repository().await;
    assert_eq!(repo.find_all().await.unwrap().len(), 3);

    let rows = repo
        .find_by(
            &["name".to_string()],
            &ByRole { role: "admin" },
            &Fields::new(),
            &ReadOptions::new().order_by("name DESC"),
        )
        .await
        .unwrap();
    let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("carol"), json!("alice")]);
}

#[tokio::test]
async fn test_find_one_by_returns_first_match() {
    let mut repo = repository().await;
    let row = repo.find_one_by(&json!({"role": "admin"})).await.unwrap().unwrap();
    assert_eq!(row["name"], json!("alice"));
    assert!(repo.find_one_by(&json!({"role": "root"})).await.unwrap().is_none());
}

#[tokio::test]
async fn test_conditions_must_be_a_mapping() {
    let mut repo = repository().await;
    let err = repo.find_one_by(&json!(["role", "admin"])).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_find_object_by() {
    let mut repo = repository().await;
    let user: Option<User> = repo
        .find_object_by(&json!({"name": "bob"}), &[])
        .await
        .unwrap();
    assert_eq!(
        user,
        Some(User {
            id: 2,
            name: "bob".into(),
            role: Some("staff".into()),
        })
    );

    let missing: Option<User> = repo
        .find_object_by(&json!({"name": "nobody"}), &[])
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_find_by_id_and_delete() {
    let mut repo = repository().await;

    assert!(!repo.find_by_id_and_delete(&json!({}), 99).await.unwrap());
    assert!(!repo
        .find_by_id_and_delete(&json!({"role": "staff"}), 1)
        .await
        .unwrap());
    assert!(repo.find(1).await.unwrap().is_some());

    assert!(repo
        .find_by_id_and_delete(&json!({"role": "admin"}), 1)
        .await
        .unwrap());
    assert!(repo.find(1).await.unwrap().is_none());
    assert_eq!(repo.find_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_find_by_id_and_update() {
    let mut repo = repository().await;

    assert!(repo
        .find_by_id_and_update(&json!({"role": "owner"}), 2)
        .await
        .unwrap());
    let row = repo.find(2).await.unwrap().unwrap();
    assert_eq!(row["role"], json!("owner"));

    assert!(!repo
        .find_by_id_and_update(&json!({"role": "owner"}), 99)
        .await
        .unwrap());

    let err = repo
        .find_by_id_and_update(&json!({"id": 2}), 2)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_search_and_paging() {
    let mut repo = repository().await;
    let rows = repo
        .find_by_search(&[], &json!({"role": "adm"}), &ReadOptions::new().order_by("id"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let page: Vec<_> = repo
        .find_by_search_and_paging(&["name".to_string()], &json!({"name": "a"}), Paging::new(2, 1))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r["name"].clone())
        .collect();
    assert_eq!(page, vec![json!("carol")]);

    let err = repo
        .find_by_search_and_paging(&[], &json!({}), Paging::new(0, 10))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}
