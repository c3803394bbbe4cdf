//! Property tests for id assignment, patching and point arithmetic.

use proptest::prelude::*;
use serde_json::{json, Value};
use swiftdb::{points_for_sale, Database, Record};

fn record(value: Value) -> Record {
    value.as_object().unwrap().clone()
}

fn ids(db: &Database, collection: &str) -> Vec<u64> {
    db.find_all(collection)
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn created_ids_exceed_every_existing_id(removals in proptest::collection::vec(1u64..6, 0..4), creates in 1usize..6) {
        let db = Database::in_memory();
        for id in removals {
            db.remove("users", id).unwrap();
        }

        for _ in 0..creates {
            let before = ids(&db, "users");
            let created = db.create("users", record(json!({"name": "Novo"}))).unwrap();
            let id = created["id"].as_u64().unwrap();

            prop_assert!(before.iter().all(|existing| id > *existing));
            prop_assert_eq!(id, before.iter().max().map(|m| m + 1).unwrap_or(1));
        }
    }

    #[test]
    fn update_of_missing_id_changes_nothing(id in 6u64..10_000, name in "[a-z]{1,12}") {
        let db = Database::in_memory();
        let before = db.load("users").unwrap();

        let result = db.update("users", id, record(json!({"name": name}))).unwrap();

        prop_assert!(result.is_not_found());
        prop_assert_eq!(db.load("users").unwrap(), before);
        prop_assert!(db.modified_collections().unwrap().is_empty());
    }

    #[test]
    fn update_keeps_untouched_fields(name in "[A-Za-z ]{1,20}") {
        let db = Database::in_memory();
        let before = db.find_by_id("users", 2u64).unwrap().found().unwrap();

        let after = db
            .update("users", 2u64, record(json!({"name": name.clone()})))
            .unwrap()
            .found()
            .unwrap();

        prop_assert_eq!(&after["name"], &Value::from(name));
        prop_assert_eq!(&after["email"], &before["email"]);
        prop_assert_eq!(&after["id"], &before["id"]);
    }

    #[test]
    fn points_are_additive(a in -600i64..600, b in -600i64..600) {
        let split = Database::in_memory();
        split.update_user_points(4, a).unwrap();
        let split = split.update_user_points(4, b).unwrap().unwrap();

        let single = Database::in_memory();
        let single = single.update_user_points(4, a + b).unwrap().unwrap();

        prop_assert_eq!(split.current_points, single.current_points);
        prop_assert_eq!(split.monthly_points, single.monthly_points);
        prop_assert_eq!(split.total_lifetime_points, single.total_lifetime_points);
    }

    #[test]
    fn cross_sell_doubles_points(amount in 0.0f64..100_000.0) {
        let base = points_for_sale(amount, false).unwrap();
        prop_assert_eq!(points_for_sale(amount, true), Some(base * 2));
        prop_assert!(base as f64 <= amount / 10.0);
        prop_assert!((base + 1) as f64 > amount / 10.0);
    }
}
