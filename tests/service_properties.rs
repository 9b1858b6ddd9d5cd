//! Property-based tests for validation and the service lifecycle.
//!
//! - **Validation totality**: every payload yields either a normalized task
//!   or a non-empty, field-ordered list of violations, never both
//! - **Id uniqueness**: ids handed out by `create` are distinct across any
//!   interleaving of creates and deletes
//! - **Round-trip**: `get` after `create` returns the created record

mod common;

use std::collections::HashSet;

use proptest::prelude::*;

use common::dyn_service;
use todo_core::domain::{
    DESCRIPTION_MAX_CHARS, Field, Reason, TITLE_MAX_CHARS, TaskPayload, Violation, validate,
};
use todo_core::service::ServiceError;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn payload_strategy() -> impl Strategy<Value = TaskPayload> {
    (
        prop::option::of("[ a-zA-Z0-9]{0,110}"),
        prop::option::of(".{0,520}"),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(title, description, completed)| TaskPayload {
            title,
            description,
            completed,
            owner: None,
        })
}

#[derive(Debug, Clone)]
enum Step {
    Create,
    DeleteLast,
}

fn steps_strategy() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![3 => Just(Step::Create), 1 => Just(Step::DeleteLast)],
        1..40,
    )
}

proptest! {
    #[test]
    fn prop_validation_is_total(payload in payload_strategy()) {
        let title = payload.title.as_deref().map(str::trim).unwrap_or_default();
        let title_ok = !title.is_empty() && title.chars().count() <= TITLE_MAX_CHARS;
        let description_ok = payload
            .description
            .as_deref()
            .is_none_or(|text| text.chars().count() <= DESCRIPTION_MAX_CHARS);
        let completed_ok = payload.completed.is_some();

        match validate(&payload) {
            Ok(task) => {
                prop_assert!(title_ok && description_ok && completed_ok);
                prop_assert_eq!(task.title.as_str(), title);
                prop_assert_eq!(
                    task.description.as_str(),
                    payload.description.as_deref().unwrap_or_default()
                );
            }
            Err(violations) => {
                prop_assert!(!(title_ok && description_ok && completed_ok));
                prop_assert_eq!(
                    violations.iter().any(|violation| violation.field == Field::Title),
                    !title_ok
                );
                prop_assert_eq!(
                    violations.contains(&Violation::new(Field::Description, Reason::TooLong)),
                    !description_ok
                );
                prop_assert_eq!(
                    violations.contains(&Violation::new(Field::Completed, Reason::Required)),
                    !completed_ok
                );
                prop_assert!(violations.windows(2).all(|pair| pair[0].field < pair[1].field));
            }
        }
    }

    #[test]
    fn prop_ids_are_unique_across_creates_and_deletes(steps in steps_strategy()) {
        runtime().block_on(async {
            let service = dyn_service();
            let mut seen = HashSet::new();
            let mut live = Vec::new();

            for step in steps {
                match step {
                    Step::Create => {
                        let record = service
                            .create(TaskPayload::new("task", false))
                            .await
                            .unwrap();
                        prop_assert!(seen.insert(record.id));
                        live.push(record.id);
                    }
                    Step::DeleteLast => {
                        if let Some(id) = live.pop() {
                            service.delete(id).await.unwrap();
                            prop_assert_eq!(
                                service.get(id).await,
                                Err(ServiceError::NotFound { id })
                            );
                        }
                    }
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_get_returns_created_record(
        title in "[a-zA-Z][a-zA-Z0-9 ]{0,60}",
        description in prop::option::of("[a-z ]{0,80}"),
        completed in any::<bool>(),
        owner in prop::option::of("[a-z]{1,8}"),
    ) {
        runtime().block_on(async {
            let service = dyn_service();
            let payload = TaskPayload {
                title: Some(title.clone()),
                description,
                completed: Some(completed),
                owner: owner.map(Into::into),
            };

            let created = service.create(payload.clone()).await.unwrap();
            let fetched = service.get(created.id).await.unwrap();

            prop_assert_eq!(&fetched, &created);
            prop_assert_eq!(fetched.title.as_str(), title.trim());
            prop_assert_eq!(
                fetched.description.as_str(),
                payload.description.as_deref().unwrap_or_default()
            );
            prop_assert_eq!(fetched.completed, completed);
            prop_assert_eq!(fetched.owner, payload.owner);
            Ok(())
        })?;
    }
}
