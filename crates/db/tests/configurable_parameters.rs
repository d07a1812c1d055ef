//! Integration tests for get-or-create of configurable parameters.

use assert_matches::assert_matches;
use geti_core::configurable_parameters::{ParameterGroup, ParameterSchema};
use geti_core::dataset_counter_config::{
    DatasetCounterSchema, DATASET_COUNTER_SCHEMA, REQUIRED_IMAGES_AUTO_TRAINING,
    USE_DYNAMIC_REQUIRED_ANNOTATIONS,
};
use geti_core::entity_identifier::{ComponentType, EntityIdentifier};
use geti_core::error::CoreError;
use geti_core::hyper_parameters::{TrainingHyperParameterSchema, LEARNING_PARAMETERS};
use geti_core::task::TaskType;
use geti_db::models::configurable_parameters::NewConfiguration;
use geti_db::models::model::{CreateModelStorage, ModelStorage};
use geti_db::models::project::CreateProject;
use geti_db::models::task::{CreateTask, Task};
use geti_db::repositories::{ConfigurableParametersRepo, ModelStorageRepo, ProjectRepo, TaskRepo};
use geti_db::DbError;
use serde_json::json;
use sqlx::PgPool;

const WORKSPACE_ID: i64 = 7;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn setup(pool: &PgPool, task_type: TaskType) -> Task {
    let project = ProjectRepo::create(
        pool,
        &CreateProject {
            workspace_id: WORKSPACE_ID,
            name: "Config".into(),
        },
    )
    .await
    .unwrap();
    TaskRepo::create(
        pool,
        &CreateTask {
            project_id: project.id,
            title: "Task".into(),
            task_type,
        },
    )
    .await
    .unwrap()
}

fn template_defaults() -> serde_json::Value {
    json!({
        "type": "PARAMETER_GROUP",
        "header": "Template",
        "learning_parameters": {
            "type": "PARAMETER_GROUP",
            "header": "Learning",
            "batch_size": {
                "type": "INTEGER",
                "value": 16,
                "default_value": 16,
                "min_value": 1,
                "max_value": 128
            }
        }
    })
}

async fn model_storage(pool: &PgPool, task: &Task) -> ModelStorage {
    ModelStorageRepo::create(
        pool,
        &CreateModelStorage {
            project_id: task.project_id,
            task_id: task.id,
            model_template_id: "template_a".into(),
            hyper_parameters: template_defaults(),
        },
    )
    .await
    .unwrap()
}

fn dataset_counter_identifier(task: &Task) -> EntityIdentifier {
    EntityIdentifier::component(ComponentType::DatasetCounter, Some(task.id))
}

// ---------------------------------------------------------------------------
// Test: component parameters
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_call_persists_defaults(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let schema = DatasetCounterSchema::new(TaskType::Detection);

    let record = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();

    assert_eq!(record.data, schema.default_parameters());
    assert_eq!(record.schema_name, DATASET_COUNTER_SCHEMA);
    assert_eq!(record.workspace_id, WORKSPACE_ID);
    assert_eq!(record.entity_identifier, dataset_counter_identifier(&task));
    assert!(!record.single_use);

    let stored = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.data, schema.default_parameters().to_json());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_get_or_create_is_idempotent(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let schema = DatasetCounterSchema::new(TaskType::Detection);

    let first = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();
    let second = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.data, second.data);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_task_scoped_and_project_scoped_records_are_distinct(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let schema = DatasetCounterSchema::new(TaskType::Detection);

    let per_task = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();
    let per_project = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, None)
        .await
        .unwrap();

    assert_ne!(per_task.id, per_project.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_saved_values_are_returned(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let schema = DatasetCounterSchema::new(TaskType::Detection);

    let mut edited = schema.default_parameters();
    edited
        .parameter_mut(&[REQUIRED_IMAGES_AUTO_TRAINING])
        .unwrap()
        .set_value(REQUIRED_IMAGES_AUTO_TRAINING, &json!(40))
        .unwrap();
    let saved = repo
        .save(&NewConfiguration {
            entity_identifier: dataset_counter_identifier(&task),
            schema_name: DATASET_COUNTER_SCHEMA.into(),
            data: edited,
            single_use: false,
        })
        .await
        .unwrap();

    let record = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();
    assert_eq!(record.id, saved.id);
    assert_eq!(record.data.integer_value(&[REQUIRED_IMAGES_AUTO_TRAINING]).unwrap(), 40);

    let config = repo.get_dataset_counter_config(&task).await.unwrap();
    assert_eq!(config.required_images_auto_training, 40);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_stored_value_falls_back_to_defaults(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let schema = DatasetCounterSchema::new(TaskType::Detection);

    let row = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();
    // Corrupt the stored value behind the repository's back.
    sqlx::query(
        "UPDATE configurable_parameters
         SET data = jsonb_set(data, '{required_images_auto_training,value}', '1')
         WHERE id = $1",
    )
    .bind(row.id)
    .execute(&pool)
    .await
    .unwrap();

    let record = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();
    assert_eq!(record.id, row.id);
    assert_eq!(record.data, schema.default_parameters());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stored_record_from_older_schema_keeps_known_values(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let schema = DatasetCounterSchema::new(TaskType::Detection);

    // An older record: one leaf that no longer exists, one that still does,
    // and no entry for leaves added since.
    let stored = json!({
        "type": "PARAMETER_GROUP",
        "required_images_auto_training": {"type": "INTEGER", "value": 25},
        "legacy_threshold": {"type": "FLOAT", "value": 0.3}
    });
    let inserted: i64 = sqlx::query_scalar(
        "INSERT INTO configurable_parameters
            (workspace_id, project_id, identifier_type, component_type, task_id, schema_name, data)
         VALUES ($1, $2, 'component_parameters', 'DATASET_COUNTER', $3, 'dataset_counter', $4)
         RETURNING id",
    )
    .bind(WORKSPACE_ID)
    .bind(task.project_id)
    .bind(task.id)
    .bind(&stored)
    .fetch_one(&pool)
    .await
    .unwrap();

    let record = repo
        .get_or_create_component_parameters(&schema, ComponentType::DatasetCounter, Some(task.id))
        .await
        .unwrap();
    assert_eq!(record.id, inserted);
    assert_eq!(record.data.integer_value(&[REQUIRED_IMAGES_AUTO_TRAINING]).unwrap(), 25);
    assert!(record.data.bool_value(&[USE_DYNAMIC_REQUIRED_ANNOTATIONS]).unwrap());
}

// ---------------------------------------------------------------------------
// Test: hyper parameters
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hyper_parameters_from_template(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let storage = model_storage(&pool, &task).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);

    let record = repo.get_or_create_hyper_parameters(&storage, None).await.unwrap();
    assert_eq!(record.schema_name, "template_a");
    assert_eq!(
        record.data.integer_value(&[LEARNING_PARAMETERS, "batch_size"]).unwrap(),
        16
    );
    assert_eq!(record.entity_identifier, EntityIdentifier::model_storage(storage.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_explicit_schema_wins_over_template(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let storage = model_storage(&pool, &task).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let schema = TrainingHyperParameterSchema;

    let record = repo
        .get_or_create_hyper_parameters(&storage, Some(&schema))
        .await
        .unwrap();
    assert_eq!(record.data, schema.default_parameters());
    assert_eq!(
        record.data.integer_value(&[LEARNING_PARAMETERS, "batch_size"]).unwrap(),
        8
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_single_use_records_are_skipped(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let storage = model_storage(&pool, &task).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);

    let regular = repo.get_or_create_hyper_parameters(&storage, None).await.unwrap();

    let mut one_off: ParameterGroup = regular.data.clone();
    one_off
        .parameter_mut(&[LEARNING_PARAMETERS, "batch_size"])
        .unwrap()
        .set_value("batch_size", &json!(64))
        .unwrap();
    let single_use = repo
        .create_single_use_hyper_parameters(&storage, "template_a", &one_off)
        .await
        .unwrap();
    assert!(single_use.single_use);

    let again = repo.get_or_create_hyper_parameters(&storage, None).await.unwrap();
    assert_eq!(again.id, regular.id);
    assert_eq!(
        again.data.integer_value(&[LEARNING_PARAMETERS, "batch_size"]).unwrap(),
        16
    );

    let identifier = EntityIdentifier::model_storage(storage.id);
    let latest = repo
        .get_latest_by_identifier(&identifier, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, single_use.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_template_is_an_error(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let storage = ModelStorageRepo::create(
        &pool,
        &CreateModelStorage {
            project_id: task.project_id,
            task_id: task.id,
            model_template_id: "broken".into(),
            hyper_parameters: json!({"x": {"type": "COMPLEX"}}),
        },
    )
    .await
    .unwrap();
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);

    let err = repo.get_or_create_hyper_parameters(&storage, None).await.unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_all_by_identifier(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let storage = model_storage(&pool, &task).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);

    let record = repo.get_or_create_hyper_parameters(&storage, None).await.unwrap();
    repo.create_single_use_hyper_parameters(&storage, "template_a", &record.data)
        .await
        .unwrap();

    let identifier = EntityIdentifier::model_storage(storage.id);
    assert_eq!(repo.delete_all_by_identifier(&identifier).await.unwrap(), 2);
    assert!(repo
        .get_latest_by_identifier(&identifier, true)
        .await
        .unwrap()
        .is_none());

    // A later read recreates the defaults under a fresh id.
    let recreated = repo.get_or_create_hyper_parameters(&storage, None).await.unwrap();
    assert_ne!(recreated.id, record.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_model_storage_delete_cascades_to_hyper_parameters(pool: PgPool) {
    let task = setup(&pool, TaskType::Detection).await;
    let storage = model_storage(&pool, &task).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);
    let record = repo.get_or_create_hyper_parameters(&storage, None).await.unwrap();

    assert!(ModelStorageRepo::delete(&pool, storage.id).await.unwrap());
    assert!(repo.get_by_id(record.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_anomaly_task_has_hidden_label_constraint(pool: PgPool) {
    let task = setup(&pool, TaskType::AnomalyClassification).await;
    let repo = ConfigurableParametersRepo::new(&pool, WORKSPACE_ID, task.project_id);

    let config = repo.get_dataset_counter_config(&task).await.unwrap();
    assert!(!config.label_constraint_first_training);
    assert!(config.use_dynamic_required_annotations);
}
