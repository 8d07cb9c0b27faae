//! Common test entities and storage bootstrap
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use entity_storage::{Config, EntityRegistry, EntityStorageModule, ManualClock, SeaOrmEntityStorage};
use std::sync::Arc;

/// Versioned entity: audit fields plus version and modification time
pub mod counter {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, Default, DeriveEntityModel)]
    #[sea_orm(table_name = "counter")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub count: i32,
        pub label: String,
        pub creation_time: DateTimeUtc,
        pub sort_date: Date,
        pub modification_time: DateTimeUtc,
        pub version: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl entity_storage::StorageEntity for Entity {
        const ID: Column = Column::Id;
        type Stamp = entity_storage::Versioned;
    }

    impl entity_storage::HasAuditFields for Entity {
        const CREATION_TIME: Column = Column::CreationTime;
        const SORT_DATE: Column = Column::SortDate;
    }

    impl entity_storage::HasVersionFields for Entity {
        const VERSION: Column = Column::Version;
        const MODIFICATION_TIME: Column = Column::ModificationTime;
    }
}

/// Audited entity: creation fields only
pub mod note {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, Default, DeriveEntityModel)]
    #[sea_orm(table_name = "note")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub body: String,
        pub creation_time: DateTimeUtc,
        pub sort_date: Date,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl entity_storage::StorageEntity for Entity {
        const ID: Column = Column::Id;
        type Stamp = entity_storage::Audited;
    }

    impl entity_storage::HasAuditFields for Entity {
        const CREATION_TIME: Column = Column::CreationTime;
        const SORT_DATE: Column = Column::SortDate;
    }
}

/// Plain entity without service columns
pub mod tag {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, Default, DeriveEntityModel)]
    #[sea_orm(table_name = "tag")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub weight: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl entity_storage::StorageEntity for Entity {
        const ID: Column = Column::Id;
        type Stamp = entity_storage::Untracked;
    }
}

/// Untracked entity with an enumerated column
pub mod flag {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum)]
    #[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
    pub enum Status {
        #[default]
        #[sea_orm(string_value = "active")]
        Active,
        #[sea_orm(string_value = "archived")]
        Archived,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Default, DeriveEntityModel)]
    #[sea_orm(table_name = "flag")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub status: Status,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl entity_storage::StorageEntity for Entity {
        const ID: Column = Column::Id;
        type Stamp = entity_storage::Untracked;
    }
}

/// Entity that is never registered, so its table does not exist
pub mod ghost {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, Default, DeriveEntityModel)]
    #[sea_orm(table_name = "ghost")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub count: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl entity_storage::StorageEntity for Entity {
        const ID: Column = Column::Id;
        type Stamp = entity_storage::Untracked;
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 9, 15, 0).unwrap()
}

pub fn registry() -> EntityRegistry {
    EntityRegistry::new()
        .register::<counter::Entity>()
        .register::<note::Entity>()
        .register::<tag::Entity>()
        .register::<flag::Entity>()
}

/// Storage over a fresh in-memory database
pub struct TestStorage {
    pub storage: Arc<SeaOrmEntityStorage>,
    pub clock: Arc<ManualClock>,
}

pub async fn setup() -> TestStorage {
    setup_with(Config::default()).await
}

pub async fn setup_with(config: Config) -> TestStorage {
    init_tracing();
    let clock = Arc::new(ManualClock::new(start_time()));
    let module = EntityStorageModule::new();
    module
        .init(config, &registry(), clock.clone())
        .await
        .expect("storage init");

    TestStorage {
        storage: module.storage().expect("storage"),
        clock,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}
