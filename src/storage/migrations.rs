//! Schema upgrades for the embedded database
//!
//! Each step is tagged with the version it upgrades to. Opening at version N
//! over a database stored at version M runs every step in (M, N] in order.

use crate::error::{StorageError, StorageResult};
use crate::storage::engine::DatabaseSchema;

/// Latest schema version this crate knows how to build
pub const SCHEMA_VERSION: u32 = 1;

/// Schema operations available while a version change is in progress
pub trait SchemaUpgrade {
    /// Whether a record store with this name already exists
    fn has_store(&self, name: &str) -> bool;

    /// Create a record store with out-of-line keys
    fn create_store(&mut self, name: &str) -> StorageResult<()>;
}

type MigrationStep = fn(&mut dyn SchemaUpgrade, &DatabaseSchema) -> StorageResult<()>;

const MIGRATIONS: &[(u32, MigrationStep)] = &[(1, migrate_v1 as MigrationStep)];

/// Bring a database from `old_version` up to `schema.version`
pub fn run_migrations(
    upgrade: &mut dyn SchemaUpgrade,
    old_version: u32,
    schema: &DatabaseSchema,
) -> StorageResult<()> {
    for &(version, step) in MIGRATIONS {
        if version <= old_version || version > schema.version {
            continue;
        }

        tracing::info!(
            database = %schema.name,
            from = old_version,
            to = version,
            "running schema migration"
        );

        step(&mut *upgrade, schema).map_err(|e| StorageError::Upgrade {
            version,
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

fn migrate_v1(upgrade: &mut dyn SchemaUpgrade, schema: &DatabaseSchema) -> StorageResult<()> {
    if !upgrade.has_store(&schema.store) {
        upgrade.create_store(&schema.store)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct RecordingUpgrade {
        stores: BTreeSet<String>,
        created: usize,
        fail: bool,
    }

    impl SchemaUpgrade for RecordingUpgrade {
        fn has_store(&self, name: &str) -> bool {
            self.stores.contains(name)
        }

        fn create_store(&mut self, name: &str) -> StorageResult<()> {
            if self.fail {
                return Err(StorageError::OperationFailed {
                    operation: "create_store".to_string(),
                    reason: "constraint".to_string(),
                });
            }
            self.created += 1;
            self.stores.insert(name.to_string());
            Ok(())
        }
    }

    fn schema(version: u32) -> DatabaseSchema {
        DatabaseSchema {
            name: "db".to_string(),
            version,
            store: "images".to_string(),
        }
    }

    #[test]
    fn test_fresh_database_creates_store() {
        let mut upgrade = RecordingUpgrade::default();
        run_migrations(&mut upgrade, 0, &schema(SCHEMA_VERSION)).unwrap();
        assert!(upgrade.has_store("images"));
        assert_eq!(upgrade.created, 1);
    }

    #[test]
    fn test_current_version_is_noop() {
        let mut upgrade = RecordingUpgrade::default();
        run_migrations(&mut upgrade, 1, &schema(1)).unwrap();
        assert_eq!(upgrade.created, 0);
    }

    #[test]
    fn test_existing_store_not_recreated() {
        let mut upgrade = RecordingUpgrade::default();
        upgrade.stores.insert("images".to_string());
        run_migrations(&mut upgrade, 0, &schema(1)).unwrap();
        assert_eq!(upgrade.created, 0);
    }

    #[test]
    fn test_failed_step_reports_version() {
        let mut upgrade = RecordingUpgrade {
            fail: true,
            ..Default::default()
        };
        let err = run_migrations(&mut upgrade, 0, &schema(1)).unwrap_err();
        assert!(matches!(err, StorageError::Upgrade { version: 1, .. }));
    }
}
