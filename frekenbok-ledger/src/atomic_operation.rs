use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

/// One database transaction shared by several ledger operations.
///
/// Nothing written through the operation is visible to other callers until
/// [`AtomicOperation::commit`] succeeds; dropping it rolls everything back.
pub struct AtomicOperation<'a> {
    tx: Transaction<'a, Sqlite>,
}

impl AtomicOperation<'static> {
    pub(crate) async fn init(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }
}

impl AtomicOperation<'_> {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}
