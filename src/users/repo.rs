use std::io;
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::storage::StorageClient;
use crate::users::repo_types::{NewUser, UserRecord};

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// UTC timestamp with millisecond precision, e.g. `2024-01-02T03:04:05.006Z`.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(time::UtcOffset::UTC).format(TIMESTAMP_FORMAT)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user with this email already exists")]
    DuplicateEmail,
    #[error("user data could not be decoded: {0}")]
    CorruptStore(#[source] serde_json::Error),
    #[error("failed to read user data: {0}")]
    StoreRead(#[source] io::Error),
    #[error("failed to write user data: {0}")]
    StoreWrite(#[source] io::Error),
    #[error("no user id left above {0}")]
    IdsExhausted(u64),
}

/// The user collection, kept as a single JSON array in one storage object.
pub struct UserStore {
    storage: Arc<dyn StorageClient>,
    key: String,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl UserStore {
    pub fn new(storage: Arc<dyn StorageClient>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Makes sure the storage root exists and the users object holds a valid
    /// collection. A missing object, or one that is not JSON at all, is
    /// replaced by an empty collection; JSON that does not decode as users is
    /// reported as `CorruptStore` and never overwritten.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.storage
            .ensure_root()
            .await
            .map_err(StoreError::StoreWrite)?;

        let raw = self
            .storage
            .get_object(&self.key)
            .await
            .map_err(StoreError::StoreRead)?;
        let ready = match raw {
            None => false,
            Some(raw) => match serde_json::from_slice::<serde_json::Value>(&raw) {
                Ok(value) => {
                    // well-formed JSON that is not a user list is left untouched
                    let users: Vec<UserRecord> =
                        serde_json::from_value(value).map_err(StoreError::CorruptStore)?;
                    info!(key = %self.key, users = users.len(), "user data file ready");
                    true
                }
                Err(e) => {
                    warn!(key = %self.key, error = %e, "user data file is not JSON, resetting");
                    false
                }
            },
        };

        if !ready {
            info!(key = %self.key, "creating new user data file");
            self.save(&[]).await?;
        }
        Ok(())
    }

    /// Missing or blank data reads as an empty collection.
    pub async fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        let Some(raw) = self
            .storage
            .get_object(&self.key)
            .await
            .map_err(StoreError::StoreRead)?
        else {
            return Ok(Vec::new());
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw).map_err(StoreError::CorruptStore)
    }

    pub async fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(users)
            .map_err(|e| StoreError::StoreWrite(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        self.storage
            .put_object(&self.key, Bytes::from(body))
            .await
            .map_err(StoreError::StoreWrite)
    }

    pub async fn add(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        let email = new_user.email.to_lowercase();
        if users.iter().any(|u| u.email.to_lowercase() == email) {
            debug!(%email, "duplicate email rejected");
            return Err(StoreError::DuplicateEmail);
        }

        let now = OffsetDateTime::now_utc();
        let registration_date = format_timestamp(now)
            .map_err(|e| StoreError::StoreWrite(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let user = UserRecord {
            id: next_id(now, &users)?,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email,
            password: new_user.password,
            registration_date,
        };

        users.push(user.clone());
        self.save(&users).await?;
        info!(user_id = user.id, total = users.len(), "user stored");
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.load().await
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list().await?.len())
    }
}

/// Millisecond clock plus a random offset, kept above every id already issued.
fn next_id(now: OffsetDateTime, users: &[UserRecord]) -> Result<u64, StoreError> {
    let millis = (now.unix_timestamp_nanos() / 1_000_000) as u64;
    let candidate = millis.saturating_add(rand::thread_rng().gen_range(0..1000));
    let floor = match users.iter().map(|u| u.id).max() {
        Some(max) => max.checked_add(1).ok_or(StoreError::IdsExhausted(max))?,
        None => 0,
    };
    Ok(candidate.max(floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use std::collections::HashSet;

    const KEY: &str = "users.json";

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: email.into(),
            password: "Abc123".into(),
        }
    }

    async fn memory_store() -> (Arc<MemoryStorage>, UserStore) {
        let storage = Arc::new(MemoryStorage::default());
        let store = UserStore::new(storage.clone(), KEY);
        store.initialize().await.expect("initialize");
        (storage, store)
    }

    #[tokio::test]
    async fn fresh_store_is_empty() {
        let (storage, store) = memory_store().await;
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
        let raw = storage.raw(KEY).expect("file created");
        assert_eq!(serde_json::from_slice::<Vec<UserRecord>>(&raw).unwrap(), vec![]);
    }

    #[tokio::test]
    async fn add_then_duplicate_in_other_case() {
        let (_storage, store) = memory_store().await;

        let user = store.add(new_user("jane@x.com")).await.unwrap();
        assert_eq!(user.email, "jane@x.com");
        assert_eq!(user.password, "Abc123");
        assert!(user.id > 0);
        assert!(OffsetDateTime::parse(
            &user.registration_date,
            &time::format_description::well_known::Rfc3339
        )
        .is_ok());
        assert_eq!(store.count().await.unwrap(), 1);

        let err = store.add(new_user("JANE@X.COM")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_check_tolerates_uppercase_on_disk() {
        let storage = Arc::new(MemoryStorage::with_object(
            KEY,
            br#"[{"id":1,"firstName":"Jo","lastName":"Ng","email":"Jo@X.com","password":"Abc123","registrationDate":"2024-01-01T00:00:00.000Z"}]"#,
        ));
        let store = UserStore::new(storage, KEY);
        let err = store.add(new_user("jo@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn insertion_order_is_preserved_and_ids_unique() {
        let (_storage, store) = memory_store().await;
        for i in 0..20 {
            store.add(new_user(&format!("u{i}@x.com"))).await.unwrap();
        }
        let users = store.list().await.unwrap();
        let emails: Vec<_> = users.iter().map(|u| u.email.clone()).collect();
        let expected: Vec<_> = (0..20).map(|i| format!("u{i}@x.com")).collect();
        assert_eq!(emails, expected);
        let ids: HashSet<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() {
        let (_storage, store) = memory_store().await;
        let store = Arc::new(store);
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.add(new_user(&format!("c{i}@x.com"))).await
            }));
        }
        // same email raced by two tasks: exactly one wins
        for _ in 0..2 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.add(new_user("same@x.com")).await
            }));
        }
        let mut duplicates = 0;
        for t in tasks {
            if let Err(StoreError::DuplicateEmail) = t.await.unwrap() {
                duplicates += 1;
            }
        }
        assert_eq!(duplicates, 1);
        assert_eq!(store.count().await.unwrap(), 17);
    }

    #[tokio::test]
    async fn save_load_round_trip_keeps_content() {
        let (storage, store) = memory_store().await;
        store.add(new_user("a@x.com")).await.unwrap();
        store.add(new_user("b@x.com")).await.unwrap();

        let before = storage.raw(KEY).unwrap();
        let users = store.load().await.unwrap();
        store.save(&users).await.unwrap();
        assert_eq!(storage.raw(KEY).unwrap(), before);
        assert_eq!(store.load().await.unwrap(), users);
    }

    #[tokio::test]
    async fn corrupt_content_fails_load() {
        let storage = Arc::new(MemoryStorage::with_object(KEY, b"{not json"));
        let store = UserStore::new(storage, KEY);
        assert!(matches!(
            store.load().await.unwrap_err(),
            StoreError::CorruptStore(_)
        ));
    }

    #[tokio::test]
    async fn blank_and_missing_content_read_as_empty() {
        let store = UserStore::new(Arc::new(MemoryStorage::with_object(KEY, b"  \n")), KEY);
        assert!(store.load().await.unwrap().is_empty());

        let store = UserStore::new(Arc::new(MemoryStorage::default()), KEY);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_resets_corrupt_file_and_keeps_good_one() {
        let storage = Arc::new(MemoryStorage::with_object(KEY, b"garbage"));
        let store = UserStore::new(storage.clone(), KEY);
        store.initialize().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        store.add(new_user("keep@x.com")).await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn initialize_refuses_to_overwrite_json_it_cannot_decode() {
        let seeded: &'static [u8] = br#"[{"id":"abc","firstName":"Jo","lastName":"Ng","email":"jo@x.com","password":"Abc123","registrationDate":"2024-01-01T00:00:00.000Z"}]"#;
        let storage = Arc::new(MemoryStorage::with_object(KEY, seeded));
        let store = UserStore::new(storage.clone(), KEY);

        let err = store.initialize().await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptStore(_)));
        assert_eq!(&storage.raw(KEY).unwrap()[..], seeded);
    }

    #[tokio::test]
    async fn initialize_keeps_records_missing_fields_intact() {
        let seeded: &'static [u8] = br#"[{"id":1,"firstName":"Jo","lastName":"Ng","email":"jo@x.com","password":"Abc123"}]"#;
        let storage = Arc::new(MemoryStorage::with_object(KEY, seeded));
        let store = UserStore::new(storage.clone(), KEY);

        assert!(store.initialize().await.is_err());
        assert_eq!(&storage.raw(KEY).unwrap()[..], seeded);
    }

    #[tokio::test]
    async fn add_fails_cleanly_when_ids_run_out() {
        let storage = Arc::new(MemoryStorage::with_object(
            KEY,
            br#"[{"id":18446744073709551615,"firstName":"Jo","lastName":"Ng","email":"jo@x.com","password":"Abc123","registrationDate":"2024-01-01T00:00:00.000Z"}]"#,
        ));
        let store = UserStore::new(storage, KEY);

        let err = store.add(new_user("new@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted(u64::MAX)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[test]
    fn timestamps_use_millisecond_precision() {
        let at = OffsetDateTime::UNIX_EPOCH + time::Duration::nanoseconds(1_234_567_891);
        assert_eq!(format_timestamp(at).unwrap(), "1970-01-01T00:00:01.234Z");
    }

    #[tokio::test]
    async fn failed_write_surfaces_and_leaves_collection_unchanged() {
        let (storage, store) = memory_store().await;
        store.add(new_user("a@x.com")).await.unwrap();

        storage.fail_writes(true);
        let err = store.add(new_user("b@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::StoreWrite(_)));

        storage.fail_writes(false);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let store = UserStore::new(Arc::new(FileStorage::new(&data_dir)), KEY);
        store.initialize().await.unwrap();
        let created = store.add(new_user("jane@x.com")).await.unwrap();

        let reopened = UserStore::new(Arc::new(FileStorage::new(&data_dir)), KEY);
        reopened.initialize().await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec![created]);

        let raw = std::fs::read_to_string(data_dir.join(KEY)).unwrap();
        assert!(raw.contains("\"registrationDate\""));
        assert!(raw.contains("\"firstName\": \"Jane\""));
    }

    #[test]
    fn next_id_stays_above_existing_ids() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let existing = UserRecord {
            id: u64::MAX / 2,
            first_name: "Jo".into(),
            last_name: "Ng".into(),
            email: "jo@x.com".into(),
            password: "Abc123".into(),
            registration_date: "2024-01-01T00:00:00.000Z".into(),
        };
        assert_eq!(next_id(now, &[existing]).unwrap(), u64::MAX / 2 + 1);
        assert!(next_id(now, &[]).unwrap() < 1000);
    }
}
