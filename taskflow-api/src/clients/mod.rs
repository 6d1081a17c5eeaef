/// Outbound clients for upstream dependencies
///
/// The API talks to two HTTP dependencies besides PostgreSQL and Redis:
/// a transactional email provider and an S3-compatible object store.
/// Both sit behind traits so services take injected handles and tests
/// substitute recording doubles.

pub mod mailer;
pub mod storage;

pub use mailer::{mailer_from_config, DynMailer, Mailer, MailerError, OutgoingEmail};
pub use storage::{DynObjectStore, HttpObjectStore, ObjectStore, StorageError, StoredObject};
