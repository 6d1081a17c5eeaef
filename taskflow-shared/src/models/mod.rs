/// Database models for TaskFlow
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, roles and authentication state
/// - `task`: Tasks with status/priority and role-scoped search
/// - `comment`: Task comments
/// - `activity`: Append-only activity log
/// - `attachment`: File attachment metadata (binaries live in object storage)
/// - `favorite`: (user, task) favorite pairs

pub mod activity;
pub mod attachment;
pub mod comment;
pub mod favorite;
pub mod task;
pub mod user;
