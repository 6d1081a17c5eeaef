/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, verification, token refresh
/// - `users`: User listing and lookup
/// - `tasks`: Task CRUD with role-scoped listing
/// - `comments`: Task comments
/// - `files`: File attachments
/// - `favorites`: Personal task bookmarks
/// - `activity`: Read access to the activity log

pub mod activity;
pub mod auth;
pub mod comments;
pub mod favorites;
pub mod files;
pub mod health;
pub mod tasks;
pub mod users;
