/// Business logic shared across route handlers
///
/// Task mutations trigger a cascade of secondary effects. The cascade is
/// split into a pure half ([`diff`]) that decides what happened, and an
/// effectful half ([`cascade`]) that writes activity entries and pushes
/// notifications.

pub mod cascade;
pub mod diff;

pub use cascade::SideEffects;
pub use diff::TaskDiff;
