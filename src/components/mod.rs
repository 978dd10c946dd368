// Export components
pub mod google_calendar;
pub mod token_store;

// Re-export the calendar adapter and its token manager
pub use google_calendar::{GoogleCalendar, TokenManager};
pub use token_store::{CredentialRecord, TokenStore};
