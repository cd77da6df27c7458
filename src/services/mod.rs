//! Collaborators outside the voice pipeline: account creation and the
//! marketplace listing store.

pub mod identity;
pub mod listings;

pub use identity::{IdentityToolkitClient, InMemoryRegistry, RegisteredUser, RegistrationService};
pub use listings::{InMemoryListingStore, Listing, ListingStore, NewListing};
