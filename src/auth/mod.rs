pub mod jwt;
pub mod types;
pub mod validation;

pub use types::{
    AuthenticatedSession, LoginOutcome, MessageResponse, ProfileChanges, SignupFields, TokenPair,
    UserProfile,
};
