//! Data models for Fizanakara entities.
//!
//! Records mirror the backend's JSON payloads (camelCase on the wire):
//!
//! - `Person`, `PersonRequest`: registry members and dependents
//! - `Contribution`, `Payment`: annual dues and the payments recorded against them
//! - `Location`: districts and tributes
//! - `Admin`, `SessionUser` and the login/refresh/password payloads

pub mod admin;
pub mod common;
pub mod contribution;
pub mod location;
pub mod payment;
pub mod person;

pub use admin::{
    Admin, ForgotPasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
    RegisterRequest, ResetPasswordRequest, SessionUser, UpdateAdminRequest, UpdateProfileResponse,
};
pub use common::{ContributionStatus, Gender, GenericResponse, MemberStatus, PaymentStatus, Role};
pub use contribution::{Contribution, ContributionUpdate, GenerateContributionsRequest, PaymentProgress};
pub use location::{District, Location, LocationKind, LocationRequest, Tribute};
pub use payment::{Payment, PaymentRequest};
pub use person::{Person, PersonRequest, MAJORITY_AGE};
