pub mod invitation;
pub mod member;
pub mod note;
pub mod organization;
pub mod subscription;
pub mod user;

pub use invitation::{Invitation, NewInvitation};
pub use member::{Member, MemberDetail};
pub use note::{NewNote, Note, NoteScope, NoteUpdate};
pub use organization::{NewOrganization, Organization, OrganizationDetail, OrganizationUpdate, PlanChange};
pub use subscription::{NewSubscription, Subscription};
pub use user::{NewUser, User};
