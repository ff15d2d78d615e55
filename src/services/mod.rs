pub mod account_service;
pub mod error;
pub mod invitation_service;
pub mod member_service;
pub mod note_service;
pub mod organization_service;
pub mod permissions;
pub mod plans;
pub mod session;
pub mod subscription_service;

pub use account_service::{AccountService, AuthPayload, SignUp};
pub use error::{ServiceError, ServiceResult};
pub use invitation_service::{AcceptedInvitation, CreateInvitation, InvitationService};
pub use member_service::{ListMembersQuery, MemberPage, MemberService};
pub use note_service::{CreateNote, NotePage, NoteService};
pub use organization_service::{CreateOrganization, OrganizationService, SlugAvailability, Usage};
pub use permissions::{is_admin, PermissionCheck};
pub use session::{resolve_session, Session};
pub use subscription_service::SubscriptionService;
