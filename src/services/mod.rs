// Services module
// Workflow components and the collaborators they are built from

pub mod affiliation;
pub mod approval;
pub mod company;
pub mod email;
pub mod identity;
pub mod jwt;
pub mod notifier;
pub mod onboarding;
pub mod otp;
pub mod policy;
pub mod subscription;

// Re-export commonly used services
pub use affiliation::AffiliationBroker;
pub use approval::ApprovalAuthority;
pub use company::CompanyRegistrar;
pub use email::{EmailError, EmailService, LogTransport, MailTransport, ResendTransport};
pub use identity::IdentityRegistrar;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use notifier::{DomainEvent, EmailNotifier, Notifier};
pub use onboarding::DealerOnboarding;
pub use subscription::SubscriptionLedger;
