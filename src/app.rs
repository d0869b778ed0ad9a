// Application state shared across handlers
use std::sync::Arc;

use crate::{
    app_config::WorkflowConfig,
    db::MarketplaceStore,
    services::{
        AffiliationBroker, ApprovalAuthority, CompanyRegistrar, DealerOnboarding, EmailNotifier,
        EmailService, IdentityRegistrar, JwtService, Notifier, SubscriptionLedger,
    },
    utils::PasswordService,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketplaceStore>,
    pub jwt_service: Arc<JwtService>,
    pub identity: Arc<IdentityRegistrar>,
    pub onboarding: Arc<DealerOnboarding>,
    pub companies: Arc<CompanyRegistrar>,
    pub affiliation: Arc<AffiliationBroker>,
    pub approval: Arc<ApprovalAuthority>,
    pub subscriptions: Arc<SubscriptionLedger>,
}

impl AppState {
    /// Wire every workflow component from its collaborators
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        email: EmailService,
        jwt: JwtService,
        passwords: PasswordService,
        settings: WorkflowConfig,
    ) -> Self {
        let notifier: Arc<dyn Notifier> =
            Arc::new(EmailNotifier::new(store.clone(), email.clone()));

        let identity = IdentityRegistrar::new(
            store.clone(),
            passwords.clone(),
            jwt.clone(),
            email.clone(),
            settings.clone(),
        );
        let companies =
            CompanyRegistrar::new(store.clone(), passwords, email, notifier.clone(), settings);

        Self {
            jwt_service: Arc::new(jwt),
            identity: Arc::new(identity),
            onboarding: Arc::new(DealerOnboarding::new(store.clone(), notifier.clone())),
            companies: Arc::new(companies),
            affiliation: Arc::new(AffiliationBroker::new(store.clone(), notifier.clone())),
            approval: Arc::new(ApprovalAuthority::new(store.clone(), notifier.clone())),
            subscriptions: Arc::new(SubscriptionLedger::new(store.clone(), notifier)),
            store,
        }
    }
}
