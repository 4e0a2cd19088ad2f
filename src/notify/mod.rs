//! Domain event notification.
//!
//! Services announce state changes through an explicit [`EventNotifier`]
//! handed to their constructors, so callers (and tests) observe side effects
//! without a global listener registry.

use uuid::Uuid;

/// Events emitted by the risk engine and the marketplace auction
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A risk assessment was computed and stored
    AssessmentCompleted {
        assessment_id: Uuid,
        application_id: Uuid,
        decision: String,
    },
    /// A loan application was submitted and fanned out to lenders
    ApplicationSubmitted {
        application_id: Uuid,
        eligible_lenders: usize,
    },
    /// A lender offer was created or refreshed
    OfferCreated {
        offer_id: Uuid,
        application_id: Uuid,
        lender_id: Uuid,
    },
}

/// Receiver for domain events
pub trait EventNotifier: Send + Sync {
    fn notify(&self, event: DomainEvent);
}

/// Default notifier: structured log lines, nothing else
pub struct TracingNotifier;

impl EventNotifier for TracingNotifier {
    fn notify(&self, event: DomainEvent) {
        match event {
            DomainEvent::AssessmentCompleted {
                assessment_id,
                application_id,
                decision,
            } => {
                tracing::info!(%assessment_id, %application_id, %decision, "Risk assessment completed");
            }
            DomainEvent::ApplicationSubmitted {
                application_id,
                eligible_lenders,
            } => {
                tracing::info!(%application_id, eligible_lenders, "Application submitted to marketplace");
            }
            DomainEvent::OfferCreated {
                offer_id,
                application_id,
                lender_id,
            } => {
                tracing::info!(%offer_id, %application_id, %lender_id, "Lender offer created");
            }
        }
    }
}
