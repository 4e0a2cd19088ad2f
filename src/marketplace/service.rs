//! Marketplace service layer - auction lifecycle business logic.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, Duration, Months, NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::error::ApiError;
use crate::marketplace::model::*;
use crate::marketplace::webhook::{
    self, LoanPackagePayload, PackageApplicant, PackageLoanTerms, PackageRiskProfile,
    DEFAULT_SIGNING_KEY, SIGNATURE_HEADER,
};
use crate::notify::{DomainEvent, EventNotifier};

/// Rate assumed for the loan package when no recommendation was supplied
const FALLBACK_PACKAGE_RATE: f64 = 0.20;

// ============================================================================
// Pure amortization helpers
// ============================================================================

/// Flat monthly payment via the standard amortization formula.
/// A zero rate degenerates to straight-line principal.
pub fn calculate_monthly_payment(principal: f64, annual_rate: f64, term: i32) -> f64 {
    let monthly_rate = annual_rate / 12.0;
    if monthly_rate == 0.0 {
        return principal / term as f64;
    }
    let factor = (1.0 + monthly_rate).powi(term);
    principal * (monthly_rate * factor) / (factor - 1.0)
}

/// One row of a generated repayment schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub payment_number: i32,
    pub scheduled_date: NaiveDate,
    pub scheduled_amount: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// Declining-balance amortization schedule: `term` monthly installments
/// starting one month after `start`, each at the flat monthly payment with
/// the interest/principal split recomputed on the remaining balance.
pub fn build_repayment_schedule(
    principal: f64,
    annual_rate: f64,
    term: i32,
    start: NaiveDate,
) -> Vec<ScheduleEntry> {
    let monthly_payment = calculate_monthly_payment(principal, annual_rate, term);
    let monthly_rate = annual_rate / 12.0;

    let mut remaining = principal;
    let mut schedule = Vec::with_capacity(term as usize);

    for i in 1..=term {
        let interest_portion = remaining * monthly_rate;
        let principal_portion = monthly_payment - interest_portion;
        remaining -= principal_portion;

        schedule.push(ScheduleEntry {
            payment_number: i,
            scheduled_date: add_months(start, i as u32),
            scheduled_amount: monthly_payment,
            principal_portion,
            interest_portion,
        });
    }

    schedule
}

/// Lender-specific rate: base rate plus the premium for the risk tier
pub fn lender_rate(lender: &Lender, risk_score: Option<f64>) -> f64 {
    let premium = match RiskTier::from_score(risk_score) {
        RiskTier::Low => lender.risk_premium_low.unwrap_or(0.02),
        RiskTier::Medium => lender.risk_premium_mid.unwrap_or(0.05),
        RiskTier::High => lender.risk_premium_high.unwrap_or(0.10),
    };
    lender.base_rate + premium
}

// ============================================================================
// Marketplace service
// ============================================================================

/// Marketplace auction service
pub struct MarketplaceService {
    pool: PgPool,
    audit: AuditLog,
    notifier: Arc<dyn EventNotifier>,
    http: reqwest::Client,
    callback_base_url: String,
}

impl MarketplaceService {
    pub fn new(
        pool: PgPool,
        audit: AuditLog,
        notifier: Arc<dyn EventNotifier>,
        callback_base_url: String,
    ) -> Self {
        // Lender endpoints get a bounded window; a slow lender must never
        // hold a notification task open indefinitely
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            pool,
            audit,
            notifier,
            http,
            callback_base_url,
        }
    }

    /// Submit a pre-approved application to the marketplace.
    ///
    /// Creates the application, fans the loan package out to every eligible
    /// lender and returns immediately; offers arrive asynchronously. Each
    /// lender notification is independent and best-effort - one lender's
    /// failure never affects another's, nor the submission itself.
    pub async fn submit_to_marketplace(
        &self,
        params: SubmitApplicationParams,
    ) -> Result<Uuid, ApiError> {
        if !(MIN_LOAN_AMOUNT..=MAX_LOAN_AMOUNT).contains(&params.loan_amount) {
            return Err(ApiError::ValidationError(format!(
                "Loan amount must be between {} and {}",
                MIN_LOAN_AMOUNT, MAX_LOAN_AMOUNT
            )));
        }
        if !(MIN_TERM_MONTHS..=MAX_TERM_MONTHS).contains(&params.requested_term) {
            return Err(ApiError::ValidationError(format!(
                "Loan term must be between {} and {} months",
                MIN_TERM_MONTHS, MAX_TERM_MONTHS
            )));
        }

        let risk_tier = RiskTier::from_score(params.risk_score);
        let offers_deadline = Utc::now() + Duration::hours(OFFER_COLLECTION_WINDOW_HOURS);

        let application_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO loan_applications (
                user_id, provider_id, procedure_type, procedure_code, procedure_description,
                loan_amount, requested_term,
                risk_score, risk_tier, affordability_score, debt_to_income_ratio,
                monthly_income, employment_status, employment_duration_months,
                recommended_rate, recommended_term, recommended_monthly_payment,
                status, submitted_at, offers_deadline, ip_address, user_agent
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17,
                'SUBMITTED', NOW(), $18, $19, $20
            )
            RETURNING application_id
            "#,
        )
        .bind(params.user_id)
        .bind(params.provider_id)
        .bind(&params.procedure_type)
        .bind(params.procedure_code.as_deref())
        .bind(params.procedure_description.as_deref())
        .bind(params.loan_amount)
        .bind(params.requested_term)
        .bind(params.risk_score)
        .bind(risk_tier)
        .bind(params.affordability_score)
        .bind(params.debt_to_income_ratio)
        .bind(params.monthly_income)
        .bind(params.employment_status.as_deref())
        .bind(params.employment_duration_months)
        .bind(params.recommended_rate)
        .bind(params.recommended_term.unwrap_or(params.requested_term))
        .bind(params.recommended_monthly_payment)
        .bind(offers_deadline)
        .bind(params.ip_address.as_deref())
        .bind(params.user_agent.as_deref())
        .fetch_one(&self.pool)
        .await?;

        self.audit
            .record(
                "loan_application",
                application_id,
                "create",
                None,
                Some(json!({
                    "status": "SUBMITTED",
                    "loan_amount": params.loan_amount,
                    "risk_score": params.risk_score,
                    "risk_tier": risk_tier,
                })),
            )
            .await?;

        let eligible = self
            .eligible_lenders(params.loan_amount, params.risk_score.unwrap_or(50.0))
            .await?;

        // Move into UNDERWRITING before dispatch; the guard keeps a
        // synchronously created first offer's OFFERS_RECEIVED transition final
        sqlx::query(
            r#"
            UPDATE loan_applications
            SET status = 'UNDERWRITING', underwriting_completed_at = NOW(), updated_at = NOW()
            WHERE application_id = $1 AND status = 'SUBMITTED'
            "#,
        )
        .bind(application_id)
        .execute(&self.pool)
        .await?;

        let package_rate = params.recommended_rate.unwrap_or(FALLBACK_PACKAGE_RATE);
        let package_term = params.recommended_term.unwrap_or(params.requested_term);
        let package_payment = params.recommended_monthly_payment.unwrap_or_else(|| {
            calculate_monthly_payment(params.loan_amount, package_rate, package_term)
        });

        for lender in &eligible {
            match lender.lender_type {
                LenderType::CarelendBalanceSheet => {
                    // Fund from our own balance sheet: create the offer
                    // synchronously, no network round trip
                    let rate = lender_rate(lender, params.risk_score);
                    if let Err(e) = self
                        .create_lender_offer(
                            application_id,
                            lender.lender_id,
                            params.loan_amount,
                            rate,
                            package_term,
                            None,
                            None,
                        )
                        .await
                    {
                        tracing::error!(
                            lender = %lender.code,
                            %application_id,
                            error = %e,
                            "Failed to auto-create balance sheet offer"
                        );
                    }
                }
                LenderType::External => {
                    let payload = LoanPackagePayload {
                        event: "loan.available",
                        application_id,
                        loan: PackageLoanTerms {
                            amount: params.loan_amount,
                            proposed_rate: package_rate,
                            proposed_term: package_term,
                            proposed_monthly_payment: package_payment,
                        },
                        risk: PackageRiskProfile {
                            score: params.risk_score.unwrap_or(50.0),
                            tier: risk_tier,
                            affordability_ratio: params.affordability_score.unwrap_or(60.0),
                        },
                        applicant: PackageApplicant {
                            monthly_income: params.monthly_income,
                            employment_status: params.employment_status.clone(),
                        },
                        action_required: "RESPOND_WITH_OFFER",
                        respond_by: offers_deadline,
                        callback_url: format!(
                            "{}/api/marketplace/webhooks/offer-response",
                            self.callback_base_url
                        ),
                    };

                    // One independent task per lender
                    tokio::spawn(notify_lender(
                        self.http.clone(),
                        self.audit.clone(),
                        lender.clone(),
                        payload,
                    ));
                }
            }
        }

        self.notifier.notify(DomainEvent::ApplicationSubmitted {
            application_id,
            eligible_lenders: eligible.len(),
        });

        Ok(application_id)
    }

    /// Process a lender's response, from a webhook callback or manual entry.
    ///
    /// Declines are logged only. Accepts upsert the (application, lender)
    /// offer, so replays refresh the existing row instead of duplicating it.
    pub async fn receive_lender_offer(
        &self,
        params: LenderResponseParams,
    ) -> Result<LenderResponseOutcome, ApiError> {
        let lender = self
            .lender_by_code(&params.lender_code)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Unknown lender: {}", params.lender_code))
            })?;

        let application = sqlx::query_as::<_, LoanApplication>(
            "SELECT * FROM loan_applications WHERE application_id = $1",
        )
        .bind(params.application_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

        if !params.accepted {
            tracing::info!(
                lender = %lender.code,
                application_id = %application.application_id,
                reason = ?params.reason,
                "Lender declined application"
            );

            self.audit
                .record(
                    "loan_application",
                    application.application_id,
                    "lender_declined",
                    None,
                    Some(json!({
                        "lender_id": lender.lender_id,
                        "lender_name": lender.name,
                        "reason": params.reason,
                    })),
                )
                .await?;

            return Ok(LenderResponseOutcome {
                success: true,
                declined: true,
            });
        }

        // Rate resolution: lender adjustment, then the recommended terms,
        // then the lender's own tier formula as last resort
        let rate = params
            .adjusted_rate
            .or(application.recommended_rate)
            .unwrap_or_else(|| lender_rate(&lender, application.risk_score));
        let term = params
            .adjusted_term
            .or(application.recommended_term)
            .unwrap_or(application.requested_term);

        self.create_lender_offer(
            application.application_id,
            lender.lender_id,
            application.loan_amount,
            rate,
            term,
            params.lender_notes,
            params.conditions,
        )
        .await?;

        Ok(LenderResponseOutcome {
            success: true,
            declined: false,
        })
    }

    /// Create or refresh a PENDING offer, keyed on (application, lender)
    pub async fn create_lender_offer(
        &self,
        application_id: Uuid,
        lender_id: Uuid,
        amount: f64,
        rate: f64,
        term: i32,
        lender_notes: Option<String>,
        conditions: Option<String>,
    ) -> Result<Uuid, ApiError> {
        let monthly_payment = calculate_monthly_payment(amount, rate, term);
        let total_repayable = monthly_payment * term as f64;
        let origination_fee = amount * ORIGINATION_FEE_RATE;
        let expires_at = Utc::now() + Duration::hours(OFFER_EXPIRY_HOURS);

        let offer_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO lender_offers (
                application_id, lender_id, approved_amount, interest_rate, term,
                monthly_payment, total_repayable, origination_fee,
                status, expires_at, lender_notes, conditions
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'PENDING', $9, $10, $11)
            ON CONFLICT (application_id, lender_id)
            DO UPDATE SET
                approved_amount = EXCLUDED.approved_amount,
                interest_rate = EXCLUDED.interest_rate,
                term = EXCLUDED.term,
                monthly_payment = EXCLUDED.monthly_payment,
                total_repayable = EXCLUDED.total_repayable,
                origination_fee = EXCLUDED.origination_fee,
                expires_at = EXCLUDED.expires_at,
                lender_notes = EXCLUDED.lender_notes,
                conditions = EXCLUDED.conditions,
                updated_at = NOW()
            RETURNING offer_id
            "#,
        )
        .bind(application_id)
        .bind(lender_id)
        .bind(amount)
        .bind(rate)
        .bind(term)
        .bind(monthly_payment)
        .bind(total_repayable)
        .bind(origination_fee)
        .bind(expires_at)
        .bind(lender_notes.as_deref())
        .bind(conditions.as_deref())
        .fetch_one(&self.pool)
        .await?;

        // The first offer moves the application into OFFERS_RECEIVED
        sqlx::query(
            r#"
            UPDATE loan_applications
            SET status = 'OFFERS_RECEIVED', updated_at = NOW()
            WHERE application_id = $1 AND status IN ('SUBMITTED', 'UNDERWRITING')
            "#,
        )
        .bind(application_id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(
                "lender_offer",
                offer_id,
                "create",
                None,
                Some(json!({
                    "application_id": application_id,
                    "lender_id": lender_id,
                    "amount": amount,
                    "rate": rate,
                    "term": term,
                })),
            )
            .await?;

        self.notifier.notify(DomainEvent::OfferCreated {
            offer_id,
            application_id,
            lender_id,
        });

        Ok(offer_id)
    }

    /// Accept an offer and create the funded loan.
    ///
    /// Runs as one transaction: the target offer flips to ACCEPTED, every
    /// sibling PENDING offer is declined, the application records its
    /// selection, the loan is created and the full repayment schedule is
    /// written. Any failure rolls the whole sequence back; concurrent
    /// accepts on the same application leave exactly one winner.
    pub async fn accept_offer(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
    ) -> Result<AcceptedLoan, ApiError> {
        let mut tx = self.pool.begin().await?;

        let offer = sqlx::query_as::<_, OfferForAccept>(
            r#"
            SELECT lo.application_id, lo.lender_id,
                   lo.approved_amount, lo.interest_rate, lo.term,
                   lo.monthly_payment, lo.total_repayable, lo.origination_fee,
                   lo.status, la.user_id AS applicant_id, la.provider_id
            FROM lender_offers lo
            JOIN loan_applications la ON la.application_id = lo.application_id
            WHERE lo.offer_id = $1
            FOR UPDATE
            "#,
        )
        .bind(offer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Offer not found".to_string()))?;

        if offer.applicant_id != user_id {
            return Err(ApiError::Forbidden(
                "Application belongs to another user".to_string(),
            ));
        }

        if offer.status != OfferStatus::Pending {
            return Err(ApiError::Conflict(
                "Offer is no longer available".to_string(),
            ));
        }

        // Guarded update: under concurrency the row may have been settled
        // between our snapshot and the lock, so re-check via the predicate
        let updated = sqlx::query(
            r#"
            UPDATE lender_offers
            SET status = 'ACCEPTED', responded_at = NOW(), updated_at = NOW()
            WHERE offer_id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(offer_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(ApiError::Conflict(
                "Offer is no longer available".to_string(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE lender_offers
            SET status = 'DECLINED', responded_at = NOW(),
                decline_reason = 'Another offer accepted', updated_at = NOW()
            WHERE application_id = $1 AND offer_id != $2 AND status = 'PENDING'
            "#,
        )
        .bind(offer.application_id)
        .bind(offer_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE loan_applications
            SET status = 'OFFER_SELECTED', selected_offer_id = $1,
                decision_at = NOW(), updated_at = NOW()
            WHERE application_id = $2
            "#,
        )
        .bind(offer_id)
        .bind(offer.application_id)
        .execute(&mut *tx)
        .await?;

        let today = Utc::now().date_naive();
        let first_payment_date = today + Days::new(30);
        let maturity_date = add_months(today, offer.term as u32);
        let total_outstanding = offer.approved_amount + offer.origination_fee;

        let loan_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO marketplace_loans (
                application_id, offer_id, lender_id, user_id, provider_id,
                principal_amount, interest_rate, term, monthly_payment,
                total_repayable, origination_fee, total_fees,
                status, outstanding_principal, total_outstanding,
                first_payment_date, maturity_date
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11,
                'PENDING_DISBURSEMENT', $6, $12, $13, $14
            )
            RETURNING loan_id
            "#,
        )
        .bind(offer.application_id)
        .bind(offer_id)
        .bind(offer.lender_id)
        .bind(offer.applicant_id)
        .bind(offer.provider_id)
        .bind(offer.approved_amount)
        .bind(offer.interest_rate)
        .bind(offer.term)
        .bind(offer.monthly_payment)
        .bind(offer.total_repayable)
        .bind(offer.origination_fee)
        .bind(total_outstanding)
        .bind(first_payment_date)
        .bind(maturity_date)
        .fetch_one(&mut *tx)
        .await?;

        let schedule =
            build_repayment_schedule(offer.approved_amount, offer.interest_rate, offer.term, today);
        for entry in &schedule {
            sqlx::query(
                r#"
                INSERT INTO loan_repayments (
                    loan_id, user_id, payment_number, scheduled_date,
                    scheduled_amount, principal_portion, interest_portion, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'SCHEDULED')
                "#,
            )
            .bind(loan_id)
            .bind(offer.applicant_id)
            .bind(entry.payment_number)
            .bind(entry.scheduled_date)
            .bind(entry.scheduled_amount)
            .bind(entry.principal_portion)
            .bind(entry.interest_portion)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(AcceptedLoan {
            loan_id,
            offer_id,
            application_id: offer.application_id,
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All offers for an application, best rate first
    pub async fn get_application_offers(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<OfferWithLender>, ApiError> {
        let offers = sqlx::query_as::<_, OfferWithLender>(
            r#"
            SELECT lo.offer_id, lo.application_id, lo.lender_id,
                   lo.approved_amount, lo.interest_rate, lo.term,
                   lo.monthly_payment, lo.total_repayable, lo.origination_fee,
                   lo.status, lo.expires_at, lo.lender_notes, lo.conditions,
                   l.name AS lender_name, l.code AS lender_code, l.type AS lender_type
            FROM lender_offers lo
            JOIN lenders l ON l.lender_id = lo.lender_id
            WHERE lo.application_id = $1
            ORDER BY lo.interest_rate ASC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(offers)
    }

    /// Fetch an application, enforcing ownership
    pub async fn application_for_user(
        &self,
        application_id: Uuid,
        user_id: Uuid,
    ) -> Result<LoanApplication, ApiError> {
        sqlx::query_as::<_, LoanApplication>(
            "SELECT * FROM loan_applications WHERE application_id = $1 AND user_id = $2",
        )
        .bind(application_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))
    }

    /// The user's applications with live offer statistics
    pub async fn list_user_applications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationSummary>, ApiError> {
        let applications = sqlx::query_as::<_, ApplicationSummary>(
            r#"
            SELECT la.application_id, la.procedure_type, la.loan_amount,
                   la.requested_term, la.status, la.submitted_at, la.offers_deadline,
                   (SELECT COUNT(*) FROM lender_offers lo
                    WHERE lo.application_id = la.application_id AND lo.status = 'PENDING')
                       AS pending_offers,
                   (SELECT MIN(lo.interest_rate) FROM lender_offers lo
                    WHERE lo.application_id = la.application_id AND lo.status = 'PENDING')
                       AS best_rate
            FROM loan_applications la
            WHERE la.user_id = $1
            ORDER BY la.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(applications)
    }

    /// The user's funded marketplace loans
    pub async fn list_user_loans(&self, user_id: Uuid) -> Result<Vec<LoanSummary>, ApiError> {
        let loans = sqlx::query_as::<_, LoanSummary>(
            r#"
            SELECT ml.loan_id, ml.application_id, ml.principal_amount,
                   ml.interest_rate, ml.term, ml.monthly_payment, ml.status,
                   ml.outstanding_principal, ml.first_payment_date, ml.maturity_date,
                   l.name AS lender_name,
                   (SELECT COUNT(*) FROM loan_repayments lr
                    WHERE lr.loan_id = ml.loan_id AND lr.status = 'COMPLETED')
                       AS completed_payments
            FROM marketplace_loans ml
            JOIN lenders l ON l.lender_id = ml.lender_id
            WHERE ml.user_id = $1
            ORDER BY ml.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// A loan's repayment schedule, enforcing ownership
    pub async fn loan_repayments(
        &self,
        loan_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<LoanRepayment>, ApiError> {
        let owned = sqlx::query_scalar::<_, Uuid>(
            "SELECT loan_id FROM marketplace_loans WHERE loan_id = $1 AND user_id = $2",
        )
        .bind(loan_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if owned.is_none() {
            return Err(ApiError::NotFound("Loan not found".to_string()));
        }

        let repayments = sqlx::query_as::<_, LoanRepayment>(
            r#"
            SELECT repayment_id, loan_id, user_id, payment_number, scheduled_date,
                   scheduled_amount, principal_portion, interest_portion, status, paid_date
            FROM loan_repayments
            WHERE loan_id = $1
            ORDER BY payment_number ASC
            "#,
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(repayments)
    }

    /// Open applications for the lender/admin dashboard
    pub async fn pending_applications(&self) -> Result<Vec<PendingApplication>, ApiError> {
        let applications = sqlx::query_as::<_, PendingApplication>(
            r#"
            SELECT la.application_id, la.procedure_type, la.loan_amount,
                   la.requested_term, la.risk_score, la.risk_tier, la.status,
                   la.submitted_at, la.offers_deadline,
                   (SELECT COUNT(*) FROM lender_offers lo
                    WHERE lo.application_id = la.application_id) AS offer_count
            FROM loan_applications la
            WHERE la.status IN ('SUBMITTED', 'UNDERWRITING', 'OFFERS_RECEIVED')
            ORDER BY la.submitted_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(applications)
    }

    /// Lender directory
    pub async fn list_lenders(&self) -> Result<Vec<Lender>, ApiError> {
        let lenders =
            sqlx::query_as::<_, Lender>("SELECT * FROM lenders ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(lenders)
    }

    /// Look up a lender by its code
    pub async fn lender_by_code(&self, code: &str) -> Result<Option<Lender>, ApiError> {
        let lender = sqlx::query_as::<_, Lender>("SELECT * FROM lenders WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lender)
    }

    /// Active lenders whose eligibility window covers this loan,
    /// cheapest money first
    async fn eligible_lenders(
        &self,
        loan_amount: f64,
        risk_score: f64,
    ) -> Result<Vec<Lender>, ApiError> {
        let lenders = sqlx::query_as::<_, Lender>(
            r#"
            SELECT * FROM lenders
            WHERE active = true
              AND min_loan_amount <= $1 AND max_loan_amount >= $1
              AND min_risk_score <= $2 AND max_risk_score >= $2
            ORDER BY base_rate ASC
            "#,
        )
        .bind(loan_amount)
        .bind(risk_score)
        .fetch_all(&self.pool)
        .await?;

        Ok(lenders)
    }
}

/// Offer row with ownership context, locked for acceptance
#[derive(Debug, sqlx::FromRow)]
struct OfferForAccept {
    application_id: Uuid,
    lender_id: Uuid,
    approved_amount: f64,
    interest_rate: f64,
    term: i32,
    monthly_payment: f64,
    total_repayable: f64,
    origination_fee: f64,
    status: OfferStatus,
    applicant_id: Uuid,
    provider_id: Option<Uuid>,
}

/// Deliver a signed loan package to one external lender.
/// Failures are logged and audited, never propagated.
async fn notify_lender(
    client: reqwest::Client,
    audit: AuditLog,
    lender: Lender,
    payload: LoanPackagePayload,
) {
    if let Some(url) = lender.webhook_url.clone() {
        if let Err(e) = send_loan_package(&client, &lender, &url, &payload).await {
            tracing::warn!(
                lender = %lender.code,
                application_id = %payload.application_id,
                error = %e,
                "Failed to notify lender"
            );
        }
    }

    if let Err(e) = audit
        .record(
            "loan_application",
            payload.application_id,
            "lender_notified",
            None,
            Some(json!({
                "lender_id": lender.lender_id,
                "lender_name": lender.name,
                "lender_type": lender.lender_type,
            })),
        )
        .await
    {
        tracing::warn!(lender = %lender.code, error = %e, "Failed to audit lender notification");
    }
}

async fn send_loan_package(
    client: &reqwest::Client,
    lender: &Lender,
    url: &str,
    payload: &LoanPackagePayload,
) -> anyhow::Result<()> {
    let body = serde_json::to_vec(payload).context("Failed to serialize loan package")?;
    let api_key = lender.api_key.as_deref().unwrap_or(DEFAULT_SIGNING_KEY);
    let signature = webhook::sign_payload(api_key, &body);

    let response = client
        .post(url)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(body)
        .send()
        .await
        .context("Failed to deliver loan package")?;

    if !response.status().is_success() {
        anyhow::bail!("Lender endpoint returned {}", response.status());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn lender(base_rate: f64) -> Lender {
        Lender {
            lender_id: Uuid::new_v4(),
            name: "Test Lender".to_string(),
            code: "TEST".to_string(),
            lender_type: LenderType::External,
            active: true,
            min_loan_amount: 1_000.0,
            max_loan_amount: 100_000.0,
            min_risk_score: 0.0,
            max_risk_score: 100.0,
            base_rate,
            risk_premium_low: Some(0.02),
            risk_premium_mid: Some(0.05),
            risk_premium_high: Some(0.10),
            webhook_url: None,
            api_key: None,
            contact_email: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_monthly_payment_zero_rate_is_straight_line() {
        assert!((calculate_monthly_payment(12_000.0, 0.0, 12) - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_payment_amortization_formula() {
        // 20,000 at 20% over 6 months
        let payment = calculate_monthly_payment(20_000.0, 0.20, 6);
        let r: f64 = 0.20 / 12.0;
        let factor = (1.0 + r).powi(6);
        let expected = 20_000.0 * (r * factor) / (factor - 1.0);
        assert!((payment - expected).abs() < 1e-9);
        // Sanity: above straight-line, below straight-line plus full annual interest
        assert!(payment > 20_000.0 / 6.0);
        assert!(payment < 20_000.0 / 6.0 * 1.2);
    }

    #[test]
    fn test_schedule_has_term_rows_at_flat_payment() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let schedule = build_repayment_schedule(20_000.0, 0.20, 6, start);
        let payment = calculate_monthly_payment(20_000.0, 0.20, 6);

        assert_eq!(schedule.len(), 6);
        for (i, entry) in schedule.iter().enumerate() {
            assert_eq!(entry.payment_number, i as i32 + 1);
            assert!((entry.scheduled_amount - payment).abs() < 1e-9);
            assert!(
                (entry.principal_portion + entry.interest_portion - payment).abs() < 1e-9
            );
        }
    }

    #[test]
    fn test_schedule_principal_sums_to_principal() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let schedule = build_repayment_schedule(15_000.0, 0.24, 12, start);

        let total_principal: f64 = schedule.iter().map(|e| e.principal_portion).sum();
        assert!((total_principal - 15_000.0).abs() < 0.01);
    }

    #[test]
    fn test_schedule_interest_declines_with_balance() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let schedule = build_repayment_schedule(10_000.0, 0.18, 6, start);

        for pair in schedule.windows(2) {
            assert!(pair[1].interest_portion < pair[0].interest_portion);
        }
    }

    #[test]
    fn test_schedule_monthly_cadence() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let schedule = build_repayment_schedule(6_000.0, 0.20, 3, start);

        assert_eq!(schedule[0].scheduled_date.month(), 2);
        assert_eq!(schedule[1].scheduled_date.month(), 3);
        assert_eq!(schedule[2].scheduled_date.month(), 4);
    }

    #[test]
    fn test_lender_rate_by_tier() {
        let l = lender(0.18);
        assert!((lender_rate(&l, Some(75.0)) - 0.20).abs() < 1e-9);
        assert!((lender_rate(&l, Some(55.0)) - 0.23).abs() < 1e-9);
        assert!((lender_rate(&l, Some(20.0)) - 0.28).abs() < 1e-9);
        // Missing score lands in the medium tier
        assert!((lender_rate(&l, None) - 0.23).abs() < 1e-9);
    }

    #[test]
    fn test_lender_rate_premium_defaults() {
        let mut l = lender(0.18);
        l.risk_premium_low = None;
        l.risk_premium_mid = None;
        l.risk_premium_high = None;

        assert!((lender_rate(&l, Some(75.0)) - 0.20).abs() < 1e-9);
        assert!((lender_rate(&l, Some(55.0)) - 0.23).abs() < 1e-9);
        assert!((lender_rate(&l, Some(20.0)) - 0.28).abs() < 1e-9);
    }
}
