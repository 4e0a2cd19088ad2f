//! Healthcare data source adapters.
//!
//! Each adapter answers one question with a 0-100 component score (or a
//! small profile struct). Bureau-style lookups that would be external API
//! integrations in production sit behind the [`BureauSource`] trait so a
//! real integration can replace the simulation without touching the engine.
//! SQL-backed adapters read the platform's own tables.

use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

/// Neutral component score used when a data source is unavailable
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Neutral procedure necessity used when the risk profile is unknown
pub const NEUTRAL_NECESSITY: f64 = 0.6;

// ============================================================================
// Bureau-style sources (external integrations, simulated for now)
// ============================================================================

/// External bureau capability: identifying inputs in, a 0-100 score out
pub trait BureauSource: Send + Sync {
    /// Claims-history score for a medical aid scheme member
    fn medical_aid_score(&self, scheme: &str) -> f64;

    /// Chronic medication pickup consistency score
    fn medication_adherence_score(&self) -> f64;
}

/// Simulated bureau responses, standing in for scheme and pharmacy APIs
pub struct SimulatedBureau;

impl BureauSource for SimulatedBureau {
    fn medical_aid_score(&self, scheme: &str) -> f64 {
        // Different schemes have different claim patterns
        let scheme_scores: [(&str, f64); 6] = [
            ("discovery", 75.0),
            ("bonitas", 70.0),
            ("momentum", 70.0),
            ("gems", 72.0),
            ("medihelp", 68.0),
            ("fedhealth", 67.0),
        ];

        let scheme_lower = scheme.to_lowercase();
        for (key, score) in scheme_scores {
            if scheme_lower.contains(key) {
                let variance = rand::thread_rng().gen_range(0..15) as f64;
                return score + variance;
            }
        }
        60.0
    }

    fn medication_adherence_score(&self) -> f64 {
        // Consistent prescription pickup reads as a responsible payer
        55.0 + rand::thread_rng().gen_range(0..30) as f64
    }
}

// ============================================================================
// Procedure risk
// ============================================================================

/// Risk profile for a procedure, from the weights table or defaults
#[derive(Debug, Clone)]
pub struct ProcedureRiskProfile {
    pub base_pd_risk: f64,
    pub base_lgd_risk: f64,
    pub typical_amount_min: f64,
    pub typical_amount_max: f64,
    pub recovery_time_days: i32,
    pub success_rate: f64,
    pub necessity_score: f64,
    /// Set when the profile was matched on an ICD-10 code
    pub icd10_code: Option<String>,
}

impl ProcedureRiskProfile {
    /// Defaults for procedures with no configured risk weights
    pub fn unknown() -> Self {
        Self {
            base_pd_risk: 50.0,
            base_lgd_risk: 50.0,
            typical_amount_min: 5_000.0,
            typical_amount_max: 50_000.0,
            recovery_time_days: 14,
            success_rate: 90.0,
            necessity_score: NEUTRAL_NECESSITY,
            icd10_code: None,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcedureRiskRow {
    icd10_code: Option<String>,
    icd10_category: Option<String>,
    base_pd_risk: f64,
    base_lgd_risk: f64,
    typical_amount_min: Option<f64>,
    typical_amount_max: Option<f64>,
    recovery_time_days: Option<i32>,
    success_rate: Option<f64>,
    emergency_factor: Option<f64>,
}

/// How essential the procedure is (0-1). Essential procedures repay better.
fn necessity_score(emergency_factor: Option<f64>, icd10_category: Option<&str>) -> f64 {
    let mut score: f64 = 0.5;

    if emergency_factor.unwrap_or(1.0) > 1.0 {
        score += 0.2;
    }

    if let Some(category) = icd10_category {
        let category = category.to_lowercase();
        let essential = ["oncology", "cardiovascular", "obstetrics"];
        if essential.iter().any(|c| category.contains(c)) {
            score += 0.15;
        }
    }

    score.min(1.0)
}

// ============================================================================
// Provider performance
// ============================================================================

/// Provider repayment performance summary
#[derive(Debug, Clone)]
pub struct ProviderPerformance {
    pub performance_score: f64,
    pub is_network_partner: bool,
    pub partnership_tier: Option<String>,
    pub default_rate: f64,
}

impl ProviderPerformance {
    /// Unknown provider: neutral performance assumptions
    pub fn unknown() -> Self {
        Self {
            performance_score: NEUTRAL_SCORE,
            is_network_partner: false,
            partnership_tier: None,
            default_rate: 0.05,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProviderStatsRow {
    network_partner: bool,
    partnership_tier: Option<String>,
    completed_loans: Option<i64>,
    defaulted_loans: Option<i64>,
}

// ============================================================================
// Internal payment history
// ============================================================================

/// Repayment history score from the platform's own records
#[derive(Debug, Clone, Copy)]
pub struct PaymentHistoryScore {
    pub payment_score: f64,
    pub is_new_customer: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentStatsRow {
    total_payments: Option<i64>,
    paid_on_time: Option<i64>,
    avg_days_late: Option<f64>,
}

// ============================================================================
// Adapter bundle
// ============================================================================

/// All data sources the risk engine draws from
pub struct RiskDataSources {
    pool: PgPool,
    bureau: Box<dyn BureauSource>,
}

impl RiskDataSources {
    pub fn new(pool: PgPool, bureau: Box<dyn BureauSource>) -> Self {
        Self { pool, bureau }
    }

    /// Medical aid claims score; uninsured patients score low
    pub fn medical_aid_score(&self, scheme: Option<&str>) -> f64 {
        match scheme {
            Some(scheme) => self.bureau.medical_aid_score(scheme),
            None => 40.0,
        }
    }

    /// Medication adherence; neutral for patients without chronic conditions
    pub fn medication_adherence_score(&self, has_chronic_conditions: bool) -> f64 {
        if has_chronic_conditions {
            self.bureau.medication_adherence_score()
        } else {
            70.0
        }
    }

    /// Score the user's repayment history on this platform.
    /// New customers get a neutral score.
    pub async fn internal_payment_history(
        &self,
        user_id: Uuid,
    ) -> Result<PaymentHistoryScore, ApiError> {
        let stats = sqlx::query_as::<_, PaymentStatsRow>(
            r#"
            SELECT
                COUNT(*) AS total_payments,
                COUNT(*) FILTER (WHERE status = 'COMPLETED') AS paid_on_time,
                COALESCE(AVG(
                    CASE WHEN status = 'COMPLETED' AND paid_date IS NOT NULL
                         THEN (paid_date - scheduled_date)::double precision
                    END
                ), 0) AS avg_days_late
            FROM loan_repayments
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let total = stats.total_payments.unwrap_or(0);
        if total == 0 {
            return Ok(PaymentHistoryScore {
                payment_score: NEUTRAL_SCORE,
                is_new_customer: true,
            });
        }

        let paid_ratio = stats.paid_on_time.unwrap_or(0) as f64 / total as f64;
        let avg_days_late = stats.avg_days_late.unwrap_or(0.0);

        // avg_days_late is negative for early payers, which nudges the
        // score up rather than down
        let mut score = 50.0;
        score += paid_ratio * 40.0;
        score -= avg_days_late.min(10.0) * 2.0;
        if total > 3 {
            score += 10.0;
        }

        Ok(PaymentHistoryScore {
            payment_score: score.clamp(0.0, 100.0).round(),
            is_new_customer: false,
        })
    }

    /// Look up the procedure risk profile by ICD-10 code, then by procedure
    /// name; unknown procedures fall back to documented defaults.
    pub async fn procedure_risk(
        &self,
        procedure_type: &str,
        icd10_code: Option<&str>,
    ) -> Result<ProcedureRiskProfile, ApiError> {
        let mut row: Option<ProcedureRiskRow> = None;

        if let Some(code) = icd10_code {
            row = sqlx::query_as::<_, ProcedureRiskRow>(
                r#"
                SELECT icd10_code, icd10_category, base_pd_risk, base_lgd_risk,
                       typical_amount_min, typical_amount_max,
                       recovery_time_days, success_rate, emergency_factor
                FROM procedure_risk_weights
                WHERE icd10_code = $1 AND status = 'active'
                "#,
            )
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        }

        if row.is_none() {
            row = sqlx::query_as::<_, ProcedureRiskRow>(
                r#"
                SELECT icd10_code, icd10_category, base_pd_risk, base_lgd_risk,
                       typical_amount_min, typical_amount_max,
                       recovery_time_days, success_rate, emergency_factor
                FROM procedure_risk_weights
                WHERE procedure_name ILIKE $1 AND status = 'active'
                LIMIT 1
                "#,
            )
            .bind(format!("%{}%", procedure_type))
            .fetch_optional(&self.pool)
            .await?;
        }

        let profile = match row {
            Some(row) => ProcedureRiskProfile {
                base_pd_risk: row.base_pd_risk,
                base_lgd_risk: row.base_lgd_risk,
                typical_amount_min: row.typical_amount_min.unwrap_or(5_000.0),
                typical_amount_max: row.typical_amount_max.unwrap_or(50_000.0),
                recovery_time_days: row.recovery_time_days.unwrap_or(0),
                success_rate: row.success_rate.unwrap_or(90.0),
                necessity_score: necessity_score(
                    row.emergency_factor,
                    row.icd10_category.as_deref(),
                ),
                icd10_code: row.icd10_code,
            },
            None => ProcedureRiskProfile::unknown(),
        };

        Ok(profile)
    }

    /// Provider performance from loan outcomes attributed to the provider
    pub async fn provider_performance(
        &self,
        provider_id: Option<Uuid>,
    ) -> Result<ProviderPerformance, ApiError> {
        let provider_id = match provider_id {
            Some(id) => id,
            None => return Ok(ProviderPerformance::unknown()),
        };

        let row = sqlx::query_as::<_, ProviderStatsRow>(
            r#"
            SELECT
                p.network_partner,
                p.partnership_tier,
                COUNT(*) FILTER (WHERE ml.status = 'COMPLETED') AS completed_loans,
                COUNT(*) FILTER (WHERE ml.status = 'DEFAULTED') AS defaulted_loans
            FROM providers p
            LEFT JOIN loan_applications la ON la.provider_id = p.provider_id
            LEFT JOIN marketplace_loans ml ON ml.application_id = la.application_id
            WHERE p.provider_id = $1
            GROUP BY p.provider_id, p.network_partner, p.partnership_tier
            "#,
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(ProviderPerformance::unknown()),
        };

        let completed = row.completed_loans.unwrap_or(0);
        let defaulted = row.defaulted_loans.unwrap_or(0);
        let total_loans = completed + defaulted;
        let default_rate = if total_loans > 0 {
            defaulted as f64 / total_loans as f64
        } else {
            0.05
        };

        let mut score: f64 = 50.0;

        if row.network_partner {
            score += 15.0;
            match row.partnership_tier.as_deref() {
                Some("platinum") => score += 10.0,
                Some("gold") => score += 7.0,
                Some("silver") => score += 4.0,
                _ => {}
            }
        }

        if default_rate < 0.02 {
            score += 15.0;
        } else if default_rate < 0.05 {
            score += 10.0;
        } else if default_rate > 0.10 {
            score -= 15.0;
        }

        if total_loans > 50 {
            score += 10.0;
        } else if total_loans > 20 {
            score += 5.0;
        }

        Ok(ProviderPerformance {
            performance_score: score.clamp(0.0, 100.0),
            is_network_partner: row.network_partner,
            partnership_tier: row.partnership_tier,
            default_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_medical_aid_scores_known_schemes() {
        let bureau = SimulatedBureau;

        let score = bureau.medical_aid_score("Discovery Health");
        assert!((75.0..90.0).contains(&score));

        let score = bureau.medical_aid_score("unknown scheme");
        assert_eq!(score, 60.0);
    }

    #[test]
    fn test_simulated_adherence_in_range() {
        let bureau = SimulatedBureau;
        for _ in 0..20 {
            let score = bureau.medication_adherence_score();
            assert!((55.0..85.0).contains(&score));
        }
    }

    #[test]
    fn test_necessity_score() {
        // Base only
        assert_eq!(necessity_score(Some(1.0), None), 0.5);
        // Emergency raises necessity
        assert_eq!(necessity_score(Some(1.5), None), 0.7);
        // Essential category raises necessity
        assert!((necessity_score(Some(1.0), Some("Oncology")) - 0.65).abs() < 1e-9);
        // Both, capped at 1.0
        assert!((necessity_score(Some(2.0), Some("cardiovascular")) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_profiles_use_neutral_defaults() {
        let procedure = ProcedureRiskProfile::unknown();
        assert_eq!(procedure.base_pd_risk, 50.0);
        assert_eq!(procedure.necessity_score, NEUTRAL_NECESSITY);

        let provider = ProviderPerformance::unknown();
        assert_eq!(provider.performance_score, NEUTRAL_SCORE);
        assert!(!provider.is_network_partner);
        assert_eq!(provider.default_rate, 0.05);
    }
}
