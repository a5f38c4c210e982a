//! Equitable installment schedule generation.
//!
//! Produces N installments that sum to the target amount exactly: the first
//! N-1 amounts are integer-floored and the last one absorbs the remainder.
//! This is a hard invariant of the generator, stricter than the 0.01
//! tolerance used when validating a manually entered schedule.

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::echeance::TypeEcheance;
use crate::errors::ServiceError;

/// Spacing between two consecutive installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type", content = "valeur")]
pub enum Intervalle {
    /// Fixed day count between due dates.
    Jours(i64),
    /// One calendar month per step (end-of-month dates clamp).
    MoisCalendaire,
}

impl Intervalle {
    fn apply(&self, date_debut: DateTime<Utc>, steps: u32) -> DateTime<Utc> {
        match self {
            Intervalle::Jours(jours) => date_debut + Duration::days(jours * i64::from(steps)),
            Intervalle::MoisCalendaire => date_debut
                .checked_add_months(Months::new(steps))
                .unwrap_or(date_debut),
        }
    }
}

/// One generated installment, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcheanceSpec {
    pub date_echeance: DateTime<Utc>,
    pub montant: Decimal,
    pub reference: String,
    pub type_paiement: TypeEcheance,
    pub banque: Option<String>,
}

/// Generates an equitable schedule for `montant_total` split over `nombre`
/// installments.
///
/// The first installment is never due immediately: installment `i` (0-based)
/// falls due at `date_debut + (i + 1)` intervals. Every installment is
/// stamped with a `ECH-{i+1}/{nombre}` reference and the given instrument.
pub fn generer_echeances_equitables(
    montant_total: Decimal,
    nombre: i32,
    date_debut: DateTime<Utc>,
    intervalle: Intervalle,
    type_paiement: TypeEcheance,
    banque: Option<String>,
) -> Result<Vec<EcheanceSpec>, ServiceError> {
    if montant_total <= Decimal::ZERO {
        return Err(ServiceError::InsufficientAmount(montant_total));
    }
    if nombre < 1 {
        return Err(ServiceError::InvalidCount(nombre));
    }

    let par_echeance = (montant_total / Decimal::from(nombre)).floor();
    let mut cumul = Decimal::ZERO;
    let mut echeances = Vec::with_capacity(nombre as usize);

    for i in 0..nombre {
        let dernier = i == nombre - 1;
        let montant = if dernier {
            montant_total - cumul
        } else {
            par_echeance
        };
        cumul += montant;

        echeances.push(EcheanceSpec {
            date_echeance: intervalle.apply(date_debut, (i + 1) as u32),
            montant,
            reference: format!("ECH-{}/{}", i + 1, nombre),
            type_paiement,
            banque: banque.clone(),
        });
    }

    debug_assert_eq!(cumul, montant_total);
    Ok(echeances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn last_installment_absorbs_remainder() {
        let echeances = generer_echeances_equitables(
            dec!(100),
            3,
            start(),
            Intervalle::Jours(30),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap();

        let montants: Vec<Decimal> = echeances.iter().map(|e| e.montant).collect();
        assert_eq!(montants, vec![dec!(33), dec!(33), dec!(34)]);
    }

    #[test]
    fn even_split_stays_even() {
        let echeances = generer_echeances_equitables(
            dec!(300),
            3,
            start(),
            Intervalle::Jours(30),
            TypeEcheance::Effet,
            Some("BIAT".into()),
        )
        .unwrap();

        assert!(echeances.iter().all(|e| e.montant == dec!(100)));
        assert!(echeances.iter().all(|e| e.banque.as_deref() == Some("BIAT")));
    }

    #[test]
    fn sum_is_exact_with_fractional_total() {
        let total = dec!(1234.56);
        let echeances = generer_echeances_equitables(
            total,
            7,
            start(),
            Intervalle::Jours(15),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap();

        let somme: Decimal = echeances.iter().map(|e| e.montant).sum();
        assert_eq!(somme, total);
        // first n-1 are integer-floored
        assert!(echeances[..6].iter().all(|e| e.montant == dec!(176)));
    }

    #[test]
    fn first_installment_is_offset_by_one_interval() {
        let echeances = generer_echeances_equitables(
            dec!(300),
            3,
            start(),
            Intervalle::Jours(30),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap();

        assert_eq!(echeances[0].date_echeance, start() + Duration::days(30));
        assert_eq!(echeances[1].date_echeance, start() + Duration::days(60));
        assert_eq!(echeances[2].date_echeance, start() + Duration::days(90));
    }

    #[test]
    fn calendar_month_stepping_clamps_end_of_month() {
        let debut = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let echeances = generer_echeances_equitables(
            dec!(200),
            2,
            debut,
            Intervalle::MoisCalendaire,
            TypeEcheance::Virement,
            None,
        )
        .unwrap();

        assert_eq!(
            echeances[0].date_echeance,
            Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap()
        );
        assert_eq!(
            echeances[1].date_echeance,
            Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn references_number_each_installment() {
        let echeances = generer_echeances_equitables(
            dec!(90),
            3,
            start(),
            Intervalle::Jours(30),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap();

        let refs: Vec<&str> = echeances.iter().map(|e| e.reference.as_str()).collect();
        assert_eq!(refs, vec!["ECH-1/3", "ECH-2/3", "ECH-3/3"]);
    }

    #[test]
    fn rejects_non_positive_amount() {
        let err = generer_echeances_equitables(
            Decimal::ZERO,
            3,
            start(),
            Intervalle::Jours(30),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientAmount(_)));
    }

    #[test]
    fn rejects_zero_count() {
        let err = generer_echeances_equitables(
            dec!(100),
            0,
            start(),
            Intervalle::Jours(30),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCount(0)));
    }

    #[test]
    fn single_installment_gets_whole_amount() {
        let echeances = generer_echeances_equitables(
            dec!(450.75),
            1,
            start(),
            Intervalle::Jours(30),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap();
        assert_eq!(echeances.len(), 1);
        assert_eq!(echeances[0].montant, dec!(450.75));
    }
}
