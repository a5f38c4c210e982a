//! Payment/installment reconciliation and status derivation.
//!
//! Pure functions shared by every write path that moves money. Callers must
//! persist `montant_paye`, `reste_a_payer` and the derived status together,
//! inside the same database transaction.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::entities::echeance::{self, StatutEcheance};
use crate::entities::echeancier::StatutEcheancier;
use crate::entities::paiement::{self, StatutPaiement};
use crate::entities::vente::StatutVente;
use crate::services::montants;

/// Sum of all non-rejected payment amounts.
pub fn montant_paye(paiements: &[paiement::Model]) -> Decimal {
    paiements
        .iter()
        .filter(|p| {
            StatutPaiement::from_str(&p.statut)
                .map(|s| s != StatutPaiement::Rejete)
                .unwrap_or(true)
        })
        .map(|p| p.montant)
        .sum()
}

/// Derives the sale status from the amount paid, first match wins:
///
/// 1. ANNULEE is terminal;
/// 2. remaining below tolerance (covers overpayment) -> PAYEE;
/// 3. anything paid -> PARTIELLEMENT_PAYEE;
/// 4. otherwise VALIDEE.
pub fn derive_statut(courant: StatutVente, total_ttc: Decimal, paye: Decimal) -> StatutVente {
    if courant == StatutVente::Annulee {
        return StatutVente::Annulee;
    }
    if total_ttc - paye < montants::tolerance() {
        return StatutVente::Payee;
    }
    if paye > Decimal::ZERO {
        return StatutVente::PartiellementPayee;
    }
    StatutVente::Validee
}

/// Remaining amount, floored at zero once fully paid.
pub fn reste_a_payer(total_ttc: Decimal, paye: Decimal) -> Decimal {
    let reste = total_ttc - paye;
    if reste < montants::tolerance() {
        Decimal::ZERO
    } else {
        reste
    }
}

/// Schedule balance gate: installment amounts must sum to the schedule
/// total within the 0.01 tolerance.
pub fn est_equilibre(echeances: &[echeance::Model], montant_total: Decimal) -> bool {
    let somme: Decimal = echeances.iter().map(|e| e.montant).sum();
    montants::within_tolerance(somme, montant_total)
}

/// TERMINE iff every installment has been received.
pub fn statut_echeancier(echeances: &[echeance::Model]) -> StatutEcheancier {
    let toutes_recues = !echeances.is_empty()
        && echeances
            .iter()
            .all(|e| StatutEcheance::from_str(&e.statut) == Ok(StatutEcheance::Recu));
    if toutes_recues {
        StatutEcheancier::Termine
    } else {
        StatutEcheancier::Actif
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn paiement(montant: Decimal, statut: StatutPaiement) -> paiement::Model {
        paiement::Model {
            id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            type_paiement: "ESPECES".into(),
            montant,
            date_paiement: Utc::now(),
            reference: None,
            banque: None,
            statut: statut.to_string(),
            date_statut: None,
            notes_paiement: None,
            entreprise_id: Uuid::new_v4(),
            cree_par: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn echeance(montant: Decimal, statut: StatutEcheance) -> echeance::Model {
        echeance::Model {
            id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            echeancier_id: Uuid::new_v4(),
            date_echeance: Utc::now(),
            montant,
            type_paiement: "CHEQUE".into(),
            reference: None,
            banque: None,
            statut: statut.to_string(),
            date_encaissement: None,
            notes: None,
            entreprise_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn rejected_payments_are_excluded() {
        let paiements = vec![
            paiement(dec!(100), StatutPaiement::Recu),
            paiement(dec!(50), StatutPaiement::Rejete),
            paiement(dec!(25), StatutPaiement::EnAttente),
        ];
        assert_eq!(montant_paye(&paiements), dec!(125));
    }

    #[test]
    fn statut_payee_within_tolerance() {
        // 0.005 under the total still counts as paid
        let statut = derive_statut(StatutVente::Validee, dec!(119), dec!(118.995));
        assert_eq!(statut, StatutVente::Payee);
    }

    #[test]
    fn statut_partiellement_payee_beyond_tolerance() {
        let statut = derive_statut(StatutVente::Validee, dec!(119), dec!(118.98));
        assert_eq!(statut, StatutVente::PartiellementPayee);
    }

    #[test]
    fn statut_validee_when_nothing_paid() {
        let statut = derive_statut(StatutVente::Brouillon, dec!(119), Decimal::ZERO);
        assert_eq!(statut, StatutVente::Validee);
    }

    #[test]
    fn overpayment_counts_as_payee() {
        let statut = derive_statut(StatutVente::Validee, dec!(119), dec!(120));
        assert_eq!(statut, StatutVente::Payee);
    }

    #[test]
    fn annulee_is_terminal() {
        let statut = derive_statut(StatutVente::Annulee, dec!(119), dec!(119));
        assert_eq!(statut, StatutVente::Annulee);
    }

    #[test]
    fn reste_a_payer_floors_at_zero() {
        assert_eq!(reste_a_payer(dec!(119), dec!(119)), Decimal::ZERO);
        assert_eq!(reste_a_payer(dec!(119), dec!(120)), Decimal::ZERO);
        assert_eq!(reste_a_payer(dec!(119), dec!(19)), dec!(100));
    }

    #[test]
    fn equilibre_within_tolerance() {
        let echeances = vec![
            echeance(dec!(33), StatutEcheance::ARecevoir),
            echeance(dec!(33), StatutEcheance::ARecevoir),
            echeance(dec!(34.005), StatutEcheance::ARecevoir),
        ];
        assert!(est_equilibre(&echeances, dec!(100)));
        assert!(!est_equilibre(&echeances, dec!(105)));
    }

    #[test]
    fn echeancier_termine_only_when_all_received() {
        let mut echeances = vec![
            echeance(dec!(100), StatutEcheance::Recu),
            echeance(dec!(100), StatutEcheance::ARecevoir),
        ];
        assert_eq!(statut_echeancier(&echeances), StatutEcheancier::Actif);

        echeances[1].statut = StatutEcheance::Recu.to_string();
        assert_eq!(statut_echeancier(&echeances), StatutEcheancier::Termine);

        // no installments -> still active, not spuriously finished
        assert_eq!(statut_echeancier(&[]), StatutEcheancier::Actif);
    }
}
